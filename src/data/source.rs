use std::cell::RefCell;
use std::rc::Rc;

use anyhow::{Result, bail};

use super::model::DatasetInfo;

// ---------------------------------------------------------------------------
// DataSource – a file exposing named numeric datasets
// ---------------------------------------------------------------------------

/// A structured source of column data: a list of datasets discovered when
/// the source is opened, each loadable as a flat sequence of floats.
pub trait DataSource {
    /// Short format name used in log messages ("parquet", "csv", ...).
    fn format(&self) -> &'static str;

    /// Physical columns in file order. Empty when the file carries no
    /// column header information.
    fn datasets(&self) -> &[DatasetInfo];

    /// Load all values of the physical column at zero-based `index`.
    fn load(&mut self, index: usize) -> Result<Vec<f64>>;
}

// ---------------------------------------------------------------------------
// MemorySource – datasets assembled in code
// ---------------------------------------------------------------------------

/// Shared view on how often each column of a [`MemorySource`] was loaded.
#[derive(Debug, Clone, Default)]
pub struct LoadProbe {
    counts: Rc<RefCell<Vec<usize>>>,
}

impl LoadProbe {
    /// Number of loads of the column at zero-based `index`.
    pub fn loads(&self, index: usize) -> usize {
        self.counts.borrow().get(index).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.borrow().iter().sum()
    }

    fn record(&self, index: usize) {
        let mut counts = self.counts.borrow_mut();
        if counts.len() <= index {
            counts.resize(index + 1, 0);
        }
        counts[index] += 1;
    }
}

/// In-memory source, used for programmatically generated tables.
#[derive(Debug, Default)]
pub struct MemorySource {
    datasets: Vec<DatasetInfo>,
    values: Vec<Vec<f64>>,
    probe: LoadProbe,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a named dataset with an optional unit attribute.
    pub fn with_dataset(mut self, name: &str, unit: Option<&str>, values: Vec<f64>) -> Self {
        self.datasets.push(DatasetInfo::new(name, unit));
        self.values.push(values);
        self
    }

    /// Build a source without column header information.
    pub fn headerless(columns: Vec<Vec<f64>>) -> Self {
        Self {
            datasets: Vec::new(),
            values: columns,
            probe: LoadProbe::default(),
        }
    }

    pub fn probe(&self) -> LoadProbe {
        self.probe.clone()
    }
}

impl DataSource for MemorySource {
    fn format(&self) -> &'static str {
        "memory"
    }

    fn datasets(&self) -> &[DatasetInfo] {
        &self.datasets
    }

    fn load(&mut self, index: usize) -> Result<Vec<f64>> {
        let Some(values) = self.values.get(index) else {
            bail!(
                "column {} does not exist (source has {} columns)",
                index + 1,
                self.values.len()
            );
        };
        self.probe.record(index);
        Ok(values.clone())
    }
}
