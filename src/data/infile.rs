use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info};

use super::loader::open_source;
use super::model::{ColumnInfo, ColumnLookup};
use super::source::DataSource;
use crate::config::InputContext;
use crate::error::{Result, TabularError};
use crate::units::{UnitSystem, wave_exponent_for_specific};

/// Column data loaded from the source, one buffer per logical column.
#[derive(Debug)]
struct Materialized {
    columns: Vec<Vec<f64>>,
    num_rows: usize,
}

// ---------------------------------------------------------------------------
// TabularInFile
// ---------------------------------------------------------------------------

/// Reads columnar numeric data from a structured input file and serves it in
/// internal units.
///
/// Usage follows a fixed protocol:
///
/// 1. [`open`](Self::open) discovers the physical columns in the file;
/// 2. [`use_columns`](Self::use_columns) optionally selects and reorders
///    physical columns by name;
/// 3. [`add_column`](Self::add_column) declares each logical column with its
///    quantity and default unit;
/// 4. [`read_row`](Self::read_row), [`read_all_rows`](Self::read_all_rows) or
///    [`read_all_columns`](Self::read_all_columns) retrieve converted values.
///
/// Column data is loaded from the source on the first read, exactly once.
pub struct TabularInFile {
    source: Option<Box<dyn DataSource>>,
    path: PathBuf,
    units: Arc<dyn UnitSystem>,

    /// Candidate columns: file header info, possibly remapped, plus columns
    /// appended for files without header info.
    columns: Vec<ColumnInfo>,
    has_file_info: bool,
    remapped: bool,

    /// Index into `columns` for each declared logical column.
    logical: Vec<usize>,
    /// Logical index for each physical column (zero-based), if mapped.
    logical_indices: Vec<Option<usize>>,

    data: Option<Materialized>,
    current_row: usize,
}

impl TabularInFile {
    /// Open `filename` (resolved against the context's input path) and
    /// discover its columns. The format follows the filename extension.
    pub fn open(item: &InputContext, filename: &str, description: &str) -> Result<Self> {
        let path = item.paths.input(filename);
        let source = open_source(&path).map_err(|e| TabularError::io(&path, &e))?;
        Ok(Self::with_source(item, source, path, description))
    }

    /// Wrap an already opened source, e.g. a [`MemorySource`](super::source::MemorySource).
    pub fn from_source(
        item: &InputContext,
        source: Box<dyn DataSource>,
        description: &str,
    ) -> Self {
        let path = PathBuf::from(format!("<{}>", source.format()));
        Self::with_source(item, source, path, description)
    }

    fn with_source(
        item: &InputContext,
        source: Box<dyn DataSource>,
        path: PathBuf,
        description: &str,
    ) -> Self {
        let columns: Vec<ColumnInfo> = source
            .datasets()
            .iter()
            .enumerate()
            .map(|(i, ds)| ColumnInfo::from_dataset(i + 1, ds))
            .collect();
        for col in &columns {
            debug!("found dataset '{}' ({})", col.title, col.unit);
        }

        info!(
            "{} reads {} from {} file {}...",
            item.caller,
            description,
            source.format(),
            path.display()
        );

        TabularInFile {
            has_file_info: !columns.is_empty(),
            source: Some(source),
            path,
            units: Arc::clone(&item.units),
            columns,
            remapped: false,
            logical: Vec::new(),
            logical_indices: Vec::new(),
            data: None,
            current_row: 0,
        }
    }

    /// Release the underlying file. Calling it again is harmless; dropping the
    /// reader has the same effect.
    pub fn close(&mut self) {
        if self.source.take().is_some() {
            debug!("closed {}", self.path.display());
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the file provided column names.
    pub fn has_file_info(&self) -> bool {
        self.has_file_info
    }

    pub fn num_logical_columns(&self) -> usize {
        self.logical.len()
    }

    /// Declared columns in logical order.
    pub fn columns(&self) -> Vec<&ColumnInfo> {
        self.logical.iter().map(|&i| &self.columns[i]).collect()
    }

    /// Total row count, known once the data has been loaded.
    pub fn num_rows(&self) -> Option<usize> {
        self.data.as_ref().map(|d| d.num_rows)
    }

    // -----------------------------------------------------------------------
    // Column mapping
    // -----------------------------------------------------------------------

    /// Select physical columns by their header names.
    ///
    /// `columns` is a comma-separated list of names; whitespace inside each
    /// name is squeezed to single spaces and trimmed. Each name must match
    /// exactly one column title. Afterwards the program only sees these
    /// columns, in the listed order, and subsequent [`add_column`](Self::add_column)
    /// calls consume them one by one. An empty string does nothing.
    pub fn use_columns(&mut self, columns: &str) -> Result<()> {
        let columns = squeeze(columns);
        if columns.is_empty() {
            return Ok(());
        }

        if !self.logical.is_empty() {
            return Err(TabularError::Protocol(
                "program columns were declared before requesting column remapping".into(),
            ));
        }
        if self.remapped {
            return Err(TabularError::Protocol(
                "column remapping was already requested for this file".into(),
            ));
        }
        if !self.has_file_info {
            return Err(TabularError::Protocol(
                "requesting logical columns but there is no column info in the file".into(),
            ));
        }

        let mut remapped = Vec::new();
        for name in columns.split(',') {
            let name = squeeze(name);
            match ColumnLookup::by_title(&self.columns, &name) {
                ColumnLookup::Index(i) => remapped.push(self.columns[i].clone()),
                ColumnLookup::NotFound => {
                    return Err(TabularError::Protocol(format!(
                        "no column description in file header matches logical name '{name}'"
                    )));
                }
                ColumnLookup::Ambiguous => {
                    return Err(TabularError::Protocol(format!(
                        "multiple column descriptions in file header match logical name '{name}'"
                    )));
                }
            }
        }

        self.columns = remapped;
        self.remapped = true;
        Ok(())
    }

    /// Declare the next logical column.
    ///
    /// `quantity` is one of the unit system's quantities, `""` for a
    /// dimensionless column, or `"specific"` for a per-wavelength or
    /// per-frequency value in arbitrary scale. `default_unit` applies when
    /// the file gives no unit for the column.
    pub fn add_column(&mut self, description: &str, quantity: &str, default_unit: &str) -> Result<()> {
        if self.data.is_some() {
            return Err(TabularError::Protocol(
                "columns cannot be declared after data has been read".into(),
            ));
        }

        let logical_index = self.logical.len();
        let number = logical_index + 1;
        let index = self.target_column(description, logical_index)?;

        let physical = self.columns[index].physical_index;
        if self.logical_indices.len() < physical {
            self.logical_indices.resize(physical, None);
        }
        if let Some(previous) = self.logical_indices[physical - 1] {
            return Err(TabularError::Protocol(format!(
                "multiple logical columns ({},{number}) map to the same physical column ({physical})",
                previous + 1
            )));
        }

        let wavelength_index = self.nearest_wavelength_column();
        let col = &self.columns[index];
        let mut unit = if col.unit_from_file {
            col.unit.clone()
        } else {
            default_unit.to_string()
        };
        let mut conversion_factor = 1.0;
        let mut wave_exponent = 0;
        let mut wave_index = 0;

        match quantity {
            "" => {
                if !unit.is_empty() && unit != "1" {
                    return Err(TabularError::Validation(format!(
                        "invalid units '{unit}' for dimensionless quantity in column {number}"
                    )));
                }
                unit = "1".to_string();
            }
            "specific" => {
                wave_exponent = wave_exponent_for_specific(self.units.as_ref(), &unit)
                    .ok_or_else(|| {
                        TabularError::Validation(format!(
                            "invalid units '{unit}' for specific quantity in column {number}"
                        ))
                    })?;
                if wave_exponent != 0 {
                    wave_index = wavelength_index.ok_or_else(|| {
                        TabularError::Validation(format!(
                            "no preceding wavelength column for specific quantity in column {number}"
                        ))
                    })?;
                }
            }
            _ => {
                if !self.units.has(quantity, &unit) {
                    return Err(TabularError::Validation(format!(
                        "invalid units '{unit}' for quantity '{quantity}' in column {number}"
                    )));
                }
                conversion_factor = self.units.to_internal(quantity, &unit, 1.0);
            }
        }

        let col = &mut self.columns[index];
        col.description = description.to_string();
        col.quantity = quantity.to_string();
        col.unit = unit;
        col.conversion_factor = conversion_factor;
        col.wave_exponent = wave_exponent;
        col.wave_index = wave_index;

        self.logical_indices[physical - 1] = Some(logical_index);
        self.logical.push(index);

        let col = &self.columns[index];
        let mut message = format!("  Column {number}: {} ({})", col.description, col.unit);
        if !col.title.is_empty() {
            message.push_str(" <-- ");
            if physical != number {
                message.push_str(&format!("column {physical}: "));
            }
            message.push_str(&col.title);
        }
        info!("{message}");
        Ok(())
    }

    /// Pick the candidate column for a new logical column: columns are
    /// consumed in order, either file order or the order given to
    /// [`use_columns`](Self::use_columns). Files without header info grow a
    /// new column.
    fn target_column(&mut self, description: &str, position: usize) -> Result<usize> {
        if position < self.columns.len() {
            return Ok(position);
        }
        if self.has_file_info {
            return Err(TabularError::Protocol(format!(
                "no physical column left for logical column {} ('{description}'); the file provides {}",
                position + 1,
                self.columns.len()
            )));
        }
        self.columns.push(ColumnInfo::unnamed(position + 1));
        Ok(self.columns.len() - 1)
    }

    /// Logical index of the most recently declared "wavelength" column.
    fn nearest_wavelength_column(&self) -> Option<usize> {
        self.logical
            .iter()
            .rposition(|&i| self.columns[i].description == "wavelength")
    }

    // -----------------------------------------------------------------------
    // Reading
    // -----------------------------------------------------------------------

    /// Load all declared columns from the source, once.
    fn read_data(&mut self) -> Result<()> {
        if self.data.is_some() {
            return Ok(());
        }
        let Some(source) = self.source.as_mut() else {
            return Err(TabularError::Io {
                path: self.path.clone(),
                detail: "file was closed before its data was read".into(),
            });
        };

        let mut columns = Vec::with_capacity(self.logical.len());
        let mut num_rows = None;
        for &i in &self.logical {
            let col = &self.columns[i];
            let values = source
                .load(col.physical_index - 1)
                .map_err(|e| TabularError::io(&self.path, &e))?;
            match num_rows {
                None => num_rows = Some(values.len()),
                Some(n) if n != values.len() => {
                    return Err(TabularError::Validation(format!(
                        "row-count mismatch across columns: column {} has {} rows, expected {n}",
                        col.physical_index,
                        values.len()
                    )));
                }
                Some(_) => {}
            }
            columns.push(values);
        }

        let num_rows = num_rows.unwrap_or(0);
        debug!("loaded {} columns x {num_rows} rows from {}", columns.len(), self.path.display());
        self.data = Some(Materialized { columns, num_rows });
        Ok(())
    }

    /// Read the next row into `values`, converted to internal units.
    ///
    /// `values` is resized to the number of logical columns. Returns `false`
    /// once all rows have been consumed, leaving `values` untouched.
    pub fn read_row(&mut self, values: &mut Vec<f64>) -> Result<bool> {
        if self.logical.is_empty() {
            return Err(TabularError::Protocol(
                "no columns were declared for the input file".into(),
            ));
        }
        self.read_data()?;

        let Some(data) = self.data.as_ref() else {
            return Ok(false);
        };
        if self.current_row >= data.num_rows {
            return Ok(false);
        }

        if values.len() != self.logical.len() {
            values.resize(self.logical.len(), 0.0);
        }
        // Logical order: a wavelength column always precedes the specific
        // columns that refer to it.
        for (l, &i) in self.logical.iter().enumerate() {
            let raw = data.columns[l][self.current_row];
            let value = self.columns[i].convert(raw, values);
            values[l] = value;
        }
        self.current_row += 1;
        Ok(true)
    }

    /// Read all remaining rows.
    pub fn read_all_rows(&mut self) -> Result<Vec<Vec<f64>>> {
        let mut rows = Vec::new();
        loop {
            let mut row = Vec::new();
            if !self.read_row(&mut row)? {
                break;
            }
            rows.push(row);
        }
        Ok(rows)
    }

    /// Read all remaining rows and return them as one vector per logical column.
    pub fn read_all_columns(&mut self) -> Result<Vec<Vec<f64>>> {
        let rows = self.read_all_rows()?;
        let mut columns = vec![Vec::with_capacity(rows.len()); self.logical.len()];
        for row in &rows {
            for (column, &value) in columns.iter_mut().zip(row) {
                column.push(value);
            }
        }
        Ok(columns)
    }

    /// Read the next row into a fixed-size array; `N` must equal the number
    /// of logical columns.
    pub fn read_row_array<const N: usize>(&mut self) -> Result<Option<[f64; N]>> {
        self.check_arity(N)?;
        let mut row = Vec::with_capacity(N);
        if !self.read_row(&mut row)? {
            return Ok(None);
        }
        let mut out = [0.0; N];
        out.copy_from_slice(&row);
        Ok(Some(out))
    }

    /// Like [`read_all_columns`](Self::read_all_columns), destructurable as
    /// `let [wavelength, flux] = file.read_all_columns_array()?;`.
    pub fn read_all_columns_array<const N: usize>(&mut self) -> Result<[Vec<f64>; N]> {
        self.check_arity(N)?;
        let columns = self.read_all_columns()?;
        columns.try_into().map_err(|columns: Vec<Vec<f64>>| {
            TabularError::Protocol(format!("expected {N} columns, read {}", columns.len()))
        })
    }

    fn check_arity(&self, n: usize) -> Result<()> {
        if n != self.logical.len() {
            return Err(TabularError::Protocol(format!(
                "{n} values requested but {} columns were declared",
                self.logical.len()
            )));
        }
        Ok(())
    }

    /// Nonleaf node markers only exist in line-oriented text files.
    pub fn read_non_leaf(&mut self) -> Result<Option<(i32, i32, i32)>> {
        Err(TabularError::NotImplemented("reading nonleaf node specifications"))
    }
}

impl Drop for TabularInFile {
    fn drop(&mut self) {
        self.close();
    }
}

/// Collapse whitespace runs into single spaces and trim the ends.
fn squeeze(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
