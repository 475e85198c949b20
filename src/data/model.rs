// ---------------------------------------------------------------------------
// DatasetInfo – a physical column as reported by a source
// ---------------------------------------------------------------------------

/// Name and optional unit attribute of one dataset in a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetInfo {
    pub name: String,
    /// `None` when the dataset carries no unit attribute.
    pub unit: Option<String>,
}

impl DatasetInfo {
    pub fn new(name: impl Into<String>, unit: Option<&str>) -> Self {
        Self {
            name: name.into(),
            unit: unit.map(str::to_string),
        }
    }
}

// ---------------------------------------------------------------------------
// ColumnInfo – physical column enriched with program-side declarations
// ---------------------------------------------------------------------------

/// Everything known about one column: what the file says and what the
/// program declared for it.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnInfo {
    /// One-based position of the column in the source.
    pub physical_index: usize,
    /// Name found in the file header, empty without header info.
    pub title: String,
    /// Description given by the program.
    pub description: String,
    /// "" for dimensionless, "specific", or a unit-system quantity.
    pub quantity: String,
    pub unit: String,
    /// Input to internal unit factor.
    pub conversion_factor: f64,
    /// Wavelength exponent for "specific" quantities (0, -1 or -2).
    pub wave_exponent: i32,
    /// Logical index of the wavelength column used when `wave_exponent != 0`.
    pub wave_index: usize,
    /// Whether the unit came from the file rather than from a default.
    pub(crate) unit_from_file: bool,
}

impl ColumnInfo {
    /// Column discovered in the file header.
    pub fn from_dataset(physical_index: usize, dataset: &DatasetInfo) -> Self {
        Self {
            physical_index,
            title: dataset.name.clone(),
            unit: dataset.unit.clone().unwrap_or_default(),
            unit_from_file: dataset.unit.is_some(),
            ..Self::unnamed(physical_index)
        }
    }

    /// Column without any header information.
    pub fn unnamed(physical_index: usize) -> Self {
        Self {
            physical_index,
            title: String::new(),
            description: String::new(),
            quantity: String::new(),
            unit: String::new(),
            conversion_factor: 1.0,
            wave_exponent: 0,
            wave_index: 0,
            unit_from_file: false,
        }
    }

    /// Apply the unit conversion rule to a raw value. `row` holds the already
    /// converted values of the preceding logical columns.
    pub fn convert(&self, raw: f64, row: &[f64]) -> f64 {
        if self.wave_exponent != 0 {
            raw * row[self.wave_index].powi(self.wave_exponent)
        } else {
            raw * self.conversion_factor
        }
    }
}

// ---------------------------------------------------------------------------
// ColumnLookup – result of matching a name against column titles
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnLookup {
    NotFound,
    Ambiguous,
    Index(usize),
}

impl ColumnLookup {
    /// Find the single column whose title equals `name`.
    pub fn by_title(columns: &[ColumnInfo], name: &str) -> Self {
        let mut matches = columns
            .iter()
            .enumerate()
            .filter(|(_, col)| col.title == name)
            .map(|(i, _)| i);
        match (matches.next(), matches.next()) {
            (None, _) => ColumnLookup::NotFound,
            (Some(i), None) => ColumnLookup::Index(i),
            (Some(_), Some(_)) => ColumnLookup::Ambiguous,
        }
    }
}
