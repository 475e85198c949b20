/// Data layer: sources, column model and the tabular reader.
///
/// Architecture:
/// ```text
///  .parquet / .csv / .tsv / .json / memory
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  open file → Box<dyn DataSource> (datasets + units)
///   └──────────┘
///        │
///        ▼
///   ┌───────────────┐
///   │ TabularInFile  │  use_columns / add_column → logical columns
///   └───────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ read_row  │  lazy load once → rows/columns in internal units
///   └──────────┘
/// ```

pub mod infile;
pub mod loader;
pub mod model;
pub mod source;
