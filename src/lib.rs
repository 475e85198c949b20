//! Typed ingestion of columnar scientific input files.
//!
//! A [`TabularInFile`] opens a structured file, reconciles the columns found
//! in the file with the logical columns a program asks for, validates their
//! units and serves the values converted to internal (SI) units.

pub mod config;
pub mod data;
pub mod error;
pub mod job;
pub mod units;

pub use config::{FilePaths, IngestConfig, InputContext};
pub use data::infile::TabularInFile;
pub use data::model::{ColumnInfo, ColumnLookup, DatasetInfo};
pub use data::source::{DataSource, LoadProbe, MemorySource};
pub use error::{ErrorKind, Result, TabularError};
pub use job::run_job;
pub use units::{SiUnits, UnitSystem};
