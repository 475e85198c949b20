use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::units::{SiUnits, UnitSystem};

// ---------------------------------------------------------------------------
// Configuration file
// ---------------------------------------------------------------------------

/// Ingestion settings, usually read from a JSON file:
///
/// ```json
/// {
///   "input_path": "data/",
///   "caller": "FileSED sed",
///   "log_level": "info",
///   "job": {
///     "file": "sample_sed.parquet",
///     "description": "spectral energy distribution",
///     "columns": "wavelength, luminosity",
///     "declare": [
///       { "description": "wavelength", "quantity": "wavelength", "unit": "micron" },
///       { "description": "specific luminosity", "quantity": "specific", "unit": "W/micron" }
///     ]
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Directory against which relative input filenames are resolved.
    pub input_path: PathBuf,
    /// Name used for the reading party in log messages.
    pub caller: String,
    /// Default `env_logger` filter when `RUST_LOG` is not set.
    pub log_level: Option<String>,
    /// Ingestion job run by the `tabin` binary.
    pub job: Option<JobConfig>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("."),
            caller: "TabularInFile".to_string(),
            log_level: None,
            job: None,
        }
    }
}

/// One file to ingest with its logical column layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    pub file: String,
    #[serde(default = "default_job_description")]
    pub description: String,
    /// Comma-separated logical column names passed to `use_columns`.
    #[serde(default)]
    pub columns: String,
    pub declare: Vec<ColumnDecl>,
}

fn default_job_description() -> String {
    "tabular data".to_string()
}

/// Arguments of a single `add_column` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDecl {
    pub description: String,
    #[serde(default)]
    pub quantity: String,
    #[serde(default)]
    pub unit: String,
}

impl IngestConfig {
    /// Read and parse a JSON configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: IngestConfig = serde_json::from_str(&text)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        Ok(config)
    }

    pub fn file_paths(&self) -> FilePaths {
        FilePaths::new(&self.input_path)
    }
}

// ---------------------------------------------------------------------------
// Path resolution
// ---------------------------------------------------------------------------

/// Maps logical input filenames to concrete paths.
#[derive(Debug, Clone)]
pub struct FilePaths {
    input_path: PathBuf,
}

impl Default for FilePaths {
    fn default() -> Self {
        Self::new(".")
    }
}

impl FilePaths {
    pub fn new(input_path: impl Into<PathBuf>) -> Self {
        Self {
            input_path: input_path.into(),
        }
    }

    /// Absolute filenames are returned unchanged.
    pub fn input(&self, filename: &str) -> PathBuf {
        let name = Path::new(filename);
        if name.is_absolute() {
            name.to_path_buf()
        } else {
            self.input_path.join(name)
        }
    }
}

// ---------------------------------------------------------------------------
// Input context – who reads, from where, with which units
// ---------------------------------------------------------------------------

/// Everything an input file needs from the party opening it.
#[derive(Clone)]
pub struct InputContext {
    pub caller: String,
    pub paths: FilePaths,
    pub units: Arc<dyn UnitSystem>,
}

impl InputContext {
    pub fn new(caller: impl Into<String>, paths: FilePaths, units: Arc<dyn UnitSystem>) -> Self {
        Self {
            caller: caller.into(),
            paths,
            units,
        }
    }

    /// Context with SI units, built from a loaded configuration.
    pub fn from_config(config: &IngestConfig) -> Self {
        Self::new(
            config.caller.clone(),
            config.file_paths(),
            Arc::new(SiUnits::new()),
        )
    }
}

impl std::fmt::Debug for InputContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputContext")
            .field("caller", &self.caller)
            .field("paths", &self.paths)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_names_join_input_path() {
        let paths = FilePaths::new("/data/run1");
        assert_eq!(paths.input("sed.csv"), PathBuf::from("/data/run1/sed.csv"));
    }

    #[test]
    fn absolute_names_pass_through() {
        let paths = FilePaths::new("/data/run1");
        assert_eq!(paths.input("/tmp/sed.csv"), PathBuf::from("/tmp/sed.csv"));
    }

    #[test]
    fn config_defaults_fill_missing_fields() {
        let config: IngestConfig = serde_json::from_str(r#"{ "input_path": "in" }"#).unwrap();
        assert_eq!(config.input_path, PathBuf::from("in"));
        assert_eq!(config.caller, "TabularInFile");
        assert!(config.job.is_none());
    }

    #[test]
    fn job_declarations_parse() {
        let text = r#"{
            "job": {
                "file": "sed.json",
                "columns": "lambda, flux",
                "declare": [
                    { "description": "wavelength", "quantity": "wavelength", "unit": "micron" },
                    { "description": "flux", "quantity": "specific" }
                ]
            }
        }"#;
        let config: IngestConfig = serde_json::from_str(text).unwrap();
        let job = config.job.unwrap();
        assert_eq!(job.description, "tabular data");
        assert_eq!(job.declare.len(), 2);
        assert_eq!(job.declare[1].unit, "");
    }
}
