use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tabular_infile::{IngestConfig, run_job};

/// Run the ingestion job described in a JSON config file and write the
/// converted columns to stdout as CSV, headed `description [unit]`.
fn main() -> Result<()> {
    let config_path: PathBuf = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .context("usage: tabin <config.json>")?;
    let config = IngestConfig::load(&config_path)?;

    let level = config.log_level.as_deref().unwrap_or("info");
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    run_job(&config, io::stdout().lock())
        .with_context(|| format!("running job from {}", config_path.display()))?;
    Ok(())
}
