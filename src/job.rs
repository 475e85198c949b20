use std::io::Write;

use anyhow::{Context, Result};
use log::info;

use crate::config::{IngestConfig, InputContext};
use crate::data::infile::TabularInFile;
use crate::data::model::ColumnInfo;
use crate::units::UnitSystem;

/// Header label for an output column: `description [unit]`, with the unit
/// the values are written in. Specific quantities keep an arbitrary scale.
fn header(col: &ColumnInfo, units: &dyn UnitSystem) -> String {
    let unit = match col.quantity.as_str() {
        "" => "1",
        "specific" => "arbitrary",
        quantity => units.internal_unit(quantity).unwrap_or(col.unit.as_str()),
    };
    format!("{} [{unit}]", col.description)
}

/// Run the ingestion job of `config` and write the converted rows as CSV to
/// `out`. Returns the number of data rows written.
pub fn run_job(config: &IngestConfig, out: impl Write) -> Result<usize> {
    let job = config
        .job
        .as_ref()
        .context("configuration does not describe a job")?;

    let context = InputContext::from_config(config);
    let mut infile = TabularInFile::open(&context, &job.file, &job.description)?;
    infile.use_columns(&job.columns)?;
    for decl in &job.declare {
        infile.add_column(&decl.description, &decl.quantity, &decl.unit)?;
    }

    let headers: Vec<String> = infile
        .columns()
        .iter()
        .map(|col| header(col, context.units.as_ref()))
        .collect();
    let rows = infile.read_all_rows()?;
    infile.close();

    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(&headers).context("writing CSV header")?;
    for row in &rows {
        writer
            .write_record(row.iter().map(|v| v.to_string()))
            .context("writing CSV row")?;
    }
    writer.flush().context("flushing CSV output")?;

    info!("wrote {} rows x {} columns", rows.len(), headers.len());
    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::SiUnits;

    fn declared(description: &str, quantity: &str, unit: &str) -> ColumnInfo {
        let mut col = ColumnInfo::unnamed(1);
        col.description = description.to_string();
        col.quantity = quantity.to_string();
        col.unit = unit.to_string();
        col
    }

    #[test]
    fn headers_name_the_output_unit() {
        let units = SiUnits::new();
        assert_eq!(header(&declared("radius", "length", "km"), &units), "radius [m]");
        assert_eq!(header(&declared("weight", "", "1"), &units), "weight [1]");
        assert_eq!(header(&declared("flux", "specific", "Jy"), &units), "flux [arbitrary]");
    }

    #[test]
    fn config_without_job_fails() {
        let config = IngestConfig::default();
        let err = run_job(&config, Vec::new()).unwrap_err();
        assert!(err.to_string().contains("does not describe a job"));
    }
}
