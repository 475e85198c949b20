use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use arrow::array::{Array, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Float64Type};
use parquet::arrow::ProjectionMask;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::Deserialize;

use super::model::DatasetInfo;
use super::source::DataSource;

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Open a structured data source.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` – every numeric column is a dataset, unit in field metadata `unit`
/// * `.csv`/`.tsv` – one column per dataset, optional `name [unit]` header row
/// * `.json` – `[{ "name": ..., "unit": ..., "values": [...] }, ...]`
///
/// Only the column layout is read here; values are loaded per column on demand.
pub fn open_source(path: &Path) -> Result<Box<dyn DataSource>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "parquet" | "pq" => Ok(Box::new(ParquetSource::open(path)?)),
        "csv" => Ok(Box::new(CsvSource::open(path, b',')?)),
        "tsv" => Ok(Box::new(CsvSource::open(path, b'\t')?)),
        "json" => Ok(Box::new(JsonSource::open(path)?)),
        other => bail!("Unsupported file extension: .{other}"),
    }
}

// ---------------------------------------------------------------------------
// Parquet source
// ---------------------------------------------------------------------------

/// Parquet file whose numeric top-level columns are the datasets.
///
/// Files written by Pandas or Polars keep per-field metadata, so a unit can
/// be attached with e.g. `pa.field("wavelength", pa.float64(), metadata={"unit": "micron"})`.
pub struct ParquetSource {
    file: File,
    datasets: Vec<DatasetInfo>,
    /// Arrow field index of each dataset.
    field_indices: Vec<usize>,
}

impl ParquetSource {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).context("opening parquet file")?;
        let builder = ParquetRecordBatchReaderBuilder::try_new(
            file.try_clone().context("duplicating parquet file handle")?,
        )
        .context("reading parquet metadata")?;

        let mut datasets = Vec::new();
        let mut field_indices = Vec::new();
        for (i, field) in builder.schema().fields().iter().enumerate() {
            if !field.data_type().is_numeric() {
                continue;
            }
            datasets.push(DatasetInfo {
                name: field.name().clone(),
                unit: field.metadata().get("unit").cloned(),
            });
            field_indices.push(i);
        }

        Ok(ParquetSource {
            file,
            datasets,
            field_indices,
        })
    }
}

impl DataSource for ParquetSource {
    fn format(&self) -> &'static str {
        "parquet"
    }

    fn datasets(&self) -> &[DatasetInfo] {
        &self.datasets
    }

    fn load(&mut self, index: usize) -> Result<Vec<f64>> {
        let field_index = *self
            .field_indices
            .get(index)
            .with_context(|| format!("parquet file has no numeric column {}", index + 1))?;
        let name = &self.datasets[index].name;

        let file = self.file.try_clone().context("duplicating parquet file handle")?;
        let builder =
            ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
        let mask = ProjectionMask::roots(builder.parquet_schema(), [field_index]);
        let reader = builder
            .with_projection(mask)
            .build()
            .context("building parquet reader")?;

        let mut values = Vec::new();
        for batch_result in reader {
            let batch = batch_result
                .with_context(|| format!("reading parquet record batch for '{name}'"))?;
            let column = cast(batch.column(0), &DataType::Float64)
                .with_context(|| format!("converting '{name}' to Float64"))?;
            let floats = column.as_primitive::<Float64Type>();
            values.reserve(floats.len());
            values.extend(floats.iter().map(|v| v.unwrap_or(f64::NAN)));
        }
        Ok(values)
    }
}

// ---------------------------------------------------------------------------
// Delimited text source
// ---------------------------------------------------------------------------

/// Column-oriented delimited text.
///
/// Lines starting with `#` are comments.  When the first record is not
/// entirely numeric it is a header; each cell names a column and may carry
/// a unit in brackets or parentheses:
///
/// ```text
/// wavelength [micron], luminosity [W/micron], label
/// 0.1, 3.5e20, 1
/// ```
pub struct CsvSource {
    path: PathBuf,
    delimiter: u8,
    datasets: Vec<DatasetInfo>,
    has_header: bool,
    /// Number of values expected on each data row.
    width: usize,
    /// Parsed body, filled on the first load.
    columns: Option<Vec<Vec<f64>>>,
}

impl CsvSource {
    pub fn open(path: &Path, delimiter: u8) -> Result<Self> {
        let mut source = CsvSource {
            path: path.to_path_buf(),
            delimiter,
            datasets: Vec::new(),
            has_header: false,
            width: 0,
            columns: None,
        };

        let mut reader = source.reader()?;
        let mut first = csv::StringRecord::new();
        if reader.read_record(&mut first).context("reading first CSV row")? {
            source.width = first.len();
            source.has_header = !first.iter().all(|cell| cell.parse::<f64>().is_ok());
            if source.has_header {
                source.datasets = first.iter().map(parse_header_cell).collect();
            }
        }
        Ok(source)
    }

    fn reader(&self) -> Result<csv::Reader<File>> {
        csv::ReaderBuilder::new()
            .has_headers(false)
            .delimiter(self.delimiter)
            .comment(Some(b'#'))
            .trim(csv::Trim::All)
            .flexible(true)
            .from_path(&self.path)
            .context("opening CSV")
    }

    fn parse_body(&self) -> Result<Vec<Vec<f64>>> {
        let mut columns = vec![Vec::new(); self.width];
        let skip = usize::from(self.has_header);

        for (row_no, result) in self.reader()?.records().enumerate().skip(skip) {
            let record = result.with_context(|| format!("CSV row {row_no}"))?;
            if record.len() < self.width {
                bail!(
                    "CSV row {row_no}: expected {} values, found {}",
                    self.width,
                    record.len()
                );
            }
            for (col, column) in columns.iter_mut().enumerate() {
                let cell = record.get(col).unwrap_or("");
                let value = cell.parse::<f64>().with_context(|| {
                    format!("CSV row {row_no}, column {}: '{cell}' is not a number", col + 1)
                })?;
                column.push(value);
            }
        }
        Ok(columns)
    }
}

/// Split `name [unit]` or `name (unit)` into its parts.
fn parse_header_cell(cell: &str) -> DatasetInfo {
    let cell = cell.trim();
    for (open, close) in [('[', ']'), ('(', ')')] {
        if let Some(body) = cell.strip_suffix(close) {
            if let Some(pos) = body.rfind(open) {
                let name = body[..pos].trim();
                let unit = body[pos + open.len_utf8()..].trim();
                return DatasetInfo::new(name, Some(unit));
            }
        }
    }
    DatasetInfo::new(cell, None)
}

impl DataSource for CsvSource {
    fn format(&self) -> &'static str {
        if self.delimiter == b'\t' { "tsv" } else { "csv" }
    }

    fn datasets(&self) -> &[DatasetInfo] {
        &self.datasets
    }

    fn load(&mut self, index: usize) -> Result<Vec<f64>> {
        if index >= self.width {
            bail!("CSV file has {} columns, column {} requested", self.width, index + 1);
        }
        let columns = match self.columns.take() {
            Some(columns) => columns,
            None => self.parse_body()?,
        };
        let values = columns[index].clone();
        self.columns = Some(columns);
        Ok(values)
    }
}

// ---------------------------------------------------------------------------
// JSON source
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct JsonDataset {
    name: String,
    #[serde(default)]
    unit: Option<String>,
    values: Vec<Option<f64>>,
}

/// Expected JSON schema (a list of named datasets):
///
/// ```json
/// [
///   { "name": "wavelength", "unit": "micron", "values": [0.1, 0.2, 0.4] },
///   { "name": "luminosity", "unit": "W/micron", "values": [1e20, 3e20, 2e20] }
/// ]
/// ```
///
/// `null` values are read as NaN.
pub struct JsonSource {
    datasets: Vec<DatasetInfo>,
    values: Vec<Vec<Option<f64>>>,
}

impl JsonSource {
    pub fn open(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).context("reading JSON file")?;
        let records: Vec<JsonDataset> =
            serde_json::from_str(&text).context("parsing JSON datasets")?;

        let (datasets, values) = records
            .into_iter()
            .map(|ds| (DatasetInfo { name: ds.name, unit: ds.unit }, ds.values))
            .unzip();
        Ok(JsonSource { datasets, values })
    }
}

impl DataSource for JsonSource {
    fn format(&self) -> &'static str {
        "json"
    }

    fn datasets(&self) -> &[DatasetInfo] {
        &self.datasets
    }

    fn load(&mut self, index: usize) -> Result<Vec<f64>> {
        let values = self
            .values
            .get(index)
            .with_context(|| format!("JSON file has no dataset {}", index + 1))?;
        Ok(values.iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Write `contents` to a uniquely named file in the system temp directory.
    fn write_temp(name: &str, contents: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("tabin_loader_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    // -----------------------------------------------------------------------
    // header cells
    // -----------------------------------------------------------------------

    #[test]
    fn header_cell_with_brackets() {
        assert_eq!(
            parse_header_cell(" wavelength [micron] "),
            DatasetInfo::new("wavelength", Some("micron"))
        );
        assert_eq!(
            parse_header_cell("flux (W/m2/Hz)"),
            DatasetInfo::new("flux", Some("W/m2/Hz"))
        );
        assert_eq!(parse_header_cell("index"), DatasetInfo::new("index", None));
    }

    // -----------------------------------------------------------------------
    // CSV
    // -----------------------------------------------------------------------

    #[test]
    fn csv_with_header_reports_datasets() {
        let path = write_temp(
            "header.csv",
            "# an SED\nwavelength [micron], lum [W/micron], weight\n1, 10, 0.5\n2, 20, 0.25\n",
        );
        let mut src = open_source(&path).unwrap();
        assert_eq!(src.format(), "csv");
        assert_eq!(src.datasets().len(), 3);
        assert_eq!(src.datasets()[1], DatasetInfo::new("lum", Some("W/micron")));
        assert_eq!(src.datasets()[2].unit, None);
        assert_eq!(src.load(1).unwrap(), vec![10.0, 20.0]);
        assert_eq!(src.load(0).unwrap(), vec![1.0, 2.0]);
    }

    #[test]
    fn headerless_tsv_has_no_datasets() {
        let path = write_temp("plain.tsv", "1\t2\n3\t4\n5\t6\n");
        let mut src = open_source(&path).unwrap();
        assert_eq!(src.format(), "tsv");
        assert!(src.datasets().is_empty());
        assert_eq!(src.load(1).unwrap(), vec![2.0, 4.0, 6.0]);
        assert!(src.load(2).is_err());
    }

    #[test]
    fn csv_short_row_is_an_error() {
        let path = write_temp("short.csv", "a, b\n1, 2\n3\n");
        let mut src = open_source(&path).unwrap();
        let err = src.load(0).unwrap_err();
        assert!(format!("{err:#}").contains("expected 2 values"));
    }

    // -----------------------------------------------------------------------
    // JSON
    // -----------------------------------------------------------------------

    #[test]
    fn json_datasets_with_nulls() {
        let path = write_temp(
            "sed.json",
            r#"[{"name": "wavelength", "unit": "micron", "values": [1, 2]},
                {"name": "count", "values": [3, null]}]"#,
        );
        let mut src = open_source(&path).unwrap();
        assert_eq!(src.datasets()[0], DatasetInfo::new("wavelength", Some("micron")));
        assert_eq!(src.datasets()[1].unit, None);
        let counts = src.load(1).unwrap();
        assert_eq!(counts[0], 3.0);
        assert!(counts[1].is_nan());
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let err = open_source(Path::new("table.xlsx")).err().unwrap();
        assert!(err.to_string().contains(".xlsx"));
    }
}
