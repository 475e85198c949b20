use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{Float32Array, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use tabular_infile::config::{ColumnDecl, JobConfig};
use tabular_infile::{
    ErrorKind, FilePaths, IngestConfig, InputContext, SiUnits, TabularInFile, run_job,
};

/// Create a temporary directory with a unique name for test isolation.
fn make_test_dir(suffix: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "tabular_infile_test_{suffix}_{}",
        std::process::id()
    ));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn cleanup(dir: &Path) {
    let _ = fs::remove_dir_all(dir);
}

fn context(dir: &Path) -> InputContext {
    InputContext::new("IngestTest", FilePaths::new(dir), Arc::new(SiUnits::new()))
}

fn unit_field(name: &str, data_type: DataType, unit: &str) -> Field {
    Field::new(name, data_type, true)
        .with_metadata(HashMap::from([("unit".to_string(), unit.to_string())]))
}

// ---------------------------------------------------------------------------
// Parquet
// ---------------------------------------------------------------------------

fn write_sed_parquet(path: &Path) {
    let schema = Arc::new(Schema::new(vec![
        unit_field("lum", DataType::Float32, "W"),
        Field::new("label", DataType::Utf8, false),
        unit_field("wavelength", DataType::Float64, "m"),
        Field::new("count", DataType::Int64, false),
    ]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Float32Array::from(vec![10.0f32, 20.0, 30.0])),
            Arc::new(StringArray::from(vec!["a", "b", "c"])),
            Arc::new(Float64Array::from(vec![1.0, 2.0, 4.0])),
            Arc::new(Int64Array::from(vec![7, 8, 9])),
        ],
    )
    .unwrap();
    let file = fs::File::create(path).unwrap();
    let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();
}

#[test]
fn parquet_columns_remap_and_convert() {
    let dir = make_test_dir("parquet");
    write_sed_parquet(&dir.join("sed.parquet"));

    let mut infile = TabularInFile::open(&context(&dir), "sed.parquet", "an SED").unwrap();
    assert!(infile.has_file_info());
    infile.use_columns("wavelength, lum, count").unwrap();
    infile.add_column("wavelength", "wavelength", "micron").unwrap();
    infile.add_column("specific luminosity", "specific", "").unwrap();
    infile.add_column("count", "", "").unwrap();

    let columns = infile.columns();
    assert_eq!(columns[0].unit, "m");
    assert_eq!(columns[1].wave_exponent, -1);
    assert_eq!(columns[2].physical_index, 3);

    let [wavelength, lum, count] = infile.read_all_columns_array::<3>().unwrap();
    assert_eq!(wavelength, vec![1.0, 2.0, 4.0]);
    assert_eq!(lum, vec![10.0, 10.0, 7.5]);
    assert_eq!(count, vec![7.0, 8.0, 9.0]);

    infile.close();
    cleanup(&dir);
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

#[test]
fn csv_rows_come_back_in_internal_units() {
    let dir = make_test_dir("csv");
    fs::write(
        dir.join("stars.csv"),
        "# positions\nx [pc], y [pc], mass [Msun]\n0, 1, 2\n3, 4, 5\n",
    )
    .unwrap();

    let mut infile = TabularInFile::open(&context(&dir), "stars.csv", "stars").unwrap();
    infile.use_columns("mass, x").unwrap();
    infile.add_column("mass", "mass", "").unwrap();
    infile.add_column("position x", "length", "").unwrap();

    let rows = infile.read_all_rows().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0][0], 2.0 * 1.98841e30);
    assert_eq!(rows[1][1], 3.0 * 3.0856775814913673e16);
    cleanup(&dir);
}

#[test]
fn headerless_csv_uses_default_units() {
    let dir = make_test_dir("headerless");
    fs::write(dir.join("plain.csv"), "0.5, 1\n1.0, 2\n").unwrap();

    let mut infile = TabularInFile::open(&context(&dir), "plain.csv", "plain data").unwrap();
    assert!(!infile.has_file_info());
    infile.add_column("wavelength", "wavelength", "micron").unwrap();
    infile.add_column("flux", "specific", "W/m2/micron").unwrap();

    let mut row = Vec::new();
    assert!(infile.read_row(&mut row).unwrap());
    assert_eq!(row, vec![0.5e-6, 1.0]);
    assert!(infile.read_row(&mut row).unwrap());
    assert!(!infile.read_row(&mut row).unwrap());
    cleanup(&dir);
}

#[test]
fn csv_with_bad_cell_fails_as_io_error() {
    let dir = make_test_dir("badcell");
    fs::write(dir.join("bad.csv"), "a, b\n1, 2\n3, oops\n").unwrap();

    let mut infile = TabularInFile::open(&context(&dir), "bad.csv", "bad data").unwrap();
    infile.add_column("a", "", "").unwrap();
    infile.add_column("b", "", "").unwrap();
    let err = infile.read_all_rows().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
    assert!(err.to_string().contains("oops"));
    cleanup(&dir);
}

// ---------------------------------------------------------------------------
// JSON
// ---------------------------------------------------------------------------

#[test]
fn json_row_count_mismatch_is_a_validation_error() {
    let dir = make_test_dir("json");
    fs::write(
        dir.join("uneven.json"),
        r#"[{"name": "a", "values": [1, 2, 3]}, {"name": "b", "values": [1, 2]}]"#,
    )
    .unwrap();

    let mut infile = TabularInFile::open(&context(&dir), "uneven.json", "uneven data").unwrap();
    infile.add_column("a", "", "").unwrap();
    infile.add_column("b", "", "").unwrap();
    let err = infile.read_all_columns().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    cleanup(&dir);
}

// ---------------------------------------------------------------------------
// opening
// ---------------------------------------------------------------------------

#[test]
fn missing_file_is_an_io_error() {
    let dir = make_test_dir("missing");
    let err = TabularInFile::open(&context(&dir), "absent.csv", "nothing")
        .err()
        .unwrap();
    assert_eq!(err.kind(), ErrorKind::Io);
    assert!(err.to_string().contains("absent.csv"));
    cleanup(&dir);
}

#[test]
fn unsupported_format_is_an_io_error() {
    let dir = make_test_dir("unsupported");
    fs::write(dir.join("table.h5"), b"\x89HDF").unwrap();
    let err = TabularInFile::open(&context(&dir), "table.h5", "hdf5 data")
        .err()
        .unwrap();
    assert_eq!(err.kind(), ErrorKind::Io);
    cleanup(&dir);
}

// ---------------------------------------------------------------------------
// job runner
// ---------------------------------------------------------------------------

fn decl(description: &str, quantity: &str, unit: &str) -> ColumnDecl {
    ColumnDecl {
        description: description.to_string(),
        quantity: quantity.to_string(),
        unit: unit.to_string(),
    }
}

#[test]
fn job_writes_converted_csv_with_unit_headers() {
    let dir = make_test_dir("job");
    fs::write(
        dir.join("sed.csv"),
        "weight, lum [W], wavelength [micron]\n0.5, 10, 1\n0.25, 20, 2\n",
    )
    .unwrap();

    let config = IngestConfig {
        input_path: dir.clone(),
        job: Some(JobConfig {
            file: "sed.csv".to_string(),
            description: "an SED".to_string(),
            columns: "wavelength, lum, weight".to_string(),
            declare: vec![
                decl("wavelength", "wavelength", ""),
                decl("specific luminosity", "specific", ""),
                decl("weight", "", ""),
            ],
        }),
        ..IngestConfig::default()
    };

    let mut out = Vec::new();
    assert_eq!(run_job(&config, &mut out).unwrap(), 2);

    let mut reader = csv::Reader::from_reader(out.as_slice());
    let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
    assert_eq!(
        headers,
        vec!["wavelength [m]", "specific luminosity [arbitrary]", "weight [1]"]
    );

    let rows: Vec<Vec<f64>> = reader
        .records()
        .map(|r| r.unwrap().iter().map(|v| v.parse().unwrap()).collect())
        .collect();
    assert_eq!(rows.len(), 2);
    assert_eq!((rows[0][0], rows[0][2]), (1e-6, 0.5));
    assert_eq!((rows[1][0], rows[1][2]), (2e-6, 0.25));
    for (row, want) in rows.iter().zip([1e7, 1e7]) {
        assert!((row[1] - want).abs() <= 1e-9 * want);
    }
    cleanup(&dir);
}
