use std::collections::HashMap;
use std::sync::Arc;

use arrow::array::{Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use serde_json::json;

/// hc/k in micron kelvin.
const HC_OVER_K: f64 = 14387.77;

/// Planck curve per unit wavelength, arbitrary scale.
fn planck_lambda(lambda_micron: f64, temperature: f64) -> f64 {
    lambda_micron.powi(-5) / ((HC_OVER_K / (lambda_micron * temperature)).exp() - 1.0)
}

/// Relative strength of an H-alpha line on top of the continuum.
fn h_alpha(lambda_micron: f64) -> f64 {
    let offset = (lambda_micron - 0.6563) / 0.002;
    1.0 + 4.0 * (-0.5 * offset * offset).exp()
}

fn field_with_unit(name: &str, unit: &str) -> Field {
    Field::new(name, DataType::Float64, false)
        .with_metadata(HashMap::from([("unit".to_string(), unit.to_string())]))
}

/// Writes `sample_sed.{parquet,csv,json}` and a matching `sample_job.json`
/// in the current directory.
fn main() {
    // Log-spaced wavelengths 0.1 → 10 micron
    let n = 200;
    let wavelengths: Vec<f64> = (0..n)
        .map(|i| 10f64.powf(-1.0 + 2.0 * i as f64 / (n - 1) as f64))
        .collect();

    // Same spectrum in per-wavelength (W/micron) and per-frequency (Jy) flavors
    let lum: Vec<f64> = wavelengths
        .iter()
        .map(|&w| 1e26 * planck_lambda(w, 5800.0) * h_alpha(w))
        .collect();
    let fnu: Vec<f64> = wavelengths
        .iter()
        .zip(&lum)
        .map(|(&w, &l)| 1e-3 * l * w * w)
        .collect();
    let ids: Vec<i64> = (0..n as i64).collect();
    let bands: Vec<&str> = wavelengths
        .iter()
        .map(|&w| if w < 0.4 { "UV" } else if w < 0.7 { "optical" } else { "IR" })
        .collect();

    // Parquet
    let schema = Arc::new(Schema::new(vec![
        field_with_unit("wavelength", "micron"),
        field_with_unit("luminosity", "W/micron"),
        field_with_unit("fnu", "Jy"),
        Field::new("id", DataType::Int64, false),
        Field::new("band", DataType::Utf8, false),
    ]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Float64Array::from(wavelengths.clone())),
            Arc::new(Float64Array::from(lum.clone())),
            Arc::new(Float64Array::from(fnu.clone())),
            Arc::new(Int64Array::from(ids.clone())),
            Arc::new(StringArray::from(bands)),
        ],
    )
    .expect("Failed to create RecordBatch");

    let file = std::fs::File::create("sample_sed.parquet").expect("Failed to create output file");
    let mut writer = ArrowWriter::try_new(file, schema, None).expect("Failed to create writer");
    writer.write(&batch).expect("Failed to write batch");
    writer.close().expect("Failed to close writer");

    // CSV
    let mut csv_writer = csv::Writer::from_path("sample_sed.csv").expect("Failed to create CSV");
    csv_writer
        .write_record(["wavelength [micron]", "luminosity [W/micron]", "fnu [Jy]", "id"])
        .expect("Failed to write CSV header");
    for i in 0..n {
        csv_writer
            .write_record([
                wavelengths[i].to_string(),
                lum[i].to_string(),
                fnu[i].to_string(),
                ids[i].to_string(),
            ])
            .expect("Failed to write CSV row");
    }
    csv_writer.flush().expect("Failed to flush CSV");

    // JSON
    let datasets = json!([
        { "name": "wavelength", "unit": "micron", "values": wavelengths },
        { "name": "luminosity", "unit": "W/micron", "values": lum },
        { "name": "fnu", "unit": "Jy", "values": fnu },
        { "name": "id", "values": ids },
    ]);
    std::fs::write(
        "sample_sed.json",
        serde_json::to_string_pretty(&datasets).expect("Failed to encode JSON"),
    )
    .expect("Failed to write JSON");

    // Job description for `tabin`
    let job = json!({
        "input_path": ".",
        "caller": "generate_sample",
        "log_level": "info",
        "job": {
            "file": "sample_sed.parquet",
            "description": "a sample spectral energy distribution",
            "columns": "wavelength, fnu",
            "declare": [
                { "description": "wavelength", "quantity": "wavelength", "unit": "micron" },
                { "description": "specific luminosity", "quantity": "specific", "unit": "Jy" }
            ]
        }
    });
    std::fs::write(
        "sample_job.json",
        serde_json::to_string_pretty(&job).expect("Failed to encode job"),
    )
    .expect("Failed to write job");

    println!("Wrote {n} rows to sample_sed.parquet, sample_sed.csv and sample_sed.json");
}
