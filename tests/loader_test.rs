//! Loader round trip: write a small parquet extract to a temp file and
//! read it back through a survey loader with schema projection.

use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

use arrow::array::Float64Array;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use nhanes_bp::utils::arrow::f64_values;
use nhanes_bp::{DemoSurvey, SurveyLoader, concat_batches, read_parquet};
use parquet::arrow::ArrowWriter;

/// Write a record batch to a fresh parquet file under the system temp dir
fn write_temp_parquet(stem: &str, batch: &RecordBatch) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "nhanes-bp-{stem}-{}-{}.parquet",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ));
    let file = File::create(&path).unwrap();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None).unwrap();
    writer.write(batch).unwrap();
    writer.close().unwrap();
    path
}

/// A DEMO-shaped extract with one extra column the analysis never reads
fn demo_extract() -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![
        Field::new("SEQN", DataType::Float64, true),
        Field::new("RIDAGEYR", DataType::Float64, true),
        Field::new("RIAGENDR", DataType::Float64, true),
        Field::new("RIDRETH1", DataType::Float64, true),
    ]));
    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Float64Array::from(vec![1.0, 2.0, 3.0])),
            Arc::new(Float64Array::from(vec![61.0, 35.0, 44.0])),
            Arc::new(Float64Array::from(vec![1.0, 2.0, 2.0])),
            Arc::new(Float64Array::from(vec![3.0, 1.0, 4.0])),
        ],
    )
    .unwrap()
}

#[test]
fn survey_loader_projects_to_declared_columns() {
    let path = write_temp_parquet("demo", &demo_extract());

    let loader = DemoSurvey::new();
    let batches = loader.load(&path).unwrap();
    let table = concat_batches(&batches).unwrap();

    // The untracked ethnicity column is projected away.
    assert_eq!(table.num_columns(), 3);
    assert_eq!(table.num_rows(), 3);
    assert_eq!(f64_values(&table, "SEQN").unwrap(), vec![1.0, 2.0, 3.0]);
    assert_eq!(f64_values(&table, "RIDAGEYR").unwrap(), vec![61.0, 35.0, 44.0]);

    std::fs::remove_file(&path).unwrap();
}

#[test]
fn read_parquet_without_schema_keeps_every_column() {
    let path = write_temp_parquet("full", &demo_extract());

    let batches = read_parquet(&path, None).unwrap();
    let table = concat_batches(&batches).unwrap();
    assert_eq!(table.num_columns(), 4);
    assert_eq!(table.num_rows(), 3);

    std::fs::remove_file(&path).unwrap();
}

#[test]
fn missing_file_is_an_error() {
    let path = std::env::temp_dir().join("nhanes-bp-does-not-exist.parquet");
    assert!(read_parquet(&path, None).is_err());
}
