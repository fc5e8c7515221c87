//! Arrow column accessors for dense numeric extraction
//!
//! The model layer works on dense `f64` vectors, so these helpers pull a
//! named column out of a record batch and downcast it, converting integer
//! columns where a numeric column is expected.

use arrow::array::{Array, ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;

use crate::error::{NhanesError, Result};

/// Look up a column by name
///
/// # Errors
/// Returns an error if the batch has no column with that name
pub fn column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a ArrayRef> {
    batch
        .column_by_name(name)
        .ok_or_else(|| NhanesError::column(name, "column not found in record batch"))
}

/// Look up a Utf8 column and downcast it
///
/// # Errors
/// Returns an error if the column is missing or not a string array
pub fn utf8_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    column(batch, name)?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| NhanesError::column(name, "expected a Utf8 column"))
}

/// Extract a column as dense `f64` values
///
/// Accepts Float64 and Int64 columns. Nulls are rejected; the reshape step
/// drops incomplete rows before any model sees the table.
///
/// # Errors
/// Returns an error if the column is missing, has an unsupported type, or
/// contains nulls
pub fn f64_values(batch: &RecordBatch, name: &str) -> Result<Vec<f64>> {
    let array = column(batch, name)?;
    if array.null_count() > 0 {
        return Err(NhanesError::column(name, "column contains nulls"));
    }
    match array.data_type() {
        DataType::Float64 => {
            let values = array
                .as_any()
                .downcast_ref::<Float64Array>()
                .ok_or_else(|| NhanesError::column(name, "downcast to Float64Array failed"))?;
            Ok(values.values().to_vec())
        }
        DataType::Int64 => {
            let values = array
                .as_any()
                .downcast_ref::<Int64Array>()
                .ok_or_else(|| NhanesError::column(name, "downcast to Int64Array failed"))?;
            Ok(values.values().iter().map(|&v| v as f64).collect())
        }
        other => Err(NhanesError::column(
            name,
            format!("unsupported numeric type {other}"),
        )),
    }
}

/// Extract a column as dense `i64` values
///
/// # Errors
/// Returns an error if the column is missing, not Int64, or contains nulls
pub fn i64_values(batch: &RecordBatch, name: &str) -> Result<Vec<i64>> {
    let array = column(batch, name)?;
    if array.null_count() > 0 {
        return Err(NhanesError::column(name, "column contains nulls"));
    }
    let values = array
        .as_any()
        .downcast_ref::<Int64Array>()
        .ok_or_else(|| NhanesError::column(name, "expected an Int64 column"))?;
    Ok(values.values().to_vec())
}
