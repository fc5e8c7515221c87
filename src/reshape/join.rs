//! Inner join of record batches on a shared key column

use std::sync::Arc;

use arrow::array::{Array, Float64Array, Int64Array, UInt32Array};
use arrow::compute::take;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use rustc_hash::FxHashMap;

use crate::error::{NhanesError, Result};

/// Canonical hashable form of a key value, tolerating the Float64 keys the
/// SAS conversions produce. Null keys never match.
fn key_values(batch: &RecordBatch, key: &str) -> Result<Vec<Option<u64>>> {
    let array = batch
        .column_by_name(key)
        .ok_or_else(|| NhanesError::column(key, "join key not found"))?;
    match array.data_type() {
        DataType::Int64 => {
            let values = array
                .as_any()
                .downcast_ref::<Int64Array>()
                .ok_or_else(|| NhanesError::column(key, "downcast to Int64Array failed"))?;
            Ok((0..values.len())
                .map(|i| (!values.is_null(i)).then(|| values.value(i) as u64))
                .collect())
        }
        DataType::Float64 => {
            let values = array
                .as_any()
                .downcast_ref::<Float64Array>()
                .ok_or_else(|| NhanesError::column(key, "downcast to Float64Array failed"))?;
            Ok((0..values.len())
                .map(|i| (!values.is_null(i)).then(|| values.value(i).to_bits()))
                .collect())
        }
        other => Err(NhanesError::column(
            key,
            format!("unsupported join key type {other}"),
        )),
    }
}

/// Inner join two record batches on a shared key column
///
/// Rows whose key has no partner on the other side are dropped silently.
/// The output carries every column of `left` followed by every non-key
/// column of `right`, in left-row order; a left row matching several right
/// rows is duplicated once per match.
///
/// # Errors
/// Returns an error if the key is missing on either side or a non-key
/// column name appears in both inputs
pub fn inner_join(left: &RecordBatch, right: &RecordBatch, key: &str) -> Result<RecordBatch> {
    for field in right.schema().fields() {
        if field.name() != key && left.schema().column_with_name(field.name()).is_some() {
            return Err(NhanesError::column(
                field.name(),
                "column present on both sides of join",
            ));
        }
    }

    let left_keys = key_values(left, key)?;
    let right_keys = key_values(right, key)?;

    let mut index: FxHashMap<u64, Vec<u32>> = FxHashMap::default();
    for (row, key_value) in right_keys.iter().enumerate() {
        if let Some(k) = key_value {
            index.entry(*k).or_default().push(row as u32);
        }
    }

    let mut left_indices: Vec<u32> = Vec::new();
    let mut right_indices: Vec<u32> = Vec::new();
    for (row, key_value) in left_keys.iter().enumerate() {
        if let Some(matches) = key_value.as_ref().and_then(|k| index.get(k)) {
            for &r in matches {
                left_indices.push(row as u32);
                right_indices.push(r);
            }
        }
    }

    let left_take = UInt32Array::from(left_indices);
    let right_take = UInt32Array::from(right_indices);

    let mut fields: Vec<Field> = Vec::new();
    let mut columns = Vec::new();
    for (field, array) in left.schema().fields().iter().zip(left.columns()) {
        fields.push(field.as_ref().clone());
        columns.push(take(array, &left_take, None)?);
    }
    for (field, array) in right.schema().fields().iter().zip(right.columns()) {
        if field.name() == key {
            continue;
        }
        fields.push(field.as_ref().clone());
        columns.push(take(array, &right_take, None)?);
    }

    Ok(RecordBatch::try_new(
        Arc::new(Schema::new(fields)),
        columns,
    )?)
}
