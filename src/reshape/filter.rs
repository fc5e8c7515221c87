//! Row filtering for record batches
//!
//! The mixed models are fit both on the full long table and on
//! per-measurement-type subsets, so the analysis needs a mask filter, an
//! equality filter over the type column, and a row-limit slice.

use arrow::array::{Array, ArrayRef, BooleanArray};
use arrow::compute::filter as arrow_filter;
use arrow::record_batch::RecordBatch;

use crate::error::{NhanesError, Result};
use crate::utils::arrow::utf8_column;

/// Filter a record batch based on a boolean mask
///
/// # Arguments
/// * `batch` - The record batch to filter
/// * `mask` - The boolean mask indicating which rows to keep
///
/// # Returns
/// A new record batch with only rows where mask is true
///
/// # Errors
/// Returns an error if the mask length disagrees with the batch
pub fn filter_record_batch(batch: &RecordBatch, mask: &BooleanArray) -> Result<RecordBatch> {
    if batch.num_rows() != mask.len() {
        return Err(NhanesError::Shape(format!(
            "Mask length ({}) doesn't match batch row count ({})",
            mask.len(),
            batch.num_rows()
        )));
    }

    let filtered_columns: Vec<ArrayRef> = batch
        .columns()
        .iter()
        .map(|col| arrow_filter(col, mask))
        .collect::<arrow::error::Result<_>>()?;

    Ok(RecordBatch::try_new(batch.schema(), filtered_columns)?)
}

/// Keep only rows where a Utf8 column equals `value`
///
/// # Errors
/// Returns an error if the column is missing or not Utf8
pub fn filter_eq_utf8(batch: &RecordBatch, column: &str, value: &str) -> Result<RecordBatch> {
    let strings = utf8_column(batch, column)?;
    let mask: BooleanArray = (0..strings.len())
        .map(|i| Some(!strings.is_null(i) && strings.value(i) == value))
        .collect();
    filter_record_batch(batch, &mask)
}

/// Take the first `n` rows of a batch
///
/// Returns the batch unchanged when it already has `n` rows or fewer.
#[must_use]
pub fn head(batch: &RecordBatch, n: usize) -> RecordBatch {
    if batch.num_rows() <= n {
        batch.clone()
    } else {
        batch.slice(0, n)
    }
}
