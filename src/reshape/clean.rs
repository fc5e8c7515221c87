//! Cleanup passes over the long table: sorting, key coercion, missing rows

use std::sync::Arc;

use arrow::array::BooleanArray;
use arrow::compute::kernels::boolean::and;
use arrow::compute::{SortOptions, cast, is_not_null, sort_to_indices, take};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;

use super::filter::filter_record_batch;
use crate::error::{NhanesError, Result};

/// Stable sort of a record batch by a single column, nulls last
///
/// # Errors
/// Returns an error if the column is missing or not sortable
pub fn sort_by(batch: &RecordBatch, column: &str) -> Result<RecordBatch> {
    let key = batch
        .column_by_name(column)
        .ok_or_else(|| NhanesError::column(column, "sort column not found"))?;
    let indices = sort_to_indices(
        key,
        Some(SortOptions {
            descending: false,
            nulls_first: false,
        }),
        None,
    )?;
    let columns = batch
        .columns()
        .iter()
        .map(|c| take(c, &indices, None))
        .collect::<arrow::error::Result<Vec<_>>>()?;
    Ok(RecordBatch::try_new(batch.schema(), columns)?)
}

/// Coerce a column to Int64, replacing it in place within the schema
///
/// The SAS conversions store every variable as Float64; the subject key is
/// coerced back to an integer before it is used for grouping.
///
/// # Errors
/// Returns an error if the column is missing or cannot be cast
pub fn cast_column_to_int(batch: &RecordBatch, column: &str) -> Result<RecordBatch> {
    let (idx, _) = batch
        .schema()
        .column_with_name(column)
        .ok_or_else(|| NhanesError::column(column, "cast column not found"))?;

    let mut fields: Vec<Field> = batch
        .schema()
        .fields()
        .iter()
        .map(|f| f.as_ref().clone())
        .collect();
    let mut columns = batch.columns().to_vec();

    columns[idx] = cast(&columns[idx], &DataType::Int64)?;
    fields[idx] = fields[idx].clone().with_data_type(DataType::Int64);

    Ok(RecordBatch::try_new(
        Arc::new(Schema::new(fields)),
        columns,
    )?)
}

/// Drop every row containing at least one null
///
/// Applying this to an already-complete table is a no-op, so the pass is
/// idempotent.
///
/// # Errors
/// Returns an error if the filter kernel fails
pub fn drop_missing(batch: &RecordBatch) -> Result<RecordBatch> {
    let mut mask = BooleanArray::from(vec![true; batch.num_rows()]);
    for column in batch.columns() {
        mask = and(&mask, &is_not_null(column)?)?;
    }
    filter_record_batch(batch, &mask)
}
