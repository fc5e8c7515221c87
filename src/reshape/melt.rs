//! Wide-to-long unpivot of repeated-measure columns

use std::sync::Arc;

use arrow::array::{ArrayRef, StringArray};
use arrow::compute::concat;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use itertools::Itertools;

use crate::error::{NhanesError, Result};

/// Unpivot wide repeated-measure columns into long form
///
/// Each value column becomes a block of rows carrying the id columns, the
/// source column name under `var_name`, and the measured value under
/// `value_name`. Blocks are stacked in `value_vars` order, so the output
/// has exactly `batch.num_rows() * value_vars.len()` rows; missing values
/// survive the unpivot and are removed by a later cleanup pass.
///
/// # Errors
/// Returns an error if an id or value column is missing, or the value
/// columns disagree on data type
pub fn melt(
    batch: &RecordBatch,
    id_vars: &[&str],
    value_vars: &[&str],
    var_name: &str,
    value_name: &str,
) -> Result<RecordBatch> {
    if value_vars.is_empty() {
        return Err(NhanesError::Shape(
            "melt requires at least one value column".to_string(),
        ));
    }

    let rows = batch.num_rows();
    let blocks = value_vars.len();

    let mut fields: Vec<Field> = Vec::new();
    let mut columns: Vec<ArrayRef> = Vec::new();

    // Id columns broadcast onto each block of the output.
    for name in id_vars {
        let (idx, field) = batch
            .schema()
            .column_with_name(name)
            .map(|(idx, field)| (idx, field.clone()))
            .ok_or_else(|| NhanesError::column(name, "id column not found"))?;
        let source = batch.column(idx);
        let repeated: Vec<&dyn arrow::array::Array> =
            std::iter::repeat_n(source.as_ref(), blocks).collect();
        fields.push(field);
        columns.push(concat(&repeated)?);
    }

    // Variable-name column, one constant block per value column.
    let var_values: Vec<&str> = value_vars
        .iter()
        .flat_map(|name| std::iter::repeat_n(*name, rows))
        .collect();
    fields.push(Field::new(var_name, DataType::Utf8, false));
    columns.push(Arc::new(StringArray::from(var_values)));

    // Stacked values.
    let value_arrays: Vec<ArrayRef> = value_vars
        .iter()
        .map(|name| {
            batch
                .column_by_name(name)
                .cloned()
                .ok_or_else(|| NhanesError::column(name, "value column not found"))
        })
        .try_collect()?;
    let value_type = value_arrays[0].data_type().clone();
    if value_arrays.iter().any(|a| a.data_type() != &value_type) {
        return Err(NhanesError::Shape(
            "melt value columns must share a data type".to_string(),
        ));
    }
    let value_refs: Vec<&dyn arrow::array::Array> =
        value_arrays.iter().map(AsRef::as_ref).collect();
    fields.push(Field::new(value_name, value_type, true));
    columns.push(concat(&value_refs)?);

    Ok(RecordBatch::try_new(
        Arc::new(Schema::new(fields)),
        columns,
    )?)
}
