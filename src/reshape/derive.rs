//! Derived indicator columns for the long table

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use itertools::Itertools;

use super::VAR_COLUMN;
use crate::error::{NhanesError, Result};
use crate::utils::arrow::{column, utf8_column};

/// NHANES sex code for female respondents
const FEMALE_CODE: f64 = 2.0;

/// Split a repeated-measure column name into its type and repetition index
///
/// "BPXSY3" becomes ("SY", 3). The measurement type is chars 3..5 of the
/// source column name and the repetition index is the trailing digit.
fn split_var_name(name: &str) -> Result<(&str, i64)> {
    if name.len() != 6 || !name.is_ascii() {
        return Err(NhanesError::column(
            VAR_COLUMN,
            format!("unexpected measurement column name {name:?}"),
        ));
    }
    let index: i64 = name[5..].parse().map_err(|_| {
        NhanesError::column(
            VAR_COLUMN,
            format!("measurement column {name:?} has no repetition digit"),
        )
    })?;
    Ok((&name[3..5], index))
}

/// Append the derived categorical and indicator columns to the long table
///
/// Adds, per row:
/// - `bpt`: measurement type, "SY" or "DI"
/// - `bpi`: repetition index, 1..4
/// - `female`: 1 iff the sex code is the female code
/// - `sy`, `di`: one-hot by measurement type
/// - `sy1`..`sy3`, `di1`..`di3`: one-hot by source column for repetitions
///   1-3 (the fourth repetition is the reference level)
///
/// # Errors
/// Returns an error if the variable or sex column is missing or malformed
pub fn derive_indicators(batch: &RecordBatch) -> Result<RecordBatch> {
    let vars = utf8_column(batch, VAR_COLUMN)?;
    let split: Vec<(&str, i64)> = (0..vars.len())
        .map(|i| split_var_name(vars.value(i)))
        .try_collect()?;

    let bpt: StringArray = split.iter().map(|(t, _)| Some(*t)).collect();
    let bpi = Int64Array::from(split.iter().map(|(_, i)| *i).collect_vec());

    let gender = column(batch, "RIAGENDR")?
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| NhanesError::column("RIAGENDR", "expected a Float64 column"))?;
    let female = Int64Array::from(
        (0..gender.len())
            .map(|i| i64::from(gender.value(i) == FEMALE_CODE))
            .collect_vec(),
    );

    let indicator = |pred: &dyn Fn(&(&str, i64)) -> bool| -> ArrayRef {
        Arc::new(Int64Array::from(
            split.iter().map(|s| i64::from(pred(s))).collect_vec(),
        ))
    };

    let mut fields: Vec<Field> = batch
        .schema()
        .fields()
        .iter()
        .map(|f| f.as_ref().clone())
        .collect();
    let mut columns = batch.columns().to_vec();

    let mut push = |name: &str, data_type: DataType, array: ArrayRef| {
        fields.push(Field::new(name, data_type, false));
        columns.push(array);
    };

    push("bpt", DataType::Utf8, Arc::new(bpt));
    push("bpi", DataType::Int64, Arc::new(bpi));
    push("female", DataType::Int64, Arc::new(female));
    push("sy", DataType::Int64, indicator(&|(t, _)| *t == "SY"));
    push("di", DataType::Int64, indicator(&|(t, _)| *t == "DI"));
    for rep in 1..=3 {
        push(
            &format!("sy{rep}"),
            DataType::Int64,
            indicator(&|(t, i)| *t == "SY" && *i == rep),
        );
    }
    for rep in 1..=3 {
        push(
            &format!("di{rep}"),
            DataType::Int64,
            indicator(&|(t, i)| *t == "DI" && *i == rep),
        );
    }

    Ok(RecordBatch::try_new(
        Arc::new(Schema::new(fields)),
        columns,
    )?)
}
