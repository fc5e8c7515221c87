//! Dense design matrices from a record batch and a parsed formula

use arrow::array::{Array, Int64Array};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use itertools::Itertools;
use nalgebra::{DMatrix, DVector};

use super::formula::{Formula, Term};
use crate::error::{NhanesError, Result};
use crate::utils::arrow::{column, f64_values, utf8_column};

/// A named dense design matrix
#[derive(Debug, Clone)]
pub struct Design {
    /// Column names, in matrix order
    pub names: Vec<String>,
    /// Row-per-observation design matrix
    pub matrix: DMatrix<f64>,
}

impl Design {
    /// Number of observations
    #[must_use]
    pub fn nrows(&self) -> usize {
        self.matrix.nrows()
    }

    /// Number of design columns
    #[must_use]
    pub fn ncols(&self) -> usize {
        self.matrix.ncols()
    }
}

/// Extract the response vector named by a formula
///
/// # Errors
/// Returns an error if the formula has no response or the column is
/// missing
pub fn response(formula: &Formula, batch: &RecordBatch) -> Result<DVector<f64>> {
    let name = formula
        .response
        .as_deref()
        .ok_or_else(|| NhanesError::Formula("formula has no response".to_string()))?;
    Ok(DVector::from_vec(f64_values(batch, name)?))
}

/// Per-row labels of a categorical column
fn categorical_labels(batch: &RecordBatch, name: &str) -> Result<Vec<String>> {
    let array = column(batch, name)?;
    if array.null_count() > 0 {
        return Err(NhanesError::column(name, "column contains nulls"));
    }
    match array.data_type() {
        DataType::Utf8 => {
            let strings = utf8_column(batch, name)?;
            Ok((0..strings.len())
                .map(|i| strings.value(i).to_string())
                .collect())
        }
        DataType::Int64 => {
            let values = array
                .as_any()
                .downcast_ref::<Int64Array>()
                .ok_or_else(|| NhanesError::column(name, "downcast to Int64Array failed"))?;
            Ok(values.values().iter().map(|v| v.to_string()).collect())
        }
        other => Err(NhanesError::column(
            name,
            format!("unsupported categorical type {other}"),
        )),
    }
}

/// Build the design matrix for a formula
///
/// Numeric terms contribute their column unchanged. Categorical terms
/// expand to indicator columns over the sorted distinct levels: with an
/// intercept present the first level is the reference and is dropped
/// (treatment coding), without one the full one-hot block is kept.
///
/// # Errors
/// Returns an error if a term's column is missing or badly typed
pub fn design_matrix(formula: &Formula, batch: &RecordBatch) -> Result<Design> {
    let rows = batch.num_rows();
    let mut names: Vec<String> = Vec::new();
    let mut columns: Vec<Vec<f64>> = Vec::new();

    if formula.intercept {
        names.push("Intercept".to_string());
        columns.push(vec![1.0; rows]);
    }

    for term in &formula.terms {
        match term {
            Term::Numeric(name) => {
                names.push(name.clone());
                columns.push(f64_values(batch, name)?);
            }
            Term::Categorical(name) => {
                let labels = categorical_labels(batch, name)?;
                let levels: Vec<&String> = labels.iter().unique().sorted().collect();
                let coded: Vec<&String> = if formula.intercept {
                    levels.into_iter().skip(1).collect()
                } else {
                    levels
                };
                for level in coded {
                    if formula.intercept {
                        names.push(format!("C({name})[T.{level}]"));
                    } else {
                        names.push(format!("C({name})[{level}]"));
                    }
                    columns.push(
                        labels
                            .iter()
                            .map(|l| f64::from(u8::from(l == level)))
                            .collect(),
                    );
                }
            }
        }
    }

    if columns.is_empty() {
        return Err(NhanesError::Formula(
            "formula produced an empty design".to_string(),
        ));
    }

    let ncols = columns.len();
    let matrix = DMatrix::from_fn(rows, ncols, |r, c| columns[c][r]);
    Ok(Design { names, matrix })
}
