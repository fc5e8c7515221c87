//! Table reshaping: join, unpivot, cleanup and derived columns
//!
//! These operations turn the three wide survey extracts into the single
//! long-format table the models consume. They are all pure functions from
//! record batches to record batches; nothing mutates a batch in place.

pub mod clean;
pub mod derive;
pub mod filter;
pub mod join;
pub mod melt;

pub use clean::{cast_column_to_int, drop_missing, sort_by};
pub use derive::derive_indicators;
pub use filter::{filter_eq_utf8, filter_record_batch, head};
pub use join::inner_join;
pub use melt::melt;

use arrow::record_batch::RecordBatch;

use crate::error::Result;
use crate::survey::schemas::{DIASTOLIC_COLUMNS, SYSTOLIC_COLUMNS};

/// Name of the long-format variable column ("BPXSY1".."BPXDI4")
pub const VAR_COLUMN: &str = "bpvar";

/// Name of the long-format measured-value column
pub const VALUE_COLUMN: &str = "bp";

/// Subject key shared by all three extracts
pub const SUBJECT_KEY: &str = "SEQN";

/// Build the long-format analysis table from the three merged extracts
///
/// Mirrors the published analysis: unpivot the eight repeated-measure
/// columns, sort by subject, coerce the key to an integer, drop incomplete
/// rows and append the derived indicator columns.
///
/// # Errors
/// Returns an error if the merged table is missing expected columns
pub fn long_table(merged: &RecordBatch) -> Result<RecordBatch> {
    let value_vars: Vec<&str> = SYSTOLIC_COLUMNS
        .iter()
        .chain(DIASTOLIC_COLUMNS.iter())
        .copied()
        .collect();
    let id_vars = [SUBJECT_KEY, "RIDAGEYR", "RIAGENDR", "BMXBMI"];

    let dx = melt(merged, &id_vars, &value_vars, VAR_COLUMN, VALUE_COLUMN)?;
    let dx = sort_by(&dx, SUBJECT_KEY)?;
    let dx = cast_column_to_int(&dx, SUBJECT_KEY)?;
    let dx = drop_missing(&dx)?;
    derive_indicators(&dx)
}
