//! BPX schema definitions

use arrow::datatypes::{DataType, Field, Schema};
use std::sync::Arc;

use super::{DIASTOLIC_COLUMNS, SYSTOLIC_COLUMNS};

/// Get the Arrow schema for BPX data
///
/// The BPX (Blood Pressure Examination) extract carries up to four
/// systolic and four diastolic readings per respondent; later readings
/// are missing for respondents examined fewer than four times.
pub fn bpx_schema() -> Arc<Schema> {
    let mut fields = vec![Field::new("SEQN", DataType::Float64, true)];
    for name in SYSTOLIC_COLUMNS.iter().chain(DIASTOLIC_COLUMNS.iter()) {
        fields.push(Field::new(*name, DataType::Float64, true));
    }
    Arc::new(Schema::new(fields))
}
