//! DEMO schema definitions

use arrow::datatypes::{DataType, Field, Schema};
use std::sync::Arc;

/// Get the Arrow schema for DEMO data
///
/// The DEMO (Demographics) extract carries respondent background
/// variables; the analysis uses age in years and the sex code.
pub fn demo_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("SEQN", DataType::Float64, true),
        Field::new("RIDAGEYR", DataType::Float64, true),
        Field::new("RIAGENDR", DataType::Float64, true),
    ]))
}
