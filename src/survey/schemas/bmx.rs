//! BMX schema definitions

use arrow::datatypes::{DataType, Field, Schema};
use std::sync::Arc;

/// Get the Arrow schema for BMX data
///
/// The BMX (Body Measures) extract carries examination anthropometry;
/// the analysis uses body-mass index only.
pub fn bmx_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("SEQN", DataType::Float64, true),
        Field::new("BMXBMI", DataType::Float64, true),
    ]))
}
