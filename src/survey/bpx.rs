//! BPX survey loader implementation
//!
//! The BPX (Blood Pressure Examination) extract contains the repeated
//! blood-pressure readings that form the response of every model.

use arrow::datatypes::SchemaRef;

use super::SurveyLoader;
use super::schemas::bpx_schema;

/// BPX survey loader for blood pressure examination data
#[derive(Debug, Clone)]
pub struct BpxSurvey {
    schema: SchemaRef,
}

impl BpxSurvey {
    /// Create a new BPX survey loader
    #[must_use]
    pub fn new() -> Self {
        Self {
            schema: bpx_schema(),
        }
    }
}

impl Default for BpxSurvey {
    fn default() -> Self {
        Self::new()
    }
}

impl SurveyLoader for BpxSurvey {
    fn survey_name(&self) -> &'static str {
        "BPX"
    }

    fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }
}
