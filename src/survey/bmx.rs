//! BMX survey loader implementation
//!
//! The BMX (Body Measures) extract contains examination anthropometry.

use arrow::datatypes::SchemaRef;

use super::SurveyLoader;
use super::schemas::bmx_schema;

/// BMX survey loader for body measures
#[derive(Debug, Clone)]
pub struct BmxSurvey {
    schema: SchemaRef,
}

impl BmxSurvey {
    /// Create a new BMX survey loader
    #[must_use]
    pub fn new() -> Self {
        Self {
            schema: bmx_schema(),
        }
    }
}

impl Default for BmxSurvey {
    fn default() -> Self {
        Self::new()
    }
}

impl SurveyLoader for BmxSurvey {
    fn survey_name(&self) -> &'static str {
        "BMX"
    }

    fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }
}
