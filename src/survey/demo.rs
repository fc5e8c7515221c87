//! DEMO survey loader implementation
//!
//! The DEMO (Demographics) extract contains respondent background information.

use arrow::datatypes::SchemaRef;

use super::SurveyLoader;
use super::schemas::demo_schema;

/// DEMO survey loader for demographic information
#[derive(Debug, Clone)]
pub struct DemoSurvey {
    schema: SchemaRef,
}

impl DemoSurvey {
    /// Create a new DEMO survey loader
    #[must_use]
    pub fn new() -> Self {
        Self {
            schema: demo_schema(),
        }
    }
}

impl Default for DemoSurvey {
    fn default() -> Self {
        Self::new()
    }
}

impl SurveyLoader for DemoSurvey {
    fn survey_name(&self) -> &'static str {
        "DEMO"
    }

    fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }
}
