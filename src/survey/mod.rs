//! Loaders for the NHANES 2011-2012 survey extracts
//!
//! Each extract ships as a parquet conversion of the published survey file,
//! keyed by the respondent sequence number (SEQN). The loaders declare the
//! columns the analysis consumes and project the files down to them.
//!
//! Available extracts:
//! - DEMO (Demographics): age and sex of each respondent
//! - BPX (Blood Pressure Examination): up to four systolic and four
//!   diastolic readings per respondent
//! - BMX (Body Measures): body-mass index

pub mod bmx;
pub mod bpx;
pub mod demo;
pub mod schemas;

pub use bmx::BmxSurvey;
pub use bpx::BpxSurvey;
pub use demo::DemoSurvey;

use std::path::Path;

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;

use crate::error::Result;
use crate::utils::{load_parquet_files_parallel, read_parquet};

/// Base trait for survey extract loaders
pub trait SurveyLoader: Send + Sync {
    /// Get the name of the extract
    fn survey_name(&self) -> &'static str;

    /// Get the schema for this extract
    fn schema(&self) -> SchemaRef;

    /// Load records from the extract
    ///
    /// Accepts either a single parquet file or a directory of parquet
    /// files; directories are loaded in parallel.
    ///
    /// # Errors
    /// Returns an error if the path is missing or any file is malformed
    fn load(&self, path: &Path) -> Result<Vec<RecordBatch>> {
        let schema = self.schema();
        if path.is_dir() {
            load_parquet_files_parallel(path, Some(schema.as_ref()))
        } else {
            read_parquet(path, Some(schema.as_ref()))
        }
    }
}
