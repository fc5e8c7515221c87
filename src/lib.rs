//! A Rust pipeline for modeling repeated NHANES blood-pressure
//! measurements: parquet extract loading, wide-to-long reshaping, and a
//! sequence of regression and linear mixed-model fits.

pub mod analysis;
pub mod config;
pub mod error;
pub mod model;
pub mod reshape;
pub mod survey;
pub mod utils;

// Re-export the most common types for easier use
// Core types
pub use config::AnalysisConfig;
pub use error::{NhanesError, Result};
pub use survey::{BmxSurvey, BpxSurvey, DemoSurvey, SurveyLoader};

// Arrow types
pub use arrow::datatypes::Schema as ArrowSchema;
pub use arrow::record_batch::RecordBatch;

// Reshaping
pub use reshape::{drop_missing, filter_eq_utf8, inner_join, long_table, melt};

// Models
pub use analysis::{AnalysisReport, run};
pub use model::{MixedFit, MixedModel, Ols, OlsFit};

// Utility functions
pub use utils::{DEFAULT_BATCH_SIZE, concat_batches, load_parquet_files_parallel, read_parquet};
