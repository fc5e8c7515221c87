//! Configuration for the analysis run.

use std::path::PathBuf;

/// Configuration for a single analysis run
///
/// There are deliberately no CLI flags or environment variables; the
/// pipeline reads a fixed set of extracts and the defaults mirror the
/// published analysis.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Directory holding the three NHANES parquet extracts
    pub data_dir: PathBuf,
    /// Row limit applied to the long table before each mixed-model fit
    ///
    /// The mixed models are restricted to a prefix of the long table so a
    /// full run stays interactive; the OLS fit always uses every row.
    pub fit_row_limit: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            fit_row_limit: 5000,
        }
    }
}
