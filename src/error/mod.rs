//! Error handling for the NHANES analysis pipeline.

use std::io;

use arrow::error::ArrowError;
use parquet::errors::ParquetError;
use thiserror::Error;

/// Specialized error type for the analysis pipeline
#[derive(Debug, Error)]
pub enum NhanesError {
    /// Error opening or reading a file
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    /// Error processing Parquet data
    #[error("Parquet error: {0}")]
    Parquet(#[from] ParquetError),
    /// Error from an Arrow compute kernel or batch construction
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),
    /// A required column is missing or has an unexpected type
    #[error("Column error: {0}")]
    Column(String),
    /// Mismatched dimensions between tables, masks or matrices
    #[error("Shape error: {0}")]
    Shape(String),
    /// Malformed model formula string
    #[error("Formula error: {0}")]
    Formula(String),
    /// The iterative fitting routine failed to converge
    #[error("Convergence error: {0}")]
    Convergence(String),
}

impl NhanesError {
    /// Missing or badly typed column, with the column name attached
    pub fn column(name: &str, detail: impl Into<String>) -> Self {
        Self::Column(format!("{name}: {}", detail.into()))
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, NhanesError>;
