//! Utility functions for working with Parquet files and Arrow batches

pub mod arrow;

use std::fs::File;
use std::path::{Path, PathBuf};

use ::arrow::datatypes::Schema;
use ::arrow::record_batch::RecordBatch;
use itertools::Itertools;
use parquet::arrow::{ProjectionMask, arrow_reader::ParquetRecordBatchReaderBuilder};
use rayon::prelude::*;

use crate::error::{NhanesError, Result};

/// Default batch size for Parquet reading
pub const DEFAULT_BATCH_SIZE: usize = 16384;

/// Validates that a directory exists and is a directory
///
/// # Errors
/// Returns an error if the directory does not exist or is not a directory
pub fn validate_directory(dir: &Path) -> Result<()> {
    if !dir.exists() || !dir.is_dir() {
        return Err(NhanesError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Directory does not exist: {}", dir.display()),
        )));
    }
    Ok(())
}

/// Log an operation start with consistent format
pub fn log_operation_start(operation: &str, path: &Path) {
    log::info!("{} {}", operation, path.display());
}

/// Log an operation completion with consistent format
pub fn log_operation_complete(
    operation: &str,
    path: &Path,
    items: usize,
    elapsed: Option<std::time::Duration>,
) {
    if let Some(duration) = elapsed {
        log::info!(
            "Successfully {} {} items from {} in {:?}",
            operation,
            items,
            path.display(),
            duration
        );
    } else {
        log::info!(
            "Successfully {} {} items from {}",
            operation,
            items,
            path.display()
        );
    }
}

/// Creates a standardized error for Parquet operations
pub fn create_parquet_error<E: std::fmt::Display>(message: &str, error: E) -> NhanesError {
    NhanesError::Parquet(parquet::errors::ParquetError::General(format!(
        "{message}: {error}"
    )))
}

/// Helper for creating a projection mask from a declared schema
///
/// Fields missing from the file are skipped with a warning; if nothing
/// matches, all columns are read.
#[must_use]
pub fn create_projection(
    schema: &Schema,
    file_schema: &Schema,
    parquet_schema: &parquet::schema::types::SchemaDescriptor,
) -> Option<ProjectionMask> {
    let projection: Vec<usize> = schema
        .fields()
        .iter()
        .filter_map(|f| {
            let field_name = f.name();
            match file_schema.index_of(field_name) {
                Ok(idx) => Some(idx),
                Err(_) => {
                    log::warn!("Field {field_name} not found in parquet file, skipping");
                    None
                }
            }
        })
        .collect_vec();

    if projection.is_empty() {
        log::warn!("No matching fields found in schema projection, reading all columns");
        None
    } else {
        Some(ProjectionMask::leaves(parquet_schema, projection))
    }
}

/// Read a parquet file into Arrow record batches
///
/// # Arguments
/// * `path` - Path to the Parquet file
/// * `schema` - Optional Arrow Schema for projecting specific columns
///
/// # Returns
/// A vector of `RecordBatch` objects
///
/// # Errors
/// Returns an error if the file cannot be opened or if the Parquet file is invalid
pub fn read_parquet(path: &Path, schema: Option<&Schema>) -> Result<Vec<RecordBatch>> {
    let start = std::time::Instant::now();
    log_operation_start("Reading parquet file", path);

    let file = File::open(path).map_err(|e| {
        NhanesError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Failed to open file {}: {}", path.display(), e),
        ))
    })?;

    let reader_builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| {
            create_parquet_error(
                &format!("Failed to read parquet file {}", path.display()),
                e,
            )
        })?
        .with_batch_size(DEFAULT_BATCH_SIZE);

    let reader = if let Some(schema) = schema {
        let file_schema = reader_builder.schema();
        match create_projection(schema, file_schema, reader_builder.parquet_schema()) {
            Some(mask) => reader_builder
                .with_projection(mask)
                .build()
                .map_err(|e| {
                    create_parquet_error("Failed to build parquet reader with projection", e)
                })?,
            None => reader_builder
                .build()
                .map_err(|e| create_parquet_error("Failed to build parquet reader", e))?,
        }
    } else {
        reader_builder
            .build()
            .map_err(|e| create_parquet_error("Failed to build parquet reader", e))?
    };

    let batches: Result<Vec<RecordBatch>> = reader
        .map(|batch_result| {
            batch_result.map_err(|e| create_parquet_error("Failed to read record batch", e))
        })
        .collect();
    let batches = batches?;

    log_operation_complete("read", path, batches.len(), Some(start.elapsed()));
    Ok(batches)
}

/// Find all Parquet files in a directory
///
/// # Errors
/// Returns an error if directory reading fails
pub fn find_parquet_files(dir: &Path) -> Result<Vec<PathBuf>> {
    log_operation_start("Searching for parquet files in", dir);

    validate_directory(dir)?;

    let parquet_files = std::fs::read_dir(dir)
        .map_err(|e| {
            NhanesError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                format!("Failed to read directory {}: {}", dir.display(), e),
            ))
        })?
        .filter_map(|entry_result| match entry_result {
            Ok(entry) => {
                let path = entry.path();
                if path.is_file() && path.extension().is_some_and(|ext| ext == "parquet") {
                    Some(Ok(path))
                } else {
                    None
                }
            }
            Err(e) => Some(Err(NhanesError::Io(std::io::Error::other(format!(
                "Failed to read directory entry: {e}"
            ))))),
        })
        .collect::<Result<Vec<_>>>()?
        .into_iter()
        .sorted()
        .collect_vec();

    if parquet_files.is_empty() {
        log::warn!("No Parquet files found in directory: {}", dir.display());
    } else {
        log_operation_complete("found", dir, parquet_files.len(), None);
    }

    Ok(parquet_files)
}

/// Load all parquet files from a directory in parallel
///
/// # Arguments
/// * `dir` - Path to the directory containing Parquet files
/// * `schema` - Optional Arrow Schema for projecting specific columns
///
/// # Returns
/// A vector of record batches from all files
///
/// # Errors
/// Returns an error if directory reading fails or any file cannot be read
pub fn load_parquet_files_parallel(dir: &Path, schema: Option<&Schema>) -> Result<Vec<RecordBatch>> {
    let parquet_files = find_parquet_files(dir)?;

    if parquet_files.is_empty() {
        return Ok(Vec::new());
    }

    let schema_arc = schema.map(|s| std::sync::Arc::new(s.clone()));

    let all_batches: Vec<Result<Vec<RecordBatch>>> = parquet_files
        .par_iter()
        .map(|path| {
            let schema_ref = schema_arc.as_ref().map(std::convert::AsRef::as_ref);
            read_parquet(path, schema_ref)
        })
        .collect();

    let mut combined_batches = Vec::new();
    for result in all_batches {
        combined_batches.extend(result?);
    }

    log::info!(
        "Successfully loaded {} batches from {} Parquet files",
        combined_batches.len(),
        parquet_files.len()
    );

    Ok(combined_batches)
}

/// Fuse a multi-batch extract into a single record batch
///
/// The reshape operations work on one table per extract, so the batches
/// coming out of the reader are concatenated up front.
///
/// # Errors
/// Returns an error if the batches have inconsistent schemas or the input is empty
pub fn concat_batches(batches: &[RecordBatch]) -> Result<RecordBatch> {
    let first = batches.first().ok_or_else(|| {
        NhanesError::Shape("Cannot concatenate an empty set of record batches".to_string())
    })?;
    Ok(::arrow::compute::concat_batches(&first.schema(), batches)?)
}
