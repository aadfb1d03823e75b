//! Reading and writing the parquet tables of a data directory.
//!
//! A table named `households` is found either as `households.parquet` or as a
//! directory `households/` holding one or more parquet files, which are read
//! in parallel.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Instant;

use arrow::datatypes::Schema;
use arrow::record_batch::RecordBatch;
use itertools::Itertools;
use parquet::arrow::ArrowWriter;
use parquet::arrow::{ProjectionMask, arrow_reader::ParquetRecordBatchReaderBuilder};
use rayon::prelude::*;

use crate::error::{MortalityError, Result};
use crate::schema::TableRecord;
use crate::utils::{log_file_read, log_table_loaded, log_table_written, log_warning};

/// Default batch size for Parquet reading
pub const DEFAULT_BATCH_SIZE: usize = 16384;

/// Validates that a directory exists and is a directory
pub fn validate_directory(dir: &Path) -> Result<()> {
    if !dir.is_dir() {
        return Err(MortalityError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Directory does not exist: {}", dir.display()),
        )));
    }
    Ok(())
}

/// Helper for creating projection mask from schema
///
/// Fields absent from the file are skipped with a warning. Returns `None`
/// when nothing matched, in which case all columns should be read.
#[must_use]
pub fn create_projection(
    schema: &Schema,
    file_schema: &Schema,
    parquet_schema: &parquet::schema::types::SchemaDescriptor,
) -> Option<ProjectionMask> {
    let projection = schema
        .fields()
        .iter()
        .filter_map(|f| match file_schema.index_of(f.name()) {
            Ok(idx) => Some(idx),
            Err(_) => {
                log::debug!("Field {} not found in parquet file, skipping", f.name());
                None
            }
        })
        .collect_vec();

    if projection.is_empty() {
        log_warning(
            "No matching fields found in schema projection, reading all columns",
            None,
        );
        None
    } else {
        Some(ProjectionMask::roots(parquet_schema, projection))
    }
}

/// Read a parquet file into Arrow record batches
///
/// # Arguments
/// * `path` - Path to the Parquet file
/// * `schema` - Optional Arrow Schema for projecting specific columns
pub fn read_parquet(path: &Path, schema: Option<&Schema>) -> Result<Vec<RecordBatch>> {
    let start = Instant::now();

    let file = File::open(path).map_err(|e| {
        MortalityError::IoError(std::io::Error::new(
            e.kind(),
            format!("Failed to open file {}: {}", path.display(), e),
        ))
    })?;

    let mut builder =
        ParquetRecordBatchReaderBuilder::try_new(file)?.with_batch_size(DEFAULT_BATCH_SIZE);

    if let Some(schema) = schema {
        let mask = create_projection(schema, builder.schema(), builder.parquet_schema());
        if let Some(mask) = mask {
            builder = builder.with_projection(mask);
        }
    }

    let batches = builder
        .build()?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let rows = batches.iter().map(RecordBatch::num_rows).sum();
    log_file_read(path, rows, start.elapsed());
    Ok(batches)
}

/// Find all Parquet files in a directory, sorted by file name
pub fn find_parquet_files(dir: &Path) -> Result<Vec<PathBuf>> {
    validate_directory(dir)?;

    let parquet_files = std::fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .filter_ok(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "parquet"))
        .collect::<std::io::Result<Vec<_>>>()?
        .into_iter()
        .sorted()
        .collect_vec();

    if parquet_files.is_empty() {
        log_warning("No Parquet files found in directory", Some(dir));
    }

    Ok(parquet_files)
}

/// Load all parquet files from a directory in parallel
///
/// Batches are returned in file-name order.
pub fn load_parquet_files_parallel(
    dir: &Path,
    schema: Option<&Schema>,
) -> Result<Vec<RecordBatch>> {
    let parquet_files = find_parquet_files(dir)?;

    let per_file: Vec<Result<Vec<RecordBatch>>> = parquet_files
        .par_iter()
        .map(|path| read_parquet(path, schema))
        .collect();

    let mut combined = Vec::new();
    for result in per_file {
        combined.extend(result?);
    }

    log::info!(
        "Loaded {} batches from {} Parquet files in {}",
        combined.len(),
        parquet_files.len(),
        dir.display()
    );

    Ok(combined)
}

/// Locate a table in the data directory
///
/// Prefers `<name>.parquet`, then a `<name>/` directory.
pub fn table_path(data_dir: &Path, table: &str) -> Result<PathBuf> {
    let file = data_dir.join(format!("{table}.parquet"));
    if file.is_file() {
        return Ok(file);
    }
    let dir = data_dir.join(table);
    if dir.is_dir() {
        return Ok(dir);
    }
    Err(MortalityError::MissingTable {
        table: table.to_string(),
        path: data_dir.to_path_buf(),
    })
}

/// Read every row of a typed table from the data directory
pub fn read_table<T: TableRecord>(data_dir: &Path) -> Result<Vec<T>> {
    let path = table_path(data_dir, T::TABLE_NAME)?;
    let schema = T::schema()?;

    let (batches, files) = if path.is_dir() {
        let files = find_parquet_files(&path)?.len();
        (load_parquet_files_parallel(&path, Some(&schema))?, files)
    } else {
        (read_parquet(&path, Some(&schema))?, 1)
    };

    let records = T::from_batches(&batches)?;
    log_table_loaded(T::TABLE_NAME, files, records.len());
    Ok(records)
}

/// Write a record batch to a parquet file
pub fn write_parquet(path: &Path, batch: &RecordBatch) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
    writer.write(batch)?;
    writer.close()?;
    Ok(())
}

/// Write typed records as `<name>.parquet` in the data directory
pub fn write_table<T: TableRecord>(data_dir: &Path, records: &[T]) -> Result<PathBuf> {
    std::fs::create_dir_all(data_dir)?;
    let path = data_dir.join(format!("{}.parquet", T::TABLE_NAME));
    let batch = T::to_batch(records)?;
    write_parquet(&path, &batch)?;
    log_table_written(T::TABLE_NAME, &path, records.len());
    Ok(path)
}
