//! Log lines for table I/O and record exclusions

use std::path::Path;
use std::time::Duration;

/// One parquet file read, at debug level
pub fn log_file_read(path: &Path, rows: usize, elapsed: Duration) {
    log::debug!("Read {rows} rows from {} in {elapsed:?}", path.display());
}

/// A survey or reference table fully loaded
///
/// `files` is the number of parquet parts the table was split into.
pub fn log_table_loaded(table: &str, files: usize, rows: usize) {
    if files > 1 {
        log::info!("Table {table}: {rows} rows from {files} files");
    } else {
        log::info!("Table {table}: {rows} rows");
    }
}

/// A table written to disk
pub fn log_table_written(table: &str, path: &Path, rows: usize) {
    log::info!("Wrote {rows} {table} rows to {}", path.display());
}

/// Warning with an optional path for context
pub fn log_warning(message: &str, path: Option<&Path>) {
    match path {
        Some(path) => log::warn!("{message}: {}", path.display()),
        None => log::warn!("{message}"),
    }
}

/// Records dropped from an aggregation step; silent when `excluded` is zero
pub fn log_exclusions(step: &str, excluded: usize, reason: &str) {
    if excluded > 0 {
        log::warn!("{step}: excluded {excluded} records ({reason})");
    }
}
