//! Error handling for the mortality analysis.

use std::io;
use std::path::PathBuf;

use arrow::error::ArrowError;
use parquet::errors::ParquetError;

/// Specialized error type for loading survey tables and computing rates
#[derive(Debug, thiserror::Error)]
pub enum MortalityError {
    /// Error opening or reading a file
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    /// Error processing Parquet data
    #[error("Parquet error: {0}")]
    ParquetError(#[from] ParquetError),

    /// Error manipulating Arrow arrays
    #[error("Arrow error: {0}")]
    ArrowError(#[from] ArrowError),

    /// Error converting between record batches and typed records
    #[error("Conversion error: {0}")]
    SerdeError(#[from] serde_arrow::Error),

    /// Error parsing the analysis configuration
    #[error("Configuration error: {0}")]
    ConfigError(#[from] serde_json::Error),

    /// A configuration value is out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A required column is absent from a table
    #[error("Table {table} is missing required column {column}")]
    MissingColumn { table: String, column: String },

    /// No file or directory found for a table
    #[error("Table {table} not found at {}", path.display())]
    MissingTable { table: String, path: PathBuf },

    /// A rate was requested over zero person-time
    #[error("No person-time available for {0}")]
    EmptyExposure(String),

    /// A reference distribution has no positive mass
    #[error("Invalid distribution {name}: {reason}")]
    InvalidDistribution { name: String, reason: String },

    /// A stratum with a single cluster under `SingletonMethod::Fail`
    #[error("Stratum {0} has a single cluster; variance is not estimable")]
    SingletonStratum(i32),

    /// Official data do not cover the reference window
    #[error("Baseline data missing: {0}")]
    MissingBaseline(String),
}

impl MortalityError {
    /// Build a `MissingColumn` error
    pub fn missing_column(table: &str, column: &str) -> Self {
        Self::MissingColumn {
            table: table.to_string(),
            column: column.to_string(),
        }
    }

    /// Build an `InvalidDistribution` error
    pub fn invalid_distribution(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidDistribution {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for mortality analysis operations
pub type Result<T> = std::result::Result<T, MortalityError>;
