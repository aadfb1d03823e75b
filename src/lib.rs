//! A Rust library for estimating excess mortality after a disaster from a
//! household survey, with household-size and age adjustments and a baseline
//! from official vital statistics.

pub mod algorithm;
pub mod config;
pub mod dataset;
pub mod error;
pub mod models;
pub mod reader;
pub mod schema;
pub mod utils;

// Re-export the most common types for easier use
// Core types
pub use config::AnalysisConfig;
pub use dataset::{SurveyDataset, SyntheticConfig, generate_synthetic_dataset};
pub use error::{MortalityError, Result};
pub use schema::TableRecord;

// Estimation
pub use algorithm::mortality::{
    AnalysisResults, MortalityAnalysis, Period, RateEstimate, RateEstimator, SensitivityReport,
    SingleHouseholdPolicy,
};

// Arrow types
pub use arrow::datatypes::Schema as ArrowSchema;
pub use arrow::record_batch::RecordBatch;

// Utility functions
pub use reader::{DEFAULT_BATCH_SIZE, load_parquet_files_parallel, read_parquet, read_table, write_table};
