//! Utility functions for logging and console output

pub mod logging;

pub use logging::{log_exclusions, log_file_read, log_table_loaded, log_table_written, log_warning};
