//! Logging utilities for output and progress tracking
//!
//! This module provides utilities for logging, console output, and progress tracking.

pub mod console;
pub mod log;
pub mod progress;

// Re-export commonly used functions for convenience
pub use log::{log_exclusions, log_file_read, log_table_loaded, log_table_written, log_warning};
pub use progress::{create_main_progress_bar, finish_progress_bar};
