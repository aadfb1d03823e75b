//! Console output utilities
//!
//! This module provides utilities for formatted console output.

use crate::dataset::SurveyDataset;

/// Print row counts for each loaded table
pub fn print_dataset_summary(dataset: &SurveyDataset) {
    println!("Loaded tables:");
    for (name, rows) in dataset.table_sizes() {
        println!("  - {name:<24} {rows:>8} rows");
    }
}

/// Print a titled block of text followed by a blank line
pub fn print_section(title: &str, body: &str) {
    println!("{title}");
    println!("{}", "=".repeat(title.len()));
    println!("{body}");
}
