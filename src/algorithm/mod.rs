//! Algorithm implementations for the mortality study
//!
//! This module contains the rate estimators, the adjustments applied to them,
//! and the pipeline that strings them together into a sensitivity report.

pub mod mortality;
