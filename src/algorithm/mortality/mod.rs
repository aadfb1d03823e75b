//! Mortality rate estimation for a household survey
//!
//! This module estimates death rates before and after an event from a
//! stratified cluster survey, adjusts them for household-size undercoverage
//! and age composition, and compares them with official vital statistics.

pub mod age_adjustment;
pub mod baseline;
pub mod design;
pub mod excess;
pub mod frame;
pub mod household_size;
pub mod pipeline;
pub mod rate;
pub mod report;
pub mod window;

pub use age_adjustment::{AgeAdjustment, AgeGroup, AgeStratum, adjust_for_age};
pub use baseline::{
    BaselineRate, BaselineSeries, BaselineVariability, baseline_rate, baseline_series,
    compare_variability,
};
pub use design::{DesignVariance, SingletonMethod};
pub use excess::{ExcessDeaths, excess_deaths};
pub use frame::{AnalysisFrame, Period};
pub use household_size::{
    HouseholdSizeAdjustment, PlugInSource, SingleHouseholdPolicy, SizeStratum,
    adjust_for_household_size,
};
pub use pipeline::{AnalysisResults, MortalityAnalysis, PeriodEstimates};
pub use rate::{ConfidenceInterval, RateEstimate, RateEstimator, RateMethod, keyfitz_standard_error};
pub use report::{SensitivityReport, SensitivityRow};
pub use window::{Exposure, ObservationWindow};
