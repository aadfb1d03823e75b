//! Configuration for the mortality analysis.
//!
//! Defaults reproduce the published analysis: a survey fielded after a
//! hurricane making landfall on 2017-09-20, compared against official
//! vital statistics for the same calendar window in 2016.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Deserialize;

use crate::algorithm::mortality::design::SingletonMethod;
use crate::algorithm::mortality::household_size::SingleHouseholdPolicy;
use crate::algorithm::mortality::window::ObservationWindow;
use crate::error::{MortalityError, Result};

/// Configuration for the analysis pipeline
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Directory holding the survey and reference tables
    pub data_dir: PathBuf,
    /// Date of the event; deaths on or after it count as post-event
    pub event_date: NaiveDate,
    /// Start of the pre-event comparison window
    pub pre_event_start: NaiveDate,
    /// End of observation (exclusive)
    pub observation_end: NaiveDate,
    /// Population the rate difference is scaled to
    pub population: f64,
    /// Rates are reported per this many person-years
    pub rate_multiplier: f64,
    /// Length of a person-year in days
    pub days_per_year: f64,
    /// Confidence level for all intervals
    pub confidence_level: f64,
    /// Households of this size or larger share one stratum
    pub household_size_cap: i32,
    /// Treatment of single-person households in the size adjustment
    pub single_household_policy: SingleHouseholdPolicy,
    /// Variance handling for strata with a single sampled cluster
    pub singleton_method: SingletonMethod,
    /// Year whose official counts form the plug-in baseline
    pub baseline_year: i32,
    /// Years used to describe baseline variability
    pub baseline_series_years: Vec<i32>,
    /// Baseline SE / survey SE below this is considered negligible
    pub negligible_threshold: f64,
    /// Death day imputed when only the month is recorded
    pub imputed_death_day: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            event_date: NaiveDate::from_ymd_opt(2017, 9, 20).unwrap_or_default(),
            pre_event_start: NaiveDate::from_ymd_opt(2017, 1, 1).unwrap_or_default(),
            observation_end: NaiveDate::from_ymd_opt(2018, 1, 1).unwrap_or_default(),
            population: 3_337_177.0,
            rate_multiplier: 1000.0,
            days_per_year: 365.0,
            confidence_level: 0.95,
            household_size_cap: 6,
            single_household_policy: SingleHouseholdPolicy::Exclude,
            singleton_method: SingletonMethod::Center,
            baseline_year: 2016,
            baseline_series_years: (2010..=2016).collect(),
            negligible_threshold: 0.05,
            imputed_death_day: 15,
        }
    }
}

impl AnalysisConfig {
    /// Load a configuration from a JSON file; absent fields keep their defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no interval or rate can be computed with
    pub fn validate(&self) -> Result<()> {
        let level = self.confidence_level;
        if level.is_nan() || level <= 0.0 || level >= 1.0 {
            return Err(MortalityError::InvalidConfig(format!(
                "confidence_level must lie strictly between 0 and 1, got {level}"
            )));
        }
        if self.days_per_year.is_nan() || self.days_per_year <= 0.0 {
            return Err(MortalityError::InvalidConfig(format!(
                "days_per_year must be positive, got {}",
                self.days_per_year
            )));
        }
        Ok(())
    }

    /// Window before the event
    #[must_use]
    pub fn pre_event_window(&self) -> ObservationWindow {
        ObservationWindow::new(self.pre_event_start, self.event_date)
    }

    /// Window from the event to the end of observation
    #[must_use]
    pub fn post_event_window(&self) -> ObservationWindow {
        ObservationWindow::new(self.event_date, self.observation_end)
    }
}

impl fmt::Display for AnalysisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Analysis Configuration:")?;
        writeln!(f, "  Data Directory: {}", self.data_dir.display())?;
        writeln!(f, "  Event Date: {}", self.event_date)?;
        writeln!(
            f,
            "  Pre-event Window: {} to {}",
            self.pre_event_start, self.event_date
        )?;
        writeln!(
            f,
            "  Post-event Window: {} to {}",
            self.event_date, self.observation_end
        )?;
        writeln!(f, "  Population: {:.0}", self.population)?;
        writeln!(f, "  Rates per: {:.0} person-years", self.rate_multiplier)?;
        writeln!(f, "  Confidence Level: {:.2}", self.confidence_level)?;
        writeln!(f, "  Household Size Cap: {}", self.household_size_cap)?;
        writeln!(
            f,
            "  Single Household Policy: {}",
            self.single_household_policy
        )?;
        writeln!(f, "  Singleton Strata: {:?}", self.singleton_method)?;
        writeln!(f, "  Baseline Year: {}", self.baseline_year)?;
        Ok(())
    }
}
