//! End-to-end mortality analysis
//!
//! Builds the analysis frame from a loaded dataset and runs every estimator
//! for both periods, the household-size and age adjustments, the official
//! baseline, and the excess-death calculation.

use std::fmt;
use std::time::Instant;

use crate::config::AnalysisConfig;
use crate::dataset::SurveyDataset;
use crate::error::{MortalityError, Result};

use super::age_adjustment::{AgeAdjustment, adjust_for_age};
use super::baseline::{
    BaselineRate, BaselineSeries, BaselineVariability, baseline_rate, baseline_series,
    compare_variability,
};
use super::excess::{ExcessDeaths, excess_deaths};
use super::frame::{AnalysisFrame, FrameExclusions, Period};
use super::household_size::{
    HouseholdSizeAdjustment, PlugInSource, SingleHouseholdPolicy, adjust_for_household_size,
};
use super::rate::{RateEstimate, RateEstimator};
use super::report::SensitivityReport;

/// Crude estimates for one period
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodEstimates {
    /// Period the rates refer to
    pub period: Period,
    /// Unweighted, linearization SE
    pub unweighted: RateEstimate,
    /// Unweighted, Keyfitz SE
    pub keyfitz: RateEstimate,
    /// Survey-weighted, design SE; `None` without usable weights
    pub weighted: Option<RateEstimate>,
}

/// Everything the analysis produces
#[derive(Debug, Clone)]
pub struct AnalysisResults {
    /// Records dropped while building the frame
    pub exclusions: FrameExclusions,
    /// Households in the frame
    pub households: usize,
    /// Persons in the frame, decedents included
    pub persons: usize,
    /// Crude estimates before the event
    pub pre_event: PeriodEstimates,
    /// Crude estimates after the event
    pub post_event: PeriodEstimates,
    /// Household-size adjustments for every period and policy
    pub household_size: Vec<HouseholdSizeAdjustment>,
    /// Age-standardized rates, one per period
    pub age_adjusted: Vec<AgeAdjustment>,
    /// Official baseline for the reference year
    pub baseline: Option<BaselineRate>,
    /// Official baseline across the series years
    pub baseline_series: Option<BaselineSeries>,
    /// Post-event rate under the configured policy
    pub headline: HouseholdSizeAdjustment,
    /// Baseline sampling error relative to the headline rate's
    pub variability: Option<BaselineVariability>,
    /// Excess deaths implied by the headline rate
    pub excess: Option<ExcessDeaths>,
    /// All estimators side by side
    pub report: SensitivityReport,
}

impl AnalysisResults {
    /// Household-size adjustment for a period and policy, if it was run
    #[must_use]
    pub fn household_size_adjustment(
        &self,
        period: Period,
        policy: SingleHouseholdPolicy,
    ) -> Option<&HouseholdSizeAdjustment> {
        self.household_size
            .iter()
            .find(|a| a.period == period && a.policy == policy)
    }

    /// Crude estimates for a period
    #[must_use]
    pub fn period(&self, period: Period) -> &PeriodEstimates {
        match period {
            Period::PreEvent => &self.pre_event,
            Period::PostEvent => &self.post_event,
        }
    }
}

impl fmt::Display for AnalysisResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Frame: {} households, {} persons",
            self.households, self.persons
        )?;
        writeln!(f)?;
        write!(f, "{}", self.report)?;
        writeln!(f)?;
        writeln!(
            f,
            "Headline ({}): {}",
            self.headline.policy, self.headline.estimate
        )?;
        if let Some(excess) = &self.excess {
            writeln!(f, "Excess deaths: {excess}")?;
            if let Some(increase) = excess.relative_increase {
                writeln!(f, "Relative increase: {:.1}%", increase * 100.0)?;
            }
        }
        if let Some(series) = &self.baseline_series {
            writeln!(
                f,
                "Baseline {}-{}: mean {:.2}, sd {:.2}",
                series.rates.first().map_or(0, |r| r.year),
                series.rates.last().map_or(0, |r| r.year),
                series.mean,
                series.std_dev
            )?;
        }
        if let Some(check) = &self.variability {
            writeln!(
                f,
                "Baseline SE {:.3} vs survey SE {:.3} (ratio {:.3}, {})",
                check.baseline_se,
                check.survey_se,
                check.se_ratio,
                if check.negligible {
                    "negligible"
                } else {
                    "not negligible"
                }
            )?;
        }
        Ok(())
    }
}

/// Runs the analysis with a fixed configuration
#[derive(Debug, Clone)]
pub struct MortalityAnalysis {
    config: AnalysisConfig,
    estimator: RateEstimator,
}

impl MortalityAnalysis {
    /// Create an analysis with the given configuration
    #[must_use]
    pub fn new(config: AnalysisConfig) -> Self {
        let estimator = RateEstimator::from_config(&config);
        Self { config, estimator }
    }

    /// The configuration in use
    #[must_use]
    pub const fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Crude estimates for one period
    pub fn period_estimates(&self, frame: &AnalysisFrame, period: Period) -> Result<PeriodEstimates> {
        let units = frame.rate_units(period);
        let unweighted = self.estimator.unweighted(&units)?;
        let keyfitz = self.estimator.keyfitz(&units)?;

        let weighted_units = frame.weighted_rate_units(period);
        let weighted = if weighted_units.is_empty() {
            log::warn!("No weighted households; skipping the survey-design estimate ({period})");
            None
        } else {
            Some(self.estimator.weighted(&weighted_units)?)
        };

        Ok(PeriodEstimates {
            period,
            unweighted,
            keyfitz,
            weighted,
        })
    }

    /// Single-household policies to compare
    ///
    /// The configured policy is always included; the baseline plug-in only
    /// when a baseline is available.
    fn policies(&self, has_baseline: bool) -> Vec<SingleHouseholdPolicy> {
        let mut policies = vec![SingleHouseholdPolicy::Observed, SingleHouseholdPolicy::Exclude];
        if has_baseline {
            policies.push(SingleHouseholdPolicy::PlugIn(PlugInSource::Baseline));
        }
        if !policies.contains(&self.config.single_household_policy) {
            policies.push(self.config.single_household_policy);
        }
        policies
    }

    /// Run the full analysis
    pub fn run(&self, dataset: &SurveyDataset) -> Result<AnalysisResults> {
        let start = Instant::now();
        let config = &self.config;
        config.validate()?;
        let frame = AnalysisFrame::build(dataset, config);

        let pre_event = self.period_estimates(&frame, Period::PreEvent)?;
        let post_event = self.period_estimates(&frame, Period::PostEvent)?;

        let baseline = optional_baseline(baseline_rate(
            &dataset.official_deaths,
            &dataset.population,
            &frame.post_event_window,
            config.baseline_year,
            &self.estimator,
            config.days_per_year,
        ))?;
        let baseline_series = optional_baseline(baseline_series(
            &dataset.official_deaths,
            &dataset.population,
            &frame.post_event_window,
            &config.baseline_series_years,
            &self.estimator,
            config.days_per_year,
        ))?;
        let baseline_value = baseline.as_ref().map(|b| b.estimate.rate);

        let mut household_size = Vec::new();
        for period in [Period::PreEvent, Period::PostEvent] {
            for policy in self.policies(baseline_value.is_some()) {
                household_size.push(adjust_for_household_size(
                    &frame,
                    period,
                    &dataset.census_household_size,
                    config.household_size_cap,
                    policy,
                    baseline_value,
                    &self.estimator,
                )?);
            }
        }

        let age_adjusted = [Period::PreEvent, Period::PostEvent]
            .into_iter()
            .map(|period| adjust_for_age(&frame, period, &dataset.census_age, &self.estimator))
            .collect::<Result<Vec<_>>>()?;

        let headline = household_size
            .iter()
            .find(|a| a.period == Period::PostEvent && a.policy == config.single_household_policy)
            .cloned()
            .ok_or_else(|| {
                MortalityError::MissingBaseline(format!(
                    "headline policy {} could not be evaluated",
                    config.single_household_policy
                ))
            })?;

        let variability = baseline.as_ref().map(|b| {
            compare_variability(&b.estimate, &headline.estimate, config.negligible_threshold)
        });

        let window_years = frame.post_event_window.years(config.days_per_year);
        let excess_for = |estimate: &RateEstimate| {
            baseline_value.map(|rate| {
                excess_deaths(
                    estimate,
                    rate,
                    config.population,
                    window_years,
                    config.rate_multiplier,
                )
            })
        };
        let excess = excess_for(&headline.estimate);

        let mut report = SensitivityReport::new(
            baseline.as_ref().map(|b| b.year),
            baseline_value,
        );
        for estimates in [&pre_event, &post_event] {
            let period = estimates.period;
            let row_excess = |e: &RateEstimate| match period {
                Period::PreEvent => None,
                Period::PostEvent => excess_for(e),
            };
            report.push(
                "unweighted, linearization",
                period,
                estimates.unweighted.clone(),
                row_excess(&estimates.unweighted),
            );
            report.push(
                "unweighted, keyfitz",
                period,
                estimates.keyfitz.clone(),
                row_excess(&estimates.keyfitz),
            );
            if let Some(weighted) = &estimates.weighted {
                report.push(
                    "weighted, survey design",
                    period,
                    weighted.clone(),
                    row_excess(weighted),
                );
            }
            for adjustment in household_size.iter().filter(|a| a.period == period) {
                report.push(
                    format!("household size, {}", adjustment.policy),
                    period,
                    adjustment.estimate.clone(),
                    row_excess(&adjustment.estimate),
                );
            }
            for adjustment in age_adjusted.iter().filter(|a| a.period == period) {
                report.push(
                    "age adjusted",
                    period,
                    adjustment.estimate.clone(),
                    row_excess(&adjustment.estimate),
                );
            }
        }

        log::info!(
            "Analysis complete in {:?}: post-event rate {:.2}, pre-event rate {:.2}",
            start.elapsed(),
            headline.estimate.rate,
            pre_event.keyfitz.rate
        );

        Ok(AnalysisResults {
            exclusions: frame.exclusions,
            households: frame.households.len(),
            persons: frame.persons.len(),
            pre_event,
            post_event,
            household_size,
            age_adjusted,
            baseline,
            baseline_series,
            headline,
            variability,
            excess,
            report,
        })
    }
}

/// Downgrade missing official data to a warning
fn optional_baseline<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(MortalityError::MissingBaseline(reason)) => {
            log::warn!("Baseline unavailable: {reason}");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
