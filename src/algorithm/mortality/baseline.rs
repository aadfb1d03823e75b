//! Pre-event baseline from official vital statistics
//!
//! The reference window is the post-event calendar window shifted to a
//! reference year. Registered monthly deaths are prorated by the days of each
//! month falling inside the window and divided by the person-years of the
//! resident population over the window.

use chrono::{Datelike, NaiveDate};
use rustc_hash::FxHashMap;
use statrs::statistics::Statistics;

use crate::error::{MortalityError, Result};
use crate::models::{OfficialDeathRecord, PopulationRecord};

use super::rate::{RateEstimate, RateEstimator, RateMethod};
use super::window::ObservationWindow;

/// Official death rate over a reference window
#[derive(Debug, Clone, PartialEq)]
pub struct BaselineRate {
    /// Reference year
    pub year: i32,
    /// Reference window
    pub window: ObservationWindow,
    /// Registered deaths prorated to the window
    pub deaths: f64,
    /// Resident population in the reference year
    pub population: f64,
    /// Population person-years over the window
    pub person_years: f64,
    /// Annualised rate with Poisson standard error
    pub estimate: RateEstimate,
}

impl BaselineRate {
    /// Deaths per multiplier residents over the window
    #[must_use]
    pub fn window_rate(&self) -> f64 {
        self.estimate.over_window(self.window_years())
    }

    /// Length of the reference window in years
    #[must_use]
    pub fn window_years(&self) -> f64 {
        if self.population > 0.0 {
            self.person_years / self.population
        } else {
            0.0
        }
    }
}

/// Baseline rates for a series of reference years
#[derive(Debug, Clone, PartialEq)]
pub struct BaselineSeries {
    /// One rate per available year, in year order
    pub rates: Vec<BaselineRate>,
    /// Mean of the annualised rates
    pub mean: f64,
    /// Sample standard deviation of the annualised rates (NaN for one year)
    pub std_dev: f64,
}

/// How the baseline's sampling error compares with the survey's
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaselineVariability {
    /// Standard error of the baseline rate
    pub baseline_se: f64,
    /// Standard error of the survey rate
    pub survey_se: f64,
    /// `baseline_se / survey_se`
    pub se_ratio: f64,
    /// `baseline_se² / survey_se²`
    pub variance_ratio: f64,
    /// Whether the SE ratio is below the threshold
    pub negligible: bool,
}

/// First day of the month following `date`'s month
fn next_month(date: NaiveDate) -> Option<NaiveDate> {
    if date.month() == 12 {
        NaiveDate::from_ymd_opt(date.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(date.year(), date.month() + 1, 1)
    }
}

/// Registered deaths prorated to `window`
///
/// Every month touching the window must have a count.
pub fn prorated_deaths(official: &[OfficialDeathRecord], window: &ObservationWindow) -> Result<f64> {
    let counts: FxHashMap<(i32, i32), f64> = official
        .iter()
        .filter_map(|r| r.deaths.filter(|d| d.is_finite()).map(|d| ((r.year, r.month), d)))
        .collect();

    let Some(mut month_start) = window.start.with_day(1) else {
        return Ok(0.0);
    };
    let mut deaths = 0.0;
    while month_start < window.end {
        let Some(month_end) = next_month(month_start) else {
            break;
        };
        let overlap = window.overlap_days(month_start, month_end);
        if overlap > 0 {
            let key = (month_start.year(), month_start.month() as i32);
            let count = counts.get(&key).ok_or_else(|| {
                MortalityError::MissingBaseline(format!(
                    "no official death count for {}-{:02}",
                    key.0, key.1
                ))
            })?;
            let month_days = (month_end - month_start).num_days() as f64;
            deaths += count * overlap as f64 / month_days;
        }
        month_start = month_end;
    }
    Ok(deaths)
}

/// Official death rate for `post_event_window` shifted to `year`
pub fn baseline_rate(
    official: &[OfficialDeathRecord],
    population: &[PopulationRecord],
    post_event_window: &ObservationWindow,
    year: i32,
    estimator: &RateEstimator,
    days_per_year: f64,
) -> Result<BaselineRate> {
    let window = post_event_window.shifted_to_year(year).ok_or_else(|| {
        MortalityError::MissingBaseline(format!("window {post_event_window} does not exist in {year}"))
    })?;
    let residents = population
        .iter()
        .find(|p| p.year == year)
        .and_then(|p| p.population)
        .filter(|p| p.is_finite() && *p > 0.0)
        .ok_or_else(|| MortalityError::MissingBaseline(format!("no population estimate for {year}")))?;

    let deaths = prorated_deaths(official, &window)?;
    let person_years = residents * window.years(days_per_year);
    let estimate = estimator.from_counts(RateMethod::OfficialBaseline, deaths, person_years)?;

    log::debug!(
        "Baseline {year}: {deaths:.0} deaths over {window}, population {residents:.0}, rate {:.2}",
        estimate.rate
    );

    Ok(BaselineRate {
        year,
        window,
        deaths,
        population: residents,
        person_years,
        estimate,
    })
}

/// Baseline rates over several reference years
///
/// Years without complete data are skipped with a warning.
pub fn baseline_series(
    official: &[OfficialDeathRecord],
    population: &[PopulationRecord],
    post_event_window: &ObservationWindow,
    years: &[i32],
    estimator: &RateEstimator,
    days_per_year: f64,
) -> Result<BaselineSeries> {
    let mut rates = Vec::with_capacity(years.len());
    for &year in years {
        match baseline_rate(official, population, post_event_window, year, estimator, days_per_year) {
            Ok(rate) => rates.push(rate),
            Err(MortalityError::MissingBaseline(reason)) => {
                log::warn!("Skipping baseline year {year}: {reason}");
            }
            Err(e) => return Err(e),
        }
    }
    if rates.is_empty() {
        return Err(MortalityError::MissingBaseline(
            "no reference year has complete official data".into(),
        ));
    }
    rates.sort_by_key(|r| r.year);

    let values: Vec<f64> = rates.iter().map(|r| r.estimate.rate).collect();
    let mean = values.iter().mean();
    let std_dev = values.iter().std_dev();

    Ok(BaselineSeries {
        rates,
        mean,
        std_dev,
    })
}

/// Compare the baseline's standard error with a survey estimate's
#[must_use]
pub fn compare_variability(
    baseline: &RateEstimate,
    survey: &RateEstimate,
    threshold: f64,
) -> BaselineVariability {
    let baseline_se = baseline.standard_error;
    let survey_se = survey.standard_error;
    let se_ratio = if survey_se > 0.0 {
        baseline_se / survey_se
    } else {
        f64::INFINITY
    };
    BaselineVariability {
        baseline_se,
        survey_se,
        se_ratio,
        variance_ratio: se_ratio * se_ratio,
        negligible: se_ratio < threshold,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn post_event() -> ObservationWindow {
        ObservationWindow::new(date(2017, 9, 20), date(2018, 1, 1))
    }

    fn official(year: i32, monthly: f64) -> Vec<OfficialDeathRecord> {
        (1..=12)
            .map(|month| OfficialDeathRecord {
                year,
                month,
                deaths: Some(monthly),
            })
            .collect()
    }

    fn population(year: i32, population: f64) -> Vec<PopulationRecord> {
        vec![PopulationRecord {
            year,
            population: Some(population),
        }]
    }

    #[test]
    fn test_prorated_deaths() {
        // 11 of 30 days in September plus October to December
        let window = post_event().shifted_to_year(2016).unwrap();
        let deaths = prorated_deaths(&official(2016, 3000.0), &window).unwrap();
        assert!((deaths - (3000.0 * 11.0 / 30.0 + 9000.0)).abs() < 1e-9);
    }

    #[test]
    fn test_missing_month() {
        let mut records = official(2016, 3000.0);
        records.retain(|r| r.month != 11);
        let window = post_event().shifted_to_year(2016).unwrap();
        assert!(matches!(
            prorated_deaths(&records, &window),
            Err(MortalityError::MissingBaseline(_))
        ));
    }

    #[test]
    fn test_baseline_rate_over_window() {
        // about 8.8 deaths per 1000 per year
        let residents = 3_406_520.0;
        let monthly = residents * 8.8 / 1000.0 / 12.0;
        let baseline = baseline_rate(
            &official(2016, monthly),
            &population(2016, residents),
            &post_event(),
            2016,
            &RateEstimator::default(),
            365.0,
        )
        .unwrap();

        assert_eq!(baseline.window.start, date(2016, 9, 20));
        assert!((baseline.estimate.rate - 8.8).abs() < 0.2);
        assert!((baseline.window_rate() - 2.5).abs() < 0.15);
        assert!(baseline.estimate.relative_standard_error() < 0.05);
    }

    #[test]
    fn test_missing_population() {
        let result = baseline_rate(
            &official(2016, 100.0),
            &population(2015, 1000.0),
            &post_event(),
            2016,
            &RateEstimator::default(),
            365.0,
        );
        assert!(matches!(result, Err(MortalityError::MissingBaseline(_))));
    }

    #[test]
    fn test_series_skips_incomplete_years() {
        let mut records = official(2015, 2500.0);
        records.extend(official(2016, 2600.0));
        let mut residents = population(2015, 3_470_000.0);
        residents.extend(population(2016, 3_410_000.0));

        let series = baseline_series(
            &records,
            &residents,
            &post_event(),
            &[2014, 2015, 2016],
            &RateEstimator::default(),
            365.0,
        )
        .unwrap();
        assert_eq!(series.rates.len(), 2);
        assert_eq!(series.rates[0].year, 2015);
        assert!(series.std_dev > 0.0);
        assert!(series.mean > series.rates[0].estimate.rate);
    }

    #[test]
    fn test_variability_comparison() {
        let estimator = RateEstimator::default();
        let baseline = estimator
            .from_counts(RateMethod::OfficialBaseline, 40_000.0, 4_000_000.0)
            .unwrap();
        let survey = estimator.from_counts(RateMethod::Keyfitz, 40.0, 4_000.0).unwrap();
        let check = compare_variability(&baseline, &survey, 0.05);
        // 0.05 vs 1.58
        assert!(check.negligible);
        assert!((check.variance_ratio - check.se_ratio.powi(2)).abs() < 1e-12);
    }
}
