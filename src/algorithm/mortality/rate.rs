//! Death-rate estimators
//!
//! Every estimator is a ratio of deaths to person-years, reported per
//! `multiplier` person-years (1000 by default). They differ in weighting and
//! in how the standard error is approximated:
//!
//! - [`RateEstimator::unweighted`]: households as independent clusters,
//!   linearization variance
//! - [`RateEstimator::weighted`]: survey weights, stratified cluster design
//! - [`RateEstimator::keyfitz`]: `SE = rate / sqrt(deaths)`

use std::fmt;

use statrs::distribution::{ContinuousCDF, Normal};

use crate::config::AnalysisConfig;
use crate::error::{MortalityError, Result};

use super::design::{SingletonMethod, ratio_scores, stratified_cluster_variance};

/// One unit (household) entering a rate estimate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateUnit {
    /// Deaths observed in the unit
    pub deaths: f64,
    /// Person-years of exposure
    pub person_years: f64,
    /// Sampling weight
    pub weight: f64,
    /// Design stratum
    pub stratum: i32,
    /// Primary sampling unit index
    pub cluster: usize,
}

/// How a rate and its standard error were obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateMethod {
    /// Unweighted ratio, linearization variance
    Linearization,
    /// Weighted ratio, stratified cluster design variance
    SurveyDesign,
    /// Unweighted ratio, Keyfitz approximation
    Keyfitz,
    /// Post-stratified by household size, Keyfitz approximation
    HouseholdSizeAdjusted,
    /// Directly standardized by age, Keyfitz approximation
    AgeAdjusted,
    /// Official counts over population, Poisson approximation
    OfficialBaseline,
}

impl fmt::Display for RateMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Linearization => "linearization",
            Self::SurveyDesign => "survey design",
            Self::Keyfitz => "keyfitz",
            Self::HouseholdSizeAdjusted => "household size",
            Self::AgeAdjusted => "age adjusted",
            Self::OfficialBaseline => "official",
        };
        f.write_str(label)
    }
}

/// A symmetric normal-theory confidence interval
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceInterval {
    /// Lower bound
    pub lower: f64,
    /// Upper bound
    pub upper: f64,
    /// Nominal coverage
    pub level: f64,
}

impl ConfidenceInterval {
    /// `estimate ± z · se`
    #[must_use]
    pub fn normal(estimate: f64, standard_error: f64, level: f64) -> Self {
        let half_width = normal_quantile(level) * standard_error;
        Self {
            lower: estimate - half_width,
            upper: estimate + half_width,
            level,
        }
    }

    /// Whether `value` lies inside the interval
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }

    /// Distance between the bounds
    #[must_use]
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

impl fmt::Display for ConfidenceInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2})", self.lower, self.upper)
    }
}

/// A death rate with its uncertainty
#[derive(Debug, Clone, PartialEq)]
pub struct RateEstimate {
    /// Estimator used
    pub method: RateMethod,
    /// Deaths in the numerator (weighted for survey-design estimates)
    pub deaths: f64,
    /// Person-years in the denominator (weighted for survey-design estimates)
    pub person_years: f64,
    /// Rate per multiplier person-years
    pub rate: f64,
    /// Standard error on the same scale as `rate`
    pub standard_error: f64,
    /// Confidence interval for the rate
    pub interval: ConfidenceInterval,
    /// Design degrees of freedom, when a design variance was used
    pub degrees_of_freedom: Option<usize>,
}

impl RateEstimate {
    /// Assemble an estimate with a normal interval
    #[must_use]
    pub fn new(
        method: RateMethod,
        deaths: f64,
        person_years: f64,
        rate: f64,
        standard_error: f64,
        level: f64,
    ) -> Self {
        Self {
            method,
            deaths,
            person_years,
            rate,
            standard_error,
            interval: ConfidenceInterval::normal(rate, standard_error, level),
            degrees_of_freedom: None,
        }
    }

    /// Standard error relative to the rate; zero for a zero rate
    #[must_use]
    pub fn relative_standard_error(&self) -> f64 {
        if self.rate == 0.0 {
            0.0
        } else {
            self.standard_error / self.rate
        }
    }

    /// Deaths per multiplier persons over a window of `years`
    #[must_use]
    pub fn over_window(&self, years: f64) -> f64 {
        self.rate * years
    }
}

impl fmt::Display for RateEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.2} (SE {:.2}, {:.0}% CI {})",
            self.rate,
            self.standard_error,
            self.interval.level * 100.0,
            self.interval
        )
    }
}

/// Two-sided standard normal quantile for a confidence level
///
/// `normal_quantile(0.95)` is about 1.96.
#[must_use]
pub fn normal_quantile(level: f64) -> f64 {
    let alpha = (1.0 - level).clamp(f64::MIN_POSITIVE, 1.0);
    Normal::new(0.0, 1.0).map_or(f64::NAN, |normal| normal.inverse_cdf(1.0 - alpha / 2.0))
}

/// Keyfitz approximation of the standard error of a rate
///
/// `rate / sqrt(deaths)`, and zero when no deaths were observed.
#[must_use]
pub fn keyfitz_standard_error(rate: f64, deaths: f64) -> f64 {
    if deaths <= 0.0 {
        0.0
    } else {
        rate.abs() / deaths.sqrt()
    }
}

/// Weighted totals `(Σ w d, Σ w T)`
#[must_use]
pub fn weighted_totals(units: &[RateUnit]) -> (f64, f64) {
    units.iter().fold((0.0, 0.0), |(d, t), u| {
        (d + u.weight * u.deaths, t + u.weight * u.person_years)
    })
}

/// Rate estimators sharing a scale, confidence level and singleton policy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateEstimator {
    /// Rates are reported per this many person-years
    pub multiplier: f64,
    /// Confidence level for intervals
    pub confidence_level: f64,
    /// Variance handling for single-cluster strata
    pub singleton: SingletonMethod,
}

impl Default for RateEstimator {
    fn default() -> Self {
        Self {
            multiplier: 1000.0,
            confidence_level: 0.95,
            singleton: SingletonMethod::Center,
        }
    }
}

impl RateEstimator {
    /// Estimator settings taken from the analysis configuration
    #[must_use]
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            multiplier: config.rate_multiplier,
            confidence_level: config.confidence_level,
            singleton: config.singleton_method,
        }
    }

    /// Unweighted ratio with a linearization standard error
    ///
    /// Each unit is treated as an independent cluster in a single stratum;
    /// weights and design strata are ignored.
    pub fn unweighted(&self, units: &[RateUnit]) -> Result<RateEstimate> {
        let flat: Vec<RateUnit> = units
            .iter()
            .enumerate()
            .map(|(idx, u)| RateUnit {
                weight: 1.0,
                stratum: 0,
                cluster: idx,
                ..*u
            })
            .collect();
        self.linearized(&flat, RateMethod::Linearization, SingletonMethod::Skip)
    }

    /// Survey-weighted ratio with a stratified cluster design variance
    pub fn weighted(&self, units: &[RateUnit]) -> Result<RateEstimate> {
        self.linearized(units, RateMethod::SurveyDesign, self.singleton)
    }

    /// Unweighted ratio with the Keyfitz standard error
    pub fn keyfitz(&self, units: &[RateUnit]) -> Result<RateEstimate> {
        let deaths: f64 = units.iter().map(|u| u.deaths).sum();
        let person_years: f64 = units.iter().map(|u| u.person_years).sum();
        self.from_counts(RateMethod::Keyfitz, deaths, person_years)
    }

    /// Rate and Keyfitz standard error from raw totals
    pub fn from_counts(
        &self,
        method: RateMethod,
        deaths: f64,
        person_years: f64,
    ) -> Result<RateEstimate> {
        if person_years <= 0.0 {
            return Err(MortalityError::EmptyExposure(method.to_string()));
        }
        let rate = deaths / person_years * self.multiplier;
        Ok(self.adjusted(method, rate, deaths, person_years))
    }

    /// Keyfitz standard error for a rate computed elsewhere
    ///
    /// `rate` is already on the multiplier scale and `deaths` is the
    /// observed death count behind it.
    #[must_use]
    pub fn adjusted(
        &self,
        method: RateMethod,
        rate: f64,
        deaths: f64,
        person_years: f64,
    ) -> RateEstimate {
        let standard_error = keyfitz_standard_error(rate, deaths);
        RateEstimate::new(
            method,
            deaths,
            person_years,
            rate,
            standard_error,
            self.confidence_level,
        )
    }

    fn linearized(
        &self,
        units: &[RateUnit],
        method: RateMethod,
        singleton: SingletonMethod,
    ) -> Result<RateEstimate> {
        let (deaths, person_years) = weighted_totals(units);
        if person_years <= 0.0 {
            return Err(MortalityError::EmptyExposure(method.to_string()));
        }
        let ratio = deaths / person_years;
        let scores = ratio_scores(units, ratio);
        let design = stratified_cluster_variance(units, &scores, singleton)?;

        let mut estimate = RateEstimate::new(
            method,
            deaths,
            person_years,
            ratio * self.multiplier,
            design.standard_error() * self.multiplier,
            self.confidence_level,
        );
        estimate.degrees_of_freedom = Some(design.degrees_of_freedom());
        Ok(estimate)
    }
}
