//! Direct age standardization
//!
//! Age-specific survey rates are re-weighted by a fixed pre-event census age
//! distribution, removing the effect of a shift in the surveyed population's
//! age composition.

use std::collections::BTreeMap;
use std::fmt;

use itertools::Itertools;

use crate::error::{MortalityError, Result};
use crate::models::CensusAgeGroup;
use crate::utils::log_exclusions;

use super::frame::{AnalysisFrame, ExposureTotals, Period};
use super::household_size::normalise;
use super::rate::{RateEstimate, RateEstimator, RateMethod};

/// An age band `[lower, upper)`; the oldest band is open-ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AgeGroup {
    /// Inclusive lower bound in years
    pub lower: i32,
    /// Exclusive upper bound, `None` for the open band
    pub upper: Option<i32>,
}

impl AgeGroup {
    /// Whether an age falls in the band
    #[must_use]
    pub fn contains(&self, age: f64) -> bool {
        age >= f64::from(self.lower) && self.upper.is_none_or(|upper| age < f64::from(upper))
    }
}

impl fmt::Display for AgeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upper {
            Some(upper) => write!(f, "{}-{}", self.lower, upper - 1),
            None => write!(f, "{}+", self.lower),
        }
    }
}

/// One age band in the standardization
#[derive(Debug, Clone, PartialEq)]
pub struct AgeStratum {
    /// The band
    pub group: AgeGroup,
    /// Census share used as the standard
    pub census_share: f64,
    /// Share of sampled person-time in the band
    pub sample_share: f64,
    /// Observed deaths
    pub deaths: f64,
    /// Observed person-years
    pub person_years: f64,
    /// Age-specific rate
    pub rate: f64,
}

/// Result of the age adjustment
#[derive(Debug, Clone, PartialEq)]
pub struct AgeAdjustment {
    /// Period the rates refer to
    pub period: Period,
    /// Age bands entering the standardization
    pub strata: Vec<AgeStratum>,
    /// Standardized rate with Keyfitz standard error
    pub estimate: RateEstimate,
}

/// Age bands and normalised shares from the census table
pub fn census_age_groups(census: &[CensusAgeGroup]) -> Result<Vec<(AgeGroup, f64)>> {
    let mut populations: BTreeMap<i32, f64> = BTreeMap::new();
    for row in census.iter().filter(|r| r.population >= 0.0) {
        *populations.entry(row.age_lower).or_insert(0.0) += row.population;
    }

    if populations.is_empty() {
        return Err(MortalityError::invalid_distribution("census age", "no age groups"));
    }

    let bounds = populations.keys().copied().collect_vec();
    let shares: BTreeMap<AgeGroup, f64> = populations
        .into_iter()
        .enumerate()
        .map(|(idx, (lower, population))| {
            let upper = bounds.get(idx + 1).copied();
            (AgeGroup { lower, upper }, population)
        })
        .collect();

    Ok(normalise(shares, "census age")?.into_iter().collect())
}

/// Adjust a period's rate to the census age distribution
pub fn adjust_for_age(
    frame: &AnalysisFrame,
    period: Period,
    census: &[CensusAgeGroup],
    estimator: &RateEstimator,
) -> Result<AgeAdjustment> {
    let groups = census_age_groups(census)?;

    let mut totals = vec![ExposureTotals::default(); groups.len()];
    let mut unknown_age = 0;
    let mut out_of_range = 0;
    for person in &frame.persons {
        let Some(age) = person.age.filter(|a| a.is_finite()) else {
            unknown_age += 1;
            continue;
        };
        let Some(idx) = groups.iter().position(|(g, _)| g.contains(age)) else {
            out_of_range += 1;
            continue;
        };
        let exposure = person.exposure(period);
        totals[idx].person_years += exposure.person_years;
        if exposure.died {
            totals[idx].deaths += 1.0;
        }
    }
    log_exclusions("age adjustment", unknown_age, "unknown age");
    log_exclusions("age adjustment", out_of_range, "age below youngest census group");

    let sampled_person_years: f64 = totals.iter().map(|t| t.person_years).sum();
    if sampled_person_years <= 0.0 {
        return Err(MortalityError::EmptyExposure(format!("age adjustment ({period})")));
    }

    let mut strata = Vec::with_capacity(groups.len());
    for ((group, census_share), observed) in groups.into_iter().zip(totals) {
        if observed.person_years <= 0.0 {
            log::warn!("Age group {group} has no sampled person-time ({period}); dropped");
            continue;
        }
        strata.push(AgeStratum {
            group,
            census_share,
            sample_share: observed.person_years / sampled_person_years,
            deaths: observed.deaths,
            person_years: observed.person_years,
            rate: observed.deaths / observed.person_years * estimator.multiplier,
        });
    }

    let total_share: f64 = strata.iter().map(|s| s.census_share).sum();
    if total_share <= 0.0 {
        return Err(MortalityError::invalid_distribution(
            "census age",
            format!("sampled age groups have no census population ({period})"),
        ));
    }
    for stratum in &mut strata {
        stratum.census_share /= total_share;
    }

    let rate = strata.iter().map(|s| s.census_share * s.rate).sum();
    let deaths = strata.iter().map(|s| s.deaths).sum();
    let estimate = estimator.adjusted(RateMethod::AgeAdjusted, rate, deaths, sampled_person_years);

    Ok(AgeAdjustment {
        period,
        strata,
        estimate,
    })
}
