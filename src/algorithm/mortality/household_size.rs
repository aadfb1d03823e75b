//! Household-size post-stratification
//!
//! A person living alone who dies leaves nobody behind to report the death,
//! so single-person households show structurally zero deaths. Rates are
//! computed per household-size stratum, the single-person stratum is
//! dropped or replaced by a plug-in rate, and the strata are recombined with
//! census household-size frequencies.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{MortalityError, Result};
use crate::models::CensusHouseholdSize;

use super::frame::{AnalysisFrame, ExposureTotals, Period};
use super::rate::{RateEstimate, RateEstimator, RateMethod};

/// Where the plug-in rate for single-person households comes from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlugInSource {
    /// The official pre-event baseline rate
    Baseline,
    /// A fixed external rate per multiplier person-years
    External(f64),
}

/// Treatment of the single-person stratum
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SingleHouseholdPolicy {
    /// Use the observed (typically zero) rate
    Observed,
    /// Drop the stratum and renormalise the remaining frequencies
    Exclude,
    /// Substitute a plug-in rate
    PlugIn(PlugInSource),
}

impl fmt::Display for SingleHouseholdPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Observed => f.write_str("observed"),
            Self::Exclude => f.write_str("exclude size 1"),
            Self::PlugIn(PlugInSource::Baseline) => f.write_str("size 1 = baseline"),
            Self::PlugIn(PlugInSource::External(rate)) => write!(f, "size 1 = {rate:.1}"),
        }
    }
}

/// One household-size stratum after applying the policy
#[derive(Debug, Clone, PartialEq)]
pub struct SizeStratum {
    /// Household size (the cap stands for "cap or more")
    pub size: i32,
    /// Census frequency after renormalisation
    pub frequency: f64,
    /// Observed deaths in the sample
    pub deaths: f64,
    /// Observed person-years in the sample
    pub person_years: f64,
    /// Rate used for the stratum
    pub rate: f64,
    /// Whether `rate` is a plug-in rather than observed
    pub plug_in: bool,
}

/// Result of the household-size adjustment
#[derive(Debug, Clone, PartialEq)]
pub struct HouseholdSizeAdjustment {
    /// Period the rates refer to
    pub period: Period,
    /// Policy applied to single-person households
    pub policy: SingleHouseholdPolicy,
    /// Strata entering the recombination
    pub strata: Vec<SizeStratum>,
    /// Recombined rate with Keyfitz standard error
    pub estimate: RateEstimate,
}

/// Census household-size frequencies, pooled at `cap` and normalised
pub fn census_size_frequencies(
    census: &[CensusHouseholdSize],
    cap: i32,
) -> Result<BTreeMap<i32, f64>> {
    let mut counts: BTreeMap<i32, f64> = BTreeMap::new();
    for row in census.iter().filter(|r| r.size >= 1 && r.households > 0.0) {
        *counts.entry(row.size.min(cap)).or_insert(0.0) += row.households;
    }
    normalise(counts, "census household size")
}

/// Observed deaths and person-years per size stratum
///
/// Households with an unknown size are skipped.
#[must_use]
pub fn size_stratum_totals(
    frame: &AnalysisFrame,
    period: Period,
    cap: i32,
) -> BTreeMap<i32, ExposureTotals> {
    let mut totals: BTreeMap<i32, ExposureTotals> = BTreeMap::new();
    let mut unknown = 0;
    for household in &frame.households {
        let Some(size) = household.size.filter(|s| *s >= 1) else {
            unknown += 1;
            continue;
        };
        let entry = totals.entry(size.min(cap)).or_default();
        let t = household.totals(period);
        entry.deaths += t.deaths;
        entry.person_years += t.person_years;
    }
    crate::utils::log_exclusions("household size", unknown, "unknown household size");
    totals
}

/// Recombine stratum rates: `Σ f_k r_k`
#[must_use]
pub fn recombine(strata: &[SizeStratum]) -> f64 {
    strata.iter().map(|s| s.frequency * s.rate).sum()
}

/// Adjust a period's rate for household-size undercoverage
///
/// # Arguments
/// * `frame` - The analysis frame
/// * `period` - Which window to estimate
/// * `census` - Census household-size distribution
/// * `cap` - Sizes at or above this are pooled
/// * `policy` - Treatment of single-person households
/// * `baseline_rate` - Official baseline rate, needed for `PlugIn(Baseline)`
/// * `estimator` - Scale and confidence level
pub fn adjust_for_household_size(
    frame: &AnalysisFrame,
    period: Period,
    census: &[CensusHouseholdSize],
    cap: i32,
    policy: SingleHouseholdPolicy,
    baseline_rate: Option<f64>,
    estimator: &RateEstimator,
) -> Result<HouseholdSizeAdjustment> {
    let frequencies = census_size_frequencies(census, cap)?;
    let totals = size_stratum_totals(frame, period, cap);

    let plug_in_rate = match policy {
        SingleHouseholdPolicy::PlugIn(PlugInSource::Baseline) => Some(baseline_rate.ok_or_else(|| {
            MortalityError::MissingBaseline("plug-in rate for single-person households".into())
        })?),
        SingleHouseholdPolicy::PlugIn(PlugInSource::External(rate)) => Some(rate),
        SingleHouseholdPolicy::Observed | SingleHouseholdPolicy::Exclude => None,
    };

    let mut strata = Vec::with_capacity(frequencies.len());
    for (&size, &frequency) in &frequencies {
        let observed = totals.get(&size).copied().unwrap_or_default();
        if size == 1 {
            match (policy, plug_in_rate) {
                (SingleHouseholdPolicy::Exclude, _) => continue,
                (_, Some(rate)) => {
                    strata.push(SizeStratum {
                        size,
                        frequency,
                        deaths: observed.deaths,
                        person_years: observed.person_years,
                        rate,
                        plug_in: true,
                    });
                    continue;
                }
                _ => {}
            }
        }

        if observed.person_years <= 0.0 {
            log::warn!("Household size {size} has no sampled person-time ({period}); dropped");
            continue;
        }
        let rate = observed.deaths / observed.person_years * estimator.multiplier;
        if rate == 0.0 {
            log::warn!("Household size {size} has a zero observed death rate ({period})");
        }
        strata.push(SizeStratum {
            size,
            frequency,
            deaths: observed.deaths,
            person_years: observed.person_years,
            rate,
            plug_in: false,
        });
    }

    let total_frequency: f64 = strata.iter().map(|s| s.frequency).sum();
    if total_frequency <= 0.0 {
        return Err(MortalityError::invalid_distribution(
            "census household size",
            "no stratum left after applying the policy",
        ));
    }
    for stratum in &mut strata {
        stratum.frequency /= total_frequency;
    }

    let rate = recombine(&strata);
    let (deaths, person_years) = strata
        .iter()
        .filter(|s| !s.plug_in)
        .fold((0.0, 0.0), |(d, t), s| (d + s.deaths, t + s.person_years));
    let estimate = estimator.adjusted(RateMethod::HouseholdSizeAdjusted, rate, deaths, person_years);

    Ok(HouseholdSizeAdjustment {
        period,
        policy,
        strata,
        estimate,
    })
}

/// Scale non-negative weights to sum to one
pub(crate) fn normalise<K: Ord>(weights: BTreeMap<K, f64>, name: &str) -> Result<BTreeMap<K, f64>> {
    let total: f64 = weights.values().sum();
    if !(total.is_finite() && total > 0.0) {
        return Err(MortalityError::invalid_distribution(
            name,
            "weights must have a positive total",
        ));
    }
    Ok(weights.into_iter().map(|(k, w)| (k, w / total)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use crate::dataset::SurveyDataset;
    use crate::models::{DeathRecord, HouseholdRecord, IndividualRecord};

    fn census() -> Vec<CensusHouseholdSize> {
        [(1, 20.0), (2, 30.0), (3, 25.0), (4, 15.0), (5, 6.0), (6, 3.0), (7, 1.0)]
            .into_iter()
            .map(|(size, households)| CensusHouseholdSize { size, households })
            .collect()
    }

    fn frame() -> AnalysisFrame {
        let mut dataset = SurveyDataset::default();
        let sizes = [1, 1, 2, 3, 3, 4];
        for (i, size) in sizes.iter().enumerate() {
            let hh_id = format!("h{i}");
            dataset.households.push(HouseholdRecord {
                hh_id: hh_id.clone(),
                strata: 1,
                cluster: format!("c{}", i % 3),
                size: Some(*size),
            });
            for _ in 0..*size {
                dataset.individuals.push(IndividualRecord {
                    hh_id: hh_id.clone(),
                    age: Some(40.0),
                    gender: None,
                });
            }
        }
        for (hh, day) in [("h2", 1), ("h3", 5), ("h5", 9)] {
            dataset.deaths.push(DeathRecord {
                hh_id: hh.to_string(),
                individual_id: None,
                age: Some(75.0),
                gender: None,
                year: Some(2017),
                month: Some(11),
                day: Some(day),
            });
        }
        AnalysisFrame::build(&dataset, &AnalysisConfig::default())
    }

    #[test]
    fn test_census_frequencies_pool_and_sum_to_one() {
        let freq = census_size_frequencies(&census(), 6).unwrap();
        assert_eq!(freq.len(), 6);
        assert!((freq.values().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!((freq[&6] - 0.04).abs() < 1e-12);
    }

    #[test]
    fn test_empty_census_is_invalid() {
        assert!(matches!(
            census_size_frequencies(&[], 6),
            Err(MortalityError::InvalidDistribution { .. })
        ));
    }

    #[test]
    fn test_exclude_drops_single_stratum() {
        let frame = frame();
        let adj = adjust_for_household_size(
            &frame,
            Period::PostEvent,
            &census(),
            6,
            SingleHouseholdPolicy::Exclude,
            None,
            &RateEstimator::default(),
        )
        .unwrap();
        assert!(adj.strata.iter().all(|s| s.size != 1));
        assert!((adj.strata.iter().map(|s| s.frequency).sum::<f64>() - 1.0).abs() < 1e-12);
        assert!((adj.estimate.rate - recombine(&adj.strata)).abs() < 1e-12);
        assert!((adj.estimate.deaths - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_plug_in_rates() {
        let frame = frame();
        let estimator = RateEstimator::default();
        let external = adjust_for_household_size(
            &frame,
            Period::PostEvent,
            &census(),
            6,
            SingleHouseholdPolicy::PlugIn(PlugInSource::External(40.0)),
            None,
            &estimator,
        )
        .unwrap();
        let single = external.strata.iter().find(|s| s.size == 1).unwrap();
        assert!(single.plug_in);
        assert!((single.rate - 40.0).abs() < f64::EPSILON);

        let missing = adjust_for_household_size(
            &frame,
            Period::PostEvent,
            &census(),
            6,
            SingleHouseholdPolicy::PlugIn(PlugInSource::Baseline),
            None,
            &estimator,
        );
        assert!(matches!(missing, Err(MortalityError::MissingBaseline(_))));
    }

    #[test]
    fn test_exclusion_not_below_zero_plug_in() {
        let frame = frame();
        let estimator = RateEstimator::default();
        let run = |policy| {
            adjust_for_household_size(&frame, Period::PostEvent, &census(), 6, policy, None, &estimator)
                .unwrap()
                .estimate
                .rate
        };
        let excluded = run(SingleHouseholdPolicy::Exclude);
        let zero = run(SingleHouseholdPolicy::PlugIn(PlugInSource::External(0.0)));
        let observed = run(SingleHouseholdPolicy::Observed);
        assert!(excluded >= zero);
        assert!((zero - observed).abs() < 1e-12);
    }
}
