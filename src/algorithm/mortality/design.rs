//! Design-based variance for ratio estimators
//!
//! Taylor linearization for a stratified cluster sample with replacement of
//! primary sampling units: unit scores are summed within clusters, and the
//! between-cluster variance is accumulated stratum by stratum.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{MortalityError, Result};

use super::rate::RateUnit;

/// Handling of strata in which only one cluster was sampled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SingletonMethod {
    /// Deviate the lone cluster from the grand mean of cluster totals
    #[default]
    Center,
    /// The stratum contributes no variance
    Skip,
    /// Refuse to estimate a variance
    Fail,
}

/// Variance of an estimator together with the design that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct DesignVariance {
    /// Estimated variance
    pub variance: f64,
    /// Number of strata
    pub strata: usize,
    /// Number of clusters across strata
    pub clusters: usize,
    /// Strata with a single cluster
    pub singleton_strata: usize,
}

impl DesignVariance {
    /// Design degrees of freedom: clusters minus strata
    #[must_use]
    pub fn degrees_of_freedom(&self) -> usize {
        self.clusters.saturating_sub(self.strata)
    }

    /// Square root of the variance
    #[must_use]
    pub fn standard_error(&self) -> f64 {
        self.variance.max(0.0).sqrt()
    }
}

/// Linearization scores of the ratio `R = Σ w d / Σ w T`
///
/// `z_i = w_i (d_i - R T_i) / Σ w T`. Returns all zeros when there is no
/// person-time.
#[must_use]
pub fn ratio_scores(units: &[RateUnit], ratio: f64) -> Vec<f64> {
    let denominator: f64 = units.iter().map(|u| u.weight * u.person_years).sum();
    if denominator <= 0.0 {
        return vec![0.0; units.len()];
    }
    units
        .iter()
        .map(|u| u.weight * (u.deaths - ratio * u.person_years) / denominator)
        .collect()
}

/// Between-cluster variance of a total of scores under a stratified design
///
/// Within stratum `h` with `n_h` clusters and cluster totals `z_hc`, the
/// contribution is `n_h / (n_h - 1) Σ_c (z_hc - mean_h)^2`.
pub fn stratified_cluster_variance(
    units: &[RateUnit],
    scores: &[f64],
    singleton: SingletonMethod,
) -> Result<DesignVariance> {
    let mut totals: BTreeMap<i32, FxHashMap<usize, f64>> = BTreeMap::new();
    for (unit, score) in units.iter().zip(scores) {
        *totals
            .entry(unit.stratum)
            .or_default()
            .entry(unit.cluster)
            .or_insert(0.0) += score;
    }

    let clusters: usize = totals.values().map(FxHashMap::len).sum();
    let grand_mean = if clusters > 0 {
        totals.values().flat_map(|c| c.values()).sum::<f64>() / clusters as f64
    } else {
        0.0
    };

    let mut variance = 0.0;
    let mut singleton_strata = 0;
    for (stratum, cluster_totals) in &totals {
        let n = cluster_totals.len();
        if n == 1 {
            singleton_strata += 1;
            match singleton {
                SingletonMethod::Center => {
                    variance += cluster_totals
                        .values()
                        .map(|z| (z - grand_mean).powi(2))
                        .sum::<f64>();
                }
                SingletonMethod::Skip => {}
                SingletonMethod::Fail => return Err(MortalityError::SingletonStratum(*stratum)),
            }
            continue;
        }

        let mean = cluster_totals.values().sum::<f64>() / n as f64;
        let squares: f64 = cluster_totals.values().map(|z| (z - mean).powi(2)).sum();
        variance += n as f64 / (n as f64 - 1.0) * squares;
    }

    if singleton_strata > 0 {
        log::debug!("{singleton_strata} strata with a single cluster ({singleton:?})");
    }

    Ok(DesignVariance {
        variance,
        strata: totals.len(),
        clusters,
        singleton_strata,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(deaths: f64, person_years: f64, stratum: i32, cluster: usize) -> RateUnit {
        RateUnit {
            deaths,
            person_years,
            weight: 1.0,
            stratum,
            cluster,
        }
    }

    #[test]
    fn test_scores_sum_to_zero() {
        let units = vec![unit(1.0, 2.0, 1, 0), unit(0.0, 3.0, 1, 1), unit(2.0, 5.0, 2, 2)];
        let ratio = 3.0 / 10.0;
        let scores = ratio_scores(&units, ratio);
        assert!(scores.iter().sum::<f64>().abs() < 1e-12);
    }

    #[test]
    fn test_two_cluster_stratum() {
        let units = vec![unit(0.0, 0.0, 1, 0), unit(0.0, 0.0, 1, 1)];
        let scores = vec![1.0, -1.0];
        let v = stratified_cluster_variance(&units, &scores, SingletonMethod::Fail).unwrap();
        // n/(n-1) * ((1-0)^2 + (-1-0)^2) = 2 * 2
        assert!((v.variance - 4.0).abs() < 1e-12);
        assert_eq!(v.degrees_of_freedom(), 1);
    }

    #[test]
    fn test_units_in_same_cluster_are_summed() {
        let units = vec![
            unit(0.0, 0.0, 1, 0),
            unit(0.0, 0.0, 1, 0),
            unit(0.0, 0.0, 1, 1),
        ];
        let scores = vec![0.5, 0.5, -1.0];
        let v = stratified_cluster_variance(&units, &scores, SingletonMethod::Fail).unwrap();
        assert!((v.variance - 4.0).abs() < 1e-12);
        assert_eq!(v.clusters, 2);
    }

    #[test]
    fn test_singleton_methods() {
        let units = vec![unit(0.0, 0.0, 1, 0), unit(0.0, 0.0, 1, 1), unit(0.0, 0.0, 2, 2)];
        let scores = vec![1.0, -1.0, 3.0];

        let skip = stratified_cluster_variance(&units, &scores, SingletonMethod::Skip).unwrap();
        assert!((skip.variance - 4.0).abs() < 1e-12);
        assert_eq!(skip.singleton_strata, 1);

        let center = stratified_cluster_variance(&units, &scores, SingletonMethod::Center).unwrap();
        // grand mean of cluster totals = 1, singleton adds (3 - 1)^2
        assert!((center.variance - 8.0).abs() < 1e-12);

        let fail = stratified_cluster_variance(&units, &scores, SingletonMethod::Fail);
        assert!(matches!(fail, Err(MortalityError::SingletonStratum(2))));
    }
}
