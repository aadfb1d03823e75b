//! Property-based tests for the rate estimators and adjustments.

use chrono::NaiveDate;
use proptest::prelude::*;

use excess_mortality::algorithm::mortality::household_size::{
    census_size_frequencies, recombine,
};
use excess_mortality::algorithm::mortality::{
    ObservationWindow, Period, PlugInSource, RateEstimator, SingleHouseholdPolicy, adjust_for_age,
    adjust_for_household_size, keyfitz_standard_error,
};

use crate::utils::{census_ages, census_sizes, frame_with};

/// Strategy: census household counts for sizes 1 to 7
fn census_strategy() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(1.0..1.0e6f64, 7)
}

/// Strategy: households as `(size, death dates in 2017)`
fn households_strategy() -> impl Strategy<Value = Vec<(i32, Vec<(u32, u32)>)>> {
    let deaths = prop::collection::vec((1..=12u32, 1..=28u32), 0..=2);
    prop::collection::vec((1..=8i32, deaths), 1..30).prop_map(|mut households| {
        // one surviving multi-person household keeps every stratum set non-empty
        households.push((3, Vec::new()));
        households
    })
}

proptest! {
    // 1. Census frequencies are a distribution
    #[test]
    fn frequencies_sum_to_one(counts in census_strategy(), cap in 2..=7i32) {
        let frequencies = census_size_frequencies(&census_sizes(&counts), cap).unwrap();
        let total: f64 = frequencies.values().sum();
        prop_assert!((total - 1.0).abs() < 1e-9, "total={total}");
        prop_assert!(frequencies.keys().all(|k| *k <= cap));
    }

    // 2. The adjusted rate is the frequency-weighted sum of stratum rates
    #[test]
    fn recombined_rate_is_weighted_sum(
        households in households_strategy(),
        counts in census_strategy(),
    ) {
        let frame = frame_with(&households);
        let census = census_sizes(&counts);
        for period in [Period::PreEvent, Period::PostEvent] {
            let adjustment = adjust_for_household_size(
                &frame,
                period,
                &census,
                6,
                SingleHouseholdPolicy::Observed,
                None,
                &RateEstimator::default(),
            )
            .unwrap();
            let frequencies: f64 = adjustment.strata.iter().map(|s| s.frequency).sum();
            prop_assert!((frequencies - 1.0).abs() < 1e-9);
            let expected: f64 = adjustment.strata.iter().map(|s| s.frequency * s.rate).sum();
            prop_assert!((adjustment.estimate.rate - expected).abs() < 1e-9);
            prop_assert!((recombine(&adjustment.strata) - expected).abs() < 1e-12);
        }
    }

    // 3. Keyfitz SE is non-negative and equals rate / sqrt(deaths)
    #[test]
    fn keyfitz_scaling(rate in 0.0..500.0f64, deaths in 1.0..1.0e5f64, factor in 0.1..10.0f64) {
        let se = keyfitz_standard_error(rate, deaths);
        prop_assert!(se >= 0.0);
        prop_assert!((se * deaths.sqrt() - rate).abs() < 1e-9 * rate.max(1.0));
        let scaled = keyfitz_standard_error(rate * factor, deaths);
        prop_assert!((scaled - se * factor).abs() < 1e-9 * scaled.max(1.0));
        let quadrupled = keyfitz_standard_error(rate, deaths * 4.0);
        prop_assert!((quadrupled - se / 2.0).abs() < 1e-9 * se.max(1.0));
    }

    // 4. Excluding single-person households never lowers the rate below a zero plug-in
    #[test]
    fn exclusion_not_below_zero_plug_in(
        households in households_strategy(),
        counts in census_strategy(),
    ) {
        let frame = frame_with(&households);
        let census = census_sizes(&counts);
        let estimator = RateEstimator::default();
        for period in [Period::PreEvent, Period::PostEvent] {
            let rate = |policy| {
                adjust_for_household_size(&frame, period, &census, 6, policy, None, &estimator)
                    .unwrap()
                    .estimate
                    .rate
            };
            let excluded = rate(SingleHouseholdPolicy::Exclude);
            let zero = rate(SingleHouseholdPolicy::PlugIn(PlugInSource::External(0.0)));
            prop_assert!(excluded + 1e-9 >= zero, "excluded={excluded} zero={zero}");
        }
    }

    // 5. Exposure is non-negative and bounded by the window length
    #[test]
    fn exposure_bounded(offset in -400i64..400, window_days in 1i64..400) {
        let start = NaiveDate::from_ymd_opt(2017, 9, 20).unwrap();
        let window = ObservationWindow::new(start, start + chrono::Duration::days(window_days));
        let death = start + chrono::Duration::days(offset);
        let exposure = window.exposure(Some(death), 365.0);
        prop_assert!(exposure.person_years >= 0.0);
        prop_assert!(exposure.person_years <= window.years(365.0) + 1e-12);
        prop_assert_eq!(exposure.died, window.contains(death));
    }

    // 6. The age-standardized rate lies within the range of the age-specific rates
    #[test]
    fn age_adjusted_rate_bounded(households in households_strategy()) {
        let frame = frame_with(&households);
        let adjustment =
            adjust_for_age(&frame, Period::PostEvent, &census_ages(), &RateEstimator::default())
                .unwrap();
        let lowest = adjustment.strata.iter().map(|s| s.rate).fold(f64::INFINITY, f64::min);
        let highest = adjustment.strata.iter().map(|s| s.rate).fold(0.0, f64::max);
        prop_assert!(adjustment.estimate.rate >= lowest - 1e-9);
        prop_assert!(adjustment.estimate.rate <= highest + 1e-9);
    }
}
