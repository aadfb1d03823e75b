use excess_mortality::algorithm::mortality::{PlugInSource, RateMethod};
use excess_mortality::{AnalysisConfig, MortalityAnalysis, Period, SingleHouseholdPolicy, SurveyDataset};

use crate::utils::{small_dataset, write_small_dataset};

#[test]
fn test_end_to_end_from_parquet() {
    let dir = tempfile::tempdir().unwrap();
    write_small_dataset(dir.path(), 7).unwrap();

    let config = AnalysisConfig {
        data_dir: dir.path().to_path_buf(),
        ..AnalysisConfig::default()
    };
    let dataset = SurveyDataset::load(&config.data_dir, false).unwrap();
    let results = MortalityAnalysis::new(config).run(&dataset).unwrap();

    assert_eq!(results.households, dataset.households.len());
    assert_eq!(
        results.headline.estimate.method,
        RateMethod::HouseholdSizeAdjusted
    );
    assert!(results.headline.estimate.rate > 0.0);

    let csv = dir.path().join("report.csv");
    results.report.write_to_csv(&csv).unwrap();
    let lines = std::fs::read_to_string(&csv).unwrap().lines().count();
    assert_eq!(lines, results.report.rows.len() + 1);
}

#[test]
fn test_crude_estimates_agree_on_point_estimate() {
    let dataset = small_dataset(3).unwrap();
    let results = MortalityAnalysis::new(AnalysisConfig::default())
        .run(&dataset)
        .unwrap();

    for period in [Period::PreEvent, Period::PostEvent] {
        let estimates = results.period(period);
        assert!((estimates.unweighted.rate - estimates.keyfitz.rate).abs() < 1e-9);
        assert!(estimates.unweighted.degrees_of_freedom.is_some());
        let weighted = estimates.weighted.as_ref().unwrap();
        assert_eq!(weighted.degrees_of_freedom, Some(weighted_df(&dataset)));
    }
}

/// Clusters minus strata in the synthetic design
fn weighted_df(dataset: &SurveyDataset) -> usize {
    let mut clusters: Vec<(i32, &str)> = dataset
        .households
        .iter()
        .map(|h| (h.strata, h.cluster.as_str()))
        .collect();
    clusters.sort_unstable();
    clusters.dedup();
    let mut strata: Vec<i32> = clusters.iter().map(|(s, _)| *s).collect();
    strata.dedup();
    clusters.len() - strata.len()
}

#[test]
fn test_post_event_rate_exceeds_baseline() {
    let dataset = small_dataset(5).unwrap();
    let results = MortalityAnalysis::new(AnalysisConfig::default())
        .run(&dataset)
        .unwrap();

    let baseline = results.baseline.as_ref().unwrap();
    // about 8.4 per 1000 a year, so roughly 2.4 per 1000 over the window
    assert!((baseline.estimate.rate - 8.4).abs() < 1.0);
    assert!((baseline.window_rate() - 2.4).abs() < 0.4);
    assert!(baseline.estimate.relative_standard_error() < 0.05);

    let series = results.baseline_series.as_ref().unwrap();
    assert_eq!(series.rates.len(), 7);
    assert!(series.std_dev < 1.0);

    let variability = results.variability.unwrap();
    assert!(variability.negligible);
    assert!(variability.se_ratio < 0.05);
}

#[test]
fn test_policies_are_ordered() {
    let dataset = small_dataset(9).unwrap();
    let results = MortalityAnalysis::new(AnalysisConfig::default())
        .run(&dataset)
        .unwrap();

    for period in [Period::PreEvent, Period::PostEvent] {
        let rate = |policy| {
            results
                .household_size_adjustment(period, policy)
                .unwrap()
                .estimate
                .rate
        };
        let observed = rate(SingleHouseholdPolicy::Observed);
        let excluded = rate(SingleHouseholdPolicy::Exclude);
        let plug_in = rate(SingleHouseholdPolicy::PlugIn(PlugInSource::Baseline));
        // single-person deaths are never reported, so observing them drags the rate down
        assert!(excluded >= observed);
        assert!(plug_in >= observed);
    }
}

#[test]
fn test_external_plug_in_headline() {
    let dataset = small_dataset(13).unwrap();
    let config = AnalysisConfig {
        single_household_policy: SingleHouseholdPolicy::PlugIn(PlugInSource::External(25.0)),
        ..AnalysisConfig::default()
    };
    let results = MortalityAnalysis::new(config).run(&dataset).unwrap();

    let single = results
        .headline
        .strata
        .iter()
        .find(|s| s.size == 1)
        .unwrap();
    assert!(single.plug_in);
    assert!((single.rate - 25.0).abs() < f64::EPSILON);
    assert_eq!(results.report.rows_for(Period::PostEvent).count(), 8);
}
