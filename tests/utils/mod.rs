use std::path::Path;

use excess_mortality::algorithm::mortality::AnalysisFrame;
use excess_mortality::models::{
    CensusAgeGroup, CensusHouseholdSize, DeathRecord, HouseholdRecord, IndividualRecord,
    WeightRecord,
};
use excess_mortality::{AnalysisConfig, Result, SurveyDataset, SyntheticConfig, generate_synthetic_dataset};

/// Synthetic dataset small enough for fast tests
pub fn small_dataset(seed: u64) -> Result<SurveyDataset> {
    generate_synthetic_dataset(&SyntheticConfig {
        households: 800,
        seed,
        ..SyntheticConfig::default()
    })
}

/// Write a synthetic dataset into `dir`
pub fn write_small_dataset(dir: &Path, seed: u64) -> Result<SurveyDataset> {
    let dataset = small_dataset(seed)?;
    dataset.write(dir)?;
    Ok(dataset)
}

/// Census household sizes 1 to 7 with the given counts
#[must_use]
pub fn census_sizes(counts: &[f64]) -> Vec<CensusHouseholdSize> {
    counts
        .iter()
        .enumerate()
        .map(|(idx, households)| CensusHouseholdSize {
            size: idx as i32 + 1,
            households: *households,
        })
        .collect()
}

/// Census ages with lower bounds 0, 15, 25, 45, 65 and 75
#[must_use]
pub fn census_ages() -> Vec<CensusAgeGroup> {
    [(0, 18.0), (15, 14.0), (25, 25.0), (45, 25.0), (65, 9.0), (75, 9.0)]
        .into_iter()
        .map(|(age_lower, population)| CensusAgeGroup {
            age_lower,
            population,
        })
        .collect()
}

/// One household per entry of `households`: `(size, 2017 death dates as (month, day))`
///
/// Living members are `size` minus the deaths; every household has weight 1
/// and households alternate between two clusters of one stratum.
#[must_use]
pub fn frame_with(households: &[(i32, Vec<(u32, u32)>)]) -> AnalysisFrame {
    let mut dataset = SurveyDataset::default();
    for (idx, (size, death_dates)) in households.iter().enumerate() {
        let hh_id = format!("h{idx}");
        dataset.households.push(HouseholdRecord {
            hh_id: hh_id.clone(),
            strata: 1,
            cluster: format!("c{}", idx % 2),
            size: Some(*size),
        });
        dataset.weights.push(WeightRecord {
            hh_id: hh_id.clone(),
            weight: Some(1.0),
        });
        let living = (*size as usize).saturating_sub(death_dates.len());
        for _ in 0..living {
            dataset.individuals.push(IndividualRecord {
                hh_id: hh_id.clone(),
                age: Some(50.0),
                gender: Some("F".to_string()),
            });
        }
        for (month, day) in death_dates {
            dataset.deaths.push(DeathRecord {
                hh_id: hh_id.clone(),
                individual_id: None,
                age: Some(70.0),
                gender: Some("M".to_string()),
                year: Some(2017),
                month: Some(*month as i32),
                day: Some(*day as i32),
            });
        }
    }
    AnalysisFrame::build(&dataset, &AnalysisConfig::default())
}
