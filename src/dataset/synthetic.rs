//! Seeded synthetic survey for demos and tests
//!
//! Generates a stratified cluster sample of households with an age-specific
//! mortality schedule that is raised after the event, together with official
//! monthly deaths, population estimates and census distributions consistent
//! with it. Deaths of people living alone are never reported, reproducing the
//! undercoverage the household-size adjustment corrects for.

use chrono::{Datelike, Days, NaiveDate};
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::algorithm::mortality::window::ObservationWindow;
use crate::config::AnalysisConfig;
use crate::error::{MortalityError, Result};
use crate::models::{
    CensusAgeGroup, CensusHouseholdSize, DeathRecord, HouseholdRecord, IndividualRecord,
    OfficialDeathRecord, PopulationRecord, WeightRecord,
};

use super::SurveyDataset;

/// Census household-size shares for sizes 1 to 7
const HOUSEHOLD_SIZE_SHARES: [(i32, f64); 7] = [
    (1, 0.22),
    (2, 0.30),
    (3, 0.21),
    (4, 0.15),
    (5, 0.07),
    (6, 0.03),
    (7, 0.02),
];

/// Census age shares by lower bound of the age group
const AGE_SHARES: [(i32, f64); 6] = [
    (0, 0.18),
    (15, 0.14),
    (25, 0.25),
    (45, 0.25),
    (65, 0.09),
    (75, 0.09),
];

const OLDEST_AGE: i32 = 100;
const CENSUS_HOUSEHOLDS: f64 = 1_237_000.0;
const CENSUS_POPULATION: f64 = 3_725_789.0;
const FIRST_OFFICIAL_YEAR: i32 = 2010;
const FIRST_YEAR_POPULATION: f64 = 3_721_525.0;

/// Parameters of the synthetic dataset
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticConfig {
    /// Number of sampled households
    pub households: usize,
    /// Random seed
    pub seed: u64,
    /// Number of design strata
    pub strata: i32,
    /// Clusters sampled per stratum
    pub clusters_per_stratum: usize,
    /// Annual deaths per 1000 by age group lower bound, before the event
    pub annual_rates: Vec<(i32, f64)>,
    /// Factor applied to every rate after the event
    pub post_event_multiplier: f64,
    /// Probability that a reported death has no day
    pub missing_day_probability: f64,
    /// Crude annual rate per 1000 used for official counts
    pub official_rate: f64,
    /// Population in the last official year
    pub population: f64,
    /// Window before the event
    pub pre_event_window: ObservationWindow,
    /// Window after the event
    pub post_event_window: ObservationWindow,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        let analysis = AnalysisConfig::default();
        Self {
            households: 3_300,
            seed: 2017,
            strata: 8,
            clusters_per_stratum: 13,
            annual_rates: vec![
                (0, 0.6),
                (15, 0.8),
                (25, 1.6),
                (45, 5.5),
                (65, 18.0),
                (75, 65.0),
            ],
            post_event_multiplier: 1.6,
            missing_day_probability: 0.1,
            official_rate: 8.4,
            population: analysis.population,
            pre_event_window: analysis.pre_event_window(),
            post_event_window: analysis.post_event_window(),
        }
    }
}

impl SyntheticConfig {
    fn annual_rate(&self, age: i32) -> f64 {
        self.annual_rates
            .iter()
            .filter(|(lower, _)| *lower <= age)
            .max_by_key(|(lower, _)| *lower)
            .map_or(0.0, |(_, rate)| *rate)
    }

    fn official_population(&self, year: i32) -> f64 {
        let last_year = self.post_event_window.start.year();
        let span = f64::from((last_year - FIRST_OFFICIAL_YEAR).max(1));
        let step = (FIRST_YEAR_POPULATION - self.population) / span;
        FIRST_YEAR_POPULATION - step * f64::from(year - FIRST_OFFICIAL_YEAR)
    }
}

fn weighted_index(weights: impl IntoIterator<Item = f64>, name: &str) -> Result<WeightedIndex<f64>> {
    WeightedIndex::new(weights).map_err(|e| MortalityError::invalid_distribution(name, e.to_string()))
}

fn random_date(rng: &mut StdRng, window: &ObservationWindow) -> Option<NaiveDate> {
    let days = window.days();
    if days == 0 {
        return None;
    }
    let offset = rng.random_range(0..days);
    window.start.checked_add_days(Days::new(offset.unsigned_abs()))
}

/// Simulate one person's date of death, if it falls in either window
fn simulate_death(
    rng: &mut StdRng,
    config: &SyntheticConfig,
    annual_rate: f64,
) -> Option<NaiveDate> {
    let windows = [
        (config.pre_event_window, 1.0),
        (config.post_event_window, config.post_event_multiplier),
    ];
    for (window, multiplier) in windows {
        let years = window.years(365.0);
        let probability = (annual_rate * multiplier / 1000.0 * years).clamp(0.0, 1.0);
        if rng.random_bool(probability) {
            return random_date(rng, &window);
        }
    }
    None
}

fn official_tables(
    rng: &mut StdRng,
    config: &SyntheticConfig,
) -> (Vec<OfficialDeathRecord>, Vec<PopulationRecord>) {
    let last_year = config.post_event_window.start.year();
    let mut official = Vec::new();
    let mut population = Vec::new();
    let surge_start = config.post_event_window.start.with_day(1);
    for year in FIRST_OFFICIAL_YEAR..=last_year {
        let residents = config.official_population(year);
        population.push(PopulationRecord {
            year,
            population: Some(residents.round()),
        });
        for month in 1..=12 {
            let seasonal = 1.0 + 0.08 * (f64::from(month - 1) / 12.0 * std::f64::consts::TAU).cos();
            let noise = rng.random_range(0.97..1.03);
            let mut deaths = residents * config.official_rate / 1000.0 / 12.0 * seasonal * noise;
            let month_start = NaiveDate::from_ymd_opt(year, month, 1);
            if month_start.zip(surge_start).is_some_and(|(m, s)| m >= s) {
                deaths *= config.post_event_multiplier.sqrt();
            }
            official.push(OfficialDeathRecord {
                year,
                month: month as i32,
                deaths: Some(deaths.round()),
            });
        }
    }
    (official, population)
}

fn census_tables() -> (Vec<CensusHouseholdSize>, Vec<CensusAgeGroup>) {
    let sizes = HOUSEHOLD_SIZE_SHARES
        .iter()
        .map(|&(size, share)| CensusHouseholdSize {
            size,
            households: (share * CENSUS_HOUSEHOLDS).round(),
        })
        .collect();
    let ages = AGE_SHARES
        .iter()
        .map(|&(age_lower, share)| CensusAgeGroup {
            age_lower,
            population: (share * CENSUS_POPULATION).round(),
        })
        .collect();
    (sizes, ages)
}

/// Generate a complete dataset
pub fn generate_synthetic_dataset(config: &SyntheticConfig) -> Result<SurveyDataset> {
    if config.strata < 1 || config.clusters_per_stratum == 0 {
        return Err(MortalityError::invalid_distribution(
            "survey design",
            "need at least one stratum and one cluster per stratum",
        ));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let size_index = weighted_index(HOUSEHOLD_SIZE_SHARES.iter().map(|(_, s)| *s), "household size")?;
    let age_index = weighted_index(AGE_SHARES.iter().map(|(_, s)| *s), "age")?;

    let mut dataset = SurveyDataset::default();
    let mut unreported = 0;
    for idx in 0..config.households {
        let hh_id = format!("HH{idx:05}");
        let stratum = (idx % config.strata as usize) as i32 + 1;
        let cluster = format!("{stratum}-{:02}", rng.random_range(0..config.clusters_per_stratum));
        let size = HOUSEHOLD_SIZE_SHARES[size_index.sample(&mut rng)].0;

        let mut living = Vec::new();
        let mut deaths = Vec::new();
        for member in 0..size {
            let group = age_index.sample(&mut rng);
            let lower = AGE_SHARES[group].0;
            let upper = AGE_SHARES.get(group + 1).map_or(OLDEST_AGE, |(next, _)| *next);
            let age = rng.random_range(lower..upper);
            let gender = if rng.random_bool(0.5) { "M" } else { "F" };

            match simulate_death(&mut rng, config, config.annual_rate(age)) {
                Some(date) => {
                    let day = (!rng.random_bool(config.missing_day_probability))
                        .then(|| date.day() as i32);
                    deaths.push(DeathRecord {
                        hh_id: hh_id.clone(),
                        individual_id: Some(format!("{hh_id}-{member}")),
                        age: Some(f64::from(age)),
                        gender: Some(gender.to_string()),
                        year: Some(date.year()),
                        month: Some(date.month() as i32),
                        day,
                    });
                }
                None => living.push(IndividualRecord {
                    hh_id: hh_id.clone(),
                    age: Some(f64::from(age)),
                    gender: Some(gender.to_string()),
                }),
            }
        }

        // nobody is left to answer for a household whose only member died
        if living.is_empty() {
            unreported += deaths.len();
            continue;
        }

        dataset.households.push(HouseholdRecord {
            hh_id: hh_id.clone(),
            strata: stratum,
            cluster,
            size: Some(size),
        });
        dataset.weights.push(WeightRecord {
            hh_id,
            weight: Some(rng.random_range(600.0..1400.0)),
        });
        dataset.individuals.extend(living);
        dataset.deaths.extend(deaths);
    }

    let (official_deaths, population) = official_tables(&mut rng, config);
    let (census_household_size, census_age) = census_tables();
    dataset.official_deaths = official_deaths;
    dataset.population = population;
    dataset.census_household_size = census_household_size;
    dataset.census_age = census_age;

    log::info!(
        "Generated {} households, {} individuals, {} reported deaths ({} unreported)",
        dataset.households.len(),
        dataset.individuals.len(),
        dataset.deaths.len(),
        unreported
    );

    Ok(dataset)
}
