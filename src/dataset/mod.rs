//! The full set of input tables for one analysis run

pub mod synthetic;

use std::path::Path;
use std::time::Instant;

use crate::error::Result;
use crate::models::{
    CensusAgeGroup, CensusHouseholdSize, DeathRecord, HouseholdRecord, IndividualRecord,
    OfficialDeathRecord, PopulationRecord, WeightRecord,
};
use crate::reader::{read_table, validate_directory, write_table};
use crate::schema::TableRecord;
use crate::utils::logging::{create_main_progress_bar, finish_progress_bar};

pub use synthetic::{SyntheticConfig, generate_synthetic_dataset};

/// Number of tables making up a dataset
pub const TABLE_COUNT: u64 = 8;

/// Survey, vital-statistics and census tables
#[derive(Debug, Clone, Default)]
pub struct SurveyDataset {
    /// Sampled households
    pub households: Vec<HouseholdRecord>,
    /// Household sampling weights
    pub weights: Vec<WeightRecord>,
    /// Living household members
    pub individuals: Vec<IndividualRecord>,
    /// Reported deaths
    pub deaths: Vec<DeathRecord>,
    /// Official monthly death counts
    pub official_deaths: Vec<OfficialDeathRecord>,
    /// Official population estimates
    pub population: Vec<PopulationRecord>,
    /// Census household-size distribution
    pub census_household_size: Vec<CensusHouseholdSize>,
    /// Census age distribution
    pub census_age: Vec<CensusAgeGroup>,
}

impl SurveyDataset {
    /// Load every table from a data directory
    ///
    /// # Arguments
    /// * `data_dir` - Directory holding one parquet file or folder per table
    /// * `show_progress` - Draw a progress bar while loading
    pub fn load(data_dir: &Path, show_progress: bool) -> Result<Self> {
        validate_directory(data_dir)?;
        let start = Instant::now();
        let pb = show_progress.then(|| create_main_progress_bar(TABLE_COUNT, Some("tables")));

        let step = |name: &str| {
            if let Some(pb) = &pb {
                pb.set_message(name.to_string());
                pb.inc(1);
            }
        };

        let households = read_table::<HouseholdRecord>(data_dir)?;
        step(HouseholdRecord::TABLE_NAME);
        let weights = read_table::<WeightRecord>(data_dir)?;
        step(WeightRecord::TABLE_NAME);
        let individuals = read_table::<IndividualRecord>(data_dir)?;
        step(IndividualRecord::TABLE_NAME);
        let deaths = read_table::<DeathRecord>(data_dir)?;
        step(DeathRecord::TABLE_NAME);
        let official_deaths = read_table::<OfficialDeathRecord>(data_dir)?;
        step(OfficialDeathRecord::TABLE_NAME);
        let population = read_table::<PopulationRecord>(data_dir)?;
        step(PopulationRecord::TABLE_NAME);
        let census_household_size = read_table::<CensusHouseholdSize>(data_dir)?;
        step(CensusHouseholdSize::TABLE_NAME);
        let census_age = read_table::<CensusAgeGroup>(data_dir)?;
        step(CensusAgeGroup::TABLE_NAME);

        if let Some(pb) = &pb {
            finish_progress_bar(pb, Some("all tables loaded"));
        }
        log::info!(
            "Loaded dataset from {} in {:?}",
            data_dir.display(),
            start.elapsed()
        );

        Ok(Self {
            households,
            weights,
            individuals,
            deaths,
            official_deaths,
            population,
            census_household_size,
            census_age,
        })
    }

    /// Write every table as a parquet file into `data_dir`
    pub fn write(&self, data_dir: &Path) -> Result<()> {
        write_table(data_dir, &self.households)?;
        write_table(data_dir, &self.weights)?;
        write_table(data_dir, &self.individuals)?;
        write_table(data_dir, &self.deaths)?;
        write_table(data_dir, &self.official_deaths)?;
        write_table(data_dir, &self.population)?;
        write_table(data_dir, &self.census_household_size)?;
        write_table(data_dir, &self.census_age)?;
        Ok(())
    }

    /// Row count per table, in load order
    #[must_use]
    pub fn table_sizes(&self) -> Vec<(&'static str, usize)> {
        vec![
            (HouseholdRecord::TABLE_NAME, self.households.len()),
            (WeightRecord::TABLE_NAME, self.weights.len()),
            (IndividualRecord::TABLE_NAME, self.individuals.len()),
            (DeathRecord::TABLE_NAME, self.deaths.len()),
            (OfficialDeathRecord::TABLE_NAME, self.official_deaths.len()),
            (PopulationRecord::TABLE_NAME, self.population.len()),
            (CensusHouseholdSize::TABLE_NAME, self.census_household_size.len()),
            (CensusAgeGroup::TABLE_NAME, self.census_age.len()),
        ]
    }
}
