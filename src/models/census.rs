//! Census reference distributions used for post-stratification

use serde::{Deserialize, Serialize};

use crate::schema::TableRecord;

/// Number of census households of a given size
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CensusHouseholdSize {
    /// Household size (persons)
    pub size: i32,
    /// Count (or share) of households of this size
    pub households: f64,
}

impl TableRecord for CensusHouseholdSize {
    const TABLE_NAME: &'static str = "census_household_size";
}

/// Census population in an age group
///
/// A group spans from `age_lower` up to the next group's lower bound; the
/// oldest group is open-ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CensusAgeGroup {
    /// Lower bound of the age group in years
    pub age_lower: i32,
    /// Population (or share) in the group
    pub population: f64,
}

impl TableRecord for CensusAgeGroup {
    const TABLE_NAME: &'static str = "census_age";
}
