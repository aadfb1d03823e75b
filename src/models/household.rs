//! Household roster and survey weight records

use serde::{Deserialize, Serialize};

use crate::schema::TableRecord;

/// A sampled household
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HouseholdRecord {
    /// Household identifier
    pub hh_id: String,
    /// Remoteness stratum the household was sampled from
    pub strata: i32,
    /// Primary sampling unit (barrio) within the stratum
    pub cluster: String,
    /// Number of people living in the household at interview
    pub size: Option<i32>,
}

impl TableRecord for HouseholdRecord {
    const TABLE_NAME: &'static str = "households";
}

/// Sampling weight for a household, delivered as a separate table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightRecord {
    /// Household identifier
    pub hh_id: String,
    /// Design weight (inverse inclusion probability)
    pub weight: Option<f64>,
}

impl TableRecord for WeightRecord {
    const TABLE_NAME: &'static str = "weights";
}
