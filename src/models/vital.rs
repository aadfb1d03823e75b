//! Official vital statistics: monthly death counts and population estimates

use serde::{Deserialize, Serialize};

use crate::schema::TableRecord;

/// Registered deaths in one calendar month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfficialDeathRecord {
    /// Calendar year
    pub year: i32,
    /// Calendar month (1-12)
    pub month: i32,
    /// Number of registered deaths
    pub deaths: Option<f64>,
}

impl TableRecord for OfficialDeathRecord {
    const TABLE_NAME: &'static str = "official_deaths";
}

/// Mid-year population estimate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationRecord {
    /// Calendar year
    pub year: i32,
    /// Estimated resident population
    pub population: Option<f64>,
}

impl TableRecord for PopulationRecord {
    const TABLE_NAME: &'static str = "population";
}
