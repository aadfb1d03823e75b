//! Individual roster records

use serde::{Deserialize, Serialize};

use crate::models::types::Gender;
use crate::schema::TableRecord;

/// A person living in a sampled household at the time of interview
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndividualRecord {
    /// Household identifier
    pub hh_id: String,
    /// Age in years
    pub age: Option<f64>,
    /// Gender as reported
    pub gender: Option<String>,
}

impl IndividualRecord {
    /// Normalised gender
    #[must_use]
    pub fn gender(&self) -> Gender {
        Gender::from(self.gender.as_deref())
    }
}

impl TableRecord for IndividualRecord {
    const TABLE_NAME: &'static str = "individuals";
}
