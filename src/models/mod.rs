//! Record types for the survey and reference tables
//!
//! Each type maps one-to-one to an input table and implements
//! [`TableRecord`](crate::schema::TableRecord).

pub mod census;
pub mod death;
pub mod household;
pub mod individual;
pub mod types;
pub mod vital;

// Re-export commonly used types
pub use census::{CensusAgeGroup, CensusHouseholdSize};
pub use death::DeathRecord;
pub use household::{HouseholdRecord, WeightRecord};
pub use individual::IndividualRecord;
pub use types::Gender;
pub use vital::{OfficialDeathRecord, PopulationRecord};
