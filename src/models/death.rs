//! Death records reported by surveyed households

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::types::Gender;
use crate::schema::TableRecord;

/// A household member reported as deceased
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeathRecord {
    /// Household identifier
    pub hh_id: String,
    /// Identifier of the deceased within the household
    pub individual_id: Option<String>,
    /// Age at death in years
    pub age: Option<f64>,
    /// Gender as reported
    pub gender: Option<String>,
    /// Year of death
    pub year: Option<i32>,
    /// Month of death (1-12)
    pub month: Option<i32>,
    /// Day of month, often not recorded
    pub day: Option<i32>,
}

impl DeathRecord {
    /// Normalised gender
    #[must_use]
    pub fn gender(&self) -> Gender {
        Gender::from(self.gender.as_deref())
    }

    /// Date of death, imputing `imputed_day` when the day is unknown
    ///
    /// The imputed day is clamped to the length of the month. Returns `None`
    /// when the year or month is missing or the recorded date is invalid.
    #[must_use]
    pub fn death_date(&self, imputed_day: u32) -> Option<NaiveDate> {
        let year = self.year?;
        let month = u32::try_from(self.month?).ok()?;
        match self.day {
            Some(day) => NaiveDate::from_ymd_opt(year, month, u32::try_from(day).ok()?),
            None => {
                let last = last_day_of_month(year, month)?;
                NaiveDate::from_ymd_opt(year, month, imputed_day.clamp(1, last))
            }
        }
    }
}

/// Number of days in a calendar month
#[must_use]
pub fn last_day_of_month(year: i32, month: u32) -> Option<u32> {
    NaiveDate::from_ymd_opt(year, month, 1)?;
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?
        .pred_opt()
        .map(|last| last.day())
}

impl TableRecord for DeathRecord {
    const TABLE_NAME: &'static str = "deaths";
}
