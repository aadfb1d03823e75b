//! Observation windows and person-time exposure

use std::fmt;

use chrono::{Datelike, NaiveDate};

/// A half-open date interval `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObservationWindow {
    /// First day included
    pub start: NaiveDate,
    /// First day excluded
    pub end: NaiveDate,
}

/// Person-time and death indicator contributed to one window
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Exposure {
    /// Years lived inside the window
    pub person_years: f64,
    /// Whether the person died inside the window
    pub died: bool,
}

impl ObservationWindow {
    /// Create a window from `start` (inclusive) to `end` (exclusive)
    #[must_use]
    pub const fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Length in days; an inverted window has length zero
    #[must_use]
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days().max(0)
    }

    /// Length in years
    #[must_use]
    pub fn years(&self, days_per_year: f64) -> f64 {
        self.days() as f64 / days_per_year
    }

    /// Whether `date` falls inside the window
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }

    /// Days of `[from, to)` that fall inside the window
    #[must_use]
    pub fn overlap_days(&self, from: NaiveDate, to: NaiveDate) -> i64 {
        let start = from.max(self.start);
        let end = to.min(self.end);
        (end - start).num_days().max(0)
    }

    /// The same calendar window moved so that it starts in `year`
    ///
    /// Returns `None` when a boundary does not exist in the target year
    /// (29 February).
    #[must_use]
    pub fn shifted_to_year(&self, year: i32) -> Option<Self> {
        let offset = year - self.start.year();
        let start = self.start.with_year(self.start.year() + offset)?;
        let end = self.end.with_year(self.end.year() + offset)?;
        Some(Self { start, end })
    }

    /// Exposure of a person who died on `death`, or survived when `None`
    ///
    /// A death before the window contributes nothing; a death inside it
    /// contributes the time up to the death and counts as a death; a death
    /// after it contributes the full window.
    #[must_use]
    pub fn exposure(&self, death: Option<NaiveDate>, days_per_year: f64) -> Exposure {
        match death {
            Some(date) if date < self.start => Exposure::default(),
            Some(date) if date < self.end => Exposure {
                person_years: (date - self.start).num_days() as f64 / days_per_year,
                died: true,
            },
            _ => Exposure {
                person_years: self.years(days_per_year),
                died: false,
            },
        }
    }
}

impl fmt::Display for ObservationWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}
