//! The per-household and per-person analysis frame
//!
//! Joins the household roster, survey weights, living individuals and
//! reported deaths, and derives for every person the person-time and death
//! indicator in the pre-event and post-event windows.

use std::fmt;

use chrono::NaiveDate;
use rustc_hash::FxHashMap;

use crate::config::AnalysisConfig;
use crate::dataset::SurveyDataset;
use crate::models::Gender;
use crate::utils::log_exclusions;

use super::rate::RateUnit;
use super::window::{Exposure, ObservationWindow};

/// Which side of the event a rate refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Period {
    /// From the pre-event start up to the event
    PreEvent,
    /// From the event to the end of observation
    PostEvent,
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PreEvent => f.write_str("before"),
            Self::PostEvent => f.write_str("after"),
        }
    }
}

/// Deaths and person-years accumulated over a set of people
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ExposureTotals {
    /// Deaths inside the window
    pub deaths: f64,
    /// Person-years inside the window
    pub person_years: f64,
}

impl ExposureTotals {
    fn add(&mut self, exposure: Exposure) {
        self.person_years += exposure.person_years;
        if exposure.died {
            self.deaths += 1.0;
        }
    }
}

/// A household in the analysis frame
#[derive(Debug, Clone, PartialEq)]
pub struct HouseholdUnit {
    /// Household identifier
    pub hh_id: String,
    /// Design stratum
    pub stratum: i32,
    /// Index of the household's primary sampling unit
    pub cluster: usize,
    /// Reported household size
    pub size: Option<i32>,
    /// Sampling weight, when known
    pub weight: Option<f64>,
    /// Living members found in the roster
    pub members: usize,
    /// Totals before the event
    pub pre_event: ExposureTotals,
    /// Totals after the event
    pub post_event: ExposureTotals,
}

impl HouseholdUnit {
    /// Totals for a period
    #[must_use]
    pub fn totals(&self, period: Period) -> ExposureTotals {
        match period {
            Period::PreEvent => self.pre_event,
            Period::PostEvent => self.post_event,
        }
    }
}

/// A person in the analysis frame, living or deceased
#[derive(Debug, Clone, PartialEq)]
pub struct PersonRecord {
    /// Index into the frame's households
    pub household: usize,
    /// Age in years (age at death for decedents)
    pub age: Option<f64>,
    /// Normalised gender
    pub gender: Gender,
    /// Date of death, `None` for living members
    pub death_date: Option<NaiveDate>,
    /// Died on or after the event and before the end of observation
    pub died_after_event: bool,
    /// Exposure before the event
    pub pre_event: Exposure,
    /// Exposure after the event
    pub post_event: Exposure,
}

impl PersonRecord {
    /// Exposure for a period
    #[must_use]
    pub fn exposure(&self, period: Period) -> Exposure {
        match period {
            Period::PreEvent => self.pre_event,
            Period::PostEvent => self.post_event,
        }
    }
}

/// Records dropped while building the frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameExclusions {
    /// Households listed more than once
    pub duplicate_households: usize,
    /// Individuals whose household is not in the roster
    pub orphan_individuals: usize,
    /// Deaths whose household is not in the roster
    pub orphan_deaths: usize,
    /// Deaths without a usable date
    pub undated_deaths: usize,
    /// Households without a usable weight
    pub unweighted_households: usize,
}

/// Joined survey data with derived exposures
#[derive(Debug, Clone)]
pub struct AnalysisFrame {
    /// Households in roster order
    pub households: Vec<HouseholdUnit>,
    /// Living members followed by decedents
    pub persons: Vec<PersonRecord>,
    /// Window before the event
    pub pre_event_window: ObservationWindow,
    /// Window after the event
    pub post_event_window: ObservationWindow,
    /// Length of a person-year in days
    pub days_per_year: f64,
    /// Records dropped during the join
    pub exclusions: FrameExclusions,
}

impl AnalysisFrame {
    /// Join the survey tables and derive person-time
    #[must_use]
    pub fn build(dataset: &SurveyDataset, config: &AnalysisConfig) -> Self {
        let pre_event_window = config.pre_event_window();
        let post_event_window = config.post_event_window();
        let days_per_year = config.days_per_year;
        let mut exclusions = FrameExclusions::default();

        let weights: FxHashMap<&str, f64> = dataset
            .weights
            .iter()
            .filter_map(|w| {
                w.weight
                    .filter(|v| v.is_finite() && *v > 0.0)
                    .map(|v| (w.hh_id.as_str(), v))
            })
            .collect();

        let mut index: FxHashMap<&str, usize> = FxHashMap::default();
        let mut clusters: FxHashMap<(i32, &str), usize> = FxHashMap::default();
        let mut households = Vec::with_capacity(dataset.households.len());
        for record in &dataset.households {
            if index.contains_key(record.hh_id.as_str()) {
                exclusions.duplicate_households += 1;
                continue;
            }
            index.insert(record.hh_id.as_str(), households.len());
            let next_cluster = clusters.len();
            let cluster = *clusters
                .entry((record.strata, record.cluster.as_str()))
                .or_insert(next_cluster);
            let weight = weights.get(record.hh_id.as_str()).copied();
            if weight.is_none() {
                exclusions.unweighted_households += 1;
            }
            households.push(HouseholdUnit {
                hh_id: record.hh_id.clone(),
                stratum: record.strata,
                cluster,
                size: record.size,
                weight,
                members: 0,
                pre_event: ExposureTotals::default(),
                post_event: ExposureTotals::default(),
            });
        }

        let mut persons = Vec::with_capacity(dataset.individuals.len() + dataset.deaths.len());

        for individual in &dataset.individuals {
            let Some(&household) = index.get(individual.hh_id.as_str()) else {
                exclusions.orphan_individuals += 1;
                continue;
            };
            let pre_event = pre_event_window.exposure(None, days_per_year);
            let post_event = post_event_window.exposure(None, days_per_year);
            let unit = &mut households[household];
            unit.members += 1;
            unit.pre_event.add(pre_event);
            unit.post_event.add(post_event);
            persons.push(PersonRecord {
                household,
                age: individual.age,
                gender: individual.gender(),
                death_date: None,
                died_after_event: false,
                pre_event,
                post_event,
            });
        }

        for death in &dataset.deaths {
            let Some(&household) = index.get(death.hh_id.as_str()) else {
                exclusions.orphan_deaths += 1;
                continue;
            };
            let Some(date) = death.death_date(config.imputed_death_day) else {
                exclusions.undated_deaths += 1;
                continue;
            };
            let pre_event = pre_event_window.exposure(Some(date), days_per_year);
            let post_event = post_event_window.exposure(Some(date), days_per_year);
            let unit = &mut households[household];
            unit.pre_event.add(pre_event);
            unit.post_event.add(post_event);
            persons.push(PersonRecord {
                household,
                age: death.age,
                gender: death.gender(),
                death_date: Some(date),
                died_after_event: post_event_window.contains(date),
                pre_event,
                post_event,
            });
        }

        log_exclusions("frame", exclusions.duplicate_households, "duplicate household id");
        log_exclusions("frame", exclusions.orphan_individuals, "individual in unknown household");
        log_exclusions("frame", exclusions.orphan_deaths, "death in unknown household");
        log_exclusions("frame", exclusions.undated_deaths, "death without year or month");
        log_exclusions(
            "frame",
            exclusions.unweighted_households,
            "household without sampling weight",
        );

        let frame = Self {
            households,
            persons,
            pre_event_window,
            post_event_window,
            days_per_year,
            exclusions,
        };
        let [male, female, unknown] = frame.deaths_by_gender(Period::PostEvent);
        log::info!(
            "Analysis frame: {} households, {} persons, {} deaths after the event \
             ({male} male, {female} female, {unknown} unknown)",
            frame.households.len(),
            frame.persons.len(),
            male + female + unknown
        );
        frame
    }

    /// Deaths in a period as `[male, female, unknown]`
    #[must_use]
    pub fn deaths_by_gender(&self, period: Period) -> [usize; 3] {
        let mut counts = [0; 3];
        for person in self.persons.iter().filter(|p| p.exposure(period).died) {
            let slot = match person.gender {
                Gender::Male => 0,
                Gender::Female => 1,
                Gender::Unknown => 2,
            };
            counts[slot] += 1;
        }
        counts
    }

    /// Window for a period
    #[must_use]
    pub fn window(&self, period: Period) -> ObservationWindow {
        match period {
            Period::PreEvent => self.pre_event_window,
            Period::PostEvent => self.post_event_window,
        }
    }

    /// One rate unit per household, weight 1
    #[must_use]
    pub fn rate_units(&self, period: Period) -> Vec<RateUnit> {
        self.households
            .iter()
            .map(|h| Self::unit(h, period, 1.0))
            .collect()
    }

    /// One rate unit per weighted household
    ///
    /// Households without a weight are left out.
    #[must_use]
    pub fn weighted_rate_units(&self, period: Period) -> Vec<RateUnit> {
        self.households
            .iter()
            .filter_map(|h| h.weight.map(|w| Self::unit(h, period, w)))
            .collect()
    }

    fn unit(household: &HouseholdUnit, period: Period, weight: f64) -> RateUnit {
        let totals = household.totals(period);
        RateUnit {
            deaths: totals.deaths,
            person_years: totals.person_years,
            weight,
            stratum: household.stratum,
            cluster: household.cluster,
        }
    }
}
