//! Sensitivity report across estimators
//!
//! One row per estimator and period, with the excess deaths each post-event
//! rate implies against the official baseline.

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::Result;

use super::excess::ExcessDeaths;
use super::frame::Period;
use super::rate::RateEstimate;

/// One estimator's result
#[derive(Debug, Clone, PartialEq)]
pub struct SensitivityRow {
    /// Short description of the estimator and its options
    pub label: String,
    /// Period the rate refers to
    pub period: Period,
    /// The rate
    pub estimate: RateEstimate,
    /// Excess deaths, for post-event rates
    pub excess: Option<ExcessDeaths>,
}

/// Rates and excess deaths for every estimator
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SensitivityReport {
    /// Rows in insertion order
    pub rows: Vec<SensitivityRow>,
    /// Reference year of the baseline
    pub baseline_year: Option<i32>,
    /// Baseline rate the excess is measured against
    pub baseline_rate: Option<f64>,
}

impl SensitivityReport {
    /// Empty report against an optional baseline
    #[must_use]
    pub fn new(baseline_year: Option<i32>, baseline_rate: Option<f64>) -> Self {
        Self {
            rows: Vec::new(),
            baseline_year,
            baseline_rate,
        }
    }

    /// Append a row
    pub fn push(
        &mut self,
        label: impl Into<String>,
        period: Period,
        estimate: RateEstimate,
        excess: Option<ExcessDeaths>,
    ) {
        self.rows.push(SensitivityRow {
            label: label.into(),
            period,
            estimate,
            excess,
        });
    }

    /// Rows for one period
    pub fn rows_for(&self, period: Period) -> impl Iterator<Item = &SensitivityRow> {
        self.rows.iter().filter(move |r| r.period == period)
    }

    /// Write the report to a CSV file
    pub fn write_to_csv(&self, path: &Path) -> Result<()> {
        let mut file = BufWriter::new(File::create(path)?);
        writeln!(
            file,
            "Estimator,Period,Method,Deaths,Person Years,Rate,SE,CI Lower,CI Upper,Excess,Excess Lower,Excess Upper"
        )?;
        for row in &self.rows {
            let e = &row.estimate;
            let (excess, lower, upper) = row.excess.map_or_else(
                || (String::new(), String::new(), String::new()),
                |x| {
                    (
                        format!("{:.1}", x.estimate),
                        format!("{:.1}", x.lower),
                        format!("{:.1}", x.upper),
                    )
                },
            );
            writeln!(
                file,
                "{},{},{},{:.3},{:.3},{:.6},{:.6},{:.6},{:.6},{},{},{}",
                escape_csv(&row.label),
                row.period,
                e.method,
                e.deaths,
                e.person_years,
                e.rate,
                e.standard_error,
                e.interval.lower,
                e.interval.upper,
                excess,
                lower,
                upper
            )?;
        }
        file.flush()?;
        log::info!("Wrote {} report rows to {}", self.rows.len(), path.display());
        Ok(())
    }
}

impl fmt::Display for SensitivityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let (Some(year), Some(rate)) = (self.baseline_year, self.baseline_rate) {
            writeln!(f, "Baseline ({year} official): {rate:.2} per 1000 person-years")?;
            writeln!(f)?;
        }
        writeln!(
            f,
            "{:<36} | {:<6} | {:>8} | {:>6} | {:>16} | {:>22}",
            "Estimator", "Period", "Rate", "SE", "CI", "Excess deaths"
        )?;
        writeln!(f, "{}", "-".repeat(36 + 6 + 8 + 6 + 16 + 22 + 15))?;
        for row in &self.rows {
            let excess = row.excess.map(|x| x.to_string()).unwrap_or_default();
            writeln!(
                f,
                "{:<36} | {:<6} | {:>8.2} | {:>6.2} | {:>16} | {:>22}",
                truncate(&row.label, 36),
                row.period.to_string(),
                row.estimate.rate,
                row.estimate.standard_error,
                row.estimate.interval.to_string(),
                excess
            )?;
        }
        Ok(())
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
