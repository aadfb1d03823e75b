//! Excess deaths implied by a rate difference

use std::fmt;

use super::rate::RateEstimate;

/// Deaths above the baseline over the post-event window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExcessDeaths {
    /// Point estimate
    pub estimate: f64,
    /// Lower bound, from the lower bound of the post-event rate
    pub lower: f64,
    /// Upper bound, from the upper bound of the post-event rate
    pub upper: f64,
    /// `r_post / r_base - 1`, undefined for a zero baseline
    pub relative_increase: Option<f64>,
    /// Length of the post-event window in years
    pub window_years: f64,
    /// Population the difference is scaled to
    pub population: f64,
}

impl fmt::Display for ExcessDeaths {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.0} ({:.0}, {:.0})", self.estimate, self.lower, self.upper)
    }
}

/// Convert a rate per `multiplier` person-years into deaths
fn deaths_from_rate(rate_difference: f64, multiplier: f64, population: f64, window_years: f64) -> f64 {
    rate_difference / multiplier * population * window_years
}

/// Excess deaths `(r_post - r_base) / multiplier × population × years`
///
/// The baseline is treated as fixed, so the interval carries only the
/// uncertainty of the post-event rate.
#[must_use]
pub fn excess_deaths(
    post_event: &RateEstimate,
    baseline_rate: f64,
    population: f64,
    window_years: f64,
    multiplier: f64,
) -> ExcessDeaths {
    let convert = |rate: f64| deaths_from_rate(rate - baseline_rate, multiplier, population, window_years);
    let relative_increase = (baseline_rate != 0.0).then(|| post_event.rate / baseline_rate - 1.0);
    ExcessDeaths {
        estimate: convert(post_event.rate),
        lower: convert(post_event.interval.lower),
        upper: convert(post_event.interval.upper),
        relative_increase,
        window_years,
        population,
    }
}
