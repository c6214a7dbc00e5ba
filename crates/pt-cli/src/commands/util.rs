//! Shared helpers for command output and filtering.

use chrono::{Duration, NaiveDate};

use pt_core::Observation;

/// Formats a duration as "Xh Ym" if >= 1 hour, "Xm" otherwise.
/// Negative durations render as "0m".
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let total_minutes = duration.num_minutes();
    if total_minutes < 0 {
        return "0m".to_string();
    }
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;

    if hours >= 1 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

/// Duration in minutes, rounded to two decimals for JSON output.
#[must_use]
pub fn duration_minutes(duration: Duration) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let minutes = duration.num_seconds() as f64 / 60.0;
    (minutes * 100.0).round() / 100.0
}

/// Keeps observations within an inclusive calendar-date range.
#[must_use]
pub fn filter_by_date_range(
    observations: &[Observation],
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Vec<Observation> {
    observations
        .iter()
        .filter(|observation| {
            let date = observation.timestamp.date();
            start.is_none_or(|start| date >= start) && end.is_none_or(|end| date <= end)
        })
        .cloned()
        .collect()
}
