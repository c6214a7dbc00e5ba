//! Histogram and presence derivation over observation sets.
//!
//! All grids are dense and zero-filled over their full domain: sparse
//! input never produces sparse output.

use chrono::{Datelike, Duration, NaiveDateTime, Timelike};

use crate::observation::{Observation, user_key};

/// Weekday labels in canonical order, matching `weekday_counts` and the
/// rows of `heatmap`.
pub const WEEKDAY_LABELS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Dense observation-count grids for analytics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityAggregates {
    /// Observations per hour of day.
    pub hour_counts: [u64; 24],
    /// Observations per weekday, Monday first.
    pub weekday_counts: [u64; 7],
    /// Observations per (weekday, hour) cell.
    pub heatmap: [[u64; 24]; 7],
}

impl ActivityAggregates {
    /// Builds all grids in one pass. Callers pre-filter by date range and
    /// user set; the same input always yields the same grids.
    #[must_use]
    pub fn from_observations<'a, I>(observations: I) -> Self
    where
        I: IntoIterator<Item = &'a Observation>,
    {
        let mut aggregates = Self {
            hour_counts: [0; 24],
            weekday_counts: [0; 7],
            heatmap: [[0; 24]; 7],
        };
        for observation in observations {
            let hour = observation.timestamp.hour() as usize;
            let weekday = observation.timestamp.weekday().num_days_from_monday() as usize;
            aggregates.hour_counts[hour] += 1;
            aggregates.weekday_counts[weekday] += 1;
            aggregates.heatmap[weekday][hour] += 1;
        }
        aggregates
    }
}

/// Who is online right now, derived from observation recency.
///
/// `Stale` is a distinct signal from an empty online set: it means the
/// scanner has gone quiet and the dataset cannot answer the question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presence {
    /// The observation log is empty.
    NoData,
    /// The newest observation is older than the freshness window.
    Stale { last_seen: NaiveDateTime },
    /// Users observed within the freshness window ending at the newest
    /// observation.
    Online {
        as_of: NaiveDateTime,
        users: Vec<String>,
    },
}

impl Presence {
    /// Derives presence at `now` with the given freshness window.
    ///
    /// Users with an observation in `[T_max - window, T_max]` are online,
    /// where `T_max` is the newest observation timestamp; duplicates
    /// collapse by normalized name and the earliest display name wins.
    #[must_use]
    pub fn derive(observations: &[Observation], window: Duration, now: NaiveDateTime) -> Self {
        let Some(latest) = observations
            .iter()
            .map(|observation| observation.timestamp)
            .max()
        else {
            return Self::NoData;
        };

        if now - latest > window {
            return Self::Stale { last_seen: latest };
        }

        let cutoff = latest - window;
        let mut users: Vec<(String, String)> = Vec::new();
        for observation in observations {
            if observation.timestamp < cutoff {
                continue;
            }
            let key = user_key(&observation.name);
            if key.is_empty() || users.iter().any(|(existing, _)| *existing == key) {
                continue;
            }
            users.push((key, observation.name.clone()));
        }
        let mut users: Vec<String> = users.into_iter().map(|(_, name)| name).collect();
        users.sort_unstable();

        Self::Online {
            as_of: latest,
            users,
        }
    }
}
