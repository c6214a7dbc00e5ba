//! Batch session reconstruction from the raw observation log.
//!
//! Pure and stateless: the same observations and gap threshold always
//! produce the same sessions, independent of the live tracker. This is
//! the source of truth for analytics; the live tracker only minimizes
//! storage latency.

use std::collections::{BTreeMap, HashSet};

use chrono::{Duration, NaiveDateTime};
use rayon::prelude::*;

use crate::observation::Observation;

/// Default gap threshold: consecutive observations further apart than
/// this belong to different sessions.
pub const DEFAULT_GAP: Duration = Duration::minutes(15);

/// A contiguous interval of presumed continuous online presence.
///
/// For a fixed user, reconstructed sessions are ordered by `start` and
/// non-overlapping. A single isolated observation yields a degenerate
/// session with `start == end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Session {
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// Per-user activity summary derived from the reconstructed session list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSummary {
    pub name: String,
    pub total_sessions: usize,
    pub avg_session: Duration,
    pub max_session: Duration,
    pub total_online: Duration,
    pub first_seen: NaiveDateTime,
    pub last_seen: NaiveDateTime,
    /// Distinct calendar dates with at least one observation.
    pub days_active: usize,
}

/// Partitions a sorted timestamp sequence into sessions.
///
/// A break occurs where the difference between consecutive timestamps is
/// strictly greater than `gap`; a gap exactly equal to the threshold
/// stays within the same session.
#[must_use]
pub fn reconstruct_sessions(timestamps: &[NaiveDateTime], gap: Duration) -> Vec<Session> {
    let Some((&first, rest)) = timestamps.split_first() else {
        return Vec::new();
    };

    let mut sessions = Vec::new();
    let mut start = first;
    let mut prev = first;
    for &timestamp in rest {
        if timestamp - prev > gap {
            sessions.push(Session { start, end: prev });
            start = timestamp;
        }
        prev = timestamp;
    }
    sessions.push(Session { start, end: prev });
    sessions
}

/// Summarizes one user's sorted timestamps, or `None` when there are none.
#[must_use]
pub fn summarize(name: &str, timestamps: &[NaiveDateTime], gap: Duration) -> Option<UserSummary> {
    let sessions = reconstruct_sessions(timestamps, gap);
    let (&first_seen, &last_seen) = (timestamps.first()?, timestamps.last()?);

    let total_online = sessions
        .iter()
        .map(Session::duration)
        .fold(Duration::zero(), |acc, duration| acc + duration);
    let max_session = sessions
        .iter()
        .map(Session::duration)
        .max()
        .unwrap_or_else(Duration::zero);
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    let avg_session = total_online / sessions.len() as i32;
    let days_active = timestamps
        .iter()
        .map(NaiveDateTime::date)
        .collect::<HashSet<_>>()
        .len();

    Some(UserSummary {
        name: name.to_string(),
        total_sessions: sessions.len(),
        avg_session,
        max_session,
        total_online,
        first_seen,
        last_seen,
        days_active,
    })
}

/// Summarizes every user in the observation set.
///
/// Observations are grouped by [`crate::observation::user_key`] (the display name of the
/// earliest observation wins), each group is sorted and reconstructed
/// independently, and the result is ordered by total online time
/// descending, then name, matching the analytics table ordering.
#[must_use]
pub fn summarize_all(observations: &[Observation], gap: Duration) -> Vec<UserSummary> {
    let mut groups: BTreeMap<String, (String, Vec<NaiveDateTime>)> = BTreeMap::new();
    for observation in observations {
        let key = observation.key();
        if key.is_empty() {
            continue;
        }
        groups
            .entry(key)
            .or_insert_with(|| (observation.name.clone(), Vec::new()))
            .1
            .push(observation.timestamp);
    }

    let mut summaries: Vec<UserSummary> = groups
        .into_par_iter()
        .filter_map(|(_, (name, mut timestamps))| {
            timestamps.sort_unstable();
            summarize(&name, &timestamps, gap)
        })
        .collect();

    summaries.sort_by(|a, b| {
        b.total_online
            .cmp(&a.total_online)
            .then_with(|| a.name.cmp(&b.name))
    });
    summaries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::parse_timestamp;

    fn ts(s: &str) -> NaiveDateTime {
        parse_timestamp(s).unwrap()
    }

    #[test]
    fn empty_input_yields_no_sessions() {
        assert!(reconstruct_sessions(&[], DEFAULT_GAP).is_empty());
    }

    #[test]
    fn single_observation_yields_degenerate_session() {
        let sessions = reconstruct_sessions(&[ts("2025-03-11 14:00:00")], DEFAULT_GAP);
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].start, sessions[0].end);
        assert_eq!(sessions[0].duration(), Duration::zero());
    }

    #[test]
    fn gap_over_threshold_splits_sessions() {
        // Alice at 09:00, 09:05, 09:30 with G=15: the 25-minute gap breaks
        // the run into [09:00-09:05] and the degenerate [09:30-09:30].
        let timestamps = [
            ts("2025-03-11 09:00:00"),
            ts("2025-03-11 09:05:00"),
            ts("2025-03-11 09:30:00"),
        ];
        let sessions = reconstruct_sessions(&timestamps, Duration::minutes(15));

        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].start, ts("2025-03-11 09:00:00"));
        assert_eq!(sessions[0].end, ts("2025-03-11 09:05:00"));
        assert_eq!(sessions[0].duration(), Duration::minutes(5));
        assert_eq!(sessions[1].start, ts("2025-03-11 09:30:00"));
        assert_eq!(sessions[1].duration(), Duration::zero());
    }

    #[test]
    fn gap_exactly_at_threshold_stays_in_session() {
        let timestamps = [ts("2025-03-11 09:00:00"), ts("2025-03-11 09:15:00")];
        let sessions = reconstruct_sessions(&timestamps, Duration::minutes(15));

        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].duration(), Duration::minutes(15));
    }

    #[test]
    fn sessions_are_ordered_and_non_overlapping() {
        let timestamps: Vec<NaiveDateTime> = [
            "2025-03-11 08:00:00",
            "2025-03-11 08:10:00",
            "2025-03-11 09:00:00",
            "2025-03-11 09:05:00",
            "2025-03-11 12:00:00",
        ]
        .iter()
        .map(|s| ts(s))
        .collect();
        let sessions = reconstruct_sessions(&timestamps, Duration::minutes(15));

        assert_eq!(sessions.len(), 3);
        for pair in sessions.windows(2) {
            assert!(pair[0].start <= pair[0].end);
            assert!(pair[0].end <= pair[1].start);
        }
    }

    #[test]
    fn total_duration_bounded_by_span() {
        let timestamps: Vec<NaiveDateTime> = [
            "2025-03-11 08:00:00",
            "2025-03-11 08:20:00",
            "2025-03-11 10:00:00",
            "2025-03-11 10:10:00",
        ]
        .iter()
        .map(|s| ts(s))
        .collect();
        let sessions = reconstruct_sessions(&timestamps, Duration::minutes(15));

        let total = sessions
            .iter()
            .map(Session::duration)
            .fold(Duration::zero(), |acc, duration| acc + duration);
        let span = *timestamps.last().unwrap() - timestamps[0];
        assert!(total <= span);
    }

    #[test]
    fn reconstruction_is_idempotent() {
        let timestamps = [
            ts("2025-03-11 09:00:00"),
            ts("2025-03-11 09:05:00"),
            ts("2025-03-11 09:30:00"),
        ];
        let first = reconstruct_sessions(&timestamps, DEFAULT_GAP);
        let second = reconstruct_sessions(&timestamps, DEFAULT_GAP);
        assert_eq!(first, second);
    }

    #[test]
    fn summarize_single_observation() {
        // Bob at 14:00: one degenerate session, zero duration.
        let summary = summarize("Bob", &[ts("2025-03-11 14:00:00")], DEFAULT_GAP).unwrap();

        assert_eq!(summary.total_sessions, 1);
        assert_eq!(summary.total_online, Duration::zero());
        assert_eq!(summary.first_seen, ts("2025-03-11 14:00:00"));
        assert_eq!(summary.last_seen, ts("2025-03-11 14:00:00"));
        assert_eq!(summary.days_active, 1);
    }

    #[test]
    fn summarize_empty_returns_none() {
        assert!(summarize("Bob", &[], DEFAULT_GAP).is_none());
    }

    #[test]
    fn summarize_computes_session_stats() {
        let timestamps = [
            ts("2025-03-11 09:00:00"),
            ts("2025-03-11 09:10:00"),
            ts("2025-03-12 20:00:00"),
            ts("2025-03-12 20:30:00"),
        ];
        let summary = summarize("Alice", &timestamps, Duration::minutes(30)).unwrap();

        assert_eq!(summary.total_sessions, 2);
        assert_eq!(summary.total_online, Duration::minutes(40));
        assert_eq!(summary.avg_session, Duration::minutes(20));
        assert_eq!(summary.max_session, Duration::minutes(30));
        assert_eq!(summary.days_active, 2);
    }

    #[test]
    fn summarize_all_groups_by_normalized_name() {
        let observations = vec![
            Observation::new(ts("2025-03-11 09:00:00"), "Alice Smith"),
            Observation::new(ts("2025-03-11 09:05:00"), "alice  smith"),
            Observation::new(ts("2025-03-11 09:02:00"), "Bob"),
        ];
        let summaries = summarize_all(&observations, DEFAULT_GAP);

        assert_eq!(summaries.len(), 2);
        // Alice's 5 minutes sort ahead of Bob's degenerate session.
        assert_eq!(summaries[0].name, "Alice Smith");
        assert_eq!(summaries[0].total_sessions, 1);
        assert_eq!(summaries[0].total_online, Duration::minutes(5));
        assert_eq!(summaries[1].name, "Bob");
    }

    #[test]
    fn summarize_all_sorts_unordered_input() {
        let observations = vec![
            Observation::new(ts("2025-03-11 09:30:00"), "Alice"),
            Observation::new(ts("2025-03-11 09:00:00"), "Alice"),
            Observation::new(ts("2025-03-11 09:05:00"), "Alice"),
        ];
        let summaries = summarize_all(&observations, Duration::minutes(15));

        assert_eq!(summaries[0].total_sessions, 2);
        assert_eq!(summaries[0].first_seen, ts("2025-03-11 09:00:00"));
        assert_eq!(summaries[0].last_seen, ts("2025-03-11 09:30:00"));
    }

    #[test]
    fn summarize_all_empty_input() {
        assert!(summarize_all(&[], DEFAULT_GAP).is_empty());
    }
}
