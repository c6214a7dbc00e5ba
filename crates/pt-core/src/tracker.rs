//! Live presence state machine run by the collector.
//!
//! Converts a sequence of scan snapshots into stored observations and
//! session-close events in real time. The batch reconstruction in
//! [`crate::sessions`] is the source of truth for analytics; the totals
//! kept here exist only so the collector can log meaningful numbers
//! without re-reading the store.

use std::collections::{HashMap, HashSet};

use chrono::{NaiveDate, NaiveDateTime, Timelike};

use crate::observation::{Observation, user_key};

/// A user currently considered online, keyed by [`user_key`] in the tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnlineSpan {
    /// Display name as first observed for this span.
    pub name: String,
    /// Scan time at which the user first appeared.
    pub since: NaiveDateTime,
}

/// A completed online session emitted on the `Online -> Offline` transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosedSession {
    pub name: String,
    pub start: NaiveDateTime,
    /// The scan time at which absence was observed.
    pub end: NaiveDateTime,
}

impl ClosedSession {
    #[must_use]
    pub fn duration(&self) -> chrono::Duration {
        self.end - self.start
    }
}

/// Everything one snapshot did to the tracker state.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SnapshotEffects {
    /// One observation per distinct user present in the snapshot. Each
    /// becomes a stored row, including repeat appearances in consecutive
    /// scans.
    pub observations: Vec<Observation>,
    /// Display names that transitioned `Offline -> Online` this scan.
    pub opened: Vec<String>,
    /// Sessions closed by users absent from this scan.
    pub closed: Vec<ClosedSession>,
}

/// Per-user running totals folded on session close.
///
/// Transient and process-local; recomputable from the observation log.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UserTotals {
    pub sessions: u64,
    pub total_online_ms: i64,
    /// Milliseconds by hour of session start.
    pub by_start_hour: [i64; 24],
    /// Milliseconds by calendar date of session start.
    pub by_day: HashMap<NaiveDate, i64>,
}

/// Incremental per-user online/offline state machine.
///
/// An entry exists iff the user was present in the most recent snapshot
/// and has not yet been found absent in a later one.
#[derive(Debug, Default)]
pub struct LiveTracker {
    online: HashMap<String, OnlineSpan>,
    totals: HashMap<String, UserTotals>,
}

impl LiveTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one scan snapshot taken at `at`.
    ///
    /// Duplicate display names that normalize to the same key collapse to
    /// a single entry. An empty snapshot closes every tracked user.
    pub fn apply_snapshot(&mut self, names: &[String], at: NaiveDateTime) -> SnapshotEffects {
        let mut effects = SnapshotEffects::default();
        let mut present: HashSet<String> = HashSet::new();

        for name in names {
            let key = user_key(name);
            if key.is_empty() || !present.insert(key.clone()) {
                continue;
            }
            effects.observations.push(Observation::new(at, name.clone()));
            if !self.online.contains_key(&key) {
                self.online.insert(
                    key,
                    OnlineSpan {
                        name: name.clone(),
                        since: at,
                    },
                );
                effects.opened.push(name.clone());
            }
        }

        let absent: Vec<String> = self
            .online
            .keys()
            .filter(|key| !present.contains(*key))
            .cloned()
            .collect();
        for key in absent {
            let Some(span) = self.online.remove(&key) else {
                continue;
            };
            let session = ClosedSession {
                name: span.name,
                start: span.since,
                end: at,
            };
            self.fold_totals(&key, &session);
            effects.closed.push(session);
        }
        effects.closed.sort_by(|a, b| a.name.cmp(&b.name));

        effects
    }

    /// Spans still open, for shutdown reporting. An open span at shutdown
    /// is simply dropped; its duration is never recorded.
    pub fn open_spans(&self) -> impl Iterator<Item = &OnlineSpan> {
        self.online.values()
    }

    #[must_use]
    pub fn is_tracking(&self, name: &str) -> bool {
        self.online.contains_key(&user_key(name))
    }

    /// Running totals per user key.
    #[must_use]
    pub const fn totals(&self) -> &HashMap<String, UserTotals> {
        &self.totals
    }

    fn fold_totals(&mut self, key: &str, session: &ClosedSession) {
        let duration_ms = session.duration().num_milliseconds();
        let totals = self.totals.entry(key.to_string()).or_default();
        totals.sessions += 1;
        totals.total_online_ms += duration_ms;
        totals.by_start_hour[session.start.hour() as usize] += duration_ms;
        *totals.by_day.entry(session.start.date()).or_default() += duration_ms;
    }
}
