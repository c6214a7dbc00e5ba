//! Track command: the collector loop.
//!
//! Reads scan snapshots from stdin, one JSON object per line
//! (`{"at": "YYYY-MM-DD HH:MM:SS", "names": ["Alice", ...]}`; `at` is
//! optional and defaults to the local clock). Snapshot acquisition itself
//! is an external concern; any producer can pipe lines in. Each present
//! user becomes one stored row, and absences close live sessions.

use std::io::{self, BufRead};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDateTime, Timelike};
use serde::Deserialize;

use pt_core::{LiveTracker, format_timestamp, parse_timestamp};
use pt_db::Database;

/// One scan snapshot as read from stdin.
#[derive(Debug, Deserialize)]
struct SnapshotLine {
    #[serde(default)]
    at: Option<String>,
    #[serde(default)]
    names: Vec<String>,
}

/// Runs the collector until stdin is exhausted.
///
/// On shutdown, still-open spans are logged and dropped: an open session
/// never gets its duration recorded.
pub fn run(db: &mut Database) -> Result<()> {
    let mut tracker = LiveTracker::new();
    let stdin = io::stdin();

    for line in stdin.lock().lines() {
        let line = line.context("failed to read snapshot line")?;
        if line.trim().is_empty() {
            continue;
        }
        let now = local_now();
        apply_line(db, &mut tracker, &line, now)?;
    }

    for span in tracker.open_spans() {
        tracing::info!(
            user = %span.name,
            since = %format_timestamp(span.since),
            "still online at shutdown; open session not recorded"
        );
    }
    Ok(())
}

/// Applies one snapshot line. A malformed line counts as "nobody online
/// this scan", so tracked users age out through the normal offline path.
fn apply_line(
    db: &mut Database,
    tracker: &mut LiveTracker,
    line: &str,
    now: NaiveDateTime,
) -> Result<()> {
    let snapshot: SnapshotLine = match serde_json::from_str(line) {
        Ok(snapshot) => snapshot,
        Err(error) => {
            tracing::warn!(%error, "malformed snapshot treated as empty");
            SnapshotLine {
                at: None,
                names: Vec::new(),
            }
        }
    };

    let at = match snapshot.at.as_deref() {
        Some(raw) => match parse_timestamp(raw) {
            Ok(at) => at,
            Err(error) => {
                tracing::warn!(%error, raw, "unparseable snapshot time, using local clock");
                now
            }
        },
        None => now,
    };

    let effects = tracker.apply_snapshot(&snapshot.names, at);
    let names: Vec<String> = effects
        .observations
        .iter()
        .map(|observation| observation.name.clone())
        .collect();
    db.append_snapshot(at, &names)
        .context("failed to append snapshot")?;

    for name in &effects.opened {
        tracing::info!(user = %name, "started tracking");
    }
    for session in &effects.closed {
        tracing::info!(
            user = %session.name,
            minutes = session.duration().num_minutes(),
            "went offline"
        );
    }
    tracing::debug!(online = effects.observations.len(), "scan recorded");
    Ok(())
}

fn local_now() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> NaiveDateTime {
        parse_timestamp(s).unwrap()
    }

    #[test]
    fn snapshot_line_appends_one_row_per_name() {
        let mut db = Database::open_in_memory().unwrap();
        let mut tracker = LiveTracker::new();

        apply_line(
            &mut db,
            &mut tracker,
            r#"{"at": "2025-03-11 09:00:00", "names": ["Alice", "Bob"]}"#,
            ts("2025-03-11 09:00:01"),
        )
        .unwrap();

        let rows = db.list_rows().unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|row| row.timestamp == "2025-03-11 09:00:00"));
        assert!(tracker.is_tracking("Alice"));
        assert!(tracker.is_tracking("Bob"));
    }

    #[test]
    fn missing_at_falls_back_to_clock() {
        let mut db = Database::open_in_memory().unwrap();
        let mut tracker = LiveTracker::new();

        apply_line(
            &mut db,
            &mut tracker,
            r#"{"names": ["Alice"]}"#,
            ts("2025-03-11 09:05:00"),
        )
        .unwrap();

        let rows = db.list_rows().unwrap();
        assert_eq!(rows[0].timestamp, "2025-03-11 09:05:00");
    }

    #[test]
    fn malformed_line_closes_tracked_users() {
        let mut db = Database::open_in_memory().unwrap();
        let mut tracker = LiveTracker::new();

        apply_line(
            &mut db,
            &mut tracker,
            r#"{"names": ["Alice"]}"#,
            ts("2025-03-11 09:00:00"),
        )
        .unwrap();
        apply_line(&mut db, &mut tracker, "not json", ts("2025-03-11 09:01:00")).unwrap();

        assert!(!tracker.is_tracking("Alice"));
        // Only the first scan produced a row.
        assert_eq!(db.list_rows().unwrap().len(), 1);
    }

    #[test]
    fn absence_across_lines_closes_session() {
        let mut db = Database::open_in_memory().unwrap();
        let mut tracker = LiveTracker::new();

        for (line, now) in [
            (r#"{"at": "2025-03-11 09:00:00", "names": ["Alice"]}"#, "2025-03-11 09:00:00"),
            (r#"{"at": "2025-03-11 09:01:00", "names": ["Alice"]}"#, "2025-03-11 09:01:00"),
            (r#"{"at": "2025-03-11 09:02:00", "names": []}"#, "2025-03-11 09:02:00"),
        ] {
            apply_line(&mut db, &mut tracker, line, ts(now)).unwrap();
        }

        assert!(!tracker.is_tracking("Alice"));
        assert_eq!(db.list_rows().unwrap().len(), 2);
        assert_eq!(tracker.totals().get("alice").unwrap().sessions, 1);
    }
}
