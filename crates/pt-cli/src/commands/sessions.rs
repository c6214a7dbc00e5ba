//! Sessions command: batch gap-based reconstruction for one user.

use std::io::Write;

use anyhow::Result;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde_json::json;

use pt_core::{Observation, format_timestamp, reconstruct_sessions, summarize, user_key};

use super::util::{duration_minutes, filter_by_date_range, format_duration};

pub fn run<W: Write>(
    writer: &mut W,
    observations: &[Observation],
    user: &str,
    gap: Duration,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    json: bool,
) -> Result<()> {
    let key = user_key(user);
    let filtered = filter_by_date_range(observations, start, end);
    let mut timestamps: Vec<NaiveDateTime> = filtered
        .iter()
        .filter(|observation| observation.key() == key)
        .map(|observation| observation.timestamp)
        .collect();
    timestamps.sort_unstable();

    if timestamps.is_empty() {
        if json {
            writeln!(writer, "{}", json!({ "user": user, "sessions": [] }))?;
        } else {
            writeln!(writer, "No observations for {user}.")?;
        }
        return Ok(());
    }

    let sessions = reconstruct_sessions(&timestamps, gap);
    // Timestamps are non-empty, so the summary always exists.
    let summary = summarize(user, &timestamps, gap).expect("non-empty timestamps");

    if json {
        let sessions: Vec<_> = sessions
            .iter()
            .map(|session| {
                json!({
                    "start": format_timestamp(session.start),
                    "end": format_timestamp(session.end),
                    "duration_minutes": duration_minutes(session.duration()),
                })
            })
            .collect();
        let output = json!({
            "user": user,
            "gap_minutes": gap.num_minutes(),
            "sessions": sessions,
            "summary": {
                "total_sessions": summary.total_sessions,
                "avg_session_minutes": duration_minutes(summary.avg_session),
                "max_session_minutes": duration_minutes(summary.max_session),
                "total_online_minutes": duration_minutes(summary.total_online),
                "first_seen": format_timestamp(summary.first_seen),
                "last_seen": format_timestamp(summary.last_seen),
                "days_active": summary.days_active,
            },
        });
        writeln!(writer, "{output}")?;
        return Ok(());
    }

    writeln!(
        writer,
        "Sessions for {user} (gap {}m)",
        gap.num_minutes()
    )?;
    for session in &sessions {
        writeln!(
            writer,
            "{}  ..  {}  ({})",
            format_timestamp(session.start),
            format_timestamp(session.end),
            format_duration(session.duration())
        )?;
    }
    writeln!(writer)?;
    writeln!(
        writer,
        "{} sessions, {} online total, avg {}, max {}, {} days active",
        summary.total_sessions,
        format_duration(summary.total_online),
        format_duration(summary.avg_session),
        format_duration(summary.max_session),
        summary.days_active
    )?;

    Ok(())
}
