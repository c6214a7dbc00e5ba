//! Report command: per-user summaries and activity histograms.

use std::io::Write;

use anyhow::Result;
use chrono::{Duration, NaiveDate};
use serde_json::json;

use pt_core::{
    ActivityAggregates, Observation, UserSummary, WEEKDAY_LABELS, format_timestamp, summarize_all,
    user_key,
};

use super::util::{duration_minutes, filter_by_date_range, format_duration};

/// Width of the longest histogram bar.
const BAR_WIDTH: u64 = 20;

pub fn run<W: Write>(
    writer: &mut W,
    observations: &[Observation],
    gap: Duration,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    users: &[String],
    json: bool,
) -> Result<()> {
    let mut filtered = filter_by_date_range(observations, start, end);
    if !users.is_empty() {
        let keys: Vec<String> = users.iter().map(|user| user_key(user)).collect();
        filtered.retain(|observation| keys.contains(&observation.key()));
    }

    let summaries = summarize_all(&filtered, gap);
    let aggregates = ActivityAggregates::from_observations(&filtered);
    let timezone = iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string());

    if json {
        render_json(writer, &summaries, &aggregates, gap, &timezone)
    } else {
        render(writer, &summaries, &aggregates)
    }
}

fn render_json<W: Write>(
    writer: &mut W,
    summaries: &[UserSummary],
    aggregates: &ActivityAggregates,
    gap: Duration,
    timezone: &str,
) -> Result<()> {
    let users: Vec<_> = summaries
        .iter()
        .map(|summary| {
            json!({
                "name": summary.name,
                "total_sessions": summary.total_sessions,
                "avg_session_minutes": duration_minutes(summary.avg_session),
                "max_session_minutes": duration_minutes(summary.max_session),
                "total_online_minutes": duration_minutes(summary.total_online),
                "first_seen": format_timestamp(summary.first_seen),
                "last_seen": format_timestamp(summary.last_seen),
                "days_active": summary.days_active,
            })
        })
        .collect();

    let output = json!({
        "timezone": timezone,
        "gap_minutes": gap.num_minutes(),
        "users": users,
        "hour_counts": aggregates.hour_counts.to_vec(),
        "weekday_counts": aggregates.weekday_counts.to_vec(),
        "heatmap": aggregates.heatmap.iter().map(|row| row.to_vec()).collect::<Vec<_>>(),
    });
    writeln!(writer, "{output}")?;
    Ok(())
}

fn render<W: Write>(
    writer: &mut W,
    summaries: &[UserSummary],
    aggregates: &ActivityAggregates,
) -> Result<()> {
    writeln!(writer, "ACTIVITY REPORT")?;

    if summaries.is_empty() {
        writeln!(writer)?;
        writeln!(writer, "No observations in the selected range.")?;
        return Ok(());
    }

    writeln!(writer)?;
    writeln!(writer, "BY USER")?;
    writeln!(writer, "───────")?;
    writeln!(
        writer,
        "{:<24} {:>8} {:>9} {:>7} {:>7} {:>5}",
        "Name", "Sessions", "Total", "Avg", "Max", "Days"
    )?;
    for summary in summaries {
        writeln!(
            writer,
            "{:<24} {:>8} {:>9} {:>7} {:>7} {:>5}",
            summary.name,
            summary.total_sessions,
            format_duration(summary.total_online),
            format_duration(summary.avg_session),
            format_duration(summary.max_session),
            summary.days_active
        )?;
    }

    writeln!(writer)?;
    writeln!(writer, "BY HOUR")?;
    writeln!(writer, "───────")?;
    let hour_max = aggregates.hour_counts.iter().copied().max().unwrap_or(0);
    for (hour, &count) in aggregates.hour_counts.iter().enumerate() {
        writeln!(writer, "{hour:02}h {count:>5} {}", bar(count, hour_max))?;
    }

    writeln!(writer)?;
    writeln!(writer, "BY WEEKDAY")?;
    writeln!(writer, "──────────")?;
    let weekday_max = aggregates.weekday_counts.iter().copied().max().unwrap_or(0);
    for (label, &count) in WEEKDAY_LABELS.iter().zip(&aggregates.weekday_counts) {
        writeln!(writer, "{label:<9} {count:>5} {}", bar(count, weekday_max))?;
    }

    Ok(())
}

/// Proportional histogram bar; nonzero counts always get at least one block.
fn bar(count: u64, max: u64) -> String {
    if count == 0 || max == 0 {
        return String::new();
    }
    let filled = (count * BAR_WIDTH / max).max(1) as usize;
    "█".repeat(filled)
}

#[cfg(test)]
mod tests {
    use super::*;

    use insta::assert_snapshot;
    use pt_core::parse_timestamp;

    fn obs(timestamp: &str, name: &str) -> Observation {
        Observation::new(parse_timestamp(timestamp).unwrap(), name)
    }

    #[test]
    fn empty_range_degrades_gracefully() {
        let mut output = Vec::new();
        run(
            &mut output,
            &[],
            Duration::minutes(15),
            None,
            None,
            &[],
            false,
        )
        .unwrap();
        let output = String::from_utf8(output).unwrap();

        assert_snapshot!(output, @r"
        ACTIVITY REPORT

        No observations in the selected range.
        ");
    }

    #[test]
    fn json_grids_are_zero_filled_on_empty_input() {
        let mut output = Vec::new();
        run(
            &mut output,
            &[],
            Duration::minutes(15),
            None,
            None,
            &[],
            true,
        )
        .unwrap();
        let parsed: serde_json::Value =
            serde_json::from_str(&String::from_utf8(output).unwrap()).unwrap();

        assert_eq!(parsed["users"].as_array().unwrap().len(), 0);
        assert_eq!(parsed["hour_counts"].as_array().unwrap().len(), 24);
        assert_eq!(parsed["weekday_counts"].as_array().unwrap().len(), 7);
        let heatmap = parsed["heatmap"].as_array().unwrap();
        assert_eq!(heatmap.len(), 7);
        assert!(heatmap.iter().all(|row| row.as_array().unwrap().len() == 24));
    }

    #[test]
    fn report_renders_summaries_and_histograms() {
        // All three observations land on a Tuesday.
        let observations = vec![
            obs("2025-03-11 09:00:00", "Alice"),
            obs("2025-03-11 09:05:00", "Alice"),
            obs("2025-03-11 21:00:00", "Bob"),
        ];
        let mut output = Vec::new();
        run(
            &mut output,
            &observations,
            Duration::minutes(15),
            None,
            None,
            &[],
            false,
        )
        .unwrap();
        let output = String::from_utf8(output).unwrap();

        assert!(output.contains("Alice"));
        assert!(output.contains("Bob"));
        assert!(output.contains("09h     2"));
        assert!(output.contains("21h     1"));
        assert!(output.contains("Tuesday       3"));
        assert!(output.contains("Monday        0"));
    }

    #[test]
    fn user_filter_restricts_report() {
        let observations = vec![
            obs("2025-03-11 09:00:00", "Alice"),
            obs("2025-03-11 09:05:00", "Bob"),
        ];
        let mut output = Vec::new();
        run(
            &mut output,
            &observations,
            Duration::minutes(15),
            None,
            None,
            &["alice".to_string()],
            true,
        )
        .unwrap();
        let parsed: serde_json::Value =
            serde_json::from_str(&String::from_utf8(output).unwrap()).unwrap();

        let users = parsed["users"].as_array().unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0]["name"], "Alice");
    }

    #[test]
    fn json_summary_matches_scenario() {
        let observations = vec![
            obs("2025-03-11 09:00:00", "Alice"),
            obs("2025-03-11 09:05:00", "Alice"),
            obs("2025-03-11 09:30:00", "Alice"),
        ];
        let mut output = Vec::new();
        run(
            &mut output,
            &observations,
            Duration::minutes(15),
            None,
            None,
            &[],
            true,
        )
        .unwrap();
        let parsed: serde_json::Value =
            serde_json::from_str(&String::from_utf8(output).unwrap()).unwrap();

        let alice = &parsed["users"][0];
        assert_eq!(alice["total_sessions"], 2);
        assert_eq!(alice["total_online_minutes"], 5.0);
        assert_eq!(alice["first_seen"], "2025-03-11 09:00:00");
        assert_eq!(alice["last_seen"], "2025-03-11 09:30:00");
        assert_eq!(alice["days_active"], 1);
    }

    #[test]
    fn bar_scales_and_keeps_small_values_visible() {
        assert_eq!(bar(0, 10), "");
        assert_eq!(bar(10, 10), "█".repeat(20));
        assert_eq!(bar(1, 100), "█");
    }
}
