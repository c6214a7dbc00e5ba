//! Observations command for dumping the raw log.
//!
//! Outputs stored rows as JSONL for debugging; malformed rows are
//! included verbatim, since this is a view of the log itself.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;

use pt_core::{format_timestamp, parse_timestamp};
use pt_db::Database;

pub fn run<W: Write>(
    writer: &mut W,
    db: &Database,
    after: Option<&str>,
    before: Option<&str>,
) -> Result<()> {
    let after = parse_bound(after, "after")?;
    let before = parse_bound(before, "before")?;

    // Stored timestamps order lexicographically, so string bounds are
    // valid even for rows whose timestamps fail to parse.
    let after = after.map(format_timestamp);
    let before = before.map(format_timestamp);

    for row in db.list_rows()? {
        if let Some(after) = &after {
            if row.timestamp.as_str() < after.as_str() {
                continue;
            }
        }
        if let Some(before) = &before {
            if row.timestamp.as_str() >= before.as_str() {
                continue;
            }
        }
        let json = serde_json::to_string(&row)?;
        writeln!(writer, "{json}")?;
    }

    Ok(())
}

fn parse_bound(s: Option<&str>, name: &str) -> Result<Option<NaiveDateTime>> {
    match s {
        None => Ok(None),
        Some(s) => {
            let timestamp = parse_timestamp(s).with_context(|| {
                format!("invalid --{name} timestamp, expected YYYY-MM-DD HH:MM:SS")
            })?;
            Ok(Some(timestamp))
        }
    }
}
