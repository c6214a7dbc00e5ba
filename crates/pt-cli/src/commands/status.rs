//! Status command for store health and current presence.

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use chrono::Local;

use pt_core::{Presence, format_timestamp};
use pt_db::SnapshotCache;

use crate::Config;

pub fn run<W: Write>(writer: &mut W, config: &Config) -> Result<()> {
    let mut cache = SnapshotCache::new(
        config.database_path.clone(),
        Duration::from_secs(config.cache_ttl_seconds),
    );
    let observations = cache.get()?;
    let presence = Presence::derive(
        &observations,
        chrono::Duration::minutes(config.freshness_minutes),
        Local::now().naive_local(),
    );
    render(writer, &config.database_path, observations.len(), &presence)
}

fn render<W: Write>(
    writer: &mut W,
    database_path: &Path,
    observation_count: usize,
    presence: &Presence,
) -> Result<()> {
    writeln!(writer, "Presence tracker status")?;
    writeln!(writer, "Database: {}", database_path.display())?;
    writeln!(writer, "Observations: {observation_count}")?;

    match presence {
        Presence::NoData => {
            writeln!(writer, "No observations recorded.")?;
        }
        Presence::Stale { last_seen } => {
            writeln!(writer, "Last update: {}", format_timestamp(*last_seen))?;
            writeln!(
                writer,
                "Dataset is stale; the collector may not be scanning."
            )?;
        }
        Presence::Online { as_of, users } => {
            writeln!(
                writer,
                "As of {}, {} online:",
                format_timestamp(*as_of),
                users.len()
            )?;
            for user in users {
                writeln!(writer, "- {user}")?;
            }
        }
    }

    Ok(())
}
