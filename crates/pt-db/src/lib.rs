//! Storage layer for the presence tracker.
//!
//! Provides the append-only observation log using `rusqlite`, plus a
//! short-TTL snapshot cache for analytics readers.
//!
//! # Concurrency
//!
//! One process (the collector) writes; any number of analytics readers
//! share the same database file. Writes are short single-row inserts, and
//! every connection sets a bounded busy timeout so a reader is never
//! blocked indefinitely by the writer. Readers should go through
//! [`SnapshotCache`], which tries a read-only connection first and bounds
//! the locked fallback with the same timeout.
//!
//! # Schema
//!
//! A single append-only table:
//!
//! ```sql
//! online_activity(id INTEGER PRIMARY KEY AUTOINCREMENT,
//!                 timestamp TEXT, name TEXT, status TEXT)
//! ```
//!
//! `timestamp` is local time in `YYYY-MM-DD HH:MM:SS` format, so
//! lexicographic ordering matches chronological ordering and string range
//! filters are valid. `status` is always the literal `Online`; offline is
//! inferred by absence. The table is an event log, never a state table:
//! rows are never updated or deleted, and repeated sightings of the same
//! user each produce a new row.

mod cache;

pub use cache::SnapshotCache;

use std::path::Path;
use std::time::Duration;

use chrono::NaiveDateTime;
use rusqlite::{Connection, OpenFlags, params};
use serde::Serialize;
use thiserror::Error;

use pt_core::observation::{ONLINE_STATUS, format_timestamp, parse_timestamp};
use pt_core::Observation;

/// Upper bound on how long any connection waits for a locked database.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// A raw stored row, exactly as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObservationRow {
    pub id: i64,
    pub timestamp: String,
    pub name: String,
    pub status: String,
}

/// Database connection wrapper around the observation log.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens a database at the given path, creating it and its schema if
    /// necessary. Schema creation is idempotent.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an existing database without taking write locks.
    ///
    /// Does not create the schema; fails if the file does not exist.
    pub fn open_read_only(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(Self { conn })
    }

    fn init(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS online_activity (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                name TEXT NOT NULL,
                status TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_online_activity_timestamp
                ON online_activity(timestamp);
            CREATE INDEX IF NOT EXISTS idx_online_activity_name
                ON online_activity(name);
            ",
        )?;
        Ok(())
    }

    /// Appends one observation row.
    pub fn append(&self, at: NaiveDateTime, name: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO online_activity (timestamp, name, status) VALUES (?, ?, ?)",
            params![format_timestamp(at), name, ONLINE_STATUS],
        )?;
        Ok(())
    }

    /// Appends one row per name inside a transaction, so a scan lands
    /// atomically. Returns the number of rows written.
    pub fn append_snapshot(
        &mut self,
        at: NaiveDateTime,
        names: &[String],
    ) -> Result<usize, StoreError> {
        if names.is_empty() {
            return Ok(0);
        }
        let timestamp = format_timestamp(at);
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO online_activity (timestamp, name, status) VALUES (?, ?, ?)",
            )?;
            for name in names {
                stmt.execute(params![timestamp, name, ONLINE_STATUS])?;
            }
        }
        tx.commit()?;
        Ok(names.len())
    }

    /// Lists all raw rows in arrival order.
    pub fn list_rows(&self) -> Result<Vec<ObservationRow>, StoreError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, timestamp, name, status
            FROM online_activity
            ORDER BY id ASC
            ",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(ObservationRow {
                id: row.get(0)?,
                timestamp: row.get(1)?,
                name: row.get(2)?,
                status: row.get(3)?,
            })
        })?;
        let mut observations = Vec::new();
        for row in rows {
            observations.push(row?);
        }
        Ok(observations)
    }

    /// Lists all observations in arrival order.
    ///
    /// Rows with a malformed timestamp or an unexpected status are skipped
    /// with a warning rather than aborting the read.
    pub fn list_observations(&self) -> Result<Vec<Observation>, StoreError> {
        Ok(self
            .list_rows()?
            .iter()
            .filter_map(parse_row)
            .collect())
    }

    /// Lists observations with `timestamp >= cutoff`, in arrival order.
    pub fn observations_since(&self, cutoff: NaiveDateTime) -> Result<Vec<Observation>, StoreError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, timestamp, name, status
            FROM online_activity
            WHERE timestamp >= ?
            ORDER BY id ASC
            ",
        )?;
        let rows = stmt.query_map([format_timestamp(cutoff)], |row| {
            Ok(ObservationRow {
                id: row.get(0)?,
                timestamp: row.get(1)?,
                name: row.get(2)?,
                status: row.get(3)?,
            })
        })?;
        let mut observations = Vec::new();
        for row in rows {
            if let Some(observation) = parse_row(&row?) {
                observations.push(observation);
            }
        }
        Ok(observations)
    }

    /// Lists observations from the trailing window ending at `now`, in
    /// arrival order.
    pub fn observations_within(
        &self,
        window: chrono::Duration,
        now: NaiveDateTime,
    ) -> Result<Vec<Observation>, StoreError> {
        self.observations_since(now - window)
    }

    /// The newest stored timestamp, or `None` for an empty (or wholly
    /// malformed) log.
    pub fn latest_timestamp(&self) -> Result<Option<NaiveDateTime>, StoreError> {
        let latest: Option<String> = self.conn.query_row(
            "SELECT MAX(timestamp) FROM online_activity",
            [],
            |row| row.get(0),
        )?;
        Ok(latest.as_deref().and_then(|s| parse_timestamp(s).ok()))
    }

    /// Total number of stored rows.
    pub fn row_count(&self) -> Result<i64, StoreError> {
        let count =
            self.conn
                .query_row("SELECT COUNT(*) FROM online_activity", [], |row| row.get(0))?;
        Ok(count)
    }
}

fn parse_row(row: &ObservationRow) -> Option<Observation> {
    if row.status != ONLINE_STATUS {
        tracing::warn!(id = row.id, status = %row.status, "skipping row with unexpected status");
        return None;
    }
    match parse_timestamp(&row.timestamp) {
        Ok(timestamp) => Some(Observation::new(timestamp, row.name.clone())),
        Err(error) => {
            tracing::warn!(id = row.id, timestamp = %row.timestamp, %error, "skipping row with malformed timestamp");
            None
        }
    }
}
