//! Short-TTL read-through cache over the observation log.
//!
//! Bounds read load from analytics queries against the single-writer
//! database file. One instance is constructed per process and passed by
//! reference to callers; the clock is injected per call, so there is no
//! ambient global state.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use pt_core::Observation;

use crate::{Database, StoreError};

/// Default time-to-live for a cached snapshot.
pub const DEFAULT_TTL: Duration = Duration::from_secs(10);

#[derive(Debug)]
struct CachedSnapshot {
    observations: Vec<Observation>,
    fetched_at: Instant,
}

/// A single cached snapshot of the full observation log plus its
/// freshness timestamp.
///
/// Not thread-synchronized: callers within one process race benignly,
/// each receiving a valid, possibly stale snapshot.
#[derive(Debug)]
pub struct SnapshotCache {
    db_path: PathBuf,
    ttl: Duration,
    cached: Option<CachedSnapshot>,
}

impl SnapshotCache {
    #[must_use]
    pub const fn new(db_path: PathBuf, ttl: Duration) -> Self {
        Self {
            db_path,
            ttl,
            cached: None,
        }
    }

    /// Returns the observation snapshot, refreshing if the cached copy is
    /// older than the TTL.
    pub fn get(&mut self) -> Result<Vec<Observation>, StoreError> {
        self.get_at(Instant::now())
    }

    /// Like [`Self::get`] with an explicit clock reading.
    ///
    /// A fresh read tries a read-only connection first and falls back to
    /// a normal open, whose busy timeout bounds the wait on a mid-write
    /// store. If the refresh fails outright and a previous snapshot
    /// exists, that stale snapshot is returned instead of an error. The
    /// returned vector is always a copy; mutating it cannot corrupt the
    /// cache.
    pub fn get_at(&mut self, now: Instant) -> Result<Vec<Observation>, StoreError> {
        if let Some(cached) = &self.cached {
            if now.duration_since(cached.fetched_at) < self.ttl {
                return Ok(cached.observations.clone());
            }
        }

        match self.read_store() {
            Ok(observations) => {
                self.cached = Some(CachedSnapshot {
                    observations: observations.clone(),
                    fetched_at: now,
                });
                Ok(observations)
            }
            Err(error) => match &self.cached {
                Some(cached) => {
                    tracing::warn!(%error, "snapshot refresh failed, serving stale cache");
                    Ok(cached.observations.clone())
                }
                None => Err(error),
            },
        }
    }

    fn read_store(&self) -> Result<Vec<Observation>, StoreError> {
        match Database::open_read_only(&self.db_path).and_then(|db| db.list_observations()) {
            Ok(observations) => return Ok(observations),
            Err(error) => {
                tracing::debug!(%error, "read-only access failed, retrying with locking connection");
            }
        }
        Database::open(&self.db_path)?.list_observations()
    }
}
