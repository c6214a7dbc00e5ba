//! Core domain logic for the presence tracker.
//!
//! This crate contains the fundamental types and logic for:
//! - Observations: timestamped "user seen online" facts and name normalization
//! - Live tracking: the per-user online/offline state machine run by the collector
//! - Sessions: batch gap-based session reconstruction from the observation log
//! - Aggregation: hour/weekday histograms, heatmap grids, and presence derivation

pub mod aggregate;
pub mod observation;
pub mod sessions;
pub mod tracker;

pub use aggregate::{ActivityAggregates, Presence, WEEKDAY_LABELS};
pub use observation::{Observation, format_timestamp, parse_timestamp, user_key};
pub use sessions::{Session, UserSummary, reconstruct_sessions, summarize, summarize_all};
pub use tracker::{ClosedSession, LiveTracker, OnlineSpan, SnapshotEffects};
