//! Command-line argument definitions.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

/// Social-graph presence tracker.
///
/// Records when contacts appear online and reconstructs sessions and
/// activity statistics from the observation log.
#[derive(Debug, Parser)]
#[command(name = "pt", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the collector: read scan snapshots from stdin, one JSON object
    /// per line, and record observations.
    Track,

    /// Show store health and who is currently online.
    Status,

    /// Reconstruct online sessions for one user.
    Sessions {
        /// Display name of the user (case- and whitespace-insensitive).
        user: String,

        /// Gap threshold in minutes; consecutive observations further
        /// apart than this start a new session.
        #[arg(long)]
        gap_minutes: Option<i64>,

        /// Only observations on or after this date (YYYY-MM-DD).
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Only observations up to and including this date (YYYY-MM-DD).
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Output JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Per-user summaries and hour/weekday activity histograms.
    Report {
        /// Only observations on or after this date (YYYY-MM-DD).
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Only observations up to and including this date (YYYY-MM-DD).
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Restrict to these users (repeatable).
        #[arg(long = "user")]
        users: Vec<String>,

        /// Output JSON, including the weekday-by-hour heatmap grid.
        #[arg(long)]
        json: bool,
    },

    /// Dump raw observation rows as JSONL.
    Observations {
        /// Only rows with timestamp at or after this (YYYY-MM-DD HH:MM:SS).
        #[arg(long)]
        after: Option<String>,

        /// Only rows with timestamp before this (YYYY-MM-DD HH:MM:SS).
        #[arg(long)]
        before: Option<String>,
    },
}
