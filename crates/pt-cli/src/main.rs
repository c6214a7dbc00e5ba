use std::io;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use pt_cli::commands::{observations, report, sessions, status, track};
use pt_cli::{Cli, Commands, Config};
use pt_core::Observation;
use pt_db::SnapshotCache;

/// Load config and open database, ensuring the parent directory exists.
fn open_database(config_path: Option<&Path>) -> Result<(pt_db::Database, Config)> {
    let config = load_config(config_path)?;

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db = pt_db::Database::open(&config.database_path).context("failed to open database")?;
    Ok((db, config))
}

fn load_config(config_path: Option<&Path>) -> Result<Config> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");
    Ok(config)
}

/// Reads the full observation snapshot through the analytics cache.
fn load_snapshot(config: &Config) -> Result<Vec<Observation>> {
    let mut cache = SnapshotCache::new(
        config.database_path.clone(),
        Duration::from_secs(config.cache_ttl_seconds),
    );
    cache.get().context("failed to read observations")
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let mut stdout = io::stdout();

    match &cli.command {
        Some(Commands::Track) => {
            let (mut db, _config) = open_database(cli.config.as_deref())?;
            track::run(&mut db)?;
        }
        Some(Commands::Status) => {
            let config = load_config(cli.config.as_deref())?;
            status::run(&mut stdout, &config)?;
        }
        Some(Commands::Sessions {
            user,
            gap_minutes,
            start,
            end,
            json,
        }) => {
            let config = load_config(cli.config.as_deref())?;
            let snapshot = load_snapshot(&config)?;
            let gap = chrono::Duration::minutes(gap_minutes.unwrap_or(config.gap_minutes));
            sessions::run(&mut stdout, &snapshot, user, gap, *start, *end, *json)?;
        }
        Some(Commands::Report {
            start,
            end,
            users,
            json,
        }) => {
            let config = load_config(cli.config.as_deref())?;
            let snapshot = load_snapshot(&config)?;
            let gap = chrono::Duration::minutes(config.gap_minutes);
            report::run(&mut stdout, &snapshot, gap, *start, *end, users, *json)?;
        }
        Some(Commands::Observations { after, before }) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            observations::run(&mut stdout, &db, after.as_deref(), before.as_deref())?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
