//! lucky-ensemble - operator CLI for the prediction pipeline
//!
//! Subcommands:
//! - `run --date YYYY-MM-DD`: create (or reuse) the session for a draw and run it
//! - `lock --date YYYY-MM-DD`: lock completed sessions for a draw
//! - `latest`: print the newest completed prediction

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use lucky_common::config::{default_config_path, LoggingConfig, RootFolderInitializer, RootFolderResolver};
use lucky_common::db::init_database;
use lucky_ensemble::config::MODULE_NAME;
use lucky_ensemble::{AppConfig, SessionManager, SqliteStore};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "lucky-ensemble")]
#[command(about = "Ensemble lucky-number prediction pipeline")]
#[command(version)]
struct Args {
    /// Configuration file (defaults to the platform config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database file; overrides root folder resolution
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Root folder holding lucky.db
    #[arg(long, global = true)]
    root_folder: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the prediction for a draw date
    Run {
        #[arg(long)]
        date: NaiveDate,
    },
    /// Lock completed predictions for a draw date
    Lock {
        #[arg(long)]
        date: NaiveDate,
    },
    /// Show the newest completed prediction
    Latest,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args
        .config
        .clone()
        .or_else(|| default_config_path(MODULE_NAME))
        .unwrap_or_else(|| PathBuf::from(format!("{}.toml", MODULE_NAME)));
    let config = AppConfig::load(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path.display()))?;

    init_tracing(&config.bootstrap.logging)?;

    info!(
        "Starting lucky-ensemble v{} (config: {})",
        env!("CARGO_PKG_VERSION"),
        config_path.display()
    );

    let db_path = match args.database.clone().or_else(|| config.bootstrap.database_path.clone()) {
        Some(path) => path,
        None => {
            let root_folder = RootFolderResolver::new(MODULE_NAME)
                .with_cli_arg(args.root_folder.clone())
                .with_toml(&config.bootstrap)
                .resolve();
            let initializer = RootFolderInitializer::new(root_folder);
            initializer.ensure_directory_exists()?;
            initializer.database_path()
        }
    };
    info!("Database path: {}", db_path.display());

    let pool = init_database(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;
    let store = Arc::new(SqliteStore::new(pool).await?.with_max_lock_wait(config.ensemble.max_lock_wait_ms));
    let manager = SessionManager::new(store.clone(), store, config.ensemble.clone());

    match args.command {
        Command::Run { date } => {
            let prediction = manager
                .run_for_draw_date(date)
                .await
                .with_context(|| format!("Prediction run for {} failed", date))?;
            println!("{}", serde_json::to_string_pretty(&prediction)?);
        }
        Command::Lock { date } => {
            let locked = manager.lock(date).await?;
            println!("Locked {} session(s) for {}", locked, date);
        }
        Command::Latest => match manager.latest_completed_prediction().await? {
            Some(prediction) => println!("{}", serde_json::to_string_pretty(&prediction)?),
            None => println!("No completed predictions"),
        },
    }

    Ok(())
}

/// RUST_LOG wins over the configured level; logs go to stderr unless a file is configured
fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .context("Invalid log level")?;

    match &logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }

    Ok(())
}
