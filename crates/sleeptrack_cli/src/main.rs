//! Command-line front end for the sleep tracker.
//!
//! # Responsibility
//! - Drive `SleepTracker` actions against a local SQLite file.
//! - Print the tracker's derived signals after each action.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use sleeptrack_core::db::open_db;
use sleeptrack_core::{
    init_logging, CoreConfig, NightId, NightService, SharedNightRepository, SleepQuality,
    SleepTracker, SqliteNightRepository,
};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "sleeptrack", version, about = "Track sleep nights in a local database")]
struct Cli {
    /// SQLite database file (defaults to $SLEEPTRACK_DB_PATH or the temp dir).
    #[arg(long)]
    db: Option<PathBuf>,
    /// Log level: trace|debug|info|warn|error.
    #[arg(long)]
    log_level: Option<String>,
    /// Absolute directory for rolling log files.
    #[arg(long)]
    log_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show button availability and the night list.
    Status,
    /// Start tracking tonight.
    Start,
    /// Stop tracking the open night.
    Stop,
    /// Delete every recorded night.
    Clear,
    /// Print the formatted night list only.
    List,
    /// Rate a closed night from 0 (very bad) to 5 (excellent).
    Rate { night_id: NightId, quality: i64 },
    /// Check core linkage.
    Ping,
}

impl Cli {
    fn config(&self) -> CoreConfig {
        let mut config = CoreConfig::from_env();
        if let Some(db) = &self.db {
            config.db_path = db.clone();
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(dir) = &self.log_dir {
            config.log_dir = Some(dir.clone());
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.config();

    if let Some(log_dir) = &config.log_dir {
        init_logging(&config.log_level, &log_dir.to_string_lossy())
            .context("failed to initialize logging")?;
    }

    match cli.command {
        Command::Ping => {
            println!("sleeptrack_core ping={}", sleeptrack_core::ping());
            println!("sleeptrack_core version={}", sleeptrack_core::core_version());
            Ok(())
        }
        Command::Rate { night_id, quality } => rate(&config, night_id, quality),
        command => run_tracker(&config, command).await,
    }
}

fn rate(config: &CoreConfig, night_id: NightId, quality: i64) -> Result<()> {
    let quality = SleepQuality::from_rating(quality)?;
    let conn = open_db(&config.db_path)
        .with_context(|| format!("failed to open {}", config.db_path.display()))?;
    let service = NightService::new(SqliteNightRepository::new(&conn));
    let night = service.set_sleep_quality(night_id, quality)?;
    println!("Night {} rated: {}", night.night_id, quality.label());
    Ok(())
}

async fn run_tracker(config: &CoreConfig, command: Command) -> Result<()> {
    info!("event=cli_command module=cli status=start command={command:?}");
    let conn = open_db(&config.db_path)
        .with_context(|| format!("failed to open {}", config.db_path.display()))?;
    let tracker = SleepTracker::open(SharedNightRepository::new(conn)).await?;

    match command {
        Command::Start => tracker.start_tracking().await?,
        Command::Stop => tracker.stop_tracking().await?,
        Command::Clear => tracker.clear().await?,
        Command::List => {
            println!("{}", tracker.nights_text().get());
            return Ok(());
        }
        _ => {}
    }

    if let Some(night) = tracker.navigate_to_sleep_quality().get() {
        println!(
            "Stopped night {}. Rate it with `sleeptrack rate {} <0-5>`.",
            night.night_id, night.night_id
        );
        tracker.done_navigating();
    }
    if tracker.show_cleared_notice().get() {
        println!("All nights cleared.");
        tracker.done_showing_cleared_notice();
    }

    print_status(&tracker);
    tracker.shutdown();
    Ok(())
}

fn print_status(tracker: &SleepTracker<SharedNightRepository>) {
    println!("start: {}", availability(tracker.start_available().get()));
    println!("stop: {}", availability(tracker.stop_available().get()));
    println!("clear: {}", availability(tracker.clear_available().get()));
    let text = tracker.nights_text().get();
    if !text.is_empty() {
        println!();
        println!("{text}");
    }
}

fn availability(available: bool) -> &'static str {
    if available {
        "available"
    } else {
        "unavailable"
    }
}
