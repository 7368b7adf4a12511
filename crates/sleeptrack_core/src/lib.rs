//! Core domain logic for sleeptrack.
//! This crate is the single source of truth for session invariants.

pub mod clock;
pub mod config;
pub mod db;
pub mod format;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod signal;
pub mod tracker;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::CoreConfig;
pub use format::{NightFormatter, PlainTextNightFormatter};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::night::{NightId, NightValidationError, SleepNight, SleepQuality};
pub use repo::night_repo::{
    NightRepository, RepoError, RepoResult, SharedNightRepository, SqliteNightRepository,
};
pub use service::night_service::NightService;
pub use signal::Signal;
pub use tracker::{SleepTracker, TrackerError, TrackerResult};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
