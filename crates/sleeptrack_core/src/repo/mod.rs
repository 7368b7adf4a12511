//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the store contract the tracker depends on.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repository writes enforce `SleepNight::validate()` before persistence.
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.

pub mod night_repo;
