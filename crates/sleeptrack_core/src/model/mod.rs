//! Domain model for tracked sleep sessions.
//!
//! # Invariants
//! - A night is "open" while `end_time_milli == start_time_milli`.
//! - Identity is assigned by the store; `0` marks a not-yet-persisted night.

pub mod night;
