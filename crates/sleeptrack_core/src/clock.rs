//! Wall-clock source for night timestamps.

use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};

/// Source of "now" in Unix epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_milli(&self) -> i64;
}

/// Clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_milli(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Manually driven clock for deterministic callers and tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_milli: AtomicI64,
}

impl ManualClock {
    pub fn new(now_milli: i64) -> Self {
        Self {
            now_milli: AtomicI64::new(now_milli),
        }
    }

    pub fn set(&self, now_milli: i64) {
        self.now_milli.store(now_milli, Ordering::SeqCst);
    }

    /// Moves the clock forward and returns the new time.
    pub fn advance(&self, delta_milli: i64) -> i64 {
        self.now_milli.fetch_add(delta_milli, Ordering::SeqCst) + delta_milli
    }
}

impl Clock for ManualClock {
    fn now_milli(&self) -> i64 {
        self.now_milli.load(Ordering::SeqCst)
    }
}
