//! Sleep night domain model.
//!
//! # Responsibility
//! - Define the persisted record for one tracked sleep interval.
//! - Encode the open/closed lifecycle and quality rating scale.
//!
//! # Invariants
//! - `end_time_milli >= start_time_milli` for every valid night.
//! - Open is encoded as `end_time_milli == start_time_milli`, never a flag.
//! - Quality ratings stay within `0..=5`; unrated is `None`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Store-assigned identifier of a sleep night.
pub type NightId = i64;

/// Identifier carried by nights that have not been inserted yet.
pub const UNSAVED_NIGHT_ID: NightId = 0;

/// Persisted marker for an unrated night.
pub(crate) const UNRATED_QUALITY: i64 = -1;

/// Validation failure for night records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NightValidationError {
    #[error("end_time_milli ({end}) must be >= start_time_milli ({start})")]
    InvalidWindow { start: i64, end: i64 },
    #[error("sleep quality {0} is outside 0..=5")]
    QualityOutOfRange(i64),
}

/// Six-step quality scale picked by the user after a night is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SleepQuality {
    VeryBad,
    Poor,
    SoSo,
    Ok,
    PrettyGood,
    Excellent,
}

impl SleepQuality {
    pub const ALL: [SleepQuality; 6] = [
        Self::VeryBad,
        Self::Poor,
        Self::SoSo,
        Self::Ok,
        Self::PrettyGood,
        Self::Excellent,
    ];

    /// Numeric rating stored in `quality_rating`.
    pub fn rating(self) -> i64 {
        match self {
            Self::VeryBad => 0,
            Self::Poor => 1,
            Self::SoSo => 2,
            Self::Ok => 3,
            Self::PrettyGood => 4,
            Self::Excellent => 5,
        }
    }

    /// Parses a numeric rating, rejecting values outside `0..=5`.
    pub fn from_rating(value: i64) -> Result<Self, NightValidationError> {
        usize::try_from(value)
            .ok()
            .and_then(|index| Self::ALL.get(index).copied())
            .ok_or(NightValidationError::QualityOutOfRange(value))
    }

    /// Human readable label used by display text.
    pub fn label(self) -> &'static str {
        match self {
            Self::VeryBad => "Very bad",
            Self::Poor => "Poor",
            Self::SoSo => "So-so",
            Self::Ok => "OK",
            Self::PrettyGood => "Pretty good",
            Self::Excellent => "Excellent",
        }
    }
}

/// One tracked sleep interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SleepNightWire")]
pub struct SleepNight {
    pub night_id: NightId,
    /// Unix epoch milliseconds.
    pub start_time_milli: i64,
    /// Equals `start_time_milli` while the night is still being tracked.
    pub end_time_milli: i64,
    pub sleep_quality: Option<SleepQuality>,
}

impl SleepNight {
    /// Creates an unsaved, open night starting at `now_milli`.
    pub fn start_at(now_milli: i64) -> Self {
        Self {
            night_id: UNSAVED_NIGHT_ID,
            start_time_milli: now_milli,
            end_time_milli: now_milli,
            sleep_quality: None,
        }
    }

    /// Returns whether tracking for this night is still in progress.
    pub fn is_open(&self) -> bool {
        self.end_time_milli == self.start_time_milli
    }

    /// Closes the night at `now_milli`.
    ///
    /// The end is clamped to at least one millisecond after the start so a
    /// closed night can never be mistaken for an open one.
    pub fn close_at(&mut self, now_milli: i64) {
        self.end_time_milli = now_milli.max(self.start_time_milli.saturating_add(1));
    }

    /// Tracked duration in milliseconds (zero while open).
    ///
    /// Saturates at `i64::MAX` for windows wider than `i64` can express.
    pub fn duration_milli(&self) -> i64 {
        self.end_time_milli.saturating_sub(self.start_time_milli)
    }

    pub fn validate(&self) -> Result<(), NightValidationError> {
        if self.end_time_milli < self.start_time_milli {
            return Err(NightValidationError::InvalidWindow {
                start: self.start_time_milli,
                end: self.end_time_milli,
            });
        }
        Ok(())
    }
}

#[derive(Deserialize)]
struct SleepNightWire {
    night_id: NightId,
    start_time_milli: i64,
    end_time_milli: i64,
    sleep_quality: Option<SleepQuality>,
}

impl TryFrom<SleepNightWire> for SleepNight {
    type Error = NightValidationError;

    fn try_from(wire: SleepNightWire) -> Result<Self, Self::Error> {
        let night = SleepNight {
            night_id: wire.night_id,
            start_time_milli: wire.start_time_milli,
            end_time_milli: wire.end_time_milli,
            sleep_quality: wire.sleep_quality,
        };
        night.validate()?;
        Ok(night)
    }
}
