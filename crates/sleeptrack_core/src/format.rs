//! Display text rendering for the night list.

use crate::model::night::SleepNight;
use chrono::{Local, LocalResult, TimeZone};

/// Renders the full night list into the tracker's display text.
pub trait NightFormatter: Send + Sync {
    fn format_nights(&self, nights: &[SleepNight]) -> String;
}

/// Plain-text rendering, one block per night in the given order.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextNightFormatter;

impl NightFormatter for PlainTextNightFormatter {
    fn format_nights(&self, nights: &[SleepNight]) -> String {
        let mut blocks = Vec::with_capacity(nights.len());
        for night in nights {
            let end = if night.is_open() {
                "(tracking)".to_string()
            } else {
                format_timestamp(night.end_time_milli)
            };
            let quality = night
                .sleep_quality
                .map_or("--", |quality| quality.label());
            blocks.push(format!(
                "Start: {}\nEnd: {}\nQuality: {}\nHours:Minutes:Seconds: {}",
                format_timestamp(night.start_time_milli),
                end,
                quality,
                format_duration(night.duration_milli()),
            ));
        }
        blocks.join("\n\n")
    }
}

fn format_timestamp(epoch_milli: i64) -> String {
    match Local.timestamp_millis_opt(epoch_milli) {
        LocalResult::Single(at) | LocalResult::Ambiguous(at, _) => {
            at.format("%a %b %d %Y %H:%M").to_string()
        }
        LocalResult::None => epoch_milli.to_string(),
    }
}

fn format_duration(duration_milli: i64) -> String {
    let total_seconds = duration_milli.max(0) / 1_000;
    format!(
        "{}:{:02}:{:02}",
        total_seconds / 3_600,
        (total_seconds % 3_600) / 60,
        total_seconds % 60
    )
}
