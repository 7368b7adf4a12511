//! Sleep night use-case service.
//!
//! # Responsibility
//! - Own the "tonight" rule: only an open latest night is tracked.
//! - Provide start/stop/rate/clear/list entry points over a repository.
//!
//! # Invariants
//! - Service APIs never bypass repository validation/persistence contracts.
//! - Service layer remains storage-agnostic and synchronous.

use crate::model::night::{NightId, SleepNight, SleepQuality};
use crate::repo::night_repo::{NightRepository, RepoError, RepoResult};
use log::{debug, info};

/// Use-case service wrapper for night persistence.
pub struct NightService<R: NightRepository> {
    repo: R,
}

impl<R: NightRepository> NightService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Returns the latest night only while it is still open.
    ///
    /// A closed latest night is reported as `None` rather than being
    /// exposed as the one in progress.
    pub fn tonight(&self) -> RepoResult<Option<SleepNight>> {
        let latest = self.repo.get_tonight()?;
        if let Some(night) = latest.as_ref().filter(|night| !night.is_open()) {
            debug!(
                "event=tonight_load module=service status=skip reason=closed night_id={}",
                night.night_id
            );
            return Ok(None);
        }
        Ok(latest)
    }

    /// Inserts a new open night starting at `now_milli`.
    pub fn start_night(&self, now_milli: i64) -> RepoResult<NightId> {
        let night_id = self.repo.insert_night(&SleepNight::start_at(now_milli))?;
        info!("event=night_start module=service status=ok night_id={night_id} start_ms={now_milli}");
        Ok(night_id)
    }

    /// Closes `night` at `now_milli`, persists it and returns the closed copy.
    pub fn stop_night(&self, mut night: SleepNight, now_milli: i64) -> RepoResult<SleepNight> {
        night.close_at(now_milli);
        self.repo.update_night(&night)?;
        info!(
            "event=night_stop module=service status=ok night_id={} duration_ms={}",
            night.night_id,
            night.duration_milli()
        );
        Ok(night)
    }

    /// Records the quality rating of an existing night.
    ///
    /// Returns `RepoError::NotFound` when the id is unknown.
    pub fn set_sleep_quality(
        &self,
        night_id: NightId,
        quality: SleepQuality,
    ) -> RepoResult<SleepNight> {
        let mut night = self
            .repo
            .get_night(night_id)?
            .ok_or(RepoError::NotFound(night_id))?;
        night.sleep_quality = Some(quality);
        self.repo.update_night(&night)?;
        info!(
            "event=night_rate module=service status=ok night_id={night_id} quality={}",
            quality.rating()
        );
        Ok(night)
    }

    pub fn get_night(&self, night_id: NightId) -> RepoResult<Option<SleepNight>> {
        self.repo.get_night(night_id)
    }

    /// Lists every night, newest first.
    pub fn list_nights(&self) -> RepoResult<Vec<SleepNight>> {
        self.repo.list_nights()
    }

    /// Deletes every night and returns how many were removed.
    pub fn clear_all(&self) -> RepoResult<usize> {
        let removed = self.repo.clear_nights()?;
        info!("event=nights_clear module=service status=ok removed={removed}");
        Ok(removed)
    }
}
