//! Session state coordinator between the night store and a presentation layer.
//!
//! # Responsibility
//! - Keep the in-memory "tonight" reference in sync with the store.
//! - Expose derived availability flags and display text as [`Signal`]s.
//! - Run user actions (start/stop/clear) off the caller, either awaited
//!   directly or fire-and-forget inside the tracker's task group.
//!
//! # Invariants
//! - At most one night is open; starting while one is open is ignored.
//! - Transitions are serialized per tracker, and a transition that was
//!   queued behind another one is refused if shutdown happened meanwhile.
//! - A refresh publishes `nights` before `tonight`, so observers woken by
//!   `start_available`/`stop_available` already see the refreshed list.
//! - Navigation target and cleared notice are one-shot: they stay set until
//!   acknowledged with `done_navigating` / `done_showing_cleared_notice`.
//! - Shutdown (explicit or on drop) cancels the task group exactly once.

mod tasks;

use crate::clock::{Clock, SystemClock};
use crate::format::{NightFormatter, PlainTextNightFormatter};
use crate::model::night::SleepNight;
use crate::repo::night_repo::{NightRepository, RepoError, RepoResult};
use crate::service::night_service::NightService;
use crate::signal::Signal;
use log::{debug, error, info};
use std::future::Future;
use std::sync::Arc;
use tasks::TaskScope;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::{Mutex, MutexGuard};

pub type TrackerResult<T> = Result<T, TrackerError>;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("sleep tracker has been shut down")]
    ShutDown,
    #[error("sleep tracker must be opened inside a tokio runtime")]
    NoRuntime,
}

/// Presentation-facing state holder for sleep tracking.
pub struct SleepTracker<R>
where
    R: NightRepository + Send + Sync + 'static,
{
    inner: Arc<TrackerInner<R>>,
}

struct TrackerInner<R>
where
    R: NightRepository + Send + Sync + 'static,
{
    service: Arc<NightService<R>>,
    clock: Arc<dyn Clock>,
    transitions: Mutex<()>,
    tasks: TaskScope,
    tonight: Signal<Option<SleepNight>>,
    nights: Signal<Vec<SleepNight>>,
    start_available: Signal<bool>,
    stop_available: Signal<bool>,
    clear_available: Signal<bool>,
    nights_text: Signal<String>,
    navigate_to_sleep_quality: Signal<Option<SleepNight>>,
    show_cleared_notice: Signal<bool>,
}

impl<R> SleepTracker<R>
where
    R: NightRepository + Send + Sync + 'static,
{
    /// Opens a tracker on the system clock with plain-text display text.
    pub async fn open(repo: R) -> TrackerResult<Self> {
        Self::open_with(repo, Arc::new(SystemClock), Arc::new(PlainTextNightFormatter)).await
    }

    /// Opens a tracker and loads tonight's night before returning.
    ///
    /// Fire-and-forget actions are spawned onto the runtime this is awaited
    /// on; outside a tokio runtime it fails with `TrackerError::NoRuntime`.
    pub async fn open_with(
        repo: R,
        clock: Arc<dyn Clock>,
        formatter: Arc<dyn NightFormatter>,
    ) -> TrackerResult<Self> {
        let handle = Handle::try_current().map_err(|_| TrackerError::NoRuntime)?;
        let tonight = Signal::new(None::<SleepNight>);
        let nights = Signal::new(Vec::<SleepNight>::new());
        let start_available = tonight.map(Option::is_none);
        let stop_available = tonight.map(Option::is_some);
        let clear_available = nights.map(|nights| !nights.is_empty());
        let nights_text = nights.map(move |nights| formatter.format_nights(nights));

        let tracker = Self {
            inner: Arc::new(TrackerInner {
                service: Arc::new(NightService::new(repo)),
                clock,
                transitions: Mutex::new(()),
                tasks: TaskScope::new(handle),
                tonight,
                nights,
                start_available,
                stop_available,
                clear_available,
                nights_text,
                navigate_to_sleep_quality: Signal::new(None),
                show_cleared_notice: Signal::new(false),
            }),
        };

        tracker.inner.refresh().await?;
        info!(
            "event=tracker_open module=tracker status=ok open_night={:?} nights={}",
            tracker.inner.tonight.get().map(|night| night.night_id),
            tracker.inner.nights.get().len()
        );
        Ok(tracker)
    }

    /// Reloads tonight and the night list from the store.
    pub async fn refresh(&self) -> TrackerResult<()> {
        let _transition = self.inner.begin_transition().await?;
        self.inner.refresh().await
    }

    /// Starts tracking a new night unless one is already open.
    pub async fn start_tracking(&self) -> TrackerResult<()> {
        self.inner.start_tracking().await
    }

    /// Closes the open night and publishes it as navigation target.
    ///
    /// Without an open night this is a silent no-op.
    pub async fn stop_tracking(&self) -> TrackerResult<()> {
        self.inner.stop_tracking().await
    }

    /// Deletes every night and raises the cleared notice.
    pub async fn clear(&self) -> TrackerResult<()> {
        self.inner.clear().await
    }

    /// Fire-and-forget variant of [`Self::start_tracking`].
    ///
    /// Returns `false` when the tracker is shut down and nothing was scheduled.
    pub fn on_start_tracking(&self) -> bool {
        self.launch("tracking_start", |inner| async move { inner.start_tracking().await })
    }

    /// Fire-and-forget variant of [`Self::stop_tracking`].
    pub fn on_stop_tracking(&self) -> bool {
        self.launch("tracking_stop", |inner| async move { inner.stop_tracking().await })
    }

    /// Fire-and-forget variant of [`Self::clear`].
    pub fn on_clear(&self) -> bool {
        self.launch("nights_clear", |inner| async move { inner.clear().await })
    }

    /// Acknowledges the navigation target so it is not delivered again.
    pub fn done_navigating(&self) {
        self.inner.navigate_to_sleep_quality.set(None);
    }

    /// Acknowledges the cleared notice so it is not delivered again.
    pub fn done_showing_cleared_notice(&self) {
        self.inner.show_cleared_notice.set(false);
    }

    /// Waits for every fire-and-forget action scheduled so far.
    pub async fn settle(&self) {
        self.inner.tasks.settle().await;
    }

    /// Cancels outstanding actions and refuses new ones.
    ///
    /// Returns `true` for the call that actually shut the tracker down.
    pub fn shutdown(&self) -> bool {
        self.inner.tasks.cancel()
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.tasks.is_cancelled()
    }

    /// The currently open night, if any.
    pub fn tonight(&self) -> &Signal<Option<SleepNight>> {
        &self.inner.tonight
    }

    /// All nights, newest first.
    pub fn nights(&self) -> &Signal<Vec<SleepNight>> {
        &self.inner.nights
    }

    pub fn start_available(&self) -> &Signal<bool> {
        &self.inner.start_available
    }

    pub fn stop_available(&self) -> &Signal<bool> {
        &self.inner.stop_available
    }

    pub fn clear_available(&self) -> &Signal<bool> {
        &self.inner.clear_available
    }

    pub fn nights_text(&self) -> &Signal<String> {
        &self.inner.nights_text
    }

    /// One-shot: the night just closed by a stop action.
    pub fn navigate_to_sleep_quality(&self) -> &Signal<Option<SleepNight>> {
        &self.inner.navigate_to_sleep_quality
    }

    /// One-shot: raised after the store was cleared.
    pub fn show_cleared_notice(&self) -> &Signal<bool> {
        &self.inner.show_cleared_notice
    }

    fn launch<F, Fut>(&self, action: &'static str, run: F) -> bool
    where
        F: FnOnce(Arc<TrackerInner<R>>) -> Fut,
        Fut: Future<Output = TrackerResult<()>> + Send + 'static,
    {
        let task = run(Arc::clone(&self.inner));
        self.inner.tasks.spawn(action, async move {
            if let Err(err) = task.await {
                error!("event={action} module=tracker status=error error={err}");
            }
        })
    }
}

impl<R> Drop for SleepTracker<R>
where
    R: NightRepository + Send + Sync + 'static,
{
    fn drop(&mut self) {
        self.inner.tasks.cancel();
    }
}

impl<R> TrackerInner<R>
where
    R: NightRepository + Send + Sync + 'static,
{
    fn ensure_running(&self) -> TrackerResult<()> {
        if self.tasks.is_cancelled() {
            return Err(TrackerError::ShutDown);
        }
        Ok(())
    }

    /// Locks `transitions`, re-checking shutdown once the lock is held.
    async fn begin_transition(&self) -> TrackerResult<MutexGuard<'_, ()>> {
        self.ensure_running()?;
        let guard = self.transitions.lock().await;
        self.ensure_running()?;
        Ok(guard)
    }

    async fn start_tracking(&self) -> TrackerResult<()> {
        let _transition = self.begin_transition().await?;

        if let Some(open) = self.tonight.get() {
            info!(
                "event=tracking_start module=tracker status=skip reason=already_open night_id={}",
                open.night_id
            );
            return Ok(());
        }

        let now = self.clock.now_milli();
        self.with_service(move |service| service.start_night(now)).await?;
        self.refresh().await
    }

    async fn stop_tracking(&self) -> TrackerResult<()> {
        let _transition = self.begin_transition().await?;

        let Some(open) = self.tonight.get() else {
            debug!("event=tracking_stop module=tracker status=skip reason=no_open_night");
            return Ok(());
        };

        let now = self.clock.now_milli();
        let closed = self
            .with_service(move |service| service.stop_night(open, now))
            .await?;
        self.refresh().await?;
        self.navigate_to_sleep_quality.set(Some(closed));
        Ok(())
    }

    async fn clear(&self) -> TrackerResult<()> {
        let _transition = self.begin_transition().await?;

        self.with_service(|service| service.clear_all()).await?;
        self.refresh().await?;
        self.show_cleared_notice.set(true);
        Ok(())
    }

    /// Callers hold `transitions` (or have exclusive access during open).
    async fn refresh(&self) -> TrackerResult<()> {
        let (tonight, nights) = self
            .with_service(|service| Ok((service.tonight()?, service.list_nights()?)))
            .await?;
        self.nights.set(nights);
        self.tonight.set(tonight);
        Ok(())
    }

    async fn with_service<T, F>(&self, op: F) -> TrackerResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&NightService<R>) -> RepoResult<T> + Send + 'static,
    {
        let service = Arc::clone(&self.service);
        let value = tokio::task::spawn_blocking(move || op(&service)).await??;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::{SleepTracker, TrackerError};
    use crate::db::open_db_in_memory;
    use crate::repo::night_repo::{NightRepository, SharedNightRepository};
    use std::sync::Arc;

    #[tokio::test]
    async fn action_queued_behind_a_transition_is_refused_after_shutdown() {
        let repo = Arc::new(SharedNightRepository::new(open_db_in_memory().unwrap()));
        let tracker = SleepTracker::open(Arc::clone(&repo)).await.unwrap();

        let held = tracker.inner.transitions.lock().await;
        let inner = Arc::clone(&tracker.inner);
        let queued = tokio::spawn(async move { inner.start_tracking().await });
        tokio::task::yield_now().await;

        assert!(tracker.shutdown());
        drop(held);

        let result = queued.await.unwrap();
        assert!(matches!(result, Err(TrackerError::ShutDown)));
        assert!(repo.list_nights().unwrap().is_empty());
    }
}
