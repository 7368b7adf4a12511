use sleeptrack_core::db::{open_db, open_db_in_memory};
use sleeptrack_core::{
    ManualClock, NightId, NightRepository, PlainTextNightFormatter, RepoError, RepoResult,
    SharedNightRepository, SleepNight, SleepTracker, TrackerError,
};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const START_MS: i64 = 1_700_000_000_000;
const HOUR_MS: i64 = 3_600_000;

struct Fixture {
    repo: Arc<SharedNightRepository>,
    clock: Arc<ManualClock>,
    tracker: SleepTracker<Arc<SharedNightRepository>>,
}

async fn fixture() -> Fixture {
    let repo = Arc::new(SharedNightRepository::new(open_db_in_memory().unwrap()));
    fixture_with(repo).await
}

async fn fixture_with(repo: Arc<SharedNightRepository>) -> Fixture {
    let clock = Arc::new(ManualClock::new(START_MS));
    let tracker = SleepTracker::open_with(
        Arc::clone(&repo),
        clock.clone(),
        Arc::new(PlainTextNightFormatter),
    )
    .await
    .unwrap();
    Fixture {
        repo,
        clock,
        tracker,
    }
}

fn seed_closed_night(repo: &SharedNightRepository, start: i64) {
    let mut night = SleepNight::start_at(start);
    night.close_at(start + 8 * HOUR_MS);
    repo.insert_night(&night).unwrap();
}

fn shared_repo_at(path: &Path) -> Arc<SharedNightRepository> {
    Arc::new(SharedNightRepository::new(open_db(path).unwrap()))
}

/// Store whose writes fail with `SQLITE_FULL` while `failing` is set.
struct FlakyRepo {
    store: SharedNightRepository,
    failing: AtomicBool,
}

impl FlakyRepo {
    fn new() -> Self {
        Self {
            store: SharedNightRepository::new(open_db_in_memory().unwrap()),
            failing: AtomicBool::new(false),
        }
    }

    fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check_write(&self) -> RepoResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RepoError::from(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_FULL),
                Some("database or disk is full".to_string()),
            )));
        }
        Ok(())
    }
}

impl NightRepository for FlakyRepo {
    fn insert_night(&self, night: &SleepNight) -> RepoResult<NightId> {
        self.check_write()?;
        self.store.insert_night(night)
    }

    fn update_night(&self, night: &SleepNight) -> RepoResult<()> {
        self.check_write()?;
        self.store.update_night(night)
    }

    fn get_night(&self, id: NightId) -> RepoResult<Option<SleepNight>> {
        self.store.get_night(id)
    }

    fn get_tonight(&self) -> RepoResult<Option<SleepNight>> {
        self.store.get_tonight()
    }

    fn list_nights(&self) -> RepoResult<Vec<SleepNight>> {
        self.store.list_nights()
    }

    fn clear_nights(&self) -> RepoResult<usize> {
        self.check_write()?;
        self.store.clear_nights()
    }
}

async fn flaky_tracker(repo: &Arc<FlakyRepo>) -> SleepTracker<Arc<FlakyRepo>> {
    SleepTracker::open_with(
        Arc::clone(repo),
        Arc::new(ManualClock::new(START_MS)),
        Arc::new(PlainTextNightFormatter),
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn empty_store_starts_with_only_start_available() {
    let fx = fixture().await;

    assert!(fx.tracker.tonight().get().is_none());
    assert!(fx.tracker.start_available().get());
    assert!(!fx.tracker.stop_available().get());
    assert!(!fx.tracker.clear_available().get());
    assert_eq!(fx.tracker.nights_text().get(), "");
    assert!(fx.tracker.navigate_to_sleep_quality().get().is_none());
    assert!(!fx.tracker.show_cleared_notice().get());
}

#[tokio::test]
async fn start_stop_acknowledge_scenario() {
    let fx = fixture().await;

    fx.tracker.start_tracking().await.unwrap();
    let nights = fx.repo.list_nights().unwrap();
    assert_eq!(nights.len(), 1);
    assert!(nights[0].is_open());
    assert_eq!(nights[0].start_time_milli, START_MS);
    assert!(!fx.tracker.start_available().get());
    assert!(fx.tracker.stop_available().get());
    assert!(fx.tracker.clear_available().get());
    assert_eq!(fx.tracker.tonight().get(), Some(nights[0].clone()));

    fx.clock.advance(7 * HOUR_MS);
    fx.tracker.stop_tracking().await.unwrap();

    let stored = fx.repo.get_night(nights[0].night_id).unwrap().unwrap();
    assert!(stored.end_time_milli > stored.start_time_milli);
    assert_eq!(stored.end_time_milli, START_MS + 7 * HOUR_MS);
    assert_eq!(fx.tracker.navigate_to_sleep_quality().get(), Some(stored));
    assert!(fx.tracker.start_available().get());
    assert!(!fx.tracker.stop_available().get());
    assert!(fx.tracker.nights_text().get().contains("7:00:00"));

    fx.tracker.done_navigating();
    assert!(fx.tracker.navigate_to_sleep_quality().get().is_none());
    assert!(fx.tracker.navigate_to_sleep_quality().get().is_none());
}

#[tokio::test]
async fn stop_without_open_night_changes_nothing() {
    let fx = fixture().await;
    seed_closed_night(&fx.repo, START_MS - 24 * HOUR_MS);
    fx.tracker.refresh().await.unwrap();

    let before = fx.repo.list_nights().unwrap();
    let text_before = fx.tracker.nights_text().get();
    let mut nav_rx = fx.tracker.navigate_to_sleep_quality().subscribe();

    fx.tracker.stop_tracking().await.unwrap();

    assert_eq!(fx.repo.list_nights().unwrap(), before);
    assert!(fx.tracker.start_available().get());
    assert!(!fx.tracker.stop_available().get());
    assert!(fx.tracker.clear_available().get());
    assert_eq!(fx.tracker.nights_text().get(), text_before);
    assert!(!nav_rx.has_changed().unwrap());
}

#[tokio::test]
async fn start_while_open_is_ignored() {
    let fx = fixture().await;

    fx.tracker.start_tracking().await.unwrap();
    fx.clock.advance(HOUR_MS);
    fx.tracker.start_tracking().await.unwrap();

    let nights = fx.repo.list_nights().unwrap();
    assert_eq!(nights.len(), 1);
    assert_eq!(nights[0].start_time_milli, START_MS);
}

#[tokio::test]
async fn clear_scenario_raises_one_shot_notice() {
    let fx = fixture().await;
    seed_closed_night(&fx.repo, START_MS - 24 * HOUR_MS);
    fx.tracker.refresh().await.unwrap();
    fx.tracker.start_tracking().await.unwrap();
    assert_eq!(fx.repo.list_nights().unwrap().len(), 2);

    let mut notice_rx = fx.tracker.show_cleared_notice().subscribe();
    fx.tracker.clear().await.unwrap();

    assert!(fx.repo.list_nights().unwrap().is_empty());
    assert!(fx.tracker.show_cleared_notice().get());
    assert!(notice_rx.has_changed().unwrap());
    assert!(fx.tracker.tonight().get().is_none());
    assert!(fx.tracker.start_available().get());
    assert!(!fx.tracker.stop_available().get());
    assert!(!fx.tracker.clear_available().get());

    fx.tracker.done_showing_cleared_notice();
    assert!(!fx.tracker.show_cleared_notice().get());
}

#[tokio::test]
async fn reopening_restores_an_open_night_but_not_a_closed_one() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nights.db");

    {
        let fx = fixture_with(shared_repo_at(&path)).await;
        fx.tracker.start_tracking().await.unwrap();
    }

    let reopened = fixture_with(shared_repo_at(&path)).await;
    assert!(reopened.tracker.stop_available().get());
    let open = reopened.tracker.tonight().get().unwrap();
    assert!(open.is_open());

    reopened.clock.advance(HOUR_MS);
    reopened.tracker.stop_tracking().await.unwrap();
    drop(reopened);

    let closed = fixture_with(shared_repo_at(&path)).await;
    assert!(closed.tracker.tonight().get().is_none());
    assert!(closed.tracker.start_available().get());
    assert!(closed.tracker.clear_available().get());
}

#[tokio::test]
async fn fire_and_forget_actions_are_serialized() {
    let fx = fixture().await;

    assert!(fx.tracker.on_start_tracking());
    assert!(fx.tracker.on_start_tracking());
    fx.tracker.settle().await;
    assert_eq!(fx.repo.list_nights().unwrap().len(), 1);

    fx.clock.advance(HOUR_MS);
    assert!(fx.tracker.on_stop_tracking());
    fx.tracker.settle().await;
    assert!(fx.tracker.navigate_to_sleep_quality().get().is_some());

    assert!(fx.tracker.on_clear());
    fx.tracker.settle().await;
    assert!(fx.repo.list_nights().unwrap().is_empty());
    assert!(fx.tracker.show_cleared_notice().get());
}

#[tokio::test]
async fn subscribers_observe_availability_changes() {
    let fx = fixture().await;
    let mut stop_rx = fx.tracker.stop_available().subscribe();

    fx.tracker.start_tracking().await.unwrap();
    stop_rx.changed().await.unwrap();
    assert!(*stop_rx.borrow_and_update());

    fx.clock.advance(HOUR_MS);
    fx.tracker.stop_tracking().await.unwrap();
    stop_rx.changed().await.unwrap();
    assert!(!*stop_rx.borrow_and_update());
}

#[tokio::test]
async fn shutdown_happens_once_and_rejects_later_actions() {
    let fx = fixture().await;

    assert!(fx.tracker.shutdown());
    assert!(!fx.tracker.shutdown());
    assert!(fx.tracker.is_shut_down());

    assert!(!fx.tracker.on_start_tracking());
    assert!(matches!(
        fx.tracker.start_tracking().await,
        Err(TrackerError::ShutDown)
    ));
    fx.tracker.settle().await;
    assert!(fx.repo.list_nights().unwrap().is_empty());
}

#[tokio::test]
async fn failed_store_write_is_returned_to_awaiting_caller() {
    let repo = Arc::new(FlakyRepo::new());
    let tracker = flaky_tracker(&repo).await;

    repo.set_failing(true);
    assert!(matches!(
        tracker.start_tracking().await,
        Err(TrackerError::Repo(RepoError::Db(_)))
    ));
    assert!(tracker.start_available().get());
    assert!(!tracker.stop_available().get());
    assert!(repo.list_nights().unwrap().is_empty());

    repo.set_failing(false);
    tracker.start_tracking().await.unwrap();
    repo.set_failing(true);

    assert!(matches!(
        tracker.stop_tracking().await,
        Err(TrackerError::Repo(_))
    ));
    assert!(tracker.stop_available().get());
    assert!(tracker.navigate_to_sleep_quality().get().is_none());

    assert!(matches!(tracker.clear().await, Err(TrackerError::Repo(_))));
    assert!(!tracker.show_cleared_notice().get());
    assert_eq!(repo.list_nights().unwrap().len(), 1);
}

#[tokio::test]
async fn failed_fire_and_forget_action_is_dropped_and_tracker_stays_usable() {
    let repo = Arc::new(FlakyRepo::new());
    let tracker = flaky_tracker(&repo).await;
    let mut start_rx = tracker.start_available().subscribe();
    let mut nav_rx = tracker.navigate_to_sleep_quality().subscribe();

    repo.set_failing(true);
    assert!(tracker.on_start_tracking());
    tracker.settle().await;

    assert!(tracker.start_available().get());
    assert!(!tracker.stop_available().get());
    assert!(tracker.navigate_to_sleep_quality().get().is_none());
    assert!(!start_rx.has_changed().unwrap());
    assert!(!nav_rx.has_changed().unwrap());
    assert!(!tracker.is_shut_down());

    repo.set_failing(false);
    assert!(tracker.on_start_tracking());
    tracker.settle().await;
    assert!(tracker.stop_available().get());
    assert_eq!(repo.list_nights().unwrap().len(), 1);
}

#[tokio::test]
async fn availability_observers_see_the_refreshed_night_list() {
    let fx = fixture().await;
    let nights = fx.tracker.nights().clone();
    let seen = fx
        .tracker
        .stop_available()
        .map(move |stop| (*stop, nights.get().len()));

    fx.tracker.start_tracking().await.unwrap();
    assert_eq!(seen.get(), (true, 1));

    fx.clock.advance(HOUR_MS);
    fx.tracker.stop_tracking().await.unwrap();
    assert_eq!(seen.get(), (false, 1));
}

#[tokio::test]
async fn tracker_opens_over_a_night_with_an_extreme_window() {
    let repo = Arc::new(SharedNightRepository::new(open_db_in_memory().unwrap()));
    repo.insert_night(&SleepNight {
        night_id: 0,
        start_time_milli: -1,
        end_time_milli: i64::MAX,
        sleep_quality: None,
    })
    .unwrap();

    let fx = fixture_with(repo).await;
    assert!(fx.tracker.start_available().get());
    assert!(fx.tracker.clear_available().get());
    assert!(fx.tracker.nights_text().get().contains("Hours:Minutes:Seconds:"));
}
