//! Cancellation-scoped task group owned by a tracker.
//!
//! # Invariants
//! - Every spawned task races the scope's cancellation token.
//! - The scope is cancelled at most once; later spawns are refused.

use log::{debug, info};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

pub(crate) struct TaskScope {
    handle: Handle,
    tasks: TaskTracker,
    token: CancellationToken,
    cancelled: AtomicBool,
}

impl TaskScope {
    /// Binds the scope to the runtime of the calling task.
    pub(crate) fn new(handle: Handle) -> Self {
        Self {
            handle,
            tasks: TaskTracker::new(),
            token: CancellationToken::new(),
            cancelled: AtomicBool::new(false),
        }
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Spawns `task` into the group; returns `false` once the scope is cancelled.
    pub(crate) fn spawn<F>(&self, name: &'static str, task: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.is_cancelled() {
            debug!("event={name} module=tracker status=skip reason=shut_down");
            return false;
        }

        let token = self.token.clone();
        self.tasks.spawn_on(
            async move {
                tokio::select! {
                    _ = token.cancelled() => {
                        debug!("event={name} module=tracker status=cancelled");
                    }
                    () = task => {}
                }
            },
            &self.handle,
        );
        true
    }

    /// Waits until every task spawned so far has finished.
    pub(crate) async fn settle(&self) {
        self.tasks.close();
        self.tasks.wait().await;
        if !self.is_cancelled() {
            self.tasks.reopen();
        }
    }

    /// Cancels all outstanding tasks; returns `true` only for the first call.
    pub(crate) fn cancel(&self) -> bool {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.token.cancel();
        self.tasks.close();
        info!(
            "event=task_scope_cancel module=tracker status=ok in_flight={}",
            self.tasks.len()
        );
        true
    }
}
