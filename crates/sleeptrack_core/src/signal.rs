//! Observable values for presentation-layer consumers.
//!
//! # Responsibility
//! - Hold the latest value of a piece of tracker state.
//! - Push changes to async subscribers (`watch::Receiver`) and to derived
//!   signals created with [`Signal::map`].
//!
//! # Invariants
//! - Subscribers and derived signals are notified only when the value
//!   actually changes (`PartialEq`).
//! - Derived signals are recomputed synchronously inside `set`, so they are
//!   consistent with their source as soon as `set` returns.
//! - Writes to one signal are serialized; observers must not call `map` on
//!   the signal that is notifying them.

use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;

type Observer<T> = Box<dyn Fn(&T) + Send + Sync>;

struct SignalInner<T> {
    tx: watch::Sender<T>,
    observers: Mutex<Vec<Observer<T>>>,
}

/// Shared observable value.
///
/// Cloning yields another handle to the same value. Only the crate writes;
/// callers read with [`Signal::get`] or [`Signal::subscribe`].
pub struct Signal<T> {
    inner: Arc<SignalInner<T>>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Signal<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    pub fn new(initial: T) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self {
            inner: Arc::new(SignalInner {
                tx,
                observers: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Returns a snapshot of the current value.
    pub fn get(&self) -> T {
        self.inner.tx.borrow().clone()
    }

    /// Subscribes to future changes; the current value counts as seen.
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.inner.tx.subscribe()
    }

    /// Creates a signal whose value is `f(source)`, kept up to date on
    /// every change of `self`.
    pub fn map<U, F>(&self, f: F) -> Signal<U>
    where
        U: Clone + PartialEq + Send + Sync + 'static,
        F: Fn(&T) -> U + Send + Sync + 'static,
    {
        let mut observers = self.lock_observers();
        let derived = Signal::new(f(&*self.inner.tx.borrow()));
        let target = derived.clone();
        observers.push(Box::new(move |value: &T| {
            target.set(f(value));
        }));
        derived
    }

    /// Replaces the value, returning whether it changed.
    pub(crate) fn set(&self, value: T) -> bool {
        let observers = self.lock_observers();
        let changed = self.inner.tx.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value.clone();
                true
            }
        });
        if changed {
            for observer in observers.iter() {
                observer(&value);
            }
        }
        changed
    }

    fn lock_observers(&self) -> std::sync::MutexGuard<'_, Vec<Observer<T>>> {
        self.inner
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> std::fmt::Debug for Signal<T>
where
    T: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Signal").field(&*self.inner.tx.borrow()).finish()
    }
}
