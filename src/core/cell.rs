//! Single-writer, multi-reader state cell
//!
//! Workers publish complete values into a [`StateCell`]; readers take
//! snapshots. A condvar lets observers block until the value satisfies a
//! predicate, which is how the presentation side (and the tests) follow
//! state transitions without polling.

use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// Shared state cell holding the latest complete value of `T`.
///
/// Writers replace the whole value; readers clone a snapshot. A reader can
/// never observe a partially-updated value.
pub struct StateCell<T> {
    value: Mutex<T>,
    changed: Condvar,
}

impl<T: Clone> StateCell<T> {
    pub fn new(initial: T) -> Self {
        Self {
            value: Mutex::new(initial),
            changed: Condvar::new(),
        }
    }

    /// Snapshot of the current value
    pub fn get(&self) -> T {
        self.value.lock().clone()
    }

    /// Replace the value and wake any waiting observers
    pub fn set(&self, value: T) {
        *self.value.lock() = value;
        self.changed.notify_all();
    }

    /// Block until the value satisfies `predicate` or `timeout` elapses.
    ///
    /// Returns whether the predicate held when the wait ended.
    pub fn wait_for<F>(&self, timeout: Duration, mut predicate: F) -> bool
    where
        F: FnMut(&T) -> bool,
    {
        let deadline = Instant::now() + timeout;
        let mut guard = self.value.lock();
        while !predicate(&guard) {
            if self.changed.wait_until(&mut guard, deadline).timed_out() {
                return predicate(&guard);
            }
        }
        true
    }
}
