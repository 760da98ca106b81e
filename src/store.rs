//! Published dashboard state
//!
//! The link-reader worker is the only writer; the presentation collaborator
//! reads snapshots or blocks on a predicate.

use crate::core::cell::StateCell;
use crate::core::dashboard::DashboardState;
use std::time::Duration;

/// Holds the latest complete dashboard state for downstream observers.
pub struct DashboardStateStore {
    state: StateCell<DashboardState>,
}

impl DashboardStateStore {
    /// New store in the `Loading` state
    pub fn new() -> Self {
        Self {
            state: StateCell::new(DashboardState::Loading),
        }
    }

    /// Snapshot of the latest published state
    pub fn get(&self) -> DashboardState {
        self.state.get()
    }

    /// Publish a new state. Single-writer: only the owning connection
    /// pipeline calls this.
    pub fn publish(&self, state: DashboardState) {
        self.state.set(state);
    }

    /// Block until the published state satisfies `predicate` or the timeout
    /// elapses; returns whether it did.
    pub fn wait_for<F>(&self, timeout: Duration, predicate: F) -> bool
    where
        F: FnMut(&DashboardState) -> bool,
    {
        self.state.wait_for(timeout, predicate)
    }
}

impl Default for DashboardStateStore {
    fn default() -> Self {
        Self::new()
    }
}
