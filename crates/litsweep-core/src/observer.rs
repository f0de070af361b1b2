//! Callbacks through which a running harvest reports to its caller.
//!
//! Workers for different backends run concurrently and share one observer,
//! so implementations must be `Send + Sync` and do their own locking.

use std::time::Duration;

use crate::models::Backend;

pub trait HarvestObserver: Send + Sync {
    /// Fired once per page with the backend's cumulative request counter.
    fn progress(&self, backend: Backend, requests: u64) {
        let _ = (backend, requests);
    }

    /// User-facing log line.
    fn log(&self, backend: Backend, message: &str) {
        let _ = (backend, message);
    }

    /// Fired once per distinct primary term or keyword a backend queries.
    fn term_observed(&self, term: &str) {
        let _ = term;
    }

    /// Fired when the daily budget is used up, before the cooldown starts.
    fn budget_paused(&self, backend: Backend, budget: u64, cooldown: Duration) {
        let _ = (backend, budget, cooldown);
    }
}

/// Observer that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl HarvestObserver for NoopObserver {}
