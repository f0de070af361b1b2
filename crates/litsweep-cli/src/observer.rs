use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use litsweep_core::{Backend, HarvestObserver};
use tracing::{debug, info, warn};

/// Observer that forwards harvest events to `tracing` and collects every
/// searched term for `searched_terms.txt`.
#[derive(Debug, Default)]
pub struct TracingObserver {
    terms: Mutex<TermLog>,
}

#[derive(Debug, Default)]
struct TermLog {
    seen: HashSet<String>,
    ordered: Vec<String>,
}

impl TracingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every term reported by any backend, once, in first-seen order.
    pub fn searched_terms(&self) -> Vec<String> {
        match self.terms.lock() {
            Ok(log) => log.ordered.clone(),
            Err(poisoned) => poisoned.into_inner().ordered.clone(),
        }
    }
}

impl HarvestObserver for TracingObserver {
    fn progress(&self, backend: Backend, requests: u64) {
        debug!(backend = backend.slug(), requests, "Request completed");
    }

    fn log(&self, backend: Backend, message: &str) {
        info!(backend = backend.slug(), "{}", message);
    }

    fn term_observed(&self, term: &str) {
        let mut log = match self.terms.lock() {
            Ok(log) => log,
            Err(poisoned) => poisoned.into_inner(),
        };
        if log.seen.insert(term.to_string()) {
            log.ordered.push(term.to_string());
        }
    }

    fn budget_paused(&self, backend: Backend, budget: u64, cooldown: Duration) {
        warn!(
            backend = backend.slug(),
            budget,
            cooldown_secs = cooldown.as_secs(),
            "Daily request budget used up"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terms_deduplicated_across_backends() {
        let observer = TracingObserver::new();
        observer.term_observed("anchoring bias");
        observer.term_observed("machine learning");
        observer.term_observed("anchoring bias");
        observer.term_observed("hiring");

        assert_eq!(
            observer.searched_terms(),
            vec!["anchoring bias", "machine learning", "hiring"]
        );
    }
}
