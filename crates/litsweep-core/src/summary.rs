//! Per-backend run results and the batch summary built after all workers join.
//!
//! Pure bookkeeping, decoupled from I/O and CLI orchestration.

use crate::models::Backend;

/// How a backend run ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarvestOutcome {
    /// Every cell ran; the final report was written and the checkpoint removed.
    Completed { total_records: u64 },
    /// Cancelled; the checkpoint holds everything done so far.
    Stopped,
}

/// Statistics for the cells run during this session.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HarvestStats {
    pub cells: usize,
    pub records: u64,
    pub empty_cells: usize,
}

impl HarvestStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a completed cell with `added` records.
    pub fn record_cell(&mut self, added: u64) {
        self.cells += 1;
        self.records += added;
        if added == 0 {
            self.empty_cells += 1;
        }
    }
}

/// Result of running a single backend.
#[derive(Debug, Clone)]
pub struct BackendHarvestResult {
    pub backend: Backend,
    /// `None` when the run failed.
    pub outcome: Option<HarvestOutcome>,
    pub stats: HarvestStats,
    /// Cumulative request log, including entries restored from a checkpoint.
    pub request_log: String,
    /// Error message if the run failed, None otherwise.
    pub error: Option<String>,
}

impl BackendHarvestResult {
    pub fn success(
        backend: Backend,
        outcome: HarvestOutcome,
        stats: HarvestStats,
        request_log: String,
    ) -> Self {
        Self {
            backend,
            outcome: Some(outcome),
            stats,
            request_log,
            error: None,
        }
    }

    pub fn failure(
        backend: Backend,
        stats: HarvestStats,
        request_log: String,
        error: String,
    ) -> Self {
        Self {
            backend,
            outcome: None,
            stats,
            request_log,
            error: Some(error),
        }
    }

    /// Returns true if the run did not fail (it may still have been stopped).
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.outcome, Some(HarvestOutcome::Completed { .. }))
    }
}

/// Aggregated results from running several backends.
#[derive(Debug, Clone, Default)]
pub struct BatchHarvestSummary {
    pub results: Vec<BackendHarvestResult>,
}

impl BatchHarvestSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a result, keeping results in backend order.
    pub fn add(&mut self, result: BackendHarvestResult) {
        self.results.push(result);
        self.results.sort_by_key(|r| r.backend);
    }

    pub fn successful_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| !r.is_success()).count()
    }

    pub fn completed_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_complete()).count()
    }

    /// Records fetched this session across all backends.
    pub fn total_records(&self) -> u64 {
        self.results.iter().map(|r| r.stats.records).sum()
    }

    /// Every backend's request log, each followed by a blank line.
    pub fn combined_log(&self) -> String {
        let mut combined = String::new();
        for result in &self.results {
            combined.push_str(&result.request_log);
            combined.push('\n');
        }
        combined
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_record_cell() {
        let mut stats = HarvestStats::new();
        stats.record_cell(5);
        stats.record_cell(0);
        stats.record_cell(2);
        assert_eq!(stats.cells, 3);
        assert_eq!(stats.records, 7);
        assert_eq!(stats.empty_cells, 1);
    }

    #[test]
    fn test_result_success_and_failure() {
        let ok = BackendHarvestResult::success(
            Backend::Ieee,
            HarvestOutcome::Completed { total_records: 4 },
            HarvestStats::default(),
            String::new(),
        );
        assert!(ok.is_success());
        assert!(ok.is_complete());

        let stopped = BackendHarvestResult::success(
            Backend::Scopus,
            HarvestOutcome::Stopped,
            HarvestStats::default(),
            String::new(),
        );
        assert!(stopped.is_success());
        assert!(!stopped.is_complete());

        let failed = BackendHarvestResult::failure(
            Backend::PubMed,
            HarvestStats::default(),
            String::new(),
            "Connection timeout".to_string(),
        );
        assert!(!failed.is_success());
        assert_eq!(failed.error, Some("Connection timeout".to_string()));
    }

    #[test]
    fn test_summary_orders_by_backend_and_combines_logs() {
        let mut summary = BatchHarvestSummary::new();
        summary.add(BackendHarvestResult::failure(
            Backend::PubMed,
            HarvestStats::default(),
            "PubMed API request #1: p\n".into(),
            "boom".into(),
        ));
        let mut stats = HarvestStats::new();
        stats.record_cell(3);
        summary.add(BackendHarvestResult::success(
            Backend::Ieee,
            HarvestOutcome::Completed { total_records: 3 },
            stats,
            "IEEE API request #1: i\n".into(),
        ));

        assert_eq!(summary.results[0].backend, Backend::Ieee);
        assert_eq!(summary.successful_count(), 1);
        assert_eq!(summary.failed_count(), 1);
        assert_eq!(summary.completed_count(), 1);
        assert_eq!(summary.total_records(), 3);
        assert_eq!(
            summary.combined_log(),
            "IEEE API request #1: i\n\nPubMed API request #1: p\n\n"
        );
    }
}
