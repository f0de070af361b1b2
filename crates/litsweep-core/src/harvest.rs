//! Search orchestration: the resumable (primary term → bias name → keyword) loop.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::checkpoint::{write_report, CheckpointStore};
use crate::connector::Connector;
use crate::error::AppError;
use crate::observer::HarvestObserver;
use crate::pager::Pager;
use crate::state::{ResumeCursor, SearchState};
use crate::summary::{BackendHarvestResult, HarvestOutcome, HarvestStats};
use crate::terms::{expand, TermGrid};

/// Runs every cell of a search against one backend, checkpointing after each.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use litsweep_core::{Harvester, NoopObserver};
/// use litsweep_core::connector::Connector;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example<C: Connector>(connector: C) {
/// let harvester = Harvester::new(
///     connector,
///     std::path::Path::new("runs"),
///     Arc::new(NoopObserver),
///     CancellationToken::new(),
/// );
/// let primary = vec!["anchoring bias or framing effect".to_string()];
/// let keywords = vec!["machine learning".to_string()];
/// let result = harvester.run(&primary, &keywords).await;
/// println!("{} records this session", result.stats.records);
/// # }
/// ```
pub struct Harvester<C: Connector> {
    connector: C,
    store: CheckpointStore,
    report_path: PathBuf,
    observer: Arc<dyn HarvestObserver>,
    cancel: CancellationToken,
}

impl<C: Connector> Harvester<C> {
    /// Harvester writing its checkpoint and report into `output_dir` under the
    /// backend's standard file names.
    pub fn new(
        connector: C,
        output_dir: &Path,
        observer: Arc<dyn HarvestObserver>,
        cancel: CancellationToken,
    ) -> Self {
        let backend = connector.backend();
        Self {
            store: CheckpointStore::for_backend(output_dir, backend),
            report_path: output_dir.join(backend.results_file_name()),
            connector,
            observer,
            cancel,
        }
    }

    pub fn store(&self) -> &CheckpointStore {
        &self.store
    }

    pub fn report_path(&self) -> &Path {
        &self.report_path
    }

    /// Runs (or resumes) the search and reports how it ended.
    ///
    /// Failures are logged through the observer and returned inside the result;
    /// the checkpoint keeps every cell completed before the failure.
    pub async fn run(&self, primary: &[String], keywords: &[String]) -> BackendHarvestResult {
        let backend = self.connector.backend();
        let mut stats = HarvestStats::new();

        let mut state = match self.store.load() {
            Ok(state) => state,
            Err(e) => {
                error!(backend = backend.slug(), error = %e, "Failed to load checkpoint");
                self.observer.log(
                    backend,
                    &format!("Error in {} API: {}", backend.label(), e),
                );
                return BackendHarvestResult::failure(backend, stats, String::new(), e.to_string());
            }
        }
        .unwrap_or_default();

        let result = self.drive(&mut state, &mut stats, primary, keywords).await;
        let request_log = state.ledger.request_log.clone();

        match result {
            Ok(total_records) => {
                info!(backend = backend.slug(), total_records, "Harvest complete");
                BackendHarvestResult::success(
                    backend,
                    HarvestOutcome::Completed { total_records },
                    stats,
                    request_log,
                )
            }
            Err(AppError::Cancelled) => {
                self.flush_ledger(&state);
                self.observer
                    .log(backend, &format!("{} search stopped.", backend.label()));
                BackendHarvestResult::success(backend, HarvestOutcome::Stopped, stats, request_log)
            }
            Err(e) => {
                self.flush_ledger(&state);
                error!(backend = backend.slug(), error = %e, "Harvest failed");
                self.observer
                    .log(backend, &format!("Error in {} API: {}", backend.label(), e));
                BackendHarvestResult::failure(backend, stats, request_log, e.to_string())
            }
        }
    }

    async fn drive(
        &self,
        state: &mut SearchState,
        stats: &mut HarvestStats,
        primary: &[String],
        keywords: &[String],
    ) -> Result<u64, AppError> {
        let backend = self.connector.backend();
        let pager = Pager::new(&self.connector, self.observer.as_ref(), &self.cancel);
        let mut observed = HashSet::new();

        let start = state.cursor;
        if start != ResumeCursor::default() || state.ledger.request_counter > 0 {
            self.observer.log(
                backend,
                &format!(
                    "Resuming {} from term {}, name {}, keyword {} ({} records saved).",
                    backend.label(),
                    start.item_index,
                    start.name_index,
                    start.keyword_index,
                    state.total_saved_records
                ),
            );
        }

        let mut name_index = start.name_index;
        let mut keyword_index = start.keyword_index;

        for (i, term) in primary.iter().enumerate().skip(start.item_index) {
            let grid = expand(term);
            state.ensure_term(term, &grid, keywords);

            match &grid {
                TermGrid::Flat(name) => {
                    for (j, keyword) in keywords.iter().enumerate().skip(keyword_index) {
                        let next = ResumeCursor::new(i, 0, j + 1);
                        self.run_cell(&pager, state, stats, &mut observed, term, name, keyword, next)
                            .await?;
                    }
                }
                TermGrid::Nested(names) => {
                    for (k, name) in names.iter().enumerate().skip(name_index) {
                        for (j, keyword) in keywords.iter().enumerate().skip(keyword_index) {
                            let next = ResumeCursor::new(i, k, j + 1);
                            self.run_cell(
                                &pager,
                                state,
                                stats,
                                &mut observed,
                                term,
                                name,
                                keyword,
                                next,
                            )
                            .await?;
                        }
                        keyword_index = 0;
                    }
                }
            }

            keyword_index = 0;
            name_index = 0;
        }

        write_report(&self.report_path, &state.report())?;
        self.observer.log(
            backend,
            &format!("All results saved to '{}'", self.report_path.display()),
        );
        self.store.clear()?;
        Ok(state.total_saved_records)
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_cell(
        &self,
        pager: &Pager<'_, C>,
        state: &mut SearchState,
        stats: &mut HarvestStats,
        observed: &mut HashSet<String>,
        term: &str,
        name: &str,
        keyword: &str,
        next: ResumeCursor,
    ) -> Result<(), AppError> {
        for used in [term, keyword] {
            if observed.insert(used.to_string()) {
                self.observer.term_observed(used);
            }
        }

        let cell = pager.run_cell(&mut state.ledger, name, keyword).await?;
        let added = state.complete_cell(term, name, keyword, cell, next);
        stats.record_cell(added);
        self.store.save(state)
    }

    /// Persists request accounting gathered since the last completed cell.
    ///
    /// The cursor still points at the interrupted cell, so this never skips work.
    fn flush_ledger(&self, state: &SearchState) {
        if let Err(e) = self.store.save(state) {
            error!(
                backend = self.connector.backend().slug(),
                error = %e,
                "Failed to persist request ledger"
            );
        }
    }
}
