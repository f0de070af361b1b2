//! The `harvest`, `status` and `reset` commands.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use futures::future::join_all;
use litsweep_client::{IeeeConnector, PubMedConnector, ScopusConnector, SpringerConnector};
use litsweep_core::{
    AppError, Backend, BackendHarvestResult, BatchHarvestSummary, CheckpointStore, Connector,
    HarvestConfig, HarvestOutcome, HarvestStats, Harvester, HttpConfig,
};
use litsweep_core::terms::{cells, expand};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::{Credentials, HarvestArgs};
use crate::observer::TracingObserver;

pub const COMBINED_LOG_FILE: &str = "combined_api_requests.log";
pub const SEARCHED_TERMS_FILE: &str = "searched_terms.txt";

/// Reads one term per line, skipping blank lines.
pub fn read_terms(path: &Path) -> anyhow::Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read terms from {}", path.display()))?;
    Ok(parse_terms(&text))
}

pub fn parse_terms(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Output directory from the command line, else the config file, else `.`.
pub fn resolve_output_dir(flag: Option<PathBuf>, config: &HarvestConfig) -> PathBuf {
    flag.or_else(|| config.output_dir.clone())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Everything one harvest invocation needs once flags and config are merged.
#[derive(Debug)]
pub struct HarvestPlan {
    pub primary: Vec<String>,
    pub keywords: Vec<String>,
    pub backends: Vec<Backend>,
    pub output_dir: PathBuf,
    pub credentials: Credentials,
}

impl HarvestPlan {
    /// Merges command-line arguments over the config file.
    pub fn resolve(args: HarvestArgs, config: &HarvestConfig) -> anyhow::Result<Self> {
        let primary = match &args.primary {
            Some(path) => read_terms(path)?,
            None => config.terms.primary.clone(),
        };
        let keywords = match &args.secondary {
            Some(path) => read_terms(path)?,
            None => config.terms.secondary.clone(),
        };
        if primary.is_empty() {
            bail!("No primary terms. Pass --primary FILE or set [terms] primary in the config file");
        }
        if keywords.is_empty() {
            bail!("No secondary keywords. Pass --secondary FILE or set [terms] secondary in the config file");
        }

        let mut backends = if args.backends.is_empty() {
            config.enabled_backends()
        } else {
            args.backends.clone()
        };
        backends.sort();
        backends.dedup();
        if backends.is_empty() {
            bail!("No backend selected");
        }

        let mut credentials = args.credentials;
        for backend in Backend::ALL {
            let entry = config.backend(backend);
            let slot = match backend {
                Backend::Ieee => &mut credentials.ieee_api_key,
                Backend::Springer => &mut credentials.springer_api_key,
                Backend::Scopus => &mut credentials.scopus_api_key,
                Backend::PubMed => &mut credentials.pubmed_api_key,
            };
            if slot.is_none() {
                *slot = entry.api_key;
            }
        }
        if credentials.scopus_insttoken.is_none() {
            credentials.scopus_insttoken = config.backend(Backend::Scopus).insttoken;
        }

        Ok(Self {
            primary,
            keywords,
            backends,
            output_dir: resolve_output_dir(args.output_dir, config),
            credentials,
        })
    }

    /// Number of (bias name, keyword) cells each backend will run.
    pub fn cell_count(&self) -> usize {
        self.primary
            .iter()
            .map(|term| cells(&expand(term), &self.keywords).count())
            .sum()
    }
}

/// Shared by every worker of one harvest.
struct WorkerContext {
    primary: Arc<Vec<String>>,
    keywords: Arc<Vec<String>>,
    output_dir: PathBuf,
    observer: Arc<TracingObserver>,
    cancel: CancellationToken,
}

impl WorkerContext {
    fn spawn<C>(&self, connector: C) -> JoinHandle<BackendHarvestResult>
    where
        C: Connector + 'static,
    {
        let harvester = Harvester::new(
            connector,
            &self.output_dir,
            self.observer.clone(),
            self.cancel.clone(),
        );
        let primary = self.primary.clone();
        let keywords = self.keywords.clone();
        tokio::spawn(async move { harvester.run(&primary, &keywords).await })
    }
}

/// Builds the connector for `backend` and starts its worker.
fn start_worker(
    backend: Backend,
    plan: &HarvestPlan,
    config: &HarvestConfig,
    context: &WorkerContext,
) -> Result<JoinHandle<BackendHarvestResult>, AppError> {
    let pacing = config.backend(backend).pacing(backend);
    let http = HttpConfig::default();
    let api_key = plan
        .credentials
        .api_key(backend)
        .ok_or_else(|| AppError::MissingCredential(backend.label().to_string()))?
        .to_string();

    Ok(match backend {
        Backend::Ieee => context.spawn(IeeeConnector::new(api_key, pacing, http)?),
        Backend::Springer => context.spawn(SpringerConnector::new(api_key, pacing, http)?),
        Backend::Scopus => context.spawn(ScopusConnector::new(
            api_key,
            plan.credentials.scopus_insttoken.clone(),
            pacing,
            http,
        )?),
        Backend::PubMed => context.spawn(PubMedConnector::new(api_key, pacing, http)?),
    })
}

/// Runs every selected backend concurrently and waits for all of them.
///
/// Ctrl-C cancels every worker at its next request boundary; each keeps its
/// checkpoint. The combined request log and the searched-terms file are
/// written once all workers have returned.
pub async fn run_harvest(
    plan: HarvestPlan,
    config: &HarvestConfig,
) -> anyhow::Result<BatchHarvestSummary> {
    std::fs::create_dir_all(&plan.output_dir).with_context(|| {
        format!(
            "Failed to create output directory {}",
            plan.output_dir.display()
        )
    })?;

    let cancel = CancellationToken::new();
    let observer = Arc::new(TracingObserver::new());
    let context = WorkerContext {
        primary: Arc::new(plan.primary.clone()),
        keywords: Arc::new(plan.keywords.clone()),
        output_dir: plan.output_dir.clone(),
        observer: observer.clone(),
        cancel: cancel.clone(),
    };

    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current request");
            interrupt.cancel();
        }
    });

    info!(
        backends = plan.backends.len(),
        terms = plan.primary.len(),
        keywords = plan.keywords.len(),
        cells = plan.cell_count(),
        output_dir = %plan.output_dir.display(),
        "Starting harvest"
    );

    let mut summary = BatchHarvestSummary::new();
    let mut running = Vec::new();
    for backend in &plan.backends {
        match start_worker(*backend, &plan, config, &context) {
            Ok(handle) => running.push((*backend, handle)),
            Err(e) => {
                error!(backend = backend.slug(), error = %e, "Backend not started");
                summary.add(BackendHarvestResult::failure(
                    *backend,
                    HarvestStats::new(),
                    String::new(),
                    e.user_message(),
                ));
            }
        }
    }

    let (backends, handles): (Vec<_>, Vec<_>) = running.into_iter().unzip();
    for (backend, joined) in backends.into_iter().zip(join_all(handles).await) {
        let result = joined.unwrap_or_else(|e| {
            error!(backend = backend.slug(), error = %e, "Worker panicked");
            BackendHarvestResult::failure(backend, HarvestStats::new(), String::new(), e.to_string())
        });
        summary.add(result);
    }

    write_outputs(&plan.output_dir, &summary, &observer.searched_terms())?;
    Ok(summary)
}

/// Writes the combined request log and the searched-terms file.
pub fn write_outputs(
    output_dir: &Path,
    summary: &BatchHarvestSummary,
    terms: &[String],
) -> anyhow::Result<()> {
    let log_path = output_dir.join(COMBINED_LOG_FILE);
    std::fs::write(&log_path, summary.combined_log())
        .with_context(|| format!("Failed to write {}", log_path.display()))?;

    let terms_path = output_dir.join(SEARCHED_TERMS_FILE);
    let mut text = String::new();
    for term in terms {
        text.push_str(term);
        text.push('\n');
    }
    std::fs::write(&terms_path, text)
        .with_context(|| format!("Failed to write {}", terms_path.display()))?;
    Ok(())
}

pub fn print_summary(summary: &BatchHarvestSummary) {
    println!();
    println!("═══════════════════════════════════════════════════════");
    println!("  HARVEST SUMMARY");
    println!("═══════════════════════════════════════════════════════");
    for result in &summary.results {
        let status = match (&result.outcome, &result.error) {
            (Some(HarvestOutcome::Completed { total_records }), _) => {
                format!("complete, {} records in total", total_records)
            }
            (Some(HarvestOutcome::Stopped), _) => "stopped, checkpoint kept".to_string(),
            (None, Some(e)) => format!("failed: {}", e),
            (None, None) => "failed".to_string(),
        };
        println!(
            "  {:<9} {} ({} cells, {} new records this run)",
            result.backend.label(),
            status,
            result.stats.cells,
            result.stats.records
        );
    }
    println!("───────────────────────────────────────────────────────");
    println!(
        "  {} completed, {} failed, {} records fetched",
        summary.completed_count(),
        summary.failed_count(),
        summary.total_records()
    );
    println!("═══════════════════════════════════════════════════════");
    println!();
}

/// Prints what each backend's checkpoint holds.
pub fn show_status(output_dir: &Path) -> anyhow::Result<()> {
    println!("\nCheckpoints in {}\n", output_dir.display());
    for backend in Backend::ALL {
        let store = CheckpointStore::for_backend(output_dir, backend);
        let report = output_dir.join(backend.results_file_name());
        match store.load() {
            Ok(Some(state)) => {
                println!(
                    "  {:<9} resumable: {} records saved, term {}, name {}, keyword {}, {} requests counted",
                    backend.label(),
                    state.total_saved_records,
                    state.cursor.item_index,
                    state.cursor.name_index,
                    state.cursor.keyword_index,
                    state.ledger.request_counter
                );
            }
            Ok(None) if report.exists() => {
                println!("  {:<9} complete ({})", backend.label(), report.display());
            }
            Ok(None) => println!("  {:<9} not started", backend.label()),
            Err(e) => println!("  {:<9} unreadable checkpoint: {}", backend.label(), e),
        }
    }
    println!();
    Ok(())
}

/// Deletes a backend's checkpoint.
pub fn reset(output_dir: &Path, backend: Backend) -> anyhow::Result<()> {
    let store = CheckpointStore::for_backend(output_dir, backend);
    if !store.exists() {
        info!(backend = backend.slug(), "No checkpoint to reset");
        return Ok(());
    }
    store
        .clear()
        .with_context(|| format!("Failed to delete {}", store.path().display()))?;
    info!(backend = backend.slug(), path = %store.path().display(), "Checkpoint deleted");
    Ok(())
}
