mod common;

use std::path::Path;
use std::sync::Arc;

use common::{strings, RecordingObserver, SharedStub, StubConnector};
use litsweep_core::{
    Backend, BiasResult, CheckpointStore, FinalReport, HarvestOutcome, Harvester, NoopObserver,
    ResumeCursor,
};
use tokio_util::sync::CancellationToken;

fn primary() -> Vec<String> {
    strings(&["anchoring bias or framing effect", "confirmation bias", "halo or horns"])
}

fn keywords() -> Vec<String> {
    strings(&["ml", "clinical", "hiring"])
}

fn read_report(dir: &Path) -> FinalReport {
    let text = std::fs::read_to_string(dir.join(Backend::Springer.results_file_name())).unwrap();
    serde_json::from_str(&text).unwrap()
}

#[tokio::test]
async fn completes_writes_report_and_clears_checkpoint() {
    let dir = tempfile::tempdir().unwrap();
    let connector = StubConnector::new();
    let names = ["anchoring bias", "framing effect", "confirmation bias", "halo", "horns"];
    let mut expected = 0u64;
    for name in names {
        for keyword in keywords() {
            expected += connector.records_for(name, &keyword) as u64;
        }
    }

    let harvester = Harvester::new(
        connector,
        dir.path(),
        Arc::new(NoopObserver),
        CancellationToken::new(),
    );
    let result = harvester.run(&primary(), &keywords()).await;

    assert_eq!(
        result.outcome,
        Some(HarvestOutcome::Completed {
            total_records: expected
        })
    );
    assert_eq!(result.stats.cells, 15);
    assert_eq!(result.stats.records, expected);
    assert!(!harvester.store().exists());

    let report = read_report(dir.path());
    assert_eq!(report.total, expected);
    let tree_total: u64 = report.biases.values().map(BiasResult::total_records).sum();
    assert_eq!(tree_total, expected);
    assert!(matches!(report.biases["confirmation bias"], BiasResult::Flat(_)));
    assert!(matches!(report.biases["halo or horns"], BiasResult::Nested(_)));
}

#[tokio::test]
async fn visits_cells_in_nested_order() {
    let dir = tempfile::tempdir().unwrap();
    let connector = Arc::new(StubConnector::new());
    let harvester = Harvester::new(
        SharedStub(connector.clone()),
        dir.path(),
        Arc::new(NoopObserver),
        CancellationToken::new(),
    );

    harvester
        .run(&strings(&["A or B", "C"]), &strings(&["x", "y"]))
        .await;

    let expected: Vec<(String, String)> = [
        ("A", "x"),
        ("A", "y"),
        ("B", "x"),
        ("B", "y"),
        ("C", "x"),
        ("C", "y"),
    ]
    .iter()
    .map(|(n, k)| (n.to_string(), k.to_string()))
    .collect();
    assert_eq!(connector.visited(), expected);

    let report = read_report(dir.path());
    let BiasResult::Nested(nested) = &report.biases["A or B"] else {
        panic!("expected nested result");
    };
    let names: Vec<_> = nested.records.keys().cloned().collect();
    assert_eq!(names, strings(&["A", "B"]));
}

#[tokio::test]
async fn resumed_run_matches_single_pass() {
    let single_dir = tempfile::tempdir().unwrap();
    let single = Harvester::new(
        StubConnector::new(),
        single_dir.path(),
        Arc::new(NoopObserver),
        CancellationToken::new(),
    );
    single.run(&primary(), &keywords()).await;
    let expected = read_report(single_dir.path());

    let dir = tempfile::tempdir().unwrap();
    let failing = Harvester::new(
        StubConnector::failing_on("framing effect", "clinical"),
        dir.path(),
        Arc::new(NoopObserver),
        CancellationToken::new(),
    );
    let first = failing.run(&primary(), &keywords()).await;
    assert!(!first.is_success());
    assert_eq!(first.stats.cells, 4);

    let store = CheckpointStore::for_backend(dir.path(), Backend::Springer);
    let saved = store.load().unwrap().expect("checkpoint after failure");
    assert_eq!(saved.cursor, ResumeCursor::new(0, 1, 1));
    assert_eq!(saved.total_saved_records, saved.tree_total());

    let connector = StubConnector::new();
    let resumed = Harvester::new(
        connector,
        dir.path(),
        Arc::new(NoopObserver),
        CancellationToken::new(),
    );
    let second = resumed.run(&primary(), &keywords()).await;
    assert!(second.is_complete());
    assert_eq!(second.stats.cells, 11);
    assert!(!store.exists());

    assert_eq!(read_report(dir.path()), expected);
}

#[tokio::test]
async fn resume_starts_at_the_interrupted_cell() {
    let dir = tempfile::tempdir().unwrap();
    let failing = Harvester::new(
        StubConnector::failing_on("C", "y"),
        dir.path(),
        Arc::new(NoopObserver),
        CancellationToken::new(),
    );
    let primary = strings(&["A or B", "C"]);
    let keywords = strings(&["x", "y"]);
    failing.run(&primary, &keywords).await;

    let store = CheckpointStore::for_backend(dir.path(), Backend::Springer);
    let saved = store.load().unwrap().unwrap();
    assert_eq!(saved.cursor, ResumeCursor::new(1, 0, 1));

    let connector = Arc::new(StubConnector::new());
    let observer = Arc::new(RecordingObserver::default());
    let resumed = Harvester::new(
        SharedStub(connector.clone()),
        dir.path(),
        observer.clone(),
        CancellationToken::new(),
    );
    resumed.run(&primary, &keywords).await;

    assert_eq!(connector.visited(), vec![("C".to_string(), "y".to_string())]);
    assert!(observer
        .messages
        .lock()
        .unwrap()
        .iter()
        .any(|m| m.starts_with("Resuming Springer from term 1, name 0, keyword 1")));
}

#[tokio::test]
async fn request_ledger_survives_failure() {
    let dir = tempfile::tempdir().unwrap();
    let failing = Harvester::new(
        StubConnector::failing_on("A", "y"),
        dir.path(),
        Arc::new(NoopObserver),
        CancellationToken::new(),
    );
    let primary = strings(&["A"]);
    let keywords = strings(&["x", "y"]);
    let first = failing.run(&primary, &keywords).await;

    let store = CheckpointStore::for_backend(dir.path(), Backend::Springer);
    let saved = store.load().unwrap().unwrap();
    let pages_x = StubConnector::new().pages_for("A", "x") as u64;
    assert_eq!(saved.ledger.request_counter, pages_x + 1);
    assert_eq!(saved.ledger.request_log, first.request_log);
    assert_eq!(saved.cursor, ResumeCursor::new(0, 0, 1));

    let resumed = Harvester::new(
        StubConnector::new(),
        dir.path(),
        Arc::new(NoopObserver),
        CancellationToken::new(),
    );
    let second = resumed.run(&primary, &keywords).await;
    let pages_y = StubConnector::new().pages_for("A", "y") as u64;
    assert_eq!(
        second.request_log.lines().count() as u64,
        pages_x + 1 + pages_y
    );
    assert!(second.request_log.starts_with(&first.request_log));
}

#[tokio::test]
async fn cancellation_stops_and_keeps_checkpoint() {
    let dir = tempfile::tempdir().unwrap();
    let cancel = CancellationToken::new();
    let observer = Arc::new(RecordingObserver::cancelling_after(1, cancel.clone()));
    let harvester = Harvester::new(
        StubConnector::new().with_pages(2),
        dir.path(),
        observer,
        cancel,
    );

    let result = harvester.run(&strings(&["A"]), &strings(&["x", "y"])).await;

    assert_eq!(result.outcome, Some(HarvestOutcome::Stopped));
    assert!(result.is_success());
    assert!(harvester.store().exists());
    assert!(!harvester.report_path().exists());
    let saved = harvester.store().load().unwrap().unwrap();
    assert_eq!(saved.cursor, ResumeCursor::default());
    assert_eq!(saved.ledger.request_counter, 1);
}

#[tokio::test]
async fn terms_are_observed_once() {
    let dir = tempfile::tempdir().unwrap();
    let observer = Arc::new(RecordingObserver::default());
    let harvester = Harvester::new(
        StubConnector::new(),
        dir.path(),
        observer.clone(),
        CancellationToken::new(),
    );

    harvester
        .run(&strings(&["A or B", "C"]), &strings(&["x", "y"]))
        .await;

    assert_eq!(
        *observer.terms.lock().unwrap(),
        strings(&["A or B", "x", "y", "C"])
    );
}

#[tokio::test]
async fn corrupt_checkpoint_fails_without_touching_it() {
    let dir = tempfile::tempdir().unwrap();
    let store = CheckpointStore::for_backend(dir.path(), Backend::Springer);
    std::fs::write(store.path(), "garbage").unwrap();

    let harvester = Harvester::new(
        StubConnector::new(),
        dir.path(),
        Arc::new(NoopObserver),
        CancellationToken::new(),
    );
    let result = harvester.run(&strings(&["A"]), &strings(&["x"])).await;

    assert!(!result.is_success());
    assert_eq!(std::fs::read_to_string(store.path()).unwrap(), "garbage");
}
