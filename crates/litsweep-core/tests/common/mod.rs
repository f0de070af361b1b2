#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use litsweep_core::{AppError, Backend, Connector, HarvestObserver, Page, Pacing, Record};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct StubCursor {
    pub name: String,
    pub keyword: String,
    pub page: usize,
}

/// Deterministic in-memory backend.
///
/// A cell has `1 + (name.len() + keyword.len()) % 3` pages; every page holds
/// two records except the last, which holds one.
pub struct StubConnector {
    pub pacing: Pacing,
    pub fail_on: Option<(String, String)>,
    pub fixed_pages: Option<usize>,
    pub visited: Mutex<Vec<(String, String)>>,
}

impl StubConnector {
    pub fn new() -> Self {
        Self {
            pacing: Pacing::immediate(),
            fail_on: None,
            fixed_pages: None,
            visited: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_on(name: &str, keyword: &str) -> Self {
        Self {
            fail_on: Some((name.to_string(), keyword.to_string())),
            ..Self::new()
        }
    }

    pub fn with_pages(mut self, pages: usize) -> Self {
        self.fixed_pages = Some(pages);
        self
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn pages_for(&self, name: &str, keyword: &str) -> usize {
        self.fixed_pages
            .unwrap_or(1 + (name.len() + keyword.len()) % 3)
    }

    pub fn records_for(&self, name: &str, keyword: &str) -> usize {
        self.pages_for(name, keyword) * 2 - 1
    }

    pub fn visited(&self) -> Vec<(String, String)> {
        self.visited.lock().unwrap().clone()
    }
}

#[async_trait]
impl Connector for StubConnector {
    type Cursor = StubCursor;

    fn backend(&self) -> Backend {
        Backend::Springer
    }

    fn pacing(&self) -> &Pacing {
        &self.pacing
    }

    fn query(&self, name: &str, keyword: &str) -> String {
        format!("{}|{}", name, keyword)
    }

    fn first_cursor(&self, query: &str) -> StubCursor {
        let (name, keyword) = query.split_once('|').unwrap_or((query, ""));
        StubCursor {
            name: name.to_string(),
            keyword: keyword.to_string(),
            page: 0,
        }
    }

    fn request_url(&self, query: &str, cursor: &StubCursor) -> Result<String, AppError> {
        Ok(format!("stub://search?q={}&page={}", query, cursor.page))
    }

    async fn fetch(&self, _url: &str, cursor: StubCursor) -> Result<Page<StubCursor>, AppError> {
        if cursor.page == 0 {
            self.visited
                .lock()
                .unwrap()
                .push((cursor.name.clone(), cursor.keyword.clone()));
            if self.fail_on.as_ref() == Some(&(cursor.name.clone(), cursor.keyword.clone())) {
                return Err(AppError::NetworkError("connection reset".to_string()));
            }
        }

        let pages = self.pages_for(&cursor.name, &cursor.keyword);
        let last = cursor.page + 1 == pages;
        let count = if last { 1 } else { 2 };
        let records = (0..count)
            .map(|n| Record {
                title: Some(format!(
                    "{} / {} p{} r{}",
                    cursor.name, cursor.keyword, cursor.page, n
                )),
                ..Record::default()
            })
            .collect();

        let next = (!last).then(|| StubCursor {
            page: cursor.page + 1,
            ..cursor
        });
        Ok(Page {
            records,
            next,
            total: None,
        })
    }
}

/// Observer that remembers everything it was told.
#[derive(Default)]
pub struct RecordingObserver {
    pub progress: Mutex<Vec<u64>>,
    pub messages: Mutex<Vec<String>>,
    pub terms: Mutex<Vec<String>>,
    pub pauses: Mutex<Vec<(u64, Duration)>>,
    pub cancel_after: Option<(u64, CancellationToken)>,
}

impl RecordingObserver {
    pub fn cancelling_after(requests: u64, token: CancellationToken) -> Self {
        Self {
            cancel_after: Some((requests, token)),
            ..Self::default()
        }
    }
}

impl HarvestObserver for RecordingObserver {
    fn progress(&self, _backend: Backend, requests: u64) {
        self.progress.lock().unwrap().push(requests);
        if let Some((limit, token)) = &self.cancel_after {
            if requests >= *limit {
                token.cancel();
            }
        }
    }

    fn log(&self, _backend: Backend, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }

    fn term_observed(&self, term: &str) {
        self.terms.lock().unwrap().push(term.to_string());
    }

    fn budget_paused(&self, _backend: Backend, budget: u64, cooldown: Duration) {
        self.pauses.lock().unwrap().push((budget, cooldown));
    }
}

pub fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Lets a test keep a handle on the connector a harvester owns.
pub struct SharedStub(pub Arc<StubConnector>);

#[async_trait]
impl Connector for SharedStub {
    type Cursor = StubCursor;

    fn backend(&self) -> Backend {
        self.0.backend()
    }

    fn pacing(&self) -> &Pacing {
        self.0.pacing()
    }

    fn query(&self, name: &str, keyword: &str) -> String {
        self.0.query(name, keyword)
    }

    fn first_cursor(&self, query: &str) -> StubCursor {
        self.0.first_cursor(query)
    }

    fn request_url(&self, query: &str, cursor: &StubCursor) -> Result<String, AppError> {
        self.0.request_url(query, cursor)
    }

    async fn fetch(&self, url: &str, cursor: StubCursor) -> Result<Page<StubCursor>, AppError> {
        self.0.fetch(url, cursor).await
    }
}
