//! The seam between the backend-agnostic engine and each search API.
//!
//! A connector knows how to phrase a query, how to turn a page position into a
//! request URL, and how to parse one response. Pacing, request accounting,
//! cancellation and checkpointing all live above it in [`crate::pager`] and
//! [`crate::harvest`].

use std::fmt::Debug;

use async_trait::async_trait;

use crate::config::Pacing;
use crate::error::AppError;
use crate::models::{Backend, Record};

/// One parsed response.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<C> {
    pub records: Vec<Record>,
    /// Position of the next request, or `None` once the cell is exhausted.
    pub next: Option<C>,
    /// Result-set size, for backends that report one.
    pub total: Option<u64>,
}

impl<C> Page<C> {
    /// A final page with no records; used when a response has no usable data.
    pub fn exhausted() -> Self {
        Self {
            records: Vec::new(),
            next: None,
            total: None,
        }
    }
}

#[async_trait]
pub trait Connector: Send + Sync {
    /// Page position for this backend's pagination idiom.
    type Cursor: Clone + Debug + Send + Sync;

    fn backend(&self) -> Backend;

    fn pacing(&self) -> &Pacing;

    /// Query text for one (bias name, keyword) cell.
    fn query(&self, name: &str, keyword: &str) -> String;

    /// Position of the first request for `query`.
    fn first_cursor(&self, query: &str) -> Self::Cursor;

    /// Full request URL for the given position. This is what the request log records.
    fn request_url(&self, query: &str, cursor: &Self::Cursor) -> Result<String, AppError>;

    /// Performs one request and parses the response.
    ///
    /// Shape problems in the response must come back as [`Page::exhausted`]
    /// rather than an error; only transport failures are errors.
    async fn fetch(&self, url: &str, cursor: Self::Cursor) -> Result<Page<Self::Cursor>, AppError>;
}
