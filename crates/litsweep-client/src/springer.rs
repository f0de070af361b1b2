//! Springer Nature open-access API. Follows the `nextPage` path each response carries.

use async_trait::async_trait;
use litsweep_core::{AppError, Backend, Connector, HttpConfig, Pacing, Page, Record, NO_DOI, NULL_SENTINEL};
use serde_json::Value;
use url::Url;

use crate::fields::{join_names, text, text_or, year_of};
use crate::http::HttpFetcher;
use crate::LinkCursor;

const DEFAULT_BASE_URL: &str = "https://api.springernature.com";
const API_PATH: &str = "/openaccess/json";

pub struct SpringerConnector {
    http: HttpFetcher,
    base_url: String,
    api_key: String,
    pacing: Pacing,
}

impl SpringerConnector {
    /// # Errors
    ///
    /// Returns `AppError::ClientError` if the HTTP client cannot be built.
    pub fn new(api_key: impl Into<String>, pacing: Pacing, http: HttpConfig) -> Result<Self, AppError> {
        Ok(Self {
            http: HttpFetcher::new(http)?,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            pacing,
        })
    }

    /// Replaces the API host; `nextPage` paths are resolved against it too.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Parses a response, resolving `nextPage` against this connector's host.
    pub fn parse_page(&self, body: &Value) -> Page<LinkCursor> {
        let records: Vec<Record> = body
            .get("records")
            .and_then(Value::as_array)
            .map(|records| records.iter().map(parse_record).collect())
            .unwrap_or_default();

        // A page without records ends the cell even if it links onwards.
        let next = match body.get("nextPage").and_then(Value::as_str) {
            Some(path) if !path.is_empty() && !records.is_empty() => {
                Some(LinkCursor::Next(format!("{}{}", self.base_url, path)))
            }
            _ => None,
        };

        let total = body
            .get("result")
            .and_then(|r| r.get(0))
            .and_then(|r| text(r.get("total")))
            .and_then(|t| t.parse().ok());

        Page {
            records,
            next,
            total,
        }
    }
}

/// Converts one entry of the `records` array.
pub fn parse_record(record: &Value) -> Record {
    let year = text(record.get("publicationDate"))
        .map(|date| year_of(&date))
        .unwrap_or_else(|| NULL_SENTINEL.to_string());

    Record {
        title: Some(text_or(record.get("title"), NULL_SENTINEL)),
        abstract_text: Some(text_or(record.get("abstract"), NULL_SENTINEL)),
        authors: Some(join_names(record.get("creators"), "creator")),
        doi: Some(text_or(record.get("doi"), NO_DOI)),
        isbn: Some(text_or(record.get("isbn"), NULL_SENTINEL)),
        issn: Some(text_or(record.get("issn"), NULL_SENTINEL)),
        publication_year: Some(year),
    }
}

#[async_trait]
impl Connector for SpringerConnector {
    type Cursor = LinkCursor;

    fn backend(&self) -> Backend {
        Backend::Springer
    }

    fn pacing(&self) -> &Pacing {
        &self.pacing
    }

    fn query(&self, name: &str, keyword: &str) -> String {
        format!("(\"{}\" AND \"{}\")", name.trim(), keyword)
    }

    fn first_cursor(&self, _query: &str) -> LinkCursor {
        LinkCursor::Start
    }

    fn request_url(&self, query: &str, cursor: &LinkCursor) -> Result<String, AppError> {
        match cursor {
            LinkCursor::Next(url) => Ok(url.clone()),
            LinkCursor::Start => {
                let base = format!("{}{}", self.base_url, API_PATH);
                let mut url = Url::parse(&base)
                    .map_err(|e| AppError::InvalidUrl(format!("{}: {}", base, e)))?;
                url.query_pairs_mut()
                    .append_pair("q", query)
                    .append_pair("api_key", &self.api_key);
                Ok(url.into())
            }
        }
    }

    async fn fetch(&self, url: &str, _cursor: LinkCursor) -> Result<Page<LinkCursor>, AppError> {
        Ok(match self.http.get_json(url).await? {
            Some(body) => self.parse_page(&body),
            None => Page::exhausted(),
        })
    }
}
