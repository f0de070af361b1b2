//! Elsevier Scopus search API.
//!
//! Pagination follows the `link` entry whose `@ref` is `next`. Scopus answers
//! an empty result set with a single placeholder entry, so entries carrying no
//! bibliographic field at all are dropped.

use async_trait::async_trait;
use litsweep_core::{AppError, Backend, Connector, HttpConfig, Pacing, Page, Record, NULL_SENTINEL};
use serde_json::Value;
use url::Url;

use crate::fields::{is_filled, join_names, text, text_or, year_of};
use crate::http::HttpFetcher;
use crate::LinkCursor;

const DEFAULT_ENDPOINT: &str = "https://api.elsevier.com/content/search/scopus";

/// Entry keys that count towards a record having content.
const CONTENT_FIELDS: [&str; 7] = [
    "dc:title",
    "dc:description",
    "author",
    "prism:doi",
    "prism:isbn",
    "prism:issn",
    "prism:coverDate",
];

pub struct ScopusConnector {
    http: HttpFetcher,
    endpoint: String,
    api_key: String,
    insttoken: Option<String>,
    pacing: Pacing,
}

impl ScopusConnector {
    /// `insttoken` is only needed when the key is used off the subscribing
    /// institution's network.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ClientError` if the HTTP client cannot be built.
    pub fn new(
        api_key: impl Into<String>,
        insttoken: Option<String>,
        pacing: Pacing,
        http: HttpConfig,
    ) -> Result<Self, AppError> {
        Ok(Self {
            http: HttpFetcher::new(http)?,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: api_key.into(),
            insttoken,
            pacing,
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

/// Returns true if the entry carries at least one non-empty bibliographic field.
pub fn has_content(entry: &Value) -> bool {
    CONTENT_FIELDS.iter().any(|key| is_filled(entry.get(*key)))
}

pub fn parse_entry(entry: &Value) -> Record {
    Record {
        title: text(entry.get("dc:title")),
        abstract_text: text(entry.get("dc:description")),
        authors: Some(join_names(entry.get("author"), "authname")),
        doi: text(entry.get("prism:doi")),
        isbn: Some(text_or(entry.get("prism:isbn"), NULL_SENTINEL)),
        issn: Some(text_or(entry.get("prism:issn"), NULL_SENTINEL)),
        publication_year: text(entry.get("prism:coverDate")).map(|date| year_of(&date)),
    }
}

pub fn parse_page(body: &Value) -> Page<LinkCursor> {
    let Some(results) = body.get("search-results") else {
        return Page::exhausted();
    };

    let records = results
        .get("entry")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter(|entry| has_content(entry))
                .map(parse_entry)
                .collect()
        })
        .unwrap_or_default();

    let next = results
        .get("link")
        .and_then(Value::as_array)
        .and_then(|links| {
            links
                .iter()
                .find(|link| link.get("@ref").and_then(Value::as_str) == Some("next"))
        })
        .and_then(|link| link.get("@href").and_then(Value::as_str))
        .map(|href| LinkCursor::Next(href.to_string()));

    let total = text(results.get("opensearch:totalResults")).and_then(|t| t.parse().ok());

    Page {
        records,
        next,
        total,
    }
}

#[async_trait]
impl Connector for ScopusConnector {
    type Cursor = LinkCursor;

    fn backend(&self) -> Backend {
        Backend::Scopus
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
                let mut url = Url::parse(&self.endpoint)
                    .map_err(|e| AppError::InvalidUrl(format!("{}: {}", self.endpoint, e)))?;
                url.query_pairs_mut()
                    .append_pair("query", query)
                    .append_pair("httpAccept", "application/json")
                    .append_pair("count", "25")
                    .append_pair("view", "COMPLETE")
                    .append_pair("apikey", &self.api_key);
                if let Some(token) = &self.insttoken {
                    url.query_pairs_mut().append_pair("insttoken", token);
                }
                Ok(url.into())
            }
        }
    }

    async fn fetch(&self, url: &str, _cursor: LinkCursor) -> Result<Page<LinkCursor>, AppError> {
        Ok(match self.http.get_json(url).await? {
            Some(body) => parse_page(&body),
            None => Page::exhausted(),
        })
    }
}
