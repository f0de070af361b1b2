//! IEEE Xplore metadata search. Offset pagination over a reported total.

use async_trait::async_trait;
use litsweep_core::{
    AppError, Backend, Connector, HttpConfig, Pacing, Page, Record, NO_DOI, NULL_SENTINEL,
};
use serde_json::Value;
use url::Url;

use crate::fields::{join_names, text_or};
use crate::http::HttpFetcher;

const DEFAULT_ENDPOINT: &str = "https://ieeexploreapi.ieee.org/api/v1/search/articles";

/// Records per page; also the step between `start_record` values.
pub const PAGE_SIZE: u64 = 25;

/// Position within an IEEE result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IeeeCursor {
    /// 1-based `start_record` of the next request.
    pub start: u64,
    /// Result-set size; 0 until a page has reported one.
    pub total: u64,
}

impl IeeeCursor {
    /// Cursor that follows a page starting at `start`, or `None` when that
    /// page already covered the end of the result set.
    pub fn advance(self, total: u64) -> Option<Self> {
        if self.start + PAGE_SIZE - 1 >= total {
            None
        } else {
            Some(Self {
                start: self.start + PAGE_SIZE,
                total,
            })
        }
    }
}

pub struct IeeeConnector {
    http: HttpFetcher,
    endpoint: String,
    api_key: String,
    pacing: Pacing,
}

impl IeeeConnector {
    /// # Errors
    ///
    /// Returns `AppError::ClientError` if the HTTP client cannot be built.
    pub fn new(api_key: impl Into<String>, pacing: Pacing, http: HttpConfig) -> Result<Self, AppError> {
        Ok(Self {
            http: HttpFetcher::new(http)?,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: api_key.into(),
            pacing,
        })
    }

    /// Points the connector at another endpoint; used against mock servers.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

/// Converts one entry of the `articles` array.
pub fn parse_article(article: &Value) -> Record {
    let authors = article.get("authors").and_then(|a| a.get("authors"));
    Record {
        title: Some(text_or(article.get("title"), NULL_SENTINEL)),
        abstract_text: Some(text_or(article.get("abstract"), NULL_SENTINEL)),
        authors: Some(join_names(authors, "full_name")),
        doi: Some(text_or(article.get("doi"), NO_DOI)),
        isbn: Some(text_or(article.get("isbn"), NULL_SENTINEL)),
        issn: Some(text_or(article.get("issn"), NULL_SENTINEL)),
        publication_year: Some(text_or(article.get("publication_year"), NULL_SENTINEL)),
    }
}

/// Parses a search response. Every article is kept, even one with no fields.
pub fn parse_page(body: &Value, cursor: IeeeCursor) -> Page<IeeeCursor> {
    let records: Vec<Record> = body
        .get("articles")
        .and_then(Value::as_array)
        .map(|articles| articles.iter().map(parse_article).collect())
        .unwrap_or_default();

    let reported = body.get("total_records").and_then(Value::as_u64);
    let total = if cursor.total == 0 {
        reported.unwrap_or(0)
    } else {
        cursor.total
    };

    Page {
        records,
        next: cursor.advance(total),
        total: Some(total),
    }
}

#[async_trait]
impl Connector for IeeeConnector {
    type Cursor = IeeeCursor;

    fn backend(&self) -> Backend {
        Backend::Ieee
    }

    fn pacing(&self) -> &Pacing {
        &self.pacing
    }

    /// Every `" or "` alternative inside the name becomes its own clause.
    fn query(&self, name: &str, keyword: &str) -> String {
        name.split(litsweep_core::terms::BIAS_SEPARATOR)
            .map(|term| format!("(\"{}\" AND \"{}\")", term.trim(), keyword))
            .collect::<Vec<_>>()
            .join(" OR ")
    }

    fn first_cursor(&self, _query: &str) -> IeeeCursor {
        IeeeCursor { start: 1, total: 0 }
    }

    fn request_url(&self, query: &str, cursor: &IeeeCursor) -> Result<String, AppError> {
        let mut url = Url::parse(&self.endpoint)
            .map_err(|e| AppError::InvalidUrl(format!("{}: {}", self.endpoint, e)))?;
        url.query_pairs_mut()
            .append_pair("apikey", &self.api_key)
            .append_pair("format", "json")
            .append_pair("max_records", &PAGE_SIZE.to_string())
            .append_pair("start_record", &cursor.start.to_string())
            .append_pair("querytext", query);
        Ok(url.into())
    }

    async fn fetch(&self, url: &str, cursor: IeeeCursor) -> Result<Page<IeeeCursor>, AppError> {
        Ok(match self.http.get_json(url).await? {
            Some(body) => parse_page(&body, cursor),
            None => Page::exhausted(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn connector() -> IeeeConnector {
        IeeeConnector::new("KEY", Pacing::immediate(), HttpConfig::default()).unwrap()
    }

    #[test]
    fn test_query_splits_alternatives() {
        let c = connector();
        assert_eq!(c.query("halo", "ml"), r#"("halo" AND "ml")"#);
        assert_eq!(
            c.query("halo or  horns ", "ml"),
            r#"("halo" AND "ml") OR ("horns" AND "ml")"#
        );
    }

    #[test]
    fn test_request_url_encodes_query() {
        let c = connector();
        let url = c
            .request_url(r#"("halo" AND "ml")"#, &IeeeCursor { start: 26, total: 30 })
            .unwrap();
        assert!(url.starts_with(DEFAULT_ENDPOINT));
        assert!(url.contains("apikey=KEY"));
        assert!(url.contains("max_records=25"));
        assert!(url.contains("start_record=26"));
        assert!(url.contains("querytext=%28%22halo%22+AND+%22ml%22%29"));
    }

    #[test]
    fn test_advance_stops_at_total() {
        let first = IeeeCursor { start: 1, total: 0 };
        let second = first.advance(30).unwrap();
        assert_eq!(second, IeeeCursor { start: 26, total: 30 });
        assert_eq!(second.advance(30), None);
        assert_eq!(first.advance(25), None);
        assert_eq!(first.advance(0), None);
    }

    #[test]
    fn test_parse_article_defaults() {
        let record = parse_article(&json!({"title": "T"}));
        assert_eq!(record.title.as_deref(), Some("T"));
        assert_eq!(record.abstract_text.as_deref(), Some("null"));
        assert_eq!(record.authors.as_deref(), Some(""));
        assert_eq!(record.doi.as_deref(), Some("No DOI"));
        assert_eq!(record.publication_year.as_deref(), Some("null"));
    }

    #[test]
    fn test_parse_article_full() {
        let record = parse_article(&json!({
            "title": "Bias in triage",
            "abstract": "We study...",
            "authors": {"authors": [{"full_name": "A. One"}, {"full_name": "B. Two"}]},
            "doi": "10.1109/x",
            "publication_year": 2020,
            "isbn": "978-1",
            "issn": "1234-5678"
        }));
        assert_eq!(record.authors.as_deref(), Some("A. One, B. Two"));
        assert_eq!(record.doi.as_deref(), Some("10.1109/x"));
        assert_eq!(record.publication_year.as_deref(), Some("2020"));
        assert_eq!(record.issn.as_deref(), Some("1234-5678"));
    }

    #[test]
    fn test_parse_page_keeps_empty_articles() {
        let body = json!({"total_records": 2, "articles": [{}, {"title": "T"}]});
        let page = parse_page(&body, IeeeCursor { start: 1, total: 0 });
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.next, None);
        assert_eq!(page.total, Some(2));
    }

    #[test]
    fn test_parse_page_keeps_first_total() {
        let body = json!({"total_records": 5, "articles": []});
        let page = parse_page(&body, IeeeCursor { start: 1, total: 60 });
        assert_eq!(page.next, Some(IeeeCursor { start: 26, total: 60 }));
    }
}
