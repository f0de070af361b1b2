//! PubMed through NCBI E-utilities.
//!
//! Each cell runs in two phases: `esearch` pages through the matching PubMed
//! ids until an empty `IdList`, then `efetch` pulls the article XML for those
//! ids in batches. Both phases share the cursor, so every request goes through
//! the same pacing and ledger as any other backend.

use async_trait::async_trait;
use litsweep_core::{AppError, Backend, Connector, HttpConfig, Pacing, Page, Record, NULL_SENTINEL};
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::warn;
use url::Url;

use crate::http::HttpFetcher;

const DEFAULT_BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";

/// `retmax` for id searches and the batch size for article fetches.
pub const BATCH_SIZE: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PubMedCursor {
    /// Collecting ids; `ids` holds everything found so far.
    Search { retstart: usize, ids: Vec<String> },
    /// Fetching `ids[offset..offset + BATCH_SIZE]`.
    Fetch { ids: Vec<String>, offset: usize },
}

impl PubMedCursor {
    /// Position after an `esearch` page that returned `found`.
    pub fn after_search(self, found: Vec<String>) -> Option<Self> {
        let PubMedCursor::Search { retstart, mut ids } = self else {
            return None;
        };
        if found.is_empty() {
            return (!ids.is_empty()).then_some(PubMedCursor::Fetch { ids, offset: 0 });
        }
        ids.extend(found);
        Some(PubMedCursor::Search {
            retstart: retstart + BATCH_SIZE,
            ids,
        })
    }

    /// Position once the id search cannot go on: fetch whatever was found.
    pub fn end_search(self) -> Option<Self> {
        self.after_search(Vec::new())
    }

    /// Position after an `efetch` batch.
    pub fn after_fetch(self) -> Option<Self> {
        let PubMedCursor::Fetch { ids, offset } = self else {
            return None;
        };
        let offset = offset + BATCH_SIZE;
        (offset < ids.len()).then_some(PubMedCursor::Fetch { ids, offset })
    }
}

pub struct PubMedConnector {
    http: HttpFetcher,
    base_url: String,
    api_key: String,
    pacing: Pacing,
}

impl PubMedConnector {
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

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self, path: &str) -> Result<Url, AppError> {
        let raw = format!("{}/{}", self.base_url, path);
        Url::parse(&raw).map_err(|e| AppError::InvalidUrl(format!("{}: {}", raw, e)))
    }
}

/// Ids and total count from an `esearch` response.
pub fn parse_search(xml: &str) -> Result<(Vec<String>, Option<u64>), quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut ids = Vec::new();
    let mut count = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => path.push(e.name().as_ref().to_vec()),
            Event::End(_) => {
                path.pop();
            }
            Event::Text(e) => {
                let text = e.unescape()?.into_owned();
                match path_tail(&path).as_slice() {
                    [.., b"IdList", b"Id"] => ids.push(text),
                    [b"eSearchResult", b"Count"] => count = text.parse().ok(),
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok((ids, count))
}

fn path_tail(path: &[Vec<u8>]) -> Vec<&[u8]> {
    path.iter().map(Vec::as_slice).collect()
}

/// Fields gathered while walking one `PubmedArticle`.
#[derive(Default)]
struct ArticleFields {
    title: Option<String>,
    abstract_text: Option<String>,
    doi: Option<String>,
    isbn: Option<String>,
    issn: Option<String>,
    year: Option<String>,
    authors: Option<Vec<String>>,
    has_citation: bool,
}

impl ArticleFields {
    fn into_record(self) -> Record {
        Record {
            title: Some(self.title.unwrap_or_else(|| NULL_SENTINEL.to_string())),
            abstract_text: self.abstract_text,
            authors: self.authors.map(|names| names.join(", ")),
            doi: self.doi,
            isbn: self.isbn,
            issn: self.issn,
            publication_year: self.year,
        }
    }
}

/// Records from an `efetch` `PubmedArticleSet`.
///
/// Only the first `AbstractText` is kept. Title and abstract keep the text of
/// inline markup such as `<i>` or `<sup>`. Identifiers come from the article's
/// own `PubmedData/ArticleIdList`, never from its reference list. Authors
/// without both a last name and a fore name are listed as `"null"`.
pub fn parse_articles(xml: &str) -> Result<Vec<Record>, quick_xml::Error> {
    // Text is not trimmed: whitespace around inline markup is part of titles.
    let mut reader = Reader::from_str(xml);

    let mut records = Vec::new();
    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut current: Option<ArticleFields> = None;
    let mut id_type: Option<String> = None;
    let mut title_depth: Option<usize> = None;
    let mut title_buf = String::new();
    let mut abstract_open = false;
    let mut abstract_buf = String::new();
    let mut last_name: Option<String> = None;
    let mut fore_name: Option<String> = None;
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let name = e.name().as_ref().to_vec();
                match name.as_slice() {
                    b"PubmedArticle" => current = Some(ArticleFields::default()),
                    b"MedlineCitation" => {
                        if let Some(article) = current.as_mut() {
                            article.has_citation = true;
                        }
                    }
                    b"ArticleId" => {
                        id_type = e
                            .try_get_attribute(b"IdType")?
                            .map(|attr| attr.unescape_value().map(|v| v.into_owned()))
                            .transpose()?;
                    }
                    b"ArticleTitle" => {
                        let in_article = path.last().is_some_and(|parent| parent == b"Article");
                        if in_article && current.as_ref().is_some_and(|a| a.title.is_none()) {
                            title_depth = Some(path.len());
                            title_buf.clear();
                        }
                    }
                    b"AbstractText" => {
                        if current.as_ref().is_some_and(|a| a.abstract_text.is_none()) {
                            abstract_open = true;
                            abstract_buf.clear();
                        }
                    }
                    b"AuthorList" => {
                        if let Some(article) = current.as_mut() {
                            article.authors.get_or_insert_with(Vec::new);
                        }
                    }
                    b"Author" => {
                        last_name = None;
                        fore_name = None;
                    }
                    _ => {}
                }
                path.push(name);
            }
            Event::Text(e) => {
                let raw = e.unescape()?;
                if title_depth.is_some() {
                    title_buf.push_str(&raw);
                }
                if abstract_open {
                    abstract_buf.push_str(&raw);
                }
                let text = raw.trim().to_string();
                let Some(article) = current.as_mut() else {
                    continue;
                };
                match path_tail(&path).as_slice() {
                    [.., b"PubmedArticle", b"PubmedData", b"ArticleIdList", b"ArticleId"] => {
                        match id_type.as_deref() {
                            Some("doi") => article.doi = Some(text),
                            Some("isbn") => article.isbn = Some(text),
                            _ => {}
                        }
                    }
                    [.., b"Article", b"Journal", b"ISSN"] => article.issn = Some(text),
                    [.., b"Journal", b"JournalIssue", b"PubDate", b"Year"] => {
                        article.year = Some(text)
                    }
                    [.., b"Author", b"LastName"] => last_name = Some(text),
                    [.., b"Author", b"ForeName"] => fore_name = Some(text),
                    _ => {}
                }
            }
            Event::End(e) => {
                path.pop();
                match e.name().as_ref() {
                    b"ArticleTitle" if title_depth == Some(path.len()) => {
                        title_depth = None;
                        if let Some(article) = current.as_mut() {
                            article.title = Some(title_buf.trim().to_string());
                        }
                    }
                    b"AbstractText" if abstract_open => {
                        abstract_open = false;
                        if let Some(article) = current.as_mut() {
                            article.abstract_text = Some(abstract_buf.trim().to_string());
                        }
                    }
                    b"Author" => {
                        if let Some(authors) = current.as_mut().and_then(|a| a.authors.as_mut()) {
                            let name = match (last_name.take(), fore_name.take()) {
                                (Some(last), Some(fore)) => format!("{} {}", last, fore),
                                _ => NULL_SENTINEL.to_string(),
                            };
                            authors.push(name);
                        }
                    }
                    b"ArticleId" => id_type = None,
                    b"PubmedArticle" => {
                        if let Some(article) = current.take() {
                            if article.has_citation {
                                records.push(article.into_record());
                            }
                        }
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(records)
}

#[async_trait]
impl Connector for PubMedConnector {
    type Cursor = PubMedCursor;

    fn backend(&self) -> Backend {
        Backend::PubMed
    }

    fn pacing(&self) -> &Pacing {
        &self.pacing
    }

    fn query(&self, name: &str, keyword: &str) -> String {
        format!("\"{}\" AND \"{}\"", name.trim(), keyword)
    }

    fn first_cursor(&self, _query: &str) -> PubMedCursor {
        PubMedCursor::Search {
            retstart: 0,
            ids: Vec::new(),
        }
    }

    fn request_url(&self, query: &str, cursor: &PubMedCursor) -> Result<String, AppError> {
        let mut url = match cursor {
            PubMedCursor::Search { retstart, .. } => {
                let mut url = self.endpoint("esearch.fcgi")?;
                url.query_pairs_mut()
                    .append_pair("db", "pubmed")
                    .append_pair("term", query)
                    .append_pair("retstart", &retstart.to_string())
                    .append_pair("retmax", &BATCH_SIZE.to_string());
                url
            }
            PubMedCursor::Fetch { ids, offset } => {
                let end = (offset + BATCH_SIZE).min(ids.len());
                let batch = ids.get(*offset..end).unwrap_or_default().join(",");
                let mut url = self.endpoint("efetch.fcgi")?;
                url.query_pairs_mut()
                    .append_pair("db", "pubmed")
                    .append_pair("id", &batch)
                    .append_pair("retmode", "xml");
                url
            }
        };
        url.query_pairs_mut().append_pair("api_key", &self.api_key);
        Ok(url.into())
    }

    async fn fetch(&self, url: &str, cursor: PubMedCursor) -> Result<Page<PubMedCursor>, AppError> {
        let Some(body) = self.http.get_text(url).await? else {
            return Ok(Page {
                records: Vec::new(),
                next: cursor.end_search(),
                total: None,
            });
        };

        match cursor {
            PubMedCursor::Search { .. } => match parse_search(&body) {
                Ok((found, total)) => Ok(Page {
                    records: Vec::new(),
                    next: cursor.after_search(found),
                    total,
                }),
                Err(e) => {
                    warn!(url, error = %e, "Unreadable esearch response");
                    Ok(Page {
                        records: Vec::new(),
                        next: cursor.end_search(),
                        total: None,
                    })
                }
            },
            PubMedCursor::Fetch { .. } => match parse_articles(&body) {
                Ok(records) => Ok(Page {
                    records,
                    next: cursor.after_fetch(),
                    total: None,
                }),
                Err(e) => {
                    warn!(url, error = %e, "Unreadable efetch response");
                    Ok(Page::exhausted())
                }
            },
        }
    }
}
