//! litsweep client - HTTP connectors for the literature-search backends.
//!
//! Each module implements [`litsweep_core::Connector`] for one API:
//!
//! - [`ieee`] - IEEE Xplore, offset pagination against a reported total
//! - [`springer`] - Springer Nature open access, `nextPage` paths
//! - [`scopus`] - Elsevier Scopus, typed `link` entries
//! - [`pubmed`] - NCBI E-utilities, id search followed by batched XML fetches
//!
//! Retries, timeouts and status handling are shared through [`http::HttpFetcher`].

pub mod fields;
pub mod http;
pub mod ieee;
pub mod pubmed;
pub mod scopus;
pub mod springer;

pub use http::HttpFetcher;
pub use ieee::{IeeeConnector, IeeeCursor};
pub use pubmed::{PubMedConnector, PubMedCursor};
pub use scopus::ScopusConnector;
pub use springer::SpringerConnector;

/// Cursor for backends whose responses name the URL of the next page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkCursor {
    /// The first request, built from the query.
    Start,
    /// A follow-up URL taken from the previous response.
    Next(String),
}
