//! litsweep core - domain types, checkpoints and the resumable search engine.
//!
//! The engine is backend-agnostic: each search API plugs in through the
//! [`Connector`] trait, and [`Harvester`] drives it through every
//! (primary term × bias name × keyword) cell with a checkpoint after each.

pub mod checkpoint;
pub mod config;
pub mod connector;
pub mod error;
pub mod harvest;
pub mod models;
pub mod observer;
pub mod pager;
pub mod state;
pub mod summary;
pub mod terms;

pub use checkpoint::{write_report, CheckpointStore};
pub use config::{
    default_config_path, load_harvest_config, load_or_default, BackendEntry, HarvestConfig,
    HttpConfig, Pacing, TermsConfig,
};
pub use connector::{Connector, Page};
pub use error::AppError;
pub use harvest::Harvester;
pub use models::{Backend, BiasResult, FlatBias, NestedBias, Record, ResultCell, NO_DOI, NULL_SENTINEL};
pub use observer::{HarvestObserver, NoopObserver};
pub use pager::Pager;
pub use state::{FinalReport, RequestLedger, ResumeCursor, SearchState};
pub use summary::{BackendHarvestResult, BatchHarvestSummary, HarvestOutcome, HarvestStats};
pub use terms::{bias_names, expand, TermGrid};
