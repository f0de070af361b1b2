//! litsweep CLI - command-line front end for the litsweep harvester
//!
//! This crate ties the engine in `litsweep-core` to the HTTP connectors in
//! `litsweep-client`.

pub mod config;
pub mod harvest;
pub mod observer;

pub use config::{Command, Config, Credentials, HarvestArgs};
pub use harvest::{print_summary, reset, run_harvest, show_status, HarvestPlan};
pub use observer::TracingObserver;
