//! Resumable search state.
//!
//! [`SearchState`] is the entire checkpoint payload. Its JSON form is flat:
//!
//! ```json
//! {
//!   "all_results": {},
//!   "total_saved_records": 0,
//!   "item_index": 0,
//!   "keyword_index": 0,
//!   "name_index": 0,
//!   "request_counter": 0,
//!   "request_log": ""
//! }
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::models::{BiasResult, ResultCell};
use crate::terms::TermGrid;

/// Position of the next cell to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeCursor {
    /// Index into the primary terms. Older IEEE checkpoints call it `query_index`.
    #[serde(alias = "query_index")]
    pub item_index: usize,
    pub keyword_index: usize,
    pub name_index: usize,
}

impl ResumeCursor {
    pub fn new(item_index: usize, name_index: usize, keyword_index: usize) -> Self {
        Self {
            item_index,
            keyword_index,
            name_index,
        }
    }
}

/// Running request count and the log of every URL requested.
///
/// The counter only goes back to zero after a daily-budget cooldown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestLedger {
    #[serde(default)]
    pub request_counter: u64,
    #[serde(default)]
    pub request_log: String,
}

impl RequestLedger {
    /// Counts one request and appends its log line. Returns the new count.
    pub fn record(&mut self, label: &str, url: &str) -> u64 {
        self.request_counter += 1;
        self.request_log.push_str(&format!(
            "{} API request #{}: {}\n",
            label, self.request_counter, url
        ));
        self.request_counter
    }

    pub fn reset_counter(&mut self) {
        self.request_counter = 0;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchState {
    pub all_results: IndexMap<String, BiasResult>,
    pub total_saved_records: u64,
    #[serde(flatten)]
    pub cursor: ResumeCursor,
    #[serde(flatten)]
    pub ledger: RequestLedger,
}

impl SearchState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensures a result tree exists for `term`, creating it from the grid.
    pub fn ensure_term(&mut self, term: &str, grid: &TermGrid, keywords: &[String]) {
        if !self.all_results.contains_key(term) {
            self.all_results
                .insert(term.to_string(), BiasResult::for_grid(grid, keywords));
        }
    }

    /// Merges a completed cell and advances the cursor past it.
    ///
    /// The record total and the cursor move together so a checkpoint taken
    /// afterwards never counts a cell it would run again.
    pub fn complete_cell(
        &mut self,
        term: &str,
        name: &str,
        keyword: &str,
        cell: ResultCell,
        next: ResumeCursor,
    ) -> u64 {
        let added = match self.all_results.get_mut(term) {
            Some(result) => result.merge(name, keyword, cell),
            None => 0,
        };
        self.total_saved_records += added;
        self.cursor = next;
        added
    }

    /// Sum of the per-term totals; equals `total_saved_records` when consistent.
    pub fn tree_total(&self) -> u64 {
        self.all_results.values().map(BiasResult::total_records).sum()
    }

    pub fn report(&self) -> FinalReport {
        FinalReport {
            total: self.total_saved_records,
            biases: self.all_results.clone(),
        }
    }
}

/// The document written once a backend finishes every cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalReport {
    #[serde(rename = "Total")]
    pub total: u64,
    #[serde(rename = "Biases")]
    pub biases: IndexMap<String, BiasResult>,
}
