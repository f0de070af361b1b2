//! Domain types shared by every backend: backend identity, normalized records
//! and the per-term result tree.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::terms::TermGrid;

/// Placeholder stored when a backend omits a field it normally reports.
pub const NULL_SENTINEL: &str = "null";

/// Placeholder stored when a backend omits the DOI.
pub const NO_DOI: &str = "No DOI";

/// The literature-search backends a harvest can run against.
///
/// Declaration order is the order used for output files and the combined log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// IEEE Xplore metadata search.
    Ieee,
    /// Springer Nature open-access API.
    Springer,
    /// Elsevier Scopus search API.
    Scopus,
    /// NCBI E-utilities over PubMed.
    PubMed,
}

impl Backend {
    pub const ALL: [Backend; 4] = [
        Backend::Ieee,
        Backend::Springer,
        Backend::Scopus,
        Backend::PubMed,
    ];

    /// Human-readable label used in request log lines.
    pub fn label(self) -> &'static str {
        match self {
            Backend::Ieee => "IEEE",
            Backend::Springer => "Springer",
            Backend::Scopus => "Scopus",
            Backend::PubMed => "PubMed",
        }
    }

    /// Lowercase identifier used in file names, config tables and the CLI.
    pub fn slug(self) -> &'static str {
        match self {
            Backend::Ieee => "ieee",
            Backend::Springer => "springer",
            Backend::Scopus => "scopus",
            Backend::PubMed => "pubmed",
        }
    }

    pub fn checkpoint_file_name(self) -> String {
        format!("checkpoint_{}.json", self.slug())
    }

    pub fn results_file_name(self) -> &'static str {
        match self {
            Backend::Ieee => "1_IEEE_results.json",
            Backend::Springer => "2_springer_results.json",
            Backend::Scopus => "3_scopus_results.json",
            Backend::PubMed => "4_pubmed_results.json",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Backend {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Backend::ALL
            .into_iter()
            .find(|b| b.slug() == wanted)
            .ok_or_else(|| {
                AppError::Generic(format!(
                    "Unknown backend '{}'. Expected one of: ieee, springer, scopus, pubmed",
                    s
                ))
            })
    }
}

/// One bibliographic record normalized across backends.
///
/// Field names on the wire match the result documents downstream tooling
/// already reads, hence the renamed `abstract` and `publication year`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Record {
    pub title: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub authors: Option<String>,
    pub doi: Option<String>,
    pub isbn: Option<String>,
    pub issn: Option<String>,
    #[serde(rename = "publication year")]
    pub publication_year: Option<String>,
}

/// Records fetched for one (bias name, keyword) cell.
pub type ResultCell = Vec<Record>;

/// Keyword → records, in keyword order.
pub type KeywordRecords = IndexMap<String, ResultCell>;

/// Results for a primary term that names a single bias.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlatBias {
    #[serde(rename = "Total records")]
    pub total_records: u64,
    #[serde(rename = "Records")]
    pub records: KeywordRecords,
}

impl FlatBias {
    /// Creates an entry with every keyword present and empty.
    pub fn new(keywords: &[String]) -> Self {
        Self {
            total_records: 0,
            records: keywords.iter().map(|k| (k.clone(), Vec::new())).collect(),
        }
    }

    /// Stores a cell under `keyword` and adds its length to the total.
    pub fn merge(&mut self, keyword: &str, cell: ResultCell) -> u64 {
        let added = cell.len() as u64;
        self.records.insert(keyword.to_string(), cell);
        self.total_records += added;
        added
    }
}

/// Results for a primary term that is a disjunction of several bias names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NestedBias {
    #[serde(rename = "Total records")]
    pub total_records: u64,
    #[serde(rename = "Records")]
    pub records: IndexMap<String, FlatBias>,
}

impl NestedBias {
    pub fn new(names: &[String], keywords: &[String]) -> Self {
        Self {
            total_records: 0,
            records: names
                .iter()
                .map(|n| (n.clone(), FlatBias::new(keywords)))
                .collect(),
        }
    }
}

/// Result tree for one primary term.
///
/// The shape depends on whether the term contained the `" or "` separator.
/// Deserialization tries the flat shape first; a nested entry never matches it
/// because its inner values are objects rather than record arrays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BiasResult {
    Flat(FlatBias),
    Nested(NestedBias),
}

impl BiasResult {
    /// Builds the empty result tree for an expanded primary term.
    pub fn for_grid(grid: &TermGrid, keywords: &[String]) -> Self {
        match grid {
            TermGrid::Flat(_) => BiasResult::Flat(FlatBias::new(keywords)),
            TermGrid::Nested(names) => BiasResult::Nested(NestedBias::new(names, keywords)),
        }
    }

    pub fn total_records(&self) -> u64 {
        match self {
            BiasResult::Flat(flat) => flat.total_records,
            BiasResult::Nested(nested) => nested.total_records,
        }
    }

    /// Merges a completed cell. `name` is ignored for the flat shape.
    ///
    /// Returns the number of records added.
    pub fn merge(&mut self, name: &str, keyword: &str, cell: ResultCell) -> u64 {
        match self {
            BiasResult::Flat(flat) => flat.merge(keyword, cell),
            BiasResult::Nested(nested) => {
                let added = nested
                    .records
                    .entry(name.to_string())
                    .or_default()
                    .merge(keyword, cell);
                nested.total_records += added;
                added
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keywords() -> Vec<String> {
        vec!["bias".to_string(), "fairness".to_string()]
    }

    fn record(title: &str) -> Record {
        Record {
            title: Some(title.to_string()),
            ..Record::default()
        }
    }

    #[test]
    fn test_backend_from_str() {
        assert_eq!("IEEE".parse::<Backend>().unwrap(), Backend::Ieee);
        assert_eq!(" pubmed ".parse::<Backend>().unwrap(), Backend::PubMed);
        assert!("arxiv".parse::<Backend>().is_err());
    }

    #[test]
    fn test_backend_file_names() {
        assert_eq!(Backend::Scopus.checkpoint_file_name(), "checkpoint_scopus.json");
        assert_eq!(Backend::Ieee.results_file_name(), "1_IEEE_results.json");
        assert_eq!(Backend::PubMed.results_file_name(), "4_pubmed_results.json");
    }

    #[test]
    fn test_record_field_names() {
        let json = serde_json::to_value(Record {
            abstract_text: Some("a".into()),
            publication_year: Some("2020".into()),
            ..Record::default()
        })
        .unwrap();
        assert_eq!(json["abstract"], "a");
        assert_eq!(json["publication year"], "2020");
        assert!(json["doi"].is_null());
    }

    #[test]
    fn test_flat_bias_prepopulates_keywords() {
        let flat = FlatBias::new(&keywords());
        assert_eq!(flat.records.len(), 2);
        assert!(flat.records.values().all(Vec::is_empty));
        let order: Vec<_> = flat.records.keys().cloned().collect();
        assert_eq!(order, keywords());
    }

    #[test]
    fn test_nested_merge_updates_both_totals() {
        let grid = TermGrid::Nested(vec!["A".into(), "B".into()]);
        let mut result = BiasResult::for_grid(&grid, &keywords());
        assert_eq!(result.merge("B", "bias", vec![record("1"), record("2")]), 2);
        assert_eq!(result.merge("A", "fairness", vec![record("3")]), 1);

        assert_eq!(result.total_records(), 3);
        let BiasResult::Nested(nested) = &result else {
            panic!("expected nested result");
        };
        assert_eq!(nested.records["B"].total_records, 2);
        assert_eq!(nested.records["A"].total_records, 1);
        assert_eq!(nested.records["B"].records["bias"].len(), 2);
    }

    #[test]
    fn test_bias_result_shapes_survive_json() {
        let mut flat = BiasResult::for_grid(&TermGrid::Flat("A".into()), &keywords());
        flat.merge("A", "bias", vec![record("t")]);
        let mut nested = BiasResult::for_grid(
            &TermGrid::Nested(vec!["A".into(), "B".into()]),
            &keywords(),
        );
        nested.merge("A", "bias", vec![record("t")]);

        let flat_back: BiasResult =
            serde_json::from_str(&serde_json::to_string(&flat).unwrap()).unwrap();
        let nested_back: BiasResult =
            serde_json::from_str(&serde_json::to_string(&nested).unwrap()).unwrap();

        assert!(matches!(flat_back, BiasResult::Flat(_)));
        assert!(matches!(nested_back, BiasResult::Nested(_)));
        assert_eq!(flat_back, flat);
        assert_eq!(nested_back, nested);
    }
}
