//! Primary-term expansion.
//!
//! A primary term may name several alternative biases joined by the literal
//! separator `" or "`. Splitting is purely lexical and case-sensitive.

/// Separator between alternative bias names inside a primary term.
pub const BIAS_SEPARATOR: &str = " or ";

/// Iteration grid for one primary term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TermGrid {
    /// Single bias name; cells are keyed by keyword only.
    Flat(String),
    /// Several bias names; cells are keyed by name, then keyword.
    Nested(Vec<String>),
}

impl TermGrid {
    /// Bias names in iteration order.
    pub fn names(&self) -> &[String] {
        match self {
            TermGrid::Flat(name) => std::slice::from_ref(name),
            TermGrid::Nested(names) => names,
        }
    }
}

/// Splits a primary term into its bias names.
///
/// ```
/// use litsweep_core::terms::bias_names;
///
/// assert_eq!(bias_names("A or B or C"), vec!["A", "B", "C"]);
/// assert_eq!(bias_names("Or else"), vec!["Or else"]);
/// assert_eq!(bias_names(""), vec![""]);
/// ```
pub fn bias_names(term: &str) -> Vec<String> {
    term.split(BIAS_SEPARATOR)
        .map(|name| name.trim().to_string())
        .collect()
}

pub fn expand(term: &str) -> TermGrid {
    let mut names = bias_names(term);
    if names.len() == 1 {
        TermGrid::Flat(names.remove(0))
    } else {
        TermGrid::Nested(names)
    }
}

/// Enumerates every (bias name, keyword) cell of a primary term in the order
/// the orchestrator visits them.
pub fn cells<'a>(
    grid: &'a TermGrid,
    keywords: &'a [String],
) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
    grid.names().iter().flat_map(move |name| {
        keywords
            .iter()
            .map(move |kw| (name.as_str(), kw.as_str()))
    })
}
