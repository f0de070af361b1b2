//! Helpers for pulling record fields out of loosely typed JSON responses.

use litsweep_core::NULL_SENTINEL;
use serde_json::Value;

/// Renders a scalar as text.
///
/// Strings come back unchanged and numbers in their JSON form. Scopus wraps
/// some identifiers as `[{"$": "..."}]`, so the first element's `$` is used
/// for arrays. `null`, objects and empty arrays yield `None`.
pub fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => items.first().and_then(|first| match first {
            Value::Object(map) => text(map.get("$")),
            other => text(Some(other)),
        }),
        Value::Null | Value::Object(_) => None,
    }
}

/// Like [`text`] but substitutes `default` for a missing value.
pub fn text_or(value: Option<&Value>, default: &str) -> String {
    text(value).unwrap_or_else(|| default.to_string())
}

/// Joins the `key` field of every object in `list` with `", "`.
///
/// Entries missing the field contribute the `"null"` sentinel.
pub fn join_names(list: Option<&Value>, key: &str) -> String {
    list.and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|item| text_or(item.get(key), NULL_SENTINEL))
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default()
}

/// Year part of an ISO-like date (`"2021-03-04"` → `"2021"`).
pub fn year_of(date: &str) -> String {
    date.split('-').next().unwrap_or_default().trim().to_string()
}

/// Returns true if `value` is present and carries something other than an
/// empty string or empty collection.
pub fn is_filled(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Object(map)) => !map.is_empty(),
        Some(_) => true,
    }
}
