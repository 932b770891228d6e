//! Heuristic extraction of domain values from tool response content.
//!
//! Servers answer listing tools with text content in one of three shapes:
//! a JSON array, a legacy space-separated bracket list (`[a b c]`), or
//! prose with a `databases:`/`tables:` marker followed by a comma-separated
//! list. Each shape is handled by a pure parsing strategy returning
//! `Option` ("no match"), tried in that order. Extractors yield a
//! well-formed list or nothing — shape faults never escape this module.

use serde_json::Value as JsonValue;

use crate::{ConnectionInfo, TestResult};

/// System schemas excluded from user-facing test targets.
const SYSTEM_DATABASES: [&str; 5] = [
    "information_schema",
    "performance_schema",
    "mysql",
    "sys",
    "innodb",
];

/// System databases substituted back in when filtering leaves nothing.
const FALLBACK_SYSTEM_DATABASES: [&str; 2] = ["information_schema", "mysql"];

// The caps below bound the number of downstream test calls in a discovery
// run; they do not reflect server truth.
const MAX_USER_DATABASES: usize = 3;
const MAX_FALLBACK_SYSTEM_DATABASES: usize = 2;
const MAX_TABLES: usize = 2;

/// Extracts connection descriptors from a `list_connections` response.
///
/// The first text entry parsing as a JSON array of descriptors wins; a
/// listing whose entries cannot be decoded yields nothing.
pub fn connections(result: &TestResult) -> Vec<ConnectionInfo> {
    for text in text_entries(result) {
        let Ok(value) = serde_json::from_str::<JsonValue>(text) else {
            continue;
        };
        if !value.is_array() {
            continue;
        }
        if let Ok(connections) = serde_json::from_value::<Vec<ConnectionInfo>>(value) {
            return connections;
        }
    }
    Vec::new()
}

/// Extracts database names from a `list_databases` (or `list_schemas`)
/// response, excluding system schemas.
///
/// Capped at 3 user databases; when filtering leaves nothing, up to 2 known
/// system databases are substituted back in so the drill-down still runs.
pub fn databases(result: &TestResult) -> Vec<String> {
    filter_system_databases(extract_names(result, "databases:", string_name))
}

/// Extracts table names from a `list_tables` response, capped at 2 entries
/// regardless of source format.
pub fn tables(result: &TestResult) -> Vec<String> {
    let mut names = extract_names(result, "tables:", table_name);
    names.truncate(MAX_TABLES);
    names
}

/// Runs the ordered strategy chain over every text content entry.
///
/// A non-empty JSON-array parse ends the scan immediately; a bracket list
/// replaces anything gathered so far; marker lists accumulate across
/// entries.
fn extract_names(
    result: &TestResult,
    marker: &str,
    element: fn(&JsonValue) -> Option<String>,
) -> Vec<String> {
    let mut names = Vec::new();
    for text in text_entries(result) {
        match parse_json_array(text, element) {
            Some(parsed) if !parsed.is_empty() => return parsed,
            Some(_) => continue,
            None => {}
        }
        if let Some(parsed) = parse_bracket_list(text) {
            if !parsed.is_empty() {
                names = parsed;
            }
            continue;
        }
        if let Some(parsed) = parse_marker_list(text, marker) {
            names.extend(parsed);
        }
    }
    names
}

/// Text-typed entries of `result.content`; empty for failed results or any
/// unexpected response shape.
fn text_entries(result: &TestResult) -> Vec<&str> {
    if !result.success || !result.error.is_empty() {
        return Vec::new();
    }
    let Some(content) = result
        .response
        .pointer("/result/content")
        .and_then(JsonValue::as_array)
    else {
        return Vec::new();
    };
    content
        .iter()
        .filter(|item| item.get("type").and_then(JsonValue::as_str) == Some("text"))
        .filter_map(|item| item.get("text").and_then(JsonValue::as_str))
        .collect()
}

/// Strategy 1: the text is a JSON array; elements are mapped through
/// `element` and non-conforming ones are dropped.
fn parse_json_array(text: &str, element: fn(&JsonValue) -> Option<String>) -> Option<Vec<String>> {
    let value = serde_json::from_str::<JsonValue>(text).ok()?;
    let items = value.as_array()?;
    Some(items.iter().filter_map(element).collect())
}

/// Strategy 2: legacy `[a b c]` format, space-separated inside brackets.
fn parse_bracket_list(text: &str) -> Option<Vec<String>> {
    let inner = text.strip_prefix('[')?.strip_suffix(']')?;
    Some(inner.split_whitespace().map(str::to_string).collect())
}

/// Strategy 3: `... databases: a, b, c` marker text.
fn parse_marker_list(text: &str, marker: &str) -> Option<Vec<String>> {
    if !text.to_lowercase().contains(marker) {
        return None;
    }
    let list = text.split(':').nth(1)?;
    Some(
        list.split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect(),
    )
}

fn string_name(value: &JsonValue) -> Option<String> {
    value.as_str().map(str::to_string)
}

/// Table entries are plain strings or mappings with a `name` key.
fn table_name(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(name) => Some(name.clone()),
        JsonValue::Object(map) => map
            .get("name")
            .and_then(JsonValue::as_str)
            .map(str::to_string),
        _ => None,
    }
}

fn filter_system_databases(names: Vec<String>) -> Vec<String> {
    let mut filtered = Vec::new();
    for name in &names {
        if !SYSTEM_DATABASES.contains(&name.to_lowercase().as_str()) {
            filtered.push(name.clone());
        }
        if filtered.len() >= MAX_USER_DATABASES {
            break;
        }
    }
    // Nothing but system catalogs: keep a couple so the drill-down still
    // has a target.
    if filtered.is_empty() {
        for name in &names {
            if FALLBACK_SYSTEM_DATABASES.contains(&name.to_lowercase().as_str()) {
                filtered.push(name.clone());
            }
            if filtered.len() >= MAX_FALLBACK_SYSTEM_DATABASES {
                break;
            }
        }
    }
    filtered
}
