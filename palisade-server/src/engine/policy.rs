//! Lenient parsing of the engine's policy JSON.
//!
//! The ignore-list location varies across engine versions: directly under
//! `files`, or nested under `definition`, with either an `ignore` or an
//! `ignoreRules` field name. Extraction probes an ordered list of candidate
//! layouts and takes the first non-empty hit; anything malformed degrades to
//! an empty list instead of failing the caller.

use serde_json::Value;
use std::collections::BTreeSet;

/// Unique source paths from `policy list --json`, sorted.
pub fn target_paths(json: &str) -> Vec<String> {
    let Ok(Value::Array(entries)) = serde_json::from_str::<Value>(json) else {
        return Vec::new();
    };

    let mut paths = BTreeSet::new();
    for entry in &entries {
        if let Some(path) = entry
            .pointer("/target/path")
            .and_then(Value::as_str)
            .filter(|p| !p.is_empty())
        {
            paths.insert(path.to_string());
        }
    }
    paths.into_iter().collect()
}

/// Candidate locations for the ignore list, probed in order.
const IGNORE_LOCATIONS: [&str; 4] = [
    "/files/ignore",
    "/files/ignoreRules",
    "/definition/files/ignore",
    "/definition/files/ignoreRules",
];

/// Ignore rules from `policy get <path> --json`, first non-empty candidate
/// layout wins. Non-array values and parse failures yield an empty list.
pub fn ignore_rules(json: &str) -> Vec<String> {
    let Ok(doc) = serde_json::from_str::<Value>(json) else {
        return Vec::new();
    };

    for location in IGNORE_LOCATIONS {
        let Some(Value::Array(items)) = doc.pointer(location) else {
            continue;
        };
        let rules: Vec<String> = items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect();
        if !rules.is_empty() {
            return rules;
        }
    }
    Vec::new()
}
