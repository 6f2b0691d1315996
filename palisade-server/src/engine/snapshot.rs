//! Snapshot listings as reported by the engine. Snapshots are owned by the
//! engine and read-only here; malformed entries are skipped rather than
//! failing the listing.

use chrono::{DateTime, Local};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub source: SnapshotSource,
    /// UTC instant in RFC 3339 form; string ordering matches time ordering.
    #[serde(default, rename = "startTime")]
    pub start_time: String,
    #[serde(default)]
    pub stats: SnapshotStats,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SnapshotSource {
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SnapshotStats {
    #[serde(default, rename = "totalSize")]
    pub total_size: u64,
    #[serde(default, rename = "fileCount")]
    pub file_count: u64,
}

/// Parses `snapshot list --json` output, dropping entries that do not
/// deserialize. A malformed document degrades to an empty list.
pub fn parse_list(json: &str) -> Vec<Snapshot> {
    let Ok(entries) = serde_json::from_str::<Vec<serde_json::Value>>(json) else {
        return Vec::new();
    };
    entries
        .into_iter()
        .filter_map(|v| serde_json::from_value(v).ok())
        .filter(|s: &Snapshot| !s.id.is_empty())
        .collect()
}

/// The most recent snapshot id per source path: entries ordered by start
/// time descending, first occurrence per path wins. Result keeps that
/// newest-first ordering. Entries without a source path are dropped.
pub fn latest_per_source(mut snapshots: Vec<Snapshot>) -> Vec<(String, String)> {
    snapshots.sort_by(|a, b| b.start_time.cmp(&a.start_time));

    let mut seen = std::collections::HashSet::new();
    let mut latest = Vec::new();
    for snap in snapshots {
        if snap.source.path.is_empty() || !seen.insert(snap.source.path.clone()) {
            continue;
        }
        latest.push((snap.source.path, snap.id));
    }
    latest
}

/// Snapshot start time rendered in the server's local timezone; falls back
/// to the raw value when it does not parse.
pub fn display_time(start_time: &str) -> String {
    match DateTime::parse_from_rfc3339(start_time) {
        Ok(dt) => dt
            .with_timezone(&Local)
            .format("%Y-%m-%d %I:%M %p")
            .to_string(),
        Err(_) => start_time.to_string(),
    }
}

pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    const GB: u64 = 1024 * MB;
    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

pub fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(id: &str, path: &str, start_time: &str) -> Snapshot {
        Snapshot {
            id: id.into(),
            source: SnapshotSource { path: path.into() },
            start_time: start_time.into(),
            stats: SnapshotStats::default(),
        }
    }

    #[test]
    fn test_parse_list_skips_malformed_entries() {
        let json = r#"[
            {"id": "abc123", "source": {"path": "/host/a"}, "startTime": "2024-06-01T03:00:00Z",
             "stats": {"totalSize": 2048, "fileCount": 12}},
            {"id": ""},
            "not an object"
        ]"#;
        let snaps = parse_list(json);
        assert_eq!(snaps.len(), 1);
        assert_eq!(snaps[0].id, "abc123");
        assert_eq!(snaps[0].source.path, "/host/a");
        assert_eq!(snaps[0].stats.total_size, 2048);
        assert_eq!(snaps[0].stats.file_count, 12);
    }

    #[test]
    fn test_parse_list_malformed_document() {
        assert!(parse_list("not json").is_empty());
        assert!(parse_list("{}").is_empty());
    }

    #[test]
    fn test_latest_per_source_newest_wins() {
        let snaps = vec![
            snap("old-a", "/host/a", "2024-05-01T03:00:00Z"),
            snap("new-b", "/host/b", "2024-06-02T03:00:00Z"),
            snap("new-a", "/host/a", "2024-06-01T03:00:00Z"),
            snap("orphan", "", "2024-06-03T03:00:00Z"),
        ];
        let latest = latest_per_source(snaps);
        assert_eq!(
            latest,
            vec![
                ("/host/b".to_string(), "new-b".to_string()),
                ("/host/a".to_string(), "new-a".to_string()),
            ]
        );
    }

    #[test]
    fn test_latest_per_source_tie_first_occurrence_wins() {
        let snaps = vec![
            snap("first", "/host/a", "2024-06-01T03:00:00Z"),
            snap("second", "/host/a", "2024-06-01T03:00:00Z"),
        ];
        let latest = latest_per_source(snaps);
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].1, "first");
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
        assert_eq!(format_size(5 * 1024 * 1024 * 1024), "5.0 GB");
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("abcdef1234567890"), "abcdef12");
        assert_eq!(short_id("abc"), "abc");
    }

    #[test]
    fn test_display_time_fallback() {
        assert_eq!(display_time("garbage"), "garbage");
    }
}
