//! Data models for the vault fetcher
//!
//! This module defines the typed shapes of recordings, their file
//! attachments and the persisted snapshot document. Raw API payloads are
//! coerced into these types once, in [`crate::app::normalize`], so nothing
//! downstream deals with untyped JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A recorded video entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vod {
    /// Stable identifier, unique within a snapshot
    pub id: String,
    /// Display title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Channel the recording was made from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    /// Creation time in epoch seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    /// Recording time in epoch seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recorded_at: Option<i64>,
    /// Length of the recording
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u64>,
    /// Identifier of the source broadcast
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitch_id: Option<String>,
    /// File attachments, populated from the detail endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<VodFile>>,
    /// When `files` was last retrieved from the server
    #[serde(
        rename = "filesFetchedAt",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub files_fetched_at: Option<DateTime<Utc>>,
}

impl Vod {
    /// Create an entry carrying only its identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: None,
            channel: None,
            created_at: None,
            recorded_at: None,
            duration_seconds: None,
            twitch_id: None,
            files: None,
            files_fetched_at: None,
        }
    }

    /// Timestamp used for ordering: `recorded_at`, falling back to
    /// `created_at`, falling back to the epoch
    pub fn sort_timestamp(&self) -> i64 {
        self.recorded_at.or(self.created_at).unwrap_or(0)
    }

    /// Whether the entry carries at least one file
    pub fn has_files(&self) -> bool {
        self.files.as_ref().is_some_and(|files| !files.is_empty())
    }
}

/// A file attached to a recording
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VodFile {
    /// Server-side file identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
    /// File name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// Size in bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size_raw: Option<u64>,
    /// Human-readable size
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<String>,
    /// Download link. May expire, so never used as an identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    /// MIME type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Free-form media details (width, height, codec, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

/// Header of a persisted snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMeta {
    /// When the snapshot was produced
    pub generated_at: DateTime<Utc>,
    /// Vault origin the data came from
    pub base_url: String,
    /// User whose recordings were listed
    pub target_user: String,
    /// Number of entries in `vods`
    pub total: usize,
}

/// Complete persisted state of all known entries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Document header
    pub meta: SnapshotMeta,
    /// Entries, newest first
    #[serde(default)]
    pub vods: Vec<Vod>,
}

impl Snapshot {
    /// Build a snapshot stamped with the current time
    pub fn new(base_url: impl Into<String>, target_user: impl Into<String>, vods: Vec<Vod>) -> Self {
        Self {
            meta: SnapshotMeta {
                generated_at: Utc::now(),
                base_url: base_url.into(),
                target_user: target_user.into(),
                total: vods.len(),
            },
            vods,
        }
    }

    /// Look up an entry by id
    pub fn find(&self, id: &str) -> Option<&Vod> {
        self.vods.iter().find(|vod| vod.id == id)
    }

    /// Summary figures for display
    pub fn summary(&self) -> SnapshotSummary {
        let mut summary = SnapshotSummary {
            entries: self.vods.len(),
            ..Default::default()
        };

        for vod in &self.vods {
            if vod.has_files() {
                summary.entries_with_files += 1;
            }
            for file in vod.files.iter().flatten() {
                summary.total_files += 1;
                summary.total_bytes += file.file_size_raw.unwrap_or(0);
            }
        }

        summary
    }
}

/// Aggregate figures over a snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotSummary {
    /// Number of entries
    pub entries: usize,
    /// Entries with a non-empty file list
    pub entries_with_files: usize,
    /// Files across all entries
    pub total_files: usize,
    /// Sum of known file sizes
    pub total_bytes: u64,
}

/// Authenticated account returned by login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Server-side user id
    pub id: String,
    /// Account name
    pub username: String,
}
