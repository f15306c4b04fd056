//! Normalization of raw API records
//!
//! The vault API has shipped several field names for the same attribute over
//! time. Each attribute has an ordered list of candidate keys; the first key
//! present with a non-null value wins. Values are coerced to their typed form
//! here, once, so the merge engine only ever sees [`Vod`] and [`VodFile`].

use chrono::{DateTime, NaiveDateTime};
use serde_json::{Map, Value};
use tracing::debug;

use crate::app::models::{Vod, VodFile};

/// Candidate keys for the entry identifier
pub const VOD_ID_KEYS: &[&str] = &["id", "ID", "vod_id"];
/// Candidate keys for the entry title
pub const VOD_TITLE_KEYS: &[&str] = &["title", "name"];
/// Candidate keys for the channel name
pub const VOD_CHANNEL_KEYS: &[&str] = &["channel", "twitch_channel"];
/// Candidate keys for the creation timestamp
pub const VOD_CREATED_KEYS: &[&str] = &["created_at", "twitch_created_at"];
/// Candidate keys for the recording timestamp
pub const VOD_RECORDED_KEYS: &[&str] = &["recorded_at", "twitch_recorded_at"];
/// Candidate keys for the duration
pub const VOD_DURATION_KEYS: &[&str] = &["duration_seconds", "duration", "twitch_duration"];
/// Candidate keys for the source broadcast id
pub const VOD_TWITCH_ID_KEYS: &[&str] = &["twitch_id", "twitch_vod_id"];

/// Candidate keys for the file identifier
pub const FILE_ID_KEYS: &[&str] = &["fileId", "file_id", "id"];
/// Candidate keys for the file name
pub const FILE_NAME_KEYS: &[&str] = &["fileName", "file_name", "name", "filename"];
/// Candidate keys for the byte count
pub const FILE_SIZE_RAW_KEYS: &[&str] = &["fileSizeRaw", "file_size", "size", "bytes"];
/// Candidate keys for the human-readable size
pub const FILE_SIZE_KEYS: &[&str] = &["fileSize"];
/// Candidate keys for the download link
pub const FILE_URL_KEYS: &[&str] = &["downloadUrl", "download_url", "url"];
/// Candidate keys for the MIME type
pub const FILE_CONTENT_TYPE_KEYS: &[&str] =
    &["contentType", "content_type", "mime_type", "mimeType"];
/// Candidate keys for media metadata
pub const FILE_METADATA_KEYS: &[&str] = &["metadata", "meta"];

/// Map a raw listing record to a [`Vod`]
///
/// Returns `None` when the record is not an object or carries no identity
/// field. Never populates `files`; those come from the detail endpoint.
pub fn normalize_vod(raw: &Value) -> Option<Vod> {
    let record = raw.as_object()?;

    let Some(id) = pick(record, VOD_ID_KEYS).and_then(coerce_string) else {
        debug!("Rejecting listing record without identifier");
        return None;
    };

    Some(Vod {
        id,
        title: pick(record, VOD_TITLE_KEYS).and_then(coerce_string),
        channel: pick(record, VOD_CHANNEL_KEYS).and_then(coerce_string),
        created_at: pick(record, VOD_CREATED_KEYS).and_then(coerce_timestamp),
        recorded_at: pick(record, VOD_RECORDED_KEYS).and_then(coerce_timestamp),
        duration_seconds: pick(record, VOD_DURATION_KEYS).and_then(coerce_u64),
        twitch_id: pick(record, VOD_TWITCH_ID_KEYS).and_then(coerce_string),
        files: None,
        files_fetched_at: None,
    })
}

/// Map a raw detail record to a [`VodFile`]
///
/// Non-object records are rejected. `fileSize` is derived from the byte
/// count when the server does not supply one.
pub fn normalize_file(raw: &Value) -> Option<VodFile> {
    let record = raw.as_object()?;

    let file_size_raw = pick(record, FILE_SIZE_RAW_KEYS).and_then(coerce_u64);
    let file_size = pick(record, FILE_SIZE_KEYS)
        .and_then(coerce_string)
        .or_else(|| file_size_raw.map(format_bytes));

    Some(VodFile {
        file_id: pick(record, FILE_ID_KEYS).and_then(coerce_string),
        file_name: pick(record, FILE_NAME_KEYS).and_then(coerce_string),
        file_size_raw,
        file_size,
        download_url: pick(record, FILE_URL_KEYS).and_then(coerce_string),
        content_type: pick(record, FILE_CONTENT_TYPE_KEYS).and_then(coerce_string),
        metadata: pick(record, FILE_METADATA_KEYS).and_then(|value| value.as_object().cloned()),
    })
}

/// Format bytes in human-readable format
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const THRESHOLD: u64 = 1024;

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= THRESHOLD as f64 && unit_index < UNITS.len() - 1 {
        size /= THRESHOLD as f64;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}

/// First candidate key present with a non-null value
fn pick<'a>(record: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| record.get(*key))
        .find(|value| !value.is_null())
}

pub(crate) fn coerce_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn coerce_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<u64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite() && *f >= 0.0)
                    .map(|f| f.round() as u64)
            })
        }
        _ => None,
    }
}

/// Coerce a timestamp-like value to epoch seconds
///
/// Accepts numbers, numeric strings, RFC 3339 strings and
/// `YYYY-MM-DD HH:MM:SS` strings (taken as UTC).
pub fn coerce_timestamp(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => parse_timestamp_str(s.trim()),
        _ => None,
    }
}

fn parse_timestamp_str(s: &str) -> Option<i64> {
    if s.is_empty() {
        return None;
    }
    if let Ok(secs) = s.parse::<i64>() {
        return Some(secs);
    }
    if let Ok(secs) = s.parse::<f64>() {
        return secs.is_finite().then_some(secs as i64);
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(s) {
        return Some(parsed.timestamp());
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc().timestamp());
        }
    }

    debug!("Unparseable timestamp value: {}", s);
    None
}
