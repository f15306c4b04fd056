//! Recording listing and file detail requests
//!
//! [`VodSource`] is the seam between the sync engine and the network: the
//! vault client implements it over HTTP, tests implement it in memory.

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::app::models::VodFile;
use crate::app::normalize::normalize_file;
use crate::errors::{FetchError, FetchResult};

/// Provider of recording listings and per-recording file details
#[allow(async_fn_in_trait)]
pub trait VodSource {
    /// Fetch one listing page of raw recording records (pages start at 1)
    async fn list_page(
        &mut self,
        target_user: &str,
        page: usize,
        page_size: usize,
    ) -> FetchResult<Vec<Value>>;

    /// Fetch the file list of one recording
    async fn fetch_files(&mut self, vod_id: &str) -> FetchResult<Vec<VodFile>>;

    /// Fetch every listing page in order
    ///
    /// Enumeration ends at the first page that is empty or shorter than
    /// `page_size`.
    async fn list_all(&mut self, target_user: &str, page_size: usize) -> FetchResult<Vec<Value>> {
        let mut records = Vec::new();
        let mut page = 1;

        loop {
            let batch = self.list_page(target_user, page, page_size).await?;
            let count = batch.len();
            debug!("Listing page {} returned {} records", page, count);
            records.extend(batch);

            if count == 0 || count < page_size {
                break;
            }
            page += 1;
        }

        info!("Listed {} records over {} pages", records.len(), page);
        Ok(records)
    }
}

/// Parse a response body as JSON
pub fn parse_body(url: &str, body: &str) -> FetchResult<Value> {
    serde_json::from_str(body).map_err(|source| FetchError::InvalidBody {
        url: url.to_string(),
        source,
    })
}

/// Records of a listing page; a missing or non-array `data` is an empty page
pub fn listing_records(value: Value) -> Vec<Value> {
    match value {
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(records)) => records,
            Some(other) => {
                warn!("Listing data is not an array ({}), treating page as empty", type_name(&other));
                Vec::new()
            }
            None => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// Files of a detail response
///
/// Files may arrive under `data` or `files`; the first of those holding an
/// array is used. Anything else yields an empty list.
pub fn detail_files(value: &Value) -> Vec<VodFile> {
    ["data", "files"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_array))
        .map(|records| records.iter().filter_map(normalize_file).collect())
        .unwrap_or_default()
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
