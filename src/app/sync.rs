//! Sync orchestration
//!
//! Drives one incremental run over any [`VodSource`]: list every page,
//! classify the listing against the prior snapshot, fetch file details for
//! the entries that need them (one at a time, in listing order) and build the
//! next snapshot. Nothing is written here; persistence is left to the caller
//! so that a failed run leaves the previous document untouched.

use std::collections::HashMap;

use chrono::Utc;
use tracing::{debug, info};

use crate::app::client::VodSource;
use crate::app::merge::{Decision, FetchReason, MergeCounts, MergePlan};
use crate::app::models::Snapshot;
use crate::errors::FetchResult;

/// Parameters of one sync run
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Vault origin recorded in the snapshot metadata
    pub base_url: String,
    /// Account whose recordings are listed
    pub target_user: String,
    /// Listing page size
    pub page_size: usize,
    /// Re-fetch file details for every listed entry
    pub refresh_all: bool,
}

/// Receives progress notifications from a sync run
///
/// All methods default to doing nothing.
pub trait SyncObserver {
    /// Listing finished with `records` raw records
    fn listed(&mut self, _records: usize) {}

    /// Planning finished; `counts.fetches()` detail requests will follow
    fn planned(&mut self, _counts: &MergeCounts) {}

    /// Details for `vod_id` are about to be fetched
    fn fetching(&mut self, _vod_id: &str, _reason: FetchReason) {}

    /// Details for `vod_id` arrived with `files` entries
    fn fetched(&mut self, _vod_id: &str, _files: usize) {}

    /// All detail requests completed
    fn finished(&mut self) {}
}

/// Observer that ignores every notification
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl SyncObserver for NoopObserver {}

/// Result of a completed sync run
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    /// The new snapshot, ready to be saved
    pub snapshot: Snapshot,
    /// Merge tallies
    pub counts: MergeCounts,
    /// Detail requests issued
    pub fetched: usize,
}

/// List every page and classify the result without fetching any details
///
/// # Errors
///
/// Returns `FetchError` if any listing page fails
pub async fn plan_sync<S: VodSource>(
    source: &mut S,
    prior: Option<&Snapshot>,
    options: &SyncOptions,
) -> FetchResult<MergePlan> {
    let listing = source
        .list_all(&options.target_user, options.page_size)
        .await?;
    Ok(MergePlan::build(&listing, prior, options.refresh_all))
}

/// Run one incremental sync
///
/// # Errors
///
/// Returns `FetchError` on the first failing listing or detail request; no
/// partial snapshot is produced.
pub async fn sync_snapshot<S, O>(
    source: &mut S,
    prior: Option<&Snapshot>,
    options: &SyncOptions,
    observer: &mut O,
) -> FetchResult<SyncOutcome>
where
    S: VodSource,
    O: SyncObserver + ?Sized,
{
    let listing = source
        .list_all(&options.target_user, options.page_size)
        .await?;
    observer.listed(listing.len());

    let plan = MergePlan::build(&listing, prior, options.refresh_all);
    let counts = plan.counts;
    info!(
        "Planned sync: {} new, {} refreshed, {} reused, {} retained",
        counts.new, counts.refreshed, counts.reused, counts.retained
    );
    observer.planned(&counts);

    let targets: Vec<(String, FetchReason)> = plan
        .entries
        .iter()
        .filter_map(|entry| match entry.decision {
            Decision::Fetch(reason) => Some((entry.fresh.id.clone(), reason)),
            Decision::Reuse => None,
        })
        .collect();

    let mut fetched = HashMap::with_capacity(targets.len());
    for (vod_id, reason) in targets {
        observer.fetching(&vod_id, reason);
        debug!("Fetching files for {} ({})", vod_id, reason);
        let files = source.fetch_files(&vod_id).await?;
        observer.fetched(&vod_id, files.len());
        fetched.insert(vod_id, files);
    }
    observer.finished();

    let fetched_count = fetched.len();
    let vods = plan.finish(fetched, Utc::now());
    let snapshot = Snapshot::new(&options.base_url, &options.target_user, vods);

    info!(
        "Sync complete: {} entries, {} detail requests",
        snapshot.vods.len(),
        fetched_count
    );

    Ok(SyncOutcome {
        snapshot,
        counts,
        fetched: fetched_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::models::{Vod, VodFile};
    use chrono::TimeZone;
    use serde_json::{json, Value};

    /// In-memory vault with a fixed listing and per-id files
    #[derive(Default)]
    struct MemorySource {
        listing: Vec<Value>,
        files: HashMap<String, Vec<VodFile>>,
        detail_requests: Vec<String>,
    }

    impl VodSource for MemorySource {
        async fn list_page(
            &mut self,
            _target_user: &str,
            page: usize,
            page_size: usize,
        ) -> FetchResult<Vec<Value>> {
            Ok(self
                .listing
                .iter()
                .skip((page - 1) * page_size)
                .take(page_size)
                .cloned()
                .collect())
        }

        async fn fetch_files(&mut self, vod_id: &str) -> FetchResult<Vec<VodFile>> {
            self.detail_requests.push(vod_id.to_string());
            Ok(self.files.get(vod_id).cloned().unwrap_or_default())
        }
    }

    /// Records observer notifications
    #[derive(Default)]
    struct RecordingObserver {
        listed: usize,
        fetching: Vec<String>,
        finished: bool,
    }

    impl SyncObserver for RecordingObserver {
        fn listed(&mut self, records: usize) {
            self.listed = records;
        }

        fn fetching(&mut self, vod_id: &str, _reason: FetchReason) {
            self.fetching.push(vod_id.to_string());
        }

        fn finished(&mut self) {
            self.finished = true;
        }
    }

    fn options() -> SyncOptions {
        SyncOptions {
            base_url: "https://vault.example".to_string(),
            target_user: "alice".to_string(),
            page_size: 2,
            refresh_all: false,
        }
    }

    fn file(name: &str) -> VodFile {
        VodFile {
            file_name: Some(name.to_string()),
            file_size_raw: Some(2048),
            file_size: Some("2.00 KB".to_string()),
            ..Default::default()
        }
    }

    fn source() -> MemorySource {
        let mut source = MemorySource {
            listing: vec![
                json!({ "id": "1", "title": "one", "recorded_at": 100 }),
                json!({ "id": "2", "title": "two", "recorded_at": 300 }),
                json!({ "id": "3", "title": "three", "recorded_at": 200 }),
            ],
            ..Default::default()
        };
        for id in ["1", "2", "3"] {
            source
                .files
                .insert(id.to_string(), vec![file(&format!("{}.mp4", id))]);
        }
        source
    }

    #[tokio::test]
    async fn test_first_run_fetches_every_entry_once() {
        let mut source = source();
        let mut observer = RecordingObserver::default();

        let outcome = sync_snapshot(&mut source, None, &options(), &mut observer)
            .await
            .unwrap();

        assert_eq!(source.detail_requests, vec!["1", "2", "3"]);
        assert_eq!(outcome.fetched, 3);
        assert_eq!(outcome.counts.new, 3);
        assert_eq!(observer.listed, 3);
        assert_eq!(observer.fetching, vec!["1", "2", "3"]);
        assert!(observer.finished);

        let ids: Vec<&str> = outcome.snapshot.vods.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "3", "1"]);
        assert_eq!(outcome.snapshot.meta.total, 3);
        assert_eq!(outcome.snapshot.meta.target_user, "alice");
        assert!(outcome
            .snapshot
            .vods
            .iter()
            .all(|v| v.has_files() && v.files_fetched_at.is_some()));
    }

    #[tokio::test]
    async fn test_second_run_is_idempotent() {
        let mut source = source();
        let first = sync_snapshot(&mut source, None, &options(), &mut NoopObserver)
            .await
            .unwrap();

        source.detail_requests.clear();
        let second = sync_snapshot(
            &mut source,
            Some(&first.snapshot),
            &options(),
            &mut NoopObserver,
        )
        .await
        .unwrap();

        assert!(source.detail_requests.is_empty());
        assert_eq!(second.fetched, 0);
        assert_eq!(second.counts.reused, 3);
        assert_eq!(
            serde_json::to_value(&first.snapshot.vods).unwrap(),
            serde_json::to_value(&second.snapshot.vods).unwrap()
        );
        assert_eq!(first.snapshot.meta.total, second.snapshot.meta.total);
    }

    #[tokio::test]
    async fn test_only_stale_and_new_entries_are_fetched() {
        let fetched_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        let mut fresh = Vod::new("1");
        fresh.recorded_at = Some(100);
        fresh.files = Some(vec![file("kept.mp4")]);
        fresh.files_fetched_at = Some(fetched_at);

        let mut empty = Vod::new("2");
        empty.recorded_at = Some(300);
        empty.files = Some(Vec::new());
        empty.files_fetched_at = Some(fetched_at);

        let prior = Snapshot::new("https://vault.example", "alice", vec![empty, fresh]);

        let mut source = source();
        let outcome = sync_snapshot(&mut source, Some(&prior), &options(), &mut NoopObserver)
            .await
            .unwrap();

        assert_eq!(source.detail_requests, vec!["2", "3"]);
        assert_eq!(outcome.counts.new, 1);
        assert_eq!(outcome.counts.refreshed, 1);
        assert_eq!(outcome.counts.reused, 1);

        let kept = outcome.snapshot.find("1").unwrap();
        assert_eq!(kept.files.as_ref().unwrap()[0].file_name.as_deref(), Some("kept.mp4"));
        assert_eq!(kept.files_fetched_at, Some(fetched_at));

        let refreshed = outcome.snapshot.find("2").unwrap();
        assert!(refreshed.has_files());
        assert_ne!(refreshed.files_fetched_at, Some(fetched_at));
    }

    #[tokio::test]
    async fn test_refresh_all_fetches_everything() {
        let mut source = source();
        let first = sync_snapshot(&mut source, None, &options(), &mut NoopObserver)
            .await
            .unwrap();

        source.detail_requests.clear();
        let options = SyncOptions {
            refresh_all: true,
            ..options()
        };
        let second = sync_snapshot(&mut source, Some(&first.snapshot), &options, &mut NoopObserver)
            .await
            .unwrap();

        assert_eq!(source.detail_requests.len(), 3);
        assert_eq!(second.counts.refreshed, 3);
    }

    #[tokio::test]
    async fn test_plan_sync_issues_no_detail_requests() {
        let mut source = source();
        let plan = plan_sync(&mut source, None, &options()).await.unwrap();

        assert_eq!(plan.counts.fetches(), 3);
        assert_eq!(plan.ids_to_fetch().collect::<Vec<_>>(), vec!["1", "2", "3"]);
        assert!(source.detail_requests.is_empty());
    }
}
