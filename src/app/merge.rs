//! Incremental merge of a fresh listing with a prior snapshot
//!
//! The merge engine decides, per recording, whether the file list must be
//! fetched from the detail endpoint or can be carried forward from the prior
//! snapshot, then overlays fresh descriptive fields onto prior ones.
//!
//! Decision rules, evaluated against the prior entry with the same id:
//!
//! 1. no prior entry: fetch ([`FetchReason::New`])
//! 2. prior entry without files, or with an empty list: fetch
//!    ([`FetchReason::MissingFiles`])
//! 3. prior entry with files but no `filesFetchedAt`: fetch
//!    ([`FetchReason::UnknownFreshness`])
//! 4. otherwise: reuse the prior files and `filesFetchedAt`
//!
//! Entries are never dropped. Prior entries missing from the fresh listing are
//! retained unchanged.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, warn};

use crate::app::models::{Snapshot, Vod, VodFile};
use crate::app::normalize::normalize_vod;

/// Why an entry's files must be fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchReason {
    /// Never seen before
    New,
    /// Prior entry has no files or an empty list
    MissingFiles,
    /// Prior entry has files but no fetch timestamp
    UnknownFreshness,
    /// Caller asked for every entry to be refreshed
    Forced,
}

impl std::fmt::Display for FetchReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::New => "new",
            Self::MissingFiles => "missing files",
            Self::UnknownFreshness => "unknown freshness",
            Self::Forced => "forced refresh",
        };
        write!(f, "{}", label)
    }
}

/// What to do with an entry's files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Fetch files from the detail endpoint
    Fetch(FetchReason),
    /// Carry prior files forward
    Reuse,
}

impl Decision {
    /// Whether a detail fetch is required
    pub fn needs_fetch(&self) -> bool {
        matches!(self, Self::Fetch(_))
    }
}

/// Classify an entry against its prior state
pub fn decide(prior: Option<&Vod>, refresh_all: bool) -> Decision {
    let Some(prior) = prior else {
        return Decision::Fetch(FetchReason::New);
    };

    if !prior.has_files() {
        Decision::Fetch(FetchReason::MissingFiles)
    } else if prior.files_fetched_at.is_none() {
        Decision::Fetch(FetchReason::UnknownFreshness)
    } else if refresh_all {
        Decision::Fetch(FetchReason::Forced)
    } else {
        Decision::Reuse
    }
}

/// Tallies reported at the end of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeCounts {
    /// Ids absent from the prior snapshot
    pub new: usize,
    /// Known ids whose files were re-fetched
    pub refreshed: usize,
    /// Known ids whose files were carried forward
    pub reused: usize,
    /// Prior entries missing from the fresh listing, kept unchanged
    pub retained: usize,
    /// Listing records without an identifier
    pub rejected: usize,
    /// Repeated ids in the listing (first occurrence wins)
    pub duplicates: usize,
}

impl MergeCounts {
    /// Number of detail fetches the plan requires
    pub fn fetches(&self) -> usize {
        self.new + self.refreshed
    }
}

/// A listing entry together with its prior state and decision
#[derive(Debug, Clone)]
pub struct PlannedVod {
    /// Freshly normalized entry
    pub fresh: Vod,
    /// Entry with the same id in the prior snapshot
    pub prior: Option<Vod>,
    /// What to do with its files
    pub decision: Decision,
}

/// Classification of a fresh listing against a prior snapshot
#[derive(Debug, Clone, Default)]
pub struct MergePlan {
    /// Listing entries, in listing order
    pub entries: Vec<PlannedVod>,
    /// Prior entries absent from the listing
    pub retained: Vec<Vod>,
    /// Tallies
    pub counts: MergeCounts,
}

impl MergePlan {
    /// Normalize a raw listing and classify each entry
    pub fn build(raw_listing: &[Value], prior: Option<&Snapshot>, refresh_all: bool) -> Self {
        let prior_index: HashMap<&str, &Vod> = prior
            .map(|snapshot| {
                snapshot
                    .vods
                    .iter()
                    .map(|vod| (vod.id.as_str(), vod))
                    .collect()
            })
            .unwrap_or_default();

        let mut plan = Self::default();
        let mut seen: HashSet<String> = HashSet::new();

        for raw in raw_listing {
            let Some(fresh) = normalize_vod(raw) else {
                plan.counts.rejected += 1;
                continue;
            };

            if !seen.insert(fresh.id.clone()) {
                warn!("Duplicate id {} in listing, keeping first occurrence", fresh.id);
                plan.counts.duplicates += 1;
                continue;
            }

            let prior_vod = prior_index.get(fresh.id.as_str()).copied();
            let decision = decide(prior_vod, refresh_all);
            match decision {
                Decision::Fetch(FetchReason::New) => plan.counts.new += 1,
                Decision::Fetch(_) => plan.counts.refreshed += 1,
                Decision::Reuse => plan.counts.reused += 1,
            }
            debug!("Entry {}: {:?}", fresh.id, decision);

            plan.entries.push(PlannedVod {
                fresh,
                prior: prior_vod.cloned(),
                decision,
            });
        }

        if let Some(snapshot) = prior {
            plan.retained = snapshot
                .vods
                .iter()
                .filter(|vod| !seen.contains(&vod.id))
                .cloned()
                .collect();
            plan.counts.retained = plan.retained.len();
        }

        plan
    }

    /// Ids requiring a detail fetch, in listing order
    pub fn ids_to_fetch(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|entry| entry.decision.needs_fetch())
            .map(|entry| entry.fresh.id.as_str())
    }

    /// Combine the plan with fetched file lists into the final ordered entries
    ///
    /// `fetched` maps ids to the files returned by the detail endpoint; every
    /// id yielded by [`MergePlan::ids_to_fetch`] is expected to be present.
    pub fn finish(
        self,
        mut fetched: HashMap<String, Vec<VodFile>>,
        fetched_at: DateTime<Utc>,
    ) -> Vec<Vod> {
        let mut vods: Vec<Vod> = Vec::with_capacity(self.entries.len() + self.retained.len());

        for entry in self.entries {
            let merged = match entry.decision {
                Decision::Fetch(_) => {
                    let files = fetched.remove(&entry.fresh.id).unwrap_or_else(|| {
                        warn!("No fetched files supplied for {}, storing none", entry.fresh.id);
                        Vec::new()
                    });
                    merge_fetched(entry.fresh, entry.prior.as_ref(), files, fetched_at)
                }
                Decision::Reuse => merge_reused(entry.fresh, entry.prior.as_ref()),
            };
            vods.push(merged);
        }

        vods.extend(self.retained);
        sort_newest_first(&mut vods);
        vods
    }
}

/// Overlay fresh descriptive fields onto the prior entry
///
/// Fresh values win; fields the fresh entry leaves unset fall back to the
/// prior value. `files` and `filesFetchedAt` are left for the caller.
pub fn overlay(fresh: Vod, prior: Option<&Vod>) -> Vod {
    let Some(prior) = prior else {
        return fresh;
    };

    Vod {
        id: fresh.id,
        title: fresh.title.or_else(|| prior.title.clone()),
        channel: fresh.channel.or_else(|| prior.channel.clone()),
        created_at: fresh.created_at.or(prior.created_at),
        recorded_at: fresh.recorded_at.or(prior.recorded_at),
        duration_seconds: fresh.duration_seconds.or(prior.duration_seconds),
        twitch_id: fresh.twitch_id.or_else(|| prior.twitch_id.clone()),
        files: None,
        files_fetched_at: None,
    }
}

/// Merge for an entry whose files were just fetched
pub fn merge_fetched(
    fresh: Vod,
    prior: Option<&Vod>,
    files: Vec<VodFile>,
    fetched_at: DateTime<Utc>,
) -> Vod {
    Vod {
        files: Some(files),
        files_fetched_at: Some(fetched_at),
        ..overlay(fresh, prior)
    }
}

/// Merge for an entry whose prior files are still fresh
pub fn merge_reused(fresh: Vod, prior: Option<&Vod>) -> Vod {
    let files = prior.and_then(|p| p.files.clone());
    let files_fetched_at = prior.and_then(|p| p.files_fetched_at);
    Vod {
        files,
        files_fetched_at,
        ..overlay(fresh, prior)
    }
}

/// Order entries newest first
///
/// Sorts by `recorded_at`, falling back to `created_at`; entries with neither
/// sort as the epoch. The sort is stable, so ties keep their relative order.
pub fn sort_newest_first(vods: &mut [Vod]) {
    vods.sort_by_key(|vod| std::cmp::Reverse(vod.sort_timestamp()));
}
