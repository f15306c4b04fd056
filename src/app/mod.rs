//! Core application logic for the vault fetcher
//!
//! This module contains the session client, data models, record
//! normalization, merge engine, snapshot persistence and the sync driver
//! tying them together.
//!
//! # Examples
//!
//! ```rust,no_run
//! use url::Url;
//! use vodvault_fetcher::app::{
//!     sync_snapshot, ApiPaths, ClientConfig, NoopObserver, SnapshotStore, SyncOptions,
//!     VaultClient,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let base_url = Url::parse("https://vault.example")?;
//! let mut client = VaultClient::new(base_url, &ApiPaths::default(), &ClientConfig::default())?;
//! client.warmup().await?;
//! let identity = client.login("alice", "secret", None).await?;
//!
//! let store = SnapshotStore::new("vods.json");
//! let prior = store.load();
//! let options = SyncOptions {
//!     base_url: "https://vault.example".to_string(),
//!     target_user: identity.username,
//!     page_size: 100,
//!     refresh_all: false,
//! };
//! let outcome = sync_snapshot(&mut client, prior.as_ref(), &options, &mut NoopObserver).await?;
//! store.save(&outcome.snapshot)?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod merge;
pub mod models;
pub mod normalize;
pub mod snapshot;
pub mod sync;

// Re-export main public API
pub use client::{ApiPaths, ClientConfig, SessionState, VaultClient, VodSource};
pub use merge::{Decision, FetchReason, MergeCounts, MergePlan};
pub use models::{Identity, Snapshot, SnapshotMeta, SnapshotSummary, Vod, VodFile};
pub use normalize::{format_bytes, normalize_file, normalize_vod};
pub use snapshot::SnapshotStore;
pub use sync::{plan_sync, sync_snapshot, NoopObserver, SyncObserver, SyncOptions, SyncOutcome};
