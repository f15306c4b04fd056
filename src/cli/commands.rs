//! Command handlers for the CLI
//!
//! Each handler resolves configuration, performs its command and prints a
//! short report to stdout. Errors propagate to `main`, which prints them and
//! exits non-zero.

use std::path::PathBuf;
use std::time::Instant;

use tracing::{info, warn};
use url::Url;

use crate::app::{
    plan_sync, sync_snapshot, Decision, MergePlan, SnapshotStore, SyncOptions, VaultClient,
};
use crate::auth::{
    can_prompt, establish_session, get_auth_status, prompt_totp, show_auth_status, Credentials,
};
use crate::cli::args::{AuthAction, AuthArgs, GlobalArgs, SnapshotAction, SnapshotArgs, SyncArgs};
use crate::cli::progress::SyncProgress;
use crate::config::{AppConfig, ConfigOverrides, Settings};
use crate::errors::{AppError, AuthResult, Result};

/// Handle the sync command
pub async fn handle_sync(global: &GlobalArgs, args: SyncArgs) -> Result<()> {
    let start_time = Instant::now();
    args.validate()?;

    let settings = load_settings(global, &args.overrides()).await?;
    let base_url = settings.require_base_url()?.clone();
    let credentials = Credentials::from_env(args.totp.clone())?;

    let mut client = VaultClient::new(base_url.clone(), &settings.api, &settings.client)?;
    let identity = establish_session(&mut client, &credentials, totp_prompt(args.no_prompt)).await?;

    let target_user = settings
        .target_user
        .clone()
        .unwrap_or_else(|| identity.username.clone());
    info!("Syncing recordings of {}", target_user);

    let store = SnapshotStore::new(settings.output.clone());
    let prior = store.load();
    let options = SyncOptions {
        base_url: display_base_url(&base_url),
        target_user,
        page_size: settings.page_size,
        refresh_all: args.refresh_all,
    };

    if args.dry_run {
        let plan = plan_sync(&mut client, prior.as_ref(), &options).await?;
        print_plan(&plan, &store);
        return Ok(());
    }

    let show_progress =
        !args.no_progress && !global.quiet && atty::is(atty::Stream::Stderr);
    let mut progress = SyncProgress::new(show_progress);
    let outcome = match sync_snapshot(&mut client, prior.as_ref(), &options, &mut progress).await
    {
        Ok(outcome) => outcome,
        Err(e) => {
            progress.abandon();
            return Err(e.into());
        }
    };

    store.save(&outcome.snapshot)?;
    info!("Sync finished in {:?}", start_time.elapsed());

    if !global.quiet {
        let counts = &outcome.counts;
        println!(
            "Wrote {} entries to {}",
            outcome.snapshot.meta.total,
            store.path().display()
        );
        println!(
            "  {} new, {} refreshed, {} unchanged, {} retained from previous runs",
            counts.new, counts.refreshed, counts.reused, counts.retained
        );
        if counts.rejected > 0 || counts.duplicates > 0 {
            println!(
                "  {} records without an id skipped, {} duplicate ids ignored",
                counts.rejected, counts.duplicates
            );
        }
    }

    Ok(())
}

/// Handle snapshot inspection commands
pub async fn handle_snapshot(global: &GlobalArgs, args: SnapshotArgs) -> Result<()> {
    match args.action {
        SnapshotAction::Info { file } => handle_snapshot_info(global, file).await,
    }
}

async fn handle_snapshot_info(global: &GlobalArgs, file: Option<PathBuf>) -> Result<()> {
    let path = match file {
        Some(path) => path,
        None => {
            load_settings(global, &ConfigOverrides::default())
                .await?
                .output
        }
    };

    let store = SnapshotStore::new(path);
    let snapshot = store.load().ok_or_else(|| {
        AppError::generic(format!(
            "No readable snapshot at {}",
            store.path().display()
        ))
    })?;
    let summary = snapshot.summary();

    println!("Snapshot Information");
    println!("====================");
    println!("File:               {}", store.path().display());
    println!("Generated at:       {}", snapshot.meta.generated_at.to_rfc3339());
    println!("Base URL:           {}", snapshot.meta.base_url);
    println!("Target user:        {}", snapshot.meta.target_user);
    println!("Entries:            {}", summary.entries);
    println!("Entries with files: {}", summary.entries_with_files);
    println!("Total files:        {}", summary.total_files);
    println!(
        "Total size:         {}",
        crate::app::format_bytes(summary.total_bytes)
    );

    if snapshot.meta.total != summary.entries {
        warn!(
            "Snapshot meta reports {} entries but contains {}",
            snapshot.meta.total, summary.entries
        );
    }

    Ok(())
}

/// Handle authentication commands
pub async fn handle_auth(global: &GlobalArgs, args: AuthArgs) -> Result<()> {
    match args.action {
        AuthAction::Status => {
            show_auth_status(&get_auth_status());
        }
        AuthAction::Verify { totp, no_prompt } => {
            let settings = load_settings(global, &ConfigOverrides::default()).await?;
            let base_url = settings.require_base_url()?.clone();
            let credentials = Credentials::from_env(totp)?;

            println!("Verifying credentials with {}...", display_base_url(&base_url));
            let mut client = VaultClient::new(base_url, &settings.api, &settings.client)?;
            let identity =
                establish_session(&mut client, &credentials, totp_prompt(no_prompt)).await?;

            println!(
                "Credentials verified: logged in as {} (id {})",
                identity.username, identity.id
            );
        }
    }

    Ok(())
}

/// Load the config file and layer environment and flags over it
async fn load_settings(global: &GlobalArgs, overrides: &ConfigOverrides) -> Result<Settings> {
    let config = AppConfig::load(global.config.clone()).await?;
    Ok(config.resolve(overrides)?)
}

/// Interactive one-time password prompt, if allowed and possible
fn totp_prompt(no_prompt: bool) -> Option<fn() -> AuthResult<String>> {
    if no_prompt || !can_prompt() {
        None
    } else {
        Some(prompt_totp as fn() -> AuthResult<String>)
    }
}

/// Base URL as recorded in snapshot metadata, without a trailing slash
fn display_base_url(url: &Url) -> String {
    url.as_str().trim_end_matches('/').to_string()
}

/// Print a dry-run plan
fn print_plan(plan: &MergePlan, store: &SnapshotStore) {
    let counts = &plan.counts;
    println!("Dry run - nothing fetched or written");
    println!("Snapshot: {}", store.path().display());
    println!(
        "  {} new, {} to refresh, {} unchanged, {} retained",
        counts.new, counts.refreshed, counts.reused, counts.retained
    );

    for entry in &plan.entries {
        if let Decision::Fetch(reason) = entry.decision {
            println!(
                "  fetch {} ({}){}",
                entry.fresh.id,
                reason,
                entry
                    .fresh
                    .title
                    .as_deref()
                    .map(|title| format!(" - {}", title))
                    .unwrap_or_default()
            );
        }
    }
}
