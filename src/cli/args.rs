//! Command-line argument parsing for the vault fetcher
//!
//! This module defines the CLI structure using clap derive macros. Running
//! the binary without a subcommand performs a sync with default options.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::ConfigOverrides;
use crate::errors::{ConfigError, ConfigResult};

/// Vault Fetcher - Snapshot recorded streams from a media vault
#[derive(Parser, Debug)]
#[command(
    name = "vodvault_fetcher",
    version,
    about = "Fetch recorded video listings from a media vault into a JSON snapshot",
    long_about = "Logs in to a media vault, lists every recording of a user, fetches file details \
only for recordings that are new or whose files are unknown, and writes a merged JSON snapshot \
ordered newest first."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommands (defaults to `sync`)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Very verbose logging (debug level)
    #[arg(long, global = true)]
    pub very_verbose: bool,

    /// Quiet mode - suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch the listing and update the snapshot
    Sync(SyncArgs),

    /// Inspect a stored snapshot
    Snapshot(SnapshotArgs),

    /// Check or verify vault credentials
    Auth(AuthArgs),
}

/// Arguments for the sync command
#[derive(Args, Debug, Clone, Default)]
pub struct SyncArgs {
    /// Snapshot file to read and replace
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Account whose recordings are listed (defaults to the logged-in user)
    #[arg(short, long)]
    pub target_user: Option<String>,

    /// Listing page size
    #[arg(long)]
    pub page_size: Option<usize>,

    /// Vault base URL
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// One-time password for accounts with TOTP enabled
    #[arg(long, value_name = "CODE")]
    pub totp: Option<String>,

    /// Re-fetch file details for every recording
    #[arg(long)]
    pub refresh_all: bool,

    /// Dry run - list and plan without fetching details or writing
    #[arg(long)]
    pub dry_run: bool,

    /// Disable the progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Never prompt for a one-time password
    #[arg(long)]
    pub no_prompt: bool,
}

/// Arguments for snapshot inspection
#[derive(Args, Debug)]
pub struct SnapshotArgs {
    #[command(subcommand)]
    pub action: SnapshotAction,
}

/// Snapshot actions
#[derive(Subcommand, Debug)]
pub enum SnapshotAction {
    /// Show snapshot metadata and counts
    Info {
        /// Snapshot file (defaults to the configured output)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },
}

/// Arguments for authentication management
#[derive(Args, Debug)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub action: AuthAction,
}

/// Authentication actions
#[derive(Subcommand, Debug)]
pub enum AuthAction {
    /// Show which credentials are configured
    Status,

    /// Log in once and print the identity
    Verify {
        /// One-time password for accounts with TOTP enabled
        #[arg(long, value_name = "CODE")]
        totp: Option<String>,

        /// Never prompt for a one-time password
        #[arg(long)]
        no_prompt: bool,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the logging level based on global arguments
    pub fn log_level(&self) -> tracing::Level {
        if self.global.quiet {
            tracing::Level::ERROR
        } else if self.global.very_verbose {
            tracing::Level::DEBUG
        } else if self.global.verbose {
            tracing::Level::INFO
        } else {
            tracing::Level::WARN
        }
    }
}

impl SyncArgs {
    /// Validate flag values and combinations
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for a zero page size or for
    /// `--dry-run` combined with `--refresh-all`
    pub fn validate(&self) -> ConfigResult<()> {
        if self.page_size == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "page size".to_string(),
                value: "0".to_string(),
                reason: "Page size must be at least 1".to_string(),
            });
        }

        if self.dry_run && self.refresh_all {
            return Err(ConfigError::InvalidValue {
                field: "--refresh-all".to_string(),
                value: "true".to_string(),
                reason: "Cannot combine --dry-run with --refresh-all".to_string(),
            });
        }

        Ok(())
    }

    /// Configuration values supplied by these flags
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            base_url: self.base_url.clone(),
            target_user: self.target_user.clone(),
            output: self.output.clone(),
            page_size: self.page_size,
        }
    }
}
