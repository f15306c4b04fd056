//! Command-line interface components
//!
//! This module contains CLI-specific code for the vault fetcher, including
//! argument parsing, command handlers and progress display.

pub mod args;
pub mod commands;
pub mod progress;

pub use args::{
    AuthAction, AuthArgs, Cli, Commands, GlobalArgs, SnapshotAction, SnapshotArgs, SyncArgs,
};
pub use commands::{handle_auth, handle_snapshot, handle_sync};
pub use progress::SyncProgress;
