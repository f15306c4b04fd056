//! Vault Fetcher Library
//!
//! Authenticates against a media vault web API, enumerates a user's recorded
//! streams, fetches file details only for recordings that need them, and
//! persists a merged JSON snapshot for a static page renderer.

pub mod app;
pub mod auth;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};
