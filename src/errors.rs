//! Error types for the vault fetcher
//!
//! Every failure in a sync run is fatal: the run aborts before the snapshot is
//! written and the process exits non-zero. The types below exist to make the
//! cause of that abort clear to whoever reads the error stream.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors, raised before any network activity
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Required setting missing from file, environment and flags
    #[error("Missing required configuration: {field}. Set {env_var} or pass it on the command line")]
    MissingField { field: String, env_var: String },

    /// Setting present but unusable
    #[error("Invalid configuration value for {field}: {value}. {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    /// Explicitly requested config file does not exist
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Config file is not valid TOML for our schema
    #[error("Invalid configuration file {path}: {source}")]
    InvalidFormat {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Config file could not be read
    #[error("Failed to read configuration file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Session establishment errors (warm-up and client construction)
#[derive(Error, Debug)]
pub enum SessionError {
    /// Transport failure during warm-up or while building the HTTP client
    #[error("HTTP request failed while establishing session: {0}")]
    Http(#[from] reqwest::Error),

    /// Warm-up request answered with a non-success status
    #[error("Session warm-up failed: HTTP {status}")]
    Status { status: u16 },

    /// Endpoint URL could not be built from the configured base
    #[error("Invalid endpoint URL: {url} - {error}")]
    InvalidUrl { url: String, error: String },

    /// Login attempted before the warm-up captured session cookies
    #[error("Session not established. Warm-up must complete before login")]
    NotWarmedUp,
}

/// Login errors
#[derive(Error, Debug)]
pub enum AuthError {
    /// Transport failure during login
    #[error("HTTP request failed during login: {0}")]
    Http(#[from] reqwest::Error),

    /// Login answered with a non-success status and no recognisable error body
    #[error("Login failed: HTTP {status}")]
    Status { status: u16 },

    /// Account requires a one-time password and none was supplied
    #[error("Login requires a one-time password. Set VAULT_TOTP or pass --totp")]
    TotpRequired,

    /// A one-time password was supplied but the server still asked for one
    #[error("One-time password was not accepted by the server")]
    TotpRejected,

    /// Server reported an error for the login attempt
    #[error("Login rejected by server: {message}")]
    Rejected { message: String },

    /// Response body did not carry the expected identity data
    #[error("Malformed login response: {reason}")]
    MalformedResponse { reason: String },

    /// Reading the one-time password from the terminal failed
    #[error("Failed to read one-time password from terminal")]
    Prompt(#[from] std::io::Error),

    /// Session was not ready for login
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Listing and detail fetch errors
#[derive(Error, Debug)]
pub enum FetchError {
    /// Transport failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server returned a non-success status
    #[error("Request to {url} failed: HTTP {status}")]
    Status { url: String, status: u16 },

    /// Response body was not valid JSON
    #[error("Unparseable response body from {url}: {source}")]
    InvalidBody {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// Listing or detail requested before a successful login
    #[error("Not authenticated. Login must succeed before fetching recordings")]
    NotAuthenticated,
}

/// Snapshot persistence errors
#[derive(Error, Debug)]
pub enum SnapshotError {
    /// Serialising the snapshot failed
    #[error("Failed to serialise snapshot")]
    Serialize(#[from] serde_json::Error),

    /// Writing the temporary file or creating parent directories failed
    #[error("Failed to write snapshot to {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Renaming the temporary file over the target failed
    #[error("Failed to replace snapshot at {path}")]
    Persist {
        path: PathBuf,
        #[source]
        source: tempfile::PersistError,
    },
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Session error
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Authentication error
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Fetch error
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Snapshot error
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    /// Generic I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic application error with context
    #[error("Application error: {message}")]
    Generic { message: String },
}

impl AppError {
    /// Create a generic application error with a message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config",
            AppError::Session(_) | AppError::Auth(AuthError::Session(_)) => "session",
            AppError::Auth(_) => "authentication",
            AppError::Fetch(_) => "fetch",
            AppError::Snapshot(_) => "snapshot",
            AppError::Io(_) => "io",
            AppError::Generic { .. } => "generic",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Configuration result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Session result type alias
pub type SessionResult<T> = std::result::Result<T, SessionError>;

/// Authentication result type alias
pub type AuthResult<T> = std::result::Result<T, AuthError>;

/// Fetch result type alias
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Snapshot result type alias
pub type SnapshotResult<T> = std::result::Result<T, SnapshotError>;
