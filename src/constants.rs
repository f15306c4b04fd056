//! Application constants for the vault fetcher
//!
//! This module centralizes all constants used throughout the application,
//! organized by functional domain for maintainability and clarity.

/// Environment variable names for configuration and credentials
pub mod env {
    /// Base URL of the vault (origin used for every request)
    pub const BASE_URL: &str = "VAULT_BASE_URL";

    /// Account username
    pub const USERNAME: &str = "VAULT_USERNAME";

    /// Account password
    pub const PASSWORD: &str = "VAULT_PASSWORD";

    /// Optional one-time password for accounts with TOTP enabled
    pub const TOTP: &str = "VAULT_TOTP";

    /// Optional user whose recordings are listed (defaults to the login user)
    pub const TARGET_USER: &str = "VAULT_TARGET_USER";

    /// Snapshot output path
    pub const OUTPUT: &str = "VAULT_OUTPUT";

    /// Listing page size
    pub const PAGE_SIZE: &str = "VAULT_PAGE_SIZE";
}

/// Remote API layout
pub mod api {
    /// Resource handling login
    pub const DEFAULT_USERS_PATH: &str = "/api/users";

    /// Resource handling recording listings and file details
    pub const DEFAULT_VODS_PATH: &str = "/api/vods";

    /// Action name sent with the login body
    pub const LOGIN_ACTION: &str = "login";

    /// Server error string signalling a missing one-time password
    pub const TOTP_REQUIRED: &str = "TOTP_REQUIRED";

    /// Query value selecting the file detail view
    pub const FILE_INFO: &str = "file_info";
}

/// Session cookie and anti-forgery handling
pub mod session {
    /// Cookie carrying the anti-forgery token
    pub const CSRF_COOKIE: &str = "XSRF-TOKEN";

    /// Header names the token is echoed under. Servers differ on which one
    /// they read, so both are sent.
    pub const CSRF_HEADERS: [&str; 2] = ["X-XSRF-TOKEN", "X-CSRF-Token"];

    /// CSS selector for the token in the warm-up page, used when no cookie is set
    pub const CSRF_META_SELECTOR: &str = "meta[name='csrf-token']";
}

/// HTTP client configuration constants
pub mod http {
    /// Default user agent for all HTTP requests
    pub const USER_AGENT: &str = concat!("vodvault-fetcher/", env!("CARGO_PKG_VERSION"));

    /// Default request throttle (requests per second)
    pub const DEFAULT_RATE_LIMIT_RPS: u32 = 10;

    /// Same-origin redirect hops followed per request
    pub const MAX_REDIRECTS: usize = 10;
}

/// Sync and snapshot defaults
pub mod sync {
    /// Default listing page size
    pub const DEFAULT_PAGE_SIZE: usize = 100;

    /// Default snapshot file name
    pub const DEFAULT_OUTPUT: &str = "vods.json";
}

/// Configuration file locations
pub mod files {
    /// Project-local configuration file
    pub const LOCAL_CONFIG_FILE: &str = "vodvault.toml";

    /// Directory name under the user config directory
    pub const CONFIG_DIR_NAME: &str = "vodvault";

    /// File name under the user config directory
    pub const CONFIG_FILE_NAME: &str = "config.toml";
}

// Re-export commonly used constants for convenience
pub use env::{PASSWORD as ENV_PASSWORD, USERNAME as ENV_USERNAME};
pub use http::USER_AGENT;
pub use sync::{DEFAULT_OUTPUT, DEFAULT_PAGE_SIZE};
