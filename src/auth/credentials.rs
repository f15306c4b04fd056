//! Credential handling for vault authentication
//!
//! Credentials come from the environment only (a `.env` file is loaded into
//! the environment at startup). The one-time password may also be supplied on
//! the command line or typed at an interactive prompt.

use std::fmt;
use std::io;
use std::path::Path;

use tracing::{info, warn};

use crate::app::{Identity, VaultClient};
use crate::constants::env as env_constants;
use crate::errors::{AuthError, AuthResult, ConfigError, ConfigResult, Result};

/// Account credentials for one login
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    /// One-time password, if the account needs one
    pub totp: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("totp", &self.totp.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Credentials {
    /// Read credentials from the process environment
    ///
    /// `totp_override` (from `--totp`) wins over `VAULT_TOTP`.
    pub fn from_env(totp_override: Option<String>) -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok(), totp_override)
    }

    /// Read credentials through `lookup`; empty values count as unset
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingField` naming the first unset variable
    pub fn from_lookup<F>(lookup: F, totp_override: Option<String>) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |field: &str, key: &str| {
            lookup(key)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| ConfigError::MissingField {
                    field: field.to_string(),
                    env_var: key.to_string(),
                })
        };

        let username = require("username", env_constants::USERNAME)?;
        let password = require("password", env_constants::PASSWORD)?;
        let totp = totp_override
            .filter(|value| !value.trim().is_empty())
            .or_else(|| lookup(env_constants::TOTP).filter(|value| !value.is_empty()))
            .map(|value| value.trim().to_string());

        Ok(Self {
            username,
            password,
            totp,
        })
    }
}

/// Authentication status information
#[derive(Debug, Clone)]
pub struct AuthStatus {
    /// Configured username, if any
    pub username: Option<String>,
    /// Whether the password environment variable is set
    pub password_set: bool,
    /// Whether a one-time password is configured
    pub totp_set: bool,
    /// Whether .env file exists in current directory
    pub dotenv_file_exists: bool,
}

impl AuthStatus {
    /// Check if both credentials are available in environment
    pub fn has_credentials(&self) -> bool {
        self.username.is_some() && self.password_set
    }

    /// Get descriptive status message for display
    pub fn status_message(&self) -> String {
        if self.has_credentials() {
            "Credentials configured - run 'auth verify' to test them".to_string()
        } else {
            format!(
                "Missing credentials - set {} and {}",
                env_constants::USERNAME,
                env_constants::PASSWORD
            )
        }
    }
}

/// Check current authentication status
pub fn get_auth_status() -> AuthStatus {
    get_auth_status_with(|key| std::env::var(key).ok(), Path::new(".env"))
}

/// Authentication status as seen through `lookup`
pub fn get_auth_status_with<F>(lookup: F, dotenv_path: &Path) -> AuthStatus
where
    F: Fn(&str) -> Option<String>,
{
    let lookup = |key: &str| lookup(key).filter(|value| !value.is_empty());
    AuthStatus {
        username: lookup(env_constants::USERNAME),
        password_set: lookup(env_constants::PASSWORD).is_some(),
        totp_set: lookup(env_constants::TOTP).is_some(),
        dotenv_file_exists: dotenv_path.exists(),
    }
}

/// Print the authentication status without revealing secrets
pub fn show_auth_status(status: &AuthStatus) {
    println!("Vault Authentication Status");
    println!("===========================");
    println!();

    match &status.username {
        Some(username) => println!("Username: {} (set)", username),
        None => println!("Username: Not set"),
    }
    println!(
        "Password: {}",
        if status.password_set { "Set" } else { "Not set" }
    );
    println!(
        "One-time password: {}",
        if status.totp_set { "Set" } else { "Not set" }
    );
    println!(
        ".env file: {}",
        if status.dotenv_file_exists {
            "Exists"
        } else {
            "Not found"
        }
    );
    println!();
    println!("Status: {}", status.status_message());
}

/// Whether an interactive one-time password prompt is possible
pub fn can_prompt() -> bool {
    atty::is(atty::Stream::Stdin)
}

/// Ask for a one-time password on the terminal
pub fn prompt_totp() -> AuthResult<String> {
    let code = rpassword::prompt_password("One-time password: ")?;
    let code = code.trim().to_string();
    if code.is_empty() {
        return Err(AuthError::Prompt(io::Error::new(
            io::ErrorKind::InvalidInput,
            "one-time password cannot be empty",
        )));
    }
    Ok(code)
}

/// Warm up the session and log in
///
/// When the server asks for a one-time password that was not supplied and a
/// `prompt` is available, it is asked for once and login is attempted again.
///
/// # Errors
///
/// Returns `AppError::Session` if warm-up fails and `AppError::Auth` if
/// login or the prompt fails
pub async fn establish_session<P>(
    client: &mut VaultClient,
    credentials: &Credentials,
    prompt: Option<P>,
) -> Result<Identity>
where
    P: FnOnce() -> AuthResult<String>,
{
    client.warmup().await?;

    let first = client
        .login(
            &credentials.username,
            &credentials.password,
            credentials.totp.as_deref(),
        )
        .await;

    let identity = match (first, prompt) {
        (Err(AuthError::TotpRequired), Some(prompt)) => {
            warn!("Account requires a one-time password");
            let code = prompt()?;
            info!("Retrying login with one-time password");
            client
                .login(&credentials.username, &credentials.password, Some(&code))
                .await?
        }
        (result, _) => result?,
    };
    Ok(identity)
}
