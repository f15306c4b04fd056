//! Authentication management for vault credentials
//!
//! This module discovers the account credentials, reports their status, and
//! runs the warm-up and login handshake, prompting for a one-time password
//! when the account needs one.
//!
//! # Examples
//!
//! ```rust,no_run
//! use url::Url;
//! use vodvault_fetcher::app::{ApiPaths, ClientConfig, VaultClient};
//! use vodvault_fetcher::auth::{can_prompt, establish_session, prompt_totp, Credentials};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let credentials = Credentials::from_env(None)?;
//! let base_url = Url::parse("https://vault.example")?;
//! let mut client = VaultClient::new(base_url, &ApiPaths::default(), &ClientConfig::default())?;
//!
//! let prompt = can_prompt().then_some(prompt_totp);
//! let identity = establish_session(&mut client, &credentials, prompt).await?;
//! println!("Logged in as {}", identity.username);
//! # Ok(())
//! # }
//! ```

pub mod credentials;

// Re-export main public API
pub use credentials::{
    can_prompt, establish_session, get_auth_status, get_auth_status_with, prompt_totp,
    show_auth_status, AuthStatus, Credentials,
};
