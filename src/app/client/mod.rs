//! HTTP client implementation for vault interaction
//!
//! This module provides the session-aware client used to authenticate
//! against the vault and read recording listings and file details.
//!
//! The module is organized into specialized components:
//! - `config`: HTTP client configuration and API layout
//! - `session`: cookie jar and anti-forgery token state
//! - `http`: request sending with throttling and session headers
//! - `auth`: warm-up and login handshake
//! - `vods`: listing and file detail requests

use std::sync::Arc;

use governor::Quota;
use reqwest::cookie::Jar;
use serde_json::Value;
use url::Url;

use crate::app::models::{Identity, VodFile};
use crate::constants::api;
use crate::errors::{AuthResult, FetchError, FetchResult, SessionError, SessionResult};

// Module declarations
pub mod auth;
pub mod config;
pub mod http;
pub mod session;
pub mod vods;

pub use config::{ApiPaths, ClientConfig};
pub use session::SessionState;
pub use vods::VodSource;

use auth::AuthHandler;
use http::HttpHandler;

/// Session state of a [`VaultClient`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Fresh,
    WarmedUp,
    Authenticated,
}

/// HTTP client for interacting with the media vault
///
/// Owns one session: requests must follow the order warm-up, login, then
/// listing and detail calls.
#[derive(Debug)]
pub struct VaultClient {
    http_handler: HttpHandler,
    base_url: Url,
    users_url: Url,
    vods_url: Url,
    stage: Stage,
    identity: Option<Identity>,
}

impl VaultClient {
    /// Creates a new client for the vault at `base_url`
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if an endpoint URL cannot be built or HTTP
    /// client creation fails
    pub fn new(base_url: Url, paths: &ApiPaths, config: &ClientConfig) -> SessionResult<Self> {
        let users_url = endpoint(&base_url, &paths.users_path)?;
        let vods_url = endpoint(&base_url, &paths.vods_path)?;
        let session = SessionState::new(&base_url, Arc::new(Jar::default()));
        let client = config.build_http_client(session.jar())?;
        let http_handler =
            HttpHandler::new(client, Quota::per_second(config.rate_limit_rps), session);

        tracing::debug!("Created vault client for {}", base_url);

        Ok(Self {
            http_handler,
            base_url,
            users_url,
            vods_url,
            stage: Stage::Fresh,
            identity: None,
        })
    }

    /// Collect initial session and anti-forgery cookies
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the request fails or is not successful
    pub async fn warmup(&mut self) -> SessionResult<()> {
        AuthHandler::warmup(&mut self.http_handler, &self.base_url).await?;
        self.stage = Stage::WarmedUp;
        Ok(())
    }

    /// Log in and remember the authenticated identity
    ///
    /// May be called again after a `TotpRequired` failure, this time with a
    /// one-time password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError` if login fails, including
    /// `AuthError::Session(SessionError::NotWarmedUp)` when called before
    /// [`VaultClient::warmup`]
    pub async fn login(
        &mut self,
        username: &str,
        password: &str,
        totp: Option<&str>,
    ) -> AuthResult<Identity> {
        if self.stage == Stage::Fresh {
            return Err(SessionError::NotWarmedUp.into());
        }

        let identity = AuthHandler::login(
            &mut self.http_handler,
            &self.users_url,
            username,
            password,
            totp,
        )
        .await?;

        self.stage = Stage::Authenticated;
        self.identity = Some(identity.clone());
        Ok(identity)
    }

    /// Identity returned by the last successful login
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Get the base URL of the vault
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Session state (cookies and anti-forgery token)
    pub fn session(&self) -> &SessionState {
        self.http_handler.session()
    }

    /// Build the listing URL for one page
    pub fn listing_url(&self, target_user: &str, page: usize, page_size: usize) -> Url {
        let mut url = self.vods_url.clone();
        url.query_pairs_mut()
            .append_pair("targetUser", target_user)
            .append_pair("page", &page.to_string())
            .append_pair("limit", &page_size.to_string());
        url
    }

    /// Build the file detail URL for one recording
    pub fn detail_url(&self, vod_id: &str) -> Url {
        let mut url = self.vods_url.clone();
        url.query_pairs_mut()
            .append_pair("get", api::FILE_INFO)
            .append_pair("ids", vod_id);
        url
    }

    fn ensure_authenticated(&self) -> FetchResult<()> {
        if self.stage == Stage::Authenticated {
            Ok(())
        } else {
            Err(FetchError::NotAuthenticated)
        }
    }

    /// GET a session URL and parse its JSON body
    async fn get_json(&mut self, url: &Url) -> FetchResult<Value> {
        let response = self.http_handler.get(url).await?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!("Request to {} failed with status {}", url, status);
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        vods::parse_body(url.as_str(), &body)
    }
}

/// Resolve an API path against the vault base URL
fn endpoint(base_url: &Url, path: &str) -> SessionResult<Url> {
    base_url.join(path).map_err(|e| SessionError::InvalidUrl {
        url: format!("{}{}", base_url, path),
        error: e.to_string(),
    })
}

impl VodSource for VaultClient {
    async fn list_page(
        &mut self,
        target_user: &str,
        page: usize,
        page_size: usize,
    ) -> FetchResult<Vec<Value>> {
        self.ensure_authenticated()?;
        let url = self.listing_url(target_user, page, page_size);
        let value = self.get_json(&url).await?;
        Ok(vods::listing_records(value))
    }

    async fn fetch_files(&mut self, vod_id: &str) -> FetchResult<Vec<VodFile>> {
        self.ensure_authenticated()?;
        let url = self.detail_url(vod_id);
        let value = self.get_json(&url).await?;
        Ok(vods::detail_files(&value))
    }
}
