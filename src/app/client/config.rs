//! HTTP client configuration and building logic
//!
//! This module handles the configuration and construction of the HTTP client
//! used for vault interaction, along with the API resource layout.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::Jar;
use reqwest::redirect::Policy;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::constants::{api, http};
use crate::errors::{SessionError, SessionResult};

/// Resource paths on the vault origin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiPaths {
    /// Login resource
    pub users_path: String,
    /// Listing and file detail resource
    pub vods_path: String,
}

impl Default for ApiPaths {
    fn default() -> Self {
        Self {
            users_path: api::DEFAULT_USERS_PATH.to_string(),
            vods_path: api::DEFAULT_VODS_PATH.to_string(),
        }
    }
}

/// Configuration for the vault HTTP client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// User agent sent with every request
    pub user_agent: String,
    /// Outgoing request throttle (requests per second)
    pub rate_limit_rps: NonZeroU32,
    /// Per-request timeout. `None` leaves the transport default in place
    #[serde(with = "humantime_serde")]
    pub request_timeout: Option<Duration>,
    /// TCP nodelay (disable Nagle's algorithm)
    pub tcp_nodelay: bool,
    /// Honour proxy settings from the environment (`HTTP_PROXY`, ...)
    pub system_proxy: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: http::USER_AGENT.to_string(),
            rate_limit_rps: NonZeroU32::new(http::DEFAULT_RATE_LIMIT_RPS)
                .unwrap_or(NonZeroU32::MIN),
            request_timeout: None,
            tcp_nodelay: true,
            system_proxy: true,
        }
    }
}

impl ClientConfig {
    /// Builds the HTTP client with the specified configuration
    ///
    /// Cookies go to `jar`, which [`super::session::SessionState`] shares so
    /// the anti-forgery token can be read back out of it.
    pub fn build_http_client(&self, jar: Arc<Jar>) -> SessionResult<Client> {
        let mut client_builder = Client::builder()
            .cookie_provider(jar)
            .redirect(same_origin_redirects())
            .user_agent(self.user_agent.as_str())
            .tcp_nodelay(self.tcp_nodelay);

        if let Some(timeout) = self.request_timeout {
            client_builder = client_builder.timeout(timeout);
        }
        if !self.system_proxy {
            client_builder = client_builder.no_proxy();
        }

        client_builder.build().map_err(SessionError::Http)
    }
}

/// Follow redirects only while they stay on the origin of the first request
///
/// A hop to another origin is returned to the caller as the 3xx response.
fn same_origin_redirects() -> Policy {
    Policy::custom(|attempt| {
        let leaves_origin = attempt
            .previous()
            .first()
            .is_some_and(|first| first.origin() != attempt.url().origin());

        if leaves_origin {
            tracing::warn!("Not following redirect to {}", attempt.url());
            attempt.stop()
        } else if attempt.previous().len() > http::MAX_REDIRECTS {
            attempt.error("too many redirects")
        } else {
            attempt.follow()
        }
    })
}
