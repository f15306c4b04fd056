//! Session state carried across vault requests
//!
//! Cookies live in a reqwest [`Jar`] shared with the HTTP client, so every
//! response, redirect hops included, updates them. [`SessionState`] reads the
//! anti-forgery token back out of that jar and echoes it on same-origin
//! requests. Nothing is persisted; every run starts from an empty jar.

use std::sync::Arc;

use percent_encoding::percent_decode_str;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::RequestBuilder;
use url::{Origin, Url};

use crate::constants::session;

/// Cookie jar and anti-forgery token for one session
#[derive(Debug, Clone)]
pub struct SessionState {
    base_url: Url,
    origin: Origin,
    jar: Arc<Jar>,
    fallback_token: Option<String>,
}

impl SessionState {
    /// Create a session bound to the origin of `base_url`, backed by `jar`
    pub fn new(base_url: &Url, jar: Arc<Jar>) -> Self {
        Self {
            base_url: base_url.clone(),
            origin: base_url.origin(),
            jar,
            fallback_token: None,
        }
    }

    /// The cookie jar, for handing to the HTTP client
    pub fn jar(&self) -> Arc<Jar> {
        Arc::clone(&self.jar)
    }

    /// Whether `url` shares the session's origin
    pub fn is_same_origin(&self, url: &Url) -> bool {
        url.origin() == self.origin
    }

    /// Cookies the jar would send to the base URL, as name/value pairs
    fn cookie_pairs(&self) -> Vec<(String, String)> {
        let Some(header) = self.jar.cookies(&self.base_url) else {
            return Vec::new();
        };
        let Ok(header) = header.to_str() else {
            tracing::debug!("Skipping non-ASCII cookie header");
            return Vec::new();
        };

        header
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .map(|(name, value)| (name.to_string(), value.trim_matches('"').to_string()))
            .collect()
    }

    /// Value of a stored cookie, in its wire encoding
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.cookie_pairs()
            .into_iter()
            .find(|(cookie_name, _)| cookie_name == name)
            .map(|(_, value)| value)
    }

    /// Number of cookies sent to the base URL
    pub fn cookie_count(&self) -> usize {
        self.cookie_pairs().len()
    }

    /// Anti-forgery token, decoded
    ///
    /// The `XSRF-TOKEN` cookie wins; a token found elsewhere is used only
    /// while that cookie is absent.
    pub fn csrf_token(&self) -> Option<String> {
        self.cookie(session::CSRF_COOKIE)
            .filter(|value| !value.is_empty())
            .map(|value| decode_cookie_value(&value))
            .or_else(|| self.fallback_token.clone())
    }

    /// Remember a token found outside the cookie jar
    pub fn set_csrf_token(&mut self, token: impl Into<String>) {
        self.fallback_token = Some(token.into());
    }

    /// Attach anti-forgery headers to a same-origin request
    ///
    /// Cookies are added by the HTTP client from the shared jar.
    pub fn apply(&self, url: &Url, mut builder: RequestBuilder) -> RequestBuilder {
        if !self.is_same_origin(url) {
            return builder;
        }

        if let Some(token) = self.csrf_token() {
            for header in session::CSRF_HEADERS {
                builder = builder.header(header, token.as_str());
            }
        }
        builder
    }
}

/// Percent-decode a cookie value for use in a header
fn decode_cookie_value(value: &str) -> String {
    percent_decode_str(value).decode_utf8_lossy().into_owned()
}
