//! Vault session handshake
//!
//! This module handles the warm-up request that seeds session and
//! anti-forgery cookies, and the JSON login that follows it.

use reqwest::StatusCode;
use scraper::{Html, Selector};
use serde::Serialize;
use serde_json::Value;
use url::Url;

use super::http::HttpHandler;
use crate::app::models::Identity;
use crate::app::normalize::coerce_string;
use crate::constants::{api, session};
use crate::errors::{AuthError, AuthResult, SessionError, SessionResult};

/// Login request body
#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    action: &'static str,
    username: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    totp: Option<&'a str>,
}

/// Handles vault authentication operations
pub struct AuthHandler;

impl AuthHandler {
    /// Request the origin root to collect session cookies
    ///
    /// When the response sets no anti-forgery cookie, the token is looked up
    /// in a `csrf-token` meta tag of the returned page instead.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the request fails or the status is not success
    pub async fn warmup(http: &mut HttpHandler, base_url: &Url) -> SessionResult<()> {
        let url = base_url.join("/").unwrap_or_else(|_| base_url.clone());
        tracing::info!("Warming up session: {}", url);

        let response = http.get(&url).await.map_err(SessionError::Http)?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!("Warm-up failed with status {}", status);
            return Err(SessionError::Status {
                status: status.as_u16(),
            });
        }

        if http.session().csrf_token().is_none() {
            let body = response.text().await.map_err(SessionError::Http)?;
            if let Some(token) = Self::extract_meta_token(&body) {
                tracing::debug!("Using anti-forgery token from page meta tag");
                http.session_mut().set_csrf_token(token);
            }
        }

        tracing::info!(
            "Session warmed up: {} cookies, anti-forgery token {}",
            http.session().cookie_count(),
            if http.session().csrf_token().is_some() {
                "present"
            } else {
                "absent"
            }
        );
        Ok(())
    }

    /// Log in with username, password and optional one-time password
    ///
    /// # Errors
    ///
    /// Returns `AuthError` if:
    /// - The request fails or returns a non-success status
    /// - The server requires a one-time password (`TotpRequired` when none
    ///   was supplied, `TotpRejected` otherwise)
    /// - The server reports any other error
    /// - The response lacks identity data
    pub async fn login(
        http: &mut HttpHandler,
        url: &Url,
        username: &str,
        password: &str,
        totp: Option<&str>,
    ) -> AuthResult<Identity> {
        tracing::info!("Logging in as {}", username);

        let body = LoginRequest {
            action: api::LOGIN_ACTION,
            username,
            password,
            totp,
        };
        let response = http.post_json(url, &body).await?;
        let status = response.status();
        let text = response.text().await?;

        let identity = Self::parse_login_response(status, &text, totp.is_some())?;
        tracing::info!("Logged in as {} (id {})", identity.username, identity.id);
        Ok(identity)
    }

    /// Interpret a login response
    ///
    /// A server-reported `error` takes precedence over the HTTP status so that
    /// a `TOTP_REQUIRED` answer is recognised whatever status carries it.
    pub fn parse_login_response(
        status: StatusCode,
        body: &str,
        totp_supplied: bool,
    ) -> AuthResult<Identity> {
        let parsed: Option<Value> = serde_json::from_str(body).ok();

        if let Some(message) = parsed.as_ref().and_then(|v| v.get("error")).and_then(error_message) {
            if message == api::TOTP_REQUIRED {
                tracing::warn!("Server requires a one-time password");
                return Err(if totp_supplied {
                    AuthError::TotpRejected
                } else {
                    AuthError::TotpRequired
                });
            }
            tracing::warn!("Login rejected: {}", message);
            return Err(AuthError::Rejected { message });
        }

        if !status.is_success() {
            return Err(AuthError::Status {
                status: status.as_u16(),
            });
        }

        let value = parsed.ok_or_else(|| AuthError::MalformedResponse {
            reason: "body is not JSON".to_string(),
        })?;
        let data = value
            .get("data")
            .and_then(Value::as_object)
            .ok_or_else(|| AuthError::MalformedResponse {
                reason: "missing data object".to_string(),
            })?;

        let id = data
            .get("ID")
            .or_else(|| data.get("id"))
            .and_then(coerce_string)
            .ok_or_else(|| AuthError::MalformedResponse {
                reason: "missing data.ID".to_string(),
            })?;
        let username = data
            .get("username")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| AuthError::MalformedResponse {
                reason: "missing data.username".to_string(),
            })?;

        Ok(Identity { id, username })
    }

    /// Extracts the anti-forgery token from a page's meta tag
    pub fn extract_meta_token(html: &str) -> Option<String> {
        let document = Html::parse_document(html);
        let selector = Selector::parse(session::CSRF_META_SELECTOR).ok()?;

        document
            .select(&selector)
            .next()
            .and_then(|element| element.value().attr("content"))
            .filter(|token| !token.is_empty())
            .map(str::to_string)
    }
}

/// Error text from an `error` field, if it signals an error
fn error_message(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
