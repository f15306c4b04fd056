//! Core HTTP operations for the vault session
//!
//! Every request goes through [`HttpHandler::send`], which waits on the rate
//! limiter and attaches anti-forgery headers. The client's cookie jar sends
//! and records cookies. Requests are never retried; a failed request aborts
//! the run.

use governor::{clock::DefaultClock, state::InMemoryState, state::NotKeyed, Quota, RateLimiter};
use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use url::Url;

use super::session::SessionState;

/// HTTP operations handler bound to one session
#[derive(Debug)]
pub struct HttpHandler {
    client: Client,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    session: SessionState,
}

impl HttpHandler {
    /// Creates a new HttpHandler with the given client, throttle and session
    pub fn new(client: Client, quota: Quota, session: SessionState) -> Self {
        Self {
            client,
            rate_limiter: RateLimiter::direct(quota),
            session,
        }
    }

    /// Issue a GET request within the session
    pub async fn get(&mut self, url: &Url) -> reqwest::Result<Response> {
        let builder = self.client.get(url.clone());
        self.send(url, builder).await
    }

    /// Issue a POST request with a JSON body within the session
    pub async fn post_json<T: Serialize + ?Sized>(
        &mut self,
        url: &Url,
        body: &T,
    ) -> reqwest::Result<Response> {
        let builder = self.client.post(url.clone()).json(body);
        self.send(url, builder).await
    }

    async fn send(&mut self, url: &Url, builder: RequestBuilder) -> reqwest::Result<Response> {
        self.rate_limiter.until_ready().await;

        let response = self.session.apply(url, builder).send().await?;
        if response.url() == url {
            tracing::debug!("{} -> {}", url, response.status());
        } else {
            tracing::debug!("{} -> {} -> {}", url, response.url(), response.status());
        }
        Ok(response)
    }

    /// Session state for this handler
    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// Mutable session state for this handler
    pub fn session_mut(&mut self) -> &mut SessionState {
        &mut self.session
    }
}
