//! In-process vault fixture for integration tests
//!
//! [`FakeVault`] listens on a loopback port and answers one HTTP/1.1 request
//! per connection from the shared [`VaultState`]. Every request is recorded
//! so tests can inspect the cookies, headers and bodies the client sent.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use url::Url;
use vodvault_fetcher::app::ClientConfig;

/// Client settings for talking to the fixture: no proxy, no throttling delay
pub fn local_config() -> ClientConfig {
    ClientConfig {
        system_proxy: false,
        rate_limit_rps: std::num::NonZeroU32::new(1000).unwrap(),
        ..Default::default()
    }
}

/// A request as received by the fixture
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    /// Path without query string
    pub path: String,
    pub query: HashMap<String, String>,
    /// Header names are lowercased
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    pub fn json_body(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or(Value::Null)
    }

    /// Whether the `Cookie` header carries `name=value`
    pub fn has_cookie(&self, name: &str, value: &str) -> bool {
        self.header("cookie").is_some_and(|cookies| {
            cookies
                .split(';')
                .filter_map(|pair| pair.trim().split_once('='))
                .any(|(n, v)| n == name && v == value)
        })
    }
}

/// Response produced by the fixture
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Reply {
    pub fn json(status: u16, value: Value) -> Self {
        Self {
            status,
            content_type: "application/json",
            headers: Vec::new(),
            body: value.to_string(),
        }
    }

    pub fn html(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: "text/html; charset=utf-8",
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: "text/plain",
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

/// Server-side behaviour and data of the fake vault
#[derive(Debug, Clone)]
pub struct VaultState {
    pub username: String,
    pub password: String,
    pub user_id: u64,
    /// One-time password the account requires, if any
    pub totp: Option<String>,
    /// Raw `XSRF-TOKEN` cookie value set by the warm-up page
    pub csrf_cookie: Option<String>,
    /// Token placed in a `csrf-token` meta tag of the warm-up page
    pub csrf_meta: Option<String>,
    /// Status returned by the warm-up page
    pub warmup_status: u16,
    /// When set, `/` answers with a 302 to this location (cookies still set
    /// on the redirect) and the page is served from `/home`
    pub warmup_redirect: Option<String>,
    /// Listing records, served in pages
    pub listing: Vec<Value>,
    /// Files per recording id
    pub files: HashMap<String, Vec<Value>>,
    /// Serve detail files under `files` instead of `data`
    pub files_key: &'static str,
    /// Status returned by every listing page, when set
    pub listing_status: Option<u16>,
    /// Body returned by every listing page, when set
    pub listing_body: Option<String>,
    /// Status returned by every detail request, when set
    pub detail_status: Option<u16>,
    /// Body returned by every detail request, when set
    pub detail_body: Option<String>,
}

impl Default for VaultState {
    fn default() -> Self {
        Self {
            username: "alice".to_string(),
            password: "secret".to_string(),
            user_id: 7,
            totp: None,
            csrf_cookie: Some("tok%2Fabc%3D".to_string()),
            csrf_meta: None,
            warmup_status: 200,
            warmup_redirect: None,
            listing: Vec::new(),
            files: HashMap::new(),
            files_key: "data",
            listing_status: None,
            listing_body: None,
            detail_status: None,
            detail_body: None,
        }
    }
}

/// Session cookie issued before login
pub const ANON_SESSION: &str = "anon";
/// Session cookie issued after login
pub const AUTHED_SESSION: &str = "authed";
/// Decoded form of the default `XSRF-TOKEN` cookie
pub const DECODED_CSRF: &str = "tok/abc=";

/// Running fixture; stops when dropped
pub struct FakeVault {
    pub base_url: Url,
    pub state: Arc<Mutex<VaultState>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    task: JoinHandle<()>,
}

impl FakeVault {
    pub async fn start(state: VaultState) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(Mutex::new(state));
        let requests = Arc::new(Mutex::new(Vec::new()));

        let task = {
            let state = Arc::clone(&state);
            let requests = Arc::clone(&requests);
            tokio::spawn(async move {
                loop {
                    let Ok((stream, _)) = listener.accept().await else {
                        break;
                    };
                    let state = Arc::clone(&state);
                    let requests = Arc::clone(&requests);
                    tokio::spawn(async move {
                        serve_connection(stream, state, requests).await;
                    });
                }
            })
        };

        Self {
            base_url: Url::parse(&format!("http://{}", addr)).unwrap(),
            state,
            requests,
            task,
        }
    }

    /// All requests received so far, in arrival order
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests to `path`, in arrival order
    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|request| request.path == path)
            .collect()
    }

    /// Detail requests (listing requests excluded)
    pub fn detail_requests(&self) -> Vec<RecordedRequest> {
        self.requests_to("/api/vods")
            .into_iter()
            .filter(|request| request.query_param("get") == Some("file_info"))
            .collect()
    }

    pub fn clear_requests(&self) {
        self.requests.lock().unwrap().clear();
    }

    pub fn update(&self, change: impl FnOnce(&mut VaultState)) {
        change(&mut self.state.lock().unwrap());
    }
}

impl Drop for FakeVault {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve_connection(
    mut stream: TcpStream,
    state: Arc<Mutex<VaultState>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
) {
    let Some(request) = read_request(&mut stream).await else {
        return;
    };
    requests.lock().unwrap().push(request.clone());

    let reply = {
        let state = state.lock().unwrap();
        route(&state, &request)
    };
    write_reply(&mut stream, reply).await;
}

async fn read_request(stream: &mut TcpStream) -> Option<RecordedRequest> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let read = stream.read(&mut chunk).await.ok()?;
        if read == 0 {
            return None;
        }
        buffer.extend_from_slice(&chunk[..read]);
        if let Some(position) = buffer.windows(4).position(|w| w == b"\r\n\r\n") {
            break position + 4;
        }
    };

    let head = String::from_utf8_lossy(&buffer[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let target = request_line.next()?.to_string();

    let headers: HashMap<String, String> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.trim().to_ascii_lowercase(), value.trim().to_string()))
        .collect();

    let content_length = headers
        .get("content-length")
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(0);
    while buffer.len() < header_end + content_length {
        let read = stream.read(&mut chunk).await.ok()?;
        if read == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..read]);
    }
    let body_end = (header_end + content_length).min(buffer.len());
    let body = String::from_utf8_lossy(&buffer[header_end..body_end]).to_string();

    let (path, query) = match target.split_once('?') {
        Some((path, query)) => (
            path.to_string(),
            url::form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect(),
        ),
        None => (target, HashMap::new()),
    };

    Some(RecordedRequest {
        method,
        path,
        query,
        headers,
        body,
    })
}

async fn write_reply(stream: &mut TcpStream, reply: Reply) {
    let mut response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n",
        reply.status,
        reason_phrase(reply.status),
        reply.content_type,
        reply.body.len()
    );
    for (name, value) in &reply.headers {
        response.push_str(&format!("{}: {}\r\n", name, value));
    }
    response.push_str("\r\n");
    response.push_str(&reply.body);

    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.shutdown().await;
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        302 => "Found",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

fn route(state: &VaultState, request: &RecordedRequest) -> Reply {
    match (request.method.as_str(), request.path.as_str()) {
        ("GET", "/") => match &state.warmup_redirect {
            Some(location) => with_session_cookies(state, Reply::text(302, ""))
                .with_header("Location", location),
            None => with_session_cookies(state, warmup_page(state)),
        },
        ("GET", "/home") => warmup_page(state),
        ("POST", "/api/users") => login(state, request),
        ("GET", "/api/vods") => {
            if !request.has_cookie("session", AUTHED_SESSION) {
                return Reply::json(401, json!({ "error": "NOT_LOGGED_IN" }));
            }
            if request.query_param("get") == Some("file_info") {
                detail(state, request)
            } else {
                listing(state, request)
            }
        }
        _ => Reply::json(404, json!({ "error": "NOT_FOUND" })),
    }
}

fn warmup_page(state: &VaultState) -> Reply {
    let head = state
        .csrf_meta
        .as_ref()
        .map(|token| format!(r#"<meta name="csrf-token" content="{}">"#, token))
        .unwrap_or_default();
    let page = format!(
        "<!doctype html><html><head><title>Vault</title>{}</head><body></body></html>",
        head
    );

    Reply::html(state.warmup_status, &page)
}

fn with_session_cookies(state: &VaultState, reply: Reply) -> Reply {
    let mut reply = reply.with_header(
        "Set-Cookie",
        &format!("session={}; Path=/; HttpOnly", ANON_SESSION),
    );
    if let Some(token) = &state.csrf_cookie {
        reply = reply.with_header("Set-Cookie", &format!("XSRF-TOKEN={}; Path=/", token));
    }
    reply
}

fn login(state: &VaultState, request: &RecordedRequest) -> Reply {
    // Anti-forgery check: both header names must echo the decoded token
    let expected = state
        .csrf_cookie
        .as_deref()
        .map(|raw| {
            percent_encoding::percent_decode_str(raw)
                .decode_utf8_lossy()
                .to_string()
        })
        .or_else(|| state.csrf_meta.clone());
    if let Some(expected) = expected {
        let ok = request.header("x-xsrf-token") == Some(expected.as_str())
            && request.header("x-csrf-token") == Some(expected.as_str());
        if !ok {
            return Reply::json(403, json!({ "error": "CSRF_MISMATCH" }));
        }
    }
    if !request.has_cookie("session", ANON_SESSION) {
        return Reply::json(403, json!({ "error": "NO_SESSION" }));
    }

    let body = request.json_body();
    if body["action"] != "login"
        || body["username"] != state.username.as_str()
        || body["password"] != state.password.as_str()
    {
        return Reply::json(401, json!({ "error": "INVALID_CREDENTIALS" }));
    }

    if let Some(required) = &state.totp {
        if body["totp"].as_str() != Some(required.as_str()) {
            return Reply::json(401, json!({ "error": "TOTP_REQUIRED" }));
        }
    }

    Reply::json(
        200,
        json!({ "data": { "ID": state.user_id, "username": state.username } }),
    )
    .with_header(
        "Set-Cookie",
        &format!("session={}; Path=/; HttpOnly", AUTHED_SESSION),
    )
}

fn listing(state: &VaultState, request: &RecordedRequest) -> Reply {
    if let Some(body) = &state.listing_body {
        return Reply::text(state.listing_status.unwrap_or(200), body);
    }
    if let Some(status) = state.listing_status {
        return Reply::json(status, json!({ "error": "LISTING_FAILED" }));
    }

    let page: usize = request
        .query_param("page")
        .and_then(|p| p.parse().ok())
        .unwrap_or(1);
    let limit: usize = request
        .query_param("limit")
        .and_then(|l| l.parse().ok())
        .unwrap_or(100);

    let records: Vec<Value> = state
        .listing
        .iter()
        .skip(page.saturating_sub(1) * limit)
        .take(limit)
        .cloned()
        .collect();
    Reply::json(200, json!({ "data": records }))
}

fn detail(state: &VaultState, request: &RecordedRequest) -> Reply {
    if let Some(body) = &state.detail_body {
        return Reply::text(state.detail_status.unwrap_or(200), body);
    }
    if let Some(status) = state.detail_status {
        return Reply::json(status, json!({ "error": "DETAIL_FAILED" }));
    }

    let id = request.query_param("ids").unwrap_or_default();
    let files = state.files.get(id).cloned().unwrap_or_default();
    let mut body = serde_json::Map::new();
    body.insert(state.files_key.to_string(), Value::Array(files));
    Reply::json(200, Value::Object(body))
}

/// A listing record in the vault's raw shape
pub fn raw_vod(id: &str, title: &str, recorded_at: i64) -> Value {
    json!({
        "id": id,
        "title": title,
        "channel": "alice_live",
        "created_at": recorded_at - 60,
        "recorded_at": recorded_at,
        "duration": "3600",
        "twitch_id": recorded_at * 10,
    })
}

/// A detail file in the vault's raw shape
pub fn raw_file(name: &str, size: u64) -> Value {
    json!({
        "file_id": format!("f-{}", name),
        "file_name": name,
        "size": size,
        "download_url": format!("/download/{}", name),
        "mime_type": "video/mp4",
    })
}
