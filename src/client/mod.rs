//! HTTP facade over a Supabase project.
//!
//! The client is built explicitly and shared by reference or `Arc`; there is
//! no process-wide instance. Every public operation is wrapped in a
//! [`LoadingScope`](crate::loading::LoadingScope), and edge-function calls
//! additionally go through the client's [`CallGuard`].

pub mod auth;
pub mod database;
pub mod functions;
pub mod storage;

use parking_lot::RwLock;
use reqwest::{Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::guard::CallGuard;
use crate::loading::Loading;
use crate::metrics::{REQUEST_LATENCY, REQUEST_TOTAL};
use crate::models::Session;

pub struct SupabaseClient {
    http: reqwest::Client,
    config: ClientConfig,
    session: RwLock<Option<Session>>,
    guard: CallGuard,
    loading: Loading,
}

impl SupabaseClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            guard: CallGuard::new(config.function_window),
            config,
            session: RwLock::new(None),
            loading: Loading::new(),
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Register the observer here to receive loading notifications.
    pub fn loading(&self) -> &Loading {
        &self.loading
    }

    pub fn guard(&self) -> &CallGuard {
        &self.guard
    }

    pub fn session(&self) -> Option<Session> {
        self.session.read().clone()
    }

    /// Replace the stored session, e.g. one restored from disk.
    pub fn set_session(&self, session: Option<Session>) {
        *self.session.write() = session;
    }

    // Each segment is percent-encoded on its own, so `/`, `?` and `#` inside
    // a segment never change which resource is addressed
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.config.url)
            .map_err(|e| Error::Config(format!("invalid URL {}: {}", self.config.url, e)))?;
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("{} cannot be a base URL", self.config.url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    // `prefix` followed by the bucket and every `/`-separated part of `path`
    fn object_endpoint(&self, prefix: &[&str], bucket: &str, path: &str) -> Result<Url> {
        require_name("bucket", bucket)?;
        let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
        if parts.is_empty() {
            return Err(Error::InvalidInput("object path must not be empty".to_string()));
        }
        let mut segments = prefix.to_vec();
        segments.push(bucket);
        segments.extend(parts);
        self.endpoint(&segments)
    }

    fn bearer(&self) -> String {
        match self.session.read().as_ref() {
            Some(session) => session.access_token.clone(),
            None => self.config.anon_key.clone(),
        }
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        debug!(%method, %url, "backend request");
        self.http
            .request(method, url)
            .header("apikey", &self.config.anon_key)
            .bearer_auth(self.bearer())
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        REQUEST_TOTAL.inc();
        let start_time = Instant::now();
        let response = builder.send().await?;
        REQUEST_LATENCY.observe(start_time.elapsed().as_secs_f64());
        check_status(response).await
    }

    // Empty bodies decode as JSON null so `()` and `Value` targets work
    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = self.send(builder).await?;
        let body = response.bytes().await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(serde_json::from_value(Value::Null)?);
        }
        Ok(serde_json::from_slice(&body)?)
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body);
    warn!(status = status.as_u16(), %message, "backend returned an error");
    Err(Error::Api {
        status: status.as_u16(),
        message,
    })
}

// Auth, PostgREST and storage each name the message field differently
fn error_message(body: &str) -> String {
    let from_json = serde_json::from_str::<Value>(body).ok().and_then(|v| {
        ["message", "msg", "error_description", "error"]
            .iter()
            .find_map(|key| v.get(*key).and_then(Value::as_str).map(str::to_string))
    });
    match from_json {
        Some(message) => message,
        None if body.trim().is_empty() => "Unknown error".to_string(),
        None => body.to_string(),
    }
}

// Names map to a single path segment; separators would address another resource
pub(crate) fn require_name(kind: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidInput(format!("{} name must not be empty", kind)));
    }
    if value.contains(['/', '?', '#']) {
        return Err(Error::InvalidInput(format!(
            "{} name must not contain '/', '?' or '#': {:?}",
            kind, value
        )));
    }
    Ok(())
}
