//! Review backend HTTP client using reqwest

use std::time::Duration;

use crate::{Error, Result};
use reqwest::{Response, StatusCode};
use revlight_core::{Config, PollPolicy};
use serde_json::Value;
use tracing::{debug, info};
use url::Url;

/// HTTP client for the review backend
#[derive(Clone)]
pub struct ReviewClient {
    http: reqwest::Client,
    base_url: Url,
    poll: PollPolicy,
}

impl ReviewClient {
    /// Create a client for the backend at `base_url` with default settings
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(30))
    }

    /// Create a client with a per-request timeout
    pub fn with_timeout(base_url: &str, request_timeout: Duration) -> Result<Self> {
        let base_url = parse_base_url(base_url)?;

        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .user_agent(concat!("revlight/", env!("CARGO_PKG_VERSION")))
            .build()?;

        info!(base_url = %base_url, "Created review backend client");

        Ok(Self {
            http,
            base_url,
            poll: PollPolicy::default(),
        })
    }

    /// Create a client from loaded configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(
            Self::with_timeout(&config.backend.url, config.backend.request_timeout)?
                .with_poll_policy(config.poll.clone()),
        )
    }

    /// Set the policy used while waiting for feedback
    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    /// Get the backend base URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Get the poll policy
    pub fn poll_policy(&self) -> &PollPolicy {
        &self.poll
    }

    /// Get the underlying reqwest client
    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Resolve an endpoint path against the base URL
    pub(crate) fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::InvalidUrl(format!("{}{}: {}", self.base_url, path, e)))
    }
}

impl std::fmt::Debug for ReviewClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReviewClient")
            .field("base_url", &self.base_url.as_str())
            .field("poll", &self.poll)
            .finish_non_exhaustive()
    }
}

/// Turn a non-success response into [`Error::Status`]
///
/// The backend reports failures as `{"error": "..."}`; that message is kept
/// when present.
pub(crate) async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();
    let message = error_message(status, &body);

    debug!(status = %status, url = %url, body = %body, "Backend request failed");

    Err(Error::Status {
        status,
        url,
        message,
    })
}

fn error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty() && trimmed.len() <= 200).then(|| trimmed.to_string())
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        })
}

/// Read a response body as JSON, reporting malformed bodies as protocol errors
pub(crate) async fn read_json(response: Response) -> Result<Value> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| {
        Error::Protocol(format!(
            "response is not valid JSON ({}): {}",
            e,
            truncate(&body, 120)
        ))
    })
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Parse and normalize a backend base URL
///
/// Supports formats:
/// - http://host:port
/// - https://host/prefix (endpoints resolve under `/prefix/`)
fn parse_base_url(raw: &str) -> Result<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(Error::InvalidUrl("backend URL is empty".to_string()));
    }

    let mut url = Url::parse(raw).map_err(|e| Error::InvalidUrl(format!("{}: {}", raw, e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::InvalidUrl(format!(
            "{}: scheme must be http or https",
            raw
        )));
    }
    if url.cannot_be_a_base() || url.host_str().is_none() {
        return Err(Error::InvalidUrl(format!("{}: missing host", raw)));
    }

    url.set_query(None);
    url.set_fragment(None);

    // Without a trailing slash, joining would replace the last path segment
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}
