//! JSON API client shared by the provider and account transports
//!
//! Every response is wrapped in the `{success, result, errors}` envelope.
//! Requests carry a bearer token when one is configured.

use crate::error::{HttpError, Result};
use reqwest::{Method, Url};
use serde::Deserialize;
use std::time::Duration;

/// Connection settings for one API
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            timeout: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let mut base_url = Url::parse(&config.base_url)
            .map_err(|e| HttpError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(HttpError::InvalidUrl(config.base_url));
        }
        // Keep a trailing slash off so segments append cleanly
        if base_url.path().ends_with('/') {
            let trimmed = base_url.path().trim_end_matches('/').to_string();
            base_url.set_path(&trimmed);
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url,
            token: config.token,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build a URL from literal path segments (each one percent-encoded)
    /// and query pairs
    pub fn url(&self, segments: &[&str], query: &[(&str, &str)]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        append_query(&mut url, query);
        url
    }

    /// Build a URL from an endpoint that arrives pre-built, e.g.
    /// `/users/42/roles?role=tenant-admin`.
    ///
    /// The path is appended to the base path without re-encoding and any
    /// embedded query is kept ahead of `query`.
    pub fn endpoint_url(&self, endpoint: &str, query: &[(&str, &str)]) -> Url {
        let (path, embedded) = match endpoint.split_once('?') {
            Some((path, embedded)) => (path, Some(embedded)),
            None => (endpoint, None),
        };

        let mut url = self.base_url.clone();
        let base = url.path().trim_end_matches('/').to_string();
        url.set_path(&format!("{}/{}", base, path.trim_start_matches('/')));
        url.set_query(embedded.filter(|q| !q.is_empty()));
        append_query(&mut url, query);
        url
    }

    /// Send a request and unwrap the response envelope
    pub async fn execute(
        &self,
        method: Method,
        url: Url,
        body: Option<&serde_json::Value>,
    ) -> Result<serde_json::Value> {
        tracing::debug!("{} {}", method, url);

        let mut request = self.client.request(method, url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(HttpError::Status {
                status: status.as_u16(),
                message: error_message(&text).unwrap_or_else(|| {
                    status.canonical_reason().unwrap_or("unknown").to_string()
                }),
            });
        }

        parse_envelope(&text)
    }
}

fn append_query(url: &mut Url, query: &[(&str, &str)]) {
    if query.is_empty() {
        return;
    }
    let mut pairs = url.query_pairs_mut();
    for (key, value) in query {
        pairs.append_pair(key, value);
    }
}

// ============ API Types ============

#[derive(Debug, Deserialize)]
struct ApiResponse {
    success: bool,
    #[serde(default)]
    result: serde_json::Value,
    #[serde(default)]
    errors: Vec<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[allow(dead_code)]
    #[serde(default)]
    code: i32,
    message: String,
}

/// Unwrap a 2xx body. An empty body means no result.
fn parse_envelope(text: &str) -> Result<serde_json::Value> {
    if text.trim().is_empty() {
        return Ok(serde_json::Value::Null);
    }

    let api_response: ApiResponse = serde_json::from_str(text)?;
    if !api_response.success {
        let error_msg = api_response
            .errors
            .first()
            .map(|e| e.message.clone())
            .unwrap_or_else(|| "Unknown error".to_string());
        return Err(HttpError::Api(error_msg));
    }

    Ok(api_response.result)
}

/// First error message of an error body, if it is an envelope
fn error_message(text: &str) -> Option<String> {
    serde_json::from_str::<ApiResponse>(text)
        .ok()
        .and_then(|r| r.errors.into_iter().next())
        .map(|e| e.message)
}
