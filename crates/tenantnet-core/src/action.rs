//! Remediation actions
//!
//! An [`Action`] is an immutable `{endpoint, method, body}` description of a
//! call that fixes an incomplete checklist item. The core never builds
//! user-specific endpoints itself; those arrive inside account signals.

use crate::error::{NetError, Result};
use serde::{Deserialize, Serialize};

/// HTTP-style verb of an action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl Method {
    /// Methods whose `ResourceConflict` answer means "already done"
    pub fn is_idempotent_write(&self) -> bool {
        matches!(self, Method::Post | Method::Patch)
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
            Method::Patch => write!(f, "PATCH"),
            Method::Delete => write!(f, "DELETE"),
        }
    }
}

impl std::str::FromStr for Method {
    type Err = NetError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            other => Err(NetError::Validation(format!("unsupported method: {}", other))),
        }
    }
}

/// A remediation call attached to a checklist item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Endpoint path, e.g. `/users/42/roles`
    pub endpoint: String,

    pub method: Method,

    /// JSON body, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,

    /// Short human label, e.g. "Assign tenant-admin role"
    pub label: String,

    /// Region the call targets; provider resources are region-scoped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

impl Action {
    pub fn new(method: Method, endpoint: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            method,
            body: None,
            label: label.into(),
            region: None,
        }
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }
}

/// Trim the endpoint and make sure it starts with exactly one `/`
pub fn normalize_endpoint(endpoint: &str) -> Result<String> {
    let trimmed = endpoint.trim().trim_start_matches('/');
    if trimmed.is_empty() {
        return Err(NetError::Validation(format!(
            "action endpoint is empty: {:?}",
            endpoint
        )));
    }
    Ok(format!("/{}", trimmed))
}

/// Normalized request handed to a transport
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionRequest {
    pub project_id: String,
    pub endpoint: String,
    pub method: Method,
    pub body: Option<serde_json::Value>,
    pub region: Option<String>,
}

impl ActionRequest {
    pub fn from_action(project_id: impl Into<String>, action: &Action) -> Result<Self> {
        Ok(Self {
            project_id: project_id.into(),
            endpoint: normalize_endpoint(&action.endpoint)?,
            method: action.method,
            body: action.body.clone(),
            region: action.region.clone(),
        })
    }
}
