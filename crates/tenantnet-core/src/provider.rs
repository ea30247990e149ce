//! Gateway traits for the external cloud provider and account system
//!
//! The provider is the source of truth for resource existence and state.
//! Everything that crosses the network goes through [`ProviderGateway`] or
//! [`AccountGateway`]; the rest of the core is in-memory.

use crate::account::AccountSignals;
use crate::action::ActionRequest;
use crate::error::{NetError, Result};
use crate::model::{Resource, ResourceKind};
use crate::scope::Scope;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// Cloud provider resource API
#[async_trait]
pub trait ProviderGateway: Send + Sync {
    /// Returns the provider name (e.g., "http", "fake")
    fn name(&self) -> &str;

    /// List every record of `kind` in the scope.
    ///
    /// `force_refresh` bypasses provider-side caches and is only set by
    /// reconciliation.
    async fn list(
        &self,
        kind: ResourceKind,
        scope: &Scope,
        force_refresh: bool,
    ) -> Result<Vec<Resource>>;

    /// Apply a mutation; returns the resulting record when the provider
    /// sends one back
    async fn mutate(
        &self,
        kind: ResourceKind,
        scope: &Scope,
        mutation: &Mutation,
    ) -> Result<Option<Resource>>;

    /// Generic `{endpoint, method, body}` call used by action dispatch
    async fn send(&self, request: &ActionRequest) -> Result<serde_json::Value>;
}

/// Account-management API (users, roles, provider account link)
#[async_trait]
pub trait AccountGateway: Send + Sync {
    async fn fetch_signals(&self, project_id: &str) -> Result<AccountSignals>;

    async fn send(&self, request: &ActionRequest) -> Result<serde_json::Value>;
}

/// Kind of provider mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Create,
    Delete,
    Associate,
    Disassociate,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Create => write!(f, "create"),
            Operation::Delete => write!(f, "delete"),
            Operation::Associate => write!(f, "associate"),
            Operation::Disassociate => write!(f, "disassociate"),
        }
    }
}

/// A single provider mutation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mutation {
    pub operation: Operation,

    /// Target id; absent for create
    pub id: Option<String>,

    pub payload: serde_json::Value,
}

impl Mutation {
    pub fn create(payload: serde_json::Value) -> Self {
        Self {
            operation: Operation::Create,
            id: None,
            payload,
        }
    }

    pub fn delete(id: impl Into<String>) -> Self {
        Self {
            operation: Operation::Delete,
            id: Some(id.into()),
            payload: serde_json::Value::Null,
        }
    }

    pub fn associate(id: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            operation: Operation::Associate,
            id: Some(id.into()),
            payload,
        }
    }

    pub fn disassociate(id: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            operation: Operation::Disassociate,
            id: Some(id.into()),
            payload,
        }
    }
}

/// Run a gateway call under an optional deadline.
///
/// An elapsed deadline is reported as `ProviderUnavailable`. The inner
/// future is dropped, which releases anything it holds.
pub async fn with_timeout<T, F>(timeout: Option<Duration>, what: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match timeout {
        Some(limit) => tokio::time::timeout(limit, fut).await.map_err(|_| {
            tracing::warn!("{} timed out after {:?}", what, limit);
            NetError::ProviderUnavailable(format!("{} timed out after {:?}", what, limit))
        })?,
        None => fut.await,
    }
}
