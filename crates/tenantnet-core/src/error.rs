//! Network core error types

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by the network provisioning core
#[derive(Error, Debug)]
pub enum NetError {
    /// Transient network or provider fault; the caller may retry
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Target is already in the requested state
    #[error("Resource conflict: {0}")]
    ResourceConflict(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("No internet gateway available: {0}")]
    NoGatewayAvailable(String),

    #[error("Action already in flight: {0}")]
    ActionAlreadyInFlight(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Machine-readable error category handed to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ProviderUnavailable,
    ResourceConflict,
    ResourceNotFound,
    NoGatewayAvailable,
    ActionAlreadyInFlight,
    ValidationError,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::ProviderUnavailable => write!(f, "provider_unavailable"),
            ErrorKind::ResourceConflict => write!(f, "resource_conflict"),
            ErrorKind::ResourceNotFound => write!(f, "resource_not_found"),
            ErrorKind::NoGatewayAvailable => write!(f, "no_gateway_available"),
            ErrorKind::ActionAlreadyInFlight => write!(f, "action_already_in_flight"),
            ErrorKind::ValidationError => write!(f, "validation_error"),
        }
    }
}

/// Structured error (kind + message) reported to the UI layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
}

impl NetError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            NetError::ProviderUnavailable(_) => ErrorKind::ProviderUnavailable,
            NetError::ResourceConflict(_) => ErrorKind::ResourceConflict,
            NetError::ResourceNotFound(_) => ErrorKind::ResourceNotFound,
            NetError::NoGatewayAvailable(_) => ErrorKind::NoGatewayAvailable,
            NetError::ActionAlreadyInFlight(_) => ErrorKind::ActionAlreadyInFlight,
            // A payload that fails to decode is a malformed record
            NetError::Validation(_) | NetError::Json(_) => ErrorKind::ValidationError,
        }
    }

    /// Only transient provider faults are safe to retry
    pub fn is_retryable(&self) -> bool {
        matches!(self, NetError::ProviderUnavailable(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, NetError::ResourceConflict(_))
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, NetError>;
