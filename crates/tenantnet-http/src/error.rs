//! HTTP transport error types

use tenantnet_core::NetError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HttpError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("API reported failure: {0}")]
    Api(String),

    #[error("Invalid base URL: {0}")]
    InvalidUrl(String),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, HttpError>;

impl From<HttpError> for NetError {
    fn from(err: HttpError) -> Self {
        let message = err.to_string();
        match err {
            HttpError::Request(e) if e.is_decode() => NetError::Validation(message),
            HttpError::Request(_) => NetError::ProviderUnavailable(message),
            HttpError::Status { status, .. } => match status {
                404 => NetError::ResourceNotFound(message),
                409 => NetError::ResourceConflict(message),
                400 | 422 => NetError::Validation(message),
                _ => NetError::ProviderUnavailable(message),
            },
            HttpError::Api(_) => NetError::ProviderUnavailable(message),
            HttpError::InvalidUrl(_) => NetError::Validation(message),
            HttpError::Json(e) => NetError::Json(e),
        }
    }
}
