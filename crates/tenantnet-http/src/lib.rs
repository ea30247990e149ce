//! HTTP transports for tenantnet
//!
//! Implements the core's gateway traits against two JSON APIs:
//!
//! - **Provider API**: resource collections per kind (`/networks`,
//!   `/subnets`, `/network-interfaces`, ...) scoped by `project_id` and
//!   `region`
//! - **Account API**: user roles and the provider account link
//!
//! Status codes map onto the core taxonomy: 404 is `ResourceNotFound`,
//! 409 is `ResourceConflict`, 400/422 are `ValidationError`, and anything
//! else (including timeouts and connection failures) is
//! `ProviderUnavailable`.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tenantnet_core::NetworkService;
//! use tenantnet_http::{ClientConfig, HttpAccountGateway, HttpProviderGateway};
//!
//! let provider = HttpProviderGateway::new(
//!     ClientConfig::new("https://cloud.example.com/api").with_token(token.clone()),
//! )?;
//! let accounts = HttpAccountGateway::new(ClientConfig::new("https://accounts.example.com"))?;
//!
//! let service = NetworkService::new(Arc::new(provider), Arc::new(accounts))
//!     .with_timeout(Duration::from_secs(30));
//! ```

pub mod account;
pub mod client;
pub mod error;
pub mod provider;

pub use account::HttpAccountGateway;
pub use client::{ApiClient, ClientConfig};
pub use error::{HttpError, Result};
pub use provider::{HttpProviderGateway, resource_path};
