//! Tenant network provisioning core
//!
//! Keeps a scoped, reconciled view of a project's virtual network
//! resources and turns gaps in that view into a provisioning checklist
//! with one-click remediation actions.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │               UI / netctl / scripts              │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │                 NetworkService                   │
//! │  ┌──────────────┐  ┌──────────────┐             │
//! │  │  Reconciler  │  │  Dispatcher  │             │
//! │  └──────┬───────┘  └──────┬───────┘             │
//! │  ┌──────▼───────┐  ┌──────▼───────┐             │
//! │  │ResourceStore │◄─┤  Checklist   │             │
//! │  └──────────────┘  │   Resolver   │             │
//! │                    └──────────────┘             │
//! └───────┬─────────────────┬───────────────────────┘
//!         │                 │
//! ┌───────▼───────┐ ┌───────▼───────┐
//! │ProviderGateway│ │AccountGateway │
//! └───────────────┘ └───────────────┘
//! ```
//!
//! Every operation takes an explicit [`Scope`]. Nothing runs in the
//! background: callers sync, aggregate and dispatch on demand.

pub mod account;
pub mod action;
pub mod checklist;
pub mod dispatch;
pub mod error;
pub mod model;
pub mod provider;
pub mod reconcile;
pub mod resolver;
pub mod scope;
pub mod service;
pub mod store;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// Re-exports
pub use account::{AccountSignals, LocalUser, ProviderAccountStatus};
pub use action::{Action, ActionRequest, Method, normalize_endpoint};
pub use checklist::ChecklistItem;
pub use dispatch::{ActionDispatcher, DispatchOutcome, Namespace};
pub use error::{ErrorKind, ErrorReport, NetError, Result};
pub use model::{
    EdgeConfig, InternetGateway, NetworkInterface, Resource, ResourceKind, ResourceState, Route,
    RouteTable, RouteTableAssociation, RouteTarget, RouteTargetFields, SecurityGroup, Subnet,
    TargetKind, TypedResource, Vpc,
};
pub use provider::{AccountGateway, Mutation, Operation, ProviderGateway};
pub use reconcile::{Reconciler, SyncReport};
pub use resolver::{DependencyResolver, GatewayChoice, GatewayFallback, TargetCandidates};
pub use scope::{ProjectContext, Scope};
pub use service::{EdgeAssignment, NetworkService};
pub use store::ResourceStore;
