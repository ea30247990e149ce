//! Remediation action dispatch
//!
//! Actions are routed by endpoint namespace: account-management endpoints
//! go to the [`AccountGateway`], everything else to the
//! [`ProviderGateway`]. At most one call per `(project_id, endpoint)` is
//! in flight at a time.

use crate::action::{Action, ActionRequest};
use crate::error::{NetError, Result};
use crate::provider::{AccountGateway, ProviderGateway, with_timeout};
use dashmap::DashSet;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Endpoint prefixes served by the account-management API
const ACCOUNT_NAMESPACES: [&str; 3] = ["/accounts", "/users", "/provider-accounts"];

/// Which gateway an endpoint belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    Provider,
    Account,
}

impl Namespace {
    /// Classify a normalized endpoint
    pub fn of(endpoint: &str) -> Self {
        let is_account = ACCOUNT_NAMESPACES.iter().any(|prefix| {
            endpoint
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.is_empty() || rest.starts_with(['/', '?']))
        });
        if is_account {
            Namespace::Account
        } else {
            Namespace::Provider
        }
    }
}

/// Result of a dispatched action
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// The transport accepted the call
    Completed {
        namespace: Namespace,
        response: serde_json::Value,
    },
    /// The target already reported the desired state (conflict on POST/PATCH)
    AlreadySatisfied { namespace: Namespace, message: String },
}

type FlightKey = (String, String);

/// Removes the in-flight entry when dropped
struct InFlightGuard<'a> {
    set: &'a DashSet<FlightKey>,
    key: FlightKey,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(set: &'a DashSet<FlightKey>, project_id: &str, endpoint: &str) -> Result<Self> {
        let key = (project_id.to_string(), endpoint.to_string());
        if !set.insert(key.clone()) {
            return Err(NetError::ActionAlreadyInFlight(format!(
                "{} for project {}",
                endpoint, project_id
            )));
        }
        Ok(Self { set, key })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.set.remove(&self.key);
    }
}

/// Issues remediation actions with a per-project single-flight guard
pub struct ActionDispatcher {
    provider: Arc<dyn ProviderGateway>,
    accounts: Arc<dyn AccountGateway>,
    in_flight: DashSet<FlightKey>,
    timeout: Option<Duration>,
}

impl ActionDispatcher {
    pub fn new(provider: Arc<dyn ProviderGateway>, accounts: Arc<dyn AccountGateway>) -> Self {
        Self {
            provider,
            accounts,
            in_flight: DashSet::new(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Whether a call for this endpoint is outstanding
    pub fn is_in_flight(&self, project_id: &str, endpoint: &str) -> bool {
        self.in_flight
            .contains(&(project_id.to_string(), endpoint.to_string()))
    }

    /// Issue the action and wait for the transport.
    ///
    /// A second call for the same normalized endpoint in the same project
    /// fails with `ActionAlreadyInFlight` without reaching the transport.
    /// The caller is expected to re-sync and re-aggregate afterwards.
    pub async fn dispatch(&self, project_id: &str, action: &Action) -> Result<DispatchOutcome> {
        let request = ActionRequest::from_action(project_id, action)?;
        let _guard = InFlightGuard::acquire(&self.in_flight, project_id, &request.endpoint)?;

        let namespace = Namespace::of(&request.endpoint);
        let what = format!("{} {}", request.method, request.endpoint);
        tracing::info!("Dispatching {} for project {}", what, project_id);

        let result = match namespace {
            Namespace::Account => {
                with_timeout(self.timeout, &what, self.accounts.send(&request)).await
            }
            Namespace::Provider => {
                with_timeout(self.timeout, &what, self.provider.send(&request)).await
            }
        };

        match result {
            Ok(response) => Ok(DispatchOutcome::Completed {
                namespace,
                response,
            }),
            Err(NetError::ResourceConflict(message)) if request.method.is_idempotent_write() => {
                tracing::info!("{} already satisfied: {}", what, message);
                Ok(DispatchOutcome::AlreadySatisfied { namespace, message })
            }
            Err(e) => {
                tracing::warn!("Dispatch of {} failed: {}", what, e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Method;
    use crate::testing::{FakeAccounts, FakeProvider};

    fn setup() -> (Arc<FakeProvider>, Arc<FakeAccounts>, Arc<ActionDispatcher>) {
        let provider = Arc::new(FakeProvider::new());
        let accounts = Arc::new(FakeAccounts::new());
        let dispatcher = Arc::new(ActionDispatcher::new(provider.clone(), accounts.clone()));
        (provider, accounts, dispatcher)
    }

    fn attach_igw() -> Action {
        Action::new(Method::Post, "/internet-gateways/igw-1/associate", "Attach gateway")
            .with_body(serde_json::json!({"vpc_id": "vpc-1"}))
    }

    async fn wait_for_sends(provider: &FakeProvider, n: usize) {
        while provider.sends_started() < n {
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn test_namespace_routing() {
        assert_eq!(Namespace::of("/users/42/roles"), Namespace::Account);
        assert_eq!(Namespace::of("/provider-accounts/p1/sync"), Namespace::Account);
        assert_eq!(Namespace::of("/accounts"), Namespace::Account);
        assert_eq!(Namespace::of("/usersettings"), Namespace::Provider);
        assert_eq!(Namespace::of("/networks"), Namespace::Provider);
    }

    #[tokio::test]
    async fn test_endpoint_is_normalized_before_sending() {
        let (provider, _accounts, dispatcher) = setup();
        let action = Action::new(Method::Post, "  ///routes ", "Add route");

        dispatcher.dispatch("p1", &action).await.unwrap();

        assert_eq!(provider.sends()[0].endpoint, "/routes");
    }

    #[tokio::test]
    async fn test_account_endpoints_go_to_account_gateway() {
        let (provider, accounts, dispatcher) = setup();
        let action = Action::new(Method::Post, "users/u2/roles", "Assign role");

        let outcome = dispatcher.dispatch("p1", &action).await.unwrap();

        assert!(matches!(
            outcome,
            DispatchOutcome::Completed {
                namespace: Namespace::Account,
                ..
            }
        ));
        assert_eq!(accounts.sends().len(), 1);
        assert!(provider.sends().is_empty());
    }

    #[tokio::test]
    async fn test_empty_endpoint_is_rejected() {
        let (provider, _accounts, dispatcher) = setup();
        let err = dispatcher
            .dispatch("p1", &Action::new(Method::Post, " / ", "noop"))
            .await
            .unwrap_err();
        assert!(matches!(err, NetError::Validation(_)));
        assert_eq!(provider.sends_started(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_dispatch_reaches_transport_once() {
        let (provider, _accounts, dispatcher) = setup();
        provider.hold_sends();

        let first = {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move { dispatcher.dispatch("p1", &attach_igw()).await })
        };
        wait_for_sends(&provider, 1).await;

        let second = dispatcher.dispatch("p1", &attach_igw()).await;
        assert!(matches!(second, Err(NetError::ActionAlreadyInFlight(_))));

        provider.release_sends();
        assert!(first.await.unwrap().is_ok());
        assert_eq!(provider.sends().len(), 1);
        assert!(!dispatcher.is_in_flight("p1", "/internet-gateways/igw-1/associate"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_same_endpoint_in_other_project_does_not_contend() {
        let (provider, _accounts, dispatcher) = setup();
        provider.hold_sends();

        let first = {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move { dispatcher.dispatch("p1", &attach_igw()).await })
        };
        let second = {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move { dispatcher.dispatch("p2", &attach_igw()).await })
        };
        wait_for_sends(&provider, 2).await;

        provider.release_sends();
        assert!(first.await.unwrap().is_ok());
        assert!(second.await.unwrap().is_ok());
        assert_eq!(provider.sends().len(), 2);
    }

    #[tokio::test]
    async fn test_guard_released_after_error() {
        let (provider, _accounts, dispatcher) = setup();
        provider.fail_next_send(NetError::ProviderUnavailable("502".to_string()));

        let err = dispatcher.dispatch("p1", &attach_igw()).await.unwrap_err();
        assert!(err.is_retryable());

        assert!(dispatcher.dispatch("p1", &attach_igw()).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_releases_guard() {
        let provider = Arc::new(FakeProvider::new());
        let dispatcher = ActionDispatcher::new(provider.clone(), Arc::new(FakeAccounts::new()))
            .with_timeout(Duration::from_secs(5));
        provider.hold_sends();

        let err = dispatcher.dispatch("p1", &attach_igw()).await.unwrap_err();
        assert!(matches!(err, NetError::ProviderUnavailable(_)));
        assert!(!dispatcher.is_in_flight("p1", "/internet-gateways/igw-1/associate"));

        provider.release_sends();
        assert!(dispatcher.dispatch("p1", &attach_igw()).await.is_ok());
    }

    #[tokio::test]
    async fn test_conflict_on_post_is_already_satisfied() {
        let (provider, _accounts, dispatcher) = setup();
        provider.fail_next_send(NetError::ResourceConflict("already attached".to_string()));

        let outcome = dispatcher.dispatch("p1", &attach_igw()).await.unwrap();
        assert!(matches!(outcome, DispatchOutcome::AlreadySatisfied { .. }));
    }

    #[tokio::test]
    async fn test_conflict_on_delete_surfaces() {
        let (provider, _accounts, dispatcher) = setup();
        provider.fail_next_send(NetError::ResourceConflict("in use".to_string()));

        let action = Action::new(Method::Delete, "/security-groups/sg-1", "Delete group");
        let err = dispatcher.dispatch("p1", &action).await.unwrap_err();
        assert!(err.is_conflict());
    }
}
