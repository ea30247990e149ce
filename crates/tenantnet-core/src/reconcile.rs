//! Reconciliation engine
//!
//! `sync` lists a (kind, scope) partition from the provider with a forced
//! refresh and replaces the local partition with the result. Records the
//! provider does not report are pruned. A failed listing leaves the store
//! untouched.

use crate::error::Result;
use crate::model::ResourceKind;
use crate::provider::{ProviderGateway, with_timeout};
use crate::scope::Scope;
use crate::store::{ReplaceOutcome, ResourceStore};
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Result of one sync pass
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub kind: ResourceKind,
    pub scope: Scope,

    /// Records written from the provider listing
    pub upserted: usize,

    /// Local records pruned because the provider no longer reports them
    pub removed: Vec<String>,

    /// A sync that started later already replaced this partition
    pub superseded: bool,

    pub synced_at: DateTime<Utc>,
}

/// Pulls authoritative listings into the resource store
pub struct Reconciler {
    provider: Arc<dyn ProviderGateway>,
    store: Arc<ResourceStore>,
    timeout: Option<Duration>,
    generation: AtomicU64,
}

impl Reconciler {
    pub fn new(provider: Arc<dyn ProviderGateway>, store: Arc<ResourceStore>) -> Self {
        Self {
            provider,
            store,
            timeout: None,
            generation: AtomicU64::new(0),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Replace the local (kind, scope) partition with the provider's view.
    ///
    /// Never cascades to parent or child kinds.
    pub async fn sync(&self, kind: ResourceKind, scope: &Scope) -> Result<SyncReport> {
        // Taken before the listing so the later-started sync wins
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let what = format!("list {} in {}", kind, scope);
        let records = with_timeout(self.timeout, &what, self.provider.list(kind, scope, true))
            .await
            .inspect_err(|e| tracing::warn!("Sync of {} in {} failed: {}", kind, scope, e))?;

        let outcome = self
            .store
            .replace_partition(kind, scope, records, generation)?;

        let report = match outcome {
            ReplaceOutcome::Applied { upserted, removed } => {
                tracing::info!(
                    "Synced {} in {}: {} records, {} pruned",
                    kind,
                    scope,
                    upserted,
                    removed.len()
                );
                SyncReport {
                    kind,
                    scope: scope.clone(),
                    upserted,
                    removed,
                    superseded: false,
                    synced_at: Utc::now(),
                }
            }
            ReplaceOutcome::Superseded => {
                tracing::warn!(
                    "Discarded sync of {} in {}: a newer sync was already applied",
                    kind,
                    scope
                );
                SyncReport {
                    kind,
                    scope: scope.clone(),
                    upserted: 0,
                    removed: Vec::new(),
                    superseded: true,
                    synced_at: Utc::now(),
                }
            }
        };

        Ok(report)
    }

    /// Sync every kind in the scope concurrently.
    ///
    /// Each kind is an independent sync; one failing does not roll back the
    /// others. Results are returned in [`ResourceKind::ALL`] order.
    pub async fn sync_all(&self, scope: &Scope) -> Vec<(ResourceKind, Result<SyncReport>)> {
        let results = join_all(ResourceKind::ALL.iter().map(|kind| self.sync(*kind, scope))).await;
        ResourceKind::ALL.into_iter().zip(results).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NetError;
    use crate::model::{Resource, ResourceState, Vpc};
    use crate::testing::FakeProvider;

    fn scope() -> Scope {
        Scope::new("p1", "tk1a").unwrap()
    }

    fn vpc(id: &str) -> Resource {
        Resource::Vpc(Vpc {
            id: id.to_string(),
            cidr_block: "10.0.0.0/16".to_string(),
            is_default: false,
            state: ResourceState::Available,
        })
    }

    fn setup() -> (Arc<FakeProvider>, Arc<ResourceStore>, Reconciler) {
        let provider = Arc::new(FakeProvider::new());
        let store = Arc::new(ResourceStore::new());
        let reconciler = Reconciler::new(provider.clone(), store.clone());
        (provider, store, reconciler)
    }

    #[tokio::test]
    async fn test_sync_is_idempotent() {
        let (provider, store, reconciler) = setup();
        provider.set_listing(ResourceKind::Vpc, &scope(), vec![vpc("vpc-1"), vpc("vpc-2")]);

        reconciler.sync(ResourceKind::Vpc, &scope()).await.unwrap();
        let first = store.list(ResourceKind::Vpc, &scope());
        let report = reconciler.sync(ResourceKind::Vpc, &scope()).await.unwrap();
        let second = store.list(ResourceKind::Vpc, &scope());

        assert_eq!(first, second);
        assert_eq!(second.len(), 2);
        assert!(report.removed.is_empty());
    }

    #[tokio::test]
    async fn test_sync_prunes_records_missing_from_provider() {
        let (provider, store, reconciler) = setup();
        store.upsert(ResourceKind::Vpc, &scope(), vpc("vpc-local")).unwrap();
        provider.set_listing(ResourceKind::Vpc, &scope(), vec![vpc("vpc-1")]);

        let report = reconciler.sync(ResourceKind::Vpc, &scope()).await.unwrap();

        assert_eq!(report.removed, vec!["vpc-local".to_string()]);
        assert!(store.get(ResourceKind::Vpc, &scope(), "vpc-local").is_none());
        assert!(store.get(ResourceKind::Vpc, &scope(), "vpc-1").is_some());
    }

    #[tokio::test]
    async fn test_failed_list_leaves_store_unchanged() {
        let (provider, store, reconciler) = setup();
        store.upsert(ResourceKind::Vpc, &scope(), vpc("vpc-1")).unwrap();
        provider.fail_next_list(NetError::ProviderUnavailable("503".to_string()));

        let err = reconciler.sync(ResourceKind::Vpc, &scope()).await.unwrap_err();

        assert!(err.is_retryable());
        assert_eq!(store.count(ResourceKind::Vpc, &scope()), 1);
    }

    #[tokio::test]
    async fn test_sync_always_forces_refresh() {
        let (provider, _store, reconciler) = setup();
        reconciler.sync(ResourceKind::Subnet, &scope()).await.unwrap();

        let calls = provider.list_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], (ResourceKind::Subnet, scope(), true));
    }

    #[tokio::test]
    async fn test_sync_does_not_cascade() {
        let (provider, store, reconciler) = setup();
        provider.set_listing(ResourceKind::Vpc, &scope(), vec![vpc("vpc-1")]);

        reconciler.sync(ResourceKind::Subnet, &scope()).await.unwrap();

        assert!(store.list(ResourceKind::Vpc, &scope()).is_empty());
    }

    #[tokio::test]
    async fn test_sync_all_covers_every_kind() {
        let (provider, _store, reconciler) = setup();
        provider.fail_next_list(NetError::ProviderUnavailable("503".to_string()));

        let results = reconciler.sync_all(&scope()).await;

        assert_eq!(results.len(), ResourceKind::ALL.len());
        assert_eq!(results.iter().filter(|(_, r)| r.is_err()).count(), 1);
        assert_eq!(provider.list_calls().len(), ResourceKind::ALL.len());
    }
}
