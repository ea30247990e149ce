//! Scripted in-memory gateways for tests
//!
//! `FakeProvider` keeps a per-partition listing that acts as the provider's
//! truth. Creates and deletes edit that listing; associate/disassociate are
//! only recorded. Failures can be queued per call type.

use crate::account::AccountSignals;
use crate::action::ActionRequest;
use crate::error::{NetError, Result};
use crate::model::{Resource, ResourceKind};
use crate::provider::{AccountGateway, Mutation, Operation, ProviderGateway};
use crate::scope::Scope;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::Semaphore;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Holds transport sends until released, to observe in-flight behavior
#[derive(Debug)]
struct SendGate {
    held: AtomicBool,
    permits: Semaphore,
    started: AtomicUsize,
}

impl Default for SendGate {
    fn default() -> Self {
        Self {
            held: AtomicBool::new(false),
            permits: Semaphore::new(0),
            started: AtomicUsize::new(0),
        }
    }
}

impl SendGate {
    async fn pass(&self) {
        self.started.fetch_add(1, Ordering::SeqCst);
        if self.held.load(Ordering::SeqCst) {
            // The permit goes straight back so every held send gets through
            let _ = self.permits.acquire().await;
        }
    }

    fn release(&self) {
        self.held.store(false, Ordering::SeqCst);
        self.permits.add_permits(1);
    }
}

#[derive(Debug, Default)]
pub struct FakeProvider {
    listings: Mutex<HashMap<(Scope, ResourceKind), Vec<Resource>>>,
    list_errors: Mutex<VecDeque<NetError>>,
    mutation_errors: Mutex<VecDeque<NetError>>,
    send_errors: Mutex<VecDeque<NetError>>,
    list_calls: Mutex<Vec<(ResourceKind, Scope, bool)>>,
    mutations: Mutex<Vec<(ResourceKind, Scope, Mutation)>>,
    sends: Mutex<Vec<ActionRequest>>,
    gate: SendGate,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set what the provider reports for a partition
    pub fn set_listing(&self, kind: ResourceKind, scope: &Scope, records: Vec<Resource>) {
        lock(&self.listings).insert((scope.clone(), kind), records);
    }

    pub fn listing(&self, kind: ResourceKind, scope: &Scope) -> Vec<Resource> {
        lock(&self.listings)
            .get(&(scope.clone(), kind))
            .cloned()
            .unwrap_or_default()
    }

    pub fn fail_next_list(&self, err: NetError) {
        lock(&self.list_errors).push_back(err);
    }

    pub fn fail_next_mutation(&self, err: NetError) {
        lock(&self.mutation_errors).push_back(err);
    }

    pub fn fail_next_send(&self, err: NetError) {
        lock(&self.send_errors).push_back(err);
    }

    pub fn list_calls(&self) -> Vec<(ResourceKind, Scope, bool)> {
        lock(&self.list_calls).clone()
    }

    pub fn mutations(&self) -> Vec<(ResourceKind, Scope, Mutation)> {
        lock(&self.mutations).clone()
    }

    pub fn sends(&self) -> Vec<ActionRequest> {
        lock(&self.sends).clone()
    }

    /// Make subsequent sends wait until [`FakeProvider::release_sends`]
    pub fn hold_sends(&self) {
        self.gate.held.store(true, Ordering::SeqCst);
    }

    pub fn release_sends(&self) {
        self.gate.release();
    }

    /// Number of sends that reached the transport, finished or not
    pub fn sends_started(&self) -> usize {
        self.gate.started.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderGateway for FakeProvider {
    fn name(&self) -> &str {
        "fake"
    }

    async fn list(
        &self,
        kind: ResourceKind,
        scope: &Scope,
        force_refresh: bool,
    ) -> Result<Vec<Resource>> {
        lock(&self.list_calls).push((kind, scope.clone(), force_refresh));
        if let Some(err) = lock(&self.list_errors).pop_front() {
            return Err(err);
        }
        Ok(self.listing(kind, scope))
    }

    async fn mutate(
        &self,
        kind: ResourceKind,
        scope: &Scope,
        mutation: &Mutation,
    ) -> Result<Option<Resource>> {
        lock(&self.mutations).push((kind, scope.clone(), mutation.clone()));
        if let Some(err) = lock(&self.mutation_errors).pop_front() {
            return Err(err);
        }

        let mut listings = lock(&self.listings);
        let listing = listings.entry((scope.clone(), kind)).or_default();

        match mutation.operation {
            Operation::Create => {
                let record = Resource::from_json(kind, mutation.payload.clone())?;
                let id = record.id();
                if listing.iter().any(|r| r.id() == id) {
                    return Err(NetError::ResourceConflict(format!("{} {} exists", kind, id)));
                }
                listing.push(record.clone());
                Ok(Some(record))
            }
            Operation::Delete => {
                let id = mutation.id.clone().unwrap_or_default();
                let before = listing.len();
                listing.retain(|r| r.id() != id);
                if listing.len() == before {
                    return Err(NetError::ResourceNotFound(format!("{} {}", kind, id)));
                }
                Ok(None)
            }
            Operation::Associate | Operation::Disassociate => Ok(None),
        }
    }

    async fn send(&self, request: &ActionRequest) -> Result<serde_json::Value> {
        self.gate.pass().await;
        lock(&self.sends).push(request.clone());
        if let Some(err) = lock(&self.send_errors).pop_front() {
            return Err(err);
        }
        Ok(serde_json::json!({"ok": true}))
    }
}

#[derive(Debug, Default)]
pub struct FakeAccounts {
    signals: Mutex<HashMap<String, AccountSignals>>,
    sends: Mutex<Vec<ActionRequest>>,
    send_errors: Mutex<VecDeque<NetError>>,
}

impl FakeAccounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_signals(&self, project_id: &str, signals: AccountSignals) {
        lock(&self.signals).insert(project_id.to_string(), signals);
    }

    pub fn fail_next_send(&self, err: NetError) {
        lock(&self.send_errors).push_back(err);
    }

    pub fn sends(&self) -> Vec<ActionRequest> {
        lock(&self.sends).clone()
    }
}

#[async_trait]
impl AccountGateway for FakeAccounts {
    async fn fetch_signals(&self, project_id: &str) -> Result<AccountSignals> {
        lock(&self.signals)
            .get(project_id)
            .cloned()
            .ok_or_else(|| NetError::ResourceNotFound(format!("project {}", project_id)))
    }

    async fn send(&self, request: &ActionRequest) -> Result<serde_json::Value> {
        lock(&self.sends).push(request.clone());
        if let Some(err) = lock(&self.send_errors).pop_front() {
            return Err(err);
        }
        Ok(serde_json::json!({"ok": true}))
    }
}
