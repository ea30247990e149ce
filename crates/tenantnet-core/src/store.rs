//! In-memory resource store
//!
//! Records are partitioned by `(Scope, ResourceKind)` and ordered by id
//! inside a partition. Reconciliation swaps whole partitions so a sync
//! result is never observed half-applied.

use crate::error::{NetError, Result};
use crate::model::{Resource, ResourceKind, TypedResource};
use crate::scope::Scope;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::BTreeMap;

type PartitionKey = (Scope, ResourceKind);

#[derive(Debug, Default)]
struct Partition {
    records: BTreeMap<String, Resource>,
    /// Generation of the last applied sync
    generation: u64,
    synced_at: Option<DateTime<Utc>>,
}

/// Outcome of applying a sync result to a partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplaceOutcome {
    Applied { upserted: usize, removed: Vec<String> },
    /// A sync that started later has already been applied
    Superseded,
}

/// Scoped store for network resources
#[derive(Debug, Default)]
pub struct ResourceStore {
    partitions: DashMap<PartitionKey, Partition>,
}

impl ResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the record with the same id
    pub fn upsert(&self, kind: ResourceKind, scope: &Scope, record: Resource) -> Result<()> {
        if record.kind() != kind {
            return Err(NetError::Validation(format!(
                "cannot store a {} record as {}",
                record.kind(),
                kind
            )));
        }

        let id = record.id();
        let mut partition = self.partitions.entry((scope.clone(), kind)).or_default();
        if partition.records.insert(id.clone(), record).is_some() {
            tracing::debug!("Replaced {} {} in {}", kind, id, scope);
        } else {
            tracing::debug!("Inserted {} {} in {}", kind, id, scope);
        }
        Ok(())
    }

    /// Remove a record; missing ids are ignored
    pub fn remove(&self, kind: ResourceKind, scope: &Scope, id: &str) -> Option<Resource> {
        let mut partition = self.partitions.get_mut(&(scope.clone(), kind))?;
        let removed = partition.records.remove(id);
        if removed.is_some() {
            tracing::debug!("Removed {} {} from {}", kind, id, scope);
        }
        removed
    }

    pub fn get(&self, kind: ResourceKind, scope: &Scope, id: &str) -> Option<Resource> {
        self.partitions
            .get(&(scope.clone(), kind))
            .and_then(|p| p.records.get(id).cloned())
    }

    /// All records of one kind in a scope, ordered by id
    pub fn list(&self, kind: ResourceKind, scope: &Scope) -> Vec<Resource> {
        self.partitions
            .get(&(scope.clone(), kind))
            .map(|p| p.records.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn get_typed<T: TypedResource>(&self, scope: &Scope, id: &str) -> Option<T> {
        self.get(T::KIND, scope, id).and_then(T::from_resource)
    }

    pub fn list_typed<T: TypedResource>(&self, scope: &Scope) -> Vec<T> {
        self.list(T::KIND, scope)
            .into_iter()
            .filter_map(T::from_resource)
            .collect()
    }

    pub fn upsert_typed<T: TypedResource>(&self, scope: &Scope, record: T) -> Result<()> {
        self.upsert(T::KIND, scope, record.into_resource())
    }

    /// Replace a partition wholesale with a provider listing.
    ///
    /// Results from a sync older than the last applied one are dropped.
    pub fn replace_partition(
        &self,
        kind: ResourceKind,
        scope: &Scope,
        records: Vec<Resource>,
        generation: u64,
    ) -> Result<ReplaceOutcome> {
        let mut incoming = BTreeMap::new();
        for record in records {
            if record.kind() != kind {
                return Err(NetError::Validation(format!(
                    "provider returned a {} record in a {} listing",
                    record.kind(),
                    kind
                )));
            }
            let id = record.id();
            if incoming.insert(id.clone(), record).is_some() {
                return Err(NetError::Validation(format!(
                    "provider returned duplicate {} id {}",
                    kind, id
                )));
            }
        }

        let mut partition = self.partitions.entry((scope.clone(), kind)).or_default();
        if generation < partition.generation {
            return Ok(ReplaceOutcome::Superseded);
        }

        let removed: Vec<String> = partition
            .records
            .keys()
            .filter(|id| !incoming.contains_key(*id))
            .cloned()
            .collect();
        let upserted = incoming.len();

        partition.records = incoming;
        partition.generation = generation;
        partition.synced_at = Some(Utc::now());

        Ok(ReplaceOutcome::Applied { upserted, removed })
    }

    /// When the partition was last replaced by a sync
    pub fn last_synced(&self, kind: ResourceKind, scope: &Scope) -> Option<DateTime<Utc>> {
        self.partitions
            .get(&(scope.clone(), kind))
            .and_then(|p| p.synced_at)
    }

    /// Number of records in a partition
    pub fn count(&self, kind: ResourceKind, scope: &Scope) -> usize {
        self.partitions
            .get(&(scope.clone(), kind))
            .map(|p| p.records.len())
            .unwrap_or(0)
    }
}
