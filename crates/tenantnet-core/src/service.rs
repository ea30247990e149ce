//! Caller-facing network service
//!
//! `NetworkService` ties the store, reconciler, resolver, checklist and
//! dispatcher together behind the operations a UI or script calls. Every
//! provider call goes through the configured timeout. Nothing here retries.

use crate::account::AccountSignals;
use crate::action::Action;
use crate::checklist::{self, ChecklistItem};
use crate::dispatch::{ActionDispatcher, DispatchOutcome};
use crate::error::{NetError, Result};
use crate::model::{
    EdgeConfig, InternetGateway, NetworkInterface, Resource, ResourceKind, ResourceState, Route,
    RouteTable, RouteTableAssociation, RouteTarget, SecurityGroup, Subnet, TypedResource, Vpc,
};
use crate::provider::{AccountGateway, Mutation, ProviderGateway, with_timeout};
use crate::reconcile::{Reconciler, SyncReport};
use crate::resolver::{DependencyResolver, GatewayFallback};
use crate::scope::{ProjectContext, Scope};
use crate::store::ResourceStore;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

/// Desired edge settings for a scope
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct EdgeAssignment {
    pub edge_network_id: String,
    pub ip_pool_id: String,
    #[serde(default)]
    pub flowlogs_enabled: bool,
    #[serde(default)]
    pub metadata: std::collections::BTreeMap<String, serde_json::Value>,
}

pub struct NetworkService {
    provider: Arc<dyn ProviderGateway>,
    accounts: Arc<dyn AccountGateway>,
    store: Arc<ResourceStore>,
    reconciler: Reconciler,
    dispatcher: ActionDispatcher,
    signals: DashMap<String, AccountSignals>,
    timeout: Option<Duration>,
}

impl NetworkService {
    pub fn new(provider: Arc<dyn ProviderGateway>, accounts: Arc<dyn AccountGateway>) -> Self {
        let store = Arc::new(ResourceStore::new());
        Self {
            reconciler: Reconciler::new(provider.clone(), store.clone()),
            dispatcher: ActionDispatcher::new(provider.clone(), accounts.clone()),
            provider,
            accounts,
            store,
            signals: DashMap::new(),
            timeout: None,
        }
    }

    /// Deadline applied to every provider and account call
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self.reconciler = self.reconciler.with_timeout(timeout);
        self.dispatcher = self.dispatcher.with_timeout(timeout);
        self
    }

    pub fn store(&self) -> &ResourceStore {
        &self.store
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    // ------------------------------------------------------------------
    // Generic resource operations
    // ------------------------------------------------------------------

    /// Cached records of one kind; call [`NetworkService::sync_resources`]
    /// first for fresh data
    pub fn list_resources(&self, kind: ResourceKind, scope: &Scope) -> Vec<Resource> {
        self.store.list(kind, scope)
    }

    pub fn get_resource(&self, kind: ResourceKind, scope: &Scope, id: &str) -> Result<Resource> {
        self.store
            .get(kind, scope, id)
            .ok_or_else(|| NetError::ResourceNotFound(format!("{} {} in {}", kind, id, scope)))
    }

    /// Create a resource at the provider and store the record it returns.
    ///
    /// Route payloads are validated locally before the provider is called.
    /// A provider `ResourceConflict` is surfaced.
    pub async fn create_resource(
        &self,
        kind: ResourceKind,
        scope: &Scope,
        spec: serde_json::Value,
    ) -> Result<Resource> {
        if kind == ResourceKind::Route {
            let route: Route = serde_json::from_value(spec)?;
            return self
                .create_route(scope, &route.route_table_id, &route.destination_cidr, route.target)
                .await
                .map(Resource::Route);
        }

        self.create_record(kind, scope, spec).await
    }

    /// Delete a resource after checking nothing in the scope depends on it
    pub async fn delete_resource(&self, kind: ResourceKind, scope: &Scope, id: &str) -> Result<()> {
        self.check_no_dependents(kind, scope, id)?;

        self.mutate(kind, scope, Mutation::delete(id)).await?;
        self.store.remove(kind, scope, id);
        tracing::info!("Deleted {} {} in {}", kind, id, scope);
        Ok(())
    }

    pub async fn sync_resources(&self, kind: ResourceKind, scope: &Scope) -> Result<SyncReport> {
        self.reconciler.sync(kind, scope).await
    }

    pub async fn sync_all(&self, scope: &Scope) -> Vec<(ResourceKind, Result<SyncReport>)> {
        self.reconciler.sync_all(scope).await
    }

    // ------------------------------------------------------------------
    // Checklist and remediation
    // ------------------------------------------------------------------

    /// Fetch account signals for the project and cache them for aggregation
    pub async fn refresh_account_signals(&self, project_id: &str) -> Result<AccountSignals> {
        let what = format!("fetch account signals for {}", project_id);
        let signals = with_timeout(self.timeout, &what, self.accounts.fetch_signals(project_id))
            .await?;
        self.signals.insert(project_id.to_string(), signals.clone());
        Ok(signals)
    }

    /// Replace the cached signals, e.g. when pushed by the account system
    pub fn record_account_signals(&self, project_id: &str, signals: AccountSignals) {
        self.signals.insert(project_id.to_string(), signals);
    }

    /// Last known signals; empty when never received
    pub fn account_signals(&self, project_id: &str) -> AccountSignals {
        self.signals
            .get(project_id)
            .map(|s| s.value().clone())
            .unwrap_or_default()
    }

    /// Aggregate the checklist from cached state only
    pub fn get_checklist(&self, project: &ProjectContext) -> Vec<ChecklistItem> {
        let signals = self.account_signals(&project.project_id);
        checklist::aggregate(&self.store, project, &signals)
    }

    pub async fn dispatch_action(
        &self,
        project_id: &str,
        action: &Action,
    ) -> Result<DispatchOutcome> {
        self.dispatcher.dispatch(project_id, action).await
    }

    // ------------------------------------------------------------------
    // Relationship operations
    // ------------------------------------------------------------------

    /// Add a route after checking the table and locally modeled targets exist
    pub async fn create_route(
        &self,
        scope: &Scope,
        route_table_id: &str,
        destination_cidr: &str,
        target: RouteTarget,
    ) -> Result<Route> {
        let resolver = DependencyResolver::new(&self.store, scope);
        resolver.route_table(route_table_id)?;
        resolver.validate_route_target(&target)?;

        let route = Route::new(route_table_id, destination_cidr, target)?;
        let payload = serde_json::to_value(&route)?;
        let created = self.create_record(ResourceKind::Route, scope, payload).await?;

        Route::from_resource(created).ok_or_else(|| {
            NetError::Validation(format!(
                "provider returned a non-route record for {}",
                route.key()
            ))
        })
    }

    /// Add a `0.0.0.0/0` route through an internet gateway.
    ///
    /// Fails with `NoGatewayAvailable` before any mutation when the resolver
    /// finds no usable gateway. An existing default route is returned as is.
    pub async fn create_default_route(
        &self,
        scope: &Scope,
        route_table_id: &str,
        fallback: GatewayFallback,
    ) -> Result<Route> {
        let resolver = DependencyResolver::new(&self.store, scope);
        let choice = resolver.default_route_gateway(route_table_id, fallback)?;

        let existing = self
            .store
            .list_typed::<Route>(scope)
            .into_iter()
            .find(|r| r.route_table_id == route_table_id && r.is_default_route());
        if let Some(route) = existing {
            tracing::info!(
                "{} already has a default route via {}",
                route_table_id,
                route.target.id()
            );
            return Ok(route);
        }

        if choice.via_fallback {
            tracing::warn!(
                "Default route for {} uses {} which is not attached to its VPC",
                route_table_id,
                choice.gateway_id
            );
        }

        self.create_route(
            scope,
            route_table_id,
            crate::model::DEFAULT_ROUTE_CIDR,
            RouteTarget::Gateway(choice.gateway_id),
        )
        .await
    }

    /// Associate a subnet with a route table, superseding its previous table
    pub async fn associate_route_table(
        &self,
        scope: &Scope,
        route_table_id: &str,
        subnet_id: &str,
    ) -> Result<RouteTableAssociation> {
        let plan = DependencyResolver::new(&self.store, scope)
            .plan_association(route_table_id, subnet_id)?;
        if plan.already_associated {
            return Ok(plan.association);
        }

        let payload = serde_json::json!({ "subnet_id": subnet_id });
        self.mutate_idempotent(
            ResourceKind::RouteTable,
            scope,
            Mutation::associate(route_table_id, payload),
        )
        .await?;

        if let Some(old) = &plan.supersedes {
            tracing::info!(
                "Subnet {} moved from {} to {}",
                subnet_id,
                old.route_table_id,
                route_table_id
            );
        }
        self.store.upsert_typed(scope, plan.association.clone())?;
        Ok(plan.association)
    }

    /// Add a security group to an interface; attaching twice is a no-op
    pub async fn attach_security_group(
        &self,
        scope: &Scope,
        interface_id: &str,
        group_id: &str,
    ) -> Result<NetworkInterface> {
        let (mut eni, _group) = DependencyResolver::new(&self.store, scope)
            .check_security_group_attachment(interface_id, group_id)?;
        if eni.has_security_group(group_id) {
            return Ok(eni);
        }

        let payload = serde_json::json!({ "security_group_id": group_id });
        self.mutate_idempotent(
            ResourceKind::NetworkInterface,
            scope,
            Mutation::associate(interface_id, payload),
        )
        .await?;

        eni.attach_security_group(group_id);
        self.store.upsert_typed(scope, eni.clone())?;
        tracing::info!("Attached {} to {}", group_id, interface_id);
        Ok(eni)
    }

    /// Remove a security group from an interface; detaching an absent group
    /// is a no-op
    pub async fn detach_security_group(
        &self,
        scope: &Scope,
        interface_id: &str,
        group_id: &str,
    ) -> Result<NetworkInterface> {
        let mut eni = self.require::<NetworkInterface>(scope, interface_id)?;
        if !eni.has_security_group(group_id) {
            return Ok(eni);
        }

        let payload = serde_json::json!({ "security_group_id": group_id });
        self.mutate(
            ResourceKind::NetworkInterface,
            scope,
            Mutation::disassociate(interface_id, payload),
        )
        .await?;

        eni.detach_security_group(group_id);
        self.store.upsert_typed(scope, eni.clone())?;
        tracing::info!("Detached {} from {}", group_id, interface_id);
        Ok(eni)
    }

    /// Attach a gateway to a VPC; a gateway holds at most one attachment
    pub async fn attach_internet_gateway(
        &self,
        scope: &Scope,
        gateway_id: &str,
        vpc_id: &str,
    ) -> Result<InternetGateway> {
        let mut igw = self.require::<InternetGateway>(scope, gateway_id)?;
        self.require::<Vpc>(scope, vpc_id)?;

        match igw.attached_vpc_id.as_deref() {
            Some(current) if current == vpc_id => return Ok(igw),
            Some(current) => {
                return Err(NetError::Validation(format!(
                    "internet gateway {} is already attached to {}",
                    gateway_id, current
                )));
            }
            None => {}
        }

        let payload = serde_json::json!({ "vpc_id": vpc_id });
        self.mutate_idempotent(
            ResourceKind::InternetGateway,
            scope,
            Mutation::associate(gateway_id, payload),
        )
        .await?;

        igw.attached_vpc_id = Some(vpc_id.to_string());
        igw.state = ResourceState::Attached;
        self.store.upsert_typed(scope, igw.clone())?;
        tracing::info!("Attached {} to {}", gateway_id, vpc_id);
        Ok(igw)
    }

    pub async fn detach_internet_gateway(
        &self,
        scope: &Scope,
        gateway_id: &str,
    ) -> Result<InternetGateway> {
        let mut igw = self.require::<InternetGateway>(scope, gateway_id)?;
        let Some(vpc_id) = igw.attached_vpc_id.clone() else {
            return Ok(igw);
        };

        let payload = serde_json::json!({ "vpc_id": vpc_id });
        self.mutate(
            ResourceKind::InternetGateway,
            scope,
            Mutation::disassociate(gateway_id, payload),
        )
        .await?;

        igw.attached_vpc_id = None;
        igw.state = ResourceState::Detached;
        self.store.upsert_typed(scope, igw.clone())?;
        tracing::info!("Detached {} from {}", gateway_id, vpc_id);
        Ok(igw)
    }

    /// Set the scope's edge configuration, replacing any previous one
    pub async fn assign_edge_config(
        &self,
        scope: &Scope,
        assignment: EdgeAssignment,
    ) -> Result<EdgeConfig> {
        let config = EdgeConfig {
            project_id: scope.project_id.clone(),
            region: scope.region.clone(),
            edge_network_id: assignment.edge_network_id,
            ip_pool_id: assignment.ip_pool_id,
            flowlogs_enabled: assignment.flowlogs_enabled,
            metadata: assignment.metadata,
        };
        if config.edge_network_id.trim().is_empty() || config.ip_pool_id.trim().is_empty() {
            return Err(NetError::Validation(
                "edge_network_id and ip_pool_id are required".to_string(),
            ));
        }

        if self.store.get_typed::<EdgeConfig>(scope, &config.key()).as_ref() == Some(&config) {
            return Ok(config);
        }

        let payload = serde_json::to_value(&config)?;
        let returned = self
            .mutate(
                ResourceKind::EdgeConfig,
                scope,
                Mutation::associate(config.key(), payload),
            )
            .await?;

        let stored = returned
            .and_then(EdgeConfig::from_resource)
            .unwrap_or(config);
        self.store.upsert_typed(scope, stored.clone())?;
        tracing::info!("Assigned edge network {} to {}", stored.edge_network_id, scope);
        Ok(stored)
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn require<T: TypedResource>(&self, scope: &Scope, id: &str) -> Result<T> {
        self.store
            .get_typed::<T>(scope, id)
            .ok_or_else(|| NetError::ResourceNotFound(format!("{} {} in {}", T::KIND, id, scope)))
    }

    async fn mutate(
        &self,
        kind: ResourceKind,
        scope: &Scope,
        mutation: Mutation,
    ) -> Result<Option<Resource>> {
        let what = format!("{} {} in {}", mutation.operation, kind, scope);
        with_timeout(self.timeout, &what, self.provider.mutate(kind, scope, &mutation)).await
    }

    /// Like `mutate`, treating a conflict as the desired state already holding
    async fn mutate_idempotent(
        &self,
        kind: ResourceKind,
        scope: &Scope,
        mutation: Mutation,
    ) -> Result<()> {
        match self.mutate(kind, scope, mutation).await {
            Ok(_) => Ok(()),
            Err(NetError::ResourceConflict(message)) => {
                tracing::debug!("Provider reports {} already in place: {}", kind, message);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn create_record(
        &self,
        kind: ResourceKind,
        scope: &Scope,
        spec: serde_json::Value,
    ) -> Result<Resource> {
        let returned = self
            .mutate(kind, scope, Mutation::create(spec.clone()))
            .await?;

        // Providers that do not echo the record must be sent a complete one
        let record = match returned {
            Some(record) => record,
            None => Resource::from_json(kind, spec)?,
        };
        self.store.upsert(kind, scope, record.clone())?;
        tracing::info!("Created {} {} in {}", kind, record.id(), scope);
        Ok(record)
    }

    fn check_no_dependents(&self, kind: ResourceKind, scope: &Scope, id: &str) -> Result<()> {
        let blocker = match kind {
            ResourceKind::Vpc => self.vpc_dependent(scope, id),
            ResourceKind::Subnet => self
                .store
                .get_typed::<RouteTableAssociation>(scope, id)
                .map(|a| format!("it is associated with route table {}", a.route_table_id)),
            ResourceKind::RouteTable => self
                .store
                .list_typed::<RouteTableAssociation>(scope)
                .into_iter()
                .find(|a| a.route_table_id == id)
                .map(|a| format!("subnet {} is associated with it", a.subnet_id)),
            ResourceKind::InternetGateway => self
                .store
                .get_typed::<InternetGateway>(scope, id)
                .and_then(|igw| igw.attached_vpc_id)
                .map(|vpc| format!("it is still attached to {}", vpc)),
            ResourceKind::SecurityGroup => self
                .store
                .list_typed::<NetworkInterface>(scope)
                .into_iter()
                .find(|eni| eni.has_security_group(id))
                .map(|eni| format!("network interface {} uses it", eni.id)),
            _ => None,
        };

        match blocker {
            Some(reason) => Err(NetError::Validation(format!(
                "cannot delete {} {}: {}",
                kind, id, reason
            ))),
            None => Ok(()),
        }
    }

    fn vpc_dependent(&self, scope: &Scope, vpc_id: &str) -> Option<String> {
        if let Some(subnet) = self
            .store
            .list_typed::<Subnet>(scope)
            .into_iter()
            .find(|s| s.vpc_id == vpc_id)
        {
            return Some(format!("subnet {} is in it", subnet.id));
        }
        if let Some(table) = self
            .store
            .list_typed::<RouteTable>(scope)
            .into_iter()
            .find(|t| t.vpc_id == vpc_id)
        {
            return Some(format!("route table {} is in it", table.id));
        }
        if let Some(group) = self
            .store
            .list_typed::<SecurityGroup>(scope)
            .into_iter()
            .find(|g| g.vpc_id == vpc_id)
        {
            return Some(format!("security group {} is in it", group.id));
        }
        self.store
            .list_typed::<InternetGateway>(scope)
            .into_iter()
            .find(|g| g.is_attached_to(vpc_id))
            .map(|g| format!("internet gateway {} is attached to it", g.id))
    }
}
