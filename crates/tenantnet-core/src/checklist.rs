//! Provisioning checklist aggregation
//!
//! [`aggregate`] is a pure function of the resource store and the latest
//! account signals. It never touches the network and never fails: missing
//! data yields an incomplete item without an action.

use crate::account::AccountSignals;
use crate::action::{Action, Method};
use crate::model::{
    DEFAULT_ROUTE_CIDR, EdgeConfig, InternetGateway, ResourceState, Route, RouteTable,
    SecurityGroup, Subnet, Vpc,
};
use crate::resolver::{DependencyResolver, GatewayFallback};
use crate::scope::{ProjectContext, Scope};
use crate::store::ResourceStore;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const PROVIDER_ACCOUNT_LINKED: &str = "Provider account linked";
pub const TENANT_ADMIN_ASSIGNED: &str = "Tenant-admin role assigned";
pub const VPC_CONFIGURED: &str = "VPC configured";
pub const SUBNETS_CONFIGURED: &str = "Subnets configured";
pub const INTERNET_GATEWAY_ATTACHED: &str = "Internet gateway attached";
pub const DEFAULT_ROUTES_CONFIGURED: &str = "Default routes configured";
pub const SECURITY_GROUPS_PRESENT: &str = "Security groups present";
pub const EDGE_CONFIG_ASSIGNED: &str = "Edge configuration assigned";

/// One derived checklist entry; recomputed on every pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub title: String,
    pub completed: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_count: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
}

impl ChecklistItem {
    fn new(title: &str, completed: bool) -> Self {
        Self {
            title: title.to_string(),
            completed,
            count: None,
            missing_count: None,
            action: None,
        }
    }

    fn with_counts(mut self, count: usize, missing: usize) -> Self {
        self.count = Some(count);
        self.missing_count = Some(missing);
        self
    }

    /// Attach a remediation only to incomplete items
    fn with_action(mut self, action: Option<Action>) -> Self {
        if !self.completed {
            self.action = action;
        }
        self
    }
}

/// Build the ordered checklist for a project's default scope
pub fn aggregate(
    store: &ResourceStore,
    project: &ProjectContext,
    signals: &AccountSignals,
) -> Vec<ChecklistItem> {
    let mut items = vec![provider_account_item(signals), tenant_admin_item(signals)];

    match project.default_scope() {
        Ok(scope) => items.extend(network_items(store, &scope)),
        Err(e) => {
            tracing::debug!("No usable default scope for {}: {}", project.project_id, e);
            items.extend(
                [
                    VPC_CONFIGURED,
                    SUBNETS_CONFIGURED,
                    INTERNET_GATEWAY_ATTACHED,
                    DEFAULT_ROUTES_CONFIGURED,
                    SECURITY_GROUPS_PRESENT,
                    EDGE_CONFIG_ASSIGNED,
                ]
                .into_iter()
                .map(|title| ChecklistItem::new(title, false)),
            );
        }
    }

    items
}

fn provider_account_item(signals: &AccountSignals) -> ChecklistItem {
    match &signals.provider_account {
        Some(status) => ChecklistItem::new(PROVIDER_ACCOUNT_LINKED, status.linked)
            .with_action(status.sync_action.clone()),
        None => ChecklistItem::new(PROVIDER_ACCOUNT_LINKED, false),
    }
}

fn tenant_admin_item(signals: &AccountSignals) -> ChecklistItem {
    let Some(users) = &signals.users else {
        return ChecklistItem::new(TENANT_ADMIN_ASSIGNED, false);
    };

    let missing: Vec<_> = users.iter().filter(|u| !u.tenant_admin).collect();
    let action = missing.iter().find_map(|u| u.role_assignment.clone());

    ChecklistItem::new(TENANT_ADMIN_ASSIGNED, missing.is_empty())
        .with_counts(users.len(), missing.len())
        .with_action(action)
}

fn network_items(store: &ResourceStore, scope: &Scope) -> Vec<ChecklistItem> {
    let vpcs: Vec<Vpc> = store
        .list_typed::<Vpc>(scope)
        .into_iter()
        .filter(|v| v.state == ResourceState::Available)
        .collect();
    let vpc_ids: HashSet<&str> = vpcs.iter().map(|v| v.id.as_str()).collect();
    let gateways = store.list_typed::<InternetGateway>(scope);

    let vpc_item = ChecklistItem::new(VPC_CONFIGURED, !vpcs.is_empty())
        .with_counts(vpcs.len(), usize::from(vpcs.is_empty()));

    let subnets: Vec<Subnet> = store
        .list_typed::<Subnet>(scope)
        .into_iter()
        .filter(|s| s.state == ResourceState::Available && vpc_ids.contains(s.vpc_id.as_str()))
        .collect();
    let subnet_item = ChecklistItem::new(SUBNETS_CONFIGURED, !subnets.is_empty())
        .with_counts(subnets.len(), usize::from(subnets.is_empty()));

    vec![
        vpc_item,
        subnet_item,
        gateway_item(scope, &vpcs, &gateways),
        default_route_item(store, scope, &vpc_ids, &gateways),
        security_group_item(store, scope, &vpcs),
        edge_config_item(store, scope),
    ]
}

fn gateway_item(scope: &Scope, vpcs: &[Vpc], gateways: &[InternetGateway]) -> ChecklistItem {
    let uncovered: Vec<&Vpc> = vpcs
        .iter()
        .filter(|v| !gateways.iter().any(|g| g.is_attached_to(&v.id)))
        .collect();

    let action = match (uncovered.first(), gateways.iter().find(|g| g.attached_vpc_id.is_none())) {
        (Some(vpc), Some(igw)) => Some(
            Action::new(
                Method::Post,
                format!("/internet-gateways/{}/associate", igw.id),
                format!("Attach {} to {}", igw.id, vpc.id),
            )
            .with_body(serde_json::json!({ "vpc_id": vpc.id }))
            .with_region(&scope.region),
        ),
        _ => None,
    };

    ChecklistItem::new(
        INTERNET_GATEWAY_ATTACHED,
        !vpcs.is_empty() && uncovered.is_empty(),
    )
    .with_counts(vpcs.len(), uncovered.len())
    .with_action(action)
}

fn default_route_item(
    store: &ResourceStore,
    scope: &Scope,
    vpc_ids: &HashSet<&str>,
    gateways: &[InternetGateway],
) -> ChecklistItem {
    let routed_tables: HashSet<String> = store
        .list_typed::<Route>(scope)
        .into_iter()
        .filter(Route::is_default_route)
        .map(|r| r.route_table_id)
        .collect();

    // Only tables whose VPC can reach the internet need a default route
    let tables: Vec<RouteTable> = store
        .list_typed::<RouteTable>(scope)
        .into_iter()
        .filter(|t| vpc_ids.contains(t.vpc_id.as_str()))
        .filter(|t| gateways.iter().any(|g| g.is_attached_to(&t.vpc_id)))
        .collect();
    let missing: Vec<&RouteTable> = tables
        .iter()
        .filter(|t| !routed_tables.contains(&t.id))
        .collect();

    let resolver = DependencyResolver::new(store, scope);
    let action = missing.first().and_then(|table| {
        resolver
            .default_route_gateway(&table.id, GatewayFallback::AttachedOnly)
            .ok()
            .map(|choice| {
                Action::new(
                    Method::Post,
                    "/routes",
                    format!("Add default route to {}", table.id),
                )
                .with_body(serde_json::json!({
                    "route_table_id": table.id,
                    "destination_cidr": DEFAULT_ROUTE_CIDR,
                    "gateway_id": choice.gateway_id,
                }))
                .with_region(&scope.region)
            })
    });

    ChecklistItem::new(
        DEFAULT_ROUTES_CONFIGURED,
        !tables.is_empty() && missing.is_empty(),
    )
    .with_counts(tables.len(), missing.len())
    .with_action(action)
}

fn security_group_item(store: &ResourceStore, scope: &Scope, vpcs: &[Vpc]) -> ChecklistItem {
    let groups = store.list_typed::<SecurityGroup>(scope);
    let missing = vpcs
        .iter()
        .filter(|v| !groups.iter().any(|g| g.vpc_id == v.id))
        .count();

    ChecklistItem::new(SECURITY_GROUPS_PRESENT, !vpcs.is_empty() && missing == 0)
        .with_counts(groups.len(), missing)
}

fn edge_config_item(store: &ResourceStore, scope: &Scope) -> ChecklistItem {
    let assigned = store.get_typed::<EdgeConfig>(scope, &scope.key()).is_some();
    ChecklistItem::new(EDGE_CONFIG_ASSIGNED, assigned)
}
