//! Dependency resolver
//!
//! Answers "what can this route point at" and "which gateway should the
//! default route use" from the resource store. Read-only: callers perform
//! any resulting mutation.

use crate::error::{NetError, Result};
use crate::model::{
    InternetGateway, NetworkInterface, RouteTable, RouteTableAssociation, RouteTarget,
    SecurityGroup, Subnet, TargetKind,
};
use crate::scope::Scope;
use crate::store::ResourceStore;
use serde::{Deserialize, Serialize};

/// What to do when no internet gateway is attached to the route table's VPC
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayFallback {
    /// Fail with `NoGatewayAvailable`
    #[default]
    AttachedOnly,
    /// Take the first gateway in the scope, even one on another VPC
    FirstAvailable,
}

/// A selectable route target
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetCandidate {
    pub id: String,
    pub label: String,
}

/// Target choices for a route of a given kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "candidates", rename_all = "snake_case")]
pub enum TargetCandidates {
    /// Locally modeled resources in the route table's VPC
    Resources(Vec<TargetCandidate>),
    /// Not modeled locally; the caller supplies a raw provider id
    FreeForm,
}

/// Gateway picked for a default route
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GatewayChoice {
    pub gateway_id: String,

    /// True when the gateway is not attached to the route table's VPC
    pub via_fallback: bool,
}

/// Result of planning a route table association
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociationPlan {
    pub association: RouteTableAssociation,

    /// Existing association of the subnet that will be replaced
    pub supersedes: Option<RouteTableAssociation>,

    /// The subnet is already associated with this route table
    pub already_associated: bool,
}

pub struct DependencyResolver<'a> {
    store: &'a ResourceStore,
    scope: &'a Scope,
}

impl<'a> DependencyResolver<'a> {
    pub fn new(store: &'a ResourceStore, scope: &'a Scope) -> Self {
        Self { store, scope }
    }

    pub fn route_table(&self, route_table_id: &str) -> Result<RouteTable> {
        self.store
            .get_typed::<RouteTable>(self.scope, route_table_id)
            .ok_or_else(|| {
                NetError::ResourceNotFound(format!(
                    "route table {} in {}",
                    route_table_id, self.scope
                ))
            })
    }

    /// Enumerate route target candidates scoped to the route table's VPC
    pub fn candidate_targets(
        &self,
        route_table_id: &str,
        kind: TargetKind,
    ) -> Result<TargetCandidates> {
        let table = self.route_table(route_table_id)?;

        let candidates = match kind {
            TargetKind::Gateway => self
                .store
                .list_typed::<InternetGateway>(self.scope)
                .into_iter()
                .filter(|igw| igw.is_attached_to(&table.vpc_id))
                .map(|igw| TargetCandidate {
                    label: display_label(&igw.id, &igw.name),
                    id: igw.id,
                })
                .collect(),
            TargetKind::NetworkInterface => self
                .store
                .list_typed::<NetworkInterface>(self.scope)
                .into_iter()
                .filter(|eni| eni.vpc_id.as_deref() == Some(table.vpc_id.as_str()))
                .map(|eni| TargetCandidate {
                    label: eni
                        .private_ip_addresses
                        .first()
                        .map(|ip| format!("{} ({})", eni.id, ip))
                        .unwrap_or_else(|| eni.id.clone()),
                    id: eni.id,
                })
                .collect(),
            TargetKind::Instance | TargetKind::NatGateway => return Ok(TargetCandidates::FreeForm),
        };

        Ok(TargetCandidates::Resources(candidates))
    }

    /// Pick the internet gateway for a `0.0.0.0/0` route.
    ///
    /// Order: a gateway attached to the table's VPC; otherwise, only with
    /// [`GatewayFallback::FirstAvailable`], the first gateway in the scope.
    pub fn default_route_gateway(
        &self,
        route_table_id: &str,
        fallback: GatewayFallback,
    ) -> Result<GatewayChoice> {
        let table = self.route_table(route_table_id)?;
        let gateways = self.store.list_typed::<InternetGateway>(self.scope);

        if let Some(igw) = gateways.iter().find(|igw| igw.is_attached_to(&table.vpc_id)) {
            return Ok(GatewayChoice {
                gateway_id: igw.id.clone(),
                via_fallback: false,
            });
        }

        match (fallback, gateways.first()) {
            (GatewayFallback::FirstAvailable, Some(igw)) => {
                tracing::warn!(
                    "No internet gateway attached to {}; falling back to {} (attached to {})",
                    table.vpc_id,
                    igw.id,
                    igw.attached_vpc_id.as_deref().unwrap_or("no VPC")
                );
                Ok(GatewayChoice {
                    gateway_id: igw.id.clone(),
                    via_fallback: true,
                })
            }
            (_, None) => Err(NetError::NoGatewayAvailable(format!(
                "no internet gateways in {}",
                self.scope
            ))),
            (GatewayFallback::AttachedOnly, Some(_)) => Err(NetError::NoGatewayAvailable(
                format!("no internet gateway attached to {}", table.vpc_id),
            )),
        }
    }

    /// Check that a route target references something that exists.
    ///
    /// Instance and NAT gateway ids are accepted unchecked.
    pub fn validate_route_target(&self, target: &RouteTarget) -> Result<()> {
        let exists = match target {
            RouteTarget::Gateway(id) => self
                .store
                .get_typed::<InternetGateway>(self.scope, id)
                .is_some(),
            RouteTarget::NetworkInterface(id) => self
                .store
                .get_typed::<NetworkInterface>(self.scope, id)
                .is_some(),
            RouteTarget::Instance(_) | RouteTarget::NatGateway(_) => true,
        };

        if !exists {
            return Err(NetError::Validation(format!(
                "route target {} {} does not exist in {}",
                target.kind(),
                target.id(),
                self.scope
            )));
        }
        Ok(())
    }

    pub fn plan_association(
        &self,
        route_table_id: &str,
        subnet_id: &str,
    ) -> Result<AssociationPlan> {
        let table = self.route_table(route_table_id)?;
        let subnet = self
            .store
            .get_typed::<Subnet>(self.scope, subnet_id)
            .ok_or_else(|| {
                NetError::ResourceNotFound(format!("subnet {} in {}", subnet_id, self.scope))
            })?;

        if table.vpc_id != subnet.vpc_id {
            return Err(NetError::Validation(format!(
                "route table {} ({}) and subnet {} ({}) are in different VPCs",
                table.id, table.vpc_id, subnet.id, subnet.vpc_id
            )));
        }

        let existing = self
            .store
            .get_typed::<RouteTableAssociation>(self.scope, subnet_id);
        let already_associated = existing
            .as_ref()
            .is_some_and(|a| a.route_table_id == route_table_id);

        Ok(AssociationPlan {
            association: RouteTableAssociation {
                route_table_id: route_table_id.to_string(),
                subnet_id: subnet_id.to_string(),
            },
            supersedes: existing.filter(|_| !already_associated),
            already_associated,
        })
    }

    /// Check an ENI / security group pair before attaching
    pub fn check_security_group_attachment(
        &self,
        interface_id: &str,
        group_id: &str,
    ) -> Result<(NetworkInterface, SecurityGroup)> {
        let eni = self
            .store
            .get_typed::<NetworkInterface>(self.scope, interface_id)
            .ok_or_else(|| {
                NetError::ResourceNotFound(format!(
                    "network interface {} in {}",
                    interface_id, self.scope
                ))
            })?;
        let group = self
            .store
            .get_typed::<SecurityGroup>(self.scope, group_id)
            .ok_or_else(|| {
                NetError::ResourceNotFound(format!("security group {} in {}", group_id, self.scope))
            })?;

        if let Some(vpc_id) = eni.vpc_id.as_deref() {
            if vpc_id != group.vpc_id {
                return Err(NetError::Validation(format!(
                    "security group {} belongs to {}, interface {} to {}",
                    group.id, group.vpc_id, eni.id, vpc_id
                )));
            }
        }

        Ok((eni, group))
    }
}

fn display_label(id: &str, name: &str) -> String {
    if name.is_empty() {
        id.to_string()
    } else {
        format!("{} ({})", name, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ResourceState;

    fn scope() -> Scope {
        Scope::new("p1", "tk1a").unwrap()
    }

    fn igw(id: &str, vpc: Option<&str>) -> InternetGateway {
        InternetGateway {
            id: id.to_string(),
            name: String::new(),
            state: ResourceState::Available,
            attached_vpc_id: vpc.map(str::to_string),
        }
    }

    fn table(id: &str, vpc: &str) -> RouteTable {
        RouteTable {
            id: id.to_string(),
            vpc_id: vpc.to_string(),
            name: String::new(),
        }
    }

    fn subnet(id: &str, vpc: &str) -> Subnet {
        Subnet {
            id: id.to_string(),
            vpc_id: vpc.to_string(),
            cidr_block: "10.0.1.0/24".to_string(),
            availability_zone: "tk1a-a".to_string(),
            available_ip_count: 250,
            total_ip_count: 256,
            is_default: false,
            state: ResourceState::Available,
        }
    }

    fn store_with(gateways: Vec<InternetGateway>, tables: Vec<RouteTable>) -> ResourceStore {
        let store = ResourceStore::new();
        for g in gateways {
            store.upsert_typed(&scope(), g).unwrap();
        }
        for t in tables {
            store.upsert_typed(&scope(), t).unwrap();
        }
        store
    }

    #[test]
    fn test_default_route_prefers_gateway_attached_to_vpc() {
        let store = store_with(
            vec![igw("G1", Some("VPC-A")), igw("G2", None)],
            vec![table("rtb-a", "VPC-A")],
        );
        let s = scope();
        let resolver = DependencyResolver::new(&store, &s);

        for fallback in [GatewayFallback::AttachedOnly, GatewayFallback::FirstAvailable] {
            let choice = resolver.default_route_gateway("rtb-a", fallback).unwrap();
            assert_eq!(choice.gateway_id, "G1");
            assert!(!choice.via_fallback);
        }
    }

    #[test]
    fn test_default_route_attached_match_wins_over_list_order() {
        let store = store_with(
            vec![igw("G0", Some("VPC-X")), igw("G1", Some("VPC-A"))],
            vec![table("rtb-a", "VPC-A")],
        );
        let s = scope();
        let choice = DependencyResolver::new(&store, &s)
            .default_route_gateway("rtb-a", GatewayFallback::FirstAvailable)
            .unwrap();
        assert_eq!(choice.gateway_id, "G1");
    }

    #[test]
    fn test_default_route_falls_back_to_first_gateway_when_allowed() {
        let store = store_with(vec![igw("G2", None)], vec![table("rtb-b", "VPC-B")]);
        let s = scope();
        let resolver = DependencyResolver::new(&store, &s);

        let choice = resolver
            .default_route_gateway("rtb-b", GatewayFallback::FirstAvailable)
            .unwrap();
        assert_eq!(choice.gateway_id, "G2");
        assert!(choice.via_fallback);

        let err = resolver
            .default_route_gateway("rtb-b", GatewayFallback::AttachedOnly)
            .unwrap_err();
        assert!(matches!(err, NetError::NoGatewayAvailable(_)));
    }

    #[test]
    fn test_default_route_without_gateways_fails() {
        let store = store_with(vec![], vec![table("rtb-b", "VPC-B")]);
        let s = scope();
        let err = DependencyResolver::new(&store, &s)
            .default_route_gateway("rtb-b", GatewayFallback::FirstAvailable)
            .unwrap_err();
        assert!(matches!(err, NetError::NoGatewayAvailable(_)));
    }

    #[test]
    fn test_default_route_unknown_table_is_not_found() {
        let store = store_with(vec![igw("G1", None)], vec![]);
        let s = scope();
        let err = DependencyResolver::new(&store, &s)
            .default_route_gateway("rtb-404", GatewayFallback::FirstAvailable)
            .unwrap_err();
        assert!(matches!(err, NetError::ResourceNotFound(_)));
    }

    #[test]
    fn test_candidate_targets_are_scoped_to_vpc() {
        let store = store_with(
            vec![igw("G1", Some("VPC-A")), igw("G2", Some("VPC-B")), igw("G3", None)],
            vec![table("rtb-a", "VPC-A")],
        );
        let s = scope();
        store
            .upsert_typed(
                &s,
                NetworkInterface::new("eni-a", Some("VPC-A")).with_private_ip("10.0.0.5"),
            )
            .unwrap();
        store
            .upsert_typed(&s, NetworkInterface::new("eni-b", Some("VPC-B")))
            .unwrap();
        let resolver = DependencyResolver::new(&store, &s);

        let gateways = resolver
            .candidate_targets("rtb-a", TargetKind::Gateway)
            .unwrap();
        assert_eq!(
            gateways,
            TargetCandidates::Resources(vec![TargetCandidate {
                id: "G1".to_string(),
                label: "G1".to_string()
            }])
        );

        let interfaces = resolver
            .candidate_targets("rtb-a", TargetKind::NetworkInterface)
            .unwrap();
        assert_eq!(
            interfaces,
            TargetCandidates::Resources(vec![TargetCandidate {
                id: "eni-a".to_string(),
                label: "eni-a (10.0.0.5)".to_string()
            }])
        );

        assert_eq!(
            resolver.candidate_targets("rtb-a", TargetKind::Instance).unwrap(),
            TargetCandidates::FreeForm
        );
    }

    #[test]
    fn test_validate_route_target() {
        let store = store_with(vec![igw("G1", None)], vec![]);
        let s = scope();
        let resolver = DependencyResolver::new(&store, &s);

        assert!(resolver.validate_route_target(&RouteTarget::Gateway("G1".into())).is_ok());
        assert!(resolver.validate_route_target(&RouteTarget::Gateway("G9".into())).is_err());
        assert!(
            resolver
                .validate_route_target(&RouteTarget::NetworkInterface("eni-9".into()))
                .is_err()
        );
        assert!(resolver.validate_route_target(&RouteTarget::Instance("i-9".into())).is_ok());
        assert!(resolver.validate_route_target(&RouteTarget::NatGateway("nat-9".into())).is_ok());
    }

    #[test]
    fn test_plan_association_reports_superseded() {
        let store = store_with(vec![], vec![table("rtb-1", "VPC-A"), table("rtb-2", "VPC-A")]);
        let s = scope();
        store.upsert_typed(&s, subnet("subnet-1", "VPC-A")).unwrap();
        store
            .upsert_typed(
                &s,
                RouteTableAssociation {
                    route_table_id: "rtb-1".to_string(),
                    subnet_id: "subnet-1".to_string(),
                },
            )
            .unwrap();
        let resolver = DependencyResolver::new(&store, &s);

        let plan = resolver.plan_association("rtb-2", "subnet-1").unwrap();
        assert!(!plan.already_associated);
        assert_eq!(plan.supersedes.unwrap().route_table_id, "rtb-1");

        let plan = resolver.plan_association("rtb-1", "subnet-1").unwrap();
        assert!(plan.already_associated);
        assert!(plan.supersedes.is_none());
    }

    #[test]
    fn test_plan_association_rejects_cross_vpc() {
        let store = store_with(vec![], vec![table("rtb-1", "VPC-A")]);
        let s = scope();
        store.upsert_typed(&s, subnet("subnet-b", "VPC-B")).unwrap();
        let err = DependencyResolver::new(&store, &s)
            .plan_association("rtb-1", "subnet-b")
            .unwrap_err();
        assert!(matches!(err, NetError::Validation(_)));
    }

    #[test]
    fn test_security_group_attachment_checks_vpc() {
        let store = ResourceStore::new();
        let s = scope();
        store
            .upsert_typed(&s, NetworkInterface::new("eni-1", Some("VPC-A")))
            .unwrap();
        store
            .upsert_typed(
                &s,
                SecurityGroup {
                    id: "sg-b".to_string(),
                    vpc_id: "VPC-B".to_string(),
                    name: "web".to_string(),
                },
            )
            .unwrap();
        let resolver = DependencyResolver::new(&store, &s);

        assert!(matches!(
            resolver.check_security_group_attachment("eni-1", "sg-b"),
            Err(NetError::Validation(_))
        ));
        assert!(matches!(
            resolver.check_security_group_attachment("eni-1", "sg-404"),
            Err(NetError::ResourceNotFound(_))
        ));
    }
}
