//! Routes and their polymorphic targets

use crate::error::{NetError, Result};
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

/// Destination CIDR of a default route
pub const DEFAULT_ROUTE_CIDR: &str = "0.0.0.0/0";

/// Where a route sends traffic.
///
/// Exactly one target is set by construction. Gateway and network interface
/// targets point at locally modeled resources; instance and NAT gateway ids
/// are raw provider identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RouteTarget {
    Gateway(String),
    NetworkInterface(String),
    Instance(String),
    NatGateway(String),
}

/// Discriminant of [`RouteTarget`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Gateway,
    NetworkInterface,
    Instance,
    NatGateway,
}

impl TargetKind {
    /// Whether targets of this kind are resolved against the resource store
    pub fn is_locally_modeled(&self) -> bool {
        matches!(self, TargetKind::Gateway | TargetKind::NetworkInterface)
    }
}

impl std::fmt::Display for TargetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetKind::Gateway => write!(f, "gateway"),
            TargetKind::NetworkInterface => write!(f, "network_interface"),
            TargetKind::Instance => write!(f, "instance"),
            TargetKind::NatGateway => write!(f, "nat_gateway"),
        }
    }
}

impl std::str::FromStr for TargetKind {
    type Err = NetError;

    fn from_str(s: &str) -> Result<Self> {
        match s.replace('-', "_").as_str() {
            "gateway" => Ok(TargetKind::Gateway),
            "network_interface" => Ok(TargetKind::NetworkInterface),
            "instance" => Ok(TargetKind::Instance),
            "nat_gateway" => Ok(TargetKind::NatGateway),
            other => Err(NetError::Validation(format!("unknown target kind: {}", other))),
        }
    }
}

impl RouteTarget {
    pub fn new(kind: TargetKind, id: impl Into<String>) -> Self {
        let id = id.into();
        match kind {
            TargetKind::Gateway => RouteTarget::Gateway(id),
            TargetKind::NetworkInterface => RouteTarget::NetworkInterface(id),
            TargetKind::Instance => RouteTarget::Instance(id),
            TargetKind::NatGateway => RouteTarget::NatGateway(id),
        }
    }

    pub fn kind(&self) -> TargetKind {
        match self {
            RouteTarget::Gateway(_) => TargetKind::Gateway,
            RouteTarget::NetworkInterface(_) => TargetKind::NetworkInterface,
            RouteTarget::Instance(_) => TargetKind::Instance,
            RouteTarget::NatGateway(_) => TargetKind::NatGateway,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            RouteTarget::Gateway(id)
            | RouteTarget::NetworkInterface(id)
            | RouteTarget::Instance(id)
            | RouteTarget::NatGateway(id) => id,
        }
    }
}

/// Provider wire form of a route target: four optional id fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteTargetFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_interface_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nat_gateway_id: Option<String>,
}

impl TryFrom<RouteTargetFields> for RouteTarget {
    type Error = NetError;

    fn try_from(fields: RouteTargetFields) -> Result<Self> {
        let mut set = [
            fields.gateway_id.map(RouteTarget::Gateway),
            fields.network_interface_id.map(RouteTarget::NetworkInterface),
            fields.instance_id.map(RouteTarget::Instance),
            fields.nat_gateway_id.map(RouteTarget::NatGateway),
        ]
        .into_iter()
        .flatten();

        match (set.next(), set.next()) {
            (Some(target), None) => Ok(target),
            (None, _) => Err(NetError::Validation(
                "route target: no target field is set".to_string(),
            )),
            (Some(_), Some(_)) => Err(NetError::Validation(
                "route target: more than one target field is set".to_string(),
            )),
        }
    }
}

impl From<RouteTarget> for RouteTargetFields {
    fn from(target: RouteTarget) -> Self {
        let mut fields = RouteTargetFields::default();
        match target {
            RouteTarget::Gateway(id) => fields.gateway_id = Some(id),
            RouteTarget::NetworkInterface(id) => fields.network_interface_id = Some(id),
            RouteTarget::Instance(id) => fields.instance_id = Some(id),
            RouteTarget::NatGateway(id) => fields.nat_gateway_id = Some(id),
        }
        fields
    }
}

/// A routing rule inside a route table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RouteWire", into = "RouteWire")]
pub struct Route {
    pub route_table_id: String,
    pub destination_cidr: String,
    pub target: RouteTarget,
}

impl Route {
    pub fn new(
        route_table_id: impl Into<String>,
        destination_cidr: impl Into<String>,
        target: RouteTarget,
    ) -> Result<Self> {
        let destination_cidr = destination_cidr.into();
        validate_cidr(&destination_cidr)?;
        if target.id().trim().is_empty() {
            return Err(NetError::Validation(format!(
                "route target {} has an empty id",
                target.kind()
            )));
        }

        Ok(Self {
            route_table_id: route_table_id.into(),
            destination_cidr,
            target,
        })
    }

    /// Build a route from the four-field wire shape
    pub fn from_fields(
        route_table_id: impl Into<String>,
        destination_cidr: impl Into<String>,
        fields: RouteTargetFields,
    ) -> Result<Self> {
        let target = RouteTarget::try_from(fields)?;
        Self::new(route_table_id, destination_cidr, target)
    }

    /// Store key: destination CIDRs are unique per route table
    pub fn key(&self) -> String {
        format!("{}/{}", self.route_table_id, self.destination_cidr)
    }

    pub fn is_default_route(&self) -> bool {
        self.destination_cidr == DEFAULT_ROUTE_CIDR
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RouteWire {
    route_table_id: String,
    destination_cidr: String,
    #[serde(flatten)]
    target: RouteTargetFields,
}

impl TryFrom<RouteWire> for Route {
    type Error = NetError;

    fn try_from(wire: RouteWire) -> Result<Self> {
        Route::from_fields(wire.route_table_id, wire.destination_cidr, wire.target)
    }
}

impl From<Route> for RouteWire {
    fn from(route: Route) -> Self {
        Self {
            route_table_id: route.route_table_id,
            destination_cidr: route.destination_cidr,
            target: route.target.into(),
        }
    }
}

/// IPv4 `a.b.c.d/n` syntax check only; overlap is the provider's concern
pub fn validate_cidr(cidr: &str) -> Result<()> {
    let invalid = || NetError::Validation(format!("invalid CIDR block: {}", cidr));

    let (addr, prefix) = cidr.split_once('/').ok_or_else(invalid)?;
    addr.parse::<Ipv4Addr>().map_err(|_| invalid())?;
    let prefix: u8 = prefix.parse().map_err(|_| invalid())?;

    if prefix > 32 {
        return Err(invalid());
    }
    Ok(())
}
