//! Network resource model
//!
//! Typed records for every entity kept in the resource store. Records are
//! always complete: the store replaces them whole and never merges fields.

mod route;

pub use route::{
    DEFAULT_ROUTE_CIDR, Route, RouteTarget, RouteTargetFields, TargetKind, validate_cidr,
};

use crate::error::{NetError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Kind of network resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Vpc,
    InternetGateway,
    Subnet,
    RouteTable,
    RouteTableAssociation,
    Route,
    SecurityGroup,
    NetworkInterface,
    EdgeConfig,
}

impl ResourceKind {
    /// All kinds, parents before children
    pub const ALL: [ResourceKind; 9] = [
        ResourceKind::Vpc,
        ResourceKind::InternetGateway,
        ResourceKind::Subnet,
        ResourceKind::RouteTable,
        ResourceKind::RouteTableAssociation,
        ResourceKind::Route,
        ResourceKind::SecurityGroup,
        ResourceKind::NetworkInterface,
        ResourceKind::EdgeConfig,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Vpc => "vpc",
            ResourceKind::InternetGateway => "internet_gateway",
            ResourceKind::Subnet => "subnet",
            ResourceKind::RouteTable => "route_table",
            ResourceKind::RouteTableAssociation => "route_table_association",
            ResourceKind::Route => "route",
            ResourceKind::SecurityGroup => "security_group",
            ResourceKind::NetworkInterface => "network_interface",
            ResourceKind::EdgeConfig => "edge_config",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ResourceKind {
    type Err = NetError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        let normalized = match normalized.as_str() {
            "network" | "networks" | "vpcs" => "vpc",
            "igw" => "internet_gateway",
            "eni" => "network_interface",
            other => other.trim_end_matches('s'),
        };

        ResourceKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| NetError::Validation(format!("unknown resource kind: {}", s)))
    }
}

/// Lifecycle state reported by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceState {
    Pending,
    Available,
    Deleting,
    Attached,
    Detached,
    InUse,
    #[default]
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for ResourceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceState::Pending => write!(f, "pending"),
            ResourceState::Available => write!(f, "available"),
            ResourceState::Deleting => write!(f, "deleting"),
            ResourceState::Attached => write!(f, "attached"),
            ResourceState::Detached => write!(f, "detached"),
            ResourceState::InUse => write!(f, "in_use"),
            ResourceState::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vpc {
    pub id: String,
    pub cidr_block: String,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub state: ResourceState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subnet {
    pub id: String,
    pub vpc_id: String,
    pub cidr_block: String,
    #[serde(default)]
    pub availability_zone: String,
    #[serde(default)]
    pub available_ip_count: u32,
    #[serde(default)]
    pub total_ip_count: u32,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub state: ResourceState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteTable {
    pub id: String,
    pub vpc_id: String,
    #[serde(default)]
    pub name: String,
}

/// Binding of a route table to a subnet; a subnet has at most one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteTableAssociation {
    pub route_table_id: String,
    pub subnet_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternetGateway {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub state: ResourceState,
    #[serde(default)]
    pub attached_vpc_id: Option<String>,
}

impl InternetGateway {
    pub fn is_attached_to(&self, vpc_id: &str) -> bool {
        self.attached_vpc_id.as_deref() == Some(vpc_id)
    }
}

/// Virtual network port.
///
/// Security group membership is a set and only changes through
/// attach/detach.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInterface {
    pub id: String,
    #[serde(default)]
    pub vpc_id: Option<String>,
    #[serde(default)]
    pub state: ResourceState,
    #[serde(default)]
    pub private_ip_addresses: Vec<String>,
    #[serde(default)]
    pub attached_instance_id: Option<String>,
    #[serde(default)]
    security_group_ids: BTreeSet<String>,
}

impl NetworkInterface {
    pub fn new(id: impl Into<String>, vpc_id: Option<&str>) -> Self {
        Self {
            id: id.into(),
            vpc_id: vpc_id.map(str::to_string),
            state: ResourceState::Unknown,
            private_ip_addresses: Vec::new(),
            attached_instance_id: None,
            security_group_ids: BTreeSet::new(),
        }
    }

    pub fn with_state(mut self, state: ResourceState) -> Self {
        self.state = state;
        self
    }

    pub fn with_private_ip(mut self, ip: impl Into<String>) -> Self {
        self.private_ip_addresses.push(ip.into());
        self
    }

    /// Initial membership, as reported on creation or discovery
    pub fn with_security_groups<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.security_group_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn security_group_ids(&self) -> &BTreeSet<String> {
        &self.security_group_ids
    }

    pub fn has_security_group(&self, id: &str) -> bool {
        self.security_group_ids.contains(id)
    }

    /// Returns false if the group was already attached
    pub(crate) fn attach_security_group(&mut self, id: &str) -> bool {
        self.security_group_ids.insert(id.to_string())
    }

    /// Returns false if the group was not attached
    pub(crate) fn detach_security_group(&mut self, id: &str) -> bool {
        self.security_group_ids.remove(id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityGroup {
    pub id: String,
    pub vpc_id: String,
    #[serde(default)]
    pub name: String,
}

/// Per-scope edge network settings; at most one per project and region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeConfig {
    pub project_id: String,
    pub region: String,
    pub edge_network_id: String,
    pub ip_pool_id: String,
    #[serde(default)]
    pub flowlogs_enabled: bool,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl EdgeConfig {
    pub fn key(&self) -> String {
        format!("{}/{}", self.project_id, self.region)
    }
}

/// Any record held by the resource store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "record", rename_all = "snake_case")]
pub enum Resource {
    Vpc(Vpc),
    InternetGateway(InternetGateway),
    Subnet(Subnet),
    RouteTable(RouteTable),
    RouteTableAssociation(RouteTableAssociation),
    Route(Route),
    SecurityGroup(SecurityGroup),
    NetworkInterface(NetworkInterface),
    EdgeConfig(EdgeConfig),
}

impl Resource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Resource::Vpc(_) => ResourceKind::Vpc,
            Resource::InternetGateway(_) => ResourceKind::InternetGateway,
            Resource::Subnet(_) => ResourceKind::Subnet,
            Resource::RouteTable(_) => ResourceKind::RouteTable,
            Resource::RouteTableAssociation(_) => ResourceKind::RouteTableAssociation,
            Resource::Route(_) => ResourceKind::Route,
            Resource::SecurityGroup(_) => ResourceKind::SecurityGroup,
            Resource::NetworkInterface(_) => ResourceKind::NetworkInterface,
            Resource::EdgeConfig(_) => ResourceKind::EdgeConfig,
        }
    }

    /// Store key, unique within a (scope, kind) partition
    pub fn id(&self) -> String {
        match self {
            Resource::Vpc(r) => r.id.clone(),
            Resource::InternetGateway(r) => r.id.clone(),
            Resource::Subnet(r) => r.id.clone(),
            Resource::RouteTable(r) => r.id.clone(),
            // Keyed by subnet so a new association supersedes the old one
            Resource::RouteTableAssociation(r) => r.subnet_id.clone(),
            Resource::Route(r) => r.key(),
            Resource::SecurityGroup(r) => r.id.clone(),
            Resource::NetworkInterface(r) => r.id.clone(),
            Resource::EdgeConfig(r) => r.key(),
        }
    }

    /// Decode a bare provider record of the given kind
    pub fn from_json(kind: ResourceKind, value: serde_json::Value) -> Result<Self> {
        let resource = match kind {
            ResourceKind::Vpc => Resource::Vpc(serde_json::from_value(value)?),
            ResourceKind::InternetGateway => {
                Resource::InternetGateway(serde_json::from_value(value)?)
            }
            ResourceKind::Subnet => Resource::Subnet(serde_json::from_value(value)?),
            ResourceKind::RouteTable => Resource::RouteTable(serde_json::from_value(value)?),
            ResourceKind::RouteTableAssociation => {
                Resource::RouteTableAssociation(serde_json::from_value(value)?)
            }
            ResourceKind::Route => Resource::Route(serde_json::from_value(value)?),
            ResourceKind::SecurityGroup => Resource::SecurityGroup(serde_json::from_value(value)?),
            ResourceKind::NetworkInterface => {
                Resource::NetworkInterface(serde_json::from_value(value)?)
            }
            ResourceKind::EdgeConfig => Resource::EdgeConfig(serde_json::from_value(value)?),
        };
        Ok(resource)
    }

    /// Encode the bare record, without the kind tag
    pub fn to_json(&self) -> Result<serde_json::Value> {
        let value = match self {
            Resource::Vpc(r) => serde_json::to_value(r)?,
            Resource::InternetGateway(r) => serde_json::to_value(r)?,
            Resource::Subnet(r) => serde_json::to_value(r)?,
            Resource::RouteTable(r) => serde_json::to_value(r)?,
            Resource::RouteTableAssociation(r) => serde_json::to_value(r)?,
            Resource::Route(r) => serde_json::to_value(r)?,
            Resource::SecurityGroup(r) => serde_json::to_value(r)?,
            Resource::NetworkInterface(r) => serde_json::to_value(r)?,
            Resource::EdgeConfig(r) => serde_json::to_value(r)?,
        };
        Ok(value)
    }
}

/// Typed view over [`Resource`] variants
pub trait TypedResource: Sized {
    const KIND: ResourceKind;

    fn from_resource(resource: Resource) -> Option<Self>;

    fn into_resource(self) -> Resource;
}

macro_rules! typed_resource {
    ($($ty:ident),* $(,)?) => {
        $(
            impl TypedResource for $ty {
                const KIND: ResourceKind = ResourceKind::$ty;

                fn from_resource(resource: Resource) -> Option<Self> {
                    match resource {
                        Resource::$ty(r) => Some(r),
                        _ => None,
                    }
                }

                fn into_resource(self) -> Resource {
                    Resource::$ty(self)
                }
            }

            impl From<$ty> for Resource {
                fn from(r: $ty) -> Self {
                    Resource::$ty(r)
                }
            }
        )*
    };
}

typed_resource!(
    Vpc,
    InternetGateway,
    Subnet,
    RouteTable,
    RouteTableAssociation,
    Route,
    SecurityGroup,
    NetworkInterface,
    EdgeConfig,
);
