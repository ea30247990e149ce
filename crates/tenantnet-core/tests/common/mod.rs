use std::sync::Arc;
use tenantnet_core::testing::{FakeAccounts, FakeProvider};
use tenantnet_core::{
    InternetGateway, NetworkInterface, NetworkService, ProjectContext, Resource, ResourceKind,
    ResourceState, RouteTable, Scope, SecurityGroup, Subnet, Vpc,
};

pub struct TestNetwork {
    pub provider: Arc<FakeProvider>,
    pub accounts: Arc<FakeAccounts>,
    pub service: NetworkService,
    pub project: ProjectContext,
}

impl TestNetwork {
    pub fn new() -> Self {
        let provider = Arc::new(FakeProvider::new());
        let accounts = Arc::new(FakeAccounts::new());
        let service = NetworkService::new(provider.clone(), accounts.clone());
        Self {
            provider,
            accounts,
            service,
            project: ProjectContext::new("p1", "tk1a"),
        }
    }

    pub fn scope(&self) -> Scope {
        self.project.default_scope().unwrap()
    }

    /// Put records into the provider's truth for the default scope
    pub fn provider_has(&self, kind: ResourceKind, records: Vec<Resource>) {
        self.provider.set_listing(kind, &self.scope(), records);
    }

    /// Sync the given kinds into the store
    pub async fn sync(&self, kinds: &[ResourceKind]) {
        for kind in kinds {
            self.service.sync_resources(*kind, &self.scope()).await.unwrap();
        }
    }

    /// One available VPC with a subnet, a route table and a default group
    #[allow(dead_code)]
    pub async fn seed_basic_vpc(&self) {
        self.provider_has(ResourceKind::Vpc, vec![vpc("vpc-1").into()]);
        self.provider_has(ResourceKind::Subnet, vec![subnet("subnet-1", "vpc-1").into()]);
        self.provider_has(
            ResourceKind::RouteTable,
            vec![route_table("rtb-1", "vpc-1").into()],
        );
        self.provider_has(
            ResourceKind::SecurityGroup,
            vec![security_group("sg-1", "vpc-1").into()],
        );
        self.sync(&[
            ResourceKind::Vpc,
            ResourceKind::Subnet,
            ResourceKind::RouteTable,
            ResourceKind::SecurityGroup,
        ])
        .await;
    }
}

pub fn vpc(id: &str) -> Vpc {
    Vpc {
        id: id.to_string(),
        cidr_block: "10.0.0.0/16".to_string(),
        is_default: false,
        state: ResourceState::Available,
    }
}

#[allow(dead_code)]
pub fn subnet(id: &str, vpc_id: &str) -> Subnet {
    Subnet {
        id: id.to_string(),
        vpc_id: vpc_id.to_string(),
        cidr_block: "10.0.1.0/24".to_string(),
        availability_zone: "tk1a-1".to_string(),
        available_ip_count: 250,
        total_ip_count: 256,
        is_default: false,
        state: ResourceState::Available,
    }
}

pub fn route_table(id: &str, vpc_id: &str) -> RouteTable {
    RouteTable {
        id: id.to_string(),
        vpc_id: vpc_id.to_string(),
        name: format!("{}-main", vpc_id),
    }
}

pub fn igw(id: &str, attached_to: Option<&str>) -> InternetGateway {
    InternetGateway {
        id: id.to_string(),
        name: String::new(),
        state: if attached_to.is_some() {
            ResourceState::Attached
        } else {
            ResourceState::Detached
        },
        attached_vpc_id: attached_to.map(str::to_string),
    }
}

#[allow(dead_code)]
pub fn security_group(id: &str, vpc_id: &str) -> SecurityGroup {
    SecurityGroup {
        id: id.to_string(),
        vpc_id: vpc_id.to_string(),
        name: "default".to_string(),
    }
}

#[allow(dead_code)]
pub fn eni(id: &str, vpc_id: &str) -> NetworkInterface {
    NetworkInterface::new(id, Some(vpc_id))
        .with_state(ResourceState::InUse)
        .with_private_ip("10.0.1.10")
}
