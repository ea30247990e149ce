use colored::Colorize;
use serde::Serialize;
use tenantnet_core::{Resource, ResourceState};

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn colored_state(state: ResourceState) -> colored::ColoredString {
    let text = state.to_string();
    match state {
        ResourceState::Available | ResourceState::Attached | ResourceState::InUse => text.green(),
        ResourceState::Pending => text.yellow(),
        ResourceState::Deleting | ResourceState::Detached => text.red(),
        ResourceState::Unknown => text.dimmed(),
    }
}

/// リソースを1行のテキストで表現
pub fn resource_line(resource: &Resource) -> String {
    match resource {
        Resource::Vpc(v) => format!(
            "{}  {}  {}{}",
            v.id.cyan(),
            v.cidr_block,
            colored_state(v.state),
            if v.is_default { "  (default)" } else { "" }
        ),
        Resource::Subnet(s) => format!(
            "{}  {}  vpc={}  free={}/{}  {}",
            s.id.cyan(),
            s.cidr_block,
            s.vpc_id,
            s.available_ip_count,
            s.total_ip_count,
            colored_state(s.state)
        ),
        Resource::RouteTable(t) => format!("{}  vpc={}  {}", t.id.cyan(), t.vpc_id, t.name),
        Resource::RouteTableAssociation(a) => {
            format!("{} -> {}", a.subnet_id.cyan(), a.route_table_id)
        }
        Resource::Route(r) => format!(
            "{}  {}  via {} {}",
            r.route_table_id.cyan(),
            r.destination_cidr,
            r.target.kind(),
            r.target.id()
        ),
        Resource::InternetGateway(g) => format!(
            "{}  {}  attached={}",
            g.id.cyan(),
            colored_state(g.state),
            g.attached_vpc_id.as_deref().unwrap_or("-")
        ),
        Resource::NetworkInterface(n) => format!(
            "{}  vpc={}  ips={}  groups={}  {}",
            n.id.cyan(),
            n.vpc_id.as_deref().unwrap_or("-"),
            n.private_ip_addresses.join(","),
            n.security_group_ids()
                .iter()
                .cloned()
                .collect::<Vec<_>>()
                .join(","),
            colored_state(n.state)
        ),
        Resource::SecurityGroup(g) => format!("{}  vpc={}  {}", g.id.cyan(), g.vpc_id, g.name),
        Resource::EdgeConfig(e) => format!(
            "{}  edge={}  pool={}  flowlogs={}",
            e.key().cyan(),
            e.edge_network_id,
            e.ip_pool_id,
            e.flowlogs_enabled
        ),
    }
}
