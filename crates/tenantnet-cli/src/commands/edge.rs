use super::Context;
use crate::utils;
use colored::Colorize;
use tenantnet_core::{EdgeAssignment, ResourceKind};

pub async fn handle_assign(
    ctx: &Context,
    network: String,
    pool: String,
    flowlogs: bool,
) -> anyhow::Result<()> {
    ctx.sync_kinds(&[ResourceKind::EdgeConfig]).await?;

    let config = ctx
        .service
        .assign_edge_config(
            &ctx.scope,
            EdgeAssignment {
                edge_network_id: network,
                ip_pool_id: pool,
                flowlogs_enabled: flowlogs,
                ..Default::default()
            },
        )
        .await?;

    if ctx.json {
        return utils::print_json(&config);
    }
    println!(
        "{} {} edge={} pool={}",
        "✓".green(),
        config.key().cyan(),
        config.edge_network_id,
        config.ip_pool_id
    );
    Ok(())
}
