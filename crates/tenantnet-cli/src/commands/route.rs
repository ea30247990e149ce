use super::Context;
use crate::utils;
use colored::Colorize;
use tenantnet_core::{GatewayFallback, ResourceKind};

pub async fn handle_default_route(
    ctx: &Context,
    route_table: &str,
    allow_foreign_gateway: bool,
) -> anyhow::Result<()> {
    ctx.sync_kinds(&[
        ResourceKind::RouteTable,
        ResourceKind::InternetGateway,
        ResourceKind::Route,
    ])
    .await?;

    let fallback = if allow_foreign_gateway {
        GatewayFallback::FirstAvailable
    } else {
        GatewayFallback::AttachedOnly
    };

    let route = ctx
        .service
        .create_default_route(&ctx.scope, route_table, fallback)
        .await?;

    if ctx.json {
        return utils::print_json(&route);
    }
    println!(
        "{} {} {} 経由: {}",
        "✓".green(),
        route.route_table_id.cyan(),
        route.destination_cidr,
        route.target.id()
    );
    Ok(())
}
