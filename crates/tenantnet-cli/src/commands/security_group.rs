use super::Context;
use crate::utils;
use colored::Colorize;
use tenantnet_core::{NetworkInterface, ResourceKind};

const KINDS: [ResourceKind; 2] = [ResourceKind::NetworkInterface, ResourceKind::SecurityGroup];

pub async fn handle_attach(ctx: &Context, interface: &str, group: &str) -> anyhow::Result<()> {
    ctx.sync_kinds(&KINDS).await?;
    let eni = ctx
        .service
        .attach_security_group(&ctx.scope, interface, group)
        .await?;
    print_interface(ctx, &eni)
}

pub async fn handle_detach(ctx: &Context, interface: &str, group: &str) -> anyhow::Result<()> {
    ctx.sync_kinds(&KINDS).await?;
    let eni = ctx
        .service
        .detach_security_group(&ctx.scope, interface, group)
        .await?;
    print_interface(ctx, &eni)
}

fn print_interface(ctx: &Context, eni: &NetworkInterface) -> anyhow::Result<()> {
    if ctx.json {
        return utils::print_json(eni);
    }
    let groups: Vec<&str> = eni.security_group_ids().iter().map(String::as_str).collect();
    println!(
        "{} {} グループ: {}",
        "✓".green(),
        eni.id.cyan(),
        if groups.is_empty() {
            "-".to_string()
        } else {
            groups.join(", ")
        }
    );
    Ok(())
}
