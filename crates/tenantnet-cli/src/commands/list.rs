use super::Context;
use crate::utils;
use colored::Colorize;
use tenantnet_core::ResourceKind;

pub async fn handle(ctx: &Context, kind: &str) -> anyhow::Result<()> {
    let kind: ResourceKind = kind.parse()?;
    ctx.sync_kinds(&[kind]).await?;

    let resources = ctx.service.list_resources(kind, &ctx.scope);

    if ctx.json {
        return utils::print_json(&resources);
    }

    ctx.print_scope();
    println!();
    if resources.is_empty() {
        println!("{}", format!("{} のリソースはありません", kind).dimmed());
        return Ok(());
    }
    for resource in &resources {
        println!("  {}", utils::resource_line(resource));
    }
    Ok(())
}
