use super::Context;
use crate::utils;
use colored::Colorize;
use tenantnet_core::{ResourceKind, SyncReport};

pub async fn handle(ctx: &Context, kind: Option<&str>) -> anyhow::Result<()> {
    ctx.print_scope();

    let results = match kind {
        Some(kind) => {
            let kind: ResourceKind = kind.parse()?;
            vec![(kind, ctx.service.sync_resources(kind, &ctx.scope).await)]
        }
        None => ctx.service.sync_all(&ctx.scope).await,
    };

    let failed = results.iter().filter(|(_, r)| r.is_err()).count();

    if ctx.json {
        let rows: Vec<serde_json::Value> = results
            .iter()
            .map(|(kind, result)| match result {
                Ok(report) => serde_json::json!({"kind": kind, "report": report}),
                Err(e) => serde_json::json!({"kind": kind, "error": e.report()}),
            })
            .collect();
        utils::print_json(&rows)?;
    } else {
        for (kind, result) in &results {
            match result {
                Ok(report) => print_report(report),
                Err(e) => println!("{} {}: {}", "✗".red(), kind, e),
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{}件中{}件の同期に失敗しました", results.len(), failed);
    }
    Ok(())
}

fn print_report(report: &SyncReport) {
    if report.superseded {
        println!("{} {}: 新しい同期に置き換えられました", "•".yellow(), report.kind);
        return;
    }

    println!("{} {}: {}件", "✓".green(), report.kind, report.upserted);
    for id in &report.removed {
        println!("    {} {}", "削除".dimmed(), id);
    }
}
