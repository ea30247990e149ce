use super::Context;
use crate::utils;
use anyhow::Context as _;
use colored::Colorize;
use tenantnet_core::{Action, DispatchOutcome, Method};

pub async fn handle(
    ctx: &Context,
    endpoint: &str,
    method: &str,
    body: Option<&str>,
) -> anyhow::Result<()> {
    let method: Method = method.parse()?;
    let mut action = Action::new(method, endpoint, format!("{} {}", method, endpoint));
    if let Some(body) = body {
        let body: serde_json::Value =
            serde_json::from_str(body).context("--body が JSON として不正です")?;
        action = action.with_body(body);
    }

    let outcome = ctx
        .service
        .dispatch_action(&ctx.project.project_id, &action)
        .await?;

    if ctx.json {
        return utils::print_json(&outcome);
    }

    match outcome {
        DispatchOutcome::Completed { .. } => {
            println!("{} {}", "✓".green(), action.label);
        }
        DispatchOutcome::AlreadySatisfied { message, .. } => {
            println!("{} {} (実行済み: {})", "•".yellow(), action.label, message);
        }
    }
    println!("{}", "`netctl checklist` で最新の状態を確認できます".dimmed());
    Ok(())
}
