use super::Context;
use crate::utils;
use colored::Colorize;

pub async fn handle(ctx: &Context) -> anyhow::Result<()> {
    // 一部の同期に失敗してもチェックリストは出す（古い項目は未完了のまま）
    for (kind, result) in ctx.service.sync_all(&ctx.scope).await {
        if let Err(e) = result {
            tracing::warn!("{} の同期に失敗しました: {}", kind, e);
        }
    }
    if let Err(e) = ctx
        .service
        .refresh_account_signals(&ctx.project.project_id)
        .await
    {
        tracing::warn!("アカウント情報を取得できませんでした: {}", e);
    }

    let items = ctx.service.get_checklist(&ctx.project);

    if ctx.json {
        return utils::print_json(&items);
    }

    ctx.print_scope();
    println!();
    for item in &items {
        let mark = if item.completed {
            "✓".green()
        } else {
            "✗".red()
        };
        let counts = match (item.count, item.missing_count) {
            (Some(count), Some(missing)) if missing > 0 => {
                format!(" ({}件中{}件が未設定)", count, missing)
            }
            _ => String::new(),
        };
        println!("  {} {}{}", mark, item.title, counts.dimmed());

        if let Some(action) = &item.action {
            println!(
                "      {} {} {}",
                "修正:".yellow(),
                action.label,
                format!("({} {})", action.method, action.endpoint).dimmed()
            );
        }
    }

    let done = items.iter().filter(|i| i.completed).count();
    println!();
    println!("{}/{} 完了", done, items.len());
    Ok(())
}
