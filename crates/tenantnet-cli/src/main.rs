mod commands;
mod utils;

use clap::{Parser, Subcommand};
use commands::Context;

#[derive(Parser)]
#[command(name = "netctl")]
#[command(about = "テナントの VPC を同期し、プロビジョニングのチェックリストを片付ける", long_about = None)]
struct Cli {
    /// プロジェクト ID
    #[arg(short, long, global = true, env = "TENANTNET_PROJECT")]
    project: Option<String>,

    /// リージョン（省略時は設定ファイルの default_region）
    #[arg(short, long, global = true, env = "TENANTNET_REGION")]
    region: Option<String>,

    /// テキストの代わりに JSON で出力
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// プロバイダーからリソースを取得してローカルに反映
    Sync {
        /// リソース種別（省略時は全種別）
        kind: Option<String>,
    },
    /// 指定した種別のリソースを一覧表示
    List {
        /// リソース種別 (vpc, subnets, network-interfaces など)
        kind: String,
    },
    /// プロビジョニングのチェックリストを表示
    Checklist,
    /// 修復アクションを実行
    Dispatch {
        /// エンドポイントのパス (例: /users/42/roles)
        #[arg(short, long)]
        endpoint: String,
        /// HTTP メソッド
        #[arg(short, long, default_value = "POST")]
        method: String,
        /// JSON ボディ
        #[arg(short, long)]
        body: Option<String>,
    },
    /// インターネットゲートウェイ経由の 0.0.0.0/0 ルートを追加
    #[command(name = "default-route")]
    DefaultRoute {
        /// ルートテーブル ID
        route_table: String,
        /// ルートテーブルの VPC にゲートウェイがない場合、リージョン内の
        /// 最初のゲートウェイを使う
        #[arg(long)]
        allow_foreign_gateway: bool,
    },
    /// ネットワークインターフェースにセキュリティグループを付与
    #[command(name = "attach-sg")]
    AttachSg {
        /// ネットワークインターフェース ID
        interface: String,
        /// セキュリティグループ ID
        group: String,
    },
    /// ネットワークインターフェースからセキュリティグループを外す
    #[command(name = "detach-sg")]
    DetachSg {
        /// ネットワークインターフェース ID
        interface: String,
        /// セキュリティグループ ID
        group: String,
    },
    /// エッジネットワークの設定
    #[command(subcommand)]
    Edge(EdgeCommands),
    /// バージョン情報を表示
    Version,
}

#[derive(Subcommand)]
enum EdgeCommands {
    /// プロジェクトとリージョンにエッジネットワークを割り当てる
    Assign {
        /// エッジネットワーク ID
        #[arg(long)]
        network: String,
        /// IP プール ID
        #[arg(long)]
        pool: String,
        /// フローログを有効にする
        #[arg(long)]
        flowlogs: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // --json の出力を汚さないようログは stderr へ
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // version は設定ファイル不要
    if matches!(cli.command, Commands::Version) {
        println!("tenantnet {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let ctx = Context::load(cli.project, cli.region, cli.json)?;

    match cli.command {
        Commands::Sync { kind } => {
            commands::sync::handle(&ctx, kind.as_deref()).await?;
        }
        Commands::List { kind } => {
            commands::list::handle(&ctx, &kind).await?;
        }
        Commands::Checklist => {
            commands::checklist::handle(&ctx).await?;
        }
        Commands::Dispatch {
            endpoint,
            method,
            body,
        } => {
            commands::dispatch::handle(&ctx, &endpoint, &method, body.as_deref()).await?;
        }
        Commands::DefaultRoute {
            route_table,
            allow_foreign_gateway,
        } => {
            commands::route::handle_default_route(&ctx, &route_table, allow_foreign_gateway)
                .await?;
        }
        Commands::AttachSg { interface, group } => {
            commands::security_group::handle_attach(&ctx, &interface, &group).await?;
        }
        Commands::DetachSg { interface, group } => {
            commands::security_group::handle_detach(&ctx, &interface, &group).await?;
        }
        Commands::Edge(EdgeCommands::Assign {
            network,
            pool,
            flowlogs,
        }) => {
            commands::edge::handle_assign(&ctx, network, pool, flowlogs).await?;
        }
        Commands::Version => {
            unreachable!("version は設定読み込み前に処理済み");
        }
    }

    Ok(())
}
