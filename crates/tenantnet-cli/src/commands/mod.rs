pub mod checklist;
pub mod dispatch;
pub mod edge;
pub mod list;
pub mod route;
pub mod security_group;
pub mod sync;

use anyhow::Context as _;
use colored::Colorize;
use std::sync::Arc;
use tenantnet_core::{NetworkService, ProjectContext, ResourceKind, Scope};
use tenantnet_http::{ClientConfig, HttpAccountGateway, HttpProviderGateway};

/// コマンド共通のコンテキスト（サービスと対象スコープ）
pub struct Context {
    pub service: NetworkService,
    pub project: ProjectContext,
    pub scope: Scope,
    pub json: bool,
}

impl Context {
    pub fn load(
        project: Option<String>,
        region: Option<String>,
        json: bool,
    ) -> anyhow::Result<Self> {
        let (path, settings) = tenantnet_config::load()?;
        tracing::debug!("設定ファイル: {}", path.display());

        let project_id = project.ok_or_else(|| {
            anyhow::anyhow!("プロジェクトが指定されていません。--project か TENANTNET_PROJECT で指定してください")
        })?;
        let region = region.unwrap_or_else(|| settings.default_region.clone());

        let provider = HttpProviderGateway::new(api_config(&settings.provider_api, &settings))
            .context("provider_api の設定が不正です")?;
        let accounts = HttpAccountGateway::new(api_config(&settings.account_api, &settings))
            .context("account_api の設定が不正です")?;

        let service = NetworkService::new(Arc::new(provider), Arc::new(accounts))
            .with_timeout(settings.timeout());

        Ok(Self {
            service,
            scope: Scope::new(project_id.clone(), region.clone())?,
            project: ProjectContext::new(project_id, region),
            json,
        })
    }

    /// 指定した種別を同期する（最初のエラーで中断）
    pub async fn sync_kinds(&self, kinds: &[ResourceKind]) -> anyhow::Result<()> {
        for kind in kinds {
            self.service
                .sync_resources(*kind, &self.scope)
                .await
                .with_context(|| format!("{} の同期に失敗しました", kind))?;
        }
        Ok(())
    }

    pub fn print_scope(&self) {
        if !self.json {
            println!("スコープ: {}", self.scope.to_string().cyan());
        }
    }
}

fn api_config(
    api: &tenantnet_config::ApiSettings,
    settings: &tenantnet_config::Settings,
) -> ClientConfig {
    let config = ClientConfig::new(api.url.clone()).with_timeout(settings.timeout());
    match &api.token {
        Some(token) => config.with_token(token.clone()),
        None => config,
    }
}
