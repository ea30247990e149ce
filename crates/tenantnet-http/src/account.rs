//! Account-management gateway over HTTP

use crate::client::{ApiClient, ClientConfig};
use crate::error::HttpError;
use crate::provider::{action_url, http_method};
use async_trait::async_trait;
use reqwest::Method as HttpMethod;
use tenantnet_core::provider::AccountGateway;
use tenantnet_core::{AccountSignals, ActionRequest, Result};

/// Talks to the account system: users, roles and the provider account link.
///
/// Signals are read from `GET /accounts/{project_id}/signals`; remediation
/// calls arrive with their endpoints already built.
pub struct HttpAccountGateway {
    api: ApiClient,
}

impl HttpAccountGateway {
    pub fn new(config: ClientConfig) -> std::result::Result<Self, HttpError> {
        Ok(Self {
            api: ApiClient::new(config)?,
        })
    }

    fn signals_url(&self, project_id: &str) -> reqwest::Url {
        self.api.url(&["accounts", project_id, "signals"], &[])
    }
}

#[async_trait]
impl AccountGateway for HttpAccountGateway {
    async fn fetch_signals(&self, project_id: &str) -> Result<AccountSignals> {
        let result = self
            .api
            .execute(HttpMethod::GET, self.signals_url(project_id), None)
            .await?;

        if result.is_null() {
            return Ok(AccountSignals::new());
        }
        Ok(serde_json::from_value(result)?)
    }

    async fn send(&self, request: &ActionRequest) -> Result<serde_json::Value> {
        let url = action_url(&self.api, request);
        let result = self
            .api
            .execute(http_method(request.method), url, request.body.as_ref())
            .await?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signals_url_encodes_project() {
        let gateway =
            HttpAccountGateway::new(ClientConfig::new("https://accounts.example.com/v2")).unwrap();
        assert_eq!(
            gateway.signals_url("team a").as_str(),
            "https://accounts.example.com/v2/accounts/team%20a/signals"
        );
    }

    #[test]
    fn test_signals_payload_decodes_partial_data() {
        let signals: AccountSignals = serde_json::from_value(serde_json::json!({
            "users": [{"id": "u1", "name": "alice", "tenant_admin": true}]
        }))
        .unwrap();
        assert!(signals.provider_account.is_none());
        assert_eq!(signals.users.unwrap().len(), 1);
    }
}
