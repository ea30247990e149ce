//! Provider gateway over the resource-oriented HTTP API
//!
//! Each kind lives under its own collection path, parameterized by
//! `project_id` and `region` query parameters:
//!
//! | Operation    | Request                                   |
//! |--------------|-------------------------------------------|
//! | list         | `GET /{kind}` (`refresh=1` when forced)   |
//! | create       | `POST /{kind}`                            |
//! | delete       | `DELETE /{kind}/{id}`                     |
//! | associate    | `POST /{kind}/{id}/associate`             |
//! | disassociate | `POST /{kind}/{id}/disassociate`          |

use crate::client::{ApiClient, ClientConfig};
use crate::error::HttpError;
use async_trait::async_trait;
use reqwest::{Method as HttpMethod, Url};
use tenantnet_core::provider::{Mutation, Operation, ProviderGateway};
use tenantnet_core::{ActionRequest, Method, NetError, Resource, ResourceKind, Result, Scope};

/// Collection path of a kind
pub fn resource_path(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Vpc => "networks",
        ResourceKind::InternetGateway => "internet-gateways",
        ResourceKind::Subnet => "subnets",
        ResourceKind::RouteTable => "route-tables",
        ResourceKind::RouteTableAssociation => "route-table-associations",
        ResourceKind::Route => "routes",
        ResourceKind::SecurityGroup => "security-groups",
        ResourceKind::NetworkInterface => "network-interfaces",
        ResourceKind::EdgeConfig => "edge-config",
    }
}

pub(crate) fn http_method(method: Method) -> HttpMethod {
    match method {
        Method::Get => HttpMethod::GET,
        Method::Post => HttpMethod::POST,
        Method::Patch => HttpMethod::PATCH,
        Method::Delete => HttpMethod::DELETE,
    }
}

/// Build the URL and verb for a mutation
pub(crate) fn mutation_request(
    api: &ApiClient,
    kind: ResourceKind,
    scope: &Scope,
    mutation: &Mutation,
) -> Result<(HttpMethod, Url)> {
    let path = resource_path(kind);
    let query = scope_query(scope);

    if mutation.operation == Operation::Create {
        return Ok((HttpMethod::POST, api.url(&[path], &query)));
    }

    let id = mutation.id.as_deref().filter(|id| !id.is_empty()).ok_or_else(|| {
        NetError::Validation(format!("{} of {} requires an id", mutation.operation, kind))
    })?;

    let request = match mutation.operation {
        Operation::Delete => (HttpMethod::DELETE, api.url(&[path, id], &query)),
        Operation::Associate => (HttpMethod::POST, api.url(&[path, id, "associate"], &query)),
        Operation::Disassociate => {
            (HttpMethod::POST, api.url(&[path, id, "disassociate"], &query))
        }
        Operation::Create => (HttpMethod::POST, api.url(&[path], &query)),
    };
    Ok(request)
}

/// URL for a remediation call: the endpoint as given, plus `project_id` and
/// the action's `region` when it has one
pub(crate) fn action_url(api: &ApiClient, request: &ActionRequest) -> Url {
    let mut query = vec![("project_id", request.project_id.as_str())];
    if let Some(region) = request.region.as_deref() {
        query.push(("region", region));
    }
    api.endpoint_url(&request.endpoint, &query)
}

fn scope_query(scope: &Scope) -> [(&str, &str); 2] {
    [
        ("project_id", scope.project_id.as_str()),
        ("region", scope.region.as_str()),
    ]
}

/// Decode a listing result: either a bare array or `{"items": [...]}`
pub(crate) fn decode_listing(
    kind: ResourceKind,
    result: serde_json::Value,
) -> Result<Vec<Resource>> {
    let items = match result {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(mut map) => match map.remove("items") {
            Some(serde_json::Value::Array(items)) => items,
            _ => {
                return Err(NetError::Validation(format!(
                    "{} listing is not an array",
                    kind
                )));
            }
        },
        serde_json::Value::Null => Vec::new(),
        other => {
            return Err(NetError::Validation(format!(
                "{} listing is not an array: {}",
                kind, other
            )));
        }
    };

    items
        .into_iter()
        .map(|item| Resource::from_json(kind, item))
        .collect()
}

pub struct HttpProviderGateway {
    api: ApiClient,
}

impl HttpProviderGateway {
    pub fn new(config: ClientConfig) -> std::result::Result<Self, HttpError> {
        Ok(Self {
            api: ApiClient::new(config)?,
        })
    }
}

#[async_trait]
impl ProviderGateway for HttpProviderGateway {
    fn name(&self) -> &str {
        "http"
    }

    async fn list(
        &self,
        kind: ResourceKind,
        scope: &Scope,
        force_refresh: bool,
    ) -> Result<Vec<Resource>> {
        let mut query = scope_query(scope).to_vec();
        if force_refresh {
            query.push(("refresh", "1"));
        }
        let url = self.api.url(&[resource_path(kind)], &query);

        let result = self.api.execute(HttpMethod::GET, url, None).await?;
        let records = decode_listing(kind, result)?;
        tracing::debug!("Listed {} {} records in {}", records.len(), kind, scope);
        Ok(records)
    }

    async fn mutate(
        &self,
        kind: ResourceKind,
        scope: &Scope,
        mutation: &Mutation,
    ) -> Result<Option<Resource>> {
        let (method, url) = mutation_request(&self.api, kind, scope, mutation)?;
        let body = (!mutation.payload.is_null()).then_some(&mutation.payload);

        let result = self.api.execute(method, url, body).await?;
        if !result.is_object() {
            return Ok(None);
        }

        // Association endpoints may echo a different shape; only a record of
        // the requested kind is handed back
        match Resource::from_json(kind, result) {
            Ok(record) => Ok(Some(record)),
            Err(e) if mutation.operation != Operation::Create => {
                tracing::debug!(
                    "Ignoring {} response body for {}: {}",
                    mutation.operation,
                    kind,
                    e
                );
                Ok(None)
            }
            Err(e) => Err(e),
        }
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
