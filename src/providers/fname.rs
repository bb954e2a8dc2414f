use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use super::HandleResolver;
use crate::error::{FollowGraphError, Result};
use crate::gateway::RequestGateway;
use crate::graph::Identity;

#[derive(Deserialize)]
struct CurrentTransferResponse {
    transfer: Option<Transfer>,
}

#[derive(Deserialize)]
struct Transfer {
    to: Option<u64>,
}

/// Farcaster name registry client
///
/// Resolves a username through its current transfer record
/// (`/transfers/current?name=`); the transfer's `to` field is the owning FID.
pub struct FnameRegistry {
    gateway: Arc<RequestGateway>,
    base_url: String,
}

impl FnameRegistry {
    pub fn new(gateway: Arc<RequestGateway>, base_url: impl Into<String>) -> Self {
        Self {
            gateway,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn transfer_url(&self, handle: &str) -> Result<String> {
        url::Url::parse_with_params(
            &format!("{}/transfers/current", self.base_url),
            &[("name", handle)],
        )
        .map(String::from)
        .map_err(|e| FollowGraphError::Config(format!("Invalid registry URL {}: {}", self.base_url, e)))
    }
}

#[async_trait]
impl HandleResolver for FnameRegistry {
    async fn resolve(&self, handle: &str) -> Result<Option<Identity>> {
        let url = self.transfer_url(handle)?;

        let value = match self.gateway.get_json(&url).await {
            Ok(value) => value,
            // Unknown names come back as 404
            Err(FollowGraphError::Rejected { status: 404, .. }) => return Ok(None),
            Err(e) => return Err(e),
        };

        let response: CurrentTransferResponse = serde_json::from_value(value)
            .map_err(|e| FollowGraphError::Decode(format!("Unexpected registry response for {}: {}", handle, e)))?;

        Ok(response
            .transfer
            .and_then(|t| t.to)
            .filter(|&fid| fid != 0)
            .map(Identity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::tests::{fast_gateway, spawn_server};
    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Response};
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;
    use std::collections::HashMap;

    async fn current(Query(params): Query<HashMap<String, String>>) -> Response {
        match params.get("name").map(String::as_str) {
            Some("dwr.eth") => Json(json!({ "transfer": { "id": 1, "username": "dwr.eth", "to": 3 } })).into_response(),
            Some("released") => Json(json!({ "transfer": { "to": 0 } })).into_response(),
            Some("empty") => Json(json!({})).into_response(),
            _ => (StatusCode::NOT_FOUND, Json(json!({ "code": "NOT_FOUND" }))).into_response(),
        }
    }

    async fn registry() -> FnameRegistry {
        let base = spawn_server(Router::new().route("/transfers/current", get(current))).await;
        FnameRegistry::new(Arc::new(fast_gateway(0, false)), format!("{}/", base))
    }

    #[tokio::test]
    async fn test_resolve_known_handle() {
        let registry = registry().await;
        assert_eq!(registry.resolve("dwr.eth").await.unwrap(), Some(Identity(3)));
    }

    #[tokio::test]
    async fn test_resolve_missing_bindings() {
        let registry = registry().await;
        assert_eq!(registry.resolve("ghostUser").await.unwrap(), None);
        assert_eq!(registry.resolve("released").await.unwrap(), None);
        assert_eq!(registry.resolve("empty").await.unwrap(), None);
    }

    #[test]
    fn test_transfer_url_encodes_handle() {
        let registry = FnameRegistry::new(Arc::new(fast_gateway(0, false)), "https://fnames.example");
        let url = registry.transfer_url("a b&c").unwrap();
        assert_eq!(url, "https://fnames.example/transfers/current?name=a+b%26c");
    }
}
