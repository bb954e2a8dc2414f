use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use super::{Link, Profile, ProfileProvider, RelationshipProvider, TimeBase};
use crate::error::{FollowGraphError, Result};
use crate::gateway::RequestGateway;
use crate::graph::Identity;

/// `userDataByFid` response
#[derive(Deserialize)]
struct UserDataResponse {
    #[serde(default)]
    messages: Vec<UserDataMessage>,
}

#[derive(Deserialize)]
struct UserDataMessage {
    data: UserDataData,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserDataData {
    user_data_body: Option<UserDataBody>,
}

#[derive(Deserialize)]
struct UserDataBody {
    #[serde(rename = "type")]
    kind: String,
    value: String,
}

/// `linkById` response for an existing link
#[derive(Deserialize)]
struct LinkResponse {
    data: LinkData,
}

#[derive(Deserialize)]
struct LinkData {
    #[serde(rename = "type")]
    kind: Option<String>,
    timestamp: Option<i64>,
}

/// Farcaster hub HTTP API client (profiles, follow links, readiness)
pub struct HubClient {
    gateway: Arc<RequestGateway>,
    base_url: String,
}

impl HubClient {
    pub fn new(gateway: Arc<RequestGateway>, base_url: impl Into<String>) -> Self {
        Self {
            gateway,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str, params: &[(&str, String)]) -> Result<String> {
        url::Url::parse_with_params(&format!("{}{}", self.base_url, path), params)
            .map(String::from)
            .map_err(|e| FollowGraphError::Config(format!("Invalid hub URL {}: {}", self.base_url, e)))
    }
}

/// Hub error bodies carry an `errCode`, whatever the HTTP status
fn has_err_code(body: &Value) -> bool {
    body.get("errCode").is_some_and(|code| !code.is_null())
}

fn fold_profile(messages: Vec<UserDataMessage>) -> Profile {
    let mut profile = Profile::default();
    for body in messages.into_iter().filter_map(|m| m.data.user_data_body) {
        let slot = match body.kind.as_str() {
            "USER_DATA_TYPE_USERNAME" => &mut profile.username,
            "USER_DATA_TYPE_DISPLAY" => &mut profile.display_name,
            "USER_DATA_TYPE_PFP" => &mut profile.pfp_url,
            "USER_DATA_TYPE_BIO" => &mut profile.bio,
            _ => continue,
        };
        *slot = Some(body.value);
    }
    profile
}

#[async_trait]
impl ProfileProvider for HubClient {
    async fn fetch_profile(&self, identity: Identity) -> Result<Option<Profile>> {
        let url = self.url("/v1/userDataByFid", &[("fid", identity.to_string())])?;

        let value = match self.gateway.get_json(&url).await {
            Ok(value) if has_err_code(&value) => return Ok(None),
            Ok(value) => value,
            Err(FollowGraphError::Rejected { body: Some(body), .. }) if has_err_code(&body) => {
                return Ok(None)
            }
            Err(e) => return Err(e),
        };

        let response: UserDataResponse = serde_json::from_value(value)
            .map_err(|e| FollowGraphError::Decode(format!("Unexpected user data for {}: {}", identity, e)))?;

        if response.messages.is_empty() {
            return Ok(None);
        }
        Ok(Some(fold_profile(response.messages)))
    }
}

#[async_trait]
impl RelationshipProvider for HubClient {
    async fn probe(&self, source: Identity, target: Identity) -> Result<Option<Link>> {
        let url = self.url(
            "/v1/linkById",
            &[
                ("link_type", "follow".to_string()),
                ("fid", source.to_string()),
                ("target_fid", target.to_string()),
            ],
        )?;

        let value = match self.gateway.get_json(&url).await {
            Ok(value) if has_err_code(&value) => return Ok(None),
            Ok(value) => value,
            Err(FollowGraphError::Rejected { body: Some(body), .. }) if has_err_code(&body) => {
                return Ok(None)
            }
            Err(e) => return Err(e),
        };

        let response: LinkResponse = serde_json::from_value(value)
            .map_err(|e| FollowGraphError::Decode(format!("Unexpected link for {}→{}: {}", source, target, e)))?;

        if response
            .data
            .kind
            .as_deref()
            .is_some_and(|kind| kind != "MESSAGE_TYPE_LINK_ADD")
        {
            return Ok(None);
        }

        let timestamp = response.data.timestamp.ok_or_else(|| {
            FollowGraphError::Decode(format!("Link {}→{} has no timestamp", source, target))
        })?;
        Ok(Some(Link { timestamp }))
    }

    fn time_base(&self) -> TimeBase {
        TimeBase::FARCASTER
    }

    async fn check_ready(&self, deadline: Duration) -> Result<()> {
        let url = format!("{}/v1/info", self.base_url);
        self.gateway.ping(&url, deadline).await
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

    async fn user_data(Query(params): Query<HashMap<String, String>>) -> Response {
        match params.get("fid").map(String::as_str) {
            Some("3") => Json(json!({
                "messages": [
                    { "data": { "fid": 3, "userDataBody": { "type": "USER_DATA_TYPE_PFP", "value": "https://i.example/3.png" } } },
                    { "data": { "fid": 3, "userDataBody": { "type": "USER_DATA_TYPE_DISPLAY", "value": "Dan Romero" } } },
                    { "data": { "fid": 3, "userDataBody": { "type": "USER_DATA_TYPE_BIO", "value": "Working on Farcaster" } } },
                    { "data": { "fid": 3, "userDataBody": { "type": "USER_DATA_TYPE_USERNAME", "value": "dwr.eth" } } },
                    { "data": { "fid": 3, "userDataBody": { "type": "USER_DATA_TYPE_URL", "value": "https://x.example" } } }
                ],
                "nextPageToken": ""
            }))
            .into_response(),
            Some("5") => Json(json!({ "messages": [] })).into_response(),
            _ => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "errCode": "bad_request.validation_failure", "presentable": false })),
            )
                .into_response(),
        }
    }

    async fn link(Query(params): Query<HashMap<String, String>>) -> Response {
        let fid = params.get("fid").map(String::as_str);
        let target = params.get("target_fid").map(String::as_str);
        match (fid, target) {
            (Some("3"), Some("2")) => Json(json!({
                "data": {
                    "type": "MESSAGE_TYPE_LINK_ADD",
                    "fid": 3,
                    "timestamp": 116247523,
                    "linkBody": { "type": "follow", "targetFid": 2 }
                },
                "hash": "0xabc"
            }))
            .into_response(),
            (Some("3"), Some("4")) => Json(json!({ "data": { "type": "MESSAGE_TYPE_LINK_ADD" } })).into_response(),
            (Some("2"), Some("3")) => Json(json!({ "errCode": "not_found" })).into_response(),
            _ => (StatusCode::NOT_FOUND, Json(json!({ "errCode": "not_found" }))).into_response(),
        }
    }

    async fn hub() -> HubClient {
        let app = Router::new()
            .route("/v1/userDataByFid", get(user_data))
            .route("/v1/linkById", get(link))
            .route("/v1/info", get(|| async { Json(json!({ "version": "1.0" })) }));
        let base = spawn_server(app).await;
        HubClient::new(Arc::new(fast_gateway(0, false)), base)
    }

    #[tokio::test]
    async fn test_fetch_profile_folds_user_data() {
        let hub = hub().await;
        let profile = hub.fetch_profile(Identity(3)).await.unwrap().unwrap();
        assert_eq!(profile.username.as_deref(), Some("dwr.eth"));
        assert_eq!(profile.display_name.as_deref(), Some("Dan Romero"));
        assert_eq!(profile.pfp_url.as_deref(), Some("https://i.example/3.png"));
        assert_eq!(profile.bio.as_deref(), Some("Working on Farcaster"));
    }

    #[tokio::test]
    async fn test_fetch_profile_not_found() {
        let hub = hub().await;
        assert_eq!(hub.fetch_profile(Identity(5)).await.unwrap(), None);
        assert_eq!(hub.fetch_profile(Identity(999)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_probe_existing_link() {
        let hub = hub().await;
        let link = hub.probe(Identity(3), Identity(2)).await.unwrap();
        assert_eq!(link, Some(Link { timestamp: 116247523 }));
    }

    #[tokio::test]
    async fn test_probe_error_code_means_no_link() {
        let hub = hub().await;
        // errCode in a 200 body
        assert_eq!(hub.probe(Identity(2), Identity(3)).await.unwrap(), None);
        // errCode in a 404 body
        assert_eq!(hub.probe(Identity(7), Identity(8)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_probe_link_without_timestamp_is_an_error() {
        let hub = hub().await;
        let err = hub.probe(Identity(3), Identity(4)).await.unwrap_err();
        assert!(matches!(err, FollowGraphError::Decode(_)));
    }

    #[tokio::test]
    async fn test_check_ready() {
        let hub = hub().await;
        assert!(hub.check_ready(Duration::from_secs(5)).await.is_ok());
        assert_eq!(hub.time_base(), TimeBase::FARCASTER);
    }

    #[tokio::test]
    async fn test_check_ready_unreachable() {
        // Bind then drop to get a port nobody listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let hub = HubClient::new(Arc::new(fast_gateway(0, false)), format!("http://{}", addr));
        assert!(hub.check_ready(Duration::from_secs(2)).await.is_err());
    }
}
