//! HTTP surface for graph builds and metrics.
//!
//! - `POST /api` or `POST /api/graph`: JSON array of handles → graph
//! - `POST /api/metrics`: `{ "graph": ..., "cutoff": ms? }` → metrics summary
//! - `GET /health`

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::error::{FollowGraphError, Result};
use crate::graph::{metrics_at, normalize_handle, Graph, GraphBuilder, MetricsSummary};

/// Body of `POST /api/metrics`
#[derive(Debug, Deserialize)]
pub struct MetricsRequest {
    pub graph: Graph,
    #[serde(default)]
    pub cutoff: Option<i64>,
}

/// State shared by the request handlers
struct AppState {
    builder: GraphBuilder,
    max_nodes: usize,
}

/// HTTP server wrapping a [`GraphBuilder`]
pub struct HttpServer {
    state: Arc<AppState>,
    allowed_origins: Vec<String>,
}

impl HttpServer {
    pub fn new(builder: GraphBuilder, config: &Config) -> Self {
        Self {
            state: Arc::new(AppState {
                builder,
                max_nodes: config.http_server.max_nodes,
            }),
            allowed_origins: config.http_server.allowed_origins.clone(),
        }
    }

    /// Bind and serve until the process stops
    pub async fn run(&self, host: &str, port: u16) -> Result<()> {
        let addr = format!("{}:{}", host, port);
        let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
            FollowGraphError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to bind to {}: {} (set http_server.port in config.toml to use another port)", addr, e),
            ))
        })?;

        log::info!("Serving follow graphs on http://{}", addr);
        log::info!("Graph endpoint: http://{}/api/graph", addr);

        axum::serve(listener, self.router())
            .await
            .map_err(|e| FollowGraphError::Io(std::io::Error::other(format!("HTTP server error: {}", e))))?;

        Ok(())
    }

    /// Create the axum router
    pub fn router(&self) -> Router {
        let cors = if self.allowed_origins.is_empty() {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            let origins: Vec<axum::http::HeaderValue> = self
                .allowed_origins
                .iter()
                .filter_map(|o| o.parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        };

        Router::new()
            .route("/api", post(handle_build))
            .route("/api/graph", post(handle_build))
            .route("/api/metrics", post(handle_metrics))
            .route("/health", get(handle_health))
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(cors),
            )
            .with_state(self.state.clone())
    }
}

fn status_for(err: &FollowGraphError) -> StatusCode {
    match err {
        FollowGraphError::BackendUnreachable(_) => StatusCode::SERVICE_UNAVAILABLE,
        FollowGraphError::DeadlineExceeded(_) => StatusCode::GATEWAY_TIMEOUT,
        FollowGraphError::InvalidInput(_) | FollowGraphError::Json(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for FollowGraphError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

async fn handle_build(
    State(state): State<Arc<AppState>>,
    Json(handles): Json<Vec<String>>,
) -> std::result::Result<Json<Graph>, FollowGraphError> {
    let handles: Vec<String> = handles.iter().filter_map(|h| normalize_handle(h)).collect();
    if handles.is_empty() {
        return Err(FollowGraphError::InvalidInput("expected at least one handle".to_string()));
    }

    log::info!("Building follow graph for {} handles", handles.len());
    match state.builder.build(&handles).await {
        Ok(graph) => Ok(Json(graph)),
        Err(e) => {
            log::error!("Graph build failed: {}", e);
            Err(e)
        }
    }
}

async fn handle_metrics(
    State(state): State<Arc<AppState>>,
    Json(request): Json<MetricsRequest>,
) -> std::result::Result<Json<MetricsSummary>, FollowGraphError> {
    let nodes = request.graph.nodes.len();
    if nodes > state.max_nodes {
        return Err(FollowGraphError::InvalidInput(format!(
            "graph has {} nodes, at most {} allowed",
            nodes, state.max_nodes
        )));
    }
    Ok(Json(metrics_at(&request.graph, request.cutoff)))
}

async fn handle_health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
