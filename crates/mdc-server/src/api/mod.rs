mod collect;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{request_id, REQUEST_ID_HEADER};
use crate::sink::RawDataSink;

pub use collect::SourceConfig;

/// Shared handler state.
///
/// `source` is the only mutable piece; `/collect` clones it once at the
/// start of each request and never reads it again.
pub struct AppState<K> {
    pub sink: Arc<K>,
    pub http: reqwest::Client,
    pub source: Arc<RwLock<Option<SourceConfig>>>,
    pub persist_timeout: Duration,
}

impl<K> Clone for AppState<K> {
    fn clone(&self) -> Self {
        Self {
            sink: Arc::clone(&self.sink),
            http: self.http.clone(),
            source: Arc::clone(&self.source),
            persist_timeout: self.persist_timeout,
        }
    }
}

impl<K: RawDataSink> AppState<K> {
    pub fn new(sink: Arc<K>, http: reqwest::Client, persist_timeout: Duration) -> Self {
        Self {
            sink,
            http,
            source: Arc::new(RwLock::new(None)),
            persist_timeout,
        }
    }
}

/// Body of every `/collect*` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectResponse {
    pub status: String,
    pub error_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CollectResponse {
    #[must_use]
    pub fn success() -> Self {
        Self {
            status: "success".to_string(),
            error_code: 0,
            error: None,
        }
    }

    #[must_use]
    pub fn error(code: u16, message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            error_code: code,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(REQUEST_ID_HEADER),
        ])
}

pub fn build_app<K: RawDataSink>(state: AppState<K>) -> Router {
    Router::new()
        .route("/health", get(health::<K>))
        .route("/collect-config", post(collect::collect_config::<K>))
        .route("/collect", post(collect::collect::<K>))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health<K: RawDataSink>(State(state): State<AppState<K>>) -> impl IntoResponse {
    match state.sink.health().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthData {
                status: "ok",
                database: "ok",
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthData {
                    status: "degraded",
                    database: "unavailable",
                }),
            )
        }
    }
}
