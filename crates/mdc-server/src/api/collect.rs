//! Request-triggered collection: pull one JSON payload from a configured
//! upstream, store it, forward it to the raw-data queue.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header::AUTHORIZATION, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tokio::time::Instant;

use super::{AppState, CollectResponse};
use crate::middleware::RequestId;
use crate::sink::RawDataSink;

/// Upstream location and credential set through `/collect-config`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub source_url: String,
    #[serde(default)]
    pub api_key: String,
}

/// Every way a `/collect*` request can fail, with its wire code.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("Invalid request body")]
    InvalidBody,
    #[error("Missing source_url or api_key")]
    MissingFields,
    #[error("Data source not configured. Call /collect-config first")]
    NotConfigured,
    #[error("Failed to create request")]
    BuildRequest,
    #[error("Failed to connect to data source")]
    Connect,
    #[error("Data source returned an error: {0}")]
    UpstreamStatus(reqwest::StatusCode),
    #[error("Failed to read data from source")]
    ReadBody,
    #[error("Failed to parse data from source")]
    ParseBody,
    #[error("Failed to save data to database")]
    Save,
    #[error("Failed to publish data to queue")]
    Publish,
}

impl CollectError {
    #[must_use]
    pub fn code(&self) -> u16 {
        match self {
            CollectError::InvalidBody => 1000,
            CollectError::MissingFields => 1001,
            CollectError::NotConfigured => 1002,
            CollectError::BuildRequest => 1003,
            CollectError::Connect => 1004,
            CollectError::UpstreamStatus(_) => 1005,
            CollectError::ReadBody => 1006,
            CollectError::ParseBody => 1007,
            CollectError::Save => 1008,
            CollectError::Publish => 1009,
        }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            CollectError::InvalidBody
            | CollectError::MissingFields
            | CollectError::NotConfigured => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for CollectError {
    fn into_response(self) -> Response {
        let body = CollectResponse::error(self.code(), self.to_string());
        (self.status(), Json(body)).into_response()
    }
}

/// `POST /collect-config`
pub(super) async fn collect_config<K: RawDataSink>(
    State(state): State<AppState<K>>,
    Extension(req_id): Extension<RequestId>,
    payload: Result<Json<SourceConfig>, JsonRejection>,
) -> Result<Json<CollectResponse>, CollectError> {
    let Json(config) = payload.map_err(|e| {
        tracing::warn!(request_id = %req_id.0, error = %e, "invalid collect-config body");
        CollectError::InvalidBody
    })?;

    if config.source_url.is_empty() || config.api_key.is_empty() {
        tracing::warn!(request_id = %req_id.0, "collect-config missing source_url or api_key");
        return Err(CollectError::MissingFields);
    }

    tracing::info!(request_id = %req_id.0, source_url = %config.source_url, "source config updated");
    *state.source.write().await = Some(config);

    Ok(Json(CollectResponse::success()))
}

/// `POST /collect`
pub(super) async fn collect<K: RawDataSink>(
    State(state): State<AppState<K>>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<CollectResponse>, CollectError> {
    let Some(config) = state.source.read().await.clone() else {
        tracing::warn!(request_id = %req_id.0, "collect called before collect-config");
        return Err(CollectError::NotConfigured);
    };

    let data = fetch_source(&state.http, &config, &req_id).await?;

    // One budget covers both the insert and the publish.
    let deadline = Instant::now() + state.persist_timeout;

    let id = match tokio::time::timeout_at(deadline, state.sink.save(&data)).await {
        Ok(Ok(id)) => id,
        Ok(Err(e)) => {
            tracing::error!(request_id = %req_id.0, error = %e, "failed to save raw data");
            return Err(CollectError::Save);
        }
        Err(_) => {
            tracing::error!(request_id = %req_id.0, "timed out saving raw data");
            return Err(CollectError::Save);
        }
    };
    tracing::info!(request_id = %req_id.0, id, "raw data saved");

    match tokio::time::timeout_at(deadline, state.sink.publish(&data)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            tracing::error!(request_id = %req_id.0, id, error = %e, "failed to publish raw data");
            return Err(CollectError::Publish);
        }
        Err(_) => {
            tracing::error!(request_id = %req_id.0, id, "timed out publishing raw data");
            return Err(CollectError::Publish);
        }
    }
    tracing::info!(request_id = %req_id.0, id, "raw data published");

    Ok(Json(CollectResponse::success()))
}

/// Issues the upstream GET and returns its body as JSON.
async fn fetch_source(
    http: &reqwest::Client,
    config: &SourceConfig,
    req_id: &RequestId,
) -> Result<Value, CollectError> {
    let url = reqwest::Url::parse(&config.source_url).map_err(|e| {
        tracing::error!(request_id = %req_id.0, error = %e, "invalid source url");
        CollectError::BuildRequest
    })?;
    let auth = HeaderValue::from_str(&config.api_key).map_err(|e| {
        tracing::error!(request_id = %req_id.0, error = %e, "api key is not a valid header value");
        CollectError::BuildRequest
    })?;

    tracing::info!(request_id = %req_id.0, %url, "requesting data source");
    let response = http
        .get(url)
        .header(AUTHORIZATION, auth)
        .send()
        .await
        .map_err(|e| {
            tracing::error!(request_id = %req_id.0, error = %e, "data source request failed");
            if e.is_builder() {
                CollectError::BuildRequest
            } else {
                CollectError::Connect
            }
        })?;

    let status = response.status();
    if status != reqwest::StatusCode::OK {
        tracing::error!(request_id = %req_id.0, %status, "data source returned an error");
        return Err(CollectError::UpstreamStatus(status));
    }

    let body = response.bytes().await.map_err(|e| {
        tracing::error!(request_id = %req_id.0, error = %e, "failed to read data source body");
        CollectError::ReadBody
    })?;

    serde_json::from_slice::<Value>(&body).map_err(|e| {
        tracing::error!(request_id = %req_id.0, error = %e, "data source body is not JSON");
        CollectError::ParseBody
    })
}

#[cfg(test)]
#[path = "collect_test.rs"]
mod tests;
