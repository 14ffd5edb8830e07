//! HTTP request handlers for the logpost API.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::Uri;
use axum::Json;
use logpost_core::{Message, MessagePage, MessageStore, QueryParams, Stats, StoredMessage};
use serde::Serialize;
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Status message.
    pub status: &'static str,
    /// Server uptime in seconds.
    pub uptime_secs: u64,
}

/// Handle GET / - liveness text.
pub async fn root() -> &'static str {
    "logpost is running\n"
}

/// Handle GET /version - service version string.
pub async fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Handle GET /health - liveness JSON.
pub async fn health_check<S: MessageStore>(
    State(state): State<Arc<AppState<S>>>,
) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: state.uptime_secs(),
    })
}

/// Handle POST /messages - validate and store one message.
pub async fn post_message<S: MessageStore>(
    State(state): State<Arc<AppState<S>>>,
    body: Bytes,
) -> ApiResult<Json<StoredMessage>> {
    let message: Message = serde_json::from_slice(&body).map_err(|e| {
        debug!(error = %e, "rejected undecodable message body");
        ApiError::InvalidRequest(format!("malformed message body: {e}"))
    })?;

    let stored = state.service().post_message(message).await?;
    Ok(Json(stored))
}

/// Handle GET /messages - paginated, filtered listing.
pub async fn get_messages<S: MessageStore>(
    State(state): State<Arc<AppState<S>>>,
    params: Result<Query<QueryParams>, QueryRejection>,
) -> ApiResult<Json<MessagePage>> {
    let Query(params) = params.map_err(|e| ApiError::InvalidRequest(e.body_text()))?;
    let page = state.service().get_messages(&params).await?;
    Ok(Json(page))
}

/// Handle GET /v1/messages - the same listing as a bare array.
pub async fn get_messages_v1<S: MessageStore>(
    State(state): State<Arc<AppState<S>>>,
    params: Result<Query<QueryParams>, QueryRejection>,
) -> ApiResult<Json<Vec<StoredMessage>>> {
    let Query(params) = params.map_err(|e| ApiError::InvalidRequest(e.body_text()))?;
    let page = state.service().get_messages(&params).await?;
    Ok(Json(page.data))
}

/// Handle GET /admin/stats - process-lifetime counters.
pub async fn get_stats<S: MessageStore>(State(state): State<Arc<AppState<S>>>) -> Json<Stats> {
    Json(state.service().stats())
}

/// Fallback for unknown routes.
pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(uri.path().to_string())
}
