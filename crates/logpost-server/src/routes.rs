//! Route configuration for the logpost API.

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::routing::{get, Router};
use logpost_core::MessageStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::handlers::{
    get_messages, get_messages_v1, get_stats, health_check, not_found, post_message, root,
    version,
};
use crate::state::AppState;

/// Create the logpost API router.
pub fn create_router<S: MessageStore>(state: Arc<AppState<S>>) -> Router {
    let cors = build_cors_layer(state.config());

    Router::new()
        .route("/", get(root))
        .route("/version", get(version))
        .route("/health", get(health_check::<S>))
        .route("/messages", get(get_messages::<S>).post(post_message::<S>))
        .route("/v1/messages", get(get_messages_v1::<S>))
        .route("/admin/stats", get(get_stats::<S>))
        .fallback(not_found)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if config.cors_origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        layer.allow_origin(origins)
    }
}
