//! HTTP gateway.
//!
//! `POST /:tv/:method` with a JSON body forwards the payload to the
//! named TV's resolved command target. The gateway owns no connection
//! state; it only looks up managers in the registry.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::trace::TraceLayer;
use tracing::warn;

use tvlink_connection::ConnectionError;
use tvlink_protocol::uris;

use crate::registry::Registry;

pub fn router(registry: Arc<Registry>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/:tv/:method", post(forward))
        .with_state(registry)
        .layer(TraceLayer::new_for_http())
}

async fn health() -> &'static str {
    "ok"
}

async fn forward(
    Path((tv, method)): Path<(String, String)>,
    State(registry): State<Arc<Registry>>,
    Json(payload): Json<serde_json::Value>,
) -> impl IntoResponse {
    dispatch(&registry, &tv, &method, payload).await
}

/// Resolves the TV and method and forwards the command.
pub(crate) async fn dispatch(
    registry: &Registry,
    tv: &str,
    method: &str,
    payload: serde_json::Value,
) -> (StatusCode, String) {
    let Some(manager) = registry.get(tv) else {
        return (StatusCode::NOT_FOUND, format!("no TV named {tv}"));
    };
    let Some(target) = uris::resolve(method) else {
        return (StatusCode::NOT_FOUND, format!("no method named {method}"));
    };

    match manager.send_request(target, &payload).await {
        Ok(()) => (StatusCode::OK, format!("sent {method} to {tv}")),
        Err(ConnectionError::NotPaired) => {
            warn!(tv = %tv, "request while not paired");
            (StatusCode::CONFLICT, format!("TV {tv} not paired"))
        }
        Err(e) => {
            warn!(tv = %tv, method = %method, error = %e, "forward failed");
            (StatusCode::BAD_GATEWAY, format!("send failed: {e}"))
        }
    }
}
