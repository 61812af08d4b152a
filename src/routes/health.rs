//! Liveness and readiness

use hyper::StatusCode;
use serde::Serialize;

use super::response::{json_response, HttpResponse};
use crate::server::AppState;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    store: Option<&'static str>,
}

/// `GET /health`: the process is up
pub fn live() -> HttpResponse {
    json_response(
        StatusCode::OK,
        &HealthResponse {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
            store: None,
        },
    )
}

/// `GET /ready`: the store answers a ping
pub async fn ready(state: &AppState) -> HttpResponse {
    let (status, store) = match state.store.ping().await {
        Ok(()) => (StatusCode::OK, "ok"),
        Err(e) => {
            tracing::warn!("Readiness check failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
        }
    };

    json_response(
        status,
        &HealthResponse {
            status: if status.is_success() { "ok" } else { "degraded" },
            version: env!("CARGO_PKG_VERSION"),
            store: Some(store),
        },
    )
}
