use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use std::sync::{Arc, OnceLock};
use std::time::SystemTime;

/// Global server start time for uptime calculation
static SERVER_START_TIME: OnceLock<SystemTime> = OnceLock::new();

fn uptime_seconds() -> u64 {
    SERVER_START_TIME
        .get_or_init(SystemTime::now)
        .elapsed()
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Health check endpoint (liveness)
/// Returns 200 if server is running
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "xrag-server",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": uptime_seconds(),
    }))
}

/// Readiness check endpoint
///
/// Always 200 once the store has been built: a disabled knowledge store still
/// serves analysis and chat, so it is reported rather than failed.
pub async fn readiness_check(
    State(state): State<Arc<ServerState>>,
) -> ServerResult<impl IntoResponse> {
    let store = state.store.get().await;
    let knowledge = match store.disabled_reason() {
        None => json!({ "status": "ready", "index": store.config().index_name }),
        Some(reason) => json!({ "status": "disabled", "reason": reason }),
    };
    let llm = if state.explainer.is_some() { "ready" } else { "fallback" };

    Ok(Json(json!({
        "status": "ready",
        "service": "xrag-server",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": uptime_seconds(),
        "components": {
            "api": "ready",
            "knowledge": knowledge,
            "llm": llm,
        }
    })))
}

/// Prometheus metrics endpoint
pub async fn metrics(State(state): State<Arc<ServerState>>) -> ServerResult<impl IntoResponse> {
    let handle = state.metrics.as_ref().ok_or(ServerError::NotFound)?;
    Ok((
        [(CONTENT_TYPE, "text/plain; version=0.0.4")],
        handle.render(),
    ))
}
