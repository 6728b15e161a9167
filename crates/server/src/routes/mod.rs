//! API route handlers
//!
//! - `health`: liveness, readiness and Prometheus metrics
//! - `analyze`: spectrum upload and analysis
//! - `chat`: retrieval-augmented question answering
//! - `knowledge`: document ingest and similarity search

pub mod analyze;
pub mod chat;
pub mod health;
pub mod knowledge;

use crate::error::{ServerError, ServerResult};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

/// API version and base info
///
/// Returns server information including version and available endpoints.
pub async fn api_info() -> ServerResult<impl IntoResponse> {
    Ok(Json(json!({
        "name": "X-ray Spectroscopy AI Agent",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "/api/analyze-spectrum",
            "/api/analyze-points",
            "/api/chat",
            "/api/knowledge/ingest",
            "/api/knowledge/search",
            "/health",
            "/ready",
            "/metrics"
        ]
    })))
}

/// 404 Not Found handler
pub async fn not_found() -> ServerError {
    ServerError::NotFound
}
