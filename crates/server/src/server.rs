//! Server initialization and routing
//!
//! Router configuration, the middleware stack and graceful shutdown.

use crate::config::ServerConfig;
use crate::middleware::{log_requests, request_id};
use crate::routes::{analyze, chat, health, knowledge};
use crate::routes::{api_info, not_found};
use crate::state::ServerState;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Build the Axum router with all routes and middleware
///
/// Middleware runs outermost first: request id, request logging, tracing,
/// CORS, compression, then the request timeout.
pub fn build_router(state: Arc<ServerState>) -> Router {
    let cors = if state.config.enable_cors {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
    };

    let service_routes = Router::new()
        .route("/", get(api_info))
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/metrics", get(health::metrics));

    let api_routes = Router::new()
        .route("/api/analyze-spectrum", post(analyze::analyze_spectrum))
        .route("/api/analyze-points", post(analyze::analyze_points))
        .route("/api/chat", post(chat::chat_message))
        .route("/api/knowledge/ingest", post(knowledge::ingest_documents))
        .route("/api/knowledge/search", get(knowledge::search_knowledge))
        .layer(DefaultBodyLimit::max(state.config.max_body_size()));

    Router::new()
        .merge(service_routes)
        .merge(api_routes)
        .fallback(not_found)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            state.config.timeout(),
        ))
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(from_fn(log_requests))
        .layer(from_fn(request_id))
        .with_state(state)
}

/// Start the HTTP server
///
/// Initializes JSON logging and the Prometheus recorder, then serves until
/// SIGTERM or Ctrl+C.
///
/// ```rust,no_run
/// use server::ServerConfig;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let config = ServerConfig::load()?;
///     server::start_server(config).await?;
///     Ok(())
/// }
/// ```
pub async fn start_server(config: ServerConfig) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(&config.log_level)
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .json()
        .init();

    let mut state = ServerState::new(config.clone());
    if config.metrics_enabled {
        let handle = PrometheusBuilder::new().install_recorder()?;
        state = state.with_metrics(handle);
    }
    let state = Arc::new(state);

    // Connect and bootstrap the knowledge store before taking traffic
    let store = state.store.get().await;
    match store.disabled_reason() {
        Some(reason) => tracing::warn!(%reason, "serving without retrieval"),
        None => tracing::info!(index = %store.config().index_name, "knowledge store ready"),
    }

    let app = build_router(state);
    let addr: SocketAddr = config.socket_addr()?;

    tracing::info!(%addr, "Starting xrag server");
    tracing::info!(
        "Timeout: {}s, Max body: {}MB",
        config.timeout_secs,
        config.max_body_size_mb
    );
    tracing::info!(
        "CORS: {}, Metrics: {}, Model: {}",
        config.enable_cors,
        config.metrics_enabled,
        config.openai_model
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Shutdown signal handler
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
