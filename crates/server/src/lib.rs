//! xrag server - HTTP API for X-ray spectrum analysis and retrieval-augmented chat
//!
//! Exposes the spectrum pipeline and the knowledge store over REST, with
//! LLM-written explanations that degrade to fixed texts when no model is
//! reachable.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use server::ServerConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::load()?;
//!     server::start_server(config).await?;
//!     Ok(())
//! }
//! ```
//!
//! # API Endpoints
//!
//! - `GET /` - API information
//! - `GET /health` - Liveness probe
//! - `GET /ready` - Readiness probe, reports the knowledge store state
//! - `GET /metrics` - Prometheus metrics
//! - `POST /api/analyze-spectrum` - Analyse an uploaded CSV (multipart field `file`)
//! - `POST /api/analyze-points` - Analyse `{points: [{energy, intensity}]}`
//! - `POST /api/chat` - Answer `{message, use_rag}` from retrieved context
//! - `POST /api/knowledge/ingest` - Add `{docs, namespace?}` with deduplication
//! - `GET /api/knowledge/search` - `?query=..&k=..&namespace=..`

pub mod config;
pub mod error;
pub mod explain;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use explain::{ExplainError, Explainer, Explanation, OpenAiExplainer};
pub use server::{build_router, start_server};
pub use state::ServerState;
