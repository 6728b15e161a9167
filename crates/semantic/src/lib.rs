//! xrag semantic embeddings
//!
//! Turns short texts into dense vectors for similarity search. Two providers
//! ship with the crate:
//!
//! - **API mode** ([`ApiEmbedder`]) - POSTs batches to an OpenAI-compatible
//!   embeddings endpoint (Hugging Face and bare `{"texts": [...]}` endpoints
//!   work too). Needs an API key.
//! - **Fast mode** ([`HashingEmbedder`]) - feature hashing over tokens. No
//!   network, no model files, fully deterministic. Good enough to make
//!   retrieval behave sensibly in tests and offline demos.
//!
//! Both sit behind the [`EmbeddingProvider`] trait so callers can swap them
//! (or plug their own) without caring which one they got.
//!
//! Nothing here retries. A failed request goes straight back to the caller,
//! who decides whether that document is skipped or the whole operation fails.
//!
//! ## Quick example
//!
//! ```
//! use semantic::{build_provider, SemanticConfig};
//!
//! let provider = build_provider(&SemanticConfig::fast(64)).unwrap();
//! assert_eq!(provider.dimension(), 64);
//! ```
//!
//! ## Env vars to know
//!
//! None are read here. Configuration arrives through [`SemanticConfig`]; the
//! server maps `OPENAI_API_KEY` and `EMBEDDING_MODEL` onto it.

mod api;
mod config;
mod error;
mod normalize;
mod provider;
mod stub;

pub use api::ApiEmbedder;
pub use config::{SemanticConfig, DEFAULT_OPENAI_EMBEDDINGS_URL};
pub use error::SemanticError;
pub use normalize::l2_normalize_in_place;
pub use provider::{build_provider, EmbeddingProvider};
pub use stub::HashingEmbedder;
