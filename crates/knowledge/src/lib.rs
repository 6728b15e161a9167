//! # xrag Knowledge
//!
//! Retrieval store for the chat assistant. Documents are embedded with a
//! [`semantic::EmbeddingProvider`], checked for near-duplicates against what
//! is already stored, and written to an [`index::VectorIndex`] with a random
//! UUID and their text as metadata. Queries return the top-k stored texts with
//! their similarity scores.
//!
//! When no provider can be configured (typically missing API keys) the store
//! is built in a disabled mode: retrieval returns nothing and upserts are
//! ignored, so callers degrade to answering without context.
//!
//! [`SharedStore`] holds one store per process, builds it on first use and
//! loads the bootstrap documents exactly once.
//!
//! ```
//! use std::sync::Arc;
//!
//! use index::InMemoryIndex;
//! use knowledge::{KnowledgeConfig, KnowledgeStore};
//! use semantic::HashingEmbedder;
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let store = KnowledgeStore::new(
//!     Arc::new(HashingEmbedder::new(128)),
//!     Arc::new(InMemoryIndex::new()),
//!     KnowledgeConfig::default(),
//! )
//! .await
//! .unwrap();
//!
//! store.bootstrap().await.unwrap();
//! let hits = store.retrieve("What does EXAFS measure?", 2, "default").await.unwrap();
//! assert_eq!(hits.len(), 2);
//! # });
//! ```

mod config;
mod error;
mod shared;
mod store;

pub use config::{BatchDedup, KnowledgeConfig, BOOTSTRAP_DOCS};
pub use error::KnowledgeError;
pub use shared::{SharedStore, StoreFactory, StoreSettings};
pub use store::{KnowledgeStore, RetrievalMatch, UpsertReport, TEXT_METADATA_KEY};
