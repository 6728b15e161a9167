use index::IndexError;
use semantic::SemanticError;
use thiserror::Error;

/// Errors surfaced by [`KnowledgeStore`](crate::KnowledgeStore) operations.
///
/// Per-document failures during the dedup check are not errors; they are
/// logged and counted in [`UpsertReport::failed`](crate::UpsertReport::failed).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum KnowledgeError {
    #[error("embedding failed: {0}")]
    Embedding(#[from] SemanticError),

    #[error("vector index failed: {0}")]
    Index(#[from] IndexError),

    #[error("provider returned {got} embeddings for {expected} texts")]
    EmbeddingCountMismatch { expected: usize, got: usize },

    #[error("invalid knowledge config: {0}")]
    InvalidConfig(String),
}
