use thiserror::Error;

/// Errors surfaced by embedding providers.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SemanticError {
    /// Configuration is inconsistent (unknown mode, zero dimension, ...).
    #[error("invalid semantic config: {0}")]
    InvalidConfig(String),
    /// The provider cannot be used at all, typically because no credentials
    /// were configured. Retrying will not help.
    #[error("embedding provider unavailable: {0}")]
    Unavailable(String),
    /// Transport-level or non-2xx HTTP failures.
    #[error("embedding request failed: {0}")]
    Http(String),
    /// The provider answered but the payload was unusable.
    #[error("inference failure: {0}")]
    Inference(String),
    #[error("expected {expected}-dimensional embeddings, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

impl SemanticError {
    /// `true` for failures that mean "this provider will never work with the
    /// current configuration".
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            SemanticError::InvalidConfig(_) | SemanticError::Unavailable(_)
        )
    }
}
