use std::sync::Arc;

use async_trait::async_trait;

use crate::{ApiEmbedder, HashingEmbedder, SemanticConfig, SemanticError};

/// Turns text into fixed-length vectors.
///
/// Implementations must return exactly one vector per input text, in input
/// order, each of length [`dimension`](Self::dimension).
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    fn model_name(&self) -> &str;

    fn dimension(&self) -> usize;

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, SemanticError>;
}

/// Build the provider selected by `cfg.mode`.
///
/// Returns [`SemanticError::Unavailable`] when API mode has no credentials.
pub fn build_provider(cfg: &SemanticConfig) -> Result<Arc<dyn EmbeddingProvider>, SemanticError> {
    cfg.validate()?;
    match cfg.mode.as_str() {
        "fast" => Ok(Arc::new(HashingEmbedder::from_config(cfg))),
        _ => Ok(Arc::new(ApiEmbedder::new(cfg)?)),
    }
}
