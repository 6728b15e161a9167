use serde::{Deserialize, Serialize};

use crate::SemanticError;

pub const DEFAULT_OPENAI_EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";

/// Runtime configuration for picking and tuning an embedding provider.
///
/// # Example
/// ```
/// use semantic::SemanticConfig;
///
/// let cfg = SemanticConfig {
///     mode: "fast".into(),
///     dimension: 256,
///     ..Default::default()
/// };
/// cfg.validate().unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SemanticConfig {
    /// `"api"` calls a remote embeddings endpoint, `"fast"` uses the local
    /// feature-hashing embedder.
    pub mode: String,
    /// Model identifier sent to the API and echoed by providers.
    pub model_name: String,
    /// Endpoint override. Defaults to the provider's public embeddings URL.
    pub api_url: Option<String>,
    /// Bearer token for the API. Never serialized.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Remote provider hint: `"openai"` (default), `"hf"`, or `"custom"`.
    pub api_provider: Option<String>,
    /// Overall API timeout in seconds.
    pub api_timeout_secs: Option<u64>,
    /// Length of every produced vector.
    pub dimension: usize,
    /// L2-normalize vectors before returning them.
    pub normalize: bool,
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            mode: "api".into(),
            model_name: "text-embedding-3-small".into(),
            api_url: None,
            api_key: None,
            api_provider: Some("openai".into()),
            api_timeout_secs: Some(30),
            dimension: 1536,
            normalize: true,
        }
    }
}

impl SemanticConfig {
    /// Local, credential-free configuration.
    pub fn fast(dimension: usize) -> Self {
        Self {
            mode: "fast".into(),
            model_name: "feature-hash".into(),
            dimension,
            ..Default::default()
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Key with surrounding whitespace removed; blank keys count as absent.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    pub fn validate(&self) -> Result<(), SemanticError> {
        if self.dimension == 0 {
            return Err(SemanticError::InvalidConfig(
                "dimension must be >= 1".into(),
            ));
        }
        match self.mode.as_str() {
            "fast" => Ok(()),
            "api" => {
                if self.api_key().is_none() {
                    return Err(SemanticError::Unavailable(
                        "no API key configured for embedding provider".into(),
                    ));
                }
                Ok(())
            }
            other => Err(SemanticError::InvalidConfig(format!(
                "unknown mode `{other}` (expected `api` or `fast`)"
            ))),
        }
    }
}
