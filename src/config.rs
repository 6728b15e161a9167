//! YAML configuration file support for xrag.
//!
//! A single file describes every stage: peak detection, embeddings, the vector
//! index and the knowledge store. Secrets never live in the file; sections that
//! need a credential name the environment variable holding it.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! version: "1.0"
//! name: "beamline demo"
//!
//! spectrum:
//!   window: 5
//!   threshold: 0.2
//!   policy: keep_ties
//!
//! semantic:
//!   mode: "api"
//!   model_name: "text-embedding-3-small"
//!   dimension: 1536
//!   api_key_env: "OPENAI_API_KEY"
//!
//! index:
//!   backend: "pinecone"
//!   index_name: "xray-rag"
//!   cloud: "aws"
//!   region: "us-east-1"
//!   api_key_env: "PINECONE_API_KEY"
//!
//! knowledge:
//!   namespace: "default"
//!   dedup_threshold: 0.99
//!   top_k: 3
//!   batch_dedup: "off"
//! ```

use std::fs;
use std::path::Path;

use index::{BackendConfig, Metric, PineconeConfig};
use knowledge::{BatchDedup, KnowledgeConfig, StoreSettings};
use semantic::SemanticConfig;
use serde::{Deserialize, Serialize};
use spectrum::{PeakConfig, PeakPolicy};
use thiserror::Error;

/// Errors that can occur when loading YAML configuration files
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

/// Top-level YAML configuration for the whole pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct XragConfig {
    /// Configuration format version
    pub version: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub spectrum: SpectrumYamlConfig,

    #[serde(default)]
    pub semantic: SemanticYamlConfig,

    #[serde(default)]
    pub index: IndexYamlConfig,

    #[serde(default)]
    pub knowledge: KnowledgeYamlConfig,
}

impl XragConfig {
    /// Load a YAML configuration file from the given path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse and validate YAML configuration from a string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: XragConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        self.spectrum.validate()?;
        self.semantic.validate()?;
        self.index.validate()?;
        self.knowledge.validate()?;
        Ok(())
    }

    pub fn peak_config(&self) -> PeakConfig {
        PeakConfig::default()
            .with_window(self.spectrum.window)
            .with_threshold(self.spectrum.threshold)
            .with_policy(self.spectrum.policy)
    }

    /// Embedding settings, with the API key read from the configured
    /// environment variable.
    pub fn semantic_config(&self) -> SemanticConfig {
        let s = &self.semantic;
        SemanticConfig {
            mode: s.mode.clone(),
            model_name: s.model_name.clone(),
            api_url: s.api_url.clone(),
            api_key: s.api_key_env.as_deref().and_then(read_env),
            api_provider: s.api_provider.clone(),
            api_timeout_secs: s.api_timeout_secs,
            dimension: s.dimension,
            normalize: s.normalize,
        }
    }

    pub fn backend_config(&self) -> BackendConfig {
        let i = &self.index;
        match i.backend.as_str() {
            "pinecone" => {
                let api_key = i.api_key_env.as_deref().and_then(read_env).unwrap_or_default();
                BackendConfig::Pinecone(
                    PineconeConfig::new(api_key).with_region(i.cloud.clone(), i.region.clone()),
                )
            }
            _ => BackendConfig::InMemory,
        }
    }

    pub fn knowledge_config(&self) -> KnowledgeConfig {
        let k = &self.knowledge;
        KnowledgeConfig {
            index_name: self.index.index_name.clone(),
            namespace: k.namespace.clone(),
            metric: self.index.metric,
            dedup_threshold: k.dedup_threshold,
            default_top_k: k.top_k,
            batch_dedup: k.batch_dedup,
            ..KnowledgeConfig::default()
        }
    }

    pub fn store_settings(&self) -> StoreSettings {
        StoreSettings {
            semantic: self.semantic_config(),
            backend: self.backend_config(),
            knowledge: self.knowledge_config(),
        }
    }
}

impl Default for XragConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            name: None,
            spectrum: SpectrumYamlConfig::default(),
            semantic: SemanticYamlConfig::default(),
            index: IndexYamlConfig::default(),
            knowledge: KnowledgeYamlConfig::default(),
        }
    }
}

fn read_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Peak detection YAML configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpectrumYamlConfig {
    #[serde(default = "default_window")]
    pub window: usize,

    #[serde(default = "default_threshold")]
    pub threshold: f64,

    #[serde(default)]
    pub policy: PeakPolicy,
}

impl SpectrumYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        if !self.threshold.is_finite() {
            return Err(ConfigLoadError::Validation(
                "spectrum.threshold must be a finite number".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for SpectrumYamlConfig {
    fn default() -> Self {
        Self {
            window: default_window(),
            threshold: default_threshold(),
            policy: PeakPolicy::default(),
        }
    }
}

/// Embedding provider YAML configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticYamlConfig {
    #[serde(default = "default_mode")]
    pub mode: String,

    #[serde(default = "default_model_name")]
    pub model_name: String,

    #[serde(default)]
    pub api_url: Option<String>,

    #[serde(default = "default_api_provider")]
    pub api_provider: Option<String>,

    /// Environment variable holding the API key.
    #[serde(default)]
    pub api_key_env: Option<String>,

    #[serde(default = "default_timeout")]
    pub api_timeout_secs: Option<u64>,

    #[serde(default = "default_dimension")]
    pub dimension: usize,

    #[serde(default = "true_value")]
    pub normalize: bool,
}

impl SemanticYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        let valid_modes = ["fast", "api"];
        if !valid_modes.contains(&self.mode.as_str()) {
            return Err(ConfigLoadError::Validation(format!(
                "semantic.mode must be one of: {valid_modes:?}"
            )));
        }
        if self.dimension == 0 {
            return Err(ConfigLoadError::Validation(
                "semantic.dimension must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for SemanticYamlConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            model_name: default_model_name(),
            api_url: None,
            api_provider: default_api_provider(),
            api_key_env: None,
            api_timeout_secs: default_timeout(),
            dimension: default_dimension(),
            normalize: true,
        }
    }
}

/// Vector index YAML configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexYamlConfig {
    #[serde(default = "default_backend")]
    pub backend: String,

    #[serde(default = "default_index_name")]
    pub index_name: String,

    #[serde(default)]
    pub metric: Metric,

    #[serde(default = "default_cloud")]
    pub cloud: String,

    #[serde(default = "default_region")]
    pub region: String,

    #[serde(default)]
    pub api_key_env: Option<String>,
}

impl IndexYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        let valid_backends = ["in_memory", "pinecone"];
        if !valid_backends.contains(&self.backend.as_str()) {
            return Err(ConfigLoadError::Validation(format!(
                "index.backend must be one of: {valid_backends:?}"
            )));
        }
        if self.index_name.trim().is_empty() {
            return Err(ConfigLoadError::Validation(
                "index.index_name must not be empty".to_string(),
            ));
        }
        if self.metric != Metric::Cosine {
            return Err(ConfigLoadError::Validation(format!(
                "index.metric must be 'cosine' (got '{}')",
                self.metric.as_str()
            )));
        }
        if self.backend == "pinecone" && self.api_key_env.is_none() {
            return Err(ConfigLoadError::Validation(
                "index.api_key_env is required when backend is 'pinecone'".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for IndexYamlConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            index_name: default_index_name(),
            metric: Metric::Cosine,
            cloud: default_cloud(),
            region: default_region(),
            api_key_env: None,
        }
    }
}

/// Knowledge store YAML configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeYamlConfig {
    #[serde(default = "default_namespace")]
    pub namespace: String,

    #[serde(default = "default_dedup_threshold")]
    pub dedup_threshold: f32,

    #[serde(default = "default_top_k")]
    pub top_k: usize,

    #[serde(default)]
    pub batch_dedup: BatchDedup,
}

impl KnowledgeYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.top_k == 0 {
            return Err(ConfigLoadError::Validation(
                "knowledge.top_k must be >= 1".to_string(),
            ));
        }
        if !(-1.0..=1.0).contains(&self.dedup_threshold) {
            return Err(ConfigLoadError::Validation(
                "knowledge.dedup_threshold must be within [-1, 1]".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for KnowledgeYamlConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            dedup_threshold: default_dedup_threshold(),
            top_k: default_top_k(),
            batch_dedup: BatchDedup::Off,
        }
    }
}

// Helper functions for serde defaults
fn true_value() -> bool {
    true
}
fn default_window() -> usize {
    5
}
fn default_threshold() -> f64 {
    0.2
}
fn default_mode() -> String {
    "fast".to_string()
}
fn default_model_name() -> String {
    "text-embedding-3-small".to_string()
}
fn default_api_provider() -> Option<String> {
    Some("openai".to_string())
}
fn default_timeout() -> Option<u64> {
    Some(30)
}
fn default_dimension() -> usize {
    1536
}
fn default_backend() -> String {
    "in_memory".to_string()
}
fn default_index_name() -> String {
    "xray-rag".to_string()
}
fn default_cloud() -> String {
    "aws".to_string()
}
fn default_region() -> String {
    "us-east-1".to_string()
}
fn default_namespace() -> String {
    "default".to_string()
}
fn default_dedup_threshold() -> f32 {
    0.99
}
fn default_top_k() -> usize {
    3
}
