use index::{BackendConfig, Metric, PineconeConfig};
use knowledge::{KnowledgeConfig, StoreSettings};
use semantic::SemanticConfig;
use serde::{Deserialize, Serialize};
use spectrum::PeakConfig;
use std::net::SocketAddr;
use std::time::Duration;

/// Plain environment variables honoured for compatibility with existing
/// deployments, mapped to their config keys. `XRAG__*` variables and the
/// config file take precedence over these.
const PLAIN_ENV_VARS: [(&str, &str); 5] = [
    ("openai_api_key", "OPENAI_API_KEY"),
    ("openai_model", "OPENAI_MODEL"),
    ("embedding_model", "EMBEDDING_MODEL"),
    ("pinecone_api_key", "PINECONE_API_KEY"),
    ("pinecone_index_name", "PINECONE_INDEX_NAME"),
];

/// Server configuration
#[derive(Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Server bind address
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds; covers the LLM round trip
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum request body size in MB
    #[serde(default = "default_max_body_size_mb")]
    pub max_body_size_mb: usize,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub enable_cors: bool,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Metrics endpoint enabled
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,

    /// Key for the chat model and the embeddings API
    #[serde(default, skip_serializing)]
    pub openai_api_key: Option<String>,

    #[serde(default = "default_openai_model")]
    pub openai_model: String,

    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,

    /// `api` or `fast` (local hashing embedder, no key needed)
    #[serde(default = "default_embedding_mode")]
    pub embedding_mode: String,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    #[serde(default = "default_embedding_dimension")]
    pub embedding_dimension: usize,

    /// `pinecone` or `in_memory`
    #[serde(default = "default_vector_backend")]
    pub vector_backend: String,

    #[serde(default, skip_serializing)]
    pub pinecone_api_key: Option<String>,

    #[serde(default = "default_index_name")]
    pub pinecone_index_name: String,

    #[serde(default = "default_cloud")]
    pub pinecone_cloud: String,

    #[serde(default = "default_region")]
    pub pinecone_region: String,

    /// Namespace used by chat retrieval and bootstrap
    #[serde(default = "default_namespace")]
    pub namespace: String,

    #[serde(default = "default_dedup_threshold")]
    pub dedup_threshold: f32,

    #[serde(default = "default_top_k")]
    pub retrieval_top_k: usize,

    #[serde(default = "default_peak_window")]
    pub peak_window: usize,

    #[serde(default = "default_peak_threshold")]
    pub peak_threshold: f64,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("bind_addr", &self.bind_addr)
            .field("port", &self.port)
            .field("timeout_secs", &self.timeout_secs)
            .field("openai_api_key", &self.openai_api_key.as_ref().map(|_| "<redacted>"))
            .field("openai_model", &self.openai_model)
            .field("embedding_mode", &self.embedding_mode)
            .field("embedding_model", &self.embedding_model)
            .field("vector_backend", &self.vector_backend)
            .field("pinecone_api_key", &self.pinecone_api_key.as_ref().map(|_| "<redacted>"))
            .field("pinecone_index_name", &self.pinecone_index_name)
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
            timeout_secs: default_timeout_secs(),
            max_body_size_mb: default_max_body_size_mb(),
            enable_cors: default_true(),
            log_level: default_log_level(),
            metrics_enabled: default_true(),
            openai_api_key: None,
            openai_model: default_openai_model(),
            openai_base_url: default_openai_base_url(),
            embedding_mode: default_embedding_mode(),
            embedding_model: default_embedding_model(),
            embedding_dimension: default_embedding_dimension(),
            vector_backend: default_vector_backend(),
            pinecone_api_key: None,
            pinecone_index_name: default_index_name(),
            pinecone_cloud: default_cloud(),
            pinecone_region: default_region(),
            namespace: default_namespace(),
            dedup_threshold: default_dedup_threshold(),
            retrieval_top_k: default_top_k(),
            peak_window: default_peak_window(),
            peak_threshold: default_peak_threshold(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from `.env`, the plain provider variables, an
    /// optional `server.{toml,yaml,json}` file and `XRAG__*` variables, in
    /// increasing order of precedence.
    pub fn load() -> anyhow::Result<Self> {
        if let Err(err) = dotenvy::dotenv() {
            if !err.not_found() {
                tracing::warn!(error = %err, "failed to read .env file");
            }
        }
        Self::load_with(|var| std::env::var(var).ok())
    }

    /// [`load`](Self::load) without reading `.env`, taking the plain
    /// provider variables from `lookup`.
    pub fn load_with(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut builder = config::Config::builder();
        for (key, var) in PLAIN_ENV_VARS {
            if let Some(value) = lookup(var).filter(|v| !v.trim().is_empty()) {
                builder = builder.set_default(key, value)?;
            }
        }
        let builder = builder
            // Load from file if exists
            .add_source(config::File::with_name("server").required(false))
            // Override with environment variables
            .add_source(config::Environment::with_prefix("XRAG").separator("__"));

        let config: ServerConfig = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.bind_addr, self.port);
        Ok(addr_str.parse()?)
    }

    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Get max body size in bytes
    pub fn max_body_size(&self) -> usize {
        self.max_body_size_mb * 1024 * 1024
    }

    /// The OpenAI key, if one is configured and not blank.
    pub fn openai_key(&self) -> Option<&str> {
        self.openai_api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    pub fn peak_config(&self) -> PeakConfig {
        PeakConfig::default()
            .with_window(self.peak_window)
            .with_threshold(self.peak_threshold)
    }

    pub fn semantic_config(&self) -> SemanticConfig {
        let base = if self.embedding_mode == "fast" {
            SemanticConfig::fast(self.embedding_dimension)
        } else {
            SemanticConfig {
                model_name: self.embedding_model.clone(),
                dimension: self.embedding_dimension,
                ..SemanticConfig::default()
            }
        };
        SemanticConfig {
            api_key: self.openai_key().map(str::to_string),
            ..base
        }
    }

    pub fn backend_config(&self) -> BackendConfig {
        match self.vector_backend.as_str() {
            "in_memory" => BackendConfig::in_memory(),
            _ => BackendConfig::Pinecone(
                PineconeConfig::new(self.pinecone_api_key.clone().unwrap_or_default())
                    .with_region(self.pinecone_cloud.clone(), self.pinecone_region.clone()),
            ),
        }
    }

    pub fn knowledge_config(&self) -> KnowledgeConfig {
        KnowledgeConfig {
            index_name: self.pinecone_index_name.clone(),
            namespace: self.namespace.clone(),
            metric: Metric::Cosine,
            dedup_threshold: self.dedup_threshold,
            default_top_k: self.retrieval_top_k,
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

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_max_body_size_mb() -> usize {
    10
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_openai_model() -> String {
    "gpt-4.1-mini".to_string()
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_embedding_mode() -> String {
    "api".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_embedding_dimension() -> usize {
    1536
}

fn default_vector_backend() -> String {
    "pinecone".to_string()
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

fn default_peak_window() -> usize {
    5
}

fn default_peak_threshold() -> f64 {
    0.2
}
