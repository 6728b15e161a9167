//! # xrag Index
//!
//! A small, backend-agnostic vector index API shaped after managed vector
//! databases: named index, fixed dimension and metric, records partitioned by
//! namespace, top-k similarity queries.
//!
//! ## Backends
//!
//! - [`InMemoryIndex`] - exact search over a `RwLock<HashMap>`. Ephemeral;
//!   used by tests, the CLI and credential-free deployments.
//! - [`PineconeIndex`] - REST client for a serverless Pinecone index.
//!
//! Both implement [`VectorIndex`], and [`BackendConfig::build`] picks one at
//! runtime.
//!
//! ## Example Usage
//!
//! ```
//! use index::{BackendConfig, IndexSpec, QueryRequest, VectorRecord};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let index = BackendConfig::in_memory().build().unwrap();
//! index.create_index_if_missing(&IndexSpec::cosine("demo", 3)).await.unwrap();
//!
//! index
//!     .upsert(vec![VectorRecord::new("a", vec![1.0, 0.0, 0.0])], "default")
//!     .await
//!     .unwrap();
//!
//! let hits = index
//!     .query(QueryRequest::new(&[0.9, 0.1, 0.0], 1, "default"))
//!     .await
//!     .unwrap();
//! assert_eq!(hits[0].id, "a");
//! # });
//! ```

mod backend;
mod pinecone;
mod query;

pub use backend::{BackendConfig, InMemoryIndex};
pub use pinecone::{PineconeConfig, PineconeIndex};
pub use query::{cosine_similarity, rank_matches};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Similarity metric an index is created with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    #[default]
    Cosine,
    Euclidean,
    #[serde(rename = "dotproduct")]
    DotProduct,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Cosine => "cosine",
            Metric::Euclidean => "euclidean",
            Metric::DotProduct => "dotproduct",
        }
    }

    /// Euclidean scores are distances; everything else is a similarity.
    pub fn higher_is_better(&self) -> bool {
        !matches!(self, Metric::Euclidean)
    }
}

/// Shape of an index, fixed at creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSpec {
    pub name: String,
    pub dimension: usize,
    pub metric: Metric,
}

impl IndexSpec {
    pub fn cosine(name: impl Into<String>, dimension: usize) -> Self {
        Self {
            name: name.into(),
            dimension,
            metric: Metric::Cosine,
        }
    }
}

/// A stored vector with its id and JSON metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl VectorRecord {
    pub fn new(id: impl Into<String>, values: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            values,
            metadata: Map::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Top-k query against one namespace.
#[derive(Debug, Clone, Copy)]
pub struct QueryRequest<'a> {
    pub vector: &'a [f32],
    pub top_k: usize,
    pub namespace: &'a str,
    pub include_metadata: bool,
}

impl<'a> QueryRequest<'a> {
    pub fn new(vector: &'a [f32], top_k: usize, namespace: &'a str) -> Self {
        Self {
            vector,
            top_k,
            namespace,
            include_metadata: true,
        }
    }

    pub fn without_metadata(mut self) -> Self {
        self.include_metadata = false;
        self
    }
}

/// One query hit. `score` is the metric value reported by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryMatch {
    pub id: String,
    pub score: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl QueryMatch {
    /// Convenience accessor for a string metadata field.
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.as_ref()?.get(key)?.as_str()
    }
}

/// Errors from any index backend.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndexError {
    #[error("Backend error: {0}")]
    Backend(String),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("dimension mismatch: index expects {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
    #[error("index not initialized: {0}")]
    NotInitialized(String),
    #[error("invalid index config: {0}")]
    InvalidConfig(String),
}

impl IndexError {
    pub fn backend<E: std::fmt::Display>(err: E) -> Self {
        Self::Backend(err.to_string())
    }

    /// Configuration problems never resolve on their own.
    pub fn is_permanent(&self) -> bool {
        matches!(self, IndexError::InvalidConfig(_))
    }
}

/// Operations every vector index backend provides.
///
/// Records live in namespaces; a namespace springs into existence on first
/// upsert. Query results are ordered best-first.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Create the index described by `spec` unless one with that name exists.
    async fn create_index_if_missing(&self, spec: &IndexSpec) -> Result<(), IndexError>;

    /// Insert or replace records by id. Returns how many were written.
    async fn upsert(&self, vectors: Vec<VectorRecord>, namespace: &str)
        -> Result<usize, IndexError>;

    async fn query(&self, request: QueryRequest<'_>) -> Result<Vec<QueryMatch>, IndexError>;

    async fn delete(&self, ids: &[String], namespace: &str) -> Result<(), IndexError>;

    /// Number of records stored in `namespace`.
    async fn count(&self, namespace: &str) -> Result<usize, IndexError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn metric_serializes_with_service_names() {
        assert_eq!(serde_json::to_value(Metric::Cosine).unwrap(), json!("cosine"));
        assert_eq!(
            serde_json::to_value(Metric::DotProduct).unwrap(),
            json!("dotproduct")
        );
        assert_eq!(Metric::Euclidean.as_str(), "euclidean");
        assert!(!Metric::Euclidean.higher_is_better());
    }

    #[test]
    fn record_without_metadata_omits_the_field() {
        let value = serde_json::to_value(VectorRecord::new("x", vec![0.5])).unwrap();
        assert_eq!(value, json!({ "id": "x", "values": [0.5] }));
    }

    #[test]
    fn metadata_str_reads_text_field() {
        let hit = QueryMatch {
            id: "1".into(),
            score: 0.9,
            metadata: Some(
                VectorRecord::new("1", vec![])
                    .with_metadata("text", "EXAFS")
                    .metadata,
            ),
        };
        assert_eq!(hit.metadata_str("text"), Some("EXAFS"));
        assert_eq!(hit.metadata_str("missing"), None);
    }

    #[test]
    fn only_config_errors_are_permanent() {
        assert!(IndexError::InvalidConfig("no key".into()).is_permanent());
        assert!(!IndexError::Http("timeout".into()).is_permanent());
        assert!(IndexError::backend("poisoned lock")
            .to_string()
            .contains("poisoned lock"));
    }
}
