use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::query::{rank_matches, score};
use crate::{
    IndexError, IndexSpec, Metric, PineconeConfig, PineconeIndex, QueryMatch, QueryRequest,
    VectorIndex, VectorRecord,
};

/// Configuration for selecting and building a backend.
///
/// # Example
/// ```
/// use index::BackendConfig;
///
/// // In-memory (tests, offline runs)
/// let config = BackendConfig::in_memory();
///
/// // Managed service
/// let config = BackendConfig::pinecone("pc-api-key");
/// ```
#[derive(Clone, Debug, Default)]
pub enum BackendConfig {
    /// Exact search over process memory. Nothing survives a restart.
    #[default]
    InMemory,
    /// Serverless Pinecone index reached over HTTPS.
    Pinecone(PineconeConfig),
}

impl BackendConfig {
    pub fn in_memory() -> Self {
        BackendConfig::InMemory
    }

    pub fn pinecone(api_key: impl Into<String>) -> Self {
        BackendConfig::Pinecone(PineconeConfig::new(api_key))
    }

    /// Build the backend. Fails with [`IndexError::InvalidConfig`] when the
    /// managed backend has no usable credentials.
    pub fn build(&self) -> Result<Arc<dyn VectorIndex>, IndexError> {
        match self {
            BackendConfig::InMemory => Ok(Arc::new(InMemoryIndex::new())),
            BackendConfig::Pinecone(cfg) => Ok(Arc::new(PineconeIndex::new(cfg.clone())?)),
        }
    }
}

/// Namespaced exact-search index held in memory.
///
/// Records in a namespace keep insertion order; an upsert with an existing id
/// replaces the record in place.
pub struct InMemoryIndex {
    spec: RwLock<Option<IndexSpec>>,
    namespaces: RwLock<HashMap<String, Vec<VectorRecord>>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self {
            spec: RwLock::new(None),
            namespaces: RwLock::new(HashMap::new()),
        }
    }

    /// The spec this index was created with, if any.
    pub fn spec(&self) -> Result<Option<IndexSpec>, IndexError> {
        Ok(self
            .spec
            .read()
            .map_err(|_| IndexError::backend("poisoned lock"))?
            .clone())
    }

    fn metric_and_dimension(&self) -> Result<(Metric, Option<usize>), IndexError> {
        let guard = self
            .spec
            .read()
            .map_err(|_| IndexError::backend("poisoned lock"))?;
        Ok(match guard.as_ref() {
            Some(spec) => (spec.metric, Some(spec.dimension)),
            None => (Metric::Cosine, None),
        })
    }
}

impl Default for InMemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

fn check_dimension(expected: Option<usize>, got: usize) -> Result<(), IndexError> {
    match expected {
        Some(expected) if expected != got => Err(IndexError::DimensionMismatch { expected, got }),
        _ => Ok(()),
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn create_index_if_missing(&self, spec: &IndexSpec) -> Result<(), IndexError> {
        if spec.dimension == 0 {
            return Err(IndexError::InvalidConfig("dimension must be >= 1".into()));
        }
        let mut guard = self
            .spec
            .write()
            .map_err(|_| IndexError::backend("poisoned lock"))?;
        match guard.as_ref() {
            Some(existing) if existing != spec => {
                tracing::warn!(
                    existing = ?existing,
                    requested = ?spec,
                    "index already exists with a different spec; keeping existing"
                );
            }
            Some(_) => {}
            None => *guard = Some(spec.clone()),
        }
        Ok(())
    }

    async fn upsert(
        &self,
        vectors: Vec<VectorRecord>,
        namespace: &str,
    ) -> Result<usize, IndexError> {
        let (_, dimension) = self.metric_and_dimension()?;
        for record in &vectors {
            check_dimension(dimension, record.values.len())?;
        }

        // A single write lock is held for the entire batch.
        let mut guard = self
            .namespaces
            .write()
            .map_err(|_| IndexError::backend("poisoned lock"))?;
        let records = guard.entry(namespace.to_string()).or_default();
        let written = vectors.len();
        for record in vectors {
            match records.iter_mut().find(|r| r.id == record.id) {
                Some(existing) => *existing = record,
                None => records.push(record),
            }
        }
        Ok(written)
    }

    async fn query(&self, request: QueryRequest<'_>) -> Result<Vec<QueryMatch>, IndexError> {
        if request.top_k == 0 {
            return Ok(Vec::new());
        }
        let (metric, dimension) = self.metric_and_dimension()?;
        check_dimension(dimension, request.vector.len())?;

        let guard = self
            .namespaces
            .read()
            .map_err(|_| IndexError::backend("poisoned lock"))?;
        let Some(records) = guard.get(request.namespace) else {
            return Ok(Vec::new());
        };

        let matches = records
            .iter()
            .map(|record| QueryMatch {
                id: record.id.clone(),
                score: score(metric, request.vector, &record.values),
                metadata: request.include_metadata.then(|| record.metadata.clone()),
            })
            .collect();
        Ok(rank_matches(matches, metric, request.top_k))
    }

    async fn delete(&self, ids: &[String], namespace: &str) -> Result<(), IndexError> {
        let mut guard = self
            .namespaces
            .write()
            .map_err(|_| IndexError::backend("poisoned lock"))?;
        if let Some(records) = guard.get_mut(namespace) {
            records.retain(|r| !ids.contains(&r.id));
        }
        Ok(())
    }

    async fn count(&self, namespace: &str) -> Result<usize, IndexError> {
        let guard = self
            .namespaces
            .read()
            .map_err(|_| IndexError::backend("poisoned lock"))?;
        Ok(guard.get(namespace).map_or(0, Vec::len))
    }
}
