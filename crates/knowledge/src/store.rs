use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Instant;

use index::{cosine_similarity, BackendConfig, IndexSpec, QueryRequest, VectorIndex, VectorRecord};
use semantic::{build_provider, EmbeddingProvider, SemanticConfig};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{BatchDedup, KnowledgeConfig, KnowledgeError};

#[cfg(test)]
mod tests;

/// Metadata key holding the original document text.
pub const TEXT_METADATA_KEY: &str = "text";

/// Outcome of one [`KnowledgeStore::upsert`] call.
///
/// On an enabled store `submitted == inserted + duplicates + failed`. A
/// disabled store reports the submitted count and nothing else.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertReport {
    pub submitted: usize,
    pub inserted: usize,
    pub duplicates: usize,
    /// Documents skipped because their dedup query failed.
    pub failed: usize,
}

/// A retrieved document with its similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalMatch {
    pub id: String,
    /// Empty when the stored record carries no text metadata.
    pub text: String,
    pub similarity: f32,
}

enum StoreMode {
    Enabled {
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
    },
    Disabled {
        reason: String,
    },
}

/// Dedup-aware document store over an embedding provider and a vector index.
///
/// A store is either enabled, or disabled for the lifetime of the process
/// because a provider could not be configured. Disabled stores answer every
/// retrieval with no matches and ignore upserts.
pub struct KnowledgeStore {
    mode: StoreMode,
    cfg: KnowledgeConfig,
}

impl std::fmt::Debug for KnowledgeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("KnowledgeStore");
        match &self.mode {
            StoreMode::Enabled { embedder, .. } => {
                s.field("embedding_model", &embedder.model_name())
            }
            StoreMode::Disabled { reason } => s.field("disabled", reason),
        };
        s.field("cfg", &self.cfg).finish()
    }
}

impl KnowledgeStore {
    /// Enabled store over explicit providers. Ensures the index exists with
    /// the embedder's dimension.
    pub async fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        cfg: KnowledgeConfig,
    ) -> Result<Self, KnowledgeError> {
        cfg.validate()?;
        let spec = IndexSpec {
            name: cfg.index_name.clone(),
            dimension: embedder.dimension(),
            metric: cfg.metric,
        };
        index.create_index_if_missing(&spec).await?;
        info!(
            index = %spec.name,
            dimension = spec.dimension,
            model = embedder.model_name(),
            "knowledge store ready"
        );
        Ok(Self {
            mode: StoreMode::Enabled { embedder, index },
            cfg,
        })
    }

    pub fn disabled(reason: impl Into<String>, cfg: KnowledgeConfig) -> Self {
        Self {
            mode: StoreMode::Disabled {
                reason: reason.into(),
            },
            cfg,
        }
    }

    /// Build providers from configuration. Never fails: any setup error yields
    /// a disabled store and a warning.
    pub async fn connect(
        semantic: &SemanticConfig,
        backend: &BackendConfig,
        cfg: KnowledgeConfig,
    ) -> Self {
        let embedder = match build_provider(semantic) {
            Ok(embedder) => embedder,
            Err(err) => {
                warn!(error = %err, "embedding provider unavailable; retrieval disabled");
                return Self::disabled(err.to_string(), cfg);
            }
        };
        let index = match backend.build() {
            Ok(index) => index,
            Err(err) => {
                warn!(error = %err, "vector index unavailable; retrieval disabled");
                return Self::disabled(err.to_string(), cfg);
            }
        };
        match Self::new(embedder, index, cfg.clone()).await {
            Ok(store) => store,
            Err(err) => {
                warn!(error = %err, "knowledge store setup failed; retrieval disabled");
                Self::disabled(err.to_string(), cfg)
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self.mode, StoreMode::Enabled { .. })
    }

    pub fn disabled_reason(&self) -> Option<&str> {
        match &self.mode {
            StoreMode::Disabled { reason } => Some(reason),
            StoreMode::Enabled { .. } => None,
        }
    }

    pub fn config(&self) -> &KnowledgeConfig {
        &self.cfg
    }

    /// Embed `docs` and insert those that are not near-duplicates of records
    /// already in `namespace`.
    ///
    /// A failing dedup query skips only that document. Embedding failures and
    /// a failing final upsert abort the call with nothing written.
    pub async fn upsert<S: AsRef<str> + Sync>(
        &self,
        docs: &[S],
        namespace: &str,
    ) -> Result<UpsertReport, KnowledgeError> {
        let mut report = UpsertReport {
            submitted: docs.len(),
            ..UpsertReport::default()
        };
        let StoreMode::Enabled { embedder, index } = &self.mode else {
            debug!(docs = docs.len(), "knowledge store disabled; upsert ignored");
            return Ok(report);
        };
        if docs.is_empty() {
            return Ok(report);
        }

        let texts: Vec<String> = docs.iter().map(|d| d.as_ref().to_string()).collect();
        let embeddings = embedder.embed(&texts).await?;
        if embeddings.len() != texts.len() {
            return Err(KnowledgeError::EmbeddingCountMismatch {
                expected: texts.len(),
                got: embeddings.len(),
            });
        }

        let threshold = self.cfg.dedup_threshold;
        let mut staged: Vec<VectorRecord> = Vec::new();
        for (position, (text, embedding)) in texts.into_iter().zip(embeddings).enumerate() {
            if self.cfg.batch_dedup == BatchDedup::WithinBatch
                && staged
                    .iter()
                    .any(|r| cosine_similarity(&r.values, &embedding) > threshold)
            {
                debug!(position, "duplicate within batch; skipping");
                report.duplicates += 1;
                continue;
            }

            let nearest = match index
                .query(QueryRequest::new(&embedding, 1, namespace).without_metadata())
                .await
            {
                Ok(matches) => matches,
                Err(err) => {
                    warn!(position, error = %err, "dedup check failed; skipping document");
                    report.failed += 1;
                    continue;
                }
            };
            if let Some(best) = nearest.first() {
                if best.score > threshold {
                    debug!(position, existing = %best.id, score = best.score, "duplicate; skipping");
                    report.duplicates += 1;
                    continue;
                }
            }

            staged.push(
                VectorRecord::new(Uuid::new_v4().to_string(), embedding)
                    .with_metadata(TEXT_METADATA_KEY, text),
            );
        }

        if staged.is_empty() {
            info!(namespace, "no new documents to upsert");
        } else {
            let count = staged.len();
            index.upsert(staged, namespace).await?;
            report.inserted = count;
            info!(namespace, inserted = count, "upserted documents");
        }

        metrics::counter!("xrag_knowledge_docs_inserted_total").increment(report.inserted as u64);
        metrics::counter!("xrag_knowledge_docs_duplicate_total")
            .increment(report.duplicates as u64);
        metrics::counter!("xrag_knowledge_docs_failed_total").increment(report.failed as u64);
        Ok(report)
    }

    /// [`upsert`](Self::upsert) into the configured namespace.
    pub async fn upsert_default<S: AsRef<str> + Sync>(
        &self,
        docs: &[S],
    ) -> Result<UpsertReport, KnowledgeError> {
        self.upsert(docs, &self.cfg.namespace).await
    }

    /// Load the configured bootstrap documents. Safe to repeat: existing
    /// copies are recognised as duplicates.
    pub async fn bootstrap(&self) -> Result<UpsertReport, KnowledgeError> {
        self.upsert(&self.cfg.bootstrap_docs, &self.cfg.namespace)
            .await
    }

    /// Up to `k` stored documents most similar to `query`, best first.
    pub async fn retrieve(
        &self,
        query: &str,
        k: usize,
        namespace: &str,
    ) -> Result<Vec<RetrievalMatch>, KnowledgeError> {
        let StoreMode::Enabled { embedder, index } = &self.mode else {
            return Ok(Vec::new());
        };
        if k == 0 {
            return Ok(Vec::new());
        }

        let started = Instant::now();
        let mut vectors = embedder.embed(&[query.to_string()]).await?;
        if vectors.len() != 1 {
            return Err(KnowledgeError::EmbeddingCountMismatch {
                expected: 1,
                got: vectors.len(),
            });
        }
        let vector = vectors.remove(0);

        let matches = index.query(QueryRequest::new(&vector, k, namespace)).await?;
        let mut results: Vec<RetrievalMatch> = matches
            .into_iter()
            .map(|m| {
                let text = m.metadata_str(TEXT_METADATA_KEY).unwrap_or_default().to_string();
                RetrievalMatch {
                    id: m.id,
                    text,
                    similarity: m.score,
                }
            })
            .collect();
        results.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        results.truncate(k);

        metrics::histogram!("xrag_knowledge_retrieve_seconds")
            .record(started.elapsed().as_secs_f64());
        debug!(namespace, k, hits = results.len(), "retrieved context");
        Ok(results)
    }

    /// [`retrieve`](Self::retrieve) with the configured `k` and namespace.
    pub async fn retrieve_default(
        &self,
        query: &str,
    ) -> Result<Vec<RetrievalMatch>, KnowledgeError> {
        self.retrieve(query, self.cfg.default_top_k, &self.cfg.namespace)
            .await
    }

    /// Records stored in `namespace`; 0 when disabled.
    pub async fn count(&self, namespace: &str) -> Result<usize, KnowledgeError> {
        match &self.mode {
            StoreMode::Enabled { index, .. } => Ok(index.count(namespace).await?),
            StoreMode::Disabled { .. } => Ok(0),
        }
    }
}
