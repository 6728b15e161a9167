use super::*;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

use async_trait::async_trait;
use index::{IndexError, InMemoryIndex, Metric, QueryMatch};
use semantic::{HashingEmbedder, SemanticError};

use crate::BOOTSTRAP_DOCS;

const DIM: usize = 256;
const NS: &str = "default";

async fn memory_store(cfg: KnowledgeConfig) -> (KnowledgeStore, Arc<InMemoryIndex>) {
    let index = Arc::new(InMemoryIndex::new());
    let store = KnowledgeStore::new(Arc::new(HashingEmbedder::new(DIM)), index.clone(), cfg)
        .await
        .unwrap();
    (store, index)
}

/// Wraps an in-memory index and fails the next `fail_next` queries.
struct FlakyIndex {
    inner: InMemoryIndex,
    fail_next: AtomicUsize,
}

#[async_trait]
impl VectorIndex for FlakyIndex {
    async fn create_index_if_missing(&self, spec: &IndexSpec) -> Result<(), IndexError> {
        self.inner.create_index_if_missing(spec).await
    }

    async fn upsert(&self, vectors: Vec<VectorRecord>, namespace: &str) -> Result<usize, IndexError> {
        self.inner.upsert(vectors, namespace).await
    }

    async fn query(&self, request: QueryRequest<'_>) -> Result<Vec<QueryMatch>, IndexError> {
        let pending = self.fail_next.load(AtomicOrdering::SeqCst);
        if pending > 0 {
            self.fail_next.store(pending - 1, AtomicOrdering::SeqCst);
            return Err(IndexError::Http("503 service unavailable".into()));
        }
        self.inner.query(request).await
    }

    async fn delete(&self, ids: &[String], namespace: &str) -> Result<(), IndexError> {
        self.inner.delete(ids, namespace).await
    }

    async fn count(&self, namespace: &str) -> Result<usize, IndexError> {
        self.inner.count(namespace).await
    }
}

struct BrokenEmbedder;

#[async_trait]
impl EmbeddingProvider for BrokenEmbedder {
    fn model_name(&self) -> &str {
        "broken"
    }

    fn dimension(&self) -> usize {
        DIM
    }

    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, SemanticError> {
        Err(SemanticError::Http("connection reset".into()))
    }
}

/// Returns one vector fewer than asked for.
struct ShortEmbedder;

#[async_trait]
impl EmbeddingProvider for ShortEmbedder {
    fn model_name(&self) -> &str {
        "short"
    }

    fn dimension(&self) -> usize {
        DIM
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, SemanticError> {
        Ok(vec![vec![0.5; DIM]; texts.len().saturating_sub(1)])
    }
}

#[tokio::test]
async fn upsert_is_idempotent_for_identical_docs() {
    let (store, _) = memory_store(KnowledgeConfig::default()).await;

    let first = store.upsert(&BOOTSTRAP_DOCS, NS).await.unwrap();
    assert_eq!(first.inserted, 4);
    assert_eq!(first.duplicates, 0);
    assert_eq!(store.count(NS).await.unwrap(), 4);

    let second = store.upsert(&BOOTSTRAP_DOCS, NS).await.unwrap();
    assert_eq!(
        second,
        UpsertReport {
            submitted: 4,
            inserted: 0,
            duplicates: 4,
            failed: 0
        }
    );
    assert_eq!(store.count(NS).await.unwrap(), 4);
}

#[tokio::test]
async fn stored_records_carry_uuid_ids_and_text() {
    let (store, _) = memory_store(KnowledgeConfig::default()).await;
    store.upsert(&[BOOTSTRAP_DOCS[2]], NS).await.unwrap();

    let hits = store.retrieve(BOOTSTRAP_DOCS[2], 1, NS).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert!(Uuid::parse_str(&hits[0].id).is_ok());
    assert_eq!(hits[0].text, BOOTSTRAP_DOCS[2]);
    assert!(hits[0].similarity > 0.99);
}

#[tokio::test]
async fn retrieve_returns_k_results_best_first() {
    let (store, _) = memory_store(KnowledgeConfig::default()).await;
    store.bootstrap().await.unwrap();

    let hits = store
        .retrieve("What do EXAFS oscillations tell us about neighboring atoms?", 3, NS)
        .await
        .unwrap();
    assert_eq!(hits.len(), 3);
    assert!(hits.windows(2).all(|w| w[0].similarity >= w[1].similarity));
    assert!(hits[0].text.contains("EXAFS"));
}

#[tokio::test]
async fn retrieve_caps_at_stored_count_and_handles_zero_k() {
    let (store, _) = memory_store(KnowledgeConfig::default()).await;
    store.upsert(&BOOTSTRAP_DOCS[..2], NS).await.unwrap();

    assert_eq!(store.retrieve("XAS", 10, NS).await.unwrap().len(), 2);
    assert!(store.retrieve("XAS", 0, NS).await.unwrap().is_empty());
    assert!(store.retrieve("XAS", 3, "empty-ns").await.unwrap().is_empty());
}

#[tokio::test]
async fn default_helpers_use_configured_namespace_and_k() {
    let cfg = KnowledgeConfig {
        default_top_k: 2,
        ..KnowledgeConfig::default().with_namespace("beamline")
    };
    let (store, index) = memory_store(cfg).await;
    store.bootstrap().await.unwrap();

    assert_eq!(index.count("beamline").await.unwrap(), 4);
    assert_eq!(index.count(NS).await.unwrap(), 0);
    assert_eq!(store.retrieve_default("synchrotron").await.unwrap().len(), 2);
}

#[tokio::test]
async fn dedup_threshold_is_configurable() {
    let original = "Near-edge features relate to oxidation states";
    let variant = "Near-edge features relate to oxidation states and geometry";

    let (strict, _) = memory_store(KnowledgeConfig::default()).await;
    strict.upsert(&[original], NS).await.unwrap();
    let report = strict.upsert(&[variant], NS).await.unwrap();
    assert_eq!(report.inserted, 1);

    let (loose, _) = memory_store(KnowledgeConfig::default().with_dedup_threshold(0.5)).await;
    loose.upsert(&[original], NS).await.unwrap();
    let report = loose.upsert(&[variant], NS).await.unwrap();
    assert_eq!(report.duplicates, 1);
    assert_eq!(loose.count(NS).await.unwrap(), 1);
}

#[tokio::test]
async fn batch_duplicates_are_kept_unless_within_batch_dedup() {
    let doc = "Synchrotron light is tunable";

    let (off, _) = memory_store(KnowledgeConfig::default()).await;
    let report = off.upsert(&[doc, doc], NS).await.unwrap();
    assert_eq!(report.inserted, 2);

    let (on, _) =
        memory_store(KnowledgeConfig::default().with_batch_dedup(BatchDedup::WithinBatch)).await;
    let report = on.upsert(&[doc, doc], NS).await.unwrap();
    assert_eq!(report.inserted, 1);
    assert_eq!(report.duplicates, 1);
    assert_eq!(on.count(NS).await.unwrap(), 1);
}

#[tokio::test]
async fn failed_dedup_query_skips_only_that_document() {
    let index = Arc::new(FlakyIndex {
        inner: InMemoryIndex::new(),
        fail_next: AtomicUsize::new(1),
    });
    let store = KnowledgeStore::new(
        Arc::new(HashingEmbedder::new(DIM)),
        index.clone(),
        KnowledgeConfig::default(),
    )
    .await
    .unwrap();

    let report = store.upsert(&BOOTSTRAP_DOCS[..3], NS).await.unwrap();
    assert_eq!(
        report,
        UpsertReport {
            submitted: 3,
            inserted: 2,
            duplicates: 0,
            failed: 1
        }
    );
    assert_eq!(index.count(NS).await.unwrap(), 2);

    // The skipped document is picked up on the next attempt.
    let retry = store.upsert(&BOOTSTRAP_DOCS[..3], NS).await.unwrap();
    assert_eq!(retry.inserted, 1);
    assert_eq!(retry.duplicates, 2);
}

#[tokio::test]
async fn embedding_failure_aborts_without_writes() {
    let index = Arc::new(InMemoryIndex::new());
    let store = KnowledgeStore::new(
        Arc::new(BrokenEmbedder),
        index.clone(),
        KnowledgeConfig::default(),
    )
    .await
    .unwrap();

    let err = store.upsert(&BOOTSTRAP_DOCS, NS).await.unwrap_err();
    assert!(matches!(err, KnowledgeError::Embedding(_)));
    assert_eq!(index.count(NS).await.unwrap(), 0);
    assert!(store.retrieve("XAS", 3, NS).await.is_err());
}

#[tokio::test]
async fn short_embedding_batch_is_rejected() {
    let store = KnowledgeStore::new(
        Arc::new(ShortEmbedder),
        Arc::new(InMemoryIndex::new()),
        KnowledgeConfig::default(),
    )
    .await
    .unwrap();

    let err = store.upsert(&["a", "b"], NS).await.unwrap_err();
    assert_eq!(
        err,
        KnowledgeError::EmbeddingCountMismatch {
            expected: 2,
            got: 1
        }
    );
}

#[tokio::test]
async fn empty_batch_is_a_no_op() {
    let (store, _) = memory_store(KnowledgeConfig::default()).await;
    let report = store.upsert::<&str>(&[], NS).await.unwrap();
    assert_eq!(report, UpsertReport::default());
}

#[tokio::test]
async fn disabled_store_returns_nothing() {
    let store = KnowledgeStore::disabled("no credentials", KnowledgeConfig::default());
    assert!(!store.is_enabled());
    assert_eq!(store.disabled_reason(), Some("no credentials"));

    assert!(store.retrieve("XAS", 3, NS).await.unwrap().is_empty());
    let report = store.upsert(&BOOTSTRAP_DOCS, NS).await.unwrap();
    assert_eq!(report.submitted, 4);
    assert_eq!(report.inserted, 0);
    assert_eq!(store.count(NS).await.unwrap(), 0);
}

#[tokio::test]
async fn connect_without_credentials_is_disabled() {
    let store = KnowledgeStore::connect(
        &SemanticConfig::default(),
        &BackendConfig::in_memory(),
        KnowledgeConfig::default(),
    )
    .await;
    assert!(!store.is_enabled());
    assert!(store.disabled_reason().is_some());

    let store = KnowledgeStore::connect(
        &SemanticConfig::fast(64),
        &BackendConfig::pinecone(""),
        KnowledgeConfig::default(),
    )
    .await;
    assert!(!store.is_enabled());
}

#[tokio::test]
async fn connect_in_fast_mode_is_enabled() {
    let store = KnowledgeStore::connect(
        &SemanticConfig::fast(64),
        &BackendConfig::in_memory(),
        KnowledgeConfig::default(),
    )
    .await;
    assert!(store.is_enabled());
    store.bootstrap().await.unwrap();
    assert_eq!(store.count(NS).await.unwrap(), 4);
}

#[tokio::test]
async fn invalid_config_is_rejected_by_new() {
    let err = KnowledgeStore::new(
        Arc::new(HashingEmbedder::new(DIM)),
        Arc::new(InMemoryIndex::new()),
        KnowledgeConfig::default().with_dedup_threshold(2.0),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, KnowledgeError::InvalidConfig(_)));
}

#[tokio::test]
async fn non_cosine_metric_is_rejected_before_touching_the_index() {
    let index = Arc::new(InMemoryIndex::new());
    let cfg = KnowledgeConfig {
        metric: Metric::Euclidean,
        ..Default::default()
    };
    let err = KnowledgeStore::new(Arc::new(HashingEmbedder::new(DIM)), index.clone(), cfg)
        .await
        .unwrap_err();
    assert!(matches!(err, KnowledgeError::InvalidConfig(_)));
    assert_eq!(index.count(NS).await.unwrap(), 0);
}

#[tokio::test]
async fn connect_with_non_cosine_metric_is_disabled() {
    let store = KnowledgeStore::connect(
        &SemanticConfig::fast(64),
        &BackendConfig::in_memory(),
        KnowledgeConfig {
            metric: Metric::DotProduct,
            ..Default::default()
        },
    )
    .await;
    assert!(!store.is_enabled());
    assert!(store.retrieve("beam damage", 3, NS).await.unwrap().is_empty());
}

#[tokio::test]
async fn punctuation_only_docs_are_deduplicated() {
    let (store, _) = memory_store(KnowledgeConfig::default()).await;
    let docs = ["--- ??? ---"];

    let first = store.upsert(&docs, NS).await.unwrap();
    assert_eq!(first.inserted, 1);

    let second = store.upsert(&docs, NS).await.unwrap();
    assert_eq!(second.inserted, 0);
    assert_eq!(second.duplicates, 1);
    assert_eq!(store.count(NS).await.unwrap(), 1);
}
