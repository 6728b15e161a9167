use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use index::BackendConfig;
use semantic::SemanticConfig;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::{KnowledgeConfig, KnowledgeStore};

/// Produces the store on first use.
pub type StoreFactory = Box<dyn Fn() -> BoxFuture<'static, KnowledgeStore> + Send + Sync>;

/// Everything [`KnowledgeStore::connect`] needs.
#[derive(Debug, Clone, Default)]
pub struct StoreSettings {
    pub semantic: SemanticConfig,
    pub backend: BackendConfig,
    pub knowledge: KnowledgeConfig,
}

/// Process-wide handle that builds the knowledge store lazily, exactly once.
///
/// Concurrent first callers all wait on the same initialisation. When
/// bootstrapping is on, the configured documents are loaded during that
/// initialisation, before any caller sees the store.
pub struct SharedStore {
    cell: OnceCell<Arc<KnowledgeStore>>,
    factory: Option<StoreFactory>,
    bootstrap: bool,
}

impl SharedStore {
    /// Connect from settings on first use, then load the bootstrap documents.
    pub fn from_settings(settings: StoreSettings) -> Self {
        Self::with_factory(move || {
            let settings = settings.clone();
            async move {
                KnowledgeStore::connect(&settings.semantic, &settings.backend, settings.knowledge)
                    .await
            }
        })
    }

    /// Build the store with `factory` on first use, then load the bootstrap
    /// documents.
    pub fn with_factory<F, Fut>(factory: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = KnowledgeStore> + Send + 'static,
    {
        Self {
            cell: OnceCell::new(),
            factory: Some(Box::new(move || factory().boxed())),
            bootstrap: true,
        }
    }

    /// Wrap an already-built store. No bootstrap is performed.
    pub fn from_store(store: KnowledgeStore) -> Self {
        Self {
            cell: OnceCell::new_with(Some(Arc::new(store))),
            factory: None,
            bootstrap: false,
        }
    }

    pub fn without_bootstrap(mut self) -> Self {
        self.bootstrap = false;
        self
    }

    /// The store, initialising it if this is the first call.
    pub async fn get(&self) -> Arc<KnowledgeStore> {
        self.cell
            .get_or_init(|| async {
                let store = match &self.factory {
                    Some(factory) => factory().await,
                    None => KnowledgeStore::disabled(
                        "no store factory configured",
                        KnowledgeConfig::default(),
                    ),
                };
                if self.bootstrap && store.is_enabled() {
                    match store.bootstrap().await {
                        Ok(report) => info!(
                            inserted = report.inserted,
                            duplicates = report.duplicates,
                            failed = report.failed,
                            "bootstrap documents loaded"
                        ),
                        Err(err) => warn!(error = %err, "bootstrap failed; continuing"),
                    }
                }
                Arc::new(store)
            })
            .await
            .clone()
    }

    /// The store if it has already been initialised.
    pub fn get_if_initialized(&self) -> Option<Arc<KnowledgeStore>> {
        self.cell.get().cloned()
    }
}
