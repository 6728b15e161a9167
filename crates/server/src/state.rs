use crate::config::ServerConfig;
use crate::explain::{Explainer, OpenAiExplainer};
use knowledge::SharedStore;
use metrics_exporter_prometheus::PrometheusHandle;
use spectrum::PeakConfig;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    /// Knowledge store, connected and bootstrapped on first use
    pub store: Arc<SharedStore>,

    /// LLM backend; `None` when no OpenAI key is configured
    pub explainer: Option<Arc<dyn Explainer>>,

    /// Peak detection parameters for every analysis request
    pub peak_config: PeakConfig,

    /// Prometheus render handle when metrics are enabled
    pub metrics: Option<PrometheusHandle>,
}

impl ServerState {
    /// Create new server state
    ///
    /// Nothing here touches the network: the store connects lazily and the
    /// explainer only builds an HTTP client.
    pub fn new(config: ServerConfig) -> Self {
        let store = Arc::new(SharedStore::from_settings(config.store_settings()));
        let explainer = config.openai_key().and_then(|key| {
            match OpenAiExplainer::new(
                config.openai_base_url.clone(),
                config.openai_model.clone(),
                key,
                config.timeout(),
            ) {
                Ok(explainer) => Some(Arc::new(explainer) as Arc<dyn Explainer>),
                Err(err) => {
                    tracing::warn!(error = %err, "LLM explanations disabled");
                    None
                }
            }
        });
        if explainer.is_none() {
            tracing::warn!("no OpenAI key configured, LLM texts will use fallbacks");
        }
        Self::with_components(config, store, explainer)
    }

    /// Assemble state from prebuilt parts.
    pub fn with_components(
        config: ServerConfig,
        store: Arc<SharedStore>,
        explainer: Option<Arc<dyn Explainer>>,
    ) -> Self {
        Self {
            peak_config: config.peak_config(),
            config: Arc::new(config),
            store,
            explainer,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    pub fn explainer(&self) -> Option<&dyn Explainer> {
        self.explainer.as_deref()
    }
}
