use index::Metric;
use serde::{Deserialize, Serialize};

use crate::KnowledgeError;

/// Documents loaded into an empty deployment the first time the store is
/// initialised.
pub const BOOTSTRAP_DOCS: [&str; 4] = [
    "X-ray absorption spectroscopy (XAS) probes unoccupied electronic states and local structure.",
    "Near-edge features in XAS can be related to oxidation states and coordination geometry.",
    "Extended X-ray absorption fine structure (EXAFS) oscillations encode radial distribution of neighboring atoms.",
    "Synchrotron X-ray sources provide high brightness and tunable energy for advanced spectroscopy.",
];

/// How duplicates inside a single upsert batch are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchDedup {
    /// Each document is only checked against what is already in the index,
    /// so two near-identical documents in one batch are both inserted.
    #[default]
    Off,
    /// Also compare each document with those already staged from the same
    /// batch, using the same threshold.
    WithinBatch,
}

/// Tuning knobs for [`KnowledgeStore`](crate::KnowledgeStore).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct KnowledgeConfig {
    pub index_name: String,
    /// Namespace used by the `*_default` helpers and bootstrap.
    pub namespace: String,
    /// Must be [`Metric::Cosine`]; dedup and ranking treat scores as
    /// similarities where higher is closer.
    pub metric: Metric,
    /// A document is a duplicate when its nearest stored neighbour scores
    /// strictly above this value.
    pub dedup_threshold: f32,
    pub default_top_k: usize,
    pub batch_dedup: BatchDedup,
    pub bootstrap_docs: Vec<String>,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            index_name: "xray-rag".into(),
            namespace: "default".into(),
            metric: Metric::Cosine,
            dedup_threshold: 0.99,
            default_top_k: 3,
            batch_dedup: BatchDedup::Off,
            bootstrap_docs: BOOTSTRAP_DOCS.iter().map(|d| d.to_string()).collect(),
        }
    }
}

impl KnowledgeConfig {
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_dedup_threshold(mut self, threshold: f32) -> Self {
        self.dedup_threshold = threshold;
        self
    }

    pub fn with_batch_dedup(mut self, policy: BatchDedup) -> Self {
        self.batch_dedup = policy;
        self
    }

    pub fn with_bootstrap_docs(mut self, docs: Vec<String>) -> Self {
        self.bootstrap_docs = docs;
        self
    }

    pub fn validate(&self) -> Result<(), KnowledgeError> {
        if self.index_name.trim().is_empty() {
            return Err(KnowledgeError::InvalidConfig(
                "index_name must not be empty".into(),
            ));
        }
        if !self.dedup_threshold.is_finite() {
            return Err(KnowledgeError::InvalidConfig(format!(
                "dedup_threshold must be finite (got {})",
                self.dedup_threshold
            )));
        }
        if self.metric != Metric::Cosine {
            return Err(KnowledgeError::InvalidConfig(format!(
                "metric must be cosine (got {})",
                self.metric.as_str()
            )));
        }
        if !(-1.0..=1.0).contains(&self.dedup_threshold) {
            return Err(KnowledgeError::InvalidConfig(format!(
                "dedup_threshold {} is outside the cosine range [-1, 1]",
                self.dedup_threshold
            )));
        }
        if self.default_top_k == 0 {
            return Err(KnowledgeError::InvalidConfig(
                "default_top_k must be >= 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = KnowledgeConfig::default();
        assert_eq!(cfg.index_name, "xray-rag");
        assert_eq!(cfg.namespace, "default");
        assert_eq!(cfg.dedup_threshold, 0.99);
        assert_eq!(cfg.default_top_k, 3);
        assert_eq!(cfg.batch_dedup, BatchDedup::Off);
        assert_eq!(cfg.bootstrap_docs.len(), 4);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_threshold_and_zero_k() {
        assert!(KnowledgeConfig::default()
            .with_dedup_threshold(1.5)
            .validate()
            .is_err());
        assert!(KnowledgeConfig::default()
            .with_dedup_threshold(f32::NAN)
            .validate()
            .is_err());
        let cfg = KnowledgeConfig {
            default_top_k: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn only_cosine_metric_is_accepted() {
        for metric in [Metric::Euclidean, Metric::DotProduct] {
            let cfg = KnowledgeConfig {
                metric,
                ..Default::default()
            };
            let err = cfg.validate().unwrap_err();
            assert!(err.to_string().contains(metric.as_str()), "{err}");
        }
    }

    #[test]
    fn deserializes_partial_config() {
        let cfg: KnowledgeConfig =
            serde_json::from_str(r#"{"namespace": "beamline-7", "batch_dedup": "within_batch"}"#)
                .unwrap();
        assert_eq!(cfg.namespace, "beamline-7");
        assert_eq!(cfg.batch_dedup, BatchDedup::WithinBatch);
        assert_eq!(cfg.index_name, "xray-rag");
    }
}
