use async_trait::async_trait;
use fxhash::hash64;

use crate::normalize::l2_normalize_in_place;
use crate::{EmbeddingProvider, SemanticConfig, SemanticError};

/// Deterministic local embedder used in `"fast"` mode.
///
/// Each lower-cased alphanumeric token is hashed into one of `dimension`
/// buckets with a hash-derived sign (the "hashing trick"). Texts sharing
/// vocabulary land close together, identical texts produce identical vectors,
/// and no network or model files are involved. Text without tokens is hashed
/// whole after trimming, so only empty or whitespace-only text maps to the
/// zero vector.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    model_name: String,
    dimension: usize,
    normalize: bool,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            model_name: "feature-hash".into(),
            dimension: dimension.max(1),
            normalize: true,
        }
    }

    pub fn from_config(cfg: &SemanticConfig) -> Self {
        Self {
            model_name: cfg.model_name.clone(),
            dimension: cfg.dimension.max(1),
            normalize: cfg.normalize,
        }
    }

    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dimension];
        let buckets = self.dimension as u64;
        let mut bump = |bytes: &[u8]| {
            let h = hash64(bytes);
            let sign = if h >> 63 == 0 { 1.0 } else { -1.0 };
            v[(h % buckets) as usize] += sign;
        };
        let mut tokens = 0usize;
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            bump(token.to_lowercase().as_bytes());
            tokens += 1;
        }
        // Punctuation-only text still needs a direction so identical inputs dedup.
        let trimmed = text.trim();
        if tokens == 0 && !trimmed.is_empty() {
            bump(trimmed.as_bytes());
        }
        if self.normalize {
            l2_normalize_in_place(&mut v);
        }
        v
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, SemanticError> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn same_text_same_vector() {
        let embedder = HashingEmbedder::new(256);
        assert_eq!(
            embedder.embed_one("EXAFS oscillations"),
            embedder.embed_one("EXAFS oscillations")
        );
    }

    #[test]
    fn tokenisation_ignores_case_and_punctuation() {
        let embedder = HashingEmbedder::new(256);
        assert_eq!(
            embedder.embed_one("Near-edge features!"),
            embedder.embed_one("near edge FEATURES")
        );
    }

    #[test]
    fn vectors_are_unit_length() {
        let embedder = HashingEmbedder::new(128);
        let v = embedder.embed_one("synchrotron x-ray sources provide high brightness");
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn shared_vocabulary_scores_higher() {
        let embedder = HashingEmbedder::new(512);
        let query = embedder.embed_one("what do EXAFS oscillations encode");
        let related =
            embedder.embed_one("EXAFS oscillations encode radial distribution of neighbours");
        let unrelated = embedder.embed_one("synchrotron sources provide brightness");
        assert!(cosine(&query, &related) > cosine(&query, &unrelated));
    }

    #[test]
    fn blank_text_is_zero_vector() {
        let embedder = HashingEmbedder::new(16);
        assert!(embedder.embed_one("").iter().all(|&x| x == 0.0));
        assert!(embedder.embed_one(" \t\n ").iter().all(|&x| x == 0.0));
    }

    #[test]
    fn punctuation_only_text_gets_a_stable_direction() {
        let embedder = HashingEmbedder::new(64);
        let a = embedder.embed_one("--- ??? ---");
        assert!(a.iter().any(|&x| x != 0.0));
        assert_eq!(a, embedder.embed_one("  --- ??? ---  "));
        assert!((cosine(&a, &embedder.embed_one("--- ??? ---")) - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn batch_preserves_order_and_dimension() {
        let embedder = HashingEmbedder::new(64);
        let texts = vec!["alpha".to_string(), "beta".to_string(), "gamma".to_string()];
        let vectors = embedder.embed(&texts).await.unwrap();
        assert_eq!(vectors.len(), 3);
        assert!(vectors.iter().all(|v| v.len() == 64));
        assert_eq!(vectors[1], embedder.embed_one("beta"));
    }
}
