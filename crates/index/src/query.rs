use std::cmp::Ordering;

use crate::{Metric, QueryMatch};

/// Chunk size for auto-vectorized loops.
const SIMD_CHUNK_SIZE: usize = 32;

/// Cosine similarity in `[-1, 1]`.
///
/// Returns 0.0 for empty or mismatched inputs and when either side is the
/// zero vector.
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0f32;
    let mut norm_a = 0f32;
    let mut norm_b = 0f32;

    let mut chunks_a = a.chunks_exact(SIMD_CHUNK_SIZE);
    let mut chunks_b = b.chunks_exact(SIMD_CHUNK_SIZE);
    for (ca, cb) in (&mut chunks_a).zip(&mut chunks_b) {
        let (d, na, nb) = accumulate(ca, cb);
        dot += d;
        norm_a += na;
        norm_b += nb;
    }
    let (d, na, nb) = accumulate(chunks_a.remainder(), chunks_b.remainder());
    dot += d;
    norm_a += na;
    norm_b += nb;

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0)
}

#[inline(always)]
fn accumulate(a: &[f32], b: &[f32]) -> (f32, f32, f32) {
    a.iter()
        .zip(b)
        .fold((0.0, 0.0, 0.0), |(d, na, nb), (&x, &y)| {
            (d + x * y, na + x * x, nb + y * y)
        })
}

pub(crate) fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

pub(crate) fn squared_euclidean(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

pub(crate) fn score(metric: Metric, a: &[f32], b: &[f32]) -> f32 {
    match metric {
        Metric::Cosine => cosine_similarity(a, b),
        Metric::DotProduct => dot_product(a, b),
        Metric::Euclidean => squared_euclidean(a, b),
    }
}

/// Sort best-first for `metric`, ties broken by id, and keep `top_k`.
pub fn rank_matches(mut matches: Vec<QueryMatch>, metric: Metric, top_k: usize) -> Vec<QueryMatch> {
    matches.sort_by(|a, b| {
        let by_score = if metric.higher_is_better() {
            b.score.partial_cmp(&a.score)
        } else {
            a.score.partial_cmp(&b.score)
        };
        by_score
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    matches.truncate(top_k);
    matches
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(id: &str, score: f32) -> QueryMatch {
        QueryMatch {
            id: id.into(),
            score,
            metadata: None,
        }
    }

    #[test]
    fn identical_vectors_score_one() {
        let v: Vec<f32> = (0..100).map(|i| (i as f32 * 0.37).sin()).collect();
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn opposite_and_orthogonal() {
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 3.0]), 0.0);
    }

    #[test]
    fn degenerate_inputs_score_zero() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn chunked_sum_matches_plain_sum_across_boundary() {
        let a: Vec<f32> = (0..70).map(|i| i as f32 * 0.1).collect();
        let b: Vec<f32> = (0..70).map(|i| 7.0 - i as f32 * 0.1).collect();
        let dot: f32 = a.iter().zip(&b).map(|(x, y)| x * y).sum();
        let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((cosine_similarity(&a, &b) - dot / (na * nb)).abs() < 1e-4);
    }

    #[test]
    fn ranking_is_descending_with_id_tiebreak() {
        let ranked = rank_matches(
            vec![hit("c", 0.5), hit("b", 0.9), hit("a", 0.5), hit("d", 0.1)],
            Metric::Cosine,
            3,
        );
        let ids: Vec<_> = ranked.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[test]
    fn euclidean_ranks_smallest_distance_first() {
        let ranked = rank_matches(vec![hit("far", 4.0), hit("near", 0.5)], Metric::Euclidean, 2);
        assert_eq!(ranked[0].id, "near");
    }
}
