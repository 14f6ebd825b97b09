//! Similarity primitives shared by the scoring engines and the in-memory
//! vector search.

use std::collections::HashSet;
use std::hash::Hash;

/// Cosine similarity between two dense vectors, clamped to `[0, 1]`.
///
/// Embeddings here represent semantic proximity, not opposition, so
/// negative similarity ranks the same as no similarity. Returns 0.0 when
/// either vector has zero magnitude or the lengths differ.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(0.0, 1.0)
}

/// Jaccard similarity between two sets: `|A ∩ B| / |A ∪ B|`.
///
/// Returns 0.0 when the union is empty (two empty sets carry no signal).
pub fn jaccard_similarity<T: Hash + Eq>(a: &HashSet<T>, b: &HashSet<T>) -> f64 {
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    if union == 0 {
        return 0.0;
    }
    intersection as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_identical_vector_is_one() {
        let v = vec![0.3, 0.7, 0.2];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_zero_vector_is_zero() {
        let v = vec![1.0, 2.0, 3.0];
        let zero = vec![0.0, 0.0, 0.0];
        assert_eq!(cosine_similarity(&v, &zero), 0.0);
        assert_eq!(cosine_similarity(&zero, &v), 0.0);
    }

    #[test]
    fn test_cosine_orthogonal_is_zero() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
    }

    #[test]
    fn test_cosine_negative_clamps_to_zero() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_cosine_length_mismatch_is_zero() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0]), 0.0);
    }

    #[test]
    fn test_jaccard_identical_sets() {
        let a: HashSet<i32> = [1, 2, 3].into_iter().collect();
        assert_eq!(jaccard_similarity(&a, &a), 1.0);
    }

    #[test]
    fn test_jaccard_disjoint_sets() {
        let a: HashSet<i32> = [1, 2].into_iter().collect();
        let b: HashSet<i32> = [3, 4].into_iter().collect();
        assert_eq!(jaccard_similarity(&a, &b), 0.0);
    }

    #[test]
    fn test_jaccard_partial_overlap() {
        let a: HashSet<i32> = [1, 2, 3].into_iter().collect();
        let b: HashSet<i32> = [1, 2, 4].into_iter().collect();
        assert_eq!(jaccard_similarity(&a, &b), 0.5);
    }

    #[test]
    fn test_jaccard_empty_sets() {
        let a: HashSet<i32> = HashSet::new();
        assert_eq!(jaccard_similarity(&a, &a), 0.0);
    }
}
