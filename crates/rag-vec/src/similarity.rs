//! Brute-force similarity shared by the stores that rank in process.

use rag_types::{VecSearchHit, VecStoreItem};
use std::collections::HashMap;

/// Cosine similarity; mismatched, empty, or zero vectors score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| (*x as f64) * (*y as f64)).sum();
    let na: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let nb: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na * nb)
}

/// Every filter key must be present in `metadata` with an equal value.
pub fn matches_filter(
    metadata: &HashMap<String, serde_json::Value>,
    filter: Option<&HashMap<String, serde_json::Value>>,
) -> bool {
    filter
        .map(|f| f.iter().all(|(k, v)| metadata.get(k) == Some(v)))
        .unwrap_or(true)
}

/// Score, sort (most similar first, ties by id), and keep the top `top_k`.
pub fn rank(
    items: impl IntoIterator<Item = VecStoreItem>,
    query_vector: &[f32],
    top_k: usize,
    filter: Option<&HashMap<String, serde_json::Value>>,
) -> Vec<VecSearchHit> {
    let mut candidates: Vec<(VecStoreItem, f64)> = items
        .into_iter()
        .filter(|i| matches_filter(&i.metadata, filter))
        .map(|i| {
            let score = cosine_similarity(query_vector, &i.vector);
            (i, score)
        })
        .collect();
    candidates.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.id.cmp(&b.0.id))
    });
    candidates
        .into_iter()
        .take(top_k)
        .map(|(i, score)| i.into_hit(score))
        .collect()
}
