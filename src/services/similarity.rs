use std::sync::Arc;

use crate::db::CatalogStore;
use crate::error::EngineResult;
use crate::models::{ContentType, ScoredItem};
use crate::services::embedding::Embedder;

/// Default similarity floor for semantic search.
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.4;
pub const DEFAULT_SEARCH_LIMIT: usize = 12;

/// Cosine similarity between two vectors, 0.0 for degenerate input.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a < f32::EPSILON || mag_b < f32::EPSILON {
        0.0
    } else {
        dot / (mag_a * mag_b)
    }
}

/// Semantic search over the catalog.
///
/// Returns items of the requested type whose similarity clears the threshold,
/// descending, at most `limit`. Zero matches is an empty sequence, never an
/// error; the serving layer may use that to fall back to a live source
/// lookup.
pub struct SimilaritySearch {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn CatalogStore>,
}

impl SimilaritySearch {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn CatalogStore>) -> Self {
        Self { embedder, store }
    }

    /// Embeds the query text, then searches by vector.
    pub async fn search_text(
        &self,
        query: &str,
        content_type: ContentType,
        threshold: f32,
        limit: usize,
    ) -> EngineResult<Vec<ScoredItem>> {
        let embedding = self.embedder.embed(query).await?;
        self.search_embedding(&embedding, content_type, threshold, limit)
            .await
    }

    pub async fn search_embedding(
        &self,
        embedding: &[f32],
        content_type: ContentType,
        threshold: f32,
        limit: usize,
    ) -> EngineResult<Vec<ScoredItem>> {
        let results = self
            .store
            .similarity_search(content_type, embedding, threshold, limit)
            .await?;

        tracing::debug!(
            content_type = %content_type,
            threshold,
            results = results.len(),
            "similarity search completed"
        );

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_identical_vectors() {
        let v = vec![0.3, 0.5, 0.2];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal_vectors() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_opposite_vectors() {
        let a = vec![1.0, 0.0];
        let b = vec![-1.0, 0.0];
        assert!((cosine_similarity(&a, &b) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_degenerate_input() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }
}
