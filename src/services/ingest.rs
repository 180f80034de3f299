use std::sync::Arc;

use crate::db::CatalogStore;
use crate::error::EngineResult;
use crate::models::{CandidateRecord, CatalogEntry, CatalogItem, NewCatalogItem};
use crate::services::embedding::Embedder;

/// Upper bound on the text handed to the embedding model, to bound per-item
/// embedding cost.
pub const EMBED_TEXT_MAX_CHARS: usize = 2000;

/// Builds the embedding input for a candidate, truncated to the cap.
pub fn embedding_text(record: &CandidateRecord) -> String {
    let text = record.embedding_text();
    if text.chars().count() <= EMBED_TEXT_MAX_CHARS {
        text
    } else {
        text.chars().take(EMBED_TEXT_MAX_CHARS).collect()
    }
}

/// Embeds and persists deduplicated candidates.
///
/// Failures here are per-item: the orchestrator counts them and moves on,
/// except for a store-unreachable condition which aborts the run.
pub struct Ingestor {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn CatalogStore>,
}

impl Ingestor {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn CatalogStore>) -> Self {
        Self { embedder, store }
    }

    /// Embeds one candidate and upserts it keyed on (content type, source id).
    /// Re-running for the same source id overwrites all fields and keeps the
    /// internal id, which is what makes whole-pipeline re-runs safe.
    pub async fn persist(&self, record: &CandidateRecord) -> EngineResult<CatalogItem> {
        let text = embedding_text(record);
        let embedding = self.embedder.embed(&text).await?;
        let item = NewCatalogItem::from_candidate(record, embedding);
        self.store.upsert_item(&item).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MockCatalogStore;
    use crate::error::EngineError;
    use crate::models::{ContentType, MovieCandidate};
    use crate::services::embedding::MockEmbedder;
    use uuid::Uuid;

    fn candidate(overview: &str) -> CandidateRecord {
        CandidateRecord::Movie(MovieCandidate {
            tmdb_id: 7,
            title: "Lagaan".to_string(),
            overview: overview.to_string(),
            release_date: None,
            language: Some("hi".to_string()),
            origin_country: vec!["IN".to_string()],
            poster_url: None,
        })
    }

    #[test]
    fn test_embedding_text_truncated_to_cap() {
        let record = candidate(&"x".repeat(5000));
        let text = embedding_text(&record);
        assert_eq!(text.chars().count(), EMBED_TEXT_MAX_CHARS);
    }

    #[test]
    fn test_embedding_text_short_is_untouched() {
        let record = candidate("A village cricket match.");
        assert_eq!(embedding_text(&record), "Lagaan. A village cricket match.");
    }

    #[tokio::test]
    async fn test_persist_embeds_then_upserts() {
        let mut embedder = MockEmbedder::new();
        embedder
            .expect_embed()
            .returning(|_| Ok(vec![0.1, 0.2, 0.3]));

        let mut store = MockCatalogStore::new();
        store.expect_upsert_item().returning(|item| {
            assert_eq!(item.embedding, vec![0.1, 0.2, 0.3]);
            Ok(CatalogItem {
                id: Uuid::new_v4(),
                content_type: item.content_type,
                source_id: item.source_id.clone(),
                title: item.title.clone(),
                description: item.description.clone(),
                authors: item.authors.clone(),
                categories: item.categories.clone(),
                language: item.language.clone(),
                released: item.released.clone(),
                image_url: item.image_url.clone(),
                embedding: item.embedding.clone(),
            })
        });

        let ingestor = Ingestor::new(Arc::new(embedder), Arc::new(store));
        let item = ingestor.persist(&candidate("overview")).await.unwrap();
        assert_eq!(item.content_type, ContentType::Movie);
        assert_eq!(item.source_id, "7");
    }

    #[tokio::test]
    async fn test_persist_surfaces_embedding_error() {
        let mut embedder = MockEmbedder::new();
        embedder
            .expect_embed()
            .returning(|_| Err(EngineError::Embedding("empty".to_string())));

        let mut store = MockCatalogStore::new();
        store.expect_upsert_item().never();

        let ingestor = Ingestor::new(Arc::new(embedder), Arc::new(store));
        let err = ingestor.persist(&candidate("overview")).await.unwrap_err();
        assert!(matches!(err, EngineError::Embedding(_)));
    }
}
