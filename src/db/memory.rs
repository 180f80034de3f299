//! In-memory [`CatalogStore`] implementation for tests and local experiments.
//!
//! Uses `HashMap` and `Vec` behind `std::sync::RwLock` for thread safety.
//! Similarity search is brute-force cosine over all stored embeddings, so it
//! matches the Postgres/pgvector semantics without a database.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::db::CatalogStore;
use crate::error::{EngineError, EngineResult};
use crate::models::{
    CatalogItem, ContentType, Interaction, NewCatalogItem, NewInteraction, NewRating, Rating,
    ScoredItem,
};
use crate::services::similarity::cosine_similarity;

/// In-memory catalog store.
#[derive(Default)]
pub struct InMemoryCatalogStore {
    items: RwLock<HashMap<(ContentType, String), CatalogItem>>,
    interactions: RwLock<Vec<Interaction>>,
    ratings: RwLock<HashMap<(Uuid, Uuid, ContentType), Rating>>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded interactions, in insertion order.
    pub fn interactions(&self) -> Vec<Interaction> {
        self.interactions
            .read()
            .map(|interactions| interactions.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn upsert_item(&self, item: &NewCatalogItem) -> EngineResult<CatalogItem> {
        let key = (item.content_type, item.source_id.clone());
        let mut items = self
            .items
            .write()
            .map_err(|_| EngineError::Store("items lock poisoned".to_string()))?;

        // Keep the internal id stable across upserts of the same source id.
        let id = items.get(&key).map(|existing| existing.id).unwrap_or_else(Uuid::new_v4);

        let stored = CatalogItem {
            id,
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
        };
        items.insert(key, stored.clone());
        Ok(stored)
    }

    async fn count_items(&self, content_type: ContentType) -> EngineResult<u64> {
        let items = self
            .items
            .read()
            .map_err(|_| EngineError::Store("items lock poisoned".to_string()))?;
        Ok(items.keys().filter(|(ct, _)| *ct == content_type).count() as u64)
    }

    async fn items_by_ids(&self, ids: &[Uuid]) -> EngineResult<Vec<CatalogItem>> {
        let items = self
            .items
            .read()
            .map_err(|_| EngineError::Store("items lock poisoned".to_string()))?;
        Ok(items
            .values()
            .filter(|item| ids.contains(&item.id))
            .cloned()
            .collect())
    }

    async fn similarity_search(
        &self,
        content_type: ContentType,
        embedding: &[f32],
        threshold: f32,
        limit: usize,
    ) -> EngineResult<Vec<ScoredItem>> {
        let items = self
            .items
            .read()
            .map_err(|_| EngineError::Store("items lock poisoned".to_string()))?;

        let mut scored: Vec<ScoredItem> = items
            .values()
            .filter(|item| item.content_type == content_type)
            .map(|item| ScoredItem {
                similarity: cosine_similarity(embedding, &item.embedding),
                item: item.clone(),
            })
            .filter(|scored| scored.similarity > threshold)
            .collect();

        scored.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(limit);
        Ok(scored)
    }

    async fn insert_interaction(&self, interaction: &NewInteraction) -> EngineResult<()> {
        let mut interactions = self
            .interactions
            .write()
            .map_err(|_| EngineError::Store("interactions lock poisoned".to_string()))?;
        interactions.push(Interaction {
            user_id: interaction.user_id,
            item_id: interaction.item_id,
            item_type: interaction.item_type,
            kind: interaction.kind,
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn upsert_rating(&self, rating: &NewRating) -> EngineResult<()> {
        let mut ratings = self
            .ratings
            .write()
            .map_err(|_| EngineError::Store("ratings lock poisoned".to_string()))?;
        ratings.insert(
            (rating.user_id, rating.item_id, rating.item_type),
            Rating {
                user_id: rating.user_id,
                item_id: rating.item_id,
                item_type: rating.item_type,
                rating: rating.rating,
                created_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn all_ratings(&self) -> EngineResult<Vec<Rating>> {
        let ratings = self
            .ratings
            .read()
            .map_err(|_| EngineError::Store("ratings lock poisoned".to_string()))?;
        Ok(ratings.values().cloned().collect())
    }
}
