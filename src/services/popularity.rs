use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::db::CatalogStore;
use crate::error::EngineResult;
use crate::models::{CatalogItem, ContentType, Rating};

/// A catalog item with its rating aggregate.
#[derive(Debug, Clone, PartialEq)]
pub struct PopularItem {
    pub item: CatalogItem,
    pub avg_rating: f64,
    pub rating_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingAggregate {
    pub item_id: Uuid,
    pub item_type: ContentType,
    pub avg_rating: f64,
    pub rating_count: usize,
}

/// Aggregates ratings per item and ranks by average descending, with rating
/// count descending as the tie-break. An item with one 5.0 rating outranks an
/// item with many ratings averaging lower.
pub fn rank_by_rating(ratings: &[Rating], limit: usize) -> Vec<RatingAggregate> {
    let mut sums: HashMap<(ContentType, Uuid), (f64, usize)> = HashMap::new();
    for rating in ratings {
        let entry = sums.entry((rating.item_type, rating.item_id)).or_default();
        entry.0 += rating.rating as f64;
        entry.1 += 1;
    }

    let mut aggregates: Vec<RatingAggregate> = sums
        .into_iter()
        .map(|((item_type, item_id), (sum, count))| RatingAggregate {
            item_id,
            item_type,
            avg_rating: sum / count as f64,
            rating_count: count,
        })
        .collect();

    aggregates.sort_by(|a, b| {
        b.avg_rating
            .partial_cmp(&a.avg_rating)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(b.rating_count.cmp(&a.rating_count))
    });
    aggregates.truncate(limit);
    aggregates
}

/// Read-only popularity ranking over all stored ratings.
pub struct PopularityRanker {
    store: Arc<dyn CatalogStore>,
}

impl PopularityRanker {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    /// Top `limit` items by rating aggregate, hydrated from the catalog.
    /// Aggregates whose item no longer exists are dropped from the result.
    pub async fn top_rated(&self, limit: usize) -> EngineResult<Vec<PopularItem>> {
        let ratings = self.store.all_ratings().await?;
        let aggregates = rank_by_rating(&ratings, limit);
        if aggregates.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = aggregates.iter().map(|a| a.item_id).collect();
        let items: HashMap<Uuid, CatalogItem> = self
            .store
            .items_by_ids(&ids)
            .await?
            .into_iter()
            .map(|item| (item.id, item))
            .collect();

        Ok(aggregates
            .into_iter()
            .filter_map(|agg| {
                items.get(&agg.item_id).map(|item| PopularItem {
                    item: item.clone(),
                    avg_rating: agg.avg_rating,
                    rating_count: agg.rating_count,
                })
            })
            .collect())
    }
}
