use async_trait::async_trait;
use uuid::Uuid;

use crate::error::EngineResult;
use crate::models::{
    CatalogItem, ContentType, NewCatalogItem, NewInteraction, NewRating, Rating, ScoredItem,
};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryCatalogStore;
pub use postgres::{create_pool, PgCatalogStore};

/// Persistence boundary for catalog items, interactions and ratings.
///
/// The sync pipeline is the sole writer of catalog items; the recommendation
/// path is a read-only consumer of items and ratings. All writes are keyed so
/// that repeating them is safe.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Insert-or-update keyed on (content type, source id). Returns the
    /// stored item carrying its immutable internal id.
    async fn upsert_item(&self, item: &NewCatalogItem) -> EngineResult<CatalogItem>;

    /// Number of stored items of one content type.
    async fn count_items(&self, content_type: ContentType) -> EngineResult<u64>;

    /// Fetch items by internal id. Unknown ids are silently absent.
    async fn items_by_ids(&self, ids: &[Uuid]) -> EngineResult<Vec<CatalogItem>>;

    /// Items of `content_type` whose cosine similarity to `embedding` is
    /// strictly above `threshold`, descending, at most `limit`.
    async fn similarity_search(
        &self,
        content_type: ContentType,
        embedding: &[f32],
        threshold: f32,
        limit: usize,
    ) -> EngineResult<Vec<ScoredItem>>;

    /// Append one interaction record.
    async fn insert_interaction(&self, interaction: &NewInteraction) -> EngineResult<()>;

    /// Insert-or-revise a rating keyed on (user, item, item type).
    async fn upsert_rating(&self, rating: &NewRating) -> EngineResult<()>;

    /// All rating records, for the popularity and collaborative paths.
    async fn all_ratings(&self) -> EngineResult<Vec<Rating>>;
}
