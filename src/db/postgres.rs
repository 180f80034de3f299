use async_trait::async_trait;
use pgvector::Vector;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::db::CatalogStore;
use crate::error::{EngineError, EngineResult};
use crate::models::{
    CatalogItem, ContentType, NewCatalogItem, NewInteraction, NewRating, Rating, ScoredItem,
};

/// Creates a PostgreSQL connection pool
///
/// Establishes a pool of database connections for efficient reuse.
/// The pool automatically manages connection lifecycle and limits.
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// PostgreSQL-backed catalog store using pgvector for similarity queries.
#[derive(Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_item(row: &PgRow) -> Result<CatalogItem, sqlx::Error> {
    let content_type: String = row.try_get("content_type")?;
    let content_type = content_type
        .parse::<ContentType>()
        .map_err(|e| sqlx::Error::Decode(e.to_string().into()))?;
    let embedding: Vector = row.try_get("embedding")?;

    Ok(CatalogItem {
        id: row.try_get("id")?,
        content_type,
        source_id: row.try_get("source_id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        authors: row.try_get("authors")?,
        categories: row.try_get("categories")?,
        language: row.try_get("language")?,
        released: row.try_get("released")?,
        image_url: row.try_get("image_url")?,
        embedding: embedding.to_vec(),
    })
}

fn row_to_rating(row: &PgRow) -> Result<Rating, sqlx::Error> {
    let item_type: String = row.try_get("item_type")?;
    let item_type = item_type
        .parse::<ContentType>()
        .map_err(|e| sqlx::Error::Decode(e.to_string().into()))?;

    Ok(Rating {
        user_id: row.try_get("user_id")?,
        item_id: row.try_get("item_id")?,
        item_type,
        rating: row.try_get("rating")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn upsert_item(&self, item: &NewCatalogItem) -> EngineResult<CatalogItem> {
        let row = sqlx::query(
            r#"
            INSERT INTO catalog_items
                (content_type, source_id, title, description, authors, categories,
                 language, released, image_url, embedding)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (content_type, source_id) DO UPDATE SET
                title = EXCLUDED.title,
                description = EXCLUDED.description,
                authors = EXCLUDED.authors,
                categories = EXCLUDED.categories,
                language = EXCLUDED.language,
                released = EXCLUDED.released,
                image_url = EXCLUDED.image_url,
                embedding = EXCLUDED.embedding,
                updated_at = now()
            RETURNING id, content_type, source_id, title, description, authors,
                      categories, language, released, image_url, embedding
            "#,
        )
        .bind(item.content_type.to_string())
        .bind(&item.source_id)
        .bind(&item.title)
        .bind(&item.description)
        .bind(&item.authors)
        .bind(&item.categories)
        .bind(&item.language)
        .bind(&item.released)
        .bind(&item.image_url)
        .bind(Vector::from(item.embedding.clone()))
        .fetch_one(&self.pool)
        .await?;

        Ok(row_to_item(&row)?)
    }

    async fn count_items(&self, content_type: ContentType) -> EngineResult<u64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM catalog_items WHERE content_type = $1")
                .bind(content_type.to_string())
                .fetch_one(&self.pool)
                .await?;

        Ok(count as u64)
    }

    async fn items_by_ids(&self, ids: &[Uuid]) -> EngineResult<Vec<CatalogItem>> {
        let rows = sqlx::query(
            r#"
            SELECT id, content_type, source_id, title, description, authors,
                   categories, language, released, image_url, embedding
            FROM catalog_items
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        let mut items = Vec::with_capacity(rows.len());
        for row in &rows {
            items.push(row_to_item(row).map_err(EngineError::from)?);
        }
        Ok(items)
    }

    async fn similarity_search(
        &self,
        content_type: ContentType,
        embedding: &[f32],
        threshold: f32,
        limit: usize,
    ) -> EngineResult<Vec<ScoredItem>> {
        let query_vector = Vector::from(embedding.to_vec());

        // `<=>` is pgvector cosine distance; similarity = 1 - distance.
        let rows = sqlx::query(
            r#"
            SELECT id, content_type, source_id, title, description, authors,
                   categories, language, released, image_url, embedding,
                   1 - (embedding <=> $1) AS similarity
            FROM catalog_items
            WHERE content_type = $2
              AND 1 - (embedding <=> $1) > $3
            ORDER BY embedding <=> $1
            LIMIT $4
            "#,
        )
        .bind(query_vector)
        .bind(content_type.to_string())
        .bind(threshold as f64)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut results = Vec::with_capacity(rows.len());
        for row in &rows {
            let similarity: f64 = row.try_get("similarity").map_err(EngineError::from)?;
            results.push(ScoredItem {
                item: row_to_item(row).map_err(EngineError::from)?,
                similarity: similarity as f32,
            });
        }
        Ok(results)
    }

    async fn insert_interaction(&self, interaction: &NewInteraction) -> EngineResult<()> {
        sqlx::query(
            r#"
            INSERT INTO interactions (user_id, item_id, item_type, interaction_type)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(interaction.user_id)
        .bind(interaction.item_id)
        .bind(interaction.item_type.to_string())
        .bind(interaction.kind.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn upsert_rating(&self, rating: &NewRating) -> EngineResult<()> {
        sqlx::query(
            r#"
            INSERT INTO ratings (user_id, item_id, item_type, rating)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, item_id, item_type) DO UPDATE SET
                rating = EXCLUDED.rating,
                created_at = now()
            "#,
        )
        .bind(rating.user_id)
        .bind(rating.item_id)
        .bind(rating.item_type.to_string())
        .bind(rating.rating)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn all_ratings(&self) -> EngineResult<Vec<Rating>> {
        let rows = sqlx::query(
            "SELECT user_id, item_id, item_type, rating, created_at FROM ratings",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut ratings = Vec::with_capacity(rows.len());
        for row in &rows {
            ratings.push(row_to_rating(row).map_err(EngineError::from)?);
        }
        Ok(ratings)
    }
}
