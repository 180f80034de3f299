use std::sync::Arc;

use uuid::Uuid;

use crate::db::CatalogStore;
use crate::error::{EngineError, EngineResult};
use crate::models::{NewInteraction, NewRating, TrackOutcome};

/// Validates and records user interactions and ratings.
pub struct InteractionTracker {
    store: Arc<dyn CatalogStore>,
}

impl InteractionTracker {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    /// Records one interaction. Invalid input is a hard validation error; a
    /// store failure after validation degrades to a warning outcome so a
    /// tracking hiccup never breaks the caller's request.
    pub async fn track(
        &self,
        user_id: Uuid,
        item_id: Uuid,
        item_type: &str,
        kind: &str,
    ) -> EngineResult<TrackOutcome> {
        let interaction = NewInteraction::parse(user_id, item_id, item_type, kind)?;

        match self.store.insert_interaction(&interaction).await {
            Ok(()) => Ok(TrackOutcome::Tracked),
            Err(e) => {
                tracing::warn!(
                    user_id = %user_id,
                    item_id = %item_id,
                    error = %e,
                    "interaction write failed"
                );
                Ok(TrackOutcome::TrackedWithWarning(e.to_string()))
            }
        }
    }

    /// Records or revises a rating. Both validation and store failures are
    /// hard errors here: a lost rating would silently skew recommendations.
    pub async fn rate(
        &self,
        user_id: Uuid,
        item_id: Uuid,
        item_type: &str,
        rating: f32,
    ) -> EngineResult<()> {
        let rating = NewRating::parse(user_id, item_id, item_type, rating)?;
        self.store.upsert_rating(&rating).await
    }
}
