use std::fmt::Display;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::models::ContentType;

pub const MIN_RATING: f32 = 1.0;
pub const MAX_RATING: f32 = 5.0;

/// How a user touched a catalog item.
///
/// Arrives from the serving layer as one of the enumerated strings; numeric
/// codes or unrecognized values are rejected with a validation error rather
/// than coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionKind {
    View,
    Click,
    Search,
    Movie,
    Book,
}

impl Display for InteractionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            InteractionKind::View => "view",
            InteractionKind::Click => "click",
            InteractionKind::Search => "search",
            InteractionKind::Movie => "movie",
            InteractionKind::Book => "book",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for InteractionKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "view" => Ok(InteractionKind::View),
            "click" => Ok(InteractionKind::Click),
            "search" => Ok(InteractionKind::Search),
            "movie" => Ok(InteractionKind::Movie),
            "book" => Ok(InteractionKind::Book),
            other => Err(EngineError::Validation(format!(
                "unknown interaction type '{}', expected one of: view, click, search, movie, book",
                other
            ))),
        }
    }
}

/// A recorded user interaction. Append-only; never mutated by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub user_id: Uuid,
    pub item_id: Uuid,
    pub item_type: ContentType,
    pub kind: InteractionKind,
    pub created_at: DateTime<Utc>,
}

/// A validated interaction ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct NewInteraction {
    pub user_id: Uuid,
    pub item_id: Uuid,
    pub item_type: ContentType,
    pub kind: InteractionKind,
}

impl NewInteraction {
    /// Validates raw string fields from the serving layer into a typed
    /// interaction. Fails fast on anything outside the enumerated values.
    pub fn parse(
        user_id: Uuid,
        item_id: Uuid,
        item_type: &str,
        kind: &str,
    ) -> EngineResult<Self> {
        Ok(NewInteraction {
            user_id,
            item_id,
            item_type: item_type.parse()?,
            kind: kind.parse()?,
        })
    }
}

/// A user's rating of a catalog item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub user_id: Uuid,
    pub item_id: Uuid,
    pub item_type: ContentType,
    pub rating: f32,
    pub created_at: DateTime<Utc>,
}

/// A validated rating ready to be upserted per (user, item, item type).
#[derive(Debug, Clone, PartialEq)]
pub struct NewRating {
    pub user_id: Uuid,
    pub item_id: Uuid,
    pub item_type: ContentType,
    pub rating: f32,
}

impl NewRating {
    pub fn parse(
        user_id: Uuid,
        item_id: Uuid,
        item_type: &str,
        rating: f32,
    ) -> EngineResult<Self> {
        if !(MIN_RATING..=MAX_RATING).contains(&rating) {
            return Err(EngineError::Validation(format!(
                "rating {} out of range, expected {}..={}",
                rating, MIN_RATING, MAX_RATING
            )));
        }
        Ok(NewRating {
            user_id,
            item_id,
            item_type: item_type.parse()?,
            rating,
        })
    }
}

/// Outcome of fire-and-forget interaction tracking.
///
/// A store hiccup on the tracking path is reported as a warning; the serving
/// layer decides whether to surface it, but the engine never fails the caller
/// for a tracking write.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackOutcome {
    Tracked,
    TrackedWithWarning(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interaction_kind_round_trip() {
        for kind in ["view", "click", "search", "movie", "book"] {
            let parsed: InteractionKind = kind.parse().unwrap();
            assert_eq!(format!("{}", parsed), kind);
        }
    }

    #[test]
    fn test_interaction_kind_rejects_unknown() {
        let err = "favorite".parse::<InteractionKind>().unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn test_interaction_kind_rejects_numeric_string() {
        let err = "0".parse::<InteractionKind>().unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn test_interaction_kind_serde_rejects_numeric() {
        // interaction_type = 0 must never be silently stored
        let result: Result<InteractionKind, _> = serde_json::from_value(serde_json::json!(0));
        assert!(result.is_err());
    }

    #[test]
    fn test_new_interaction_parse() {
        let user = Uuid::new_v4();
        let item = Uuid::new_v4();
        let interaction = NewInteraction::parse(user, item, "movie", "view").unwrap();
        assert_eq!(interaction.item_type, ContentType::Movie);
        assert_eq!(interaction.kind, InteractionKind::View);
    }

    #[test]
    fn test_new_interaction_parse_bad_item_type() {
        let err =
            NewInteraction::parse(Uuid::new_v4(), Uuid::new_v4(), "invalid", "view").unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn test_new_rating_bounds() {
        let user = Uuid::new_v4();
        let item = Uuid::new_v4();

        assert!(NewRating::parse(user, item, "book", 1.0).is_ok());
        assert!(NewRating::parse(user, item, "book", 5.0).is_ok());
        assert!(matches!(
            NewRating::parse(user, item, "book", 0.5).unwrap_err(),
            EngineError::Validation(_)
        ));
        assert!(matches!(
            NewRating::parse(user, item, "book", 5.5).unwrap_err(),
            EngineError::Validation(_)
        ));
    }
}
