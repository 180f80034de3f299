use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use uuid::Uuid;

use crate::db::CatalogStore;
use crate::error::EngineResult;
use crate::models::{CatalogItem, ContentType, Rating};

/// Minimum co-rated items before two users are comparable.
pub const MIN_COMMON_ITEMS: usize = 2;
/// Correlation floor for a user to count as a neighbor.
pub const MIN_CORRELATION: f64 = 0.2;
/// Neighborhood size cap.
pub const MAX_SIMILAR_USERS: usize = 50;
/// Candidate items below this plain average across all raters are dropped.
pub const MIN_CANDIDATE_AVG: f64 = 3.0;

/// A neighbor of the target user in rating space.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarUser {
    pub user_id: Uuid,
    pub correlation: f64,
    pub common_items: usize,
}

/// A recommended item with its correlation-weighted rating prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    pub item: CatalogItem,
    pub predicted_rating: f64,
}

/// Pearson correlation of two equal-length samples. `None` when either side
/// has zero variance, where correlation is undefined.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.is_empty() {
        return None;
    }
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs.iter().zip(ys.iter()) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x < f64::EPSILON || var_y < f64::EPSILON {
        return None;
    }
    Some(cov / (var_x.sqrt() * var_y.sqrt()))
}

type ItemKey = (ContentType, Uuid);

/// User-user collaborative filtering over the stored ratings.
///
/// Neighbors are users sharing at least [`MIN_COMMON_ITEMS`] rated items with
/// the target and correlating above [`MIN_CORRELATION`]; predictions are the
/// correlation-weighted average of neighbor ratings on items the target has
/// not rated.
pub struct CollaborativeRecommender {
    store: Arc<dyn CatalogStore>,
}

impl CollaborativeRecommender {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    /// Top `limit` recommendations for `user_id`. A user with no ratings or
    /// no qualifying neighbors gets an empty list, never an error.
    pub async fn recommend(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> EngineResult<Vec<Recommendation>> {
        let ratings = self.store.all_ratings().await?;
        let by_user = group_by_user(&ratings);

        let target = match by_user.get(&user_id) {
            Some(target) if !target.is_empty() => target,
            _ => return Ok(Vec::new()),
        };

        let neighbors = similar_users(user_id, target, &by_user);
        if neighbors.is_empty() {
            tracing::debug!(user_id = %user_id, "no qualifying neighbors");
            return Ok(Vec::new());
        }

        let predictions = predict(target, &neighbors, &by_user, &ratings);
        if predictions.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(ItemKey, f64)> = predictions.into_iter().collect();
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(limit);

        let ids: Vec<Uuid> = scored.iter().map(|((_, id), _)| *id).collect();
        let items: HashMap<Uuid, CatalogItem> = self
            .store
            .items_by_ids(&ids)
            .await?
            .into_iter()
            .map(|item| (item.id, item))
            .collect();

        Ok(scored
            .into_iter()
            .filter_map(|((_, id), predicted_rating)| {
                items.get(&id).map(|item| Recommendation {
                    item: item.clone(),
                    predicted_rating,
                })
            })
            .collect())
    }
}

fn group_by_user(ratings: &[Rating]) -> HashMap<Uuid, HashMap<ItemKey, f64>> {
    let mut by_user: HashMap<Uuid, HashMap<ItemKey, f64>> = HashMap::new();
    for rating in ratings {
        by_user
            .entry(rating.user_id)
            .or_default()
            .insert((rating.item_type, rating.item_id), rating.rating as f64);
    }
    by_user
}

fn similar_users(
    target_id: Uuid,
    target: &HashMap<ItemKey, f64>,
    by_user: &HashMap<Uuid, HashMap<ItemKey, f64>>,
) -> Vec<SimilarUser> {
    let mut neighbors = Vec::new();
    for (other_id, other) in by_user {
        if *other_id == target_id {
            continue;
        }
        let common: Vec<ItemKey> = target
            .keys()
            .filter(|key| other.contains_key(*key))
            .copied()
            .collect();
        if common.len() < MIN_COMMON_ITEMS {
            continue;
        }
        let xs: Vec<f64> = common.iter().map(|key| target[key]).collect();
        let ys: Vec<f64> = common.iter().map(|key| other[key]).collect();
        if let Some(correlation) = pearson(&xs, &ys) {
            if correlation > MIN_CORRELATION {
                neighbors.push(SimilarUser {
                    user_id: *other_id,
                    correlation,
                    common_items: common.len(),
                });
            }
        }
    }
    neighbors.sort_by(|a, b| {
        b.correlation
            .partial_cmp(&a.correlation)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    neighbors.truncate(MAX_SIMILAR_USERS);
    neighbors
}

fn predict(
    target: &HashMap<ItemKey, f64>,
    neighbors: &[SimilarUser],
    by_user: &HashMap<Uuid, HashMap<ItemKey, f64>>,
    all_ratings: &[Rating],
) -> HashMap<ItemKey, f64> {
    // Plain per-item average over every rater, used as a quality floor.
    let mut sums: HashMap<ItemKey, (f64, usize)> = HashMap::new();
    for rating in all_ratings {
        let entry = sums.entry((rating.item_type, rating.item_id)).or_default();
        entry.0 += rating.rating as f64;
        entry.1 += 1;
    }

    let mut weighted: HashMap<ItemKey, (f64, f64)> = HashMap::new();
    let rated: HashSet<&ItemKey> = target.keys().collect();
    for neighbor in neighbors {
        let Some(other) = by_user.get(&neighbor.user_id) else {
            continue;
        };
        for (key, value) in other {
            if rated.contains(key) {
                continue;
            }
            let entry = weighted.entry(*key).or_default();
            entry.0 += value * neighbor.correlation;
            entry.1 += neighbor.correlation;
        }
    }

    weighted
        .into_iter()
        .filter_map(|(key, (num, denom))| {
            if denom < f64::EPSILON {
                return None;
            }
            let (sum, count) = sums.get(&key)?;
            let avg = sum / *count as f64;
            if avg < MIN_CANDIDATE_AVG {
                return None;
            }
            Some((key, num / denom))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn rating(user: Uuid, item: Uuid, value: f32) -> Rating {
        Rating {
            user_id: user,
            item_id: item,
            item_type: ContentType::Movie,
            rating: value,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_pearson_perfect_positive() {
        let r = pearson(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]).unwrap();
        assert!((r - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_pearson_perfect_negative() {
        let r = pearson(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]).unwrap();
        assert!((r + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_pearson_zero_variance_is_none() {
        assert!(pearson(&[3.0, 3.0, 3.0], &[1.0, 2.0, 3.0]).is_none());
        assert!(pearson(&[1.0, 2.0], &[5.0, 5.0]).is_none());
    }

    #[test]
    fn test_pearson_mismatched_lengths() {
        assert!(pearson(&[1.0], &[1.0, 2.0]).is_none());
        assert!(pearson(&[], &[]).is_none());
    }

    #[test]
    fn test_neighbors_require_common_items_and_correlation() {
        let target_id = Uuid::new_v4();
        let agreeing = Uuid::new_v4();
        let one_common = Uuid::new_v4();
        let disagreeing = Uuid::new_v4();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();

        let ratings = vec![
            rating(target_id, a, 5.0),
            rating(target_id, b, 3.0),
            rating(target_id, c, 4.0),
            // Agrees on three items.
            rating(agreeing, a, 5.0),
            rating(agreeing, b, 3.0),
            rating(agreeing, c, 4.0),
            // Only one shared item.
            rating(one_common, a, 5.0),
            // Anti-correlated.
            rating(disagreeing, a, 1.0),
            rating(disagreeing, b, 5.0),
            rating(disagreeing, c, 2.0),
        ];

        let by_user = group_by_user(&ratings);
        let neighbors = similar_users(target_id, &by_user[&target_id], &by_user);
        assert_eq!(neighbors.len(), 1);
        assert_eq!(neighbors[0].user_id, agreeing);
        assert!((neighbors[0].correlation - 1.0).abs() < 1e-9);
        assert_eq!(neighbors[0].common_items, 3);
    }

    #[test]
    fn test_prediction_skips_already_rated_and_low_average() {
        let target_id = Uuid::new_v4();
        let neighbor_id = Uuid::new_v4();
        let shared_a = Uuid::new_v4();
        let shared_b = Uuid::new_v4();
        let good = Uuid::new_v4();
        let bad = Uuid::new_v4();

        let ratings = vec![
            rating(target_id, shared_a, 5.0),
            rating(target_id, shared_b, 3.0),
            rating(neighbor_id, shared_a, 5.0),
            rating(neighbor_id, shared_b, 3.0),
            rating(neighbor_id, good, 4.0),
            rating(neighbor_id, bad, 2.0),
        ];

        let by_user = group_by_user(&ratings);
        let neighbors = similar_users(target_id, &by_user[&target_id], &by_user);
        let predictions = predict(&by_user[&target_id], &neighbors, &by_user, &ratings);

        assert_eq!(predictions.len(), 1);
        let predicted = predictions[&(ContentType::Movie, good)];
        assert!((predicted - 4.0).abs() < 1e-9);
    }
}
