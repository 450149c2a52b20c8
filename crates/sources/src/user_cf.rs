//! User-based collaborative filtering
//!
//! "Shoppers who behave like you also bought these."
//!
//! ## Algorithm
//! 1. Take the target user's row from the interaction matrix
//! 2. Compare it with every other user's row
//! 3. Keep neighbors at or above `min_similarity`, best `neighbors` first
//! 4. For each neighbor product the target has not touched:
//!    `score += similarity * neighbor_weight`

use crate::matrix::InteractionMatrix;
use crate::similarity::SimilarityMetric;
use crate::types::{RecommendationResult, rank_scores};
use data_loader::{ProductId, UserId};
use rayon::prelude::*;
use std::collections::HashMap;
use tracing::{debug, instrument};

pub const USER_CF_REASON: &str = "Shoppers with similar taste liked this";

/// User-based CF scorer. Pure over an [`InteractionMatrix`].
#[derive(Debug, Clone)]
pub struct UserBasedCf {
    /// How many of the most similar users contribute scores
    neighbors: usize,

    /// Users below this similarity are ignored
    min_similarity: f64,

    metric: SimilarityMetric,
}

impl UserBasedCf {
    pub fn new() -> Self {
        Self {
            neighbors: 50,
            min_similarity: 0.1,
            metric: SimilarityMetric::Cosine,
        }
    }

    /// Configure the neighbor count (default: 50)
    pub fn with_neighbors(mut self, neighbors: usize) -> Self {
        self.neighbors = neighbors;
        self
    }

    /// Configure the minimum similarity (default: 0.1)
    pub fn with_min_similarity(mut self, min_similarity: f64) -> Self {
        self.min_similarity = min_similarity;
        self
    }

    /// Configure the similarity metric (default: cosine)
    pub fn with_metric(mut self, metric: SimilarityMetric) -> Self {
        self.metric = metric;
        self
    }

    /// Score unseen products for `user_id`, best first.
    ///
    /// Returns an empty list for a user with no interactions.
    #[instrument(skip(self, matrix), fields(user_id = user_id))]
    pub fn recommend(
        &self,
        matrix: &InteractionMatrix,
        user_id: UserId,
    ) -> Vec<RecommendationResult> {
        let Some(target) = matrix.user_vector(user_id) else {
            debug!("User {} has no interactions, cold start", user_id);
            return Vec::new();
        };

        let neighbors = self.find_neighbors(matrix, user_id);
        debug!("Found {} similar users", neighbors.len());

        let mut scores: HashMap<ProductId, f64> = HashMap::new();
        for &(neighbor_id, similarity) in &neighbors {
            let Some(row) = matrix.user_vector(neighbor_id) else {
                continue;
            };
            for (&product_id, &weight) in row {
                if target.contains_key(&product_id) {
                    continue;
                }
                *scores.entry(product_id).or_insert(0.0) += similarity * weight;
            }
        }

        let results = rank_scores(scores, USER_CF_REASON);
        debug!("Generated {} UserCF candidates", results.len());
        results
    }

    /// Most similar users first; ties broken by ascending user id
    fn find_neighbors(&self, matrix: &InteractionMatrix, user_id: UserId) -> Vec<(UserId, f64)> {
        let Some(target) = matrix.user_vector(user_id) else {
            return Vec::new();
        };

        let mut similar: Vec<(UserId, f64)> = matrix
            .rows()
            .par_iter()
            .filter(|(other_id, row)| **other_id != user_id && !row.is_empty())
            .map(|(&other_id, row)| (other_id, self.metric.compute(target, row)))
            .filter(|(_, similarity)| *similarity >= self.min_similarity)
            .collect();

        similar.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        similar.truncate(self.neighbors);
        similar
    }
}

impl Default for UserBasedCf {
    fn default() -> Self {
        Self::new()
    }
}
