//! Item-based collaborative filtering
//!
//! "Products bought by the same people as the ones you touched."
//!
//! ## Algorithm
//! 1. Transpose the matrix to product → (user → weight) columns
//! 2. For every product the target has not touched, compare its column
//!    with each product the target has touched
//! 3. `score += target_weight_on_seen * similarity(seen, candidate)` for
//!    every pair at or above `min_similarity`

use crate::matrix::InteractionMatrix;
use crate::similarity::SimilarityMetric;
use crate::types::{RecommendationResult, rank_scores};
use data_loader::{ProductId, UserId};
use rayon::prelude::*;
use std::collections::HashMap;
use tracing::{debug, instrument};

pub const ITEM_CF_REASON: &str = "Similar to products you interacted with";

/// Item-based CF scorer. Pure over an [`InteractionMatrix`].
#[derive(Debug, Clone)]
pub struct ItemBasedCf {
    /// Cap on returned candidates; `None` returns everything scored
    limit: Option<usize>,

    /// Product pairs below this similarity are ignored
    min_similarity: f64,

    metric: SimilarityMetric,
}

impl ItemBasedCf {
    pub fn new() -> Self {
        Self {
            limit: None,
            min_similarity: 0.1,
            metric: SimilarityMetric::Cosine,
        }
    }

    /// Cap the number of returned candidates
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
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

        let columns = matrix.transpose();

        // Fixed order over seen products keeps per-candidate sums deterministic
        let mut seen: Vec<(ProductId, f64)> = target.iter().map(|(&p, &w)| (p, w)).collect();
        seen.sort_unstable_by_key(|(p, _)| *p);

        let scores: HashMap<ProductId, f64> = columns
            .par_iter()
            .filter(|(product_id, _)| !target.contains_key(*product_id))
            .filter_map(|(&candidate_id, candidate_column)| {
                let mut score = 0.0;
                let mut matched = false;
                for &(seen_id, user_weight) in &seen {
                    let Some(seen_column) = columns.get(&seen_id) else {
                        continue;
                    };
                    let similarity = self.metric.compute(seen_column, candidate_column);
                    if similarity >= self.min_similarity {
                        score += user_weight * similarity;
                        matched = true;
                    }
                }
                matched.then_some((candidate_id, score))
            })
            .collect();

        let mut results = rank_scores(scores, ITEM_CF_REASON);
        if let Some(limit) = self.limit {
            results.truncate(limit);
        }
        debug!("Generated {} ItemCF candidates", results.len());
        results
    }
}

impl Default for ItemBasedCf {
    fn default() -> Self {
        Self::new()
    }
}
