//! Hybrid blend of user-based and item-based CF
//!
//! Both strategies run concurrently over the same read-only matrix. UserCF
//! draws on `2 * top_n` neighbors; ItemCF contributes every candidate it
//! scores, so no product loses its item-side share to an early cut. The
//! scores are then combined linearly:
//! `combined = user_weight * user_cf + item_weight * item_cf`,
//! with a missing side contributing 0.

use crate::item_cf::ItemBasedCf;
use crate::matrix::InteractionMatrix;
use crate::similarity::SimilarityMetric;
use crate::types::{RecommendationResult, rank_scores};
use crate::user_cf::UserBasedCf;
use data_loader::{ProductId, UserId};
use std::collections::HashMap;
use tracing::{debug, instrument};

#[derive(Debug, Clone)]
pub struct HybridBlender {
    user_weight: f64,
    item_weight: f64,
    min_similarity: f64,
    metric: SimilarityMetric,
}

impl HybridBlender {
    pub fn new() -> Self {
        Self {
            user_weight: 0.6,
            item_weight: 0.4,
            min_similarity: 0.1,
            metric: SimilarityMetric::Cosine,
        }
    }

    /// Configure the blend weights (default: 0.6 user / 0.4 item)
    pub fn with_weights(mut self, user_weight: f64, item_weight: f64) -> Self {
        self.user_weight = user_weight;
        self.item_weight = item_weight;
        self
    }

    /// Configure the minimum similarity passed to both sides (default: 0.1)
    pub fn with_min_similarity(mut self, min_similarity: f64) -> Self {
        self.min_similarity = min_similarity;
        self
    }

    pub fn with_metric(mut self, metric: SimilarityMetric) -> Self {
        self.metric = metric;
        self
    }

    /// Run UserCF over `2 * top_n` neighbors and an uncapped ItemCF, then
    /// blend into `top_n` results
    #[instrument(skip(self, matrix), fields(user_id = user_id))]
    pub fn recommend(
        &self,
        matrix: &InteractionMatrix,
        user_id: UserId,
        top_n: usize,
    ) -> Vec<RecommendationResult> {
        let user_cf = UserBasedCf::new()
            .with_neighbors(top_n.saturating_mul(2))
            .with_min_similarity(self.min_similarity)
            .with_metric(self.metric);
        let item_cf = ItemBasedCf::new()
            .with_min_similarity(self.min_similarity)
            .with_metric(self.metric);

        let (user_results, item_results) = rayon::join(
            || user_cf.recommend(matrix, user_id),
            || item_cf.recommend(matrix, user_id),
        );
        debug!(
            "Blending {} UserCF and {} ItemCF candidates",
            user_results.len(),
            item_results.len()
        );

        self.combine(&user_results, &item_results, top_n)
    }

    /// Weighted sum of two result lists, ranked and truncated to `top_n`
    pub fn combine(
        &self,
        user_results: &[RecommendationResult],
        item_results: &[RecommendationResult],
        top_n: usize,
    ) -> Vec<RecommendationResult> {
        let mut combined: HashMap<ProductId, f64> = HashMap::new();
        for r in user_results {
            *combined.entry(r.product_id).or_insert(0.0) += self.user_weight * r.score;
        }
        for r in item_results {
            *combined.entry(r.product_id).or_insert(0.0) += self.item_weight * r.score;
        }

        let reason = format!(
            "Hybrid of user CF ({}) and item CF ({})",
            self.user_weight, self.item_weight
        );
        let mut results = rank_scores(combined, &reason);
        results.truncate(top_n);
        results
    }
}

impl Default for HybridBlender {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::InteractionMatrixBuilder;
    use chrono::{TimeZone, Utc};
    use data_loader::{BehaviorEvent, BehaviorType, BehaviorWeights};

    fn result(product_id: ProductId, score: f64) -> RecommendationResult {
        RecommendationResult::new(product_id, score, "test")
    }

    #[test]
    fn test_combine_formula() {
        let blender = HybridBlender::new();
        let user = vec![result(1, 10.0), result(2, 4.0)];
        let item = vec![result(1, 5.0), result(3, 20.0)];

        let combined = blender.combine(&user, &item, 10);
        let score = |id: ProductId| combined.iter().find(|r| r.product_id == id).unwrap().score;

        assert!((score(1) - (0.6 * 10.0 + 0.4 * 5.0)).abs() < 1e-12);
        assert!((score(2) - 0.6 * 4.0).abs() < 1e-12);
        assert!((score(3) - 0.4 * 20.0).abs() < 1e-12);
        assert_eq!(combined[0].product_id, 1);
    }

    #[test]
    fn test_combine_custom_weights_and_truncation() {
        let blender = HybridBlender::new().with_weights(0.5, 0.5);
        let user = vec![result(1, 1.0), result(2, 2.0)];
        let item = vec![result(3, 6.0)];

        let combined = blender.combine(&user, &item, 2);
        assert_eq!(combined.len(), 2);
        assert_eq!(combined[0].product_id, 3);
        assert_eq!(combined[0].score, 3.0);
        assert_eq!(combined[1].product_id, 2);
    }

    #[test]
    fn test_recommend_matches_independent_runs() {
        let weights = BehaviorWeights::default();
        let at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let events: Vec<BehaviorEvent> = [
            (1, 1, BehaviorType::Purchase),
            (1, 2, BehaviorType::Collect),
            (2, 1, BehaviorType::Purchase),
            (2, 2, BehaviorType::View),
            (2, 3, BehaviorType::AddCart),
            (3, 2, BehaviorType::Collect),
            (3, 4, BehaviorType::Purchase),
        ]
        .into_iter()
        .map(|(u, p, t)| BehaviorEvent::new(u, p, t, at, &weights))
        .collect();
        let matrix = InteractionMatrixBuilder::new(weights).build(&events);

        let blended = HybridBlender::new().recommend(&matrix, 1, 5);
        let user = UserBasedCf::new().with_neighbors(10).recommend(&matrix, 1);
        let item = ItemBasedCf::new().recommend(&matrix, 1);

        for r in &blended {
            let u = user.iter().find(|x| x.product_id == r.product_id).map_or(0.0, |x| x.score);
            let i = item.iter().find(|x| x.product_id == r.product_id).map_or(0.0, |x| x.score);
            assert!((r.score - (0.6 * u + 0.4 * i)).abs() < 1e-9);
        }
        assert!(!blended.is_empty());
    }

    #[test]
    fn test_item_side_is_blended_in_full() {
        let weights = BehaviorWeights::default();
        let at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let mut events = vec![
            BehaviorEvent::new(1, 1, BehaviorType::Purchase, at, &weights),
            BehaviorEvent::new(2, 1, BehaviorType::Purchase, at, &weights),
        ];
        // User 2 pairs product 1 with 10..=14 and buys 14. A third shopper
        // viewing only 14 dilutes its column, so ItemCF ranks it last.
        for product_id in 10..=13 {
            events.push(BehaviorEvent::new(2, product_id, BehaviorType::View, at, &weights));
        }
        events.push(BehaviorEvent::new(2, 14, BehaviorType::Purchase, at, &weights));
        events.push(BehaviorEvent::new(3, 14, BehaviorType::View, at, &weights));
        let matrix = InteractionMatrixBuilder::new(weights).build(&events);

        let top_n = 2;
        let item = ItemBasedCf::new().recommend(&matrix, 1);
        let item_rank = item.iter().position(|r| r.product_id == 14).unwrap();
        assert!(item_rank >= 2 * top_n, "product 14 must rank past the UserCF width");

        let user = UserBasedCf::new().with_neighbors(2 * top_n).recommend(&matrix, 1);
        let user_score = user.iter().find(|r| r.product_id == 14).unwrap().score;

        let blended = HybridBlender::new().recommend(&matrix, 1, top_n);
        assert_eq!(blended.len(), top_n);
        assert_eq!(blended[0].product_id, 14);
        let expected = 0.6 * user_score + 0.4 * item[item_rank].score;
        assert!((blended[0].score - expected).abs() < 1e-9);
    }

    #[test]
    fn test_cold_start_is_empty() {
        let matrix = InteractionMatrixBuilder::default().build(&[]);
        assert!(HybridBlender::new().recommend(&matrix, 1, 10).is_empty());
    }
}
