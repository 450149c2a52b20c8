//! Output type shared by every scoring strategy.

use data_loader::ProductId;
use serde::Serialize;
use std::collections::HashMap;

/// A scored candidate product
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationResult {
    pub product_id: ProductId,
    pub score: f64,
    /// Human-readable explanation of where the score came from
    pub reason: String,
}

impl RecommendationResult {
    pub fn new(product_id: ProductId, score: f64, reason: impl Into<String>) -> Self {
        Self {
            product_id,
            score,
            reason: reason.into(),
        }
    }
}

/// Sort by score descending, then by ascending product id.
///
/// `total_cmp` keeps the order total even if a NaN slips in.
pub fn sort_results(results: &mut [RecommendationResult]) {
    results.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.product_id.cmp(&b.product_id))
    });
}

/// Turn an accumulated score map into a ranked result list
pub fn rank_scores(scores: HashMap<ProductId, f64>, reason: &str) -> Vec<RecommendationResult> {
    let mut results: Vec<RecommendationResult> = scores
        .into_iter()
        .map(|(product_id, score)| RecommendationResult::new(product_id, score, reason))
        .collect();
    sort_results(&mut results);
    results
}
