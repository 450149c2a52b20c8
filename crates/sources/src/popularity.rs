//! Popularity ranking
//!
//! Used for cold-start users and as the fallback when any other strategy
//! fails or comes back empty. Also hosts the "newest products" ranking.

use crate::types::{RecommendationResult, rank_scores};
use chrono::{DateTime, Duration, Utc};
use data_loader::{BehaviorEvent, BehaviorWeights, Product, ProductId};
use std::collections::{HashMap, HashSet};
use tracing::{debug, instrument};

pub const NEWEST_REASON: &str = "New arrival";

/// Ranks products by total behavior weight inside a trailing window
#[derive(Debug, Clone)]
pub struct PopularityRecommender {
    weights: BehaviorWeights,

    /// Length of the trailing window in days
    window_days: i64,
}

impl PopularityRecommender {
    pub fn new(weights: BehaviorWeights) -> Self {
        Self {
            weights,
            window_days: 30,
        }
    }

    /// Configure the trailing window (default: 30 days)
    pub fn with_window_days(mut self, days: i64) -> Self {
        self.window_days = days;
        self
    }

    pub fn window_days(&self) -> i64 {
        self.window_days
    }

    /// Earliest timestamp that still counts when evaluated at `now`
    pub fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        days_before(now, self.window_days)
    }

    /// Rank against the current wall clock
    pub fn recommend(&self, events: &[BehaviorEvent], top_n: usize) -> Vec<RecommendationResult> {
        self.recommend_at(events, Utc::now(), top_n)
    }

    /// Rank as if evaluated at `now`. Events before the window start or
    /// after `now` are ignored.
    #[instrument(skip(self, events), fields(window_days = self.window_days))]
    pub fn recommend_at(
        &self,
        events: &[BehaviorEvent],
        now: DateTime<Utc>,
        top_n: usize,
    ) -> Vec<RecommendationResult> {
        let start = self.window_start(now);

        let mut scores: HashMap<ProductId, f64> = HashMap::new();
        for event in events {
            if event.timestamp < start || event.timestamp > now {
                continue;
            }
            *scores.entry(event.product_id).or_insert(0.0) +=
                self.weights.weight_of(&event.behavior_type);
        }

        let reason = format!("Popular in the last {} days", self.window_days);
        let mut results = rank_scores(scores, &reason);
        results.truncate(top_n);
        debug!("Generated {} popular candidates", results.len());
        results
    }
}

impl Default for PopularityRecommender {
    fn default() -> Self {
        Self::new(BehaviorWeights::default())
    }
}

/// `now` minus `days`, clamped to the earliest representable instant
pub fn days_before(now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    Duration::try_days(days)
        .and_then(|span| now.checked_sub_signed(span))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Rank catalog products by recency, newest first.
///
/// Products in `exclude` are skipped. Equal timestamps keep catalog order;
/// no finer tie-break is applied. Scores decay with rank as `1 / (rank + 1)`.
pub fn newest_products(
    catalog: &[Product],
    exclude: &HashSet<ProductId>,
    top_n: usize,
) -> Vec<RecommendationResult> {
    let mut fresh: Vec<&Product> = catalog.iter().filter(|p| !exclude.contains(&p.id)).collect();
    // Stable sort
    fresh.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    fresh
        .into_iter()
        .take(top_n)
        .enumerate()
        .map(|(rank, p)| RecommendationResult::new(p.id, 1.0 / (rank as f64 + 1.0), NEWEST_REASON))
        .collect()
}
