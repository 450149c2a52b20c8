//! Content-based recommendations
//!
//! Describes every product by its price, category and price bucket, builds
//! a preference vector from what the user already interacted with, and
//! ranks unseen products by cosine similarity to that preference.

use crate::similarity::{SparseVector, cosine};
use crate::types::{RecommendationResult, sort_results};
use data_loader::{BehaviorEvent, CategoryId, Product, ProductId, UserId};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{debug, instrument};

pub const CONTENT_REASON: &str = "Matches the price range and categories you browse";

/// Coarse price band a product falls into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceBucket {
    Low,
    Medium,
    High,
    Premium,
}

impl PriceBucket {
    /// <50 low, <100 medium, <200 high, otherwise premium
    pub fn from_price(price: f64) -> Self {
        if price < 50.0 {
            PriceBucket::Low
        } else if price < 100.0 {
            PriceBucket::Medium
        } else if price < 200.0 {
            PriceBucket::High
        } else {
            PriceBucket::Premium
        }
    }
}

/// One dimension of a content feature vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureKey {
    Price,
    Category(CategoryId),
    Bucket(PriceBucket),
}

/// Feature vector of a single product: raw price plus two one-hot groups
pub fn product_features(product: &Product) -> SparseVector<FeatureKey> {
    let mut features = SparseVector::new();
    features.insert(FeatureKey::Price, product.price);
    if let Some(category_id) = product.category_id {
        features.insert(FeatureKey::Category(category_id), 1.0);
    }
    features.insert(FeatureKey::Bucket(PriceBucket::from_price(product.price)), 1.0);
    features
}

/// Preference vector summarising a set of products.
///
/// - price: average price
/// - category: count / most frequent category's count
/// - bucket: count / number of products
pub fn preference_vector(products: &[&Product]) -> SparseVector<FeatureKey> {
    let mut preference = SparseVector::new();
    if products.is_empty() {
        return preference;
    }

    let mut total_price = 0.0;
    let mut categories: HashMap<CategoryId, u32> = HashMap::new();
    let mut buckets: HashMap<PriceBucket, u32> = HashMap::new();
    for product in products {
        total_price += product.price;
        *buckets.entry(PriceBucket::from_price(product.price)).or_insert(0) += 1;
        if let Some(category_id) = product.category_id {
            *categories.entry(category_id).or_insert(0) += 1;
        }
    }

    let count = products.len() as f64;
    let max_category = categories.values().copied().max().unwrap_or(1).max(1) as f64;

    preference.insert(FeatureKey::Price, total_price / count);
    for (category_id, n) in categories {
        preference.insert(FeatureKey::Category(category_id), n as f64 / max_category);
    }
    for (bucket, n) in buckets {
        preference.insert(FeatureKey::Bucket(bucket), n as f64 / count);
    }
    preference
}

/// Content-based scorer
#[derive(Debug, Clone, Default)]
pub struct ContentBasedRecommender;

impl ContentBasedRecommender {
    pub fn new() -> Self {
        Self
    }

    /// Rank catalog products the user has not interacted with.
    ///
    /// `user_events` are the target user's events; `catalog` is every
    /// product eligible for recommendation. Returns an empty list when the
    /// user has no history or none of their products are in the catalog.
    #[instrument(skip(self, user_events, catalog), fields(user_id = user_id))]
    pub fn recommend(
        &self,
        user_id: UserId,
        user_events: &[BehaviorEvent],
        catalog: &[Product],
        top_n: usize,
    ) -> Vec<RecommendationResult> {
        let seen: HashSet<ProductId> = user_events
            .iter()
            .filter(|e| e.user_id == user_id)
            .map(|e| e.product_id)
            .collect();
        if seen.is_empty() {
            debug!("User {} has no behavior history", user_id);
            return Vec::new();
        }

        let liked: Vec<&Product> = catalog.iter().filter(|p| seen.contains(&p.id)).collect();
        let preference = preference_vector(&liked);
        if preference.is_empty() {
            debug!("None of user {}'s products are in the catalog", user_id);
            return Vec::new();
        }

        let mut results: Vec<RecommendationResult> = catalog
            .iter()
            .filter(|p| !seen.contains(&p.id))
            .filter_map(|product| {
                let score = cosine(&preference, &product_features(product));
                (score > 0.0).then(|| RecommendationResult::new(product.id, score, CONTENT_REASON))
            })
            .collect();

        sort_results(&mut results);
        results.truncate(top_n);
        debug!("Generated {} content-based candidates", results.len());
        results
    }
}
