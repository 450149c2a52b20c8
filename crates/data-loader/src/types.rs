//! Core domain types for the shop's behavior log and product catalog.
//!
//! The recommendation engine only ever reads these; they are produced by
//! the order, cart and product modules of the surrounding application.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Type Aliases
// =============================================================================

/// Unique identifier for a shopper
pub type UserId = u32;

/// Unique identifier for a catalog product
pub type ProductId = u32;

/// Unique identifier for a product category
pub type CategoryId = u32;

// =============================================================================
// Behavior Events
// =============================================================================

/// Kind of interaction a user had with a product.
///
/// Unknown strings are kept as `Other` instead of being rejected, so an
/// upstream module introducing a new behavior does not break loading.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BehaviorType {
    View,
    Collect,
    AddCart,
    Purchase,
    Share,
    Other(String),
}

impl BehaviorType {
    pub fn as_str(&self) -> &str {
        match self {
            BehaviorType::View => "view",
            BehaviorType::Collect => "collect",
            BehaviorType::AddCart => "add_cart",
            BehaviorType::Purchase => "purchase",
            BehaviorType::Share => "share",
            BehaviorType::Other(s) => s.as_str(),
        }
    }
}

impl FromStr for BehaviorType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "view" => BehaviorType::View,
            "collect" => BehaviorType::Collect,
            "add_cart" => BehaviorType::AddCart,
            "purchase" => BehaviorType::Purchase,
            "share" => BehaviorType::Share,
            other => BehaviorType::Other(other.to_string()),
        })
    }
}

impl From<String> for BehaviorType {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(t) => t,
            Err(never) => match never {},
        }
    }
}

impl From<BehaviorType> for String {
    fn from(t: BehaviorType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for BehaviorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Weight assigned to each behavior type when aggregating interactions.
///
/// This is configuration, not a constant: tests and deployments can swap in
/// a different scheme. Types without an explicit entry get `default_weight`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorWeights {
    pub view: f64,
    pub collect: f64,
    pub add_cart: f64,
    pub purchase: f64,
    pub share: f64,
    /// Extra named behaviors beyond the five built-in ones
    pub custom: HashMap<String, f64>,
    pub default_weight: f64,
}

impl BehaviorWeights {
    /// Override the weight of a single behavior type
    pub fn with_weight(mut self, behavior: BehaviorType, weight: f64) -> Self {
        match behavior {
            BehaviorType::View => self.view = weight,
            BehaviorType::Collect => self.collect = weight,
            BehaviorType::AddCart => self.add_cart = weight,
            BehaviorType::Purchase => self.purchase = weight,
            BehaviorType::Share => self.share = weight,
            BehaviorType::Other(name) => {
                self.custom.insert(name, weight);
            }
        }
        self
    }

    /// Weight for a behavior type. Never negative.
    pub fn weight_of(&self, behavior: &BehaviorType) -> f64 {
        let w = match behavior {
            BehaviorType::View => self.view,
            BehaviorType::Collect => self.collect,
            BehaviorType::AddCart => self.add_cart,
            BehaviorType::Purchase => self.purchase,
            BehaviorType::Share => self.share,
            BehaviorType::Other(name) => self
                .custom
                .get(name)
                .copied()
                .unwrap_or(self.default_weight),
        };
        w.max(0.0)
    }
}

impl Default for BehaviorWeights {
    fn default() -> Self {
        Self {
            view: 1.0,
            collect: 3.0,
            add_cart: 5.0,
            purchase: 10.0,
            share: 2.0,
            custom: HashMap::new(),
            default_weight: 1.0,
        }
    }
}

/// A single recorded interaction. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorEvent {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub behavior_type: BehaviorType,
    /// Weight stamped at append time from the then-current table
    pub weight: f64,
    pub timestamp: DateTime<Utc>,
}

impl BehaviorEvent {
    /// Create an event, stamping its weight from `weights`
    pub fn new(
        user_id: UserId,
        product_id: ProductId,
        behavior_type: BehaviorType,
        timestamp: DateTime<Utc>,
        weights: &BehaviorWeights,
    ) -> Self {
        let weight = weights.weight_of(&behavior_type);
        Self {
            user_id,
            product_id,
            behavior_type,
            weight,
            timestamp,
        }
    }
}

// =============================================================================
// Products
// =============================================================================

/// A catalog product, as supplied by the product module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: f64,
    /// Uncategorised products are allowed
    pub category_id: Option<CategoryId>,
    pub image_urls: Vec<String>,
    pub stock: u32,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// First image, used as the thumbnail in recommendation output
    pub fn primary_image(&self) -> Option<&str> {
        self.image_urls.first().map(String::as_str)
    }
}

// =============================================================================
// Recommendation Log
// =============================================================================

/// One row per product returned to a user, kept for click/purchase feedback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationLogEntry {
    pub user_id: UserId,
    pub product_id: ProductId,
    /// Strategy the caller asked for (e.g. "personalized")
    pub recommend_type: String,
    /// Strategy that actually produced the item (e.g. "popular" after a fallback)
    pub algorithm_type: String,
    pub score: f64,
    pub clicked: bool,
    pub purchased: bool,
    pub timestamp: DateTime<Utc>,
}

// =============================================================================
// Queries
// =============================================================================

/// Typed description of which behavior events a caller wants.
///
/// Built once and reused; every store interprets it the same way via
/// [`BehaviorQuery::matches`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BehaviorQuery {
    pub user_id: Option<UserId>,
    pub since: Option<DateTime<Utc>>,
    pub behavior_types: Option<Vec<BehaviorType>>,
}

impl BehaviorQuery {
    /// Every event in the log
    pub fn all() -> Self {
        Self::default()
    }

    /// Restrict to one user's events
    pub fn for_user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Restrict to events at or after `since`
    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    /// Restrict to the given behavior types
    pub fn with_types(mut self, types: Vec<BehaviorType>) -> Self {
        self.behavior_types = Some(types);
        self
    }

    pub fn matches(&self, event: &BehaviorEvent) -> bool {
        if let Some(user_id) = self.user_id
            && event.user_id != user_id
        {
            return false;
        }
        if let Some(since) = self.since
            && event.timestamp < since
        {
            return false;
        }
        if let Some(types) = &self.behavior_types
            && !types.contains(&event.behavior_type)
        {
            return false;
        }
        true
    }
}

// =============================================================================
// DataIndex - The Core In-Memory Database
// =============================================================================

/// Holds the behavior log and the product catalog with lookup indices.
#[derive(Debug, Default)]
pub struct DataIndex {
    pub(crate) products: HashMap<ProductId, Product>,

    /// Append-only log in arrival order
    pub(crate) events: Vec<BehaviorEvent>,
    /// Positions into `events` for each user
    pub(crate) user_events: HashMap<UserId, Vec<usize>>,
}

impl DataIndex {
    /// Creates a new, empty DataIndex
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_product(&self, id: ProductId) -> Option<&Product> {
        self.products.get(&id)
    }

    /// All product ids, sorted ascending
    pub fn get_all_product_ids(&self) -> Vec<ProductId> {
        let mut ids: Vec<ProductId> = self.products.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// All events of a user in arrival order
    pub fn get_user_events(&self, user_id: UserId) -> Vec<&BehaviorEvent> {
        self.user_events
            .get(&user_id)
            .map(|positions| positions.iter().map(|&i| &self.events[i]).collect())
            .unwrap_or_default()
    }

    /// All user ids that have at least one event, sorted ascending
    pub fn get_all_user_ids(&self) -> Vec<UserId> {
        let mut ids: Vec<UserId> = self.user_events.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn events(&self) -> &[BehaviorEvent] {
        &self.events
    }

    pub fn insert_product(&mut self, product: Product) {
        self.products.insert(product.id, product);
    }

    /// Append an event and update the per-user index
    pub fn insert_event(&mut self, event: BehaviorEvent) {
        let position = self.events.len();
        self.user_events
            .entry(event.user_id)
            .or_default()
            .push(position);
        self.events.push(event);
    }

    /// Get counts for debugging/validation: (users, products, events)
    pub fn counts(&self) -> (usize, usize, usize) {
        (self.user_events.len(), self.products.len(), self.events.len())
    }
}
