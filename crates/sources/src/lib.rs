//! # Sources Crate
//!
//! Candidate scoring strategies for product recommendations. Every
//! strategy is a pure function over data handed to it (an interaction
//! matrix, a slice of events, a slice of products), so none of them touch
//! storage and all of them can be unit-tested in isolation.
//!
//! ## Components
//!
//! ### Collaborative filtering
//! - [`InteractionMatrixBuilder`]: behavior events → sparse user × product weights
//! - [`UserBasedCf`]: "shoppers like you also liked..."
//! - [`ItemBasedCf`]: "products similar to ones you touched"
//! - [`HybridBlender`]: weighted blend of the two, run concurrently
//!
//! ### Discovery
//! - [`ContentBasedRecommender`]: price / category / price-bucket similarity
//! - [`PopularityRecommender`]: trailing-window popularity, the universal fallback
//! - [`newest_products`]: recency ranking of the catalog
//!
//! ## Example Usage
//!
//! ```ignore
//! use sources::{HybridBlender, InteractionMatrixBuilder};
//! use data_loader::BehaviorWeights;
//!
//! let matrix = InteractionMatrixBuilder::new(BehaviorWeights::default()).build(&events);
//! let results = HybridBlender::new().recommend(&matrix, user_id, 20);
//! ```

pub mod content;
pub mod hybrid;
pub mod item_cf;
pub mod matrix;
pub mod popularity;
pub mod similarity;
pub mod types;
pub mod user_cf;

pub use content::{ContentBasedRecommender, PriceBucket};
pub use data_loader::BehaviorWeights;
pub use hybrid::HybridBlender;
pub use item_cf::ItemBasedCf;
pub use matrix::{InteractionMatrix, InteractionMatrixBuilder};
pub use popularity::{PopularityRecommender, days_before, newest_products};
pub use similarity::{SimilarityMetric, SparseVector, cosine, pearson};
pub use types::{RecommendationResult, rank_scores, sort_results};
pub use user_cf::UserBasedCf;
