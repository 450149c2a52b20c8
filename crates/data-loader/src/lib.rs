//! # Data Loader Crate
//!
//! Domain types and storage seams for the shop recommendation engine.
//!
//! ## Main Components
//!
//! - **types**: Core domain types (BehaviorEvent, Product, RecommendationLogEntry, DataIndex)
//! - **parser**: Parse `behaviors.dat` / `products.dat` into Rust structs
//! - **index**: Build, query and validate the in-memory DataIndex
//! - **store**: Traits the engine reads and writes through, plus `MemoryStore`
//! - **error**: Error types for loading and store access
//!
//! ## Example Usage
//!
//! ```ignore
//! use data_loader::{BehaviorQuery, BehaviorSource, BehaviorWeights, MemoryStore};
//! use std::path::Path;
//!
//! let store = MemoryStore::load_from_files(Path::new("data/shop"), &BehaviorWeights::default())?;
//! let events = store.events(&BehaviorQuery::all().for_user(42))?;
//! println!("User 42 has {} events", events.len());
//! ```

pub mod error;
pub mod index;
pub mod parser;
pub mod store;
pub mod types;

pub use error::{DataLoadError, Result};
pub use store::{BehaviorSource, MemoryStore, ProductCatalog, RecommendationLogStore};
pub use types::{
    BehaviorEvent, BehaviorQuery, BehaviorType, BehaviorWeights, CategoryId, DataIndex, Product,
    ProductId, RecommendationLogEntry, UserId,
};
