//! Server crate for the shop recommendation engine.
//!
//! Hosts the [`RecommendationOrchestrator`], which ties the storage ports
//! from `data_loader` to the scoring strategies in `sources`, plus the
//! engine configuration and error taxonomy.

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod strategy;

pub use config::EngineConfig;
pub use error::EngineError;
pub use orchestrator::{ProductRecommendation, RecommendationOrchestrator};
pub use strategy::Strategy;
