//! Test harness for the recommendation orchestrator.
//!
//! Loads a data directory, runs every strategy for one user and prints the
//! results, then exercises the feedback hooks.
//!
//! ```text
//! cargo run -p server -- data/shop 1
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use data_loader::MemoryStore;
use server::{EngineConfig, RecommendationOrchestrator, Strategy};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,server=debug,sources=debug")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let data_dir = PathBuf::from(args.next().unwrap_or_else(|| "data/shop".to_string()));
    let user_id: u32 = match args.next() {
        Some(raw) => raw.parse().context("user id must be a number")?,
        None => 1,
    };

    let config = EngineConfig::default();
    info!("Loading store from {}", data_dir.display());
    let store = Arc::new(
        MemoryStore::load_from_files(&data_dir, &config.behavior_weights)
            .with_context(|| format!("failed to load {}", data_dir.display()))?,
    );
    let orchestrator = RecommendationOrchestrator::from_store(store, config);

    for strategy in Strategy::ALL {
        let recommendations = orchestrator
            .get_recommendations(user_id, strategy, Some(5))
            .await?;

        info!("{} → {} recommendations", strategy, recommendations.len());
        for (i, rec) in recommendations.iter().enumerate() {
            info!(
                "  {}. {} (¥{:.2}) score {:.3} [{}]",
                i + 1,
                rec.name,
                rec.price,
                rec.score,
                rec.reason
            );
        }

        if let Some(top) = recommendations.first() {
            orchestrator.record_click(user_id, top.id);
        }
    }

    Ok(())
}
