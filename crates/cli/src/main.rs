use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use colored::Colorize;
use data_loader::{
    BehaviorQuery, BehaviorSource, BehaviorType, MemoryStore, ProductCatalog, ProductId, UserId,
};
use rand::seq::IndexedRandom;
use server::{EngineConfig, ProductRecommendation, RecommendationOrchestrator, Strategy};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::info;

/// shop-recs - Product Recommendation Engine
#[derive(Parser)]
#[command(name = "shop-recs")]
#[command(about = "Product recommendations from shopper behavior logs", long_about = None)]
struct Cli {
    /// Directory holding products.dat and behaviors.dat
    #[arg(short, long, default_value = "data/shop")]
    data_dir: PathBuf,

    /// JSON engine config; unset fields keep their defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Get product recommendations for a user
    Recommend {
        #[arg(long)]
        user_id: UserId,

        /// usercf, itemcf, content, popular, hybrid, personalized or new
        #[arg(long, default_value = "personalized")]
        strategy: String,

        /// Number of recommendations (defaults to the config value)
        #[arg(long)]
        limit: Option<usize>,

        /// Show the reason behind each recommendation
        #[arg(long)]
        explain: bool,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show a user's behavior history
    User {
        #[arg(long)]
        user_id: UserId,
    },

    /// Show the most popular products in the configured window
    Popular {
        #[arg(long, default_value = "10")]
        limit: usize,
    },

    /// Run benchmark to test performance
    Benchmark {
        /// Number of requests to make
        #[arg(long, default_value = "100")]
        requests: usize,

        /// Number of concurrent requests
        #[arg(long, default_value = "10")]
        concurrent: usize,

        #[arg(long, default_value = "personalized")]
        strategy: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EngineConfig::from_json_file(path)?,
        None => EngineConfig::default(),
    };

    info!("Loading shop data from {}", cli.data_dir.display());
    let start = Instant::now();
    let store = Arc::new(
        MemoryStore::load_from_files(&cli.data_dir, &config.behavior_weights)
            .context("Failed to load shop data")?,
    );
    let (users, products, events) = store.with_index(|index| index.counts());
    info!(
        "Loaded {} products, {} events from {} users in {:?}",
        products,
        events,
        users,
        start.elapsed()
    );

    let orchestrator = RecommendationOrchestrator::from_store(store.clone(), config);

    match cli.command {
        Commands::Recommend {
            user_id,
            strategy,
            limit,
            explain,
            json,
        } => handle_recommend(&orchestrator, user_id, &strategy, limit, explain, json).await?,
        Commands::User { user_id } => handle_user(&store, user_id)?,
        Commands::Popular { limit } => handle_popular(&orchestrator, limit).await?,
        Commands::Benchmark {
            requests,
            concurrent,
            strategy,
        } => handle_benchmark(&store, &orchestrator, requests, concurrent, &strategy).await?,
    }

    Ok(())
}

async fn handle_recommend(
    orchestrator: &RecommendationOrchestrator,
    user_id: UserId,
    strategy: &str,
    limit: Option<usize>,
    explain: bool,
    json: bool,
) -> Result<()> {
    let strategy: Strategy = strategy.parse()?;
    let recommendations = orchestrator
        .get_recommendations(user_id, strategy, limit)
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&recommendations)?);
        return Ok(());
    }

    println!(
        "{}",
        format!("{} recommendations for user {}:", strategy, user_id).bold().blue()
    );
    print_recommendations(&recommendations, explain);
    Ok(())
}

fn handle_user(store: &MemoryStore, user_id: UserId) -> Result<()> {
    let mut events = store.events(&BehaviorQuery::all().for_user(user_id))?;
    if events.is_empty() {
        return Err(anyhow!("User {} has no recorded behavior", user_id));
    }
    events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    println!("{}", format!("User ID: {}", user_id).bold().blue());
    println!("{}Events: {}", "• ".green(), events.len());
    println!(
        "{}Total weight: {:.1}",
        "• ".green(),
        events.iter().map(|e| e.weight).sum::<f64>()
    );

    let mut by_type: BTreeMap<String, usize> = BTreeMap::new();
    for event in &events {
        *by_type.entry(event.behavior_type.to_string()).or_insert(0) += 1;
    }
    println!("Behavior breakdown:");
    for (behavior, count) in &by_type {
        println!("  - {}: {}", behavior, count);
    }

    let mut per_product: HashMap<ProductId, f64> = HashMap::new();
    for event in &events {
        *per_product.entry(event.product_id).or_insert(0.0) += event.weight;
    }
    let mut top: Vec<(ProductId, f64)> = per_product.into_iter().collect();
    top.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    top.truncate(5);

    let ids: Vec<ProductId> = top.iter().map(|(id, _)| *id).collect();
    let names: HashMap<ProductId, String> = store
        .products_by_ids(&ids)?
        .into_iter()
        .map(|p| (p.id, p.name))
        .collect();
    println!("Most engaged products:");
    for (product_id, weight) in &top {
        let name = names.get(product_id).map_or("<not in catalog>", String::as_str);
        println!("  - {} {} (weight {:.1})", product_id, name, weight);
    }

    println!("Recent activity:");
    for event in events.iter().take(10) {
        let marker = match event.behavior_type {
            BehaviorType::Purchase => "$".yellow(),
            BehaviorType::AddCart => "+".cyan(),
            _ => "·".normal(),
        };
        println!(
            "  {} {} {} product {}",
            marker,
            event.timestamp.format("%Y-%m-%d %H:%M"),
            event.behavior_type,
            event.product_id
        );
    }
    Ok(())
}

async fn handle_popular(orchestrator: &RecommendationOrchestrator, limit: usize) -> Result<()> {
    let recommendations = orchestrator.popular_products(limit).await?;

    println!(
        "{}",
        format!(
            "Popular in the last {} days:",
            orchestrator.config().popular_window_days
        )
        .bold()
        .blue()
    );
    print_recommendations(&recommendations, false);
    Ok(())
}

async fn handle_benchmark(
    store: &MemoryStore,
    orchestrator: &RecommendationOrchestrator,
    requests: usize,
    concurrent: usize,
    strategy: &str,
) -> Result<()> {
    let strategy: Strategy = strategy.parse()?;
    let known_users = store.with_index(|index| index.get_all_user_ids());
    if known_users.is_empty() || requests == 0 {
        return Err(anyhow!("Nothing to benchmark"));
    }

    let mut rng = rand::rng();
    let user_ids: Vec<UserId> = (0..requests)
        .filter_map(|_| known_users.choose(&mut rng).copied())
        .collect();

    let permits = Arc::new(Semaphore::new(concurrent.max(1)));
    let wall_clock = Instant::now();
    let mut handles = Vec::with_capacity(user_ids.len());
    for user in user_ids {
        let orchestrator = orchestrator.clone();
        let permits = permits.clone();
        handles.push(tokio::spawn(async move {
            let _permit = permits.acquire_owned().await?;
            let start = Instant::now();
            orchestrator.get_recommendations(user, strategy, None).await?;
            Ok::<_, anyhow::Error>(start.elapsed())
        }));
    }

    let mut timings: Vec<Duration> = Vec::with_capacity(handles.len());
    for handle in handles {
        timings.push(handle.await??);
    }
    let wall = wall_clock.elapsed();

    timings.sort();
    let percentile = |p: f64| {
        let idx = ((timings.len() as f64 * p) as usize).min(timings.len() - 1);
        timings[idx]
    };
    let total: Duration = timings.iter().sum();

    println!("{}", "Benchmark results:".bold().blue());
    println!("Strategy: {}", strategy);
    println!("Requests: {} ({} concurrent)", timings.len(), concurrent.max(1));
    println!("Wall time: {:?}", wall);
    println!("Average latency: {:?}", total / timings.len() as u32);
    println!("P50 latency: {:?}", percentile(0.50));
    println!("P95 latency: {:?}", percentile(0.95));
    println!("P99 latency: {:?}", percentile(0.99));
    println!(
        "Throughput: {:.2} requests/second",
        timings.len() as f64 / wall.as_secs_f64()
    );
    Ok(())
}

fn print_recommendations(recommendations: &[ProductRecommendation], explain: bool) {
    if recommendations.is_empty() {
        println!("{}", "No recommendations".yellow());
        return;
    }
    for (i, rec) in recommendations.iter().enumerate() {
        println!(
            "{}. {} [{}] ¥{:.2} - Score: {:.3}",
            (i + 1).to_string().green(),
            rec.name,
            rec.id,
            rec.price,
            rec.score
        );
        if explain {
            println!("   {}", rec.reason);
            if let Some(url) = &rec.image_url {
                println!("   {}", url.dimmed());
            }
        }
    }
}
