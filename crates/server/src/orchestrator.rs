//! # Recommendation Orchestrator
//!
//! Single entry point for callers. For one request it:
//! 1. Dispatches to the requested strategy on a blocking thread, bounded by
//!    the scoring timeout
//! 2. Falls back to popularity when the strategy fails or comes back empty
//! 3. Enriches the ranked ids with catalog data, dropping unknown products
//! 4. Writes one recommendation-log entry per returned product
//!
//! Logging and feedback are best-effort: a failing log store never turns a
//! good recommendation into an error.
//!
//! ## Personalized
//!
//! A small UserCF run decides the route. Users with at least one neighbor get
//! the hybrid blend; everyone else gets content-based scoring, and users
//! without any usable history end up on popularity.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use data_loader::{
    BehaviorEvent, BehaviorQuery, BehaviorSource, BehaviorType, MemoryStore, Product,
    ProductCatalog, ProductId, RecommendationLogEntry, RecommendationLogStore, UserId,
};
use sources::{
    ContentBasedRecommender, HybridBlender, InteractionMatrix, InteractionMatrixBuilder,
    ItemBasedCf, PopularityRecommender, RecommendationResult, UserBasedCf, days_before,
    newest_products,
};

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::strategy::Strategy;

/// Final recommendation returned to the caller
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecommendation {
    pub id: ProductId,
    pub name: String,
    pub price: f64,
    pub image_url: Option<String>,
    pub score: f64,
    pub reason: String,
}

impl ProductRecommendation {
    fn from_product(product: &Product, result: RecommendationResult) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            price: product.price,
            image_url: product.primary_image().map(str::to_string),
            score: result.score,
            reason: result.reason,
        }
    }
}

/// Ranked candidates and the strategy that actually produced them
#[derive(Debug, Clone)]
struct ScoredBatch {
    algorithm: Strategy,
    results: Vec<RecommendationResult>,
}

impl ScoredBatch {
    fn empty(algorithm: Strategy) -> Self {
        Self {
            algorithm,
            results: Vec::new(),
        }
    }
}

#[derive(Clone)]
pub struct RecommendationOrchestrator {
    behaviors: Arc<dyn BehaviorSource>,
    catalog: Arc<dyn ProductCatalog>,
    log_store: Arc<dyn RecommendationLogStore>,
    config: Arc<EngineConfig>,
}

impl RecommendationOrchestrator {
    pub fn new(
        behaviors: Arc<dyn BehaviorSource>,
        catalog: Arc<dyn ProductCatalog>,
        log_store: Arc<dyn RecommendationLogStore>,
        config: EngineConfig,
    ) -> Self {
        Self {
            behaviors,
            catalog,
            log_store,
            config: Arc::new(config),
        }
    }

    /// Wire every port to the same in-memory store
    pub fn from_store(store: Arc<MemoryStore>, config: EngineConfig) -> Self {
        Self::new(store.clone(), store.clone(), store, config)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Main entry point: ranked, catalog-enriched recommendations for a user.
    ///
    /// `top_n` defaults to `default_top_n`. The only error a caller sees is
    /// [`EngineError::SourceUnavailable`], raised when even the popularity
    /// fallback cannot read its data or the catalog is unreachable.
    #[instrument(skip(self, strategy), fields(strategy = %strategy))]
    pub async fn get_recommendations(
        &self,
        user_id: UserId,
        strategy: Strategy,
        top_n: Option<usize>,
    ) -> Result<Vec<ProductRecommendation>> {
        let start_time = Instant::now();
        let top_n = top_n.unwrap_or(self.config.default_top_n);
        if top_n == 0 {
            return Ok(Vec::new());
        }

        let mut batch = match self.score(user_id, strategy, top_n).await {
            Ok(batch) if !batch.results.is_empty() => batch,
            // Already popularity (directly or at the end of personalized)
            Ok(batch) if batch.algorithm == Strategy::Popular => batch,
            Err(e) if strategy == Strategy::Popular => self.recover(Strategy::Popular, e)?,
            Ok(_) => {
                info!(
                    "{} produced nothing for user {}, falling back to popular",
                    strategy, user_id
                );
                self.fallback(user_id, top_n).await?
            }
            Err(e) => {
                warn!(
                    error = %e,
                    "{} failed for user {}, falling back to popular",
                    strategy, user_id
                );
                self.fallback(user_id, top_n).await?
            }
        };

        if batch.results.is_empty() && self.config.newest_fallback && strategy != Strategy::Newest
        {
            info!("No popular products in window, ranking newest arrivals");
            batch = match self.score(user_id, Strategy::Newest, top_n).await {
                Ok(batch) => batch,
                Err(e) => self.recover(Strategy::Newest, e)?,
            };
        }
        info!(
            "Scored {} candidates via {} (requested {})",
            batch.results.len(),
            batch.algorithm,
            strategy
        );

        let algorithm = batch.algorithm;
        let recommendations = self.enrich(batch.results, top_n)?;
        self.log_recommendations(user_id, strategy, algorithm, &recommendations);

        info!(
            "Served {} recommendations to user {} in {:?}",
            recommendations.len(),
            user_id,
            start_time.elapsed()
        );
        Ok(recommendations)
    }

    /// Current popularity ranking, enriched but not written to the
    /// recommendation log since no user asked for it
    pub async fn popular_products(&self, top_n: usize) -> Result<Vec<ProductRecommendation>> {
        if top_n == 0 {
            return Ok(Vec::new());
        }
        // Popularity ignores the user id
        let batch = match self.score(UserId::default(), Strategy::Popular, top_n).await {
            Ok(batch) => batch,
            Err(e) => self.recover(Strategy::Popular, e)?,
        };
        self.enrich(batch.results, top_n)
    }

    /// Flag the most recent log entry for (user, product) as clicked
    pub fn record_click(&self, user_id: UserId, product_id: ProductId) {
        self.record_feedback("click", user_id, product_id, |store| {
            store.mark_clicked(user_id, product_id)
        });
    }

    /// Flag the most recent log entry for (user, product) as purchased
    pub fn record_purchase(&self, user_id: UserId, product_id: ProductId) {
        self.record_feedback("purchase", user_id, product_id, |store| {
            store.mark_purchased(user_id, product_id)
        });
    }

    /// Append a behavior event stamped with the configured weight table
    pub fn record_behavior(&self, user_id: UserId, product_id: ProductId, behavior: BehaviorType) {
        let event = BehaviorEvent::new(
            user_id,
            product_id,
            behavior,
            Utc::now(),
            &self.config.behavior_weights,
        );
        if let Err(e) = self.behaviors.append_event(event) {
            let err = EngineError::Logging {
                what: "behavior event",
                reason: e.to_string(),
            };
            warn!("{}", err);
        }
    }

    fn record_feedback(
        &self,
        kind: &str,
        user_id: UserId,
        product_id: ProductId,
        update: impl FnOnce(&dyn RecommendationLogStore) -> data_loader::Result<bool>,
    ) {
        match update(self.log_store.as_ref()) {
            Ok(true) => debug!("Recorded {} for user {} on product {}", kind, user_id, product_id),
            Ok(false) => debug!(
                "No recommendation logged for user {} and product {}, {} ignored",
                user_id, product_id, kind
            ),
            Err(e) => {
                let err = EngineError::Logging {
                    what: "recommendation feedback",
                    reason: e.to_string(),
                };
                warn!("{}", err);
            }
        }
    }

    // ------------------------------------------------------------------------
    // Scoring
    // ------------------------------------------------------------------------

    /// Run one strategy on the blocking pool, bounded by the scoring timeout
    async fn score(
        &self,
        user_id: UserId,
        strategy: Strategy,
        top_n: usize,
    ) -> Result<ScoredBatch> {
        let this = self.clone();
        let task =
            tokio::task::spawn_blocking(move || this.score_blocking(user_id, strategy, top_n));

        let timeout = self.config.scoring_timeout();
        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(EngineError::Computation(format!(
                "{} task panicked: {}",
                strategy, join_error
            ))),
            // The blocking task keeps running; its result is discarded
            Err(_) => Err(EngineError::Timeout(timeout)),
        }
    }

    async fn fallback(&self, user_id: UserId, top_n: usize) -> Result<ScoredBatch> {
        match self.score(user_id, Strategy::Popular, top_n).await {
            Ok(batch) => Ok(batch),
            Err(e) => self.recover(Strategy::Popular, e),
        }
    }

    /// Source outages propagate; any other scoring failure degrades to an
    /// empty batch
    fn recover(&self, algorithm: Strategy, error: EngineError) -> Result<ScoredBatch> {
        match error {
            EngineError::SourceUnavailable(_) => Err(error),
            other => {
                warn!(error = %other, "{} failed, returning no candidates", algorithm);
                Ok(ScoredBatch::empty(algorithm))
            }
        }
    }

    fn score_blocking(
        &self,
        user_id: UserId,
        strategy: Strategy,
        top_n: usize,
    ) -> Result<ScoredBatch> {
        let results = match strategy {
            Strategy::UserCf => {
                let matrix = self.load_matrix()?;
                let mut results = self.user_cf(self.config.neighbors).recommend(&matrix, user_id);
                results.truncate(top_n);
                results
            }
            Strategy::ItemCf => {
                let matrix = self.load_matrix()?;
                self.item_cf(top_n).recommend(&matrix, user_id)
            }
            Strategy::Hybrid => {
                let matrix = self.load_matrix()?;
                self.hybrid().recommend(&matrix, user_id, top_n)
            }
            Strategy::Content => self.content(user_id, top_n)?,
            Strategy::Popular => self.popular(top_n)?,
            Strategy::Newest => self.newest(user_id, top_n)?,
            Strategy::Personalized => return self.personalized(user_id, top_n),
        };
        Ok(ScoredBatch {
            algorithm: strategy,
            results,
        })
    }

    fn personalized(&self, user_id: UserId, top_n: usize) -> Result<ScoredBatch> {
        let matrix = self.load_matrix()?;

        let neighbor_recs = self
            .user_cf(self.config.personalized_neighbors)
            .recommend(&matrix, user_id);
        if !neighbor_recs.is_empty() {
            let results = self.hybrid().recommend(&matrix, user_id, top_n);
            if !results.is_empty() {
                return Ok(ScoredBatch {
                    algorithm: Strategy::Hybrid,
                    results,
                });
            }
        }
        debug!("User {} has no CF neighbors, trying content", user_id);

        let results = self.content(user_id, top_n)?;
        if !results.is_empty() {
            return Ok(ScoredBatch {
                algorithm: Strategy::Content,
                results,
            });
        }

        Ok(ScoredBatch {
            algorithm: Strategy::Popular,
            results: self.popular(top_n)?,
        })
    }

    fn load_matrix(&self) -> Result<InteractionMatrix> {
        let query = match self.config.matrix_window_days {
            Some(days) => BehaviorQuery::all().since(days_before(Utc::now(), days)),
            None => BehaviorQuery::all(),
        };
        let events = self.behaviors.events(&query)?;
        Ok(InteractionMatrixBuilder::new(self.config.behavior_weights.clone()).build(&events))
    }

    fn user_cf(&self, neighbors: usize) -> UserBasedCf {
        UserBasedCf::new()
            .with_neighbors(neighbors)
            .with_min_similarity(self.config.min_similarity)
            .with_metric(self.config.similarity_metric)
    }

    fn item_cf(&self, limit: usize) -> ItemBasedCf {
        ItemBasedCf::new()
            .with_limit(limit)
            .with_min_similarity(self.config.min_similarity)
            .with_metric(self.config.similarity_metric)
    }

    fn hybrid(&self) -> HybridBlender {
        HybridBlender::new()
            .with_weights(self.config.user_cf_weight, self.config.item_cf_weight)
            .with_min_similarity(self.config.min_similarity)
            .with_metric(self.config.similarity_metric)
    }

    fn content(&self, user_id: UserId, top_n: usize) -> Result<Vec<RecommendationResult>> {
        let user_events = self.behaviors.events(&BehaviorQuery::all().for_user(user_id))?;
        if user_events.is_empty() {
            return Ok(Vec::new());
        }
        let catalog = self.catalog.all_products()?;
        Ok(ContentBasedRecommender::new().recommend(user_id, &user_events, &catalog, top_n))
    }

    fn popular(&self, top_n: usize) -> Result<Vec<RecommendationResult>> {
        let now = Utc::now();
        let recommender = PopularityRecommender::new(self.config.behavior_weights.clone())
            .with_window_days(self.config.popular_window_days);
        let events = self
            .behaviors
            .events(&BehaviorQuery::all().since(recommender.window_start(now)))?;
        Ok(recommender.recommend_at(&events, now, top_n))
    }

    fn newest(&self, user_id: UserId, top_n: usize) -> Result<Vec<RecommendationResult>> {
        let seen: HashSet<ProductId> = self
            .behaviors
            .events(&BehaviorQuery::all().for_user(user_id))?
            .into_iter()
            .map(|e| e.product_id)
            .collect();
        let catalog = self.catalog.all_products()?;
        Ok(newest_products(&catalog, &seen, top_n))
    }

    // ------------------------------------------------------------------------
    // Output
    // ------------------------------------------------------------------------

    /// Attach catalog data in ranked order, dropping ids the catalog does not
    /// know, then cut to `top_n`
    fn enrich(
        &self,
        results: Vec<RecommendationResult>,
        top_n: usize,
    ) -> Result<Vec<ProductRecommendation>> {
        if results.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<ProductId> = results.iter().map(|r| r.product_id).collect();
        let products: HashMap<ProductId, Product> = self
            .catalog
            .products_by_ids(&ids)?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let recommendations: Vec<ProductRecommendation> = results
            .into_iter()
            .filter_map(|result| {
                let product = products.get(&result.product_id)?;
                Some(ProductRecommendation::from_product(product, result))
            })
            .take(top_n)
            .collect();

        let dropped = ids.len().min(top_n).saturating_sub(recommendations.len());
        if dropped > 0 {
            debug!("Dropped {} candidates missing from the catalog", dropped);
        }
        Ok(recommendations)
    }

    fn log_recommendations(
        &self,
        user_id: UserId,
        requested: Strategy,
        algorithm: Strategy,
        recommendations: &[ProductRecommendation],
    ) {
        if recommendations.is_empty() {
            return;
        }
        let timestamp = Utc::now();
        let entries = recommendations
            .iter()
            .map(|rec| RecommendationLogEntry {
                user_id,
                product_id: rec.id,
                recommend_type: requested.as_str().to_string(),
                algorithm_type: algorithm.as_str().to_string(),
                score: rec.score,
                clicked: false,
                purchased: false,
                timestamp,
            })
            .collect();

        if let Err(e) = self.log_store.append_entries(entries) {
            let err = EngineError::Logging {
                what: "recommendation log",
                reason: e.to_string(),
            };
            warn!("{}", err);
        }
    }
}
