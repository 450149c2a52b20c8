//! End-to-end orchestrator behavior against stores that misbehave.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::Utc;
use data_loader::{
    BehaviorEvent, BehaviorQuery, BehaviorSource, BehaviorType, BehaviorWeights, DataIndex,
    DataLoadError, MemoryStore, Product, ProductCatalog, ProductId, RecommendationLogEntry,
    RecommendationLogStore, UserId,
};
use server::{EngineConfig, EngineError, RecommendationOrchestrator, Strategy};

fn product(id: ProductId) -> Product {
    Product {
        id,
        name: format!("Product {}", id),
        price: 50.0 + id as f64,
        category_id: Some(1),
        image_urls: vec![],
        stock: 5,
        created_at: Utc::now() - chrono::Duration::days(id as i64),
    }
}

fn seeded_store() -> Arc<MemoryStore> {
    let weights = BehaviorWeights::default();
    let mut index = DataIndex::new();
    for id in 1..=4 {
        index.insert_product(product(id));
    }
    let at = Utc::now() - chrono::Duration::hours(2);
    for (user, product, behavior) in [
        (1, 1, BehaviorType::Purchase),
        (1, 2, BehaviorType::View),
        (2, 1, BehaviorType::Purchase),
        (2, 3, BehaviorType::AddCart),
        (3, 3, BehaviorType::Share),
    ] {
        index.insert_event(BehaviorEvent::new(user, product, behavior, at, &weights));
    }
    Arc::new(MemoryStore::new(index))
}

/// Behavior source that fails or panics on full-log scans but answers
/// windowed queries from the wrapped store
struct FlakySource {
    inner: Arc<MemoryStore>,
    panic: bool,
}

impl BehaviorSource for FlakySource {
    fn events(&self, query: &BehaviorQuery) -> data_loader::Result<Vec<BehaviorEvent>> {
        if query.since.is_none() && query.user_id.is_none() {
            if self.panic {
                panic!("matrix scan blew up");
            }
            return Err(DataLoadError::StoreUnavailable("behavior log offline".into()));
        }
        self.inner.events(query)
    }

    fn append_event(&self, event: BehaviorEvent) -> data_loader::Result<()> {
        self.inner.append_event(event)
    }
}

struct DownSource;

impl BehaviorSource for DownSource {
    fn events(&self, _query: &BehaviorQuery) -> data_loader::Result<Vec<BehaviorEvent>> {
        Err(DataLoadError::StoreUnavailable("behavior log offline".into()))
    }

    fn append_event(&self, _event: BehaviorEvent) -> data_loader::Result<()> {
        Err(DataLoadError::StoreUnavailable("behavior log offline".into()))
    }
}

struct SlowSource {
    inner: Arc<MemoryStore>,
}

impl BehaviorSource for SlowSource {
    fn events(&self, query: &BehaviorQuery) -> data_loader::Result<Vec<BehaviorEvent>> {
        if query.since.is_none() {
            std::thread::sleep(Duration::from_millis(300));
        }
        self.inner.events(query)
    }

    fn append_event(&self, event: BehaviorEvent) -> data_loader::Result<()> {
        self.inner.append_event(event)
    }
}

/// Counts windowed (popularity) scans while delegating to the store
struct CountingSource {
    inner: Arc<MemoryStore>,
    windowed_scans: AtomicUsize,
}

impl BehaviorSource for CountingSource {
    fn events(&self, query: &BehaviorQuery) -> data_loader::Result<Vec<BehaviorEvent>> {
        if query.since.is_some() {
            self.windowed_scans.fetch_add(1, Ordering::SeqCst);
        }
        self.inner.events(query)
    }

    fn append_event(&self, event: BehaviorEvent) -> data_loader::Result<()> {
        self.inner.append_event(event)
    }
}

/// Catalog that only knows a subset of the products
struct PartialCatalog {
    inner: Arc<MemoryStore>,
    known: Vec<ProductId>,
}

impl ProductCatalog for PartialCatalog {
    fn products_by_ids(&self, ids: &[ProductId]) -> data_loader::Result<Vec<Product>> {
        let wanted: Vec<ProductId> =
            ids.iter().copied().filter(|id| self.known.contains(id)).collect();
        self.inner.products_by_ids(&wanted)
    }

    fn all_products(&self) -> data_loader::Result<Vec<Product>> {
        self.inner.products_by_ids(&self.known)
    }
}

#[derive(Default)]
struct BrokenLog {
    attempts: AtomicUsize,
}

impl RecommendationLogStore for BrokenLog {
    fn append_entries(&self, _entries: Vec<RecommendationLogEntry>) -> data_loader::Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(DataLoadError::StoreUnavailable("log table locked".into()))
    }

    fn mark_clicked(&self, _user_id: UserId, _product_id: ProductId) -> data_loader::Result<bool> {
        Err(DataLoadError::StoreUnavailable("log table locked".into()))
    }

    fn mark_purchased(
        &self,
        _user_id: UserId,
        _product_id: ProductId,
    ) -> data_loader::Result<bool> {
        Err(DataLoadError::StoreUnavailable("log table locked".into()))
    }

    fn entries_for_user(
        &self,
        _user_id: UserId,
    ) -> data_loader::Result<Vec<RecommendationLogEntry>> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn test_source_error_falls_back_to_popular() {
    let store = seeded_store();
    let source = Arc::new(FlakySource {
        inner: store.clone(),
        panic: false,
    });
    let orchestrator = RecommendationOrchestrator::new(
        source,
        store.clone(),
        store.clone(),
        EngineConfig::default(),
    );

    let recs = orchestrator
        .get_recommendations(1, Strategy::Hybrid, Some(3))
        .await
        .unwrap();

    assert_eq!(recs.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 3, 2]);
    let log = store.entries_for_user(1).unwrap();
    assert!(log.iter().all(|e| e.recommend_type == "hybrid" && e.algorithm_type == "popular"));
}

#[tokio::test]
async fn test_panicking_strategy_falls_back_to_popular() {
    let store = seeded_store();
    let source = Arc::new(FlakySource {
        inner: store.clone(),
        panic: true,
    });
    let orchestrator = RecommendationOrchestrator::new(
        source,
        store.clone(),
        store.clone(),
        EngineConfig::default(),
    );

    let recs = orchestrator
        .get_recommendations(1, Strategy::UserCf, Some(2))
        .await
        .unwrap();
    assert_eq!(recs.len(), 2);
    assert_eq!(recs[0].id, 1);
}

#[tokio::test]
async fn test_timeout_falls_back_to_popular() {
    let store = seeded_store();
    let source = Arc::new(SlowSource { inner: store.clone() });
    let config = EngineConfig::default().with_scoring_timeout(Duration::from_millis(50));
    let orchestrator =
        RecommendationOrchestrator::new(source, store.clone(), store.clone(), config);

    let recs = orchestrator
        .get_recommendations(2, Strategy::ItemCf, Some(5))
        .await
        .unwrap();
    assert!(!recs.is_empty());

    let log = store.entries_for_user(2).unwrap();
    assert!(log.iter().all(|e| e.algorithm_type == "popular"));
}

#[tokio::test]
async fn test_unreachable_source_propagates() {
    let store = seeded_store();
    let orchestrator = RecommendationOrchestrator::new(
        Arc::new(DownSource),
        store.clone(),
        store.clone(),
        EngineConfig::default(),
    );

    let err = orchestrator
        .get_recommendations(1, Strategy::Personalized, Some(5))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::SourceUnavailable(_)));
}

#[tokio::test]
async fn test_unknown_products_are_dropped() {
    let store = seeded_store();
    let catalog = Arc::new(PartialCatalog {
        inner: store.clone(),
        known: vec![2, 3],
    });
    let orchestrator = RecommendationOrchestrator::new(
        store.clone(),
        catalog,
        store.clone(),
        EngineConfig::default(),
    );

    let recs = orchestrator
        .get_recommendations(9, Strategy::Popular, Some(10))
        .await
        .unwrap();

    // Product 1 is the most popular but the catalog no longer has it
    assert_eq!(recs.iter().map(|r| r.id).collect::<Vec<_>>(), vec![3, 2]);
    assert_eq!(store.entries_for_user(9).unwrap().len(), 2);
}

#[tokio::test]
async fn test_logging_failure_is_swallowed() {
    let store = seeded_store();
    let log = Arc::new(BrokenLog::default());
    let orchestrator = RecommendationOrchestrator::new(
        store.clone(),
        store.clone(),
        log.clone(),
        EngineConfig::default(),
    );

    let recs = orchestrator
        .get_recommendations(3, Strategy::Personalized, Some(3))
        .await
        .unwrap();
    assert!(!recs.is_empty());
    assert_eq!(log.attempts.load(Ordering::SeqCst), 1);

    // Feedback against a broken log does not panic or error
    orchestrator.record_click(3, recs[0].id);
    orchestrator.record_purchase(3, recs[0].id);
}

#[tokio::test]
async fn test_behavior_append_failure_is_swallowed() {
    let store = seeded_store();
    let orchestrator = RecommendationOrchestrator::new(
        Arc::new(DownSource),
        store.clone(),
        store.clone(),
        EngineConfig::default(),
    );

    orchestrator.record_behavior(1, 2, BehaviorType::Other("wishlist".into()));
}

#[tokio::test]
async fn test_custom_weights_change_popularity() {
    let store = seeded_store();
    let weights = BehaviorWeights::default().with_weight(BehaviorType::Share, 100.0);
    let config = EngineConfig::default().with_behavior_weights(weights);
    let orchestrator = RecommendationOrchestrator::from_store(store, config);

    let recs = orchestrator
        .get_recommendations(9, Strategy::Popular, Some(1))
        .await
        .unwrap();
    assert_eq!(recs[0].id, 3);
}

#[tokio::test]
async fn test_concurrent_requests_share_store() {
    let store = seeded_store();
    let orchestrator =
        RecommendationOrchestrator::from_store(store.clone(), EngineConfig::default());

    let (a, b, c) = tokio::join!(
        orchestrator.get_recommendations(1, Strategy::Personalized, Some(3)),
        orchestrator.get_recommendations(2, Strategy::ItemCf, Some(3)),
        orchestrator.get_recommendations(9, Strategy::Popular, Some(3)),
    );
    assert!(a.is_ok() && b.is_ok() && c.is_ok());
    assert!(!store.entries_for_user(9).unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_personalized_runs_popularity_once() {
    let store = Arc::new(MemoryStore::default());
    store.insert_product(product(1));
    let source = Arc::new(CountingSource {
        inner: store.clone(),
        windowed_scans: AtomicUsize::new(0),
    });
    let orchestrator = RecommendationOrchestrator::new(
        source.clone(),
        store.clone(),
        store.clone(),
        EngineConfig::default(),
    );

    let recs = orchestrator
        .get_recommendations(1, Strategy::Personalized, Some(5))
        .await
        .unwrap();

    assert!(recs.is_empty());
    assert_eq!(source.windowed_scans.load(Ordering::SeqCst), 1);
}
