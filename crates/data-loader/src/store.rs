//! Storage seams the recommendation engine talks to.
//!
//! The engine never owns persistence. It reads behavior events and
//! products, and writes recommendation log rows, through these traits.
//! [`MemoryStore`] is the in-process implementation used by the binaries
//! and tests.

use crate::error::Result;
use crate::types::*;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::path::Path;

/// Read/append access to the behavior log
pub trait BehaviorSource: Send + Sync {
    /// Events matching `query`, in arrival order
    fn events(&self, query: &BehaviorQuery) -> Result<Vec<BehaviorEvent>>;

    fn append_event(&self, event: BehaviorEvent) -> Result<()>;
}

/// Read access to the product catalog
pub trait ProductCatalog: Send + Sync {
    /// Products for the given ids. Unknown ids are skipped, not an error.
    fn products_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>>;

    fn all_products(&self) -> Result<Vec<Product>>;
}

/// Persistence for recommendation log rows and their feedback flags
pub trait RecommendationLogStore: Send + Sync {
    fn append_entries(&self, entries: Vec<RecommendationLogEntry>) -> Result<()>;

    /// Flag the most recent entry for (user, product) as clicked.
    /// Returns whether an entry was found.
    fn mark_clicked(&self, user_id: UserId, product_id: ProductId) -> Result<bool>;

    /// Flag the most recent entry for (user, product) as purchased.
    /// Returns whether an entry was found.
    fn mark_purchased(&self, user_id: UserId, product_id: ProductId) -> Result<bool>;

    fn entries_for_user(&self, user_id: UserId) -> Result<Vec<RecommendationLogEntry>>;
}

/// Thread-safe in-memory store backed by a [`DataIndex`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    index: RwLock<DataIndex>,
    log: RwLock<Vec<RecommendationLogEntry>>,
}

impl MemoryStore {
    pub fn new(index: DataIndex) -> Self {
        Self {
            index: RwLock::new(index),
            log: RwLock::new(Vec::new()),
        }
    }

    /// Load `behaviors.dat` and `products.dat` from `data_dir`
    pub fn load_from_files(data_dir: &Path, weights: &BehaviorWeights) -> Result<Self> {
        Ok(Self::new(DataIndex::load_from_files(data_dir, weights)?))
    }

    /// Run `f` with shared access to the underlying index
    pub fn with_index<R>(&self, f: impl FnOnce(&DataIndex) -> R) -> R {
        f(&self.index.read())
    }

    pub fn insert_product(&self, product: Product) {
        self.index.write().insert_product(product);
    }

    fn update_latest(
        &self,
        user_id: UserId,
        product_id: ProductId,
        update: impl FnOnce(&mut RecommendationLogEntry),
    ) -> bool {
        let mut log = self.log.write();
        match log
            .iter_mut()
            .rev()
            .find(|e| e.user_id == user_id && e.product_id == product_id)
        {
            Some(entry) => {
                update(entry);
                true
            }
            None => false,
        }
    }
}

impl BehaviorSource for MemoryStore {
    fn events(&self, query: &BehaviorQuery) -> Result<Vec<BehaviorEvent>> {
        Ok(self.index.read().query_events(query))
    }

    fn append_event(&self, event: BehaviorEvent) -> Result<()> {
        self.index.write().insert_event(event);
        Ok(())
    }
}

impl ProductCatalog for MemoryStore {
    fn products_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>> {
        let index = self.index.read();
        let mut seen = HashSet::with_capacity(ids.len());
        Ok(ids
            .iter()
            .filter(|id| seen.insert(**id))
            .filter_map(|id| index.get_product(*id).cloned())
            .collect())
    }

    fn all_products(&self) -> Result<Vec<Product>> {
        let index = self.index.read();
        Ok(index
            .get_all_product_ids()
            .into_iter()
            .filter_map(|id| index.get_product(id).cloned())
            .collect())
    }
}

impl RecommendationLogStore for MemoryStore {
    fn append_entries(&self, entries: Vec<RecommendationLogEntry>) -> Result<()> {
        self.log.write().extend(entries);
        Ok(())
    }

    fn mark_clicked(&self, user_id: UserId, product_id: ProductId) -> Result<bool> {
        Ok(self.update_latest(user_id, product_id, |e| e.clicked = true))
    }

    fn mark_purchased(&self, user_id: UserId, product_id: ProductId) -> Result<bool> {
        Ok(self.update_latest(user_id, product_id, |e| e.purchased = true))
    }

    fn entries_for_user(&self, user_id: UserId) -> Result<Vec<RecommendationLogEntry>> {
        Ok(self
            .log
            .read()
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect())
    }
}
