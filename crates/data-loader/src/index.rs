//! DataIndex building, querying and validation.

use crate::error::{DataLoadError, Result};
use crate::parser;
use crate::types::*;
use std::path::Path;
use tracing::{debug, info};

impl DataIndex {
    /// Load the behavior log and catalog from a directory holding
    /// `behaviors.dat` and `products.dat`.
    pub fn load_from_files(data_dir: &Path, weights: &BehaviorWeights) -> Result<Self> {
        info!("Loading shop data from {:?}", data_dir);

        let behaviors_path = data_dir.join("behaviors.dat");
        let products_path = data_dir.join("products.dat");

        // Both files are independent, parse them in parallel
        let (events, products) = rayon::join(
            || parser::parse_behaviors(&behaviors_path, weights),
            || parser::parse_products(&products_path),
        );
        let events = events?;
        let products = products?;

        info!(
            "Loaded {} behavior events, {} products",
            events.len(),
            products.len()
        );

        let mut index = DataIndex::new();
        for product in products {
            index.insert_product(product);
        }
        for event in events {
            index.insert_event(event);
        }

        index.validate()?;
        Ok(index)
    }

    /// Events matching a typed query, in arrival order
    pub fn query_events(&self, query: &BehaviorQuery) -> Vec<BehaviorEvent> {
        match query.user_id {
            Some(user_id) => self
                .get_user_events(user_id)
                .into_iter()
                .filter(|e| query.matches(e))
                .cloned()
                .collect(),
            None => self
                .events
                .iter()
                .filter(|e| query.matches(e))
                .cloned()
                .collect(),
        }
    }

    /// Validate data integrity
    ///
    /// Events pointing at products missing from the catalog are allowed:
    /// products get delisted, and the engine drops such ids at enrichment.
    pub fn validate(&self) -> Result<()> {
        for product in self.products.values() {
            if !product.price.is_finite() || product.price < 0.0 {
                return Err(DataLoadError::InvalidField {
                    field: "price",
                    value: product.price.to_string(),
                });
            }
        }

        let mut dangling = 0usize;
        for event in &self.events {
            if !event.weight.is_finite() || event.weight < 0.0 {
                return Err(DataLoadError::InvalidField {
                    field: "weight",
                    value: event.weight.to_string(),
                });
            }
            if !self.products.contains_key(&event.product_id) {
                dangling += 1;
            }
        }
        if dangling > 0 {
            debug!("{} events reference products not in the catalog", dangling);
        }
        Ok(())
    }
}
