//! Interaction matrix: the sparse user × product weight table every
//! collaborative strategy scores against.
//!
//! A matrix is a snapshot of the behavior log at build time. Strategies
//! treat it as read-only; `record` lets an owner keep a snapshot current
//! without rescanning the log.

use crate::similarity::SparseVector;
use data_loader::{BehaviorEvent, BehaviorWeights, ProductId, UserId};
use std::collections::HashMap;
use tracing::debug;

/// Sparse user → (product → aggregated weight) map. All weights are ≥ 0.
#[derive(Debug, Clone, Default)]
pub struct InteractionMatrix {
    rows: HashMap<UserId, SparseVector<ProductId>>,
    weights: BehaviorWeights,
}

impl InteractionMatrix {
    pub fn new(weights: BehaviorWeights) -> Self {
        Self {
            rows: HashMap::new(),
            weights,
        }
    }

    /// Fold one event into the snapshot. Repeated events on the same
    /// (user, product) pair are summed.
    pub fn record(&mut self, event: &BehaviorEvent) {
        let weight = self.weights.weight_of(&event.behavior_type);
        *self
            .rows
            .entry(event.user_id)
            .or_default()
            .entry(event.product_id)
            .or_insert(0.0) += weight;
    }

    /// The user's product vector, if they have any interaction
    pub fn user_vector(&self, user_id: UserId) -> Option<&SparseVector<ProductId>> {
        self.rows.get(&user_id).filter(|v| !v.is_empty())
    }

    /// Aggregated weight of one cell, 0 when absent
    pub fn weight(&self, user_id: UserId, product_id: ProductId) -> f64 {
        self.rows
            .get(&user_id)
            .and_then(|row| row.get(&product_id))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn rows(&self) -> &HashMap<UserId, SparseVector<ProductId>> {
        &self.rows
    }

    pub fn user_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Item → (user → weight) view of the same data
    pub fn transpose(&self) -> HashMap<ProductId, SparseVector<UserId>> {
        let mut columns: HashMap<ProductId, SparseVector<UserId>> = HashMap::new();
        for (&user_id, row) in &self.rows {
            for (&product_id, &weight) in row {
                columns.entry(product_id).or_default().insert(user_id, weight);
            }
        }
        columns
    }
}

/// Builds an [`InteractionMatrix`] from a batch of behavior events
#[derive(Debug, Clone, Default)]
pub struct InteractionMatrixBuilder {
    weights: BehaviorWeights,
}

impl InteractionMatrixBuilder {
    pub fn new(weights: BehaviorWeights) -> Self {
        Self { weights }
    }

    pub fn build(&self, events: &[BehaviorEvent]) -> InteractionMatrix {
        let mut matrix = InteractionMatrix::new(self.weights.clone());
        for event in events {
            matrix.record(event);
        }
        debug!(
            "Built interaction matrix: {} events, {} users",
            events.len(),
            matrix.user_count()
        );
        matrix
    }
}
