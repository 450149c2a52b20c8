//! Similarity measures over sparse vectors.
//!
//! Vectors are `HashMap<K, f64>`; a missing key means 0.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::Hash;

/// Sparse vector keyed by product, user or feature
pub type SparseVector<K> = HashMap<K, f64>;

/// Which measure to use when comparing two vectors
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityMetric {
    #[default]
    Cosine,
    /// Available as an alternative; no default strategy selects it
    Pearson,
}

impl SimilarityMetric {
    pub fn compute<K: Eq + Hash>(self, a: &SparseVector<K>, b: &SparseVector<K>) -> f64 {
        match self {
            SimilarityMetric::Cosine => cosine(a, b),
            SimilarityMetric::Pearson => pearson(a, b),
        }
    }
}

/// Cosine similarity over the union of keys.
///
/// The dot product only has terms on shared keys, but both norms cover
/// every key of their own vector. Returns 0 when either norm is 0.
pub fn cosine<K: Eq + Hash>(a: &SparseVector<K>, b: &SparseVector<K>) -> f64 {
    // Iterate the smaller map for the dot product
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let dot: f64 = small
        .iter()
        .filter_map(|(k, x)| large.get(k).map(|y| x * y))
        .sum();

    let norm_a: f64 = a.values().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b: f64 = b.values().map(|x| x * x).sum::<f64>().sqrt();

    let denominator = norm_a * norm_b;
    if denominator == 0.0 {
        0.0
    } else {
        dot / denominator
    }
}

/// Pearson correlation over the intersection of keys.
///
/// Returns 0 when there is no common key or either side has zero variance
/// on the common keys.
pub fn pearson<K: Eq + Hash>(a: &SparseVector<K>, b: &SparseVector<K>) -> f64 {
    let common: Vec<(f64, f64)> = a
        .iter()
        .filter_map(|(k, x)| b.get(k).map(|y| (*x, *y)))
        .collect();
    if common.is_empty() {
        return 0.0;
    }

    let n = common.len() as f64;
    let mean_a = common.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_b = common.iter().map(|(_, y)| y).sum::<f64>() / n;

    let (mut covariance, mut variance_a, mut variance_b) = (0.0, 0.0, 0.0);
    for (x, y) in &common {
        let dx = x - mean_a;
        let dy = y - mean_b;
        covariance += dx * dy;
        variance_a += dx * dx;
        variance_b += dy * dy;
    }

    let denominator = variance_a.sqrt() * variance_b.sqrt();
    if denominator == 0.0 {
        0.0
    } else {
        covariance / denominator
    }
}
