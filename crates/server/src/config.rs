//! Engine configuration.
//!
//! Every field has a default, so a config file only needs the values it
//! changes:
//!
//! ```json
//! { "popular_window_days": 7, "behavior_weights": { "purchase": 20.0 } }
//! ```

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use sources::{BehaviorWeights, SimilarityMetric};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Results returned when the caller does not ask for a count
    pub default_top_n: usize,

    /// Trailing window for popularity ranking
    pub popular_window_days: i64,

    /// Neighbor count for user-based CF
    pub neighbors: usize,

    /// Cut-off for both CF variants
    pub min_similarity: f64,

    /// Neighbor count of the UserCF check deciding whether a user has
    /// enough data for the hybrid path
    pub personalized_neighbors: usize,

    pub user_cf_weight: f64,
    pub item_cf_weight: f64,

    pub similarity_metric: SimilarityMetric,

    /// Only build the interaction matrix from the last N days.
    /// `None` uses the whole log.
    pub matrix_window_days: Option<i64>,

    /// Upper bound on a single scoring run
    pub scoring_timeout_ms: u64,

    /// Rank newest products when popularity also comes back empty
    pub newest_fallback: bool,

    pub behavior_weights: BehaviorWeights,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_top_n: 20,
            popular_window_days: 30,
            neighbors: 50,
            min_similarity: 0.1,
            personalized_neighbors: 10,
            user_cf_weight: 0.6,
            item_cf_weight: 0.4,
            similarity_metric: SimilarityMetric::Cosine,
            matrix_window_days: None,
            scoring_timeout_ms: 5_000,
            newest_fallback: false,
            behavior_weights: BehaviorWeights::default(),
        }
    }
}

impl EngineConfig {
    /// Load from a JSON file; missing fields keep their defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("{}: {}", path.display(), e)))?;
        let config: EngineConfig = serde_json::from_str(&raw)
            .map_err(|e| EngineError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        check_window("popular_window_days", self.popular_window_days)?;
        if let Some(days) = self.matrix_window_days {
            check_window("matrix_window_days", days)?;
        }
        if self.scoring_timeout_ms == 0 {
            return Err(EngineError::Config("scoring_timeout_ms must be positive".to_string()));
        }
        if self.user_cf_weight < 0.0 || self.item_cf_weight < 0.0 {
            return Err(EngineError::Config("hybrid weights must not be negative".to_string()));
        }
        Ok(())
    }

    pub fn scoring_timeout(&self) -> Duration {
        Duration::from_millis(self.scoring_timeout_ms)
    }

    pub fn with_behavior_weights(mut self, weights: BehaviorWeights) -> Self {
        self.behavior_weights = weights;
        self
    }

    pub fn with_hybrid_weights(mut self, user_cf_weight: f64, item_cf_weight: f64) -> Self {
        self.user_cf_weight = user_cf_weight;
        self.item_cf_weight = item_cf_weight;
        self
    }

    pub fn with_min_similarity(mut self, min_similarity: f64) -> Self {
        self.min_similarity = min_similarity;
        self
    }

    pub fn with_popular_window_days(mut self, days: i64) -> Self {
        self.popular_window_days = days;
        self
    }

    pub fn with_scoring_timeout(mut self, timeout: Duration) -> Self {
        self.scoring_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_newest_fallback(mut self, enabled: bool) -> Self {
        self.newest_fallback = enabled;
        self
    }
}

/// Longest trailing window accepted, in days. Anything larger overflows
/// date arithmetic against the current time.
pub const MAX_WINDOW_DAYS: i64 = 36_500;

fn check_window(name: &str, days: i64) -> Result<()> {
    if !(1..=MAX_WINDOW_DAYS).contains(&days) {
        return Err(EngineError::Config(format!(
            "{} must be between 1 and {}, got {}",
            name, MAX_WINDOW_DAYS, days
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_loader::BehaviorType;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.default_top_n, 20);
        assert_eq!(config.popular_window_days, 30);
        assert_eq!(config.neighbors, 50);
        assert_eq!(config.min_similarity, 0.1);
        assert_eq!(config.user_cf_weight, 0.6);
        assert_eq!(config.item_cf_weight, 0.4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let raw = r#"{
            "popular_window_days": 7,
            "similarity_metric": "pearson",
            "behavior_weights": { "purchase": 20.0 }
        }"#;
        let config: EngineConfig = serde_json::from_str(raw).unwrap();

        assert_eq!(config.popular_window_days, 7);
        assert_eq!(config.similarity_metric, SimilarityMetric::Pearson);
        assert_eq!(config.behavior_weights.weight_of(&BehaviorType::Purchase), 20.0);
        assert_eq!(config.behavior_weights.weight_of(&BehaviorType::View), 1.0);
        assert_eq!(config.neighbors, 50);
    }

    #[test]
    fn test_validate_rejects_bad_windows() {
        assert!(EngineConfig::default().with_popular_window_days(0).validate().is_err());

        let mut config = EngineConfig::default();
        config.matrix_window_days = Some(-3);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_overflowing_windows() {
        let huge = EngineConfig::default().with_popular_window_days(i64::MAX / 2);
        assert!(matches!(huge.validate(), Err(EngineError::Config(_))));

        let mut config = EngineConfig::default();
        config.matrix_window_days = Some(MAX_WINDOW_DAYS + 1);
        assert!(config.validate().is_err());

        config.matrix_window_days = Some(MAX_WINDOW_DAYS);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let config = EngineConfig::default().with_scoring_timeout(Duration::ZERO);
        assert!(matches!(config.validate(), Err(EngineError::Config(_))));

        let mut from_json: EngineConfig =
            serde_json::from_str(r#"{ "scoring_timeout_ms": 0 }"#).unwrap();
        assert!(from_json.validate().is_err());
        from_json.scoring_timeout_ms = 1;
        assert!(from_json.validate().is_ok());
    }

    #[test]
    fn test_scoring_timeout_saturates() {
        let config = EngineConfig::default().with_scoring_timeout(Duration::MAX);
        assert_eq!(config.scoring_timeout_ms, u64::MAX);

        let config = EngineConfig::default().with_scoring_timeout(Duration::from_secs(2));
        assert_eq!(config.scoring_timeout_ms, 2_000);
    }

    #[test]
    fn test_from_json_file() {
        let path =
            std::env::temp_dir().join(format!("engine-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "newest_fallback": true, "scoring_timeout_ms": 250 }"#)
            .unwrap();
        let config = EngineConfig::from_json_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert!(config.newest_fallback);
        assert_eq!(config.scoring_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn test_from_missing_file() {
        let err = EngineConfig::from_json_file(Path::new("/no/such/engine.json")).unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }
}
