// Recommender configuration with environment overrides

use crate::core::features::CategorySet;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::warn;

pub const ENV_RESULT_LIMIT: &str = "RECOMMENDER_RESULT_LIMIT";
pub const ENV_MAX_ITERATIONS: &str = "RECOMMENDER_MAX_ITERATIONS";
pub const ENV_TOLERANCE: &str = "RECOMMENDER_TOLERANCE";
pub const ENV_PREFERENCE_LIMIT: &str = "RECOMMENDER_PREFERENCE_LIMIT";
pub const ENV_SEED: &str = "RECOMMENDER_SEED";
pub const ENV_CATEGORIES: &str = "RECOMMENDER_CATEGORIES";

/// Tunables for similarity, batch refresh and personal recommendations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommenderConfig {
    /// Similar items returned when the caller does not ask for a count
    pub result_limit: usize,
    pub max_iterations: usize,
    pub tolerance: f32,
    /// Upper bound on k for per-item similarity
    pub similar_max_k: usize,
    /// Other items needed per cluster for per-item similarity
    pub similar_items_per_cluster: usize,
    /// Upper bound on k for the batch refresh
    pub refresh_max_k: usize,
    pub refresh_items_per_cluster: usize,
    /// Below this many other items clustering is skipped
    pub min_other_items: usize,
    pub category_fallback_score: f32,
    /// Items returned by personal recommendations
    pub preference_limit: usize,
    /// Fixed RNG seed; None draws fresh entropy per call
    pub seed: Option<u64>,
    pub categories: CategorySet,
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        RecommenderConfig {
            result_limit: 6,
            max_iterations: 100,
            tolerance: 0.001,
            similar_max_k: 5,
            similar_items_per_cluster: 3,
            refresh_max_k: 8,
            refresh_items_per_cluster: 4,
            min_other_items: 3,
            category_fallback_score: 0.7,
            preference_limit: 2,
            seed: None,
            categories: CategorySet::default(),
        }
    }
}

impl RecommenderConfig {
    /// Defaults overridden by RECOMMENDER_* environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = RecommenderConfig::default();

        override_parsed(&lookup, ENV_RESULT_LIMIT, &mut config.result_limit);
        override_parsed(&lookup, ENV_MAX_ITERATIONS, &mut config.max_iterations);
        override_parsed(&lookup, ENV_TOLERANCE, &mut config.tolerance);
        override_parsed(&lookup, ENV_PREFERENCE_LIMIT, &mut config.preference_limit);

        if let Some(raw) = lookup(ENV_SEED) {
            match raw.trim().parse::<u64>() {
                Ok(seed) => config.seed = Some(seed),
                Err(_) => warn!(var = ENV_SEED, value = %raw, "Ignoring unparseable seed"),
            }
        }

        if let Some(raw) = lookup(ENV_CATEGORIES) {
            let names: Vec<String> = raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if names.is_empty() {
                warn!(var = ENV_CATEGORIES, "Empty category list, keeping defaults");
            } else {
                config.categories = CategorySet::new(names);
            }
        }

        config
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_categories(mut self, categories: CategorySet) -> Self {
        self.categories = categories;
        self
    }

    /// Requested similar-item count; missing or zero means `result_limit`
    pub fn similar_limit(&self, requested: Option<usize>) -> usize {
        requested.filter(|&n| n > 0).unwrap_or(self.result_limit)
    }

    /// Requested personal recommendation count; missing or zero means `preference_limit`
    pub fn preference_limit(&self, requested: Option<usize>) -> usize {
        requested.filter(|&n| n > 0).unwrap_or(self.preference_limit)
    }

    /// k for per-item similarity over `others` candidate items
    pub fn similar_k(&self, others: usize) -> usize {
        let per = self.similar_items_per_cluster.max(1);
        (others / per).min(self.similar_max_k).max(2)
    }

    /// k for the batch refresh over `items` catalog items
    pub fn refresh_k(&self, items: usize) -> usize {
        let per = self.refresh_items_per_cluster.max(1);
        (items / per).min(self.refresh_max_k).max(2)
    }
}

fn override_parsed<F, T>(lookup: &F, key: &str, target: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(raw) = lookup(key) {
        match raw.trim().parse::<T>() {
            Ok(value) => *target = value,
            Err(_) => warn!(var = key, value = %raw, "Ignoring unparseable value, keeping default"),
        }
    }
}
