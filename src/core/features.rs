// Feature extraction for catalog items
//
// Every item becomes a fixed-length vector of values in [0, 1]:
// [price, one-hot categories..., popularity, stock, price tier]

use crate::core::types::{CatalogItem, PopularityTable};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Average price assumed when the catalog has no priced items
pub const DEFAULT_AVG_PRICE: f64 = 20.0;

/// Below this share of the global average price an item is "budget"
pub const BUDGET_RATIO: f64 = 0.7;

/// From this share of the global average price upwards an item is "premium"
pub const PREMIUM_RATIO: f64 = 1.3;

/// Feature vector of one catalog item
pub type FeatureVector = Vec<f32>;

/// Fixed category enumeration used for one-hot encoding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySet {
    names: Vec<String>,
}

impl CategorySet {
    pub fn new<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        CategorySet {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Position of a category in the enumeration, None when it is not a major category
    pub fn index_of(&self, category: &str) -> Option<usize> {
        self.names.iter().position(|n| n == category)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for CategorySet {
    fn default() -> Self {
        CategorySet::new([
            "Fiction",
            "Science Fiction",
            "Romance",
            "History",
            "Business",
            "Technology",
            "Education",
            "Children",
        ])
    }
}

/// Budget / mid-range / premium classification relative to the global average price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PriceTier {
    Budget,
    MidRange,
    Premium,
}

impl PriceTier {
    pub fn classify(price: f64, global_avg_price: f64) -> Self {
        if price < global_avg_price * BUDGET_RATIO {
            PriceTier::Budget
        } else if price < global_avg_price * PREMIUM_RATIO {
            PriceTier::MidRange
        } else {
            PriceTier::Premium
        }
    }

    pub fn score(&self) -> f32 {
        match self {
            PriceTier::Budget => 1.0,
            PriceTier::MidRange => 0.5,
            PriceTier::Premium => 0.0,
        }
    }
}

/// Price statistics of one category
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryPriceStats {
    pub avg_price: f64,
    pub max_price: f64,
    pub count: usize,
}

/// Immutable normalisation statistics, computed once per resolution call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogStats {
    pub category_stats: HashMap<String, CategoryPriceStats>,
    pub popularity: PopularityTable,
    pub max_popularity: u64,
    pub max_stock: u32,
    pub global_avg_price: f64,
    pub total_items: usize,
}

impl CatalogStats {
    /// Scan the full catalog and take a popularity snapshot
    pub fn compute(items: &[CatalogItem], popularity: PopularityTable) -> Self {
        let mut totals: HashMap<String, (f64, usize, f64)> = HashMap::new();
        let mut price_sum = 0.0f64;
        let mut max_stock = 0u32;

        for item in items {
            price_sum += item.price;
            max_stock = max_stock.max(item.stock);

            let entry = totals.entry(item.category.clone()).or_insert((0.0, 0, 0.0));
            entry.0 += item.price;
            entry.1 += 1;
            entry.2 = entry.2.max(item.price);
        }

        let category_stats = totals
            .into_iter()
            .map(|(category, (sum, count, max_price))| {
                (
                    category,
                    CategoryPriceStats {
                        avg_price: sum / count as f64,
                        max_price,
                        count,
                    },
                )
            })
            .collect();

        let global_avg_price = if items.is_empty() {
            DEFAULT_AVG_PRICE
        } else {
            price_sum / items.len() as f64
        };

        CatalogStats {
            category_stats,
            max_popularity: popularity.max(),
            popularity,
            max_stock,
            global_avg_price,
            total_items: items.len(),
        }
    }

    fn effective_avg_price(&self) -> f64 {
        if self.global_avg_price > 0.0 && self.global_avg_price.is_finite() {
            self.global_avg_price
        } else {
            DEFAULT_AVG_PRICE
        }
    }
}

/// Builds feature vectors for catalog items
#[derive(Debug, Clone, Default)]
pub struct FeatureExtractor {
    categories: CategorySet,
}

impl FeatureExtractor {
    pub fn new(categories: CategorySet) -> Self {
        FeatureExtractor { categories }
    }

    /// Length of every vector this extractor produces
    pub fn dimension(&self) -> usize {
        self.categories.len() + 4
    }

    pub fn categories(&self) -> &CategorySet {
        &self.categories
    }

    pub fn extract(&self, item: &CatalogItem, stats: &CatalogStats) -> FeatureVector {
        let mut features = Vec::with_capacity(self.dimension());

        features.push(price_score(item, stats));

        let hot = self.categories.index_of(&item.category);
        features.extend((0..self.categories.len()).map(|i| if hot == Some(i) { 1.0 } else { 0.0 }));

        features.push(ratio(stats.popularity.get(&item.id) as f64, stats.max_popularity as f64));
        features.push(ratio(item.stock as f64, stats.max_stock as f64));
        features.push(PriceTier::classify(item.price, stats.effective_avg_price()).score());

        features
    }

    /// Extract vectors for many items, keeping the input order
    pub fn extract_all(&self, items: &[CatalogItem], stats: &CatalogStats) -> Vec<FeatureVector> {
        items.iter().map(|item| self.extract(item, stats)).collect()
    }
}

/// Price relative to the category maximum; unknown categories normalise by the item's own price
fn price_score(item: &CatalogItem, stats: &CatalogStats) -> f32 {
    let max_price = stats
        .category_stats
        .get(&item.category)
        .map(|s| s.max_price)
        .unwrap_or(item.price);
    ratio(item.price, max_price)
}

/// value / max clamped to [0, 1]; a zero max divides by 1
fn ratio(value: f64, max: f64) -> f32 {
    let denominator = if max > 0.0 { max } else { 1.0 };
    clamp_unit(value / denominator)
}

fn clamp_unit(value: f64) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Vec<CatalogItem> {
        vec![
            CatalogItem::new("a", "Fiction", 10.0, 5),
            CatalogItem::new("b", "Fiction", 20.0, 10),
            CatalogItem::new("c", "Romance", 40.0, 0),
        ]
    }

    #[test]
    fn test_stats_compute() {
        let stats = CatalogStats::compute(&catalog(), PopularityTable::new());
        let fiction = stats.category_stats["Fiction"];

        assert_eq!(fiction.count, 2);
        assert!((fiction.avg_price - 15.0).abs() < 1e-9);
        assert!((fiction.max_price - 20.0).abs() < 1e-9);
        assert_eq!(stats.max_stock, 10);
        assert!((stats.global_avg_price - 70.0 / 3.0).abs() < 1e-9);
        assert_eq!(stats.max_popularity, 0);
    }

    #[test]
    fn test_empty_catalog_uses_default_avg_price() {
        let stats = CatalogStats::compute(&[], PopularityTable::new());
        assert_eq!(stats.global_avg_price, DEFAULT_AVG_PRICE);
        assert_eq!(stats.total_items, 0);
    }

    #[test]
    fn test_feature_layout() {
        let items = catalog();
        let popularity: PopularityTable = [("a".to_string(), 3), ("b".to_string(), 6)].into_iter().collect();
        let stats = CatalogStats::compute(&items, popularity);
        let extractor = FeatureExtractor::default();

        let features = extractor.extract(&items[0], &stats);
        assert_eq!(features.len(), extractor.dimension());
        assert_eq!(features.len(), 12);

        // price 10 / fiction max 20
        assert!((features[0] - 0.5).abs() < 1e-6);
        // Fiction is the first major category
        assert_eq!(&features[1..9], &[1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        // popularity 3 / 6
        assert!((features[9] - 0.5).abs() < 1e-6);
        // stock 5 / 10
        assert!((features[10] - 0.5).abs() < 1e-6);
        // 10 < 0.7 * 23.33 so budget
        assert_eq!(features[11], 1.0);
    }

    #[test]
    fn test_unknown_category_maps_to_zero_slice() {
        let items = vec![CatalogItem::new("x", "Poetry", 12.0, 1)];
        let stats = CatalogStats::compute(&items, PopularityTable::new());
        let features = FeatureExtractor::default().extract(&items[0], &stats);

        assert!(features[1..9].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_missing_category_stats_gives_full_price_score() {
        let stats = CatalogStats::default();
        let item = CatalogItem::new("x", "Fiction", 33.0, 0);
        let features = FeatureExtractor::default().extract(&item, &stats);

        assert_eq!(features[0], 1.0);
    }

    #[test]
    fn test_price_tier_boundaries() {
        assert_eq!(PriceTier::classify(6.99, 10.0), PriceTier::Budget);
        assert_eq!(PriceTier::classify(7.0, 10.0), PriceTier::MidRange);
        assert_eq!(PriceTier::classify(12.99, 10.0), PriceTier::MidRange);
        assert_eq!(PriceTier::classify(13.0, 10.0), PriceTier::Premium);
    }

    #[test]
    fn test_values_clamped_to_unit_range() {
        let stats = CatalogStats {
            max_stock: 2,
            max_popularity: 1,
            popularity: [("x".to_string(), 9)].into_iter().collect(),
            global_avg_price: 20.0,
            ..Default::default()
        };
        let item = CatalogItem::new("x", "History", 99.0, 50);
        let features = FeatureExtractor::default().extract(&item, &stats);

        assert!(features.iter().all(|v| (0.0..=1.0).contains(v)));
        assert_eq!(features[9], 1.0);
        assert_eq!(features[10], 1.0);
    }
}
