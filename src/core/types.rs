// Common types and structures shared across the crate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// Catalog Types
// ============================================================================

/// A book in the catalog, as seen by the recommender
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Catalog identifier
    pub id: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Unit price
    pub price: f64,
    /// Category name
    pub category: String,
    /// Units in stock
    #[serde(default)]
    pub stock: u32,
    /// When the item was added to the catalog
    pub created_at: DateTime<Utc>,
}

impl CatalogItem {
    pub fn new(id: impl Into<String>, category: impl Into<String>, price: f64, stock: u32) -> Self {
        CatalogItem {
            id: id.into(),
            name: String::new(),
            price,
            category: category.into(),
            stock,
            created_at: DateTime::<Utc>::default(),
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

// ============================================================================
// Order History Types
// ============================================================================

/// Lifecycle state of an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Waiting,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Cancelled orders never count towards popularity or preferences
    pub fn counts(&self) -> bool {
        !matches!(self, OrderStatus::Cancelled)
    }
}

/// One cart line of an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub item_id: String,
    pub quantity: u32,
}

/// A placed order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: String,
    pub customer_id: String,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<OrderLine>,
}

/// Total ordered quantity per item id over non-cancelled orders
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PopularityTable {
    totals: HashMap<String, u64>,
}

impl PopularityTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Aggregate quantities from raw orders, skipping cancelled ones
    pub fn from_orders<'a>(orders: impl IntoIterator<Item = &'a OrderRecord>) -> Self {
        let mut table = PopularityTable::new();
        for order in orders.into_iter().filter(|o| o.status.counts()) {
            for line in &order.lines {
                table.add(&line.item_id, line.quantity as u64);
            }
        }
        table
    }

    pub fn add(&mut self, item_id: &str, quantity: u64) {
        *self.totals.entry(item_id.to_string()).or_insert(0) += quantity;
    }

    /// Ordered quantity for an item, 0 when it was never ordered
    pub fn get(&self, item_id: &str) -> u64 {
        self.totals.get(item_id).copied().unwrap_or(0)
    }

    /// Highest total across all items, 0 for an empty table
    pub fn max(&self) -> u64 {
        self.totals.values().copied().max().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.totals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }
}

impl FromIterator<(String, u64)> for PopularityTable {
    fn from_iter<I: IntoIterator<Item = (String, u64)>>(iter: I) -> Self {
        let mut table = PopularityTable::new();
        for (id, quantity) in iter {
            table.add(&id, quantity);
        }
        table
    }
}

// ============================================================================
// Similarity Output Types
// ============================================================================

/// Where a recommended item came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "kebab-case")]
pub enum MatchInfo {
    /// Cluster-mate of the target item
    Cluster {
        cluster_id: usize,
        total_in_cluster: usize,
        reason: String,
    },
    /// Same-category fallback
    Category { reason: String },
}

impl MatchInfo {
    pub fn cluster(cluster_id: usize, total_in_cluster: usize) -> Self {
        MatchInfo::Cluster {
            cluster_id,
            total_in_cluster,
            reason: "Similar features and characteristics".to_string(),
        }
    }

    pub fn category(category: &str) -> Self {
        MatchInfo::Category {
            reason: format!("Same category: {}", category),
        }
    }

    pub fn is_cluster(&self) -> bool {
        matches!(self, MatchInfo::Cluster { .. })
    }
}

/// A recommended item with its similarity score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarItem {
    pub item: CatalogItem,
    /// Similarity in [0, 1], 1 meaning identical feature vectors
    pub similarity_score: f32,
    pub match_info: MatchInfo,
}

/// Why the clustering path was abandoned for the category fallback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum FallbackReason {
    /// Not enough other catalog items to cluster
    TooFewItems { others: usize },
    /// The target did not end up in any cluster
    TargetNotClustered,
    /// The target's cluster has no other members
    ClusterTooSmall { size: usize },
    /// Feature extraction or clustering failed unexpectedly
    Anomaly { message: String },
}

/// How a set of recommendations was produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "kebab-case")]
pub enum Strategy {
    Clustered {
        cluster_id: usize,
        iterations: usize,
        converged: bool,
    },
    CategoryFallback { reason: FallbackReason },
}

impl Strategy {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Strategy::CategoryFallback { .. })
    }
}

/// Ranked similar items for one target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendations {
    pub target_id: String,
    pub items: Vec<SimilarItem>,
    pub strategy: Strategy,
}

impl Recommendations {
    pub fn ids(&self) -> Vec<&str> {
        self.items.iter().map(|s| s.item.id.as_str()).collect()
    }
}

/// Summary of a batch clustering run over the whole catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshReport {
    /// Number of non-empty clusters
    pub cluster_count: usize,
    pub iterations: usize,
    pub converged: bool,
    pub items_processed: usize,
    /// Sizes of the non-empty clusters
    pub cluster_sizes: Vec<usize>,
    /// Sum of member distances to their centroid
    pub inertia: f32,
}

// ============================================================================
// Personalised Recommendation Types
// ============================================================================

/// Category-preference recommendations for one customer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalRecommendations {
    pub customer_id: String,
    pub has_recommendations: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_category: Option<String>,
    pub total_purchases_in_category: u64,
    pub items: Vec<CatalogItem>,
    pub message: String,
}

impl PersonalRecommendations {
    pub fn none(customer_id: &str, message: &str) -> Self {
        PersonalRecommendations {
            customer_id: customer_id.to_string(),
            has_recommendations: false,
            preferred_category: None,
            total_purchases_in_category: 0,
            items: Vec::new(),
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(id: &str, status: OrderStatus, lines: &[(&str, u32)]) -> OrderRecord {
        OrderRecord {
            id: id.to_string(),
            customer_id: "c1".to_string(),
            status,
            created_at: DateTime::<Utc>::default(),
            lines: lines
                .iter()
                .map(|(item, qty)| OrderLine {
                    item_id: item.to_string(),
                    quantity: *qty,
                })
                .collect(),
        }
    }

    #[test]
    fn test_popularity_skips_cancelled_orders() {
        let orders = vec![
            order("o1", OrderStatus::Delivered, &[("a", 2), ("b", 1)]),
            order("o2", OrderStatus::Cancelled, &[("a", 10)]),
            order("o3", OrderStatus::Waiting, &[("a", 3)]),
        ];
        let table = PopularityTable::from_orders(&orders);

        assert_eq!(table.get("a"), 5);
        assert_eq!(table.get("b"), 1);
        assert_eq!(table.get("missing"), 0);
        assert_eq!(table.max(), 5);
    }

    #[test]
    fn test_empty_popularity_max_is_zero() {
        assert_eq!(PopularityTable::new().max(), 0);
    }

    #[test]
    fn test_match_info_serialization() {
        let info = MatchInfo::category("Fiction");
        let value = serde_json::to_value(&info).unwrap();
        assert_eq!(value["source"], "category");
        assert_eq!(value["reason"], "Same category: Fiction");
        assert!(!info.is_cluster());
    }

    #[test]
    fn test_order_status_parsing() {
        let status: OrderStatus = serde_json::from_str("\"cancelled\"").unwrap();
        assert!(!status.counts());
        let status: OrderStatus = serde_json::from_str("\"shipped\"").unwrap();
        assert!(status.counts());
    }
}
