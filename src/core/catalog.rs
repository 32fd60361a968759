// Catalog and order-history collaborators

use crate::core::error::CatalogError;
use crate::core::types::{CatalogItem, OrderRecord, PopularityTable};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Read access to the product catalog
pub trait CatalogSource {
    /// Look up one item by id
    fn item(&self, id: &str) -> Result<Option<CatalogItem>, CatalogError>;

    /// Every item in the catalog
    fn all_items(&self) -> Result<Vec<CatalogItem>, CatalogError>;

    /// Up to `limit` items of `category` other than `exclude`, newest first
    fn latest_in_category(
        &self,
        category: &str,
        exclude: Option<&str>,
        limit: usize,
    ) -> Result<Vec<CatalogItem>, CatalogError>;
}

/// Read access to placed orders
pub trait OrderHistory {
    /// Ordered quantity per item over all non-cancelled orders
    fn popularity(&self) -> Result<PopularityTable, CatalogError>;

    /// All orders placed by one customer, in any status
    fn orders_for_customer(&self, customer_id: &str) -> Result<Vec<OrderRecord>, CatalogError>;
}

impl<T: CatalogSource + ?Sized> CatalogSource for &T {
    fn item(&self, id: &str) -> Result<Option<CatalogItem>, CatalogError> {
        (**self).item(id)
    }

    fn all_items(&self) -> Result<Vec<CatalogItem>, CatalogError> {
        (**self).all_items()
    }

    fn latest_in_category(
        &self,
        category: &str,
        exclude: Option<&str>,
        limit: usize,
    ) -> Result<Vec<CatalogItem>, CatalogError> {
        (**self).latest_in_category(category, exclude, limit)
    }
}

impl<T: OrderHistory + ?Sized> OrderHistory for &T {
    fn popularity(&self) -> Result<PopularityTable, CatalogError> {
        (**self).popularity()
    }

    fn orders_for_customer(&self, customer_id: &str) -> Result<Vec<OrderRecord>, CatalogError> {
        (**self).orders_for_customer(customer_id)
    }
}

/// In-memory catalog and order history, loadable from JSON
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    pub items: Vec<CatalogItem>,
    #[serde(default)]
    pub orders: Vec<OrderRecord>,
}

impl CatalogSnapshot {
    pub fn new(items: Vec<CatalogItem>, orders: Vec<OrderRecord>) -> Self {
        CatalogSnapshot { items, orders }
    }

    /// Parse and validate a JSON snapshot
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let snapshot: CatalogSnapshot = serde_json::from_str(json)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Read a JSON snapshot from disk
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Reject duplicate ids and prices that cannot be normalised
    pub fn validate(&self) -> Result<(), CatalogError> {
        let mut seen = HashSet::new();
        for item in &self.items {
            if !seen.insert(item.id.as_str()) {
                return Err(CatalogError::InvalidSnapshot(format!(
                    "duplicate item id '{}'",
                    item.id
                )));
            }
            if !item.price.is_finite() || item.price < 0.0 {
                return Err(CatalogError::InvalidSnapshot(format!(
                    "item '{}' has invalid price {}",
                    item.id, item.price
                )));
            }
        }
        Ok(())
    }
}

impl CatalogSource for CatalogSnapshot {
    fn item(&self, id: &str) -> Result<Option<CatalogItem>, CatalogError> {
        Ok(self.items.iter().find(|i| i.id == id).cloned())
    }

    fn all_items(&self) -> Result<Vec<CatalogItem>, CatalogError> {
        Ok(self.items.clone())
    }

    fn latest_in_category(
        &self,
        category: &str,
        exclude: Option<&str>,
        limit: usize,
    ) -> Result<Vec<CatalogItem>, CatalogError> {
        let mut matching: Vec<&CatalogItem> = self
            .items
            .iter()
            .filter(|i| i.category == category && Some(i.id.as_str()) != exclude)
            .collect();

        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));

        Ok(matching.into_iter().take(limit).cloned().collect())
    }
}

impl OrderHistory for CatalogSnapshot {
    fn popularity(&self) -> Result<PopularityTable, CatalogError> {
        Ok(PopularityTable::from_orders(&self.orders))
    }

    fn orders_for_customer(&self, customer_id: &str) -> Result<Vec<OrderRecord>, CatalogError> {
        Ok(self
            .orders
            .iter()
            .filter(|o| o.customer_id == customer_id)
            .cloned()
            .collect())
    }
}
