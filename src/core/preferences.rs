// Personal recommendations from a customer's purchase history
//
// The preferred category is the one with the highest purchases + recency score,
// where an order's lines weigh 1 / (position + 1) with the newest order first.

use crate::core::catalog::{CatalogSource, OrderHistory};
use crate::core::error::RecommendError;
use crate::core::types::{OrderRecord, PersonalRecommendations};
use std::collections::HashMap;
use tracing::debug;

/// Orders needed before any preference is inferred
pub const MIN_ORDERS: usize = 2;

/// Units a category needs before it can be preferred
pub const MIN_CATEGORY_PURCHASES: u64 = 2;

/// Purchase tally for one category
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryTally {
    pub purchases: u64,
    pub recency: f64,
}

impl CategoryTally {
    pub fn score(&self) -> f64 {
        self.purchases as f64 + self.recency
    }
}

/// Recommends the newest books of a customer's favourite category
pub struct PreferenceRecommender<C, O> {
    catalog: C,
    orders: O,
    limit: usize,
}

impl<C: CatalogSource, O: OrderHistory> PreferenceRecommender<C, O> {
    pub fn new(catalog: C, orders: O, limit: usize) -> Self {
        PreferenceRecommender {
            catalog,
            orders,
            limit,
        }
    }

    pub fn recommend(&self, customer_id: &str) -> Result<PersonalRecommendations, RecommendError> {
        let mut orders: Vec<OrderRecord> = self
            .orders
            .orders_for_customer(customer_id)?
            .into_iter()
            .filter(|o| o.status.counts())
            .collect();

        if orders.len() < MIN_ORDERS {
            debug!(customer_id, orders = orders.len(), "Not enough orders for preferences");
            return Ok(PersonalRecommendations::none(
                customer_id,
                "Insufficient purchase history for recommendations",
            ));
        }

        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let tallies = self.tally_categories(&orders)?;
        let Some((category, tally)) = preferred_category(&tallies) else {
            return Ok(PersonalRecommendations::none(
                customer_id,
                "No clear category preference detected",
            ));
        };

        let items = self.catalog.latest_in_category(category, None, self.limit)?;
        debug!(customer_id, category, found = items.len(), "Resolved preferred category");

        Ok(PersonalRecommendations {
            customer_id: customer_id.to_string(),
            has_recommendations: !items.is_empty(),
            preferred_category: Some(category.to_string()),
            total_purchases_in_category: tally.purchases,
            message: format!(
                "Based on your love for {} books, we found {} latest arrivals just for you!",
                category,
                items.len()
            ),
            items,
        })
    }

    /// Per-category tallies in first-seen order; orders must be newest first
    fn tally_categories(&self, orders: &[OrderRecord]) -> Result<Vec<(String, CategoryTally)>, RecommendError> {
        let mut tallies: Vec<(String, CategoryTally)> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut categories: HashMap<String, Option<String>> = HashMap::new();

        for (position, order) in orders.iter().enumerate() {
            let weight = 1.0 / (position as f64 + 1.0);

            for line in &order.lines {
                if !categories.contains_key(&line.item_id) {
                    let category = self.catalog.item(&line.item_id)?.map(|i| i.category);
                    categories.insert(line.item_id.clone(), category);
                }
                let Some(Some(category)) = categories.get(&line.item_id) else {
                    continue;
                };

                let slot = *positions.entry(category.clone()).or_insert_with(|| {
                    tallies.push((category.clone(), CategoryTally::default()));
                    tallies.len() - 1
                });
                let tally = &mut tallies[slot].1;
                tally.purchases += line.quantity as u64;
                tally.recency += weight * line.quantity as f64;
            }
        }

        Ok(tallies)
    }
}

/// Highest-scoring category with enough purchases; earlier categories win ties
pub fn preferred_category(tallies: &[(String, CategoryTally)]) -> Option<(&str, &CategoryTally)> {
    let mut best: Option<(&str, &CategoryTally)> = None;
    for (category, tally) in tallies {
        if tally.purchases < MIN_CATEGORY_PURCHASES {
            continue;
        }
        let better = match best {
            Some((_, current)) => tally.score() > current.score(),
            None => tally.score() > 0.0,
        };
        if better {
            best = Some((category.as_str(), tally));
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::CatalogSnapshot;
    use crate::core::types::{CatalogItem, OrderLine, OrderStatus};
    use chrono::{DateTime, TimeZone, Utc};

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, d, 12, 0, 0).unwrap()
    }

    fn order(id: &str, customer: &str, status: OrderStatus, d: u32, lines: &[(&str, u32)]) -> OrderRecord {
        OrderRecord {
            id: id.to_string(),
            customer_id: customer.to_string(),
            status,
            created_at: day(d),
            lines: lines
                .iter()
                .map(|(item, qty)| OrderLine {
                    item_id: item.to_string(),
                    quantity: *qty,
                })
                .collect(),
        }
    }

    fn catalog() -> Vec<CatalogItem> {
        vec![
            CatalogItem::new("h1", "History", 20.0, 3).with_created_at(day(1)),
            CatalogItem::new("h2", "History", 25.0, 3).with_created_at(day(3)),
            CatalogItem::new("h3", "History", 30.0, 3).with_created_at(day(2)),
            CatalogItem::new("r1", "Romance", 9.0, 3).with_created_at(day(4)),
        ]
    }

    #[test]
    fn test_insufficient_history() {
        let snap = CatalogSnapshot::new(
            catalog(),
            vec![
                order("o1", "c1", OrderStatus::Delivered, 1, &[("h1", 3)]),
                order("o2", "c1", OrderStatus::Cancelled, 2, &[("h1", 3)]),
            ],
        );
        let recs = PreferenceRecommender::new(&snap, &snap, 2).recommend("c1").unwrap();

        assert!(!recs.has_recommendations);
        assert!(recs.preferred_category.is_none());
        assert!(recs.items.is_empty());
    }

    #[test]
    fn test_preferred_category_newest_items() {
        let snap = CatalogSnapshot::new(
            catalog(),
            vec![
                order("o1", "c1", OrderStatus::Delivered, 1, &[("h1", 1), ("r1", 1)]),
                order("o2", "c1", OrderStatus::Shipped, 2, &[("h3", 2)]),
                order("o3", "c2", OrderStatus::Delivered, 2, &[("r1", 9)]),
            ],
        );
        let recs = PreferenceRecommender::new(&snap, &snap, 2).recommend("c1").unwrap();

        assert!(recs.has_recommendations);
        assert_eq!(recs.preferred_category.as_deref(), Some("History"));
        assert_eq!(recs.total_purchases_in_category, 3);
        let ids: Vec<&str> = recs.items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["h2", "h3"]);
        assert!(recs.message.contains("History"));
    }

    #[test]
    fn test_no_category_with_two_purchases() {
        let snap = CatalogSnapshot::new(
            catalog(),
            vec![
                order("o1", "c1", OrderStatus::Delivered, 1, &[("h1", 1)]),
                order("o2", "c1", OrderStatus::Delivered, 2, &[("r1", 1), ("ghost", 5)]),
            ],
        );
        let recs = PreferenceRecommender::new(&snap, &snap, 2).recommend("c1").unwrap();

        assert!(!recs.has_recommendations);
        assert_eq!(recs.message, "No clear category preference detected");
    }

    #[test]
    fn test_recency_breaks_purchase_ties() {
        let tallies = vec![
            (
                "Romance".to_string(),
                CategoryTally {
                    purchases: 2,
                    recency: 0.5,
                },
            ),
            (
                "History".to_string(),
                CategoryTally {
                    purchases: 2,
                    recency: 2.0,
                },
            ),
        ];
        let (category, _) = preferred_category(&tallies).unwrap();
        assert_eq!(category, "History");
    }
}
