//! Menu performance engine.
//!
//! Joins order rows against the menu catalog, aggregates per-item and
//! per-category performance, and derives popularity/revenue rankings.
//! Orders whose item id is missing from the catalog are excluded from every
//! aggregate and surfaced through `orphan_order_count`.

use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, warn};

use crate::domain::menu::{ItemId, MenuItem};
use crate::domain::order::Order;
use crate::errors::DomainError;
use crate::stats::{decimal_to_f64, min_rank_desc, round2};

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Per-item aggregates over catalog-matched orders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemPerformance {
    pub item_id: ItemId,
    pub item_name: String,
    pub category: String,
    pub order_count: u64,
    pub total_quantity: u64,
    pub revenue: Decimal,
    /// Share of matched order rows, in percent, rounded to two decimals.
    pub order_percentage: f64,
    /// Share of matched revenue, in percent, rounded to two decimals.
    pub revenue_percentage: f64,
    /// Rank by order count, descending. Ties share the minimum rank.
    pub popularity_rank: u32,
    /// Rank by revenue, descending. Ties share the minimum rank.
    pub revenue_rank: u32,
    pub price: Decimal,
    pub avg_revenue_per_order: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryPerformance {
    pub category: String,
    pub total_orders: u64,
    pub total_revenue: Decimal,
    pub item_count: usize,
    pub avg_revenue_per_item: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MenuInsights {
    /// All items, ordered by popularity (ties broken by item id).
    pub item_performance: Vec<ItemPerformance>,
    /// Categories ordered by total revenue, descending.
    pub category_performance: Vec<CategoryPerformance>,
    pub top_10_popular: Vec<ItemPerformance>,
    pub top_10_revenue: Vec<ItemPerformance>,
    pub bottom_10_popular: Vec<ItemPerformance>,
    /// Distinct ordered items divided by matched order rows.
    pub menu_diversity_score: f64,
    pub orphan_order_count: usize,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct MenuEngine {
    top_items: usize,
}

impl MenuEngine {
    pub fn new(top_items: usize) -> Self {
        Self { top_items }
    }

    pub fn analyze(
        &self,
        orders: &[Order],
        menu: &[MenuItem],
    ) -> Result<MenuInsights, DomainError> {
        let catalog: HashMap<&ItemId, &MenuItem> =
            menu.iter().map(|item| (&item.item_id, item)).collect();

        let mut accumulators: BTreeMap<&ItemId, ItemAccumulator> = BTreeMap::new();
        let mut orphan_order_count = 0usize;

        for order in orders {
            let Some(&item) = catalog.get(&order.item_id) else {
                orphan_order_count += 1;
                continue;
            };
            let entry = accumulators.entry(&item.item_id).or_insert_with(|| ItemAccumulator {
                item,
                order_count: 0,
                total_quantity: 0,
                revenue: Decimal::ZERO,
            });
            entry.order_count += 1;
            entry.total_quantity += u64::from(order.quantity);
            entry.revenue += order.total_amount;
        }

        if orphan_order_count > 0 {
            warn!(orphan_order_count, "orders referencing unknown menu items were excluded");
        }
        if accumulators.is_empty() {
            return Err(DomainError::degenerate("menu-matched orders", 0));
        }

        let total_orders: u64 = accumulators.values().map(|acc| acc.order_count).sum();
        let total_revenue: Decimal = accumulators.values().map(|acc| acc.revenue).sum();
        let total_revenue_f64 = decimal_to_f64(total_revenue);

        let mut items: Vec<ItemPerformance> = accumulators
            .into_values()
            .map(|acc| {
                let revenue_f64 = decimal_to_f64(acc.revenue);
                ItemPerformance {
                    item_id: acc.item.item_id.clone(),
                    item_name: acc.item.item_name.clone(),
                    category: acc.item.category.clone(),
                    order_count: acc.order_count,
                    total_quantity: acc.total_quantity,
                    revenue: acc.revenue,
                    order_percentage: round2(acc.order_count as f64 / total_orders as f64 * 100.0),
                    revenue_percentage: round2(revenue_f64 / total_revenue_f64 * 100.0),
                    popularity_rank: 0,
                    revenue_rank: 0,
                    price: acc.item.price,
                    avg_revenue_per_order: round2(revenue_f64 / acc.order_count as f64),
                }
            })
            .collect();

        let popularity_ranks = min_rank_desc(&items, |a, b| a.order_count.cmp(&b.order_count));
        let revenue_ranks = min_rank_desc(&items, |a, b| a.revenue.cmp(&b.revenue));
        for (index, item) in items.iter_mut().enumerate() {
            item.popularity_rank = popularity_ranks[index];
            item.revenue_rank = revenue_ranks[index];
        }

        let category_performance = category_statistics(&items);
        let menu_diversity_score = items.len() as f64 / total_orders as f64;

        let top_10_popular = top_by(&items, self.top_items, |a, b| {
            b.order_count.cmp(&a.order_count).then_with(|| a.item_id.cmp(&b.item_id))
        });
        let top_10_revenue = top_by(&items, self.top_items, |a, b| {
            b.revenue.cmp(&a.revenue).then_with(|| a.item_id.cmp(&b.item_id))
        });
        let bottom_10_popular = top_by(&items, self.top_items, |a, b| {
            a.order_count.cmp(&b.order_count).then_with(|| a.item_id.cmp(&b.item_id))
        });

        items.sort_by(|a, b| {
            b.order_count.cmp(&a.order_count).then_with(|| a.item_id.cmp(&b.item_id))
        });

        debug!(
            items = items.len(),
            categories = category_performance.len(),
            orphan_order_count,
            "menu performance analysis complete"
        );

        Ok(MenuInsights {
            item_performance: items,
            category_performance,
            top_10_popular,
            top_10_revenue,
            bottom_10_popular,
            menu_diversity_score,
            orphan_order_count,
        })
    }
}

struct ItemAccumulator<'a> {
    item: &'a MenuItem,
    order_count: u64,
    total_quantity: u64,
    revenue: Decimal,
}

fn top_by(
    items: &[ItemPerformance],
    count: usize,
    compare: impl Fn(&ItemPerformance, &ItemPerformance) -> std::cmp::Ordering,
) -> Vec<ItemPerformance> {
    let mut sorted: Vec<ItemPerformance> = items.to_vec();
    sorted.sort_by(compare);
    sorted.truncate(count);
    sorted
}

fn category_statistics(items: &[ItemPerformance]) -> Vec<CategoryPerformance> {
    let mut grouped: BTreeMap<&str, (u64, Decimal, usize)> = BTreeMap::new();
    for item in items {
        let entry = grouped.entry(item.category.as_str()).or_insert((0, Decimal::ZERO, 0));
        entry.0 += item.order_count;
        entry.1 += item.revenue;
        entry.2 += 1;
    }

    let mut categories: Vec<CategoryPerformance> = grouped
        .into_iter()
        .map(|(category, (total_orders, total_revenue, item_count))| CategoryPerformance {
            category: category.to_string(),
            total_orders,
            total_revenue,
            item_count,
            avg_revenue_per_item: round2(decimal_to_f64(total_revenue) / item_count as f64),
        })
        .collect();

    categories.sort_by(|a, b| {
        b.total_revenue.cmp(&a.total_revenue).then_with(|| a.category.cmp(&b.category))
    });
    categories
}
