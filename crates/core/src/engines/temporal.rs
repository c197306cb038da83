//! Temporal pattern engine.
//!
//! Buckets orders by hour of day, weekday, and calendar month, and derives
//! peak load indicators plus month-over-month growth rates. Hourly output is
//! optional: order rows may legitimately carry no time component, and when
//! none do the hourly section is absent rather than empty.

use std::collections::{BTreeMap, HashSet};

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use crate::domain::customer::CustomerId;
use crate::domain::order::{Order, WEEKDAY_NAMES};
use crate::errors::DomainError;
use crate::stats::{decimal_to_f64, linear_fit, round2, TrendLine};

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Aggregates for one time bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternStat {
    pub order_count: u64,
    pub total_revenue: Decimal,
    pub avg_order_value: f64,
    pub unique_customers: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyPattern {
    pub day: &'static str,
    #[serde(flatten)]
    pub stat: PatternStat,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyPattern {
    pub year: i32,
    pub month: u32,
    #[serde(flatten)]
    pub stat: PatternStat,
    /// Percent change of rounded revenue against the previous month; absent
    /// for the first month and when the previous month rounds to zero.
    pub revenue_growth: Option<f64>,
    pub order_growth: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeInsights {
    /// Per-hour aggregates over orders that carry a time, keyed 0-23.
    /// Absent when no order row has a time component.
    pub hourly_patterns: Option<BTreeMap<u32, PatternStat>>,
    /// Weekday aggregates, Monday first, observed days only.
    pub daily_patterns: Vec<DailyPattern>,
    /// Calendar months in ascending order.
    pub monthly_patterns: Vec<MonthlyPattern>,
    /// Least-squares fit of monthly revenue over period index; absent with
    /// fewer than two months.
    pub revenue_trend: Option<TrendLine>,
    pub peak_hour: Option<u32>,
    pub peak_hour_orders: Option<u64>,
    pub peak_day: &'static str,
    pub peak_day_orders: u64,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct TemporalEngine;

impl TemporalEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(&self, orders: &[Order]) -> Result<TimeInsights, DomainError> {
        if orders.is_empty() {
            return Err(DomainError::degenerate("dated orders", 0));
        }

        let hourly_patterns = hourly_statistics(orders);
        let daily = daily_statistics(orders);
        let monthly_patterns = monthly_statistics(orders);
        let monthly_revenue: Vec<f64> = monthly_patterns
            .iter()
            .map(|pattern| decimal_to_f64(pattern.stat.total_revenue))
            .collect();
        let revenue_trend = linear_fit(&monthly_revenue);

        // Peaks take the first maximum in bucket order, so ties resolve to
        // the earliest hour and the earliest weekday.
        let (peak_hour, peak_hour_orders) = match &hourly_patterns {
            Some(patterns) => {
                let peak = patterns
                    .iter()
                    .max_by(|a, b| a.1.order_count.cmp(&b.1.order_count).then(b.0.cmp(a.0)));
                match peak {
                    Some((hour, stat)) => (Some(*hour), Some(stat.order_count)),
                    None => (None, None),
                }
            }
            None => (None, None),
        };

        let (peak_day, peak_day_orders) = daily
            .iter()
            .enumerate()
            .max_by(|(index_a, a), (index_b, b)| {
                a.stat.order_count.cmp(&b.stat.order_count).then(index_b.cmp(index_a))
            })
            .map(|(_, pattern)| (pattern.day, pattern.stat.order_count))
            .unwrap_or(("Monday", 0));

        debug!(
            months = monthly_patterns.len(),
            peak_day, peak_day_orders, "temporal pattern analysis complete"
        );

        Ok(TimeInsights {
            hourly_patterns,
            daily_patterns: daily,
            monthly_patterns,
            revenue_trend,
            peak_hour,
            peak_hour_orders,
            peak_day,
            peak_day_orders,
        })
    }
}

// ---------------------------------------------------------------------------
// Bucket aggregation
// ---------------------------------------------------------------------------

#[derive(Default)]
struct BucketAccumulator<'a> {
    order_count: u64,
    total_revenue: Decimal,
    customers: HashSet<&'a CustomerId>,
}

impl BucketAccumulator<'_> {
    fn finish(self) -> PatternStat {
        let avg = decimal_to_f64(self.total_revenue) / self.order_count as f64;
        PatternStat {
            order_count: self.order_count,
            total_revenue: self.total_revenue.round_dp(2),
            avg_order_value: round2(avg),
            unique_customers: self.customers.len(),
        }
    }
}

fn hourly_statistics(orders: &[Order]) -> Option<BTreeMap<u32, PatternStat>> {
    let mut buckets: BTreeMap<u32, BucketAccumulator> = BTreeMap::new();
    for order in orders {
        let Some(hour) = order.hour() else { continue };
        let entry = buckets.entry(hour).or_default();
        entry.order_count += 1;
        entry.total_revenue += order.total_amount;
        entry.customers.insert(&order.customer_id);
    }

    if buckets.is_empty() {
        return None;
    }
    Some(buckets.into_iter().map(|(hour, acc)| (hour, acc.finish())).collect())
}

fn daily_statistics(orders: &[Order]) -> Vec<DailyPattern> {
    let mut buckets: BTreeMap<u32, BucketAccumulator> = BTreeMap::new();
    for order in orders {
        let entry = buckets.entry(order.day_of_week()).or_default();
        entry.order_count += 1;
        entry.total_revenue += order.total_amount;
        entry.customers.insert(&order.customer_id);
    }

    buckets
        .into_iter()
        .map(|(weekday, acc)| DailyPattern {
            day: WEEKDAY_NAMES[weekday as usize],
            stat: acc.finish(),
        })
        .collect()
}

fn monthly_statistics(orders: &[Order]) -> Vec<MonthlyPattern> {
    let mut buckets: BTreeMap<(i32, u32), BucketAccumulator> = BTreeMap::new();
    for order in orders {
        let entry = buckets.entry((order.year(), order.month())).or_default();
        entry.order_count += 1;
        entry.total_revenue += order.total_amount;
        entry.customers.insert(&order.customer_id);
    }

    let mut months: Vec<MonthlyPattern> = buckets
        .into_iter()
        .map(|((year, month), acc)| MonthlyPattern {
            year,
            month,
            stat: acc.finish(),
            revenue_growth: None,
            order_growth: None,
        })
        .collect();

    for index in 1..months.len() {
        let previous = months[index - 1].stat.clone();
        let current = &mut months[index];
        current.revenue_growth = percent_change(
            decimal_to_f64(previous.total_revenue),
            decimal_to_f64(current.stat.total_revenue),
        );
        current.order_growth =
            percent_change(previous.order_count as f64, current.stat.order_count as f64);
    }

    months
}

fn percent_change(previous: f64, current: f64) -> Option<f64> {
    if previous == 0.0 {
        return None;
    }
    Some((current - previous) / previous * 100.0)
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime};
    use rust_decimal::Decimal;

    use crate::domain::customer::CustomerId;
    use crate::domain::menu::ItemId;
    use crate::domain::order::{Order, OrderId};

    use super::TemporalEngine;

    fn order(
        id: &str,
        customer: &str,
        date: (i32, u32, u32),
        hour: Option<u32>,
        amount: i64,
    ) -> Order {
        Order {
            order_id: OrderId(id.to_string()),
            customer_id: CustomerId(customer.to_string()),
            order_date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            order_time: hour.map(|h| NaiveTime::from_hms_opt(h, 30, 0).unwrap()),
            item_id: ItemId("I1".to_string()),
            quantity: 1,
            total_amount: Decimal::new(amount, 0),
        }
    }

    #[test]
    fn monthly_growth_follows_percent_change() {
        let orders = vec![
            order("O1", "C1", (2023, 1, 10), None, 1000),
            order("O2", "C2", (2023, 2, 10), None, 1500),
        ];

        let insights = TemporalEngine::new().analyze(&orders).unwrap();

        assert_eq!(insights.monthly_patterns.len(), 2);
        assert_eq!(insights.monthly_patterns[0].revenue_growth, None);
        assert_eq!(insights.monthly_patterns[1].revenue_growth, Some(50.0));
        assert_eq!(insights.monthly_patterns[1].order_growth, Some(0.0));

        let trend = insights.revenue_trend.expect("two months fit a line");
        assert_eq!(trend.slope, 500.0);
        assert_eq!(trend.intercept, 1000.0);
    }

    #[test]
    fn revenue_trend_is_absent_with_a_single_month() {
        let orders = vec![order("O1", "C1", (2023, 1, 10), None, 1000)];

        let insights = TemporalEngine::new().analyze(&orders).unwrap();

        assert!(insights.revenue_trend.is_none());
    }

    #[test]
    fn growth_is_absent_when_previous_month_revenue_is_zero() {
        let orders = vec![
            order("O1", "C1", (2023, 1, 10), None, 0),
            order("O2", "C2", (2023, 2, 10), None, 1500),
        ];

        let insights = TemporalEngine::new().analyze(&orders).unwrap();

        assert_eq!(insights.monthly_patterns[1].revenue_growth, None);
        assert_eq!(insights.monthly_patterns[1].order_growth, Some(0.0));
    }

    #[test]
    fn peak_hour_prefers_earliest_on_ties() {
        let orders = vec![
            order("O1", "C1", (2023, 6, 5), Some(12), 20),
            order("O2", "C2", (2023, 6, 5), Some(12), 20),
            order("O3", "C3", (2023, 6, 5), Some(18), 20),
            order("O4", "C4", (2023, 6, 5), Some(18), 20),
            order("O5", "C5", (2023, 6, 5), Some(20), 20),
        ];

        let insights = TemporalEngine::new().analyze(&orders).unwrap();

        assert_eq!(insights.peak_hour, Some(12));
        assert_eq!(insights.peak_hour_orders, Some(2));
    }

    #[test]
    fn hourly_section_is_absent_without_time_data() {
        let orders = vec![order("O1", "C1", (2023, 6, 5), None, 20)];

        let insights = TemporalEngine::new().analyze(&orders).unwrap();

        assert!(insights.hourly_patterns.is_none());
        assert_eq!(insights.peak_hour, None);
        assert_eq!(insights.peak_hour_orders, None);
    }

    #[test]
    fn daily_patterns_run_monday_first_and_skip_unobserved_days() {
        // 2023-06-05 is a Monday, 2023-06-11 is a Sunday.
        let orders = vec![
            order("O1", "C1", (2023, 6, 11), None, 20),
            order("O2", "C2", (2023, 6, 5), None, 20),
            order("O3", "C3", (2023, 6, 5), None, 20),
        ];

        let insights = TemporalEngine::new().analyze(&orders).unwrap();

        let days: Vec<&str> = insights.daily_patterns.iter().map(|p| p.day).collect();
        assert_eq!(days, vec!["Monday", "Sunday"]);
        assert_eq!(insights.peak_day, "Monday");
        assert_eq!(insights.peak_day_orders, 2);
    }

    #[test]
    fn unique_customers_deduplicate_within_bucket() {
        let orders = vec![
            order("O1", "C1", (2023, 6, 5), Some(12), 20),
            order("O2", "C1", (2023, 6, 5), Some(12), 30),
        ];

        let insights = TemporalEngine::new().analyze(&orders).unwrap();

        let hourly = insights.hourly_patterns.expect("hourly section present");
        let noon = hourly.get(&12).expect("noon bucket present");
        assert_eq!(noon.unique_customers, 1);
        assert_eq!(noon.order_count, 2);
        assert_eq!(noon.avg_order_value, 25.0);
    }
}
