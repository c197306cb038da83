//! Customer segmentation engine.
//!
//! Builds per-customer order metrics, scores each customer on recency,
//! frequency, and monetary quintiles, and assigns a value segment from
//! configurable spend/frequency thresholds. Quintile boundaries come from
//! positional binning over a fully ordered sort, so scores are reproducible
//! for any population size.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::customer::{CustomerId, CustomerMetric, Segment};
use crate::domain::order::Order;
use crate::errors::DomainError;
use crate::stats::{decimal_to_f64, mean, quantile_buckets, round2};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Spend/frequency floors for each value segment, checked top-down.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentThresholds {
    pub vip_spend: Decimal,
    pub vip_frequency: u64,
    pub high_spend: Decimal,
    pub high_frequency: u64,
    pub medium_spend: Decimal,
    pub medium_frequency: u64,
}

impl Default for SegmentThresholds {
    fn default() -> Self {
        Self {
            vip_spend: Decimal::new(500, 0),
            vip_frequency: 10,
            high_spend: Decimal::new(300, 0),
            high_frequency: 5,
            medium_spend: Decimal::new(100, 0),
            medium_frequency: 3,
        }
    }
}

impl SegmentThresholds {
    /// Classify a customer. The first tier whose both floors are met wins.
    pub fn classify(&self, total_spent: Decimal, order_frequency: u64) -> Segment {
        if total_spent >= self.vip_spend && order_frequency >= self.vip_frequency {
            Segment::Vip
        } else if total_spent >= self.high_spend && order_frequency >= self.high_frequency {
            Segment::HighValue
        } else if total_spent >= self.medium_spend && order_frequency >= self.medium_frequency {
            Segment::MediumValue
        } else {
            Segment::LowValue
        }
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Aggregate statistics for one segment, all rounded to two decimals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentStat {
    pub avg_frequency: f64,
    pub avg_spent: f64,
    pub total_revenue: f64,
    pub avg_order_value: f64,
    pub avg_recency: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerInsights {
    pub customer_metrics: Vec<CustomerMetric>,
    pub segment_stats: BTreeMap<Segment, SegmentStat>,
    pub total_customers: usize,
    pub segments_distribution: BTreeMap<Segment, u64>,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SegmentationEngine {
    thresholds: SegmentThresholds,
    min_quintile_population: usize,
}

impl SegmentationEngine {
    pub fn new(thresholds: SegmentThresholds, min_quintile_population: usize) -> Self {
        Self { thresholds, min_quintile_population }
    }

    /// Build customer metrics, quintile scores, and segment statistics.
    ///
    /// `as_of` anchors recency: days elapsed between a customer's last order
    /// and the reference date. Orders dated after `as_of` produce a negative
    /// recency and are kept as-is.
    pub fn analyze(
        &self,
        orders: &[Order],
        as_of: NaiveDate,
    ) -> Result<CustomerInsights, DomainError> {
        let mut metrics = accumulate_customers(orders, as_of);
        if metrics.is_empty() {
            return Err(DomainError::degenerate("customer population", 0));
        }
        if metrics.len() < self.min_quintile_population {
            warn!(
                customers = metrics.len(),
                floor = self.min_quintile_population,
                "customer population below quintile floor, scores will be coarse"
            );
        }

        score_rfm(&mut metrics);

        for metric in &mut metrics {
            metric.segment = self.thresholds.classify(metric.total_spent, metric.order_frequency);
        }

        let segment_stats = segment_statistics(&metrics);
        let mut segments_distribution = BTreeMap::new();
        for metric in &metrics {
            *segments_distribution.entry(metric.segment).or_insert(0u64) += 1;
        }

        debug!(
            customers = metrics.len(),
            segments = segments_distribution.len(),
            "customer segmentation complete"
        );

        Ok(CustomerInsights {
            total_customers: metrics.len(),
            customer_metrics: metrics,
            segment_stats,
            segments_distribution,
        })
    }
}

// ---------------------------------------------------------------------------
// Metric construction
// ---------------------------------------------------------------------------

struct CustomerAccumulator {
    order_frequency: u64,
    total_spent: Decimal,
    first_order: NaiveDate,
    last_order: NaiveDate,
}

fn accumulate_customers(orders: &[Order], as_of: NaiveDate) -> Vec<CustomerMetric> {
    let mut by_customer: BTreeMap<&CustomerId, CustomerAccumulator> = BTreeMap::new();

    for order in orders {
        let entry =
            by_customer.entry(&order.customer_id).or_insert_with(|| CustomerAccumulator {
                order_frequency: 0,
                total_spent: Decimal::ZERO,
                first_order: order.order_date,
                last_order: order.order_date,
            });
        entry.order_frequency += 1;
        entry.total_spent += order.total_amount;
        entry.first_order = entry.first_order.min(order.order_date);
        entry.last_order = entry.last_order.max(order.order_date);
    }

    by_customer
        .into_iter()
        .map(|(customer_id, acc)| {
            let avg = decimal_to_f64(acc.total_spent) / acc.order_frequency as f64;
            CustomerMetric {
                customer_id: customer_id.clone(),
                order_frequency: acc.order_frequency,
                total_spent: acc.total_spent.round_dp(2),
                avg_order_value: round2(avg),
                first_order: acc.first_order,
                last_order: acc.last_order,
                recency: (as_of - acc.last_order).num_days(),
                customer_lifetime: (acc.last_order - acc.first_order).num_days(),
                recency_score: 0,
                frequency_score: 0,
                monetary_score: 0,
                rfm_score: 0,
                segment: Segment::LowValue,
            }
        })
        .collect()
}

/// Fill in the three quintile scores and the combined RFM code.
///
/// Every ordering breaks ties by customer id, so scores are a pure function
/// of the input rows. Lower recency means a more recent customer and earns a
/// higher recency score; frequency and monetary quintiles score upward.
fn score_rfm(metrics: &mut [CustomerMetric]) {
    let recency_buckets = quantile_buckets(metrics, 5, |a, b| {
        a.recency.cmp(&b.recency).then_with(|| a.customer_id.cmp(&b.customer_id))
    });
    let frequency_buckets = quantile_buckets(metrics, 5, |a, b| {
        a.order_frequency.cmp(&b.order_frequency).then_with(|| a.customer_id.cmp(&b.customer_id))
    });
    let monetary_buckets = quantile_buckets(metrics, 5, |a, b| {
        a.total_spent.cmp(&b.total_spent).then_with(|| a.customer_id.cmp(&b.customer_id))
    });

    for (index, metric) in metrics.iter_mut().enumerate() {
        metric.recency_score = 6 - recency_buckets[index];
        metric.frequency_score = frequency_buckets[index];
        metric.monetary_score = monetary_buckets[index];
        metric.rfm_score = u16::from(metric.recency_score) * 100
            + u16::from(metric.frequency_score) * 10
            + u16::from(metric.monetary_score);
    }
}

fn segment_statistics(metrics: &[CustomerMetric]) -> BTreeMap<Segment, SegmentStat> {
    let mut grouped: BTreeMap<Segment, Vec<&CustomerMetric>> = BTreeMap::new();
    for metric in metrics {
        grouped.entry(metric.segment).or_default().push(metric);
    }

    grouped
        .into_iter()
        .map(|(segment, members)| {
            let frequencies: Vec<f64> =
                members.iter().map(|m| m.order_frequency as f64).collect();
            let spends: Vec<f64> = members.iter().map(|m| decimal_to_f64(m.total_spent)).collect();
            let order_values: Vec<f64> = members.iter().map(|m| m.avg_order_value).collect();
            let recencies: Vec<f64> = members.iter().map(|m| m.recency as f64).collect();

            let stat = SegmentStat {
                avg_frequency: round2(mean(&frequencies).unwrap_or(0.0)),
                avg_spent: round2(mean(&spends).unwrap_or(0.0)),
                total_revenue: round2(spends.iter().sum()),
                avg_order_value: round2(mean(&order_values).unwrap_or(0.0)),
                avg_recency: round2(mean(&recencies).unwrap_or(0.0)),
            };
            (segment, stat)
        })
        .collect()
}
