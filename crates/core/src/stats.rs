//! Shared numeric primitives for the analytics engines.
//!
//! Ranking and quantile bucketing are implemented explicitly (no library
//! rank primitives) so tie handling and bucket assignment stay deterministic:
//! callers supply a comparator that includes a total tie-break key where one
//! is needed. Money arrives as `Decimal` and crosses into `f64` only here,
//! at the aggregation edge.

use std::cmp::Ordering;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Ranking & bucketing
// ---------------------------------------------------------------------------

/// Assign 1-based quantile buckets over `items`, ordered ascending by
/// `compare`. For 1-based sorted position i of n, bucket = ceil(b·i / n),
/// clipped to [1, b]. Equal-population within integer divisibility; total for
/// any n ≥ 1, so undersized populations degrade instead of failing.
///
/// The comparator must be a total order (include a tie-break key such as the
/// row id), otherwise bucket assignment of tied rows is unspecified.
///
/// Returns buckets aligned with the input order.
pub fn quantile_buckets<T>(
    items: &[T],
    bucket_count: u8,
    compare: impl Fn(&T, &T) -> Ordering,
) -> Vec<u8> {
    let n = items.len() as u64;
    let mut order: Vec<usize> = (0..items.len()).collect();
    order.sort_by(|&a, &b| compare(&items[a], &items[b]));

    let mut buckets = vec![0u8; items.len()];
    for (position, &index) in order.iter().enumerate() {
        let ordinal = position as u64 + 1;
        let raw = (ordinal * bucket_count as u64).div_ceil(n);
        buckets[index] = raw.clamp(1, bucket_count as u64) as u8;
    }

    buckets
}

/// Rank `items` descending by `compare` with the minimum-rank tie method:
/// ranks are 1-based, tied rows share the lowest ordinal position of their
/// group, and the next distinct value resumes at the position after the
/// group (values 10, 10, 9 rank as 1, 1, 3).
///
/// Unlike [`quantile_buckets`], the comparator here must treat tied rows as
/// `Equal`; do not fold a tie-break key into it.
///
/// Returns ranks aligned with the input order.
pub fn min_rank_desc<T>(items: &[T], compare: impl Fn(&T, &T) -> Ordering) -> Vec<u32> {
    let mut order: Vec<usize> = (0..items.len()).collect();
    order.sort_by(|&a, &b| compare(&items[b], &items[a]));

    let mut ranks = vec![0u32; items.len()];
    let mut current_rank = 1u32;
    for (position, &index) in order.iter().enumerate() {
        if position > 0 && compare(&items[order[position - 1]], &items[index]) != Ordering::Equal {
            current_rank = position as u32 + 1;
        }
        ranks[index] = current_rank;
    }

    ranks
}

// ---------------------------------------------------------------------------
// Descriptive statistics
// ---------------------------------------------------------------------------

/// Arithmetic mean; `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Pearson correlation coefficient. `None` when fewer than two pairs or when
/// either column has zero variance (the coefficient is undefined there, and
/// the serialized contract carries null instead of NaN).
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }

    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;

    let mut covariance = 0.0;
    let mut variance_x = 0.0;
    let mut variance_y = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        covariance += dx * dy;
        variance_x += dx * dx;
        variance_y += dy * dy;
    }

    if variance_x <= f64::EPSILON || variance_y <= f64::EPSILON {
        return None;
    }
    Some(covariance / (variance_x.sqrt() * variance_y.sqrt()))
}

/// Least-squares line fitted over implicit x = 0, 1, 2, … for trend display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendLine {
    pub slope: f64,
    pub intercept: f64,
}

/// Fit a degree-1 least-squares line to `values` against their indices.
/// `None` when fewer than two points.
pub fn linear_fit(values: &[f64]) -> Option<TrendLine> {
    if values.len() < 2 {
        return None;
    }

    let n = values.len() as f64;
    let mean_x = (values.len() - 1) as f64 / 2.0;
    let mean_y = values.iter().sum::<f64>() / n;

    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for (i, y) in values.iter().enumerate() {
        let dx = i as f64 - mean_x;
        numerator += dx * (y - mean_y);
        denominator += dx * dx;
    }

    let slope = numerator / denominator;
    Some(TrendLine { slope, intercept: mean_y - slope * mean_x })
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

/// Round to two decimals, matching the precision of reported percentages.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn decimal_to_f64(d: Decimal) -> f64 {
    use rust_decimal::prelude::ToPrimitive;
    d.to_f64().unwrap_or(0.0)
}
