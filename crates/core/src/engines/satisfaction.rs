//! Satisfaction correlation engine.
//!
//! Joins per-customer spend with per-customer mean survey ratings, buckets
//! customers into fixed spend bands, and computes overall survey metrics, a
//! monthly satisfaction trend, and a Pearson correlation matrix between
//! ratings and spend.
//!
//! The spend join is inner: customers with surveys but no orders contribute
//! to the overall metrics yet are absent from band and correlation outputs.

use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::customer::CustomerId;
use crate::domain::order::Order;
use crate::domain::survey::SatisfactionSurvey;
use crate::errors::DomainError;
use crate::stats::{decimal_to_f64, mean, pearson, round2};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Left-closed spend band floors: [0, medium) is Low, [medium, high) is
/// Medium, [high, vip) is High, [vip, ∞) is VIP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpendBands {
    pub medium_floor: Decimal,
    pub high_floor: Decimal,
    pub vip_floor: Decimal,
}

impl Default for SpendBands {
    fn default() -> Self {
        Self {
            medium_floor: Decimal::new(50, 0),
            high_floor: Decimal::new(150, 0),
            vip_floor: Decimal::new(300, 0),
        }
    }
}

impl SpendBands {
    fn band_index(&self, spent: Decimal) -> usize {
        if spent < self.medium_floor {
            0
        } else if spent < self.high_floor {
            1
        } else if spent < self.vip_floor {
            2
        } else {
            3
        }
    }

    fn labels(&self) -> [String; 4] {
        [
            format!("Low ($0-{})", self.medium_floor),
            format!("Medium (${}-{})", self.medium_floor, self.high_floor),
            format!("High (${}-{})", self.high_floor, self.vip_floor),
            format!("VIP (${}+)", self.vip_floor),
        ]
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Mean ratings for one spend band. Means are absent for an empty band.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpendBandStat {
    pub band: String,
    pub overall_rating: Option<f64>,
    pub food_quality: Option<f64>,
    pub service_quality: Option<f64>,
    pub would_recommend: Option<f64>,
    pub customer_count: u64,
}

/// Survey-level aggregates over every survey row, before the spend join.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverallMetrics {
    pub avg_overall_rating: f64,
    pub avg_food_quality: f64,
    pub avg_service_quality: f64,
    /// Percent of surveys that would recommend.
    pub recommendation_rate: f64,
    /// Percent of surveys with overall_rating of four or five.
    pub high_satisfaction_rate: f64,
    pub total_surveys: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SatisfactionTrendPoint {
    pub year: i32,
    pub month: u32,
    pub overall_rating: f64,
    pub would_recommend: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SatisfactionInsights {
    pub satisfaction_by_spending: Vec<SpendBandStat>,
    pub overall_metrics: OverallMetrics,
    pub satisfaction_trends: Vec<SatisfactionTrendPoint>,
    /// Pearson correlations over per-customer joined rows; `None` where the
    /// coefficient is undefined (fewer than two rows or zero variance).
    pub correlation_matrix: BTreeMap<&'static str, BTreeMap<&'static str, Option<f64>>>,
}

const CORRELATION_COLUMNS: [&str; 4] =
    ["overall_rating", "food_quality", "service_quality", "total_amount"];

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SatisfactionEngine {
    bands: SpendBands,
}

impl SatisfactionEngine {
    pub fn new(bands: SpendBands) -> Self {
        Self { bands }
    }

    pub fn analyze(
        &self,
        surveys: &[SatisfactionSurvey],
        orders: &[Order],
    ) -> Result<SatisfactionInsights, DomainError> {
        if surveys.is_empty() {
            return Err(DomainError::degenerate("satisfaction surveys", 0));
        }

        let overall_metrics = overall_metrics(surveys);
        let satisfaction_trends = monthly_trends(surveys);

        let joined = join_spend(surveys, orders);
        let satisfaction_by_spending = band_statistics(&self.bands, &joined);
        let correlation_matrix = correlation_matrix(&joined);

        debug!(
            surveys = surveys.len(),
            joined_customers = joined.len(),
            "satisfaction correlation analysis complete"
        );

        Ok(SatisfactionInsights {
            satisfaction_by_spending,
            overall_metrics,
            satisfaction_trends,
            correlation_matrix,
        })
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// One customer with mean ratings and joined total spend.
struct JoinedRow {
    overall_rating: f64,
    food_quality: f64,
    service_quality: f64,
    would_recommend: f64,
    total_spent: Decimal,
}

fn overall_metrics(surveys: &[SatisfactionSurvey]) -> OverallMetrics {
    let count = surveys.len() as f64;
    let overall: f64 = surveys.iter().map(|s| f64::from(s.overall_rating)).sum();
    let food: f64 = surveys.iter().map(|s| f64::from(s.food_quality)).sum();
    let service: f64 = surveys.iter().map(|s| f64::from(s.service_quality)).sum();
    let recommend: f64 = surveys.iter().map(|s| s.recommend_fraction()).sum();
    let high = surveys.iter().filter(|s| s.overall_rating >= 4).count() as f64;

    OverallMetrics {
        avg_overall_rating: overall / count,
        avg_food_quality: food / count,
        avg_service_quality: service / count,
        recommendation_rate: recommend / count * 100.0,
        high_satisfaction_rate: high / count * 100.0,
        total_surveys: surveys.len(),
    }
}

fn monthly_trends(surveys: &[SatisfactionSurvey]) -> Vec<SatisfactionTrendPoint> {
    let mut buckets: BTreeMap<(i32, u32), (Vec<f64>, Vec<f64>)> = BTreeMap::new();
    for survey in surveys {
        use chrono::Datelike;
        let key = (survey.survey_date.year(), survey.survey_date.month());
        let entry = buckets.entry(key).or_default();
        entry.0.push(f64::from(survey.overall_rating));
        entry.1.push(survey.recommend_fraction());
    }

    buckets
        .into_iter()
        .map(|((year, month), (ratings, recommends))| SatisfactionTrendPoint {
            year,
            month,
            overall_rating: round2(mean(&ratings).unwrap_or(0.0)),
            would_recommend: round2(mean(&recommends).unwrap_or(0.0)),
        })
        .collect()
}

fn join_spend(surveys: &[SatisfactionSurvey], orders: &[Order]) -> Vec<JoinedRow> {
    let mut spend: HashMap<&CustomerId, Decimal> = HashMap::new();
    for order in orders {
        *spend.entry(&order.customer_id).or_insert(Decimal::ZERO) += order.total_amount;
    }

    let mut ratings: BTreeMap<&CustomerId, (Vec<f64>, Vec<f64>, Vec<f64>, Vec<f64>)> =
        BTreeMap::new();
    for survey in surveys {
        let entry = ratings.entry(&survey.customer_id).or_default();
        entry.0.push(f64::from(survey.overall_rating));
        entry.1.push(f64::from(survey.food_quality));
        entry.2.push(f64::from(survey.service_quality));
        entry.3.push(survey.recommend_fraction());
    }

    ratings
        .into_iter()
        .filter_map(|(customer_id, (overall, food, service, recommend))| {
            let total_spent = *spend.get(customer_id)?;
            Some(JoinedRow {
                overall_rating: mean(&overall).unwrap_or(0.0),
                food_quality: mean(&food).unwrap_or(0.0),
                service_quality: mean(&service).unwrap_or(0.0),
                would_recommend: mean(&recommend).unwrap_or(0.0),
                total_spent,
            })
        })
        .collect()
}

fn band_statistics(bands: &SpendBands, joined: &[JoinedRow]) -> Vec<SpendBandStat> {
    let mut members: [Vec<&JoinedRow>; 4] = [Vec::new(), Vec::new(), Vec::new(), Vec::new()];
    for row in joined {
        members[bands.band_index(row.total_spent)].push(row);
    }

    bands
        .labels()
        .into_iter()
        .zip(members)
        .map(|(band, rows)| {
            let overall: Vec<f64> = rows.iter().map(|r| r.overall_rating).collect();
            let food: Vec<f64> = rows.iter().map(|r| r.food_quality).collect();
            let service: Vec<f64> = rows.iter().map(|r| r.service_quality).collect();
            let recommend: Vec<f64> = rows.iter().map(|r| r.would_recommend).collect();

            SpendBandStat {
                band,
                overall_rating: mean(&overall).map(round2),
                food_quality: mean(&food).map(round2),
                service_quality: mean(&service).map(round2),
                would_recommend: mean(&recommend).map(round2),
                customer_count: rows.len() as u64,
            }
        })
        .collect()
}

fn correlation_matrix(
    joined: &[JoinedRow],
) -> BTreeMap<&'static str, BTreeMap<&'static str, Option<f64>>> {
    let values: [Vec<f64>; 4] = [
        joined.iter().map(|r| r.overall_rating).collect(),
        joined.iter().map(|r| r.food_quality).collect(),
        joined.iter().map(|r| r.service_quality).collect(),
        joined.iter().map(|r| decimal_to_f64(r.total_spent)).collect(),
    ];
    let columns: Vec<(&'static str, Vec<f64>)> =
        CORRELATION_COLUMNS.into_iter().zip(values).collect();

    let mut matrix = BTreeMap::new();
    for (row_name, row_values) in &columns {
        let mut row = BTreeMap::new();
        for (column_name, column_values) in &columns {
            row.insert(*column_name, pearson(row_values, column_values));
        }
        matrix.insert(*row_name, row);
    }
    matrix
}
