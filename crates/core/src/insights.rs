//! The analysis pipeline and its result bundle.
//!
//! [`AnalysisPipeline`] runs the four engines sequentially over one shared
//! immutable [`Dataset`] snapshot, captures each engine's `Result` at the
//! barrier, synthesizes recommendations from whatever sections survived, and
//! assembles the [`InsightsBundle`]. Only a dataset with no usable orders
//! fails the whole run; every other engine failure becomes an absent section
//! plus an entry in `engine_failures`.
//!
//! The reference instant is always injected: recency and `analysis_date` are
//! functions of `as_of`, never of the wall clock.

use std::collections::HashSet;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::dataset::Dataset;
use crate::engines::menu::{MenuEngine, MenuInsights};
use crate::engines::satisfaction::{SatisfactionEngine, SatisfactionInsights};
use crate::engines::segmentation::{CustomerInsights, SegmentationEngine};
use crate::engines::temporal::{TemporalEngine, TimeInsights};
use crate::errors::DomainError;
use crate::recommend::{BusinessRecommendations, RecommendationEngine};
use crate::stats::{decimal_to_f64, mean};

pub const ANALYSIS_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ---------------------------------------------------------------------------
// Bundle
// ---------------------------------------------------------------------------

/// Headline figures over the cleaned dataset, before any catalog join.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutiveSummary {
    pub total_orders: usize,
    pub total_revenue: Decimal,
    pub unique_customers: usize,
    pub avg_order_value: f64,
    /// Mean overall rating; absent when there are no surveys.
    pub customer_satisfaction: Option<f64>,
    pub data_points_analyzed: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineFailure {
    pub engine: &'static str,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsightsBundle {
    pub executive_summary: ExecutiveSummary,
    pub customer_insights: Option<CustomerInsights>,
    pub menu_insights: Option<MenuInsights>,
    pub time_insights: Option<TimeInsights>,
    pub satisfaction_insights: Option<SatisfactionInsights>,
    pub business_recommendations: BusinessRecommendations,
    pub analysis_date: String,
    pub engine_failures: Vec<EngineFailure>,
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct AnalysisPipeline {
    segmentation: SegmentationEngine,
    menu: MenuEngine,
    temporal: TemporalEngine,
    satisfaction: SatisfactionEngine,
    recommendations: RecommendationEngine,
}

impl AnalysisPipeline {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            segmentation: SegmentationEngine::new(
                config.analysis.segments.clone(),
                config.analysis.min_quintile_population,
            ),
            menu: MenuEngine::new(config.analysis.top_items),
            temporal: TemporalEngine::new(),
            satisfaction: SatisfactionEngine::new(config.analysis.spend_bands.clone()),
            recommendations: RecommendationEngine::new(config.recommendations.clone()),
        }
    }

    /// Run every engine over `dataset`, dated and anchored at `as_of`.
    pub fn run(
        &self,
        dataset: &Dataset,
        as_of: NaiveDateTime,
    ) -> Result<InsightsBundle, DomainError> {
        if dataset.orders.is_empty() {
            return Err(DomainError::degenerate("orders", 0));
        }

        let executive_summary = executive_summary(dataset);
        let mut engine_failures = Vec::new();

        let customer_insights = capture(
            "customer_segments",
            self.segmentation.analyze(&dataset.orders, as_of.date()),
            &mut engine_failures,
        );
        let menu_insights = capture(
            "menu_performance",
            self.menu.analyze(&dataset.orders, &dataset.menu),
            &mut engine_failures,
        );
        let time_insights = capture(
            "time_patterns",
            self.temporal.analyze(&dataset.orders),
            &mut engine_failures,
        );
        let satisfaction_insights = capture(
            "satisfaction",
            self.satisfaction.analyze(&dataset.satisfaction, &dataset.orders),
            &mut engine_failures,
        );

        let business_recommendations = self.recommendations.synthesize(
            executive_summary.total_revenue,
            customer_insights.as_ref(),
            menu_insights.as_ref(),
            time_insights.as_ref(),
            satisfaction_insights.as_ref(),
        );

        info!(
            total_orders = executive_summary.total_orders,
            unique_customers = executive_summary.unique_customers,
            failed_engines = engine_failures.len(),
            "analysis complete"
        );

        Ok(InsightsBundle {
            executive_summary,
            customer_insights,
            menu_insights,
            time_insights,
            satisfaction_insights,
            business_recommendations,
            analysis_date: as_of.format(ANALYSIS_DATE_FORMAT).to_string(),
            engine_failures,
        })
    }
}

fn capture<T>(
    engine: &'static str,
    result: Result<T, DomainError>,
    failures: &mut Vec<EngineFailure>,
) -> Option<T> {
    match result {
        Ok(section) => Some(section),
        Err(error) => {
            warn!(engine, %error, "engine failed, section omitted");
            failures.push(EngineFailure { engine, error: error.to_string() });
            None
        }
    }
}

fn executive_summary(dataset: &Dataset) -> ExecutiveSummary {
    let total_revenue: Decimal = dataset.orders.iter().map(|order| order.total_amount).sum();
    let unique_customers: HashSet<_> =
        dataset.orders.iter().map(|order| &order.customer_id).collect();
    let ratings: Vec<f64> =
        dataset.satisfaction.iter().map(|survey| f64::from(survey.overall_rating)).collect();

    ExecutiveSummary {
        total_orders: dataset.orders.len(),
        total_revenue,
        unique_customers: unique_customers.len(),
        avg_order_value: decimal_to_f64(total_revenue) / dataset.orders.len() as f64,
        customer_satisfaction: mean(&ratings),
        data_points_analyzed: dataset.data_points(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
    use rust_decimal::Decimal;

    use crate::config::AppConfig;
    use crate::dataset::Dataset;
    use crate::domain::customer::CustomerId;
    use crate::domain::menu::{ItemId, MenuItem};
    use crate::domain::order::{Order, OrderId};
    use crate::domain::survey::{SatisfactionSurvey, SurveyId};
    use crate::domain::visit::{Visit, VisitId};
    use crate::errors::DomainError;

    use super::AnalysisPipeline;

    fn as_of() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 12, 31).unwrap().and_hms_opt(12, 0, 0).unwrap()
    }

    fn order(id: &str, customer: &str, item: &str, month: u32, day: u32, amount: i64) -> Order {
        Order {
            order_id: OrderId(id.to_string()),
            customer_id: CustomerId(customer.to_string()),
            order_date: NaiveDate::from_ymd_opt(2023, month, day).unwrap(),
            order_time: Some(NaiveTime::from_hms_opt(12 + (day % 3), 15, 0).unwrap()),
            item_id: ItemId(item.to_string()),
            quantity: 1,
            total_amount: Decimal::new(amount, 0),
        }
    }

    fn sample_dataset() -> Dataset {
        let menu = vec![
            MenuItem {
                item_id: ItemId("I1".to_string()),
                item_name: "Garlic Bread".to_string(),
                category: "Appetizer".to_string(),
                price: Decimal::new(599, 2),
            },
            MenuItem {
                item_id: ItemId("I2".to_string()),
                item_name: "Salmon Teriyaki".to_string(),
                category: "Main Course".to_string(),
                price: Decimal::new(2299, 2),
            },
        ];

        let mut orders = Vec::new();
        for customer in 1..=6u32 {
            for sequence in 0..customer {
                orders.push(order(
                    &format!("O{customer}{sequence}"),
                    &format!("C{customer}"),
                    if sequence % 2 == 0 { "I1" } else { "I2" },
                    1 + sequence % 3,
                    1 + (customer + sequence) % 27,
                    20 * i64::from(customer),
                ));
            }
        }

        let satisfaction = vec![
            SatisfactionSurvey {
                survey_id: SurveyId("S1".to_string()),
                customer_id: CustomerId("C5".to_string()),
                survey_date: NaiveDate::from_ymd_opt(2023, 2, 10).unwrap(),
                overall_rating: 5,
                food_quality: 4,
                service_quality: 5,
                would_recommend: true,
            },
            SatisfactionSurvey {
                survey_id: SurveyId("S2".to_string()),
                customer_id: CustomerId("C2".to_string()),
                survey_date: NaiveDate::from_ymd_opt(2023, 3, 10).unwrap(),
                overall_rating: 3,
                food_quality: 3,
                service_quality: 2,
                would_recommend: false,
            },
        ];

        let visits = vec![Visit {
            visit_id: VisitId("V1".to_string()),
            customer_id: CustomerId("C1".to_string()),
            visit_date: NaiveDate::from_ymd_opt(2023, 2, 3).unwrap(),
            party_size: 2,
            duration_minutes: 65,
        }];

        Dataset { orders, visits, satisfaction, menu }
    }

    fn pipeline() -> AnalysisPipeline {
        AnalysisPipeline::from_config(&AppConfig::default())
    }

    #[test]
    fn full_dataset_produces_every_section() {
        let dataset = sample_dataset();

        let bundle = pipeline().run(&dataset, as_of()).unwrap();

        assert!(bundle.customer_insights.is_some());
        assert!(bundle.menu_insights.is_some());
        assert!(bundle.time_insights.is_some());
        assert!(bundle.satisfaction_insights.is_some());
        assert!(bundle.engine_failures.is_empty());
        assert_eq!(bundle.analysis_date, "2023-12-31 12:00:00");

        let summary = &bundle.executive_summary;
        assert_eq!(summary.total_orders, 21);
        assert_eq!(summary.unique_customers, 6);
        assert_eq!(summary.customer_satisfaction, Some(4.0));
        assert_eq!(summary.data_points_analyzed, 21 + 1 + 2);
    }

    #[test]
    fn segment_counts_sum_to_total_customers() {
        let dataset = sample_dataset();

        let bundle = pipeline().run(&dataset, as_of()).unwrap();

        let customers = bundle.customer_insights.expect("segmentation succeeded");
        let counted: u64 = customers.segments_distribution.values().sum();
        assert_eq!(counted, customers.total_customers as u64);
    }

    #[test]
    fn failed_satisfaction_engine_leaves_other_sections_intact() {
        let mut dataset = sample_dataset();
        dataset.satisfaction.clear();

        let bundle = pipeline().run(&dataset, as_of()).unwrap();

        assert!(bundle.customer_insights.is_some());
        assert!(bundle.menu_insights.is_some());
        assert!(bundle.satisfaction_insights.is_none());
        assert_eq!(bundle.executive_summary.customer_satisfaction, None);
        assert_eq!(bundle.engine_failures.len(), 1);
        assert_eq!(bundle.engine_failures[0].engine, "satisfaction");
        // Recommendations still carry the always-on general moves.
        assert_eq!(bundle.business_recommendations.recommendations.revenue_growth.len(), 3);
    }

    #[test]
    fn empty_orders_fail_the_whole_run() {
        let mut dataset = sample_dataset();
        dataset.orders.clear();

        let error = pipeline().run(&dataset, as_of()).unwrap_err();

        assert!(matches!(error, DomainError::DegenerateData { what: "orders", rows: 0 }));
    }

    #[test]
    fn bundle_serializes_with_contract_keys() {
        let dataset = sample_dataset();

        let bundle = pipeline().run(&dataset, as_of()).unwrap();
        let value = serde_json::to_value(&bundle).unwrap();
        let object = value.as_object().unwrap();

        for key in [
            "executive_summary",
            "customer_insights",
            "menu_insights",
            "time_insights",
            "satisfaction_insights",
            "business_recommendations",
            "analysis_date",
            "engine_failures",
        ] {
            assert!(object.contains_key(key), "missing bundle key {key}");
        }

        let menu = object.get("menu_insights").unwrap().as_object().unwrap();
        assert!(menu.contains_key("top_10_popular"));
        assert!(menu.contains_key("menu_diversity_score"));
        // Money fields serialize as decimal strings.
        let summary = object.get("executive_summary").unwrap().as_object().unwrap();
        assert!(summary.get("total_revenue").unwrap().is_string());
    }
}
