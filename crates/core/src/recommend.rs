//! Business recommendation synthesizer.
//!
//! Pure rule evaluation over the four engine outputs. Any section may be
//! absent when its engine failed; rules that read an absent section are
//! skipped rather than guessed at. Projected impact figures are illustrative
//! configurable shares of observed revenue, not model outputs.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::customer::Segment;
use crate::engines::menu::MenuInsights;
use crate::engines::satisfaction::SatisfactionInsights;
use crate::engines::segmentation::CustomerInsights;
use crate::engines::temporal::TimeInsights;
use crate::stats::decimal_to_f64;

/// Fixed rollout order, highest leverage first.
const PRIORITY_LADDER: [&str; 4] = [
    "Menu Optimization (High Impact, Low Effort)",
    "Peak Hour Staffing (Medium Impact, Low Effort)",
    "Customer Segmentation (High Impact, Medium Effort)",
    "Loyalty Program (High Impact, High Effort)",
];

/// Appended to revenue growth regardless of which sections are present.
const GENERAL_GROWTH_MOVES: [&str; 3] = [
    "Implement dynamic pricing during peak hours to maximize revenue",
    "Create seasonal menu items based on monthly performance patterns",
    "Develop targeted marketing campaigns for each customer segment",
];

const FEATURED_DISH_COUNT: usize = 5;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Rule thresholds (percentages) and projected impact shares (fractions).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationTuning {
    /// Items below this share of orders are removal candidates.
    pub low_share_floor: f64,
    /// VIP share below this triggers the loyalty program rule.
    pub vip_share_floor: f64,
    /// Recommendation rate below this triggers the service quality rule.
    pub recommendation_rate_floor: f64,
    pub menu_impact: f64,
    pub retention_impact: f64,
    pub efficiency_impact: f64,
    /// Combined projection; deliberately not the sum of the three shares.
    pub total_impact: f64,
}

impl Default for RecommendationTuning {
    fn default() -> Self {
        Self {
            low_share_floor: 1.0,
            vip_share_floor: 10.0,
            recommendation_rate_floor: 80.0,
            menu_impact: 0.15,
            retention_impact: 0.12,
            efficiency_impact: 0.08,
            total_impact: 0.29,
        }
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecommendationSet {
    pub menu_optimization: Vec<String>,
    pub customer_retention: Vec<String>,
    pub operational_efficiency: Vec<String>,
    pub revenue_growth: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectedImpact {
    pub menu_optimization: f64,
    pub customer_retention: f64,
    pub operational_efficiency: f64,
    pub total_potential: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BusinessRecommendations {
    pub recommendations: RecommendationSet,
    pub projected_impact: ProjectedImpact,
    pub implementation_priority: Vec<&'static str>,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RecommendationEngine {
    tuning: RecommendationTuning,
}

impl RecommendationEngine {
    pub fn new(tuning: RecommendationTuning) -> Self {
        Self { tuning }
    }

    /// Evaluate every applicable rule. `total_revenue` is the revenue over
    /// all cleaned orders, before any catalog join.
    pub fn synthesize(
        &self,
        total_revenue: Decimal,
        customers: Option<&CustomerInsights>,
        menu: Option<&MenuInsights>,
        temporal: Option<&TimeInsights>,
        satisfaction: Option<&SatisfactionInsights>,
    ) -> BusinessRecommendations {
        let mut set = RecommendationSet::default();

        if let Some(menu) = menu {
            self.menu_rules(menu, &mut set.menu_optimization);
        }
        if let Some(customers) = customers {
            self.retention_rules(customers, &mut set.customer_retention);
        }
        if let Some(temporal) = temporal {
            staffing_rules(temporal, &mut set.operational_efficiency);
        }
        if let Some(satisfaction) = satisfaction {
            self.growth_rules(satisfaction, &mut set.revenue_growth);
        }
        set.revenue_growth.extend(GENERAL_GROWTH_MOVES.iter().map(|s| s.to_string()));

        let revenue = decimal_to_f64(total_revenue);
        BusinessRecommendations {
            recommendations: set,
            projected_impact: ProjectedImpact {
                menu_optimization: revenue * self.tuning.menu_impact,
                customer_retention: revenue * self.tuning.retention_impact,
                operational_efficiency: revenue * self.tuning.efficiency_impact,
                total_potential: revenue * self.tuning.total_impact,
            },
            implementation_priority: PRIORITY_LADDER.to_vec(),
        }
    }

    fn menu_rules(&self, menu: &MenuInsights, out: &mut Vec<String>) {
        let low_performers = menu
            .item_performance
            .iter()
            .filter(|item| item.order_percentage < self.tuning.low_share_floor)
            .count();
        if low_performers > 0 {
            out.push(format!(
                "Consider removing {low_performers} underperforming items (< {}% of orders)",
                self.tuning.low_share_floor
            ));
        }

        let featured: Vec<&str> = menu
            .top_10_popular
            .iter()
            .take(FEATURED_DISH_COUNT)
            .map(|item| item.item_name.as_str())
            .collect();
        out.push(format!("Feature top 5 dishes prominently: {}", featured.join(", ")));
    }

    fn retention_rules(&self, customers: &CustomerInsights, out: &mut Vec<String>) {
        let vip_count =
            customers.segments_distribution.get(&Segment::Vip).copied().unwrap_or(0);
        let vip_share = vip_count as f64 / customers.total_customers as f64 * 100.0;
        if vip_share < self.tuning.vip_share_floor {
            out.push("Implement VIP loyalty program to increase high-value customers".to_string());
        }

        out.push(
            "Send personalized offers to Medium Value customers to upgrade them to High Value"
                .to_string(),
        );
    }

    fn growth_rules(&self, satisfaction: &SatisfactionInsights, out: &mut Vec<String>) {
        if satisfaction.overall_metrics.recommendation_rate < self.tuning.recommendation_rate_floor
        {
            out.push(format!(
                "Focus on improving service quality to increase recommendation rate above {}%",
                self.tuning.recommendation_rate_floor
            ));
        }
    }
}

fn staffing_rules(temporal: &TimeInsights, out: &mut Vec<String>) {
    if let (Some(hour), Some(orders)) = (temporal.peak_hour, temporal.peak_hour_orders) {
        out.push(format!(
            "Increase staffing during peak hour ({hour}:00) when {orders} orders typically occur"
        ));
    }

    out.push(format!(
        "Optimize operations for {} when {} orders typically occur",
        temporal.peak_day, temporal.peak_day_orders
    ));
}
