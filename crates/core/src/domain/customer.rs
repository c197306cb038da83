use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CustomerId(pub String);

/// Value tier assigned by the segmentation rules. Ordering runs from the
/// highest tier down so distributions list VIP first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Segment {
    #[serde(rename = "VIP")]
    Vip,
    #[serde(rename = "High Value")]
    HighValue,
    #[serde(rename = "Medium Value")]
    MediumValue,
    #[serde(rename = "Low Value")]
    LowValue,
}

impl Segment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vip => "VIP",
            Self::HighValue => "High Value",
            Self::MediumValue => "Medium Value",
            Self::LowValue => "Low Value",
        }
    }

    pub const ALL: [Segment; 4] =
        [Segment::Vip, Segment::HighValue, Segment::MediumValue, Segment::LowValue];
}

impl std::fmt::Display for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-customer aggregate with RFM scores and the assigned segment.
/// One row per distinct customer_id appearing in Orders.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CustomerMetric {
    pub customer_id: CustomerId,
    pub order_frequency: u64,
    pub total_spent: Decimal,
    pub avg_order_value: f64,
    pub first_order: NaiveDate,
    pub last_order: NaiveDate,
    /// Whole days from the reference instant back to the last order.
    /// Negative when the data postdates the reference.
    pub recency: i64,
    /// Whole days between first and last order; 0 for a single order.
    pub customer_lifetime: i64,
    pub recency_score: u8,
    pub frequency_score: u8,
    pub monetary_score: u8,
    /// Three-digit concatenation of the scores, e.g. 5/3/4 → 534.
    pub rfm_score: u16,
    pub segment: Segment,
}
