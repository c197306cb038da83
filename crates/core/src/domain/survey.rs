use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::customer::CustomerId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SurveyId(pub String);

/// A cleaned satisfaction survey row. Ratings are validated to 1..=5 at load.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SatisfactionSurvey {
    pub survey_id: SurveyId,
    pub customer_id: CustomerId,
    pub survey_date: NaiveDate,
    pub overall_rating: u8,
    pub food_quality: u8,
    pub service_quality: u8,
    pub would_recommend: bool,
}

impl SatisfactionSurvey {
    /// 1.0 when the guest would recommend, 0.0 otherwise; the unit the
    /// recommendation-rate aggregate averages over.
    pub fn recommend_fraction(&self) -> f64 {
        if self.would_recommend {
            1.0
        } else {
            0.0
        }
    }
}
