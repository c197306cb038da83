use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::customer::CustomerId;
use crate::domain::menu::ItemId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderId(pub String);

/// Weekday display names in calendar order, Monday first.
pub const WEEKDAY_NAMES: [&str; 7] =
    ["Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday"];

/// A cleaned order row. Calendar features are derived from the stored date
/// and time rather than carried as columns.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub customer_id: CustomerId,
    pub order_date: NaiveDate,
    pub order_time: Option<NaiveTime>,
    pub item_id: ItemId,
    pub quantity: u32,
    pub total_amount: Decimal,
}

impl Order {
    pub fn year(&self) -> i32 {
        self.order_date.year()
    }

    pub fn month(&self) -> u32 {
        self.order_date.month()
    }

    /// 0 = Monday .. 6 = Sunday.
    pub fn day_of_week(&self) -> u8 {
        self.order_date.weekday().num_days_from_monday() as u8
    }

    pub fn day_name(&self) -> &'static str {
        WEEKDAY_NAMES[self.day_of_week() as usize]
    }

    pub fn hour(&self) -> Option<u32> {
        self.order_time.map(|time| time.hour())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime};
    use rust_decimal::Decimal;

    use crate::domain::customer::CustomerId;
    use crate::domain::menu::ItemId;

    use super::{Order, OrderId};

    fn order(date: NaiveDate, time: Option<NaiveTime>) -> Order {
        Order {
            order_id: OrderId("1".to_string()),
            customer_id: CustomerId("42".to_string()),
            order_date: date,
            order_time: time,
            item_id: ItemId("3".to_string()),
            quantity: 1,
            total_amount: Decimal::new(2299, 2),
        }
    }

    #[test]
    fn weekday_derivation_starts_at_monday() {
        // 2023-01-02 was a Monday.
        let monday = order(NaiveDate::from_ymd_opt(2023, 1, 2).unwrap(), None);
        let sunday = order(NaiveDate::from_ymd_opt(2023, 1, 8).unwrap(), None);

        assert_eq!(monday.day_of_week(), 0);
        assert_eq!(monday.day_name(), "Monday");
        assert_eq!(sunday.day_of_week(), 6);
        assert_eq!(sunday.day_name(), "Sunday");
    }

    #[test]
    fn hour_is_derived_only_when_a_time_is_present() {
        let date = NaiveDate::from_ymd_opt(2023, 6, 15).unwrap();
        let with_time = order(date, NaiveTime::from_hms_opt(18, 30, 0));
        let without_time = order(date, None);

        assert_eq!(with_time.hour(), Some(18));
        assert_eq!(without_time.hour(), None);
        assert_eq!(with_time.year(), 2023);
        assert_eq!(with_time.month(), 6);
    }
}
