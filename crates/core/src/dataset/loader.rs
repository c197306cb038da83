//! CSV ingestion with row-level cleaning.
//!
//! Each table is read through `csv` + serde into raw string records, then
//! validated into domain rows. Two failure planes are kept apart: rows that
//! violate the data contract (missing values, non-positive amounts, ratings
//! out of range) are dropped and counted, while structural problems (missing
//! file or column, unparseable numbers or dates) abort the load with a
//! `LoadError` naming the file and 1-based line.

use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveTime};
use csv::ReaderBuilder;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::DataConfig;
use crate::domain::customer::CustomerId;
use crate::domain::menu::{ItemId, MenuItem};
use crate::domain::order::{Order, OrderId};
use crate::domain::survey::{SatisfactionSurvey, SurveyId};
use crate::domain::visit::{Visit, VisitId};
use crate::errors::{ApplicationError, DomainError};

use super::{CleaningReport, Dataset};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("could not read `{path}`: {source}")]
    Csv { path: PathBuf, source: csv::Error },
    #[error("invalid value in `{path}` line {line}: {detail}")]
    Row { path: PathBuf, line: usize, detail: String },
}

/// Load and clean the four tables named by `data`.
pub fn load_dataset(data: &DataConfig) -> Result<(Dataset, CleaningReport), ApplicationError> {
    let mut report = CleaningReport::default();

    let orders_path = data.orders_path();
    let raw_orders: Vec<(usize, RawOrder)> = read_table("orders", &orders_path)?;
    let mut orders = Vec::with_capacity(raw_orders.len());
    for (line, raw) in raw_orders {
        match convert_order(&orders_path, line, raw)? {
            Some(order) => orders.push(order),
            None => report.orders_dropped += 1,
        }
    }
    report.orders_kept = orders.len();

    let visits_path = data.visits_path();
    let raw_visits: Vec<(usize, RawVisit)> = read_table("visits", &visits_path)?;
    let mut visits = Vec::with_capacity(raw_visits.len());
    for (line, raw) in raw_visits {
        match convert_visit(&visits_path, line, raw)? {
            Some(visit) => visits.push(visit),
            None => report.visits_dropped += 1,
        }
    }
    report.visits_kept = visits.len();

    let satisfaction_path = data.satisfaction_path();
    let raw_surveys: Vec<(usize, RawSurvey)> = read_table("satisfaction", &satisfaction_path)?;
    let mut satisfaction = Vec::with_capacity(raw_surveys.len());
    for (line, raw) in raw_surveys {
        match convert_survey(&satisfaction_path, line, raw)? {
            Some(survey) => satisfaction.push(survey),
            None => report.surveys_dropped += 1,
        }
    }
    report.surveys_kept = satisfaction.len();

    let menu_path = data.menu_path();
    let raw_menu: Vec<(usize, RawMenuItem)> = read_table("menu", &menu_path)?;
    let mut menu: Vec<MenuItem> = Vec::with_capacity(raw_menu.len());
    for (line, raw) in raw_menu {
        let Some(item) = convert_menu_item(&menu_path, line, raw)? else { continue };
        match menu.iter().position(|existing| existing.item_id == item.item_id) {
            Some(index) => {
                menu[index] = item;
                report.duplicate_menu_items += 1;
            }
            None => menu.push(item),
        }
    }
    report.menu_items = menu.len();
    if report.duplicate_menu_items > 0 {
        warn!(
            duplicates = report.duplicate_menu_items,
            "duplicate menu item ids found, keeping the last row for each"
        );
    }

    info!(
        orders_kept = report.orders_kept,
        orders_dropped = report.orders_dropped,
        visits_kept = report.visits_kept,
        visits_dropped = report.visits_dropped,
        surveys_kept = report.surveys_kept,
        surveys_dropped = report.surveys_dropped,
        menu_items = report.menu_items,
        "dataset loaded"
    );

    Ok((Dataset { orders, visits, satisfaction, menu }, report))
}

// ---------------------------------------------------------------------------
// Raw records
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawOrder {
    order_id: String,
    customer_id: String,
    order_date: String,
    #[serde(default)]
    order_time: Option<String>,
    item_id: String,
    quantity: String,
    total_amount: String,
}

#[derive(Debug, Deserialize)]
struct RawVisit {
    visit_id: String,
    customer_id: String,
    visit_date: String,
    party_size: String,
    duration_minutes: String,
}

#[derive(Debug, Deserialize)]
struct RawSurvey {
    survey_id: String,
    customer_id: String,
    survey_date: String,
    overall_rating: String,
    food_quality: String,
    service_quality: String,
    would_recommend: String,
}

#[derive(Debug, Deserialize)]
struct RawMenuItem {
    item_id: String,
    item_name: String,
    category: String,
    price: String,
}

fn read_table<R: DeserializeOwned>(
    table: &'static str,
    path: &Path,
) -> Result<Vec<(usize, R)>, ApplicationError> {
    if !path.exists() {
        return Err(DomainError::missing_input(
            table,
            format!("file not found: {}", path.display()),
        )
        .into());
    }

    let mut reader = ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| LoadError::Csv { path: path.to_path_buf(), source })?;

    let mut rows = Vec::new();
    for (index, record) in reader.deserialize::<R>().enumerate() {
        let record =
            record.map_err(|source| LoadError::Csv { path: path.to_path_buf(), source })?;
        // Line 1 is the header.
        rows.push((index + 2, record));
    }
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Row conversion
// ---------------------------------------------------------------------------

fn convert_order(path: &Path, line: usize, raw: RawOrder) -> Result<Option<Order>, LoadError> {
    if any_blank(&[&raw.order_id, &raw.customer_id, &raw.order_date, &raw.item_id])
        || raw.quantity.is_empty()
        || raw.total_amount.is_empty()
    {
        return Ok(None);
    }

    let order_date = parse_date(path, line, "order_date", &raw.order_date)?;
    let order_time = match raw.order_time.as_deref() {
        None | Some("") => None,
        Some(value) => Some(parse_time(path, line, value)?),
    };
    let quantity: u32 = parse_number(path, line, "quantity", &raw.quantity)?;
    let total_amount: Decimal = parse_number(path, line, "total_amount", &raw.total_amount)?;

    if quantity == 0 || total_amount <= Decimal::ZERO {
        return Ok(None);
    }

    Ok(Some(Order {
        order_id: OrderId(raw.order_id),
        customer_id: CustomerId(raw.customer_id),
        order_date,
        order_time,
        item_id: ItemId(raw.item_id),
        quantity,
        total_amount,
    }))
}

fn convert_visit(path: &Path, line: usize, raw: RawVisit) -> Result<Option<Visit>, LoadError> {
    if any_blank(&[&raw.visit_id, &raw.customer_id, &raw.visit_date])
        || raw.party_size.is_empty()
        || raw.duration_minutes.is_empty()
    {
        return Ok(None);
    }

    let visit_date = parse_date(path, line, "visit_date", &raw.visit_date)?;
    let party_size: u32 = parse_number(path, line, "party_size", &raw.party_size)?;
    let duration_minutes: u32 =
        parse_number(path, line, "duration_minutes", &raw.duration_minutes)?;

    if duration_minutes == 0 {
        return Ok(None);
    }

    Ok(Some(Visit {
        visit_id: VisitId(raw.visit_id),
        customer_id: CustomerId(raw.customer_id),
        visit_date,
        party_size,
        duration_minutes,
    }))
}

fn convert_survey(
    path: &Path,
    line: usize,
    raw: RawSurvey,
) -> Result<Option<SatisfactionSurvey>, LoadError> {
    if any_blank(&[&raw.survey_id, &raw.customer_id, &raw.survey_date])
        || raw.overall_rating.is_empty()
        || raw.food_quality.is_empty()
        || raw.service_quality.is_empty()
        || raw.would_recommend.is_empty()
    {
        return Ok(None);
    }

    let survey_date = parse_date(path, line, "survey_date", &raw.survey_date)?;
    let overall_rating: u8 = parse_number(path, line, "overall_rating", &raw.overall_rating)?;
    let food_quality: u8 = parse_number(path, line, "food_quality", &raw.food_quality)?;
    let service_quality: u8 = parse_number(path, line, "service_quality", &raw.service_quality)?;
    let recommend_flag: u8 = parse_number(path, line, "would_recommend", &raw.would_recommend)?;

    let ratings_valid = [overall_rating, food_quality, service_quality]
        .iter()
        .all(|rating| (1..=5).contains(rating));
    if !ratings_valid || recommend_flag > 1 {
        return Ok(None);
    }

    Ok(Some(SatisfactionSurvey {
        survey_id: SurveyId(raw.survey_id),
        customer_id: CustomerId(raw.customer_id),
        survey_date,
        overall_rating,
        food_quality,
        service_quality,
        would_recommend: recommend_flag == 1,
    }))
}

fn convert_menu_item(
    path: &Path,
    line: usize,
    raw: RawMenuItem,
) -> Result<Option<MenuItem>, LoadError> {
    if any_blank(&[&raw.item_id, &raw.item_name, &raw.category]) || raw.price.is_empty() {
        return Ok(None);
    }

    let price: Decimal = parse_number(path, line, "price", &raw.price)?;

    Ok(Some(MenuItem {
        item_id: ItemId(raw.item_id),
        item_name: raw.item_name,
        category: raw.category,
        price,
    }))
}

// ---------------------------------------------------------------------------
// Field parsing
// ---------------------------------------------------------------------------

fn any_blank(fields: &[&String]) -> bool {
    fields.iter().any(|field| field.is_empty())
}

fn parse_number<T: std::str::FromStr>(
    path: &Path,
    line: usize,
    field: &str,
    value: &str,
) -> Result<T, LoadError> {
    value.parse().map_err(|_| LoadError::Row {
        path: path.to_path_buf(),
        line,
        detail: format!("{field} `{value}` is not a valid number"),
    })
}

fn parse_date(path: &Path, line: usize, field: &str, value: &str) -> Result<NaiveDate, LoadError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| LoadError::Row {
        path: path.to_path_buf(),
        line,
        detail: format!("{field} `{value}` is not an ISO date"),
    })
}

fn parse_time(path: &Path, line: usize, value: &str) -> Result<NaiveTime, LoadError> {
    NaiveTime::parse_from_str(value, "%H:%M").map_err(|_| LoadError::Row {
        path: path.to_path_buf(),
        line,
        detail: format!("order_time `{value}` is not HH:MM"),
    })
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use tempfile::TempDir;

    use crate::config::DataConfig;
    use crate::errors::{ApplicationError, DomainError};

    use super::{load_dataset, LoadError};

    const ORDERS_HEADER: &str =
        "order_id,customer_id,order_date,order_time,item_id,quantity,total_amount";
    const VISITS_HEADER: &str = "visit_id,customer_id,visit_date,party_size,duration_minutes";
    const SURVEYS_HEADER: &str =
        "survey_id,customer_id,survey_date,overall_rating,food_quality,service_quality,would_recommend";
    const MENU_HEADER: &str = "item_id,item_name,category,price";

    fn config_for(dir: &Path) -> DataConfig {
        DataConfig {
            data_dir: dir.to_path_buf(),
            orders_file: "orders.csv".to_string(),
            visits_file: "visits.csv".to_string(),
            satisfaction_file: "satisfaction.csv".to_string(),
            menu_file: "menu_items.csv".to_string(),
            output_dir: dir.join("reports"),
        }
    }

    fn write_tables(dir: &Path, orders: &str, visits: &str, surveys: &str, menu: &str) {
        fs::write(dir.join("orders.csv"), format!("{ORDERS_HEADER}\n{orders}")).unwrap();
        fs::write(dir.join("visits.csv"), format!("{VISITS_HEADER}\n{visits}")).unwrap();
        fs::write(dir.join("satisfaction.csv"), format!("{SURVEYS_HEADER}\n{surveys}")).unwrap();
        fs::write(dir.join("menu_items.csv"), format!("{MENU_HEADER}\n{menu}")).unwrap();
    }

    #[test]
    fn loads_and_parses_all_four_tables() {
        let dir = TempDir::new().unwrap();
        write_tables(
            dir.path(),
            "O1,C1,2023-03-04,18:30,I1,2,29.98\nO2,C2,2023-03-05,,I2,1,22.99\n",
            "V1,C1,2023-03-04,2,65\n",
            "S1,C1,2023-03-06,5,4,5,1\n",
            "I1,Garlic Bread,Appetizer,5.99\nI2,Salmon Teriyaki,Main Course,22.99\n",
        );

        let (dataset, report) = load_dataset(&config_for(dir.path())).unwrap();

        assert_eq!(dataset.orders.len(), 2);
        assert_eq!(dataset.orders[0].order_date, NaiveDate::from_ymd_opt(2023, 3, 4).unwrap());
        assert_eq!(dataset.orders[0].hour(), Some(18));
        assert_eq!(dataset.orders[0].total_amount, Decimal::new(2998, 2));
        assert_eq!(dataset.orders[1].order_time, None);
        assert!(dataset.satisfaction[0].would_recommend);
        assert_eq!(dataset.data_points(), 4);
        assert_eq!(report.orders_kept, 2);
        assert_eq!(report.total_dropped(), 0);
    }

    #[test]
    fn contract_violations_are_dropped_and_counted() {
        let dir = TempDir::new().unwrap();
        write_tables(
            dir.path(),
            concat!(
                "O1,C1,2023-03-04,12:00,I1,2,29.98\n",
                "O2,,2023-03-05,12:00,I1,1,14.99\n", // missing customer
                "O3,C3,2023-03-05,12:00,I1,0,14.99\n", // zero quantity
                "O4,C4,2023-03-05,12:00,I1,1,-5.00\n", // negative amount
            ),
            "V1,C1,2023-03-04,2,0\n", // zero duration
            concat!(
                "S1,C1,2023-03-06,6,4,5,1\n", // rating out of range
                "S2,C2,2023-03-06,4,4,4,2\n", // recommend flag out of range
                "S3,C3,2023-03-06,4,4,4,0\n",
            ),
            "I1,Garlic Bread,Appetizer,5.99\n",
        );

        let (dataset, report) = load_dataset(&config_for(dir.path())).unwrap();

        assert_eq!(report.orders_kept, 1);
        assert_eq!(report.orders_dropped, 3);
        assert_eq!(report.visits_dropped, 1);
        assert_eq!(report.surveys_kept, 1);
        assert_eq!(report.surveys_dropped, 2);
        assert_eq!(dataset.orders[0].order_id.0, "O1");
        assert!(!dataset.satisfaction[0].would_recommend);
    }

    #[test]
    fn missing_file_is_a_missing_input_error() {
        let dir = TempDir::new().unwrap();

        let error = load_dataset(&config_for(dir.path())).unwrap_err();

        assert!(matches!(
            error,
            ApplicationError::Domain(DomainError::MissingInput { table: "orders", .. })
        ));
    }

    #[test]
    fn malformed_number_reports_file_and_line() {
        let dir = TempDir::new().unwrap();
        write_tables(
            dir.path(),
            "O1,C1,2023-03-04,12:00,I1,2,29.98\nO2,C2,2023-03-05,12:00,I1,two,14.99\n",
            "V1,C1,2023-03-04,2,65\n",
            "S1,C1,2023-03-06,5,4,5,1\n",
            "I1,Garlic Bread,Appetizer,5.99\n",
        );

        let error = load_dataset(&config_for(dir.path())).unwrap_err();

        match error {
            ApplicationError::DataLoad(LoadError::Row { line, detail, .. }) => {
                assert_eq!(line, 3);
                assert!(detail.contains("quantity"));
            }
            other => panic!("expected a row error, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_menu_ids_keep_the_last_row() {
        let dir = TempDir::new().unwrap();
        write_tables(
            dir.path(),
            "O1,C1,2023-03-04,12:00,I1,2,29.98\n",
            "V1,C1,2023-03-04,2,65\n",
            "S1,C1,2023-03-06,5,4,5,1\n",
            "I1,Garlic Bread,Appetizer,5.99\nI1,Garlic Bread Deluxe,Appetizer,7.99\n",
        );

        let (dataset, report) = load_dataset(&config_for(dir.path())).unwrap();

        assert_eq!(report.menu_items, 1);
        assert_eq!(report.duplicate_menu_items, 1);
        assert_eq!(dataset.menu[0].item_name, "Garlic Bread Deluxe");
        assert_eq!(dataset.menu[0].price, Decimal::new(799, 2));
    }
}
