//! Deterministic sample data generator.
//!
//! Writes a full four-table snapshot of a fictional restaurant year so the
//! pipeline can be demoed and tested without a real POS export. Every draw
//! comes from a single seeded `StdRng`, so the same seed always produces
//! byte-identical files.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate};
use rand::distributions::WeightedIndex;
use rand::prelude::*;
use rand_distr::Normal;
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::config::DataConfig;

/// Seed used when the caller does not supply one.
pub const DEFAULT_SEED: u64 = 42;

const ORDER_ROWS: usize = 3_200;
const VISIT_ROWS: usize = 2_800;
const SURVEY_ROWS: usize = 2_500;

const SAMPLE_YEAR: i32 = 2023;
const DAYS_IN_YEAR: i64 = 365;
/// Customer ids are drawn from `1..CUSTOMER_POOL`.
const CUSTOMER_POOL: u32 = 800;
/// Service hours, exclusive upper bound.
const OPEN_HOURS: std::ops::Range<u32> = 11..22;
/// Visits starting before this hour use the lunch duration curve.
const DINNER_START_HOUR: u32 = 15;
const MIN_VISIT_MINUTES: i64 = 30;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Fixed ten-item menu, ids assigned 1..=10 in declaration order.
/// Prices are in cents.
const SAMPLE_MENU: [(&str, &str, i64); 10] = [
    ("Grilled Chicken Caesar Salad", "Salad", 1499),
    ("Beef Tenderloin Steak", "Main Course", 2899),
    ("Salmon Teriyaki", "Main Course", 2299),
    ("Vegetarian Pasta", "Main Course", 1699),
    ("Mushroom Risotto", "Main Course", 1899),
    ("Chocolate Lava Cake", "Dessert", 899),
    ("Tiramisu", "Dessert", 799),
    ("Garlic Bread", "Appetizer", 599),
    ("Calamari Rings", "Appetizer", 999),
    ("House Wine", "Beverage", 1299),
];

const QUANTITY_CHOICES: [u32; 3] = [1, 2, 3];
const QUANTITY_WEIGHTS: [u32; 3] = [70, 25, 5];
/// Party sizes 1..=6.
const PARTY_WEIGHTS: [u32; 6] = [15, 35, 25, 15, 7, 3];
/// Ratings 1..=5, skewed toward the upper end like real survey returns.
const OVERALL_WEIGHTS: [u32; 5] = [5, 10, 25, 35, 25];
const FOOD_WEIGHTS: [u32; 5] = [3, 7, 20, 40, 30];
const SERVICE_WEIGHTS: [u32; 5] = [4, 8, 23, 38, 27];

/// (mean, standard deviation) of visit length in minutes.
const LUNCH_DURATION: (f64, f64) = (45.0, 15.0);
const DINNER_DURATION: (f64, f64) = (72.0, 20.0);

/// A survey counts as a recommendation at this overall rating or above.
const RECOMMEND_THRESHOLD: u8 = 4;

#[derive(Debug, Error)]
pub enum SampleError {
    #[error("`{path}` already exists; refusing to overwrite")]
    AlreadyExists { path: PathBuf },
    #[error("could not prepare `{path}`: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("could not write `{path}`: {source}")]
    Csv { path: PathBuf, source: csv::Error },
    #[error("sampling distribution could not be built: {0}")]
    Distribution(String),
}

/// What was written and where.
#[derive(Debug, Clone, Serialize)]
pub struct SampleSummary {
    pub seed: u64,
    pub orders: usize,
    pub visits: usize,
    pub surveys: usize,
    pub menu_items: usize,
    pub files: Vec<PathBuf>,
}

/// Write the sample snapshot to the four files named by `data`.
///
/// Existing files are an error unless `overwrite` is set.
pub fn generate_sample_data(
    data: &DataConfig,
    seed: u64,
    overwrite: bool,
) -> Result<SampleSummary, SampleError> {
    let targets =
        [data.orders_path(), data.visits_path(), data.satisfaction_path(), data.menu_path()];
    if !overwrite {
        for path in &targets {
            if path.exists() {
                return Err(SampleError::AlreadyExists { path: path.clone() });
            }
        }
    }
    fs::create_dir_all(&data.data_dir)
        .map_err(|source| SampleError::Io { path: data.data_dir.clone(), source })?;

    let draws = Draws::build()?;
    let mut rng = StdRng::seed_from_u64(seed);

    write_csv(&targets[0], &order_rows(&mut rng, &draws))?;
    write_csv(&targets[1], &visit_rows(&mut rng, &draws))?;
    write_csv(&targets[2], &survey_rows(&mut rng, &draws))?;
    write_csv(&targets[3], &menu_rows())?;

    info!(
        seed,
        orders = ORDER_ROWS,
        visits = VISIT_ROWS,
        surveys = SURVEY_ROWS,
        menu_items = SAMPLE_MENU.len(),
        directory = %data.data_dir.display(),
        "sample dataset written"
    );

    Ok(SampleSummary {
        seed,
        orders: ORDER_ROWS,
        visits: VISIT_ROWS,
        surveys: SURVEY_ROWS,
        menu_items: SAMPLE_MENU.len(),
        files: targets.to_vec(),
    })
}

// ---------------------------------------------------------------------------
// Draw tables
// ---------------------------------------------------------------------------

struct Draws {
    quantity: WeightedIndex<u32>,
    party: WeightedIndex<u32>,
    overall: WeightedIndex<u32>,
    food: WeightedIndex<u32>,
    service: WeightedIndex<u32>,
    lunch: Normal<f64>,
    dinner: Normal<f64>,
}

impl Draws {
    fn build() -> Result<Self, SampleError> {
        Ok(Self {
            quantity: weighted(&QUANTITY_WEIGHTS)?,
            party: weighted(&PARTY_WEIGHTS)?,
            overall: weighted(&OVERALL_WEIGHTS)?,
            food: weighted(&FOOD_WEIGHTS)?,
            service: weighted(&SERVICE_WEIGHTS)?,
            lunch: normal(LUNCH_DURATION)?,
            dinner: normal(DINNER_DURATION)?,
        })
    }
}

fn weighted(weights: &[u32]) -> Result<WeightedIndex<u32>, SampleError> {
    WeightedIndex::new(weights).map_err(|error| SampleError::Distribution(error.to_string()))
}

fn normal((mean, std_dev): (f64, f64)) -> Result<Normal<f64>, SampleError> {
    Normal::new(mean, std_dev).map_err(|error| SampleError::Distribution(error.to_string()))
}

// ---------------------------------------------------------------------------
// Row generation
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct OrderRow {
    order_id: String,
    customer_id: String,
    order_date: String,
    order_time: String,
    item_id: String,
    quantity: u32,
    total_amount: Decimal,
}

#[derive(Serialize)]
struct VisitRow {
    visit_id: String,
    customer_id: String,
    visit_date: String,
    party_size: u32,
    duration_minutes: u32,
}

#[derive(Serialize)]
struct SurveyRow {
    survey_id: String,
    customer_id: String,
    survey_date: String,
    overall_rating: u8,
    food_quality: u8,
    service_quality: u8,
    would_recommend: u8,
}

#[derive(Serialize)]
struct MenuRow {
    item_id: String,
    item_name: &'static str,
    category: &'static str,
    price: Decimal,
}

fn order_rows(rng: &mut StdRng, draws: &Draws) -> Vec<OrderRow> {
    (0..ORDER_ROWS)
        .map(|index| {
            let date = sample_date(rng);
            let customer = rng.gen_range(1..CUSTOMER_POOL);
            let hour = rng.gen_range(OPEN_HOURS);
            let minute = rng.gen_range(0..60);
            let item_index = rng.gen_range(0..SAMPLE_MENU.len());
            let quantity = QUANTITY_CHOICES[draws.quantity.sample(rng)];
            let price = Decimal::new(SAMPLE_MENU[item_index].2, 2);
            OrderRow {
                order_id: format!("{:04}", index + 1),
                customer_id: format!("{customer:03}"),
                order_date: date.format(DATE_FORMAT).to_string(),
                order_time: format!("{hour:02}:{minute:02}"),
                item_id: (item_index + 1).to_string(),
                quantity,
                total_amount: price * Decimal::from(quantity),
            }
        })
        .collect()
}

fn visit_rows(rng: &mut StdRng, draws: &Draws) -> Vec<VisitRow> {
    (0..VISIT_ROWS)
        .map(|index| {
            let date = sample_date(rng);
            let customer = rng.gen_range(1..CUSTOMER_POOL);
            let party_size = (draws.party.sample(rng) + 1) as u32;
            let hour = rng.gen_range(OPEN_HOURS);
            let curve = if hour < DINNER_START_HOUR { draws.lunch } else { draws.dinner };
            let duration_minutes = (curve.sample(rng) as i64).max(MIN_VISIT_MINUTES) as u32;
            VisitRow {
                visit_id: format!("{:04}", index + 1),
                customer_id: format!("{customer:03}"),
                visit_date: date.format(DATE_FORMAT).to_string(),
                party_size,
                duration_minutes,
            }
        })
        .collect()
}

fn survey_rows(rng: &mut StdRng, draws: &Draws) -> Vec<SurveyRow> {
    (0..SURVEY_ROWS)
        .map(|index| {
            let date = sample_date(rng);
            let customer = rng.gen_range(1..CUSTOMER_POOL);
            let overall_rating = (draws.overall.sample(rng) + 1) as u8;
            SurveyRow {
                survey_id: format!("{:04}", index + 1),
                customer_id: format!("{customer:03}"),
                survey_date: date.format(DATE_FORMAT).to_string(),
                overall_rating,
                food_quality: (draws.food.sample(rng) + 1) as u8,
                service_quality: (draws.service.sample(rng) + 1) as u8,
                would_recommend: u8::from(overall_rating >= RECOMMEND_THRESHOLD),
            }
        })
        .collect()
}

fn menu_rows() -> Vec<MenuRow> {
    SAMPLE_MENU
        .iter()
        .enumerate()
        .map(|(index, &(item_name, category, cents))| MenuRow {
            item_id: (index + 1).to_string(),
            item_name,
            category,
            price: Decimal::new(cents, 2),
        })
        .collect()
}

fn sample_date(rng: &mut StdRng) -> NaiveDate {
    let start = NaiveDate::from_ymd_opt(SAMPLE_YEAR, 1, 1).unwrap_or_default();
    start + Duration::days(rng.gen_range(0..DAYS_IN_YEAR))
}

fn write_csv<S: Serialize>(path: &Path, rows: &[S]) -> Result<(), SampleError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|source| SampleError::Csv { path: path.to_path_buf(), source })?;
    for row in rows {
        writer
            .serialize(row)
            .map_err(|source| SampleError::Csv { path: path.to_path_buf(), source })?;
    }
    writer.flush().map_err(|source| SampleError::Io { path: path.to_path_buf(), source })
}
