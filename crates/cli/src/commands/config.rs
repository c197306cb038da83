use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tablewise_core::{AppConfig, LoadOptions};
use toml::Value;

pub fn run(config_path: Option<&Path>) -> String {
    let options = LoadOptions {
        config_path: config_path.map(Path::to_path_buf),
        require_file: config_path.is_some(),
        ..LoadOptions::default()
    };
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path(config_path);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let data = &config.data;
    let analysis = &config.analysis;
    let segments = &analysis.segments;
    let bands = &analysis.spend_bands;
    let tuning = &config.recommendations;

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    lines.push(render_line(
        "data.data_dir",
        &data.data_dir.display().to_string(),
        source("data.data_dir", &["TABLEWISE_DATA_DIR"]),
    ));
    lines.push(render_line(
        "data.orders_file",
        &data.orders_file,
        source("data.orders_file", &["TABLEWISE_ORDERS_FILE"]),
    ));
    lines.push(render_line(
        "data.visits_file",
        &data.visits_file,
        source("data.visits_file", &["TABLEWISE_VISITS_FILE"]),
    ));
    lines.push(render_line(
        "data.satisfaction_file",
        &data.satisfaction_file,
        source("data.satisfaction_file", &["TABLEWISE_SATISFACTION_FILE"]),
    ));
    lines.push(render_line(
        "data.menu_file",
        &data.menu_file,
        source("data.menu_file", &["TABLEWISE_MENU_FILE"]),
    ));
    lines.push(render_line(
        "data.output_dir",
        &data.output_dir.display().to_string(),
        source("data.output_dir", &["TABLEWISE_OUTPUT_DIR"]),
    ));

    lines.push(render_line(
        "analysis.top_items",
        &analysis.top_items.to_string(),
        source("analysis.top_items", &["TABLEWISE_TOP_ITEMS"]),
    ));
    lines.push(render_line(
        "analysis.min_quintile_population",
        &analysis.min_quintile_population.to_string(),
        source("analysis.min_quintile_population", &[]),
    ));

    lines.push(render_line(
        "analysis.segments.vip_spend",
        &segments.vip_spend.to_string(),
        source("analysis.segments.vip_spend", &[]),
    ));
    lines.push(render_line(
        "analysis.segments.vip_frequency",
        &segments.vip_frequency.to_string(),
        source("analysis.segments.vip_frequency", &[]),
    ));
    lines.push(render_line(
        "analysis.segments.high_spend",
        &segments.high_spend.to_string(),
        source("analysis.segments.high_spend", &[]),
    ));
    lines.push(render_line(
        "analysis.segments.high_frequency",
        &segments.high_frequency.to_string(),
        source("analysis.segments.high_frequency", &[]),
    ));
    lines.push(render_line(
        "analysis.segments.medium_spend",
        &segments.medium_spend.to_string(),
        source("analysis.segments.medium_spend", &[]),
    ));
    lines.push(render_line(
        "analysis.segments.medium_frequency",
        &segments.medium_frequency.to_string(),
        source("analysis.segments.medium_frequency", &[]),
    ));

    lines.push(render_line(
        "analysis.spend_bands.medium_floor",
        &bands.medium_floor.to_string(),
        source("analysis.spend_bands.medium_floor", &[]),
    ));
    lines.push(render_line(
        "analysis.spend_bands.high_floor",
        &bands.high_floor.to_string(),
        source("analysis.spend_bands.high_floor", &[]),
    ));
    lines.push(render_line(
        "analysis.spend_bands.vip_floor",
        &bands.vip_floor.to_string(),
        source("analysis.spend_bands.vip_floor", &[]),
    ));

    lines.push(render_line(
        "recommendations.low_share_floor",
        &tuning.low_share_floor.to_string(),
        source("recommendations.low_share_floor", &[]),
    ));
    lines.push(render_line(
        "recommendations.vip_share_floor",
        &tuning.vip_share_floor.to_string(),
        source("recommendations.vip_share_floor", &[]),
    ));
    lines.push(render_line(
        "recommendations.recommendation_rate_floor",
        &tuning.recommendation_rate_floor.to_string(),
        source("recommendations.recommendation_rate_floor", &[]),
    ));
    lines.push(render_line(
        "recommendations.menu_impact",
        &tuning.menu_impact.to_string(),
        source("recommendations.menu_impact", &[]),
    ));
    lines.push(render_line(
        "recommendations.retention_impact",
        &tuning.retention_impact.to_string(),
        source("recommendations.retention_impact", &[]),
    ));
    lines.push(render_line(
        "recommendations.efficiency_impact",
        &tuning.efficiency_impact.to_string(),
        source("recommendations.efficiency_impact", &[]),
    ));
    lines.push(render_line(
        "recommendations.total_impact",
        &tuning.total_impact.to_string(),
        source("recommendations.total_impact", &[]),
    ));

    lines.push(render_line(
        "logging.level",
        &config.logging.level,
        source("logging.level", &["TABLEWISE_LOGGING_LEVEL", "TABLEWISE_LOG_LEVEL"]),
    ));
    lines.push(render_line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        source("logging.format", &["TABLEWISE_LOGGING_FORMAT", "TABLEWISE_LOG_FORMAT"]),
    ));

    lines.join("\n")
}

fn detect_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then_some(path.to_path_buf());
    }

    let root = PathBuf::from("tablewise.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/tablewise.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    for env_key in env_keys {
        if env::var_os(env_key).is_some() {
            return format!("env ({env_key})");
        }
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
