use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engines::satisfaction::SpendBands;
use crate::engines::segmentation::SegmentThresholds;
use crate::recommend::RecommendationTuning;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub data: DataConfig,
    pub analysis: AnalysisConfig,
    pub recommendations: RecommendationTuning,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DataConfig {
    pub data_dir: PathBuf,
    pub orders_file: String,
    pub visits_file: String,
    pub satisfaction_file: String,
    pub menu_file: String,
    pub output_dir: PathBuf,
}

impl DataConfig {
    pub fn orders_path(&self) -> PathBuf {
        self.data_dir.join(&self.orders_file)
    }

    pub fn visits_path(&self) -> PathBuf {
        self.data_dir.join(&self.visits_file)
    }

    pub fn satisfaction_path(&self) -> PathBuf {
        self.data_dir.join(&self.satisfaction_file)
    }

    pub fn menu_path(&self) -> PathBuf {
        self.data_dir.join(&self.menu_file)
    }
}

#[derive(Clone, Debug)]
pub struct AnalysisConfig {
    /// Length of the top/bottom item lists in the menu section.
    pub top_items: usize,
    /// Customer count under which quintile scores are flagged as degraded.
    pub min_quintile_population: usize,
    pub segments: SegmentThresholds,
    pub spend_bands: SpendBands,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub data_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data: DataConfig {
                data_dir: PathBuf::from("data"),
                orders_file: "orders.csv".to_string(),
                visits_file: "visits.csv".to_string(),
                satisfaction_file: "satisfaction.csv".to_string(),
                menu_file: "menu_items.csv".to_string(),
                output_dir: PathBuf::from("reports"),
            },
            analysis: AnalysisConfig {
                top_items: 10,
                min_quintile_population: 5,
                segments: SegmentThresholds::default(),
                spend_bands: SpendBands::default(),
            },
            recommendations: RecommendationTuning::default(),
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("tablewise.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(data) = patch.data {
            if let Some(data_dir) = data.data_dir {
                self.data.data_dir = data_dir;
            }
            if let Some(orders_file) = data.orders_file {
                self.data.orders_file = orders_file;
            }
            if let Some(visits_file) = data.visits_file {
                self.data.visits_file = visits_file;
            }
            if let Some(satisfaction_file) = data.satisfaction_file {
                self.data.satisfaction_file = satisfaction_file;
            }
            if let Some(menu_file) = data.menu_file {
                self.data.menu_file = menu_file;
            }
            if let Some(output_dir) = data.output_dir {
                self.data.output_dir = output_dir;
            }
        }

        if let Some(analysis) = patch.analysis {
            if let Some(top_items) = analysis.top_items {
                self.analysis.top_items = top_items;
            }
            if let Some(min_quintile_population) = analysis.min_quintile_population {
                self.analysis.min_quintile_population = min_quintile_population;
            }
            if let Some(segments) = analysis.segments {
                apply_segments_patch(&mut self.analysis.segments, segments);
            }
            if let Some(spend_bands) = analysis.spend_bands {
                apply_spend_bands_patch(&mut self.analysis.spend_bands, spend_bands);
            }
        }

        if let Some(recommendations) = patch.recommendations {
            apply_recommendations_patch(&mut self.recommendations, recommendations);
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("TABLEWISE_DATA_DIR") {
            self.data.data_dir = PathBuf::from(value);
        }
        if let Some(value) = read_env("TABLEWISE_OUTPUT_DIR") {
            self.data.output_dir = PathBuf::from(value);
        }
        if let Some(value) = read_env("TABLEWISE_ORDERS_FILE") {
            self.data.orders_file = value;
        }
        if let Some(value) = read_env("TABLEWISE_VISITS_FILE") {
            self.data.visits_file = value;
        }
        if let Some(value) = read_env("TABLEWISE_SATISFACTION_FILE") {
            self.data.satisfaction_file = value;
        }
        if let Some(value) = read_env("TABLEWISE_MENU_FILE") {
            self.data.menu_file = value;
        }
        if let Some(value) = read_env("TABLEWISE_TOP_ITEMS") {
            self.analysis.top_items = parse_usize("TABLEWISE_TOP_ITEMS", &value)?;
        }

        let log_level =
            read_env("TABLEWISE_LOGGING_LEVEL").or_else(|| read_env("TABLEWISE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("TABLEWISE_LOGGING_FORMAT").or_else(|| read_env("TABLEWISE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(data_dir) = overrides.data_dir {
            self.data.data_dir = data_dir;
        }
        if let Some(output_dir) = overrides.output_dir {
            self.data.output_dir = output_dir;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_data(&self.data)?;
        validate_analysis(&self.analysis)?;
        validate_recommendations(&self.recommendations)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn apply_segments_patch(segments: &mut SegmentThresholds, patch: SegmentsPatch) {
    if let Some(vip_spend) = patch.vip_spend {
        segments.vip_spend = vip_spend;
    }
    if let Some(vip_frequency) = patch.vip_frequency {
        segments.vip_frequency = vip_frequency;
    }
    if let Some(high_spend) = patch.high_spend {
        segments.high_spend = high_spend;
    }
    if let Some(high_frequency) = patch.high_frequency {
        segments.high_frequency = high_frequency;
    }
    if let Some(medium_spend) = patch.medium_spend {
        segments.medium_spend = medium_spend;
    }
    if let Some(medium_frequency) = patch.medium_frequency {
        segments.medium_frequency = medium_frequency;
    }
}

fn apply_spend_bands_patch(bands: &mut SpendBands, patch: SpendBandsPatch) {
    if let Some(medium_floor) = patch.medium_floor {
        bands.medium_floor = medium_floor;
    }
    if let Some(high_floor) = patch.high_floor {
        bands.high_floor = high_floor;
    }
    if let Some(vip_floor) = patch.vip_floor {
        bands.vip_floor = vip_floor;
    }
}

fn apply_recommendations_patch(tuning: &mut RecommendationTuning, patch: RecommendationsPatch) {
    if let Some(low_share_floor) = patch.low_share_floor {
        tuning.low_share_floor = low_share_floor;
    }
    if let Some(vip_share_floor) = patch.vip_share_floor {
        tuning.vip_share_floor = vip_share_floor;
    }
    if let Some(recommendation_rate_floor) = patch.recommendation_rate_floor {
        tuning.recommendation_rate_floor = recommendation_rate_floor;
    }
    if let Some(menu_impact) = patch.menu_impact {
        tuning.menu_impact = menu_impact;
    }
    if let Some(retention_impact) = patch.retention_impact {
        tuning.retention_impact = retention_impact;
    }
    if let Some(efficiency_impact) = patch.efficiency_impact {
        tuning.efficiency_impact = efficiency_impact;
    }
    if let Some(total_impact) = patch.total_impact {
        tuning.total_impact = total_impact;
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("tablewise.toml"), PathBuf::from("config/tablewise.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_data(data: &DataConfig) -> Result<(), ConfigError> {
    for (field, value) in [
        ("data.orders_file", &data.orders_file),
        ("data.visits_file", &data.visits_file),
        ("data.satisfaction_file", &data.satisfaction_file),
        ("data.menu_file", &data.menu_file),
    ] {
        if value.trim().is_empty() {
            return Err(ConfigError::Validation(format!("{field} must not be empty")));
        }
    }

    Ok(())
}

fn validate_analysis(analysis: &AnalysisConfig) -> Result<(), ConfigError> {
    if analysis.top_items == 0 {
        return Err(ConfigError::Validation(
            "analysis.top_items must be greater than zero".to_string(),
        ));
    }

    if analysis.min_quintile_population < 2 {
        return Err(ConfigError::Validation(
            "analysis.min_quintile_population must be at least 2".to_string(),
        ));
    }

    let segments = &analysis.segments;
    if !(segments.vip_spend > segments.high_spend && segments.high_spend > segments.medium_spend) {
        return Err(ConfigError::Validation(
            "analysis.segments spend thresholds must descend: vip_spend > high_spend > medium_spend"
                .to_string(),
        ));
    }
    if segments.medium_spend <= Decimal::ZERO {
        return Err(ConfigError::Validation(
            "analysis.segments.medium_spend must be positive".to_string(),
        ));
    }
    if !(segments.vip_frequency >= segments.high_frequency
        && segments.high_frequency >= segments.medium_frequency
        && segments.medium_frequency >= 1)
    {
        return Err(ConfigError::Validation(
            "analysis.segments frequency thresholds must descend and stay at least 1".to_string(),
        ));
    }

    let bands = &analysis.spend_bands;
    if !(Decimal::ZERO < bands.medium_floor
        && bands.medium_floor < bands.high_floor
        && bands.high_floor < bands.vip_floor)
    {
        return Err(ConfigError::Validation(
            "analysis.spend_bands floors must ascend: 0 < medium_floor < high_floor < vip_floor"
                .to_string(),
        ));
    }

    Ok(())
}

fn validate_recommendations(tuning: &RecommendationTuning) -> Result<(), ConfigError> {
    for (field, value) in [
        ("recommendations.menu_impact", tuning.menu_impact),
        ("recommendations.retention_impact", tuning.retention_impact),
        ("recommendations.efficiency_impact", tuning.efficiency_impact),
        ("recommendations.total_impact", tuning.total_impact),
    ] {
        if !(0.0..=1.0).contains(&value) {
            return Err(ConfigError::Validation(format!("{field} must be within 0.0..=1.0")));
        }
    }

    for (field, value) in [
        ("recommendations.low_share_floor", tuning.low_share_floor),
        ("recommendations.vip_share_floor", tuning.vip_share_floor),
        ("recommendations.recommendation_rate_floor", tuning.recommendation_rate_floor),
    ] {
        if !(0.0..=100.0).contains(&value) {
            return Err(ConfigError::Validation(format!(
                "{field} is a percentage and must be within 0.0..=100.0"
            )));
        }
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    data: Option<DataPatch>,
    analysis: Option<AnalysisPatch>,
    recommendations: Option<RecommendationsPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DataPatch {
    data_dir: Option<PathBuf>,
    orders_file: Option<String>,
    visits_file: Option<String>,
    satisfaction_file: Option<String>,
    menu_file: Option<String>,
    output_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct AnalysisPatch {
    top_items: Option<usize>,
    min_quintile_population: Option<usize>,
    segments: Option<SegmentsPatch>,
    spend_bands: Option<SpendBandsPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct SegmentsPatch {
    vip_spend: Option<Decimal>,
    vip_frequency: Option<u64>,
    high_spend: Option<Decimal>,
    high_frequency: Option<u64>,
    medium_spend: Option<Decimal>,
    medium_frequency: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct SpendBandsPatch {
    medium_floor: Option<Decimal>,
    high_floor: Option<Decimal>,
    vip_floor: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
struct RecommendationsPatch {
    low_share_floor: Option<f64>,
    vip_share_floor: Option<f64>,
    recommendation_rate_floor: Option<f64>,
    menu_impact: Option<f64>,
    retention_impact: Option<f64>,
    efficiency_impact: Option<f64>,
    total_impact: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};

    use rust_decimal::Decimal;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_validate_and_carry_known_thresholds() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&["TABLEWISE_DATA_DIR", "TABLEWISE_TOP_ITEMS"]);

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.analysis.top_items == 10, "default top_items should be 10")?;
        ensure(
            config.analysis.segments.vip_spend == Decimal::new(500, 0),
            "default vip spend threshold should be 500",
        )?;
        ensure(
            config.recommendations.total_impact == 0.29,
            "default combined impact share should be 0.29",
        )?;
        ensure(
            matches!(config.logging.format, LogFormat::Compact),
            "default logging format should be compact",
        )
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_TABLEWISE_DATA_DIR", "/srv/snapshots/latest");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("tablewise.toml");
            fs::write(
                &path,
                r#"
[data]
data_dir = "${TEST_TABLEWISE_DATA_DIR}"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.data.data_dir == PathBuf::from("/srv/snapshots/latest"),
                "data_dir should be interpolated from the environment",
            )
        })();

        clear_vars(&["TEST_TABLEWISE_DATA_DIR"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TABLEWISE_OUTPUT_DIR", "/tmp/from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("tablewise.toml");
            fs::write(
                &path,
                r#"
[data]
data_dir = "from-file"
output_dir = "from-file-reports"

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    data_dir: Some(PathBuf::from("from-override")),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.data.data_dir == PathBuf::from("from-override"),
                "explicit override should win over the file",
            )?;
            ensure(
                config.data.output_dir == PathBuf::from("/tmp/from-env"),
                "env should win over the file",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")
        })();

        clear_vars(&["TABLEWISE_OUTPUT_DIR"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TABLEWISE_LOG_LEVEL", "warn");
        env::set_var("TABLEWISE_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "log level should come from the alias var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "log format should come from the alias var",
            )
        })();

        clear_vars(&["TABLEWISE_LOG_LEVEL", "TABLEWISE_LOG_FORMAT"]);
        result
    }

    #[test]
    fn validation_rejects_unordered_segment_thresholds() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = dir.path().join("tablewise.toml");
        fs::write(
            &path,
            r#"
[analysis.segments]
vip_spend = 100
"#,
        )
        .map_err(|err| err.to_string())?;

        let error =
            match AppConfig::load(LoadOptions { config_path: Some(path), ..Default::default() }) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };

        let has_message = matches!(
            error,
            ConfigError::Validation(ref message) if message.contains("analysis.segments")
        );
        ensure(has_message, "validation failure should mention analysis.segments")
    }

    #[test]
    fn invalid_env_override_is_reported_with_key_and_value() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TABLEWISE_TOP_ITEMS", "plenty");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => return Err("expected env override failure".to_string()),
                Err(error) => error,
            };
            ensure(
                matches!(
                    error,
                    ConfigError::InvalidEnvOverride { ref key, ref value }
                        if key == "TABLEWISE_TOP_ITEMS" && value == "plenty"
                ),
                "error should carry the offending key and value",
            )
        })();

        clear_vars(&["TABLEWISE_TOP_ITEMS"]);
        result
    }
}
