pub mod config;
pub mod dataset;
pub mod domain;
pub mod engines;
pub mod errors;
pub mod insights;
pub mod recommend;
pub mod stats;

pub use config::{
    AnalysisConfig, AppConfig, ConfigError, ConfigOverrides, DataConfig, LoadOptions, LogFormat,
    LoggingConfig,
};
pub use dataset::loader::{load_dataset, LoadError};
pub use dataset::sample::{generate_sample_data, SampleError, SampleSummary, DEFAULT_SEED};
pub use dataset::{CleaningReport, Dataset};
pub use domain::customer::{CustomerId, CustomerMetric, Segment};
pub use domain::menu::{ItemId, MenuItem};
pub use domain::order::{Order, OrderId};
pub use domain::survey::{SatisfactionSurvey, SurveyId};
pub use domain::visit::{Visit, VisitId};
pub use engines::menu::{CategoryPerformance, ItemPerformance, MenuEngine, MenuInsights};
pub use engines::satisfaction::{
    OverallMetrics, SatisfactionEngine, SatisfactionInsights, SatisfactionTrendPoint,
    SpendBandStat, SpendBands,
};
pub use engines::segmentation::{
    CustomerInsights, SegmentStat, SegmentThresholds, SegmentationEngine,
};
pub use engines::temporal::{
    DailyPattern, MonthlyPattern, PatternStat, TemporalEngine, TimeInsights,
};
pub use errors::{ApplicationError, DomainError};
pub use insights::{
    AnalysisPipeline, EngineFailure, ExecutiveSummary, InsightsBundle, ANALYSIS_DATE_FORMAT,
};
pub use recommend::{
    BusinessRecommendations, ProjectedImpact, RecommendationEngine, RecommendationSet,
    RecommendationTuning,
};
pub use stats::TrendLine;
