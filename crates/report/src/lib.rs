//! Markdown and JSON rendering of an analysis bundle.
//!
//! Templates are embedded at compile time and rendered through one `Tera`
//! instance with the `format`, `money`, and `pct` filters registered. The
//! rendered suite is four Markdown documents plus the pretty-printed bundle
//! JSON; [`quick_summary`] gives a one-screen digest for terminal output.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tera::{Context, Tera};
use thiserror::Error;
use tracing::info;

use tablewise_core::{
    CustomerInsights, InsightsBundle, PatternStat, Segment, SegmentStat, TimeInsights,
};

pub const EXECUTIVE_SUMMARY_FILE: &str = "executive_summary.md";
pub const DETAILED_FINDINGS_FILE: &str = "detailed_findings.md";
pub const IMPLEMENTATION_GUIDE_FILE: &str = "implementation_guide.md";
pub const FULL_REPORT_FILE: &str = "full_report.md";
pub const ANALYSIS_DATA_FILE: &str = "analysis_data.json";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("template error: {0}")]
    Template(#[from] tera::Error),
    #[error("could not write `{path}`: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("could not serialize the bundle: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// The three Markdown documents plus their concatenation.
#[derive(Debug, Clone)]
pub struct RenderedReport {
    pub executive_summary: String,
    pub detailed_findings: String,
    pub implementation_guide: String,
    pub full_report: String,
}

pub struct ReportGenerator {
    tera: Tera,
}

impl ReportGenerator {
    pub fn new() -> Result<Self, ReportError> {
        let mut tera = Tera::default();
        register_template_filters(&mut tera);
        tera.add_raw_template(
            EXECUTIVE_SUMMARY_FILE,
            include_str!("templates/executive_summary.md.tera"),
        )?;
        tera.add_raw_template(
            DETAILED_FINDINGS_FILE,
            include_str!("templates/detailed_findings.md.tera"),
        )?;
        tera.add_raw_template(
            IMPLEMENTATION_GUIDE_FILE,
            include_str!("templates/implementation_guide.md.tera"),
        )?;
        Ok(Self { tera })
    }

    /// Render the Markdown suite from `bundle`.
    pub fn render(&self, bundle: &InsightsBundle) -> Result<RenderedReport, ReportError> {
        let context = bundle_context(bundle);
        let executive_summary = self.tera.render(EXECUTIVE_SUMMARY_FILE, &context)?;
        let detailed_findings = self.tera.render(DETAILED_FINDINGS_FILE, &context)?;
        let implementation_guide = self.tera.render(IMPLEMENTATION_GUIDE_FILE, &context)?;
        let full_report =
            format!("{executive_summary}\n---\n\n{detailed_findings}\n---\n\n{implementation_guide}");
        Ok(RenderedReport {
            executive_summary,
            detailed_findings,
            implementation_guide,
            full_report,
        })
    }

    /// Render everything and write the five files under `output_dir`.
    pub fn write_suite(
        &self,
        bundle: &InsightsBundle,
        output_dir: &Path,
    ) -> Result<Vec<PathBuf>, ReportError> {
        fs::create_dir_all(output_dir)
            .map_err(|source| ReportError::Io { path: output_dir.to_path_buf(), source })?;

        let rendered = self.render(bundle)?;
        let json = export_json(bundle)?;
        let files = [
            (EXECUTIVE_SUMMARY_FILE, rendered.executive_summary.as_str()),
            (DETAILED_FINDINGS_FILE, rendered.detailed_findings.as_str()),
            (IMPLEMENTATION_GUIDE_FILE, rendered.implementation_guide.as_str()),
            (FULL_REPORT_FILE, rendered.full_report.as_str()),
            (ANALYSIS_DATA_FILE, json.as_str()),
        ];

        let mut written = Vec::with_capacity(files.len());
        for (name, contents) in files {
            let path = output_dir.join(name);
            fs::write(&path, contents)
                .map_err(|source| ReportError::Io { path: path.clone(), source })?;
            written.push(path);
        }

        info!(
            files = written.len(),
            directory = %output_dir.display(),
            "report suite written"
        );
        Ok(written)
    }
}

/// Pretty-printed JSON of the whole bundle, newline-terminated.
pub fn export_json(bundle: &InsightsBundle) -> Result<String, ReportError> {
    let mut text = serde_json::to_string_pretty(bundle)?;
    text.push('\n');
    Ok(text)
}

/// One-screen digest of the bundle for terminal output.
pub fn quick_summary(bundle: &InsightsBundle) -> String {
    let summary = &bundle.executive_summary;
    let mut lines = vec![
        format!("Analysis generated {}", bundle.analysis_date),
        format!(
            "{} orders from {} customers, ${} revenue (avg order ${:.2})",
            summary.total_orders,
            summary.unique_customers,
            summary.total_revenue,
            summary.avg_order_value
        ),
    ];
    match summary.customer_satisfaction {
        Some(score) => lines.push(format!("Customer satisfaction {score:.2} / 5")),
        None => lines.push("No satisfaction surveys in the period".to_string()),
    }
    if let Some(menu) = &bundle.menu_insights {
        if let Some(top) = menu.top_10_popular.first() {
            lines.push(format!("Top dish: {} ({} orders)", top.item_name, top.order_count));
        }
    }
    if let Some(time) = &bundle.time_insights {
        let mut line = format!("Peak day {} ({} orders)", time.peak_day, time.peak_day_orders);
        if let Some(hour) = time.peak_hour {
            line.push_str(&format!(", busiest hour {hour}:00"));
        }
        lines.push(line);
    }
    lines.push(format!(
        "Projected monthly upside ${:.2} across {} priority moves",
        bundle.business_recommendations.projected_impact.total_potential,
        bundle.business_recommendations.implementation_priority.len()
    ));
    if !bundle.engine_failures.is_empty() {
        let engines: Vec<&str> =
            bundle.engine_failures.iter().map(|failure| failure.engine).collect();
        lines.push(format!("Engines skipped: {}", engines.join(", ")));
    }
    lines.join("\n")
}

// ---------------------------------------------------------------------------
// Template context
// ---------------------------------------------------------------------------

/// Segment table row in tier order, highest first.
#[derive(Serialize)]
struct SegmentRow<'a> {
    segment: &'static str,
    customers: u64,
    stat: &'a SegmentStat,
}

/// Hourly table row; maps lose numeric key order through the template
/// engine, so hours are pre-flattened into a sorted list.
#[derive(Serialize)]
struct HourlyRow<'a> {
    hour: u32,
    #[serde(flatten)]
    stat: &'a PatternStat,
}

fn bundle_context(bundle: &InsightsBundle) -> Context {
    let mut context = Context::new();
    context.insert("summary", &bundle.executive_summary);
    context.insert("customers", &bundle.customer_insights);
    context.insert("menu", &bundle.menu_insights);
    context.insert("time", &bundle.time_insights);
    context.insert("satisfaction", &bundle.satisfaction_insights);
    context.insert("business", &bundle.business_recommendations);
    context.insert("analysis_date", &bundle.analysis_date);
    context.insert("engine_failures", &bundle.engine_failures);
    context.insert("segment_rows", &bundle.customer_insights.as_ref().map(segment_rows));
    context.insert("hourly_rows", &bundle.time_insights.as_ref().and_then(hourly_rows));
    context.insert("failures", &failure_map(bundle));
    context
}

fn segment_rows(customers: &CustomerInsights) -> Vec<SegmentRow<'_>> {
    Segment::ALL
        .iter()
        .filter_map(|segment| {
            let count = customers.segments_distribution.get(segment)?;
            let stat = customers.segment_stats.get(segment)?;
            Some(SegmentRow { segment: segment.as_str(), customers: *count, stat })
        })
        .collect()
}

fn hourly_rows(time: &TimeInsights) -> Option<Vec<HourlyRow<'_>>> {
    let hourly = time.hourly_patterns.as_ref()?;
    Some(hourly.iter().map(|(&hour, stat)| HourlyRow { hour, stat }).collect())
}

fn failure_map(bundle: &InsightsBundle) -> BTreeMap<&'static str, &str> {
    bundle
        .engine_failures
        .iter()
        .map(|failure| (failure.engine, failure.error.as_str()))
        .collect()
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

/// Register the custom Tera filters used by the report templates.
///
/// - `format`: printf-style formatting, e.g. `"%.2f" | format(value=price)`
///   (supports `%.Nf` and `%0Nd` patterns)
/// - `money`:  2-decimal rendering, accepts numbers and decimal strings
/// - `pct`:    1-decimal rendering with a trailing percent sign
///
/// All three render `n/a` for absent values.
pub fn register_template_filters(tera: &mut Tera) {
    tera.register_filter("format", tera_format_filter);
    tera.register_filter("money", tera_money_filter);
    tera.register_filter("pct", tera_pct_filter);
}

fn numeric(value: &tera::Value) -> Option<f64> {
    match value {
        tera::Value::Number(number) => number.as_f64(),
        // Fixed-point money fields serialize as strings.
        tera::Value::String(raw) => raw.parse().ok(),
        _ => None,
    }
}

fn tera_format_filter(
    value: &tera::Value,
    args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let format_str = value
        .as_str()
        .ok_or_else(|| tera::Error::msg("format filter expects a string input"))?;
    let arg = args
        .get("value")
        .ok_or_else(|| tera::Error::msg("format filter requires a `value` argument"))?;

    let Some(num) = numeric(arg) else {
        return Ok(tera::Value::String("n/a".to_string()));
    };

    // Parse %.<N>f and %0<N>d patterns.
    let result = if let Some(rest) = format_str.strip_prefix("%.") {
        if let Some(precision_str) = rest.strip_suffix('f') {
            let precision: usize = precision_str.parse().unwrap_or(2);
            format!("{:.*}", precision, num)
        } else {
            format!("{num}")
        }
    } else if let Some(rest) = format_str.strip_prefix("%0") {
        if let Some(width_str) = rest.strip_suffix('d') {
            let width: usize = width_str.parse().unwrap_or(2);
            format!("{:0width$}", num as i64, width = width)
        } else {
            format!("{num}")
        }
    } else {
        format!("{num}")
    };

    Ok(tera::Value::String(result))
}

fn tera_money_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let text = match numeric(value) {
        Some(num) => format!("{num:.2}"),
        None => "n/a".to_string(),
    };
    Ok(tera::Value::String(text))
}

fn tera_pct_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let text = match numeric(value) {
        Some(num) => format!("{num:.1}%"),
        None => "n/a".to_string(),
    };
    Ok(tera::Value::String(text))
}
