use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::NaiveDateTime;

use tablewise_core::{
    load_dataset, AnalysisPipeline, AppConfig, CleaningReport, ConfigOverrides, InsightsBundle,
    LoadOptions, ANALYSIS_DATE_FORMAT,
};
use tablewise_report::{export_json, ANALYSIS_DATA_FILE};

use crate::commands::CommandResult;
use crate::{init_logging, AnalyzeArgs};

/// Everything the load-and-analyze stage produces, shared with `report`.
pub(crate) struct PipelineRun {
    pub(crate) config: AppConfig,
    pub(crate) cleaning: CleaningReport,
    pub(crate) bundle: InsightsBundle,
}

pub fn run(args: &AnalyzeArgs, config_path: Option<&Path>) -> CommandResult {
    let run = match execute_pipeline(
        "analyze",
        config_path,
        args.data_dir.as_deref(),
        args.output_dir.as_deref(),
        args.as_of.as_deref(),
    ) {
        Ok(run) => run,
        Err(failure) => return failure,
    };

    let export = match write_export(&run.bundle, &run.config.data.output_dir) {
        Ok(path) => path,
        Err(error) => {
            return CommandResult::failure("analyze", "export", format!("{error:#}"), 5);
        }
    };

    CommandResult::success_with("analyze", summarize(&run, &export), args.pretty)
}

/// Load config, resolve the reference instant, load the dataset, and run the
/// engines. Failures come back as ready-to-print results: config issues exit
/// 2, load failures 3, analysis failures 4.
pub(crate) fn execute_pipeline(
    command: &str,
    config_path: Option<&Path>,
    data_dir: Option<&Path>,
    output_dir: Option<&Path>,
    as_of: Option<&str>,
) -> Result<PipelineRun, CommandResult> {
    let options = LoadOptions {
        config_path: config_path.map(Path::to_path_buf),
        require_file: config_path.is_some(),
        overrides: ConfigOverrides {
            data_dir: data_dir.map(Path::to_path_buf),
            output_dir: output_dir.map(Path::to_path_buf),
            log_level: None,
        },
    };
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return Err(CommandResult::failure(
                command,
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            ));
        }
    };
    init_logging(&config.logging);

    let as_of = match parse_as_of(as_of) {
        Ok(instant) => instant,
        Err(detail) => {
            return Err(CommandResult::failure(command, "argument_validation", detail, 2));
        }
    };

    let (dataset, cleaning) = match load_dataset(&config.data) {
        Ok(loaded) => loaded,
        Err(error) => {
            return Err(CommandResult::failure(command, error.class(), error.to_string(), 3));
        }
    };

    let pipeline = AnalysisPipeline::from_config(&config);
    let bundle = match pipeline.run(&dataset, as_of) {
        Ok(bundle) => bundle,
        Err(error) => {
            return Err(CommandResult::failure(command, "analysis", error.to_string(), 4));
        }
    };

    Ok(PipelineRun { config, cleaning, bundle })
}

fn parse_as_of(raw: Option<&str>) -> Result<NaiveDateTime, String> {
    match raw {
        Some(raw) => NaiveDateTime::parse_from_str(raw, ANALYSIS_DATE_FORMAT).map_err(|error| {
            format!("invalid --as-of `{raw}` (expected `{ANALYSIS_DATE_FORMAT}`): {error}")
        }),
        None => Ok(chrono::Local::now().naive_local()),
    }
}

fn write_export(bundle: &InsightsBundle, output_dir: &Path) -> anyhow::Result<PathBuf> {
    let json = export_json(bundle)?;
    fs::create_dir_all(output_dir)
        .with_context(|| format!("could not create `{}`", output_dir.display()))?;

    let path = output_dir.join(ANALYSIS_DATA_FILE);
    fs::write(&path, json).with_context(|| format!("could not write `{}`", path.display()))?;
    Ok(path)
}

fn summarize(run: &PipelineRun, export: &Path) -> String {
    let summary = &run.bundle.executive_summary;
    let mut message = format!(
        "analyzed {} orders from {} customers ({} raw rows dropped); bundle written to {}",
        summary.total_orders,
        summary.unique_customers,
        run.cleaning.total_dropped(),
        export.display()
    );

    if !run.bundle.engine_failures.is_empty() {
        let skipped: Vec<&str> =
            run.bundle.engine_failures.iter().map(|failure| failure.engine).collect();
        message.push_str(&format!("; sections skipped: {}", skipped.join(", ")));
    }

    message
}
