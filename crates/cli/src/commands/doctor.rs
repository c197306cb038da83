use std::collections::HashSet;
use std::path::Path;

use serde::Serialize;

use tablewise_core::{load_dataset, AppConfig, Dataset, LoadOptions};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool, config_path: Option<&Path>) -> String {
    let report = build_report(config_path);

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report(config_path: Option<&Path>) -> DoctorReport {
    let mut checks = Vec::new();

    let options = LoadOptions {
        config_path: config_path.map(Path::to_path_buf),
        require_file: config_path.is_some(),
        ..LoadOptions::default()
    };
    match AppConfig::load(options) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });

            let files_check = check_data_files(&config);
            let files_present = files_check.status == CheckStatus::Pass;
            checks.push(files_check);

            if files_present {
                let (load_check, dataset) = check_data_loadable(&config);
                checks.push(load_check);
                match dataset {
                    Some(dataset) => checks.push(check_analysis_ready(&config, &dataset)),
                    None => checks
                        .push(skipped("analysis_ready", "skipped because the dataset did not load")),
                }
            } else {
                checks.push(skipped("data_loadable", "skipped because input files are missing"));
                checks.push(skipped("analysis_ready", "skipped because input files are missing"));
            }
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.push(skipped("data_files_present", "skipped because configuration did not load"));
            checks.push(skipped("data_loadable", "skipped because configuration did not load"));
            checks.push(skipped("analysis_ready", "skipped because configuration did not load"));
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_data_files(config: &AppConfig) -> DoctorCheck {
    let data = &config.data;
    let expected =
        [data.orders_path(), data.visits_path(), data.satisfaction_path(), data.menu_path()];
    let missing: Vec<String> = expected
        .iter()
        .filter(|path| !path.exists())
        .map(|path| path.display().to_string())
        .collect();

    if missing.is_empty() {
        DoctorCheck {
            name: "data_files_present",
            status: CheckStatus::Pass,
            details: format!("all four input files found under `{}`", data.data_dir.display()),
        }
    } else {
        DoctorCheck {
            name: "data_files_present",
            status: CheckStatus::Fail,
            details: format!("missing: {}", missing.join(", ")),
        }
    }
}

fn check_data_loadable(config: &AppConfig) -> (DoctorCheck, Option<Dataset>) {
    match load_dataset(&config.data) {
        Ok((dataset, cleaning)) => {
            let check = DoctorCheck {
                name: "data_loadable",
                status: CheckStatus::Pass,
                details: format!(
                    "{} orders, {} visits, {} surveys, {} menu items loaded ({} rows dropped)",
                    cleaning.orders_kept,
                    cleaning.visits_kept,
                    cleaning.surveys_kept,
                    cleaning.menu_items,
                    cleaning.total_dropped()
                ),
            };
            (check, Some(dataset))
        }
        Err(error) => {
            let check = DoctorCheck {
                name: "data_loadable",
                status: CheckStatus::Fail,
                details: error.to_string(),
            };
            (check, None)
        }
    }
}

/// Advisory: a run with no usable orders would fail outright; a tiny customer
/// population still runs but with coarse quintile buckets.
fn check_analysis_ready(config: &AppConfig, dataset: &Dataset) -> DoctorCheck {
    if dataset.orders.is_empty() {
        return DoctorCheck {
            name: "analysis_ready",
            status: CheckStatus::Fail,
            details: "no usable orders after cleaning; analysis would fail".to_string(),
        };
    }

    let customers: HashSet<_> = dataset.orders.iter().map(|order| &order.customer_id).collect();
    let floor = config.analysis.min_quintile_population;
    let details = if customers.len() < floor {
        format!(
            "{} distinct customers is below the quintile floor of {}; RFM scores will be coarse",
            customers.len(),
            floor
        )
    } else {
        format!("{} distinct customers across {} orders", customers.len(), dataset.orders.len())
    };

    DoctorCheck { name: "analysis_ready", status: CheckStatus::Pass, details }
}

fn skipped(name: &'static str, details: &str) -> DoctorCheck {
    DoctorCheck { name, status: CheckStatus::Skipped, details: details.to_string() }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
