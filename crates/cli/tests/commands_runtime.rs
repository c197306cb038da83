use std::env;
use std::fs;
use std::path::Path;
use std::sync::{Mutex, OnceLock};

use serde_json::Value;
use tempfile::TempDir;

use tablewise_cli::commands::{analyze, config, doctor, report, seed};
use tablewise_cli::{AnalyzeArgs, ReportArgs, SeedArgs};

const AS_OF: &str = "2023-12-31 23:59:59";

#[test]
fn seed_writes_the_snapshot_then_refuses_to_overwrite() {
    with_env(&[], || {
        let dir = TempDir::new().expect("temp dir should be created");
        let out = dir.path().join("data");

        let args = SeedArgs { out_dir: Some(out.clone()), seed: 7, force: false };
        let first = seed::run(&args, None);
        assert_eq!(first.exit_code, 0, "expected the first seed run to succeed");
        let payload = parse_payload(&first.output);
        assert_eq!(payload["command"], "seed");
        assert_eq!(payload["status"], "ok");
        assert!(payload["message"].as_str().unwrap_or("").contains("3200 orders"));
        for file in ["orders.csv", "visits.csv", "satisfaction.csv", "menu_items.csv"] {
            assert!(out.join(file).exists(), "expected {file} to be written");
        }

        let second = seed::run(&args, None);
        assert_eq!(second.exit_code, 4, "expected a refusal without --force");
        let payload = parse_payload(&second.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "already_exists");

        let forced = SeedArgs { out_dir: Some(out), seed: 7, force: true };
        let third = seed::run(&forced, None);
        assert_eq!(third.exit_code, 0, "expected --force to replace the snapshot");
    });
}

#[test]
fn analyze_exports_the_bundle_over_a_seeded_snapshot() {
    with_env(&[], || {
        let dir = TempDir::new().expect("temp dir should be created");
        let data = dir.path().join("data");
        let reports = dir.path().join("reports");

        let seeded =
            seed::run(&SeedArgs { out_dir: Some(data.clone()), seed: 42, force: false }, None);
        assert_eq!(seeded.exit_code, 0, "expected seeding to succeed");

        let args = AnalyzeArgs {
            data_dir: Some(data),
            output_dir: Some(reports.clone()),
            as_of: Some(AS_OF.to_string()),
            pretty: true,
        };
        let result = analyze::run(&args, None);
        assert_eq!(result.exit_code, 0, "expected the analyze run to succeed");
        assert!(result.output.lines().count() > 1, "--pretty should produce multi-line JSON");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "analyze");
        assert_eq!(payload["status"], "ok");
        let message = payload["message"].as_str().unwrap_or("");
        assert!(message.contains("analyzed 3200 orders from"));
        assert!(!message.contains("sections skipped"), "no engine should fail on seeded data");

        let exported = reports.join("analysis_data.json");
        let raw = fs::read_to_string(&exported).expect("exported bundle should exist");
        let bundle: Value = serde_json::from_str(&raw).expect("export should be valid JSON");
        assert_eq!(bundle["analysis_date"], AS_OF);
        assert_eq!(bundle["executive_summary"]["total_orders"], 3200);
        assert!(bundle["engine_failures"].as_array().is_some_and(Vec::is_empty));
    });
}

#[test]
fn analyze_classifies_missing_inputs_as_a_load_failure() {
    with_env(&[], || {
        let dir = TempDir::new().expect("temp dir should be created");

        let args = AnalyzeArgs {
            data_dir: Some(dir.path().join("nowhere")),
            output_dir: Some(dir.path().join("reports")),
            as_of: Some(AS_OF.to_string()),
            pretty: false,
        };
        let result = analyze::run(&args, None);
        assert_eq!(result.exit_code, 3, "missing input files should exit as a load failure");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "data_load");
        assert!(payload["message"].as_str().unwrap_or("").contains("orders"));
    });
}

#[test]
fn analyze_rejects_a_malformed_as_of() {
    with_env(&[], || {
        let dir = TempDir::new().expect("temp dir should be created");

        let args = AnalyzeArgs {
            data_dir: Some(dir.path().to_path_buf()),
            output_dir: None,
            as_of: Some("yesterday".to_string()),
            pretty: false,
        };
        let result = analyze::run(&args, None);
        assert_eq!(result.exit_code, 2, "a bad --as-of should fail before any loading");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "argument_validation");
        assert!(payload["message"].as_str().unwrap_or("").contains("--as-of"));
    });
}

#[test]
fn analyze_requires_an_explicit_config_file_to_exist() {
    with_env(&[], || {
        let args = AnalyzeArgs { data_dir: None, output_dir: None, as_of: None, pretty: false };
        let result = analyze::run(&args, Some(Path::new("/nonexistent/tablewise.toml")));
        assert_eq!(result.exit_code, 2, "a named but absent config file is a config failure");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn report_writes_the_full_markdown_suite() {
    with_env(&[], || {
        let dir = TempDir::new().expect("temp dir should be created");
        let data = dir.path().join("data");
        let reports = dir.path().join("reports");

        let seeded =
            seed::run(&SeedArgs { out_dir: Some(data.clone()), seed: 42, force: false }, None);
        assert_eq!(seeded.exit_code, 0, "expected seeding to succeed");

        let args = ReportArgs {
            data_dir: Some(data),
            output_dir: Some(reports.clone()),
            as_of: Some(AS_OF.to_string()),
        };
        let result = report::run(&args, None);
        assert_eq!(result.exit_code, 0, "expected the report run to succeed");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "report");
        assert_eq!(payload["status"], "ok");
        let message = payload["message"].as_str().unwrap_or("");
        assert!(message.contains("Analysis generated"));
        assert!(message.contains("5 files written to"));

        for file in [
            "executive_summary.md",
            "detailed_findings.md",
            "implementation_guide.md",
            "full_report.md",
            "analysis_data.json",
        ] {
            assert!(reports.join(file).exists(), "expected {file} in the suite");
        }
    });
}

#[test]
fn doctor_goes_green_over_a_seeded_snapshot() {
    let dir = TempDir::new().expect("temp dir should be created");
    let data = dir.path().join("data").display().to_string();

    with_env(&[("TABLEWISE_DATA_DIR", data.as_str())], || {
        let seeded = seed::run(&SeedArgs { out_dir: None, seed: 42, force: false }, None);
        assert_eq!(seeded.exit_code, 0, "expected seeding into the env-set dir to succeed");

        let output = doctor::run(true, None);
        let report: Value = serde_json::from_str(&output).expect("doctor JSON should parse");
        assert_eq!(report["overall_status"], "pass");

        let checks = report["checks"].as_array().expect("checks should be an array");
        assert_eq!(checks.len(), 4);
        assert!(checks.iter().all(|check| check["status"] == "pass"));
        let load_details = checks[2]["details"].as_str().unwrap_or("");
        assert!(load_details.contains("3200 orders"));
        assert!(load_details.contains("0 rows dropped"));

        let human = doctor::run(false, None);
        assert!(human.starts_with("doctor: all readiness checks passed"));
        assert!(human.contains("- [ok] config_validation:"));
        assert!(human.contains("- [ok] analysis_ready:"));
    });
}

#[test]
fn doctor_skips_downstream_checks_when_files_are_missing() {
    let dir = TempDir::new().expect("temp dir should be created");
    let data = dir.path().join("nowhere").display().to_string();

    with_env(&[("TABLEWISE_DATA_DIR", data.as_str())], || {
        let output = doctor::run(true, None);
        let report: Value = serde_json::from_str(&output).expect("doctor JSON should parse");
        assert_eq!(report["overall_status"], "fail");

        let checks = report["checks"].as_array().expect("checks should be an array");
        assert_eq!(checks[0]["name"], "config_validation");
        assert_eq!(checks[0]["status"], "pass");
        assert_eq!(checks[1]["name"], "data_files_present");
        assert_eq!(checks[1]["status"], "fail");
        assert!(checks[1]["details"].as_str().unwrap_or("").contains("missing:"));
        assert_eq!(checks[2]["status"], "skipped");
        assert_eq!(checks[3]["status"], "skipped");
    });
}

#[test]
fn config_command_attributes_env_and_default_sources() {
    with_env(&[("TABLEWISE_DATA_DIR", "/srv/pos-exports")], || {
        let output = config::run(None);

        assert!(output.starts_with("effective config (source precedence: env > file > default):"));
        assert!(output
            .contains("- data.data_dir = /srv/pos-exports (source: env (TABLEWISE_DATA_DIR))"));
        assert!(output.contains("- analysis.top_items = 10 (source: default)"));
        assert!(output.contains("- logging.level = info (source: default)"));
    });
}

#[test]
fn config_command_attributes_file_sources() {
    let dir = TempDir::new().expect("temp dir should be created");
    let path = dir.path().join("tablewise.toml");
    fs::write(&path, "[analysis]\ntop_items = 4\n").expect("config file should be written");

    with_env(&[], || {
        let output = config::run(Some(&path));

        let expected = format!("- analysis.top_items = 4 (source: file ({}))", path.display());
        assert!(output.contains(&expected), "missing file attribution line:\n{output}");
        assert!(output.contains("- data.output_dir = reports (source: default)"));
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "TABLEWISE_DATA_DIR",
        "TABLEWISE_OUTPUT_DIR",
        "TABLEWISE_ORDERS_FILE",
        "TABLEWISE_VISITS_FILE",
        "TABLEWISE_SATISFACTION_FILE",
        "TABLEWISE_MENU_FILE",
        "TABLEWISE_TOP_ITEMS",
        "TABLEWISE_LOGGING_LEVEL",
        "TABLEWISE_LOGGING_FORMAT",
        "TABLEWISE_LOG_LEVEL",
        "TABLEWISE_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
