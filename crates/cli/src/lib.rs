pub mod commands;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use tablewise_core::{LogFormat, LoggingConfig, DEFAULT_SEED};

#[derive(Debug, Parser)]
#[command(
    name = "tablewise",
    about = "Tablewise restaurant analytics CLI",
    long_about = "Turn restaurant order, visit, and satisfaction exports into customer \
segmentation, menu, temporal, and satisfaction insights with recommendations and a \
Markdown report suite.",
    after_help = "Examples:\n  tablewise seed --out-dir data\n  tablewise analyze --as-of \"2023-12-31 23:59:59\"\n  tablewise report\n  tablewise doctor --json"
)]
pub struct Cli {
    /// Explicit config file (default search: tablewise.toml, config/tablewise.toml).
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Load the dataset, run all engines, and export the insights bundle")]
    Analyze(AnalyzeArgs),
    #[command(about = "Analyze and render the full Markdown report suite")]
    Report(ReportArgs),
    #[command(about = "Write a seeded synthetic four-table snapshot for demos and tests")]
    Seed(SeedArgs),
    #[command(about = "Check config, input files, loadability, and analysis readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
}

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    /// Input directory, overriding file and env settings.
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,
    /// Output directory for the exported bundle.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
    /// Reference instant "YYYY-MM-DD HH:MM:SS"; defaults to now.
    #[arg(long, value_name = "DATETIME")]
    pub as_of: Option<String>,
    /// Pretty-print the JSON result payload.
    #[arg(long)]
    pub pretty: bool,
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    /// Input directory, overriding file and env settings.
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,
    /// Output directory for the rendered suite.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
    /// Reference instant "YYYY-MM-DD HH:MM:SS"; defaults to now.
    #[arg(long, value_name = "DATETIME")]
    pub as_of: Option<String>,
}

#[derive(Debug, Args)]
pub struct SeedArgs {
    /// Directory to write the snapshot into; defaults to the configured data dir.
    #[arg(long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,
    /// Generator seed; the same seed always writes identical files.
    #[arg(long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,
    /// Replace existing snapshot files instead of refusing.
    #[arg(long)]
    pub force: bool,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let config_path = cli.config.as_deref();
    let result = match &cli.command {
        Command::Analyze(args) => commands::analyze::run(args, config_path),
        Command::Report(args) => commands::report::run(args, config_path),
        Command::Seed(args) => commands::seed::run(args, config_path),
        Command::Doctor { json } => commands::CommandResult {
            exit_code: 0,
            output: commands::doctor::run(*json, config_path),
        },
        Command::Config => commands::CommandResult {
            exit_code: 0,
            output: commands::config::run(config_path),
        },
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Install the global subscriber described by `logging`. Logs go to stderr so
/// command payloads on stdout stay machine-readable. Later calls in the same
/// process keep the first subscriber.
pub(crate) fn init_logging(logging: &LoggingConfig) {
    use tracing::Level;

    let log_level = logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(io::stderr);

    let _ = match logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
