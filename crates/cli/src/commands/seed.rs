use std::path::Path;

use tablewise_core::{generate_sample_data, AppConfig, ConfigOverrides, LoadOptions, SampleError};

use crate::commands::CommandResult;
use crate::{init_logging, SeedArgs};

pub fn run(args: &SeedArgs, config_path: Option<&Path>) -> CommandResult {
    let options = LoadOptions {
        config_path: config_path.map(Path::to_path_buf),
        require_file: config_path.is_some(),
        overrides: ConfigOverrides {
            data_dir: args.out_dir.clone(),
            ..ConfigOverrides::default()
        },
    };
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "seed",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };
    init_logging(&config.logging);

    match generate_sample_data(&config.data, args.seed, args.force) {
        Ok(summary) => CommandResult::success(
            "seed",
            format!(
                "seeded {} orders, {} visits, {} surveys, {} menu items into {} (seed {})",
                summary.orders,
                summary.visits,
                summary.surveys,
                summary.menu_items,
                config.data.data_dir.display(),
                summary.seed,
            ),
        ),
        Err(error @ SampleError::AlreadyExists { .. }) => CommandResult::failure(
            "seed",
            "already_exists",
            format!("{error} (pass --force to replace the snapshot)"),
            4,
        ),
        Err(error) => CommandResult::failure("seed", "generation", error.to_string(), 5),
    }
}
