use std::path::Path;

use tablewise_report::{quick_summary, ReportError, ReportGenerator};

use crate::commands::analyze::execute_pipeline;
use crate::commands::CommandResult;
use crate::ReportArgs;

pub fn run(args: &ReportArgs, config_path: Option<&Path>) -> CommandResult {
    let run = match execute_pipeline(
        "report",
        config_path,
        args.data_dir.as_deref(),
        args.output_dir.as_deref(),
        args.as_of.as_deref(),
    ) {
        Ok(run) => run,
        Err(failure) => return failure,
    };

    let generator = match ReportGenerator::new() {
        Ok(generator) => generator,
        Err(error) => return CommandResult::failure("report", "render", error.to_string(), 5),
    };

    let output_dir = &run.config.data.output_dir;
    let written = match generator.write_suite(&run.bundle, output_dir) {
        Ok(written) => written,
        Err(error) => {
            let class = match &error {
                ReportError::Template(_) => "render",
                ReportError::Io { .. } | ReportError::Serialize(_) => "export",
            };
            return CommandResult::failure("report", class, error.to_string(), 5);
        }
    };

    let message = format!(
        "{}\n{} files written to {}",
        quick_summary(&run.bundle),
        written.len(),
        output_dir.display()
    );
    CommandResult::success("report", message)
}
