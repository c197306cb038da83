use std::process::ExitCode;

fn main() -> ExitCode {
    tablewise_cli::run()
}
