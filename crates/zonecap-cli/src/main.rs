use std::env;
use std::process::ExitCode;

use sloggers::Config;

use zonecap_cli::{runner, RunnerConfig, RunnerError};

fn run() -> Result<(), RunnerError> {
    let config_path = env::args().nth(1).unwrap_or_else(|| "zonecap.toml".to_string());
    let config = RunnerConfig::load(&config_path)?;
    let log = config.logging.build_logger()?;

    slog::info!(log, "starting run"; "config" => config_path);
    runner::run(&config, &log)
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("zonecap: {e}");
            ExitCode::FAILURE
        }
    }
}
