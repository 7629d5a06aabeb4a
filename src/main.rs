use std::process::ExitCode;

use clap::Parser;

use valuation_client::cli::{self, Cli};
use valuation_client::config::Config;
use valuation_client::telemetry::init_telemetry;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = Config::from_env();

    let telemetry_guard = match init_telemetry(&config) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("failed to initialize telemetry: {err:#}");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        environment = %config.environment,
        backend = %config.backend_base_url,
        demo_mode = config.demo_mode,
        "Starting valuation client"
    );

    let code = match cli::run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = format!("{err:#}"), "command failed");
            ExitCode::FAILURE
        }
    };

    telemetry_guard.shutdown();
    code
}
