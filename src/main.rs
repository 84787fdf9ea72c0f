// geoaccess - operator CLI for the project access engine

use std::process::ExitCode;

use clap::Parser;
use geocontrib_access::cli::{dispatch, Cli};
use geocontrib_access::config_loader::load_config;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            return ExitCode::from(2);
        }
    };

    // validated by load_config
    let level = config.tracing_level().unwrap_or(tracing::Level::INFO);
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match dispatch(cli, &config) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("Error: {e:#}");
            ExitCode::from(2)
        }
    }
}
