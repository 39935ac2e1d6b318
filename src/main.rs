use clap::Parser;
use std::path::Path;
use std::process::ExitCode;
use tracing::{error, info};

use fieldbook::cli::{self, Cli};
use fieldbook::config::Config;
use fieldbook::logging;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logging::init(Path::new(&config.log_dir)) {
        eprintln!("Failed to initialize logging in {}: {}", config.log_dir, e);
        return ExitCode::FAILURE;
    }

    info!("Starting fieldbook");
    info!("  - Default VAT rate: {}", config.default_vat_rate);
    info!("  - Currency: {}", config.default_currency);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match cli::run(&cli, &config, &mut out) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => {
            info!("Input rejected");
            ExitCode::from(2)
        }
        Err(e) => {
            error!("Command failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
