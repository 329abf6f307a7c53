//! # Roster Server
//!
//! Main entry point for the Roster application.

use roster_config::{AppConfig, ConfigLoader};
use roster_core::{RosterError, RosterResult};
use roster_server::{startup, telemetry, Application};
use tokio::net::TcpListener;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let loader = ConfigLoader::from_default_location();
    let config = match loader.load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Failed to load configuration from {}: {}",
                loader.config_dir().display(),
                e
            );
            std::process::exit(1);
        }
    };

    if let Err(e) = telemetry::init_logging(&config.observability) {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    startup::print_banner(&config.app);

    if let Err(e) = run(config).await {
        error!("Application error: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: AppConfig) -> RosterResult<()> {
    let metrics = if config.observability.metrics_enabled {
        Some(telemetry::install_metrics_recorder()?)
    } else {
        None
    };

    let app = Application::build(&config, metrics).await?;

    let addr = config.server.addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| RosterError::Internal(format!("Failed to bind {}: {}", addr, e)))?;

    startup::print_startup_info(&config);
    info!("Starting REST server on http://{}", addr);

    app.run_until_stopped(listener, startup::shutdown_signal()).await
}
