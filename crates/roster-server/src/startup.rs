//! Server startup utilities.

use roster_config::{AppConfig, AppMetadata};
use roster_core::{RosterError, RosterResult};
use roster_repository::DatabasePool;
use roster_resilience::RetryPolicy;
use tokio::signal;
use tracing::{error, info};

/// Prints the startup banner.
pub fn print_banner(app: &AppMetadata) {
    info!(r#"
    ____             __
   / __ \____  _____/ /____  _____
  / /_/ / __ \/ ___/ __/ _ \/ ___/
 / _, _/ /_/ (__  ) /_/  __/ /
/_/ |_|\____/____/\__/\___/_/
    "#);
    info!("{} v{} ({})", app.api_title(), app.version, app.environment);
}

/// Prints server startup information.
pub fn print_startup_info(config: &AppConfig) {
    let addr = config.server.addr();
    let separator = "=".repeat(60);
    info!("{}", separator);
    info!("REST API:  http://{}/users", addr);
    info!("Health:    http://{}/health", addr);
    info!("API Docs:  http://{}/swagger-ui", addr);
    if config.observability.metrics_enabled {
        info!("Metrics:   http://{}{}", addr, config.observability.metrics_path);
    }
    info!("Cache:     {} (TTL {}s)", config.cache.backend, config.cache.ttl_secs);
    info!("{}", separator);
}

/// Connects to the database, retrying connectivity failures.
///
/// Makes up to `startup.max_attempts` attempts `startup.retry_delay_ms`
/// apart. Non-retriable errors, such as a malformed URL or rejected
/// credentials, fail at once.
pub async fn wait_for_database(config: &AppConfig) -> RosterResult<DatabasePool> {
    let policy = RetryPolicy::fixed(config.startup.max_attempts, config.startup.retry_delay());
    info!(
        "Waiting for database (up to {} attempts, {}ms apart)",
        policy.max_attempts,
        policy.delay.as_millis()
    );

    policy
        .execute_if(|| DatabasePool::connect(&config.database), RosterError::is_retriable)
        .await
        .map_err(|e| {
            error!("Database unreachable, giving up: {}", e);
            e
        })
}

/// Resolves on Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        () = terminate => {
            info!("Received terminate signal, initiating graceful shutdown...");
        }
    }
}
