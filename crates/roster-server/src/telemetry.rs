//! Logging and metrics setup.

use axum::{routing::get, Router};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use roster_config::ObservabilityConfig;
use roster_core::{RosterError, RosterResult};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level when set.
pub fn init_logging(config: &ObservabilityConfig) -> RosterResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},tower_http=debug", config.log_level)));

    let registry = tracing_subscriber::registry().with(filter);
    let result = if config.log_format == "json" {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().with_target(true)).try_init()
    };

    result.map_err(|e| RosterError::Configuration(format!("Failed to init logging: {}", e)))
}

/// Installs the Prometheus recorder and describes the cache counters.
pub fn install_metrics_recorder() -> RosterResult<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
        RosterError::Configuration(format!("Failed to install metrics recorder: {}", e))
    })?;
    roster_service::cache::metrics::register_metrics();
    Ok(handle)
}

/// Router serving the Prometheus text format at `path`.
pub fn metrics_router(path: &str, handle: PrometheusHandle) -> Router {
    Router::new().route(path, get(move || std::future::ready(handle.render())))
}
