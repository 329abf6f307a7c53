//! Configuration validation module.
//!
//! Provides validation for all configuration values, failing fast on
//! invalid configuration rather than at runtime.

use crate::AppConfig;
use thiserror::Error;
use url::Url;

/// Configuration validation error variants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigValidationError {
    /// Port number is invalid.
    #[error("Invalid port for {name}: {value} (must be 1-65535)")]
    InvalidPort { name: String, value: u16 },

    /// Pool size configuration is invalid (min must be <= max).
    #[error("Invalid pool size: min ({min}) cannot be greater than max ({max})")]
    InvalidPoolSize { min: u32, max: u32 },

    /// Pool size is zero or exceeds the maximum allowed.
    #[error("Pool size {value} for {name} must be between 1 and {maximum}")]
    PoolSizeOutOfRange { name: String, value: u64, maximum: u64 },

    /// URL format is invalid.
    #[error("Invalid {url_type} URL: {message}")]
    InvalidUrl { url_type: String, message: String },

    /// Duration must be positive.
    #[error("'{name}' must be positive, got {value}")]
    NonPositiveDuration { name: String, value: u64 },

    /// At least one startup attempt is required.
    #[error("startup.max_attempts must be at least 1")]
    NoStartupAttempts,

    /// Log level is invalid.
    #[error("Invalid log level: '{value}' (valid: trace, debug, info, warn, error)")]
    InvalidLogLevel { value: String },

    /// Log format is invalid.
    #[error("Invalid log format: '{value}' (valid: pretty, json)")]
    InvalidLogFormat { value: String },

    /// Metrics path must be absolute.
    #[error("Metrics path must start with '/': '{value}'")]
    InvalidMetricsPath { value: String },
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Maximum connection pool size.
    const MAX_POOL_SIZE: u64 = 1000;
    /// Valid log levels.
    const VALID_LOG_LEVELS: &'static [&'static str] = &["trace", "debug", "info", "warn", "error"];
    /// Valid log formats.
    const VALID_LOG_FORMATS: &'static [&'static str] = &["pretty", "json"];

    /// Validates the entire application configuration.
    ///
    /// Returns Ok(()) if valid, or Err with all validation errors found.
    pub fn validate(config: &AppConfig) -> Result<(), Vec<ConfigValidationError>> {
        let mut errors = Vec::new();

        Self::validate_server(config, &mut errors);
        Self::validate_database(config, &mut errors);
        Self::validate_cache(config, &mut errors);
        Self::validate_startup(config, &mut errors);
        Self::validate_observability(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_server(config: &AppConfig, errors: &mut Vec<ConfigValidationError>) {
        let server = &config.server;
        if server.port == 0 {
            errors.push(ConfigValidationError::InvalidPort {
                name: "server.port".to_string(),
                value: server.port,
            });
        }
        if server.request_timeout_secs == 0 {
            errors.push(ConfigValidationError::NonPositiveDuration {
                name: "server.request_timeout_secs".to_string(),
                value: 0,
            });
        }
    }

    fn validate_database(config: &AppConfig, errors: &mut Vec<ConfigValidationError>) {
        let db = &config.database;

        match Url::parse(&db.url) {
            Ok(url) if matches!(url.scheme(), "postgres" | "postgresql") => {}
            Ok(url) => errors.push(ConfigValidationError::InvalidUrl {
                url_type: "database".to_string(),
                message: format!("unsupported scheme '{}', expected postgres://", url.scheme()),
            }),
            Err(e) => errors.push(ConfigValidationError::InvalidUrl {
                url_type: "database".to_string(),
                message: e.to_string(),
            }),
        }

        if db.min_connections > db.max_connections {
            errors.push(ConfigValidationError::InvalidPoolSize {
                min: db.min_connections,
                max: db.max_connections,
            });
        }
        if db.max_connections == 0 || u64::from(db.max_connections) > Self::MAX_POOL_SIZE {
            errors.push(ConfigValidationError::PoolSizeOutOfRange {
                name: "database.max_connections".to_string(),
                value: u64::from(db.max_connections),
                maximum: Self::MAX_POOL_SIZE,
            });
        }
        if db.connect_timeout_secs == 0 {
            errors.push(ConfigValidationError::NonPositiveDuration {
                name: "database.connect_timeout_secs".to_string(),
                value: 0,
            });
        }
    }

    fn validate_cache(config: &AppConfig, errors: &mut Vec<ConfigValidationError>) {
        if config.cache.ttl_secs == 0 {
            errors.push(ConfigValidationError::NonPositiveDuration {
                name: "cache.ttl_secs".to_string(),
                value: 0,
            });
        }

        if config.cache.backend != crate::CacheBackend::Redis {
            return;
        }

        let redis = &config.redis;
        match Url::parse(&redis.url) {
            Ok(url) if matches!(url.scheme(), "redis" | "rediss") => {}
            Ok(url) => errors.push(ConfigValidationError::InvalidUrl {
                url_type: "redis".to_string(),
                message: format!("unsupported scheme '{}', expected redis://", url.scheme()),
            }),
            Err(e) => errors.push(ConfigValidationError::InvalidUrl {
                url_type: "redis".to_string(),
                message: e.to_string(),
            }),
        }
        let pool_size = redis.pool_size as u64;
        if pool_size == 0 || pool_size > Self::MAX_POOL_SIZE {
            errors.push(ConfigValidationError::PoolSizeOutOfRange {
                name: "redis.pool_size".to_string(),
                value: pool_size,
                maximum: Self::MAX_POOL_SIZE,
            });
        }
        if redis.timeout_ms == 0 {
            errors.push(ConfigValidationError::NonPositiveDuration {
                name: "redis.timeout_ms".to_string(),
                value: 0,
            });
        }
    }

    fn validate_startup(config: &AppConfig, errors: &mut Vec<ConfigValidationError>) {
        if config.startup.max_attempts == 0 {
            errors.push(ConfigValidationError::NoStartupAttempts);
        }
    }

    fn validate_observability(config: &AppConfig, errors: &mut Vec<ConfigValidationError>) {
        let obs = &config.observability;

        let level = obs.log_level.to_lowercase();
        if !Self::VALID_LOG_LEVELS.contains(&level.as_str()) {
            errors.push(ConfigValidationError::InvalidLogLevel {
                value: obs.log_level.clone(),
            });
        }

        let format = obs.log_format.to_lowercase();
        if !Self::VALID_LOG_FORMATS.contains(&format.as_str()) {
            errors.push(ConfigValidationError::InvalidLogFormat {
                value: obs.log_format.clone(),
            });
        }

        if obs.metrics_enabled && !obs.metrics_path.starts_with('/') {
            errors.push(ConfigValidationError::InvalidMetricsPath {
                value: obs.metrics_path.clone(),
            });
        }
    }
}
