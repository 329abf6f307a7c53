//! Application wiring.

use crate::{startup, telemetry};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use roster_config::{AppConfig, CacheBackend};
use roster_core::{HealthCheck, RosterError, RosterResult};
use roster_repository::{
    DatabasePool, DatabasePoolInterface, PostgresUserRepository, UserRepository,
};
use roster_rest::{create_router, AppState};
use roster_service::{
    CacheInterface, InMemoryCache, RedisCacheService, UserService, UserServiceImpl,
};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// The selected cache backend, viewed as a cache and as a health check.
#[derive(Clone)]
pub struct CacheBackendHandle {
    pub cache: Arc<dyn CacheInterface>,
    pub health: Arc<dyn HealthCheck>,
    redis: Option<Arc<RedisCacheService>>,
}

impl CacheBackendHandle {
    /// Closes the Redis pool, if any.
    pub fn close(&self) {
        if let Some(redis) = &self.redis {
            redis.close();
        }
    }
}

/// Builds the cache backend named by `cache.backend`.
pub fn build_cache(config: &AppConfig) -> RosterResult<CacheBackendHandle> {
    let handle = match config.cache.backend {
        CacheBackend::Redis => {
            let redis = Arc::new(
                RedisCacheService::connect(&config.redis)
                    .map_err(|e| RosterError::Configuration(e.to_string()))?,
            );
            CacheBackendHandle {
                cache: redis.clone(),
                health: redis.clone(),
                redis: Some(redis),
            }
        }
        CacheBackend::Memory => {
            let memory = Arc::new(InMemoryCache::new());
            CacheBackendHandle {
                cache: memory.clone(),
                health: memory,
                redis: None,
            }
        }
        CacheBackend::Disabled => {
            let disabled = Arc::new(RedisCacheService::disabled());
            CacheBackendHandle {
                cache: disabled.clone(),
                health: disabled,
                redis: None,
            }
        }
    };

    info!(
        "Cache backend: {} (TTL {}s)",
        handle.cache.backend_name(),
        config.cache.ttl_secs
    );
    Ok(handle)
}

/// Builds the HTTP router around a repository and cache.
///
/// `health_checks` are probed by `/ready` alongside the cache.
pub fn build_router(
    config: &AppConfig,
    user_repository: Arc<dyn UserRepository>,
    cache: &CacheBackendHandle,
    mut health_checks: Vec<Arc<dyn HealthCheck>>,
    metrics: Option<PrometheusHandle>,
) -> Router {
    let user_service: Arc<dyn UserService> = Arc::new(UserServiceImpl::new(
        user_repository,
        cache.cache.clone(),
        config.cache.ttl(),
    ));
    health_checks.push(cache.health.clone());

    let router = create_router(
        AppState::new(user_service, health_checks),
        &config.server,
        &config.app,
    );

    match metrics {
        Some(handle) => router.merge(telemetry::metrics_router(
            &config.observability.metrics_path,
            handle,
        )),
        None => router,
    }
}

/// A fully wired server, ready to accept connections.
pub struct Application {
    db_pool: Arc<dyn DatabasePoolInterface>,
    cache: CacheBackendHandle,
    router: Router,
}

impl Application {
    /// Connects to the database (with retries), applies migrations, selects
    /// the cache backend and builds the router.
    pub async fn build(
        config: &AppConfig,
        metrics: Option<PrometheusHandle>,
    ) -> RosterResult<Self> {
        let db_pool: Arc<DatabasePool> = Arc::new(startup::wait_for_database(config).await?);

        if config.database.run_migrations {
            db_pool.run_migrations().await?;
        }

        let cache = build_cache(config)?;
        let user_repository: Arc<dyn UserRepository> =
            Arc::new(PostgresUserRepository::new(db_pool.clone()));
        let db_health: Arc<dyn HealthCheck> = db_pool.clone();
        let router = build_router(config, user_repository, &cache, vec![db_health], metrics);

        Ok(Self {
            db_pool,
            cache,
            router,
        })
    }

    /// Returns a clone of the router.
    #[must_use]
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serves until `shutdown` resolves, then closes both pools.
    ///
    /// The pools are closed whether serving ended cleanly or with an error.
    pub async fn run_until_stopped<F>(
        self,
        listener: TcpListener,
        shutdown: F,
    ) -> RosterResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let served = axum::serve(listener, self.router.clone())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| RosterError::Internal(format!("REST server error: {}", e)));

        self.close().await;
        info!("Server shutdown complete");
        served
    }

    /// Releases the database and cache pools.
    async fn close(&self) {
        self.db_pool.close().await;
        self.cache.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use async_trait::async_trait;
    use http_body_util::BodyExt;
    use roster_repository::InMemoryUserRepository;
    use serde_json::{json, Value};
    use sqlx::postgres::{PgPool, PgPoolOptions};
    use std::sync::atomic::{AtomicBool, Ordering};
    use tower::ServiceExt;

    /// Pool that never connects and remembers being closed.
    struct RecordingPool {
        pool: PgPool,
        closed: AtomicBool,
    }

    impl RecordingPool {
        fn new() -> Self {
            let pool = PgPoolOptions::new()
                .connect_lazy("postgres://u:p@127.0.0.1:1/db")
                .unwrap();
            Self {
                pool,
                closed: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl DatabasePoolInterface for RecordingPool {
        fn inner(&self) -> &PgPool {
            &self.pool
        }

        async fn health_check(&self) -> RosterResult<()> {
            Ok(())
        }

        async fn run_migrations(&self) -> RosterResult<()> {
            Ok(())
        }

        async fn close(&self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    fn config_with(backend: CacheBackend) -> AppConfig {
        let mut config = AppConfig::default();
        config.cache.backend = backend;
        config.redis.url = "redis://127.0.0.1:1".to_string();
        config.redis.timeout_ms = 100;
        config
    }

    async fn call(
        router: &Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
            .unwrap();
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[test]
    fn test_build_cache_selects_backend() {
        let memory = build_cache(&config_with(CacheBackend::Memory)).unwrap();
        assert_eq!(memory.cache.backend_name(), "memory");

        let disabled = build_cache(&config_with(CacheBackend::Disabled)).unwrap();
        assert_eq!(disabled.cache.backend_name(), "disabled");
    }

    #[tokio::test]
    async fn test_build_cache_does_not_require_reachable_redis() {
        let redis = build_cache(&config_with(CacheBackend::Redis)).unwrap();
        assert_eq!(redis.cache.backend_name(), "redis");
        redis.close();
    }

    #[tokio::test]
    async fn test_requests_succeed_with_unreachable_redis() {
        let config = config_with(CacheBackend::Redis);
        let cache = build_cache(&config).unwrap();
        let repo = Arc::new(InMemoryUserRepository::new());
        let router = build_router(&config, repo.clone(), &cache, Vec::new(), None);

        let (status, _) = call(
            &router,
            "POST",
            "/users",
            Some(json!({"name": "Ada", "email": "ada@example.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = call(&router, "GET", "/users/1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["name"], json!("Ada"));

        let (status, body) = call(&router, "GET", "/ready", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["checks"]["cache"], json!("degraded"));
    }

    #[tokio::test]
    async fn test_memory_backend_serves_repeat_reads_from_cache() {
        let config = config_with(CacheBackend::Memory);
        let cache = build_cache(&config).unwrap();
        let repo = Arc::new(InMemoryUserRepository::with_users(&[("Ada", "ada@example.com")]));
        let router = build_router(&config, repo.clone(), &cache, Vec::new(), None);

        for _ in 0..3 {
            let (status, body) = call(&router, "GET", "/users", None).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["data"].as_array().map(Vec::len), Some(1));
        }
        assert_eq!(repo.find_all_calls(), 1);
    }

    #[tokio::test]
    async fn test_swagger_document_is_served() {
        let config = config_with(CacheBackend::Disabled);
        let cache = build_cache(&config).unwrap();
        let repo = Arc::new(InMemoryUserRepository::new());
        let router = build_router(&config, repo, &cache, Vec::new(), None);

        let (status, body) = call(&router, "GET", "/api-docs/openapi.json", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["info"]["title"], json!("My Company API"));
    }

    #[tokio::test]
    async fn test_run_until_stopped_releases_pools() {
        let config = config_with(CacheBackend::Redis);
        let cache = build_cache(&config).unwrap();
        let repo = Arc::new(InMemoryUserRepository::new());
        let router = build_router(&config, repo, &cache, Vec::new(), None);
        let db_pool = Arc::new(RecordingPool::new());

        let app = Application {
            db_pool: db_pool.clone(),
            cache: cache.clone(),
            router,
        };
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();

        app.run_until_stopped(listener, async {}).await.unwrap();

        assert!(db_pool.closed.load(Ordering::SeqCst));
        match cache.cache.get_raw("user:1").await {
            Err(e) => assert!(e.to_string().to_lowercase().contains("closed"), "got {}", e),
            Ok(_) => panic!("Expected a closed Redis pool"),
        }
    }
}
