//! Redis-based cache implementation.

use super::{CacheError, CacheInterface, CacheResult};
use async_trait::async_trait;
use deadpool_redis::{redis::AsyncCommands, Config, Pool, PoolConfig, Runtime, Timeouts};
use roster_config::RedisConfig;
use roster_core::{HealthCheck, HealthStatus};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Command timeout used when a pool is handed in directly.
const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_millis(250);

/// Redis-based cache service.
///
/// Built without a pool (see [`RedisCacheService::disabled`]) it behaves as
/// a cache that never holds anything.
pub struct RedisCacheService {
    /// Redis connection pool.
    pool: Option<Arc<Pool>>,
    /// Upper bound on one command, connection checkout included.
    command_timeout: Duration,
}

impl RedisCacheService {
    /// Create a new Redis cache service.
    #[must_use]
    pub fn new(pool: Arc<Pool>) -> Self {
        Self {
            pool: Some(pool),
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    /// Builds a pool from configuration.
    ///
    /// No connection is opened here, so an unreachable Redis does not stop
    /// startup; commands fail later with [`CacheError::Unavailable`]. A server
    /// that accepts connections but stops answering fails the same way once
    /// `timeout_ms` has passed.
    pub fn connect(config: &RedisConfig) -> CacheResult<Self> {
        let timeout = config.timeout();
        let mut pool_config = PoolConfig::new(config.pool_size);
        pool_config.timeouts = Timeouts {
            wait: Some(timeout),
            create: Some(timeout),
            recycle: Some(timeout),
        };

        let mut cfg = Config::from_url(config.url.clone());
        cfg.pool = Some(pool_config);

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| CacheError::Unavailable(format!("Failed to create Redis pool: {}", e)))?;

        info!("Redis cache pool created (max size {})", config.pool_size);
        Ok(Self {
            pool: Some(Arc::new(pool)),
            command_timeout: timeout,
        })
    }

    /// Create a no-op cache service (for when caching is disabled).
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            pool: None,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    /// Check if caching is enabled.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.pool.is_some()
    }

    /// Sends `PING` and expects `PONG`.
    pub async fn ping(&self) -> CacheResult<()> {
        if self.pool.is_none() {
            return Ok(());
        }

        let pong: String = self
            .bounded("PING", async {
                let mut conn = self.get_conn().await?;
                deadpool_redis::redis::cmd("PING")
                    .query_async(&mut conn)
                    .await
                    .map_err(|e| CacheError::Unavailable(format!("PING failed: {}", e)))
            })
            .await?;

        if pong == "PONG" {
            Ok(())
        } else {
            Err(CacheError::Unavailable(format!("Unexpected PING reply: {}", pong)))
        }
    }

    /// Closes the pool. Later commands fail as unavailable.
    pub fn close(&self) {
        if let Some(pool) = &self.pool {
            info!("Closing Redis connection pool...");
            pool.close();
        }
    }

    /// Get a connection from the pool.
    async fn get_conn(&self) -> CacheResult<deadpool_redis::Connection> {
        match &self.pool {
            Some(pool) => pool.get().await.map_err(|e| {
                CacheError::Unavailable(format!("Failed to get Redis connection: {}", e))
            }),
            None => Err(CacheError::Unavailable("Cache is disabled".to_string())),
        }
    }

    /// Runs one command under `command_timeout`.
    async fn bounded<T>(
        &self,
        command: &str,
        fut: impl Future<Output = CacheResult<T>>,
    ) -> CacheResult<T> {
        tokio::time::timeout(self.command_timeout, fut)
            .await
            .unwrap_or_else(|_| {
                Err(CacheError::Unavailable(format!(
                    "{} timed out after {}ms",
                    command,
                    self.command_timeout.as_millis()
                )))
            })
    }
}

/// Whole seconds for `SET EX`, rounded up and never zero.
fn ttl_seconds(ttl: Duration) -> u64 {
    let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
    secs.max(1)
}

#[async_trait]
impl CacheInterface for RedisCacheService {
    async fn get_raw(&self, key: &str) -> CacheResult<Option<String>> {
        if !self.is_enabled() {
            return Ok(None);
        }

        self.bounded("GET", async {
            let mut conn = self.get_conn().await?;
            conn.get(key).await.map_err(|e| {
                CacheError::Unavailable(format!("Failed to get key '{}': {}", key, e))
            })
        })
        .await
    }

    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        if !self.is_enabled() {
            return Ok(());
        }

        let ttl_secs = ttl_seconds(ttl);
        self.bounded("SET", async {
            let mut conn = self.get_conn().await?;
            conn.set_ex::<_, _, ()>(key, value, ttl_secs).await.map_err(|e| {
                CacheError::Unavailable(format!("Failed to set key '{}': {}", key, e))
            })
        })
        .await?;

        debug!("Cached key '{}' with TTL {}s", key, ttl_secs);
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        if !self.is_enabled() {
            return Ok(());
        }

        let deleted: i64 = self
            .bounded("DEL", async {
                let mut conn = self.get_conn().await?;
                conn.del(key).await.map_err(|e| {
                    CacheError::Unavailable(format!("Failed to delete key '{}': {}", key, e))
                })
            })
            .await?;

        debug!("Deleted key '{}': {}", key, deleted > 0);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        if self.is_enabled() {
            "redis"
        } else {
            "disabled"
        }
    }
}

#[async_trait]
impl HealthCheck for RedisCacheService {
    fn name(&self) -> &str {
        "cache"
    }

    fn critical(&self) -> bool {
        false
    }

    async fn check(&self) -> HealthStatus {
        match self.ping().await {
            Ok(()) => HealthStatus::Healthy,
            Err(e) => HealthStatus::Degraded(e.to_string()),
        }
    }
}

impl std::fmt::Debug for RedisCacheService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCacheService")
            .field("enabled", &self.is_enabled())
            .field("command_timeout", &self.command_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{UserService, UserServiceImpl};
    use roster_core::UserId;
    use roster_repository::InMemoryUserRepository;
    use std::time::Instant;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const TTL: Duration = Duration::from_secs(60);

    fn unreachable_config() -> RedisConfig {
        RedisConfig {
            url: "redis://127.0.0.1:1".to_string(),
            pool_size: 1,
            timeout_ms: 200,
        }
    }

    /// Starts a server that completes the connection handshake with `+OK`
    /// but never answers data commands.
    async fn spawn_silent_redis() -> RedisConfig {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 4096];
                    loop {
                        let n = match socket.read(&mut buf).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => n,
                        };
                        let chunk = String::from_utf8_lossy(&buf[..n]).to_ascii_uppercase();
                        if !chunk.contains("CLIENT") && !chunk.contains("HELLO") {
                            continue;
                        }
                        let commands = chunk.split("\r\n").filter(|l| l.starts_with('*')).count();
                        let reply = "+OK\r\n".repeat(commands);
                        if socket.write_all(reply.as_bytes()).await.is_err() {
                            return;
                        }
                    }
                });
            }
        });

        RedisConfig {
            url: format!("redis://{}", addr),
            pool_size: 1,
            timeout_ms: 200,
        }
    }

    #[test]
    fn test_ttl_seconds_rounds_up() {
        assert_eq!(ttl_seconds(Duration::from_secs(60)), 60);
        assert_eq!(ttl_seconds(Duration::from_millis(1900)), 2);
        assert_eq!(ttl_seconds(Duration::from_millis(1001)), 2);
        assert_eq!(ttl_seconds(Duration::from_millis(300)), 1);
        assert_eq!(ttl_seconds(Duration::ZERO), 1);
    }

    #[tokio::test]
    async fn test_disabled_cache_misses_and_accepts_writes() {
        let cache = RedisCacheService::disabled();
        assert!(!cache.is_enabled());
        assert_eq!(cache.backend_name(), "disabled");

        cache.set_raw("user:1", "{}", TTL).await.unwrap();
        assert_eq!(cache.get_raw("user:1").await.unwrap(), None);
        cache.delete("user:1").await.unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_redis_reports_unavailable() {
        let cache = RedisCacheService::connect(&unreachable_config()).unwrap();
        assert!(cache.is_enabled());

        let result = cache.get_raw("user:1").await;
        assert!(matches!(result, Err(CacheError::Unavailable(_))));

        let result = cache.set_raw("user:1", "{}", TTL).await;
        assert!(matches!(result, Err(CacheError::Unavailable(_))));

        let result = cache.delete("users:all").await;
        assert!(matches!(result, Err(CacheError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_unreachable_redis_is_degraded_not_critical() {
        let cache = RedisCacheService::connect(&unreachable_config()).unwrap();
        assert!(!cache.critical());
        assert!(matches!(cache.check().await, HealthStatus::Degraded(_)));
    }

    #[tokio::test]
    async fn test_silent_redis_commands_time_out_as_unavailable() {
        let cache = RedisCacheService::connect(&spawn_silent_redis().await).unwrap();

        let start = Instant::now();
        let get = cache.get_raw("user:1").await;
        let set = cache.set_raw("user:1", "{}", TTL).await;
        let del = cache.delete("users:all").await;

        assert!(matches!(get, Err(CacheError::Unavailable(_))));
        assert!(matches!(set, Err(CacheError::Unavailable(_))));
        assert!(matches!(del, Err(CacheError::Unavailable(_))));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_silent_redis_reads_fall_back_to_store() {
        let cache = Arc::new(RedisCacheService::connect(&spawn_silent_redis().await).unwrap());
        let repo = Arc::new(InMemoryUserRepository::with_users(&[("Ada", "ada@example.com")]));
        let service = UserServiceImpl::new(repo.clone(), cache, TTL);

        let user = tokio::time::timeout(Duration::from_secs(5), service.get_user(UserId::new(1)))
            .await
            .expect("read blocked on an unresponsive cache")
            .unwrap();

        assert_eq!(user.name, "Ada");
        assert_eq!(repo.find_by_id_calls(), 1);
    }
}
