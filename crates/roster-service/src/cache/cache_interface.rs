//! Cache interface trait for abstracted caching operations.

use async_trait::async_trait;
use roster_core::Interface;
use std::time::Duration;
use thiserror::Error;

/// Failures a cache backend can report.
///
/// This type never crosses the service boundary: the user service logs it
/// and falls back to the store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// The backend could not be reached or rejected the command.
    #[error("Cache unavailable: {0}")]
    Unavailable(String),

    /// A stored value could not be encoded or decoded.
    #[error("Malformed cache entry for key '{key}': {message}")]
    Codec { key: String, message: String },
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Cache interface for storing and retrieving cached data.
///
/// Values are JSON strings so the trait stays dyn-compatible; use
/// [`CacheExt`] for typed access.
#[async_trait]
pub trait CacheInterface: Interface + Send + Sync {
    /// Gets a raw JSON value. Returns `None` if the key is absent or expired.
    async fn get_raw(&self, key: &str) -> CacheResult<Option<String>>;

    /// Stores a raw JSON value, replacing any previous value, for `ttl`.
    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()>;

    /// Removes a key. Deleting an absent key succeeds.
    async fn delete(&self, key: &str) -> CacheResult<()>;

    /// Short backend name for logs and readiness output.
    fn backend_name(&self) -> &'static str;
}

/// Extension trait with typed methods for convenience.
#[async_trait]
pub trait CacheExt: CacheInterface {
    /// Gets a typed value. A value that does not decode is a [`CacheError::Codec`].
    async fn get<T>(&self, key: &str) -> CacheResult<Option<T>>
    where
        T: serde::de::DeserializeOwned + Send,
    {
        match self.get_raw(key).await? {
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|e| CacheError::Codec {
                    key: key.to_string(),
                    message: e.to_string(),
                }),
            None => Ok(None),
        }
    }

    /// Sets a typed value.
    async fn set<T: serde::Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> CacheResult<()> {
        let json = serde_json::to_string(value).map_err(|e| CacheError::Codec {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        self.set_raw(key, &json, ttl).await
    }
}

// Blanket implementation for all CacheInterface implementations
impl<T: CacheInterface + ?Sized> CacheExt for T {}
