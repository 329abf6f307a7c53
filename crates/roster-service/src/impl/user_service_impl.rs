//! Cache-aside user service.

use crate::cache::metrics::CacheMetrics;
use crate::cache::{cache_keys, CacheError, CacheExt, CacheInterface};
use crate::dto::{CreateUserRequest, UserResponse};
use crate::user_service::UserService;
use async_trait::async_trait;
use roster_core::{RosterError, RosterResult, UserId};
use roster_repository::UserRepository;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const USER_FAMILY: &str = "user";
const USERS_FAMILY: &str = "users";

/// User service that fronts the repository with a cache.
///
/// The repository is the source of truth. Cached values may lag behind it
/// by at most the TTL, and a create is visible through both `get_user` and
/// `list_users` as soon as it returns, provided the cache accepted the
/// writes. Every cache failure is swallowed here; every repository failure
/// propagates.
pub struct UserServiceImpl {
    user_repository: Arc<dyn UserRepository>,
    cache: Arc<dyn CacheInterface>,
    ttl: Duration,
}

impl UserServiceImpl {
    /// Creates a new user service.
    #[must_use]
    pub fn new(
        user_repository: Arc<dyn UserRepository>,
        cache: Arc<dyn CacheInterface>,
        ttl: Duration,
    ) -> Self {
        Self {
            user_repository,
            cache,
            ttl,
        }
    }

    /// Reads `key` from the cache. Any failure counts as a miss.
    async fn lookup<T>(&self, key: &str, family: &'static str) -> Option<T>
    where
        T: DeserializeOwned + Send,
    {
        match self.cache.get::<T>(key).await {
            Ok(Some(value)) => {
                debug!("Cache hit for key '{}'", key);
                CacheMetrics::hit(family);
                Some(value)
            }
            Ok(None) => {
                debug!("Cache miss for key '{}'", key);
                CacheMetrics::miss(family);
                None
            }
            Err(e @ CacheError::Codec { .. }) => {
                warn!(key, error = %e, "Discarding malformed cache entry");
                CacheMetrics::error("decode");
                CacheMetrics::miss(family);
                None
            }
            Err(e) => {
                warn!(key, error = %e, "Cache read failed, falling back to store");
                CacheMetrics::error("get");
                CacheMetrics::miss(family);
                None
            }
        }
    }

    /// Writes `value` under `key` with the configured TTL, best-effort.
    async fn seed<T: Serialize + Send + Sync>(&self, key: &str, value: &T) {
        match self.cache.set(key, value, self.ttl).await {
            Ok(()) => {
                debug!("Seeded cache key '{}'", key);
                CacheMetrics::write("set");
            }
            Err(e) => {
                warn!(key, error = %e, "Cache write failed");
                CacheMetrics::error("set");
            }
        }
    }

    /// Deletes `key`, best-effort.
    async fn invalidate(&self, key: &str) {
        match self.cache.delete(key).await {
            Ok(()) => {
                debug!("Invalidated cache key '{}'", key);
                CacheMetrics::write("delete");
            }
            Err(e) => {
                warn!(key, error = %e, "Cache invalidation failed");
                CacheMetrics::error("delete");
            }
        }
    }
}

#[async_trait]
impl UserService for UserServiceImpl {
    async fn create_user(&self, request: CreateUserRequest) -> RosterResult<UserResponse> {
        debug!("Creating user with email: {}", request.email);

        let user = self
            .user_repository
            .insert(&request.name, &request.email)
            .await
            .map_err(|e| {
                if e.is_conflict() {
                    info!("Rejected duplicate email: {}", request.email);
                }
                e
            })?;
        let response = UserResponse::from(user);

        // Independent: a failed seed must not skip the eviction.
        self.seed(&cache_keys::user_by_id(response.id), &response).await;
        self.invalidate(cache_keys::USERS_ALL).await;

        info!("User created: {}", response.id);
        Ok(response)
    }

    async fn get_user(&self, id: UserId) -> RosterResult<UserResponse> {
        debug!("Getting user: {}", id);

        let cache_key = cache_keys::user_by_id(id);
        if let Some(cached) = self.lookup::<UserResponse>(&cache_key, USER_FAMILY).await {
            return Ok(cached);
        }

        let user = self
            .user_repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| RosterError::not_found("User", id))?;
        let response = UserResponse::from(user);

        self.seed(&cache_key, &response).await;
        Ok(response)
    }

    async fn list_users(&self) -> RosterResult<Vec<UserResponse>> {
        debug!("Listing users");

        if let Some(cached) = self
            .lookup::<Vec<UserResponse>>(cache_keys::USERS_ALL, USERS_FAMILY)
            .await
        {
            return Ok(cached);
        }

        let users: Vec<UserResponse> = self
            .user_repository
            .find_all_ordered()
            .await?
            .into_iter()
            .map(UserResponse::from)
            .collect();

        self.seed(cache_keys::USERS_ALL, &users).await;
        Ok(users)
    }
}

impl std::fmt::Debug for UserServiceImpl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserServiceImpl")
            .field("cache", &self.cache.backend_name())
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
