//! Caching infrastructure for the service layer.
//!
//! [`CacheInterface`] is the narrow get/set/delete contract the user service
//! depends on. Three backends implement it: [`RedisCacheService`] for shared
//! deployments, [`InMemoryCache`] for single-process runs and tests, and
//! [`RedisCacheService::disabled`] when caching is switched off.

mod cache_interface;
pub mod cache_keys;
mod memory_cache;
pub mod metrics;
mod redis_cache;

pub use cache_interface::{CacheError, CacheExt, CacheInterface, CacheResult};
pub use memory_cache::InMemoryCache;
pub use redis_cache::RedisCacheService;
