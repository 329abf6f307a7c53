//! # Roster Service
//!
//! Cache-aside user service for Roster.
//!
//! [`UserServiceImpl`] keeps the durable store authoritative and treats the
//! cache as a disposable accelerator: reads try the cache first, writes go
//! to the store and then refresh or evict the affected keys. Cache failures
//! are logged and counted but never reach the caller.

pub mod cache;
pub mod dto;
pub mod r#impl;
pub mod user_service;

pub use cache::*;
pub use dto::*;
pub use r#impl::UserServiceImpl;
pub use user_service::*;
