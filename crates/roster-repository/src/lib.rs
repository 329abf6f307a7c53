//! # Roster Repository
//!
//! Entity store adapter. The store is the single source of truth for users
//! and the only arbiter of email uniqueness.
//!
//! ```text
//! Service
//!   ↓  Arc<dyn UserRepository>
//! PostgresUserRepository
//!   ↓  Arc<dyn DatabasePoolInterface>
//! DatabasePool (SQLx PgPool)
//!   ↓
//! PostgreSQL
//! ```

#[cfg(any(test, feature = "test-utils"))]
pub mod memory;
pub mod pool;
pub mod postgres;
pub mod traits;

#[cfg(any(test, feature = "test-utils"))]
pub use memory::InMemoryUserRepository;
pub use pool::*;
pub use postgres::*;
pub use traits::*;
