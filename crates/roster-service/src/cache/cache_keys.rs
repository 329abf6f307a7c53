//! Cache key generators for consistent key naming.

use roster_core::UserId;

/// Key holding the full, id-ordered user listing.
pub const USERS_ALL: &str = "users:all";

/// Generate a cache key for a user by ID.
#[must_use]
pub fn user_by_id(id: UserId) -> String {
    format!("user:{}", id)
}
