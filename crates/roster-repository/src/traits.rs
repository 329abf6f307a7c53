//! Repository trait definitions.

use async_trait::async_trait;
use roster_core::{Interface, RosterResult, User, UserId};

/// User repository trait.
///
/// Implementations must make `insert` atomic with respect to the email
/// uniqueness check: of two concurrent inserts with the same email exactly
/// one succeeds and the other returns [`roster_core::RosterError::Conflict`].
#[async_trait]
pub trait UserRepository: Interface + Send + Sync {
    /// Inserts a new user and returns it with its store-assigned id.
    async fn insert(&self, name: &str, email: &str) -> RosterResult<User>;

    /// Finds a user by ID.
    async fn find_by_id(&self, id: UserId) -> RosterResult<Option<User>>;

    /// Returns every user ordered by id ascending.
    async fn find_all_ordered(&self) -> RosterResult<Vec<User>>;
}
