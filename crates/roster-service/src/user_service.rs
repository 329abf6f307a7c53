//! User service trait definition.

use crate::dto::{CreateUserRequest, UserResponse};
use async_trait::async_trait;
use roster_core::{Interface, RosterResult, UserId};

/// User service trait.
#[async_trait]
pub trait UserService: Interface + Send + Sync {
    /// Creates a user. A duplicate email is [`roster_core::RosterError::Conflict`].
    async fn create_user(&self, request: CreateUserRequest) -> RosterResult<UserResponse>;

    /// Gets a user by ID.
    async fn get_user(&self, id: UserId) -> RosterResult<UserResponse>;

    /// Lists every user in ascending id order.
    async fn list_users(&self) -> RosterResult<Vec<UserResponse>>;
}
