//! User-related DTOs.

use roster_core::{User, UserId};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Request to create a new user.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    #[schema(example = "Ada Lovelace")]
    pub name: String,

    #[validate(email(message = "Invalid email address"))]
    #[schema(example = "ada@example.com")]
    pub email: String,
}

/// User response DTO.
///
/// This is also the shape stored in the cache, under both `user:{id}` and
/// inside the `users:all` listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
        }
    }
}
