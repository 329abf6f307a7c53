//! User entity.

use crate::UserId;
use serde::{Deserialize, Serialize};

/// A user as stored in the entity store.
///
/// The store owns this entity; other layers only ask for it to be created
/// or retrieved, never mutate it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Store-assigned identifier.
    pub id: UserId,

    /// Display name.
    pub name: String,

    /// Email address, unique across all users.
    pub email: String,
}

impl User {
    /// Creates a user value for an already-assigned id.
    #[must_use]
    pub fn new(id: UserId, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            email: email.into(),
        }
    }
}
