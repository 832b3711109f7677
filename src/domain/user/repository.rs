//! User repository trait

use async_trait::async_trait;
use std::fmt::Debug;

use super::entity::{NewUser, User, UserId};
use crate::domain::DomainError;

/// Repository trait for user storage
///
/// Implementations must perform the uniqueness check and the write of
/// `create`/`update` atomically: a concurrent caller can never slip a
/// conflicting username or email in between.
#[async_trait]
pub trait UserRepository: Send + Sync + Debug {
    /// Get a user by their ID
    async fn get(&self, id: UserId) -> Result<Option<User>, DomainError>;

    /// Get a user by their username (exact match)
    async fn get_by_username(&self, username: &str) -> Result<Option<User>, DomainError>;

    /// Get a user by their email (exact match)
    async fn get_by_email(&self, email: &str) -> Result<Option<User>, DomainError>;

    /// Store a new user and assign its ID.
    ///
    /// Fails with `DuplicateUsername` or `DuplicateEmail`; username is checked
    /// first.
    async fn create(&self, user: NewUser) -> Result<User, DomainError>;

    /// Update an existing user, keeping username and email unique
    async fn update(&self, user: &User) -> Result<User, DomainError>;

    /// Delete a user along with its role assignments
    async fn delete(&self, id: UserId) -> Result<bool, DomainError>;

    /// List all users
    async fn list(&self) -> Result<Vec<User>, DomainError>;

    /// Count users
    async fn count(&self) -> Result<usize, DomainError>;

    /// Check if a user ID exists
    async fn exists(&self, id: UserId) -> Result<bool, DomainError> {
        Ok(self.get(id).await?.is_some())
    }

    /// Check if a username exists
    async fn username_exists(&self, username: &str) -> Result<bool, DomainError> {
        Ok(self.get_by_username(username).await?.is_some())
    }

    /// Check if an email exists
    async fn email_exists(&self, email: &str) -> Result<bool, DomainError> {
        Ok(self.get_by_email(email).await?.is_some())
    }
}
