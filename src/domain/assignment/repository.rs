//! Assignment repository trait

use std::collections::HashSet;

use async_trait::async_trait;

use crate::domain::role::{Role, RoleId};
use crate::domain::user::{User, UserId};
use crate::domain::DomainError;

/// Repository for user/role links
///
/// `assign` and `revoke` check that both ends exist in the same atomic step
/// that writes the link. Returned sets carry no ordering.
#[async_trait]
pub trait AssignmentRepository: Send + Sync + std::fmt::Debug {
    /// Link a user to a role. Returns `false` if the link already existed.
    ///
    /// Fails with `UnknownUser` or `UnknownRole`.
    async fn assign(&self, user_id: UserId, role_id: RoleId) -> Result<bool, DomainError>;

    /// Remove a link. Returns `false` if there was nothing to remove.
    ///
    /// Fails with `UnknownUser` or `UnknownRole`.
    async fn revoke(&self, user_id: UserId, role_id: RoleId) -> Result<bool, DomainError>;

    /// Roles held by a user. Fails with `UnknownUser`.
    async fn roles_of(&self, user_id: UserId) -> Result<HashSet<Role>, DomainError>;

    /// Users holding a role. Fails with `UnknownRole`.
    async fn users_of(&self, role_id: RoleId) -> Result<Vec<User>, DomainError>;
}
