//! Role catalog repository trait

use async_trait::async_trait;
use std::fmt::Debug;

use super::entity::{Role, RoleId, RoleName};
use crate::domain::DomainError;

/// Repository for the role catalog
#[async_trait]
pub trait RoleRepository: Send + Sync + Debug {
    /// Look up the role stored for a name
    async fn find_by_name(&self, name: RoleName) -> Result<Option<Role>, DomainError>;

    /// Get a role by ID
    async fn get_role(&self, id: RoleId) -> Result<Option<Role>, DomainError>;

    /// List the whole catalog
    async fn list_roles(&self) -> Result<Vec<Role>, DomainError>;

    /// Insert a row for each name that has none yet and return the catalog.
    ///
    /// Running it again is a no-op.
    async fn seed(&self, names: &[RoleName]) -> Result<Vec<Role>, DomainError>;
}
