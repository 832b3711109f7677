//! Identity service for user management, role grants and credential checks

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::role::{Role, RoleId, RoleName};
use crate::domain::user::{
    validate_email, validate_password, validate_user_fields, validate_username, NewUser, User,
    UserId,
};
use crate::domain::{
    AssignmentRepository, DomainError, IdentityStore, RoleRepository, UserRepository,
};

use super::password::PasswordHasher;

/// Well-formed Argon2id credential that no password matches. Verified against
/// when the username is unknown so both failure paths cost one hash.
const DUMMY_PASSWORD_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$Y0ea1poJCyWCd+yPum+ZQQ$0EuY9I6Pi8wVxq5awFCAHNbc/UKPtfnmXE4W54BzQPo";

/// Changes to apply to an existing user. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
}

/// Request for changing a user's password
#[derive(Debug, Clone)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Entry point for callers of the identity store
#[derive(Debug, Clone)]
pub struct IdentityService {
    store: Arc<dyn IdentityStore>,
    hasher: Arc<dyn PasswordHasher>,
}

impl IdentityService {
    /// Create a new identity service
    pub fn new(store: Arc<dyn IdentityStore>, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self { store, hasher }
    }

    // Identity store

    /// Create a user from an already hashed credential
    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, DomainError> {
        info!(username = %username, "Creating user");

        validate_user_fields(username, email, password_hash)?;

        // The store repeats both checks atomically with the insert
        if self.store.username_exists(username).await? {
            return Err(DomainError::duplicate_username(username));
        }

        if self.store.email_exists(email).await? {
            return Err(DomainError::duplicate_email(email));
        }

        let user = self
            .store
            .create(NewUser::new(username, email, password_hash))
            .await?;

        debug!(user_id = %user.id(), "User created");
        Ok(user)
    }

    /// Hash a plain password and create the user with it
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, DomainError> {
        validate_username(username)?;
        validate_email(email)?;
        validate_password(password)?;

        let password_hash = self.hasher.hash(password)?;
        self.create_user(username, email, &password_hash).await
    }

    pub async fn find_by_id(&self, id: UserId) -> Result<User, DomainError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("User '{}' not found", id)))
    }

    pub async fn find_by_username(&self, username: &str) -> Result<User, DomainError> {
        self.store
            .get_by_username(username)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("User '{}' not found", username)))
    }

    pub async fn find_by_email(&self, email: &str) -> Result<User, DomainError> {
        self.store
            .get_by_email(email)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("No user with email '{}'", email)))
    }

    pub async fn exists_by_username(&self, username: &str) -> Result<bool, DomainError> {
        self.store.username_exists(username).await
    }

    pub async fn exists_by_email(&self, email: &str) -> Result<bool, DomainError> {
        self.store.email_exists(email).await
    }

    /// Apply changes to a user, keeping username and email unique
    pub async fn update_user(
        &self,
        id: UserId,
        request: UpdateUserRequest,
    ) -> Result<User, DomainError> {
        info!(user_id = %id, "Updating user");

        let mut user = self.find_by_id(id).await?;

        if let Some(username) = request.username {
            validate_username(&username)?;
            user.set_username(username);
        }

        if let Some(email) = request.email {
            validate_email(&email)?;
            user.set_email(email);
        }

        if let Some(password_hash) = request.password_hash {
            validate_password(&password_hash)?;
            user.set_password_hash(password_hash);
        }

        self.store.update(&user).await
    }

    /// Delete a user and all of its role assignments
    pub async fn delete_user(&self, id: UserId) -> Result<bool, DomainError> {
        info!(user_id = %id, "Deleting user");
        self.store.delete(id).await
    }

    pub async fn list_users(&self) -> Result<Vec<User>, DomainError> {
        self.store.list().await
    }

    pub async fn count_users(&self) -> Result<usize, DomainError> {
        self.store.count().await
    }

    // Role catalog

    pub async fn find_role_by_name(&self, name: RoleName) -> Result<Role, DomainError> {
        self.store
            .find_by_name(name)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("Role '{}' not found", name)))
    }

    /// Resolve a requested role string to its stored row
    pub async fn resolve_role(&self, requested: &str) -> Result<Role, DomainError> {
        let name = requested
            .parse::<RoleName>()
            .map_err(|e| DomainError::unknown_role(e.to_string()))?;

        self.store
            .find_by_name(name)
            .await?
            .ok_or_else(|| DomainError::unknown_role(format!("Role '{}' is not seeded", name)))
    }

    pub async fn list_roles(&self) -> Result<Vec<Role>, DomainError> {
        self.store.list_roles().await
    }

    /// Make sure the catalog holds every role name
    pub async fn seed_roles(&self) -> Result<Vec<Role>, DomainError> {
        let roles = self.store.seed(&RoleName::ALL).await?;
        info!(count = roles.len(), "Role catalog seeded");
        Ok(roles)
    }

    // Assignment index

    /// Grant a role. Granting a role the user already holds is a no-op.
    pub async fn assign(&self, user_id: UserId, role_id: RoleId) -> Result<(), DomainError> {
        let added = self.store.assign(user_id, role_id).await?;

        if added {
            info!(user_id = %user_id, role_id = %role_id, "Role assigned");
        } else {
            debug!(user_id = %user_id, role_id = %role_id, "Role already held");
        }

        Ok(())
    }

    /// Grant a role identified by name
    pub async fn assign_by_name(&self, user_id: UserId, name: RoleName) -> Result<(), DomainError> {
        let role = self
            .store
            .find_by_name(name)
            .await?
            .ok_or_else(|| DomainError::unknown_role(format!("Role '{}' is not seeded", name)))?;

        self.assign(user_id, role.id()).await
    }

    /// Withdraw a role. Revoking a role the user does not hold is a no-op.
    pub async fn revoke(&self, user_id: UserId, role_id: RoleId) -> Result<(), DomainError> {
        let removed = self.store.revoke(user_id, role_id).await?;

        if removed {
            info!(user_id = %user_id, role_id = %role_id, "Role revoked");
        } else {
            debug!(user_id = %user_id, role_id = %role_id, "Role was not held");
        }

        Ok(())
    }

    pub async fn roles_of(&self, user_id: UserId) -> Result<HashSet<Role>, DomainError> {
        self.store.roles_of(user_id).await
    }

    pub async fn users_of(&self, role_id: RoleId) -> Result<Vec<User>, DomainError> {
        self.store.users_of(role_id).await
    }

    // Credentials

    /// Check a username/password pair.
    ///
    /// Returns `None` both for an unknown user and for a wrong password.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<User>, DomainError> {
        let Some(user) = self.store.get_by_username(username).await? else {
            let _ = self.hasher.verify(password, DUMMY_PASSWORD_HASH);
            debug!(username = %username, "Authentication failed: unknown user");
            return Ok(None);
        };

        if !self.hasher.verify(password, user.password_hash()) {
            warn!(user_id = %user.id(), "Authentication failed: wrong password");
            return Ok(None);
        }

        Ok(Some(user))
    }

    /// Replace a user's password after checking the current one
    pub async fn change_password(
        &self,
        id: UserId,
        request: ChangePasswordRequest,
    ) -> Result<User, DomainError> {
        let mut user = self.find_by_id(id).await?;

        if !self.hasher.verify(&request.current_password, user.password_hash()) {
            return Err(DomainError::invalid_field(
                "password",
                "Current password is incorrect",
            ));
        }

        validate_password(&request.new_password)?;

        let new_hash = self.hasher.hash(&request.new_password)?;
        user.set_password_hash(new_hash);

        info!(user_id = %id, "Password changed");
        self.store.update(&user).await
    }
}
