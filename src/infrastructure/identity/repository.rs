//! In-memory identity store implementation

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::assignment::AssignmentRepository;
use crate::domain::role::{Role, RoleId, RoleName, RoleRepository};
use crate::domain::user::{NewUser, User, UserId, UserRepository};
use crate::domain::DomainError;

/// All tables of the store. Kept behind one lock so every mutation sees a
/// consistent view of users, roles and links.
#[derive(Debug, Default)]
struct Tables {
    users: HashMap<UserId, User>,
    /// Index for username -> user ID lookup
    username_index: HashMap<String, UserId>,
    /// Index for email -> user ID lookup
    email_index: HashMap<String, UserId>,
    roles: HashMap<RoleId, Role>,
    role_index: HashMap<RoleName, RoleId>,
    /// Join index, user side
    roles_by_user: HashMap<UserId, HashSet<RoleId>>,
    /// Join index, role side
    users_by_role: HashMap<RoleId, HashSet<UserId>>,
    last_user_id: i64,
    last_role_id: i32,
}

impl Tables {
    fn insert_user(&mut self, fields: NewUser) -> Result<User, DomainError> {
        if self.username_index.contains_key(&fields.username) {
            return Err(DomainError::duplicate_username(fields.username));
        }

        if self.email_index.contains_key(&fields.email) {
            return Err(DomainError::duplicate_email(fields.email));
        }

        self.last_user_id += 1;
        let user = User::new(UserId::new(self.last_user_id), fields);

        self.username_index
            .insert(user.username().to_string(), user.id());
        self.email_index.insert(user.email().to_string(), user.id());
        self.users.insert(user.id(), user.clone());

        Ok(user)
    }

    fn insert_role(&mut self, name: RoleName) -> Role {
        if let Some(role) = self.role_index.get(&name).and_then(|id| self.roles.get(id)) {
            return *role;
        }

        self.last_role_id += 1;
        let role = Role::new(RoleId::new(self.last_role_id), name);

        self.role_index.insert(name, role.id());
        self.roles.insert(role.id(), role);

        role
    }

    fn check_link_ends(&self, user_id: UserId, role_id: RoleId) -> Result<(), DomainError> {
        if !self.users.contains_key(&user_id) {
            return Err(DomainError::unknown_user(format!("User '{}' not found", user_id)));
        }

        if !self.roles.contains_key(&role_id) {
            return Err(DomainError::unknown_role(format!("Role '{}' not found", role_id)));
        }

        Ok(())
    }
}

/// In-memory implementation of the user, role and assignment repositories
#[derive(Debug, Clone, Default)]
pub struct InMemoryIdentityStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryIdentityStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with the whole role catalog already seeded
    pub fn with_roles() -> Self {
        let mut tables = Tables::default();

        for name in RoleName::ALL {
            tables.insert_role(name);
        }

        Self {
            tables: Arc::new(RwLock::new(tables)),
        }
    }
}

#[async_trait]
impl UserRepository for InMemoryIdentityStore {
    async fn get(&self, id: UserId) -> Result<Option<User>, DomainError> {
        let tables = self.tables.read().await;
        Ok(tables.users.get(&id).cloned())
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>, DomainError> {
        let tables = self.tables.read().await;

        Ok(tables
            .username_index
            .get(username)
            .and_then(|id| tables.users.get(id))
            .cloned())
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        let tables = self.tables.read().await;

        Ok(tables
            .email_index
            .get(email)
            .and_then(|id| tables.users.get(id))
            .cloned())
    }

    async fn create(&self, user: NewUser) -> Result<User, DomainError> {
        let mut tables = self.tables.write().await;
        tables.insert_user(user)
    }

    async fn update(&self, user: &User) -> Result<User, DomainError> {
        let mut tables = self.tables.write().await;
        let id = user.id();

        let Some(old_user) = tables.users.get(&id) else {
            return Err(DomainError::not_found(format!("User '{}' not found", id)));
        };

        let old_username = old_user.username().to_string();
        let old_email = old_user.email().to_string();

        let username_changed = old_username != user.username();
        let email_changed = old_email != user.email();

        // Both checks run before either index is touched
        if username_changed && tables.username_index.contains_key(user.username()) {
            return Err(DomainError::duplicate_username(user.username()));
        }

        if email_changed && tables.email_index.contains_key(user.email()) {
            return Err(DomainError::duplicate_email(user.email()));
        }

        if username_changed {
            tables.username_index.remove(&old_username);
            tables.username_index.insert(user.username().to_string(), id);
        }

        if email_changed {
            tables.email_index.remove(&old_email);
            tables.email_index.insert(user.email().to_string(), id);
        }

        tables.users.insert(id, user.clone());

        Ok(user.clone())
    }

    async fn delete(&self, id: UserId) -> Result<bool, DomainError> {
        let mut tables = self.tables.write().await;

        let Some(user) = tables.users.remove(&id) else {
            return Ok(false);
        };

        tables.username_index.remove(user.username());
        tables.email_index.remove(user.email());

        if let Some(role_ids) = tables.roles_by_user.remove(&id) {
            for role_id in role_ids {
                if let Some(holders) = tables.users_by_role.get_mut(&role_id) {
                    holders.remove(&id);
                }
            }
        }

        Ok(true)
    }

    async fn list(&self) -> Result<Vec<User>, DomainError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().cloned().collect())
    }

    async fn count(&self) -> Result<usize, DomainError> {
        let tables = self.tables.read().await;
        Ok(tables.users.len())
    }

    async fn exists(&self, id: UserId) -> Result<bool, DomainError> {
        let tables = self.tables.read().await;
        Ok(tables.users.contains_key(&id))
    }

    async fn username_exists(&self, username: &str) -> Result<bool, DomainError> {
        let tables = self.tables.read().await;
        Ok(tables.username_index.contains_key(username))
    }

    async fn email_exists(&self, email: &str) -> Result<bool, DomainError> {
        let tables = self.tables.read().await;
        Ok(tables.email_index.contains_key(email))
    }
}

#[async_trait]
impl RoleRepository for InMemoryIdentityStore {
    async fn find_by_name(&self, name: RoleName) -> Result<Option<Role>, DomainError> {
        let tables = self.tables.read().await;

        Ok(tables
            .role_index
            .get(&name)
            .and_then(|id| tables.roles.get(id))
            .copied())
    }

    async fn get_role(&self, id: RoleId) -> Result<Option<Role>, DomainError> {
        let tables = self.tables.read().await;
        Ok(tables.roles.get(&id).copied())
    }

    async fn list_roles(&self) -> Result<Vec<Role>, DomainError> {
        let tables = self.tables.read().await;

        let mut roles: Vec<Role> = tables.roles.values().copied().collect();
        roles.sort_by_key(|r| r.id());

        Ok(roles)
    }

    async fn seed(&self, names: &[RoleName]) -> Result<Vec<Role>, DomainError> {
        let mut tables = self.tables.write().await;

        for name in names {
            tables.insert_role(*name);
        }

        let mut roles: Vec<Role> = tables.roles.values().copied().collect();
        roles.sort_by_key(|r| r.id());

        Ok(roles)
    }
}

#[async_trait]
impl AssignmentRepository for InMemoryIdentityStore {
    async fn assign(&self, user_id: UserId, role_id: RoleId) -> Result<bool, DomainError> {
        let mut tables = self.tables.write().await;
        tables.check_link_ends(user_id, role_id)?;

        let added = tables
            .roles_by_user
            .entry(user_id)
            .or_default()
            .insert(role_id);

        tables
            .users_by_role
            .entry(role_id)
            .or_default()
            .insert(user_id);

        Ok(added)
    }

    async fn revoke(&self, user_id: UserId, role_id: RoleId) -> Result<bool, DomainError> {
        let mut tables = self.tables.write().await;
        tables.check_link_ends(user_id, role_id)?;

        let removed = tables
            .roles_by_user
            .get_mut(&user_id)
            .is_some_and(|held| held.remove(&role_id));

        if let Some(holders) = tables.users_by_role.get_mut(&role_id) {
            holders.remove(&user_id);
        }

        Ok(removed)
    }

    async fn roles_of(&self, user_id: UserId) -> Result<HashSet<Role>, DomainError> {
        let tables = self.tables.read().await;

        if !tables.users.contains_key(&user_id) {
            return Err(DomainError::unknown_user(format!("User '{}' not found", user_id)));
        }

        let roles = tables
            .roles_by_user
            .get(&user_id)
            .into_iter()
            .flatten()
            .filter_map(|id| tables.roles.get(id))
            .copied()
            .collect();

        Ok(roles)
    }

    async fn users_of(&self, role_id: RoleId) -> Result<Vec<User>, DomainError> {
        let tables = self.tables.read().await;

        if !tables.roles.contains_key(&role_id) {
            return Err(DomainError::unknown_role(format!("Role '{}' not found", role_id)));
        }

        let users = tables
            .users_by_role
            .get(&role_id)
            .into_iter()
            .flatten()
            .filter_map(|id| tables.users.get(id))
            .cloned()
            .collect();

        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(username: &str) -> NewUser {
        NewUser::new(username, format!("{}@example.com", username), "hashed_password")
    }

    async fn admin_role(store: &InMemoryIdentityStore) -> Role {
        store.find_by_name(RoleName::Admin).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = InMemoryIdentityStore::new();

        let user = store.create(new_user("alice")).await.unwrap();

        let retrieved = store.get(user.id()).await.unwrap();
        assert_eq!(retrieved, Some(user));
    }

    #[tokio::test]
    async fn test_ids_are_sequential() {
        let store = InMemoryIdentityStore::new();

        let first = store.create(new_user("alice")).await.unwrap();
        let second = store.create(new_user("bob")).await.unwrap();

        assert_eq!(first.id(), UserId::new(1));
        assert_eq!(second.id(), UserId::new(2));
    }

    #[tokio::test]
    async fn test_get_by_username_and_email() {
        let store = InMemoryIdentityStore::new();
        let user = store.create(new_user("alice")).await.unwrap();

        let by_name = store.get_by_username("alice").await.unwrap();
        assert_eq!(by_name.map(|u| u.id()), Some(user.id()));

        let by_email = store.get_by_email("alice@example.com").await.unwrap();
        assert_eq!(by_email.map(|u| u.id()), Some(user.id()));

        assert!(store.get_by_username("Alice").await.unwrap().is_none());
        assert!(store.get_by_email("bob@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username() {
        let store = InMemoryIdentityStore::new();
        store.create(new_user("alice")).await.unwrap();

        let result = store
            .create(NewUser::new("alice", "other@example.com", "hash"))
            .await;

        assert!(matches!(result, Err(DomainError::DuplicateUsername { .. })));
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_email() {
        let store = InMemoryIdentityStore::new();
        store.create(new_user("alice")).await.unwrap();

        let result = store
            .create(NewUser::new("bob", "alice@example.com", "hash"))
            .await;

        assert!(matches!(result, Err(DomainError::DuplicateEmail { .. })));
    }

    #[tokio::test]
    async fn test_username_checked_before_email() {
        let store = InMemoryIdentityStore::new();
        store.create(new_user("alice")).await.unwrap();

        let result = store.create(new_user("alice")).await;
        assert!(matches!(result, Err(DomainError::DuplicateUsername { .. })));
    }

    #[tokio::test]
    async fn test_failed_create_does_not_consume_state() {
        let store = InMemoryIdentityStore::new();
        store.create(new_user("alice")).await.unwrap();
        let _ = store.create(new_user("alice")).await;

        let bob = store.create(new_user("bob")).await.unwrap();
        assert_eq!(bob.id(), UserId::new(2));
        assert!(!store.username_exists("bob2").await.unwrap());
    }

    #[tokio::test]
    async fn test_update_reindexes() {
        let store = InMemoryIdentityStore::new();
        let mut user = store.create(new_user("alice")).await.unwrap();

        user.set_username("alicia");
        user.set_email("alicia@example.com");
        store.update(&user).await.unwrap();

        assert!(store.get_by_username("alice").await.unwrap().is_none());
        assert!(store.get_by_email("alice@example.com").await.unwrap().is_none());
        assert!(store.username_exists("alicia").await.unwrap());
        assert!(store.email_exists("alicia@example.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_update_conflicts() {
        let store = InMemoryIdentityStore::new();
        store.create(new_user("alice")).await.unwrap();
        let mut bob = store.create(new_user("bob")).await.unwrap();

        let mut renamed = bob.clone();
        renamed.set_username("alice");
        let result = store.update(&renamed).await;
        assert!(matches!(result, Err(DomainError::DuplicateUsername { .. })));

        bob.set_email("alice@example.com");
        let result = store.update(&bob).await;
        assert!(matches!(result, Err(DomainError::DuplicateEmail { .. })));

        // Nothing changed for bob
        let stored = store.get_by_username("bob").await.unwrap().unwrap();
        assert_eq!(stored.email(), "bob@example.com");
    }

    #[tokio::test]
    async fn test_update_missing_user() {
        let store = InMemoryIdentityStore::new();
        let ghost = User::new(UserId::new(99), new_user("ghost"));

        let result = store.update(&ghost).await;
        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let store = InMemoryIdentityStore::new();

        let first = store.seed(&RoleName::ALL).await.unwrap();
        let second = store.seed(&RoleName::ALL).await.unwrap();

        assert_eq!(first.len(), 3);
        assert_eq!(first, second);
        assert_eq!(store.list_roles().await.unwrap(), first);
    }

    #[tokio::test]
    async fn test_find_by_name() {
        let store = InMemoryIdentityStore::new();
        store.seed(&[RoleName::User]).await.unwrap();

        let user_role = store.find_by_name(RoleName::User).await.unwrap();
        assert_eq!(user_role.map(|r| r.name()), Some(RoleName::User));

        assert!(store.find_by_name(RoleName::Admin).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_assign_and_revoke() {
        let store = InMemoryIdentityStore::with_roles();
        let user = store.create(new_user("alice")).await.unwrap();
        let admin = admin_role(&store).await;

        assert!(store.assign(user.id(), admin.id()).await.unwrap());
        assert!(!store.assign(user.id(), admin.id()).await.unwrap());

        let roles = store.roles_of(user.id()).await.unwrap();
        assert_eq!(roles, HashSet::from([admin]));

        assert!(store.revoke(user.id(), admin.id()).await.unwrap());
        assert!(!store.revoke(user.id(), admin.id()).await.unwrap());

        assert!(store.roles_of(user.id()).await.unwrap().is_empty());
        assert!(store.users_of(admin.id()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_assign_unknown_ends() {
        let store = InMemoryIdentityStore::with_roles();
        let user = store.create(new_user("alice")).await.unwrap();
        let admin = admin_role(&store).await;

        let result = store.assign(UserId::new(42), admin.id()).await;
        assert!(matches!(result, Err(DomainError::UnknownUser { .. })));

        let result = store.assign(user.id(), RoleId::new(42)).await;
        assert!(matches!(result, Err(DomainError::UnknownRole { .. })));

        let result = store.revoke(UserId::new(42), admin.id()).await;
        assert!(matches!(result, Err(DomainError::UnknownUser { .. })));
    }

    #[tokio::test]
    async fn test_users_of() {
        let store = InMemoryIdentityStore::with_roles();
        let alice = store.create(new_user("alice")).await.unwrap();
        let bob = store.create(new_user("bob")).await.unwrap();
        store.create(new_user("carol")).await.unwrap();
        let admin = admin_role(&store).await;

        store.assign(alice.id(), admin.id()).await.unwrap();
        store.assign(bob.id(), admin.id()).await.unwrap();

        let mut holders: Vec<UserId> = store
            .users_of(admin.id())
            .await
            .unwrap()
            .iter()
            .map(|u| u.id())
            .collect();
        holders.sort();

        assert_eq!(holders, vec![alice.id(), bob.id()]);

        let result = store.users_of(RoleId::new(42)).await;
        assert!(matches!(result, Err(DomainError::UnknownRole { .. })));
    }

    #[tokio::test]
    async fn test_delete_removes_links_not_roles() {
        let store = InMemoryIdentityStore::with_roles();
        let user = store.create(new_user("alice")).await.unwrap();
        let admin = admin_role(&store).await;
        store.assign(user.id(), admin.id()).await.unwrap();

        assert!(store.delete(user.id()).await.unwrap());
        assert!(!store.delete(user.id()).await.unwrap());

        assert!(store.users_of(admin.id()).await.unwrap().is_empty());
        assert_eq!(store.list_roles().await.unwrap().len(), 3);
        assert!(!store.username_exists("alice").await.unwrap());

        let result = store.roles_of(user.id()).await;
        assert!(matches!(result, Err(DomainError::UnknownUser { .. })));

        // The freed username and email can be reused
        store.create(new_user("alice")).await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_single_winner() {
        let store = InMemoryIdentityStore::new();

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .create(NewUser::new("alice", format!("alice{}@example.com", i), "hash"))
                        .await
                })
            })
            .collect();

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                successes += 1;
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(store.count().await.unwrap(), 1);
    }
}
