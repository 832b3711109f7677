//! PostgreSQL identity store implementation

use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::info;

use crate::domain::assignment::AssignmentRepository;
use crate::domain::role::{Role, RoleId, RoleName, RoleRepository};
use crate::domain::user::{NewUser, User, UserId, UserRepository};
use crate::domain::DomainError;

const USERNAME_CONSTRAINT: &str = "uk_users_username";
const EMAIL_CONSTRAINT: &str = "uk_users_email";
const ROLE_NAME_CONSTRAINT: &str = "uk_roles_name";

/// Schema for the three tables. Every statement is idempotent.
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id BIGINT GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY,
        username VARCHAR(20) NOT NULL,
        email VARCHAR(50) NOT NULL,
        password VARCHAR(120) NOT NULL,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL,
        CONSTRAINT uk_users_username UNIQUE (username),
        CONSTRAINT uk_users_email UNIQUE (email)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS roles (
        id INTEGER GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY,
        name VARCHAR(20) NOT NULL,
        CONSTRAINT uk_roles_name UNIQUE (name)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS user_roles (
        user_id BIGINT NOT NULL REFERENCES users (id) ON DELETE CASCADE,
        role_id INTEGER NOT NULL REFERENCES roles (id) ON DELETE CASCADE,
        PRIMARY KEY (user_id, role_id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_user_roles_role_id ON user_roles (role_id)",
];

const USER_COLUMNS: &str = "id, username, email, password, created_at, updated_at";

/// PostgreSQL implementation of the user, role and assignment repositories
#[derive(Debug, Clone)]
pub struct PostgresIdentityStore {
    pool: PgPool,
}

impl PostgresIdentityStore {
    /// Create a new store with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool against `database_url` and wrap it
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, DomainError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to connect to PostgreSQL: {}", e)))?;

        Ok(Self::new(pool))
    }

    /// Create the tables if they do not exist yet
    pub async fn init_schema(&self) -> Result<(), DomainError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| DomainError::storage(format!("Failed to create schema: {}", e)))?;
        }

        info!("Identity schema ready");
        Ok(())
    }

    async fn begin(&self) -> Result<Transaction<'static, Postgres>, DomainError> {
        self.pool
            .begin()
            .await
            .map_err(|e| DomainError::storage(format!("Failed to begin transaction: {}", e)))
    }

    /// Lock both ends of a link for the rest of the transaction so neither
    /// can be deleted underneath it
    async fn lock_link_ends(
        tx: &mut Transaction<'static, Postgres>,
        user_id: UserId,
        role_id: RoleId,
    ) -> Result<(), DomainError> {
        let user: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE id = $1 FOR KEY SHARE")
            .bind(user_id.value())
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to lock user: {}", e)))?;

        if user.is_none() {
            return Err(DomainError::unknown_user(format!("User '{}' not found", user_id)));
        }

        let role: Option<i32> = sqlx::query_scalar("SELECT id FROM roles WHERE id = $1 FOR KEY SHARE")
            .bind(role_id.value())
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to lock role: {}", e)))?;

        if role.is_none() {
            return Err(DomainError::unknown_role(format!("Role '{}' not found", role_id)));
        }

        Ok(())
    }

    async fn fetch_user(&self, column: &str, value: &str) -> Result<Option<User>, DomainError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM users WHERE {} = $1",
            USER_COLUMNS, column
        ))
        .bind(value)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to get user by {}: {}", column, e)))?;

        row.as_ref().map(row_to_user).transpose()
    }
}

async fn commit(tx: Transaction<'static, Postgres>) -> Result<(), DomainError> {
    tx.commit()
        .await
        .map_err(|e| DomainError::storage(format!("Failed to commit transaction: {}", e)))
}

#[async_trait]
impl UserRepository for PostgresIdentityStore {
    async fn get(&self, id: UserId) -> Result<Option<User>, DomainError> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to get user: {}", e)))?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>, DomainError> {
        self.fetch_user("username", username).await
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        self.fetch_user("email", email).await
    }

    async fn create(&self, user: NewUser) -> Result<User, DomainError> {
        let mut tx = self.begin().await?;

        // Proactive check for a precise error; the unique constraints below
        // still catch a concurrent insert that wins the race
        let (username_taken, email_taken): (bool, bool) = sqlx::query_as(
            r#"
            SELECT EXISTS (SELECT 1 FROM users WHERE username = $1),
                   EXISTS (SELECT 1 FROM users WHERE email = $2)
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to check user uniqueness: {}", e)))?;

        if username_taken {
            return Err(DomainError::duplicate_username(user.username));
        }

        if email_taken {
            return Err(DomainError::duplicate_email(user.email));
        }

        let stored = User::new(UserId::new(0), user);

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO users (username, email, password, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(stored.username())
        .bind(stored.email())
        .bind(stored.password_hash())
        .bind(stored.created_at())
        .bind(stored.updated_at())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, &stored, "create user"))?;

        let created = row_to_user(&row)?;
        commit(tx).await?;

        Ok(created)
    }

    async fn update(&self, user: &User) -> Result<User, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET username = $2, email = $3, password = $4, updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(user.id().value())
        .bind(user.username())
        .bind(user.email())
        .bind(user.password_hash())
        .bind(user.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, user, "update user"))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(format!("User '{}' not found", user.id())));
        }

        Ok(user.clone())
    }

    async fn delete(&self, id: UserId) -> Result<bool, DomainError> {
        // user_roles rows go with the user through ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.value())
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to delete user: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self) -> Result<Vec<User>, DomainError> {
        let rows = sqlx::query(&format!("SELECT {} FROM users ORDER BY id", USER_COLUMNS))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to list users: {}", e)))?;

        rows.iter().map(row_to_user).collect()
    }

    async fn count(&self) -> Result<usize, DomainError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to count users: {}", e)))?;

        Ok(count as usize)
    }

    async fn username_exists(&self, username: &str) -> Result<bool, DomainError> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE username = $1)")
            .bind(username)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to check username: {}", e)))
    }

    async fn email_exists(&self, email: &str) -> Result<bool, DomainError> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)")
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to check email: {}", e)))
    }
}

#[async_trait]
impl RoleRepository for PostgresIdentityStore {
    async fn find_by_name(&self, name: RoleName) -> Result<Option<Role>, DomainError> {
        let row = sqlx::query("SELECT id, name FROM roles WHERE name = $1")
            .bind(name.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to find role: {}", e)))?;

        row.as_ref().map(row_to_role).transpose()
    }

    async fn get_role(&self, id: RoleId) -> Result<Option<Role>, DomainError> {
        let row = sqlx::query("SELECT id, name FROM roles WHERE id = $1")
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to get role: {}", e)))?;

        row.as_ref().map(row_to_role).transpose()
    }

    async fn list_roles(&self) -> Result<Vec<Role>, DomainError> {
        let rows = sqlx::query("SELECT id, name FROM roles ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to list roles: {}", e)))?;

        rows.iter().map(row_to_role).collect()
    }

    async fn seed(&self, names: &[RoleName]) -> Result<Vec<Role>, DomainError> {
        let mut tx = self.begin().await?;

        for name in names {
            sqlx::query(&format!(
                "INSERT INTO roles (name) VALUES ($1) ON CONFLICT ON CONSTRAINT {} DO NOTHING",
                ROLE_NAME_CONSTRAINT
            ))
            .bind(name.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to seed role {}: {}", name, e)))?;
        }

        commit(tx).await?;
        self.list_roles().await
    }
}

#[async_trait]
impl AssignmentRepository for PostgresIdentityStore {
    async fn assign(&self, user_id: UserId, role_id: RoleId) -> Result<bool, DomainError> {
        let mut tx = self.begin().await?;
        Self::lock_link_ends(&mut tx, user_id, role_id).await?;

        let result = sqlx::query(
            "INSERT INTO user_roles (user_id, role_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id.value())
        .bind(role_id.value())
        .execute(&mut *tx)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to assign role: {}", e)))?;

        commit(tx).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn revoke(&self, user_id: UserId, role_id: RoleId) -> Result<bool, DomainError> {
        let mut tx = self.begin().await?;
        Self::lock_link_ends(&mut tx, user_id, role_id).await?;

        let result = sqlx::query("DELETE FROM user_roles WHERE user_id = $1 AND role_id = $2")
            .bind(user_id.value())
            .bind(role_id.value())
            .execute(&mut *tx)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to revoke role: {}", e)))?;

        commit(tx).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn roles_of(&self, user_id: UserId) -> Result<HashSet<Role>, DomainError> {
        if !self.exists(user_id).await? {
            return Err(DomainError::unknown_user(format!("User '{}' not found", user_id)));
        }

        let rows = sqlx::query(
            r#"
            SELECT r.id, r.name
            FROM roles r
            JOIN user_roles ur ON ur.role_id = r.id
            WHERE ur.user_id = $1
            "#,
        )
        .bind(user_id.value())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to load roles of user: {}", e)))?;

        rows.iter().map(row_to_role).collect()
    }

    async fn users_of(&self, role_id: RoleId) -> Result<Vec<User>, DomainError> {
        if self.get_role(role_id).await?.is_none() {
            return Err(DomainError::unknown_role(format!("Role '{}' not found", role_id)));
        }

        let rows = sqlx::query(
            r#"
            SELECT u.id, u.username, u.email, u.password, u.created_at, u.updated_at
            FROM users u
            JOIN user_roles ur ON ur.user_id = u.id
            WHERE ur.role_id = $1
            "#,
        )
        .bind(role_id.value())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to load users of role: {}", e)))?;

        rows.iter().map(row_to_user).collect()
    }
}

fn row_to_user(row: &PgRow) -> Result<User, DomainError> {
    let read = |e: sqlx::Error| DomainError::storage(format!("Invalid user row: {}", e));

    Ok(User::restore(
        UserId::new(row.try_get("id").map_err(read)?),
        row.try_get::<String, _>("username").map_err(read)?,
        row.try_get::<String, _>("email").map_err(read)?,
        row.try_get::<String, _>("password").map_err(read)?,
        row.try_get("created_at").map_err(read)?,
        row.try_get("updated_at").map_err(read)?,
    ))
}

fn row_to_role(row: &PgRow) -> Result<Role, DomainError> {
    let id: i32 = row
        .try_get("id")
        .map_err(|e| DomainError::storage(format!("Invalid role row: {}", e)))?;
    let name: String = row
        .try_get("name")
        .map_err(|e| DomainError::storage(format!("Invalid role row: {}", e)))?;

    let name = name
        .parse::<RoleName>()
        .map_err(|e| DomainError::storage(format!("Invalid role name in database: {}", e)))?;

    Ok(Role::new(RoleId::new(id), name))
}

fn map_unique_violation(e: sqlx::Error, user: &User, action: &str) -> DomainError {
    let constraint = match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => db.constraint(),
        _ => None,
    };

    conflict_for_constraint(constraint, user)
        .unwrap_or_else(|| DomainError::storage(format!("Failed to {}: {}", action, e)))
}

fn conflict_for_constraint(constraint: Option<&str>, user: &User) -> Option<DomainError> {
    match constraint? {
        USERNAME_CONSTRAINT => Some(DomainError::duplicate_username(user.username())),
        EMAIL_CONSTRAINT => Some(DomainError::duplicate_email(user.email())),
        _ => None,
    }
}
