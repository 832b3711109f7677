//! Identity infrastructure module
//!
//! This module provides the storage backends for users, roles and their
//! assignments (in-memory and PostgreSQL), password hashing with Argon2, and
//! the identity service callers go through.

mod password;
mod postgres_repository;
mod repository;
mod service;

pub use password::{Argon2Hasher, PasswordHasher};
pub use postgres_repository::PostgresIdentityStore;
pub use repository::InMemoryIdentityStore;
pub use service::{ChangePasswordRequest, IdentityService, UpdateUserRequest};
