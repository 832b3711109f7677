//! Role catalog domain
//!
//! The catalog holds one row per [`RoleName`]. It is seeded once and read
//! by name whenever a requested role has to be resolved to its stored row.

mod entity;
mod repository;

pub use entity::{ParseRoleNameError, Role, RoleId, RoleName};
pub use repository::RoleRepository;
