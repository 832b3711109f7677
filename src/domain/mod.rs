//! Domain layer - Identity entities, validation and repository traits

pub mod assignment;
pub mod error;
pub mod role;
pub mod traits;
pub mod user;

pub use assignment::AssignmentRepository;
pub use error::DomainError;
pub use role::{ParseRoleNameError, Role, RoleId, RoleName, RoleRepository};
pub use traits::IdentityStore;
pub use user::{NewUser, User, UserId, UserRepository, UserValidationError};
