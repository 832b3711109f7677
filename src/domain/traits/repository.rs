use crate::domain::assignment::AssignmentRepository;
use crate::domain::role::RoleRepository;
use crate::domain::user::UserRepository;

/// A storage backend holding users, the role catalog and the assignment
/// index together.
///
/// The three live in one store so that existence checks on either end of an
/// assignment and the write of the link can share one atomic step.
pub trait IdentityStore: UserRepository + RoleRepository + AssignmentRepository {}

impl<T> IdentityStore for T where T: UserRepository + RoleRepository + AssignmentRepository {}
