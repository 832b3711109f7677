//! Assignment index domain
//!
//! A user may hold any number of roles and a role may be held by any number
//! of users. The link carries no data of its own.

mod repository;

pub use repository::AssignmentRepository;
