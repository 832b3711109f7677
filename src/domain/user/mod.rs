//! User domain
//!
//! This module provides domain types and traits for the identity store,
//! including user entities, field validation, and the repository trait.

mod entity;
mod repository;
mod validation;

pub use entity::{NewUser, User, UserId};
pub use repository::UserRepository;
pub use validation::{
    validate_email, validate_password, validate_user_fields, validate_username,
    UserValidationError, MAX_EMAIL_LENGTH, MAX_PASSWORD_LENGTH, MAX_USERNAME_LENGTH,
};
