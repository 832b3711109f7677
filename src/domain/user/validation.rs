//! User validation utilities

use thiserror::Error;
use validator::ValidateEmail;

use crate::domain::DomainError;

/// Errors that can occur during user validation
#[derive(Debug, Error, Clone, PartialEq)]
pub enum UserValidationError {
    #[error("Username cannot be blank")]
    BlankUsername,

    #[error("Username exceeds maximum length of {0} characters")]
    UsernameTooLong(usize),

    #[error("Email cannot be blank")]
    BlankEmail,

    #[error("Email exceeds maximum length of {0} characters")]
    EmailTooLong(usize),

    #[error("Email '{0}' is not a valid address")]
    InvalidEmail(String),

    #[error("Password cannot be blank")]
    BlankPassword,

    #[error("Password exceeds maximum length of {0} characters")]
    PasswordTooLong(usize),
}

impl UserValidationError {
    /// Name of the field that failed validation
    pub fn field(&self) -> &'static str {
        match self {
            Self::BlankUsername | Self::UsernameTooLong(_) => "username",
            Self::BlankEmail | Self::EmailTooLong(_) | Self::InvalidEmail(_) => "email",
            Self::BlankPassword | Self::PasswordTooLong(_) => "password",
        }
    }
}

impl From<UserValidationError> for DomainError {
    fn from(e: UserValidationError) -> Self {
        DomainError::invalid_field(e.field(), e.to_string())
    }
}

pub const MAX_USERNAME_LENGTH: usize = 20;
pub const MAX_EMAIL_LENGTH: usize = 50;
pub const MAX_PASSWORD_LENGTH: usize = 120;

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Validate a username
///
/// Rules:
/// - Cannot be blank
/// - Maximum 20 characters
pub fn validate_username(username: &str) -> Result<(), UserValidationError> {
    if is_blank(username) {
        return Err(UserValidationError::BlankUsername);
    }

    if username.chars().count() > MAX_USERNAME_LENGTH {
        return Err(UserValidationError::UsernameTooLong(MAX_USERNAME_LENGTH));
    }

    Ok(())
}

/// Validate an email address
///
/// Rules:
/// - Cannot be blank
/// - Maximum 50 characters
/// - Must be a syntactically valid address
pub fn validate_email(email: &str) -> Result<(), UserValidationError> {
    if is_blank(email) {
        return Err(UserValidationError::BlankEmail);
    }

    if email.chars().count() > MAX_EMAIL_LENGTH {
        return Err(UserValidationError::EmailTooLong(MAX_EMAIL_LENGTH));
    }

    if !email.validate_email() {
        return Err(UserValidationError::InvalidEmail(email.to_string()));
    }

    Ok(())
}

/// Validate a stored password value.
///
/// The value is opaque here; it is usually a hash produced by a
/// [`PasswordHasher`](crate::infrastructure::identity::PasswordHasher).
pub fn validate_password(password: &str) -> Result<(), UserValidationError> {
    if is_blank(password) {
        return Err(UserValidationError::BlankPassword);
    }

    if password.chars().count() > MAX_PASSWORD_LENGTH {
        return Err(UserValidationError::PasswordTooLong(MAX_PASSWORD_LENGTH));
    }

    Ok(())
}

/// Validate all user fields, reporting the first failure
pub fn validate_user_fields(
    username: &str,
    email: &str,
    password: &str,
) -> Result<(), UserValidationError> {
    validate_username(username)?;
    validate_email(email)?;
    validate_password(password)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Username tests
    #[test]
    fn test_valid_usernames() {
        assert!(validate_username("alice").is_ok());
        assert!(validate_username("a").is_ok());
        assert!(validate_username("user.name_01").is_ok());
        assert!(validate_username(&"a".repeat(20)).is_ok());
    }

    #[test]
    fn test_blank_username() {
        assert_eq!(validate_username(""), Err(UserValidationError::BlankUsername));
        assert_eq!(
            validate_username("   "),
            Err(UserValidationError::BlankUsername)
        );
    }

    #[test]
    fn test_username_too_long() {
        assert_eq!(
            validate_username(&"a".repeat(21)),
            Err(UserValidationError::UsernameTooLong(20))
        );
    }

    #[test]
    fn test_username_length_counts_characters() {
        // 20 two-byte characters
        assert!(validate_username(&"é".repeat(20)).is_ok());
    }

    // Email tests
    #[test]
    fn test_valid_emails() {
        assert!(validate_email("alice@example.com").is_ok());
        assert!(validate_email("first.last+tag@sub.example.org").is_ok());
    }

    #[test]
    fn test_blank_email() {
        assert_eq!(validate_email(""), Err(UserValidationError::BlankEmail));
        assert_eq!(validate_email(" \t"), Err(UserValidationError::BlankEmail));
    }

    #[test]
    fn test_email_too_long() {
        let email = format!("{}@example.com", "a".repeat(40));
        assert_eq!(
            validate_email(&email),
            Err(UserValidationError::EmailTooLong(50))
        );
    }

    #[test]
    fn test_invalid_email_syntax() {
        assert!(matches!(
            validate_email("not-an-email"),
            Err(UserValidationError::InvalidEmail(_))
        ));
        assert!(matches!(
            validate_email("missing@"),
            Err(UserValidationError::InvalidEmail(_))
        ));
    }

    // Password tests
    #[test]
    fn test_valid_password() {
        assert!(validate_password("$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA").is_ok());
        assert!(validate_password(&"x".repeat(120)).is_ok());
    }

    #[test]
    fn test_blank_password() {
        assert_eq!(validate_password(""), Err(UserValidationError::BlankPassword));
        assert_eq!(validate_password("  "), Err(UserValidationError::BlankPassword));
    }

    #[test]
    fn test_password_too_long() {
        assert_eq!(
            validate_password(&"x".repeat(121)),
            Err(UserValidationError::PasswordTooLong(120))
        );
    }

    #[test]
    fn test_error_field_and_conversion() {
        let err = validate_user_fields("alice", "bad", "hash").unwrap_err();
        assert_eq!(err.field(), "email");

        let domain: DomainError = err.into();
        assert!(matches!(
            domain,
            DomainError::InvalidField { field: "email", .. }
        ));
    }
}
