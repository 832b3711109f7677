use thiserror::Error;

/// Core domain errors
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Invalid field '{field}': {message}")]
    InvalidField { field: &'static str, message: String },

    #[error("Username '{username}' is already taken")]
    DuplicateUsername { username: String },

    #[error("Email '{email}' is already in use")]
    DuplicateEmail { email: String },

    #[error("Unknown user: {message}")]
    UnknownUser { message: String },

    #[error("Unknown role: {message}")]
    UnknownRole { message: String },

    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },
}

impl DomainError {
    pub fn invalid_field(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            message: message.into(),
        }
    }

    pub fn duplicate_username(username: impl Into<String>) -> Self {
        Self::DuplicateUsername {
            username: username.into(),
        }
    }

    pub fn duplicate_email(email: impl Into<String>) -> Self {
        Self::DuplicateEmail {
            email: email.into(),
        }
    }

    pub fn unknown_user(message: impl Into<String>) -> Self {
        Self::UnknownUser {
            message: message.into(),
        }
    }

    pub fn unknown_role(message: impl Into<String>) -> Self {
        Self::UnknownRole {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Whether the error is a uniqueness violation the caller can fix by
    /// choosing a different username or email
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::DuplicateUsername { .. } | Self::DuplicateEmail { .. }
        )
    }
}
