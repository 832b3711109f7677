//! Role entity and the closed set of role names

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// System-assigned role identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleId(i32);

impl RoleId {
    pub fn new(id: i32) -> Self {
        Self(id)
    }

    /// Get the inner integer value
    pub fn value(&self) -> i32 {
        self.0
    }
}

impl From<i32> for RoleId {
    fn from(id: i32) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for RoleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error returned when a string does not name a known role
#[derive(Debug, Error, Clone, PartialEq)]
#[error("'{0}' is not a known role name")]
pub struct ParseRoleNameError(pub String);

/// Kinds of role a user can hold.
///
/// Stored by symbolic name, never by ordinal, so adding a variant does not
/// shift existing rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoleName {
    User,
    Moderator,
    Admin,
}

impl RoleName {
    /// Every role name, in catalog seeding order
    pub const ALL: [RoleName; 3] = [Self::User, Self::Moderator, Self::Admin];

    /// Stable storage encoding
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Moderator => "MODERATOR",
            Self::Admin => "ADMIN",
        }
    }
}

impl std::fmt::Display for RoleName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoleName {
    type Err = ParseRoleNameError;

    /// Accepts the storage encoding case-insensitively, with or without a
    /// leading `ROLE_` prefix
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let name = upper.strip_prefix("ROLE_").unwrap_or(&upper);

        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == name)
            .ok_or_else(|| ParseRoleNameError(s.to_string()))
    }
}

/// Role catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Role {
    id: RoleId,
    name: RoleName,
}

impl Role {
    pub fn new(id: RoleId, name: RoleName) -> Self {
        Self { id, name }
    }

    pub fn id(&self) -> RoleId {
        self.id
    }

    pub fn name(&self) -> RoleName {
        self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_name_encoding() {
        assert_eq!(RoleName::User.as_str(), "USER");
        assert_eq!(RoleName::Moderator.as_str(), "MODERATOR");
        assert_eq!(RoleName::Admin.to_string(), "ADMIN");
    }

    #[test]
    fn test_role_name_parsing() {
        assert_eq!("ADMIN".parse::<RoleName>(), Ok(RoleName::Admin));
        assert_eq!("admin".parse::<RoleName>(), Ok(RoleName::Admin));
        assert_eq!("ROLE_MODERATOR".parse::<RoleName>(), Ok(RoleName::Moderator));
        assert_eq!(" role_user ".parse::<RoleName>(), Ok(RoleName::User));
    }

    #[test]
    fn test_role_name_parsing_unknown() {
        let err = "SUPERUSER".parse::<RoleName>().unwrap_err();
        assert_eq!(err, ParseRoleNameError("SUPERUSER".to_string()));
        assert!("".parse::<RoleName>().is_err());
        assert!("ROLE_".parse::<RoleName>().is_err());
    }

    #[test]
    fn test_role_name_serde_uses_symbolic_name() {
        let json = serde_json::to_string(&RoleName::Moderator).unwrap();
        assert_eq!(json, "\"MODERATOR\"");

        let parsed: RoleName = serde_json::from_str("\"ADMIN\"").unwrap();
        assert_eq!(parsed, RoleName::Admin);
    }

    #[test]
    fn test_role_serialization() {
        let role = Role::new(RoleId::new(3), RoleName::Admin);
        let json = serde_json::to_string(&role).unwrap();
        assert_eq!(json, r#"{"id":3,"name":"ADMIN"}"#);
    }
}
