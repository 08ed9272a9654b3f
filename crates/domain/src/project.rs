//! Project domain types.
//!
//! Projects are named resource containers; identities and API keys gain
//! access to them through explicit grant edges.

use keyfort_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum length of a project name.
pub const PROJECT_NAME_MAX_LENGTH: usize = 100;

/// Unique identifier for a project record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectId(Uuid);

impl ProjectId {
    /// Creates a new random project identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a project identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ProjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ProjectId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Validated project name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectName(String);

impl ProjectName {
    /// Creates a validated project name.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();

        if value.trim().is_empty() {
            return Err(AppError::Validation(
                "project name must not be empty or whitespace".to_owned(),
            ));
        }

        if value.chars().count() > PROJECT_NAME_MAX_LENGTH {
            return Err(AppError::Validation(format!(
                "project name must not exceed {PROJECT_NAME_MAX_LENGTH} characters"
            )));
        }

        Ok(Self(value))
    }

    /// Returns the underlying name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<ProjectName> for String {
    fn from(value: ProjectName) -> Self {
        value.0
    }
}

/// Role an identity holds on a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectRole {
    /// Full control, including grant administration.
    Owner,
    /// Read/write access to project resources.
    Member,
    /// Read-only access.
    Viewer,
}

impl ProjectRole {
    /// Returns the storage string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Member => "member",
            Self::Viewer => "viewer",
        }
    }

    /// Parses a storage string into a project role.
    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "owner" => Ok(Self::Owner),
            "member" => Ok(Self::Member),
            "viewer" => Ok(Self::Viewer),
            _ => Err(AppError::Validation(format!(
                "unknown project role '{value}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_round_trip_through_storage_strings() -> keyfort_core::AppResult<()> {
        for role in [ProjectRole::Owner, ProjectRole::Member, ProjectRole::Viewer] {
            assert_eq!(ProjectRole::parse(role.as_str())?, role);
        }
        Ok(())
    }

    #[test]
    fn unknown_role_is_rejected() {
        assert!(ProjectRole::parse("superuser").is_err());
    }

    #[test]
    fn blank_project_name_is_rejected() {
        assert!(ProjectName::new("").is_err());
    }
}
