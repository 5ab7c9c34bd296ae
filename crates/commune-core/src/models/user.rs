//! Back-office user account

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{ItemId, ResourceKind};
use super::resource::{Moderated, Resource};
use super::status::AccountStatus;
use super::validate::{require_email, require_present, Validate, ValidationError};

/// Role granted by the external auth service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Editor,
    Moderator,
    #[default]
    #[serde(other)]
    Citizen,
}

impl UserRole {
    /// Whether the role may use the administrative back office.
    #[must_use]
    pub const fn is_staff(self) -> bool {
        matches!(self, Self::Admin | Self::Editor | Self::Moderator)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: ItemId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default)]
    pub status: AccountStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDraft {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: UserRole,
}

impl Validate for UserDraft {
    fn validate(&self) -> Result<(), ValidationError> {
        require_present("name", &self.name)?;
        require_email("email", &self.email)
    }
}

impl Resource for User {
    type Draft = UserDraft;

    const KIND: ResourceKind = ResourceKind::Users;

    fn id(&self) -> &ItemId {
        &self.id
    }
}

impl Moderated for User {
    type Status = AccountStatus;

    fn status(&self) -> AccountStatus {
        self.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_role_falls_back_to_citizen() {
        let role: UserRole = serde_json::from_str("\"superuser\"").unwrap();
        assert_eq!(role, UserRole::Citizen);
        assert!(!role.is_staff());
        assert!(UserRole::Moderator.is_staff());
    }

    #[test]
    fn user_draft_requires_valid_email() {
        let draft = UserDraft {
            name: "Agent".to_string(),
            email: "agent".to_string(),
            role: UserRole::Editor,
        };
        assert!(draft.validate().is_err());
    }
}
