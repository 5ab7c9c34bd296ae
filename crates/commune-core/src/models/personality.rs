//! Notable local personality

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{ItemId, ResourceKind};
use super::resource::Resource;
use super::validate::{require_present, Validate, ValidationError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Personality {
    pub id: ItemId,
    pub name: String,
    /// Public role, e.g. "Ancien maire".
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub biography: String,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub likes: u32,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalityDraft {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub biography: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

impl Validate for PersonalityDraft {
    fn validate(&self) -> Result<(), ValidationError> {
        require_present("name", &self.name)
    }
}

impl Resource for Personality {
    type Draft = PersonalityDraft;

    const KIND: ResourceKind = ResourceKind::Personalities;

    fn id(&self) -> &ItemId {
        &self.id
    }
}
