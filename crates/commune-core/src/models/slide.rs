//! Home page carousel slide

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{ItemId, ResourceKind};
use super::resource::Resource;
use super::validate::{require_present, Validate, ValidationError};

const fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slide {
    pub id: ItemId,
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub link_url: Option<String>,
    #[serde(default)]
    pub position: u32,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideDraft {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_url: Option<String>,
    #[serde(default)]
    pub position: u32,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

impl Validate for SlideDraft {
    fn validate(&self) -> Result<(), ValidationError> {
        require_present("title", &self.title)
    }
}

impl Resource for Slide {
    type Draft = SlideDraft;

    const KIND: ResourceKind = ResourceKind::Slides;

    fn id(&self) -> &ItemId {
        &self.id
    }
}
