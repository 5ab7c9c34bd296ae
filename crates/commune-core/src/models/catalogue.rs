//! Digital catalogue entry

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{ItemId, ResourceKind};
use super::resource::Resource;
use super::validate::{require_present, Validate, ValidationError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogueItem {
    pub id: ItemId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
    /// Downloadable PDF, when the entry is a document.
    #[serde(default)]
    pub document_url: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogueDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Validate for CatalogueDraft {
    fn validate(&self) -> Result<(), ValidationError> {
        require_present("title", &self.title)
    }
}

impl Resource for CatalogueItem {
    type Draft = CatalogueDraft;

    const KIND: ResourceKind = ResourceKind::Catalogue;

    fn id(&self) -> &ItemId {
        &self.id
    }
}
