//! News article model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{ItemId, ResourceKind};
use super::resource::{Moderated, Resource};
use super::status::PublishStatus;
use super::validate::{require_min_chars, Validate, ValidationError};

pub const NEWS_TITLE_MIN_CHARS: usize = 5;
pub const NEWS_CONTENT_MIN_CHARS: usize = 10;

/// A news article as confirmed by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct News {
    pub id: ItemId,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub status: PublishStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Create payload for a news article.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsDraft {
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub status: PublishStatus,
}

impl NewsDraft {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            ..Self::default()
        }
    }
}

impl Validate for NewsDraft {
    fn validate(&self) -> Result<(), ValidationError> {
        require_min_chars("title", &self.title, NEWS_TITLE_MIN_CHARS)?;
        require_min_chars("content", &self.content, NEWS_CONTENT_MIN_CHARS)
    }
}

impl Resource for News {
    type Draft = NewsDraft;

    const KIND: ResourceKind = ResourceKind::News;

    fn id(&self) -> &ItemId {
        &self.id
    }
}

impl Moderated for News {
    type Status = PublishStatus;

    fn status(&self) -> PublishStatus {
        self.status
    }
}
