//! Citizen posts and their comments

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{ItemId, ResourceKind};
use super::resource::{Moderated, Resource};
use super::status::ModerationStatus;
use super::validate::{require_present, Validate, ValidationError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: ItemId,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub status: ModerationStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostDraft {
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Validate for PostDraft {
    fn validate(&self) -> Result<(), ValidationError> {
        require_present("title", &self.title)?;
        require_present("content", &self.content)
    }
}

impl Resource for Post {
    type Draft = PostDraft;

    const KIND: ResourceKind = ResourceKind::Posts;

    fn id(&self) -> &ItemId {
        &self.id
    }
}

impl Moderated for Post {
    type Status = ModerationStatus;

    fn status(&self) -> ModerationStatus {
        self.status
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: ItemId,
    pub post_id: ItemId,
    #[serde(default)]
    pub author: Option<String>,
    pub content: String,
    #[serde(default)]
    pub status: ModerationStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentDraft {
    pub post_id: ItemId,
    pub content: String,
}

impl Validate for CommentDraft {
    fn validate(&self) -> Result<(), ValidationError> {
        require_present("content", &self.content)
    }
}

impl Resource for Comment {
    type Draft = CommentDraft;

    const KIND: ResourceKind = ResourceKind::Comments;

    fn id(&self) -> &ItemId {
        &self.id
    }
}

impl Moderated for Comment {
    type Status = ModerationStatus;

    fn status(&self) -> ModerationStatus {
        self.status
    }
}
