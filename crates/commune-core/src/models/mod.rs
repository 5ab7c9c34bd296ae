//! Data models for the commune portal

mod catalogue;
mod id;
mod news;
mod patch;
mod personality;
mod post;
mod resource;
mod slide;
mod status;
mod user;
mod validate;

pub use catalogue::{CatalogueDraft, CatalogueItem};
pub use id::{ItemId, MutationKey, MutationTarget, ResourceKind};
pub use news::{News, NewsDraft, NEWS_CONTENT_MIN_CHARS, NEWS_TITLE_MIN_CHARS};
pub use patch::FieldPatch;
pub use personality::{Personality, PersonalityDraft};
pub use post::{Comment, CommentDraft, Post, PostDraft};
pub use resource::{Moderated, Resource};
pub use slide::{Slide, SlideDraft};
pub use status::{AccountStatus, ModerationStatus, PublishStatus, StatusTransitions};
pub use user::{User, UserDraft, UserRole};
pub use validate::{Validate, ValidationError};
