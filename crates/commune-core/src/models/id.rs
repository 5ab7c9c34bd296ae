//! Identifiers and resource keys

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use super::validate::ValidationError;

/// A server-assigned item identifier.
///
/// Backends emit either numeric or string ids, so both deserialize into the
/// same canonical string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ItemId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::new("item id must not be empty"));
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl From<u64> for ItemId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl<'de> Deserialize<'de> for ItemId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Signed(i64),
            Unsigned(u64),
        }

        match RawId::deserialize(deserializer)? {
            RawId::Text(text) => text.parse().map_err(serde::de::Error::custom),
            RawId::Signed(number) => Ok(Self(number.to_string())),
            RawId::Unsigned(number) => Ok(Self(number.to_string())),
        }
    }
}

/// The remote collections the portal synchronizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    News,
    Slides,
    Catalogue,
    Personalities,
    Users,
    Posts,
    Comments,
}

impl ResourceKind {
    pub const ALL: [Self; 7] = [
        Self::News,
        Self::Slides,
        Self::Catalogue,
        Self::Personalities,
        Self::Users,
        Self::Posts,
        Self::Comments,
    ];

    /// Path segment under `/api/`.
    #[must_use]
    pub const fn path_segment(self) -> &'static str {
        match self {
            Self::News => "news",
            Self::Slides => "slides",
            Self::Catalogue => "catalogue",
            Self::Personalities => "personalities",
            Self::Users => "users",
            Self::Posts => "posts",
            Self::Comments => "comments",
        }
    }

    /// Key some backends use to wrap a single item (`{"post": {...}}`).
    #[must_use]
    pub const fn singular(self) -> &'static str {
        match self {
            Self::News => "news",
            Self::Slides => "slide",
            Self::Catalogue => "item",
            Self::Personalities => "personality",
            Self::Users => "user",
            Self::Posts => "post",
            Self::Comments => "comment",
        }
    }

    /// Collection path, e.g. `/api/news`.
    #[must_use]
    pub fn collection_path(self) -> String {
        format!("/api/{}", self.path_segment())
    }

    /// Item path, e.g. `/api/news/42`.
    #[must_use]
    pub fn item_path(self, id: &ItemId) -> String {
        format!(
            "/api/{}/{}",
            self.path_segment(),
            urlencoding::encode(id.as_str())
        )
    }

    /// Item action path, e.g. `/api/posts/42/status`.
    #[must_use]
    pub fn action_path(self, id: &ItemId, action: &str) -> String {
        format!("{}/{action}", self.item_path(id))
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path_segment())
    }
}

impl FromStr for ResourceKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "news" | "actualites" => Ok(Self::News),
            "slides" | "slide" => Ok(Self::Slides),
            "catalogue" | "catalog" => Ok(Self::Catalogue),
            "personalities" | "personality" | "personnalites" => Ok(Self::Personalities),
            "users" | "user" => Ok(Self::Users),
            "posts" | "post" => Ok(Self::Posts),
            "comments" | "comment" => Ok(Self::Comments),
            other => Err(ValidationError::new(format!("unknown resource '{other}'"))),
        }
    }
}

/// What a pending mutation targets: a not-yet-saved item or a persisted one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MutationTarget {
    New,
    Item(ItemId),
}

/// Key under which at most one mutation may be in flight.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MutationKey {
    pub kind: ResourceKind,
    pub target: MutationTarget,
}

impl MutationKey {
    #[must_use]
    pub const fn new_item(kind: ResourceKind) -> Self {
        Self {
            kind,
            target: MutationTarget::New,
        }
    }

    #[must_use]
    pub const fn item(kind: ResourceKind, id: ItemId) -> Self {
        Self {
            kind,
            target: MutationTarget::Item(id),
        }
    }
}

impl fmt::Display for MutationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            MutationTarget::New => write!(f, "{}:new", self.kind),
            MutationTarget::Item(id) => write!(f, "{}:{id}", self.kind),
        }
    }
}
