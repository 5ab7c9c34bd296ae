//! Status lifecycles and their allowed transitions

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::validate::ValidationError;

/// A finite status set with a resource-specific transition table.
pub trait StatusTransitions:
    Copy + Eq + fmt::Debug + fmt::Display + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// States reachable in one step from `self`.
    fn allowed_next(self) -> &'static [Self];

    fn can_transition_to(self, next: Self) -> bool {
        self.allowed_next().contains(&next)
    }

    fn is_terminal(self) -> bool {
        self.allowed_next().is_empty()
    }
}

/// Moderation lifecycle for citizen posts and comments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationStatus {
    #[default]
    Pending,
    Published,
    Blocked,
    Rejected,
    Archived,
}

impl ModerationStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Published => "published",
            Self::Blocked => "blocked",
            Self::Rejected => "rejected",
            Self::Archived => "archived",
        }
    }
}

impl StatusTransitions for ModerationStatus {
    fn allowed_next(self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::Published, Self::Blocked, Self::Rejected],
            Self::Published => &[Self::Pending, Self::Archived],
            Self::Blocked | Self::Rejected => &[Self::Published],
            // Terminal for the admin surface.
            Self::Archived => &[],
        }
    }
}

/// Editorial lifecycle for news articles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

impl PublishStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Archived => "archived",
        }
    }
}

impl StatusTransitions for PublishStatus {
    fn allowed_next(self) -> &'static [Self] {
        match self {
            Self::Draft => &[Self::Published, Self::Archived],
            Self::Published => &[Self::Draft, Self::Archived],
            Self::Archived => &[Self::Draft],
        }
    }
}

/// Back-office account state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    #[default]
    Active,
    Suspended,
}

impl AccountStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Suspended => "suspended",
        }
    }
}

impl StatusTransitions for AccountStatus {
    fn allowed_next(self) -> &'static [Self] {
        match self {
            Self::Active => &[Self::Suspended],
            Self::Suspended => &[Self::Active],
        }
    }
}

macro_rules! status_text_impls {
    ($($status:ty),+) => {
        $(
            impl fmt::Display for $status {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.as_str())
                }
            }

            impl FromStr for $status {
                type Err = ValidationError;

                fn from_str(s: &str) -> Result<Self, Self::Err> {
                    let quoted = format!("\"{}\"", s.trim().to_ascii_lowercase());
                    serde_json::from_str(&quoted)
                        .map_err(|_| ValidationError::new(format!("unknown status '{}'", s.trim())))
                }
            }
        )+
    };
}

status_text_impls!(ModerationStatus, PublishStatus, AccountStatus);
