//! Entries kept in the local store

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::StoreKey;
use crate::models::ItemId;

pub const MAYOR_DATA: StoreKey<MayorData> = StoreKey::new("maire_data");
pub const HOME_CONTENT: StoreKey<HomeContent> = StoreKey::new("mainHomeContent");
pub const PERSONALITY_PROPOSALS: StoreKey<Vec<PersonalityProposal>> =
    StoreKey::new("personality_proposals");
pub const PERSONALITY_LIKES: StoreKey<BTreeSet<ItemId>> = StoreKey::new("personality_likes");

pub const KNOWN_KEYS: [&str; 4] = [
    MAYOR_DATA.name(),
    HOME_CONTENT.name(),
    PERSONALITY_PROPOSALS.name(),
    PERSONALITY_LIKES.name(),
];

/// The mayor's message block shown on the home page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MayorData {
    pub name: String,
    pub title: String,
    pub message: String,
    pub photo_url: Option<String>,
    pub signature: Option<String>,
}

/// Editable copy of the public home page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HomeContent {
    pub hero_title: String,
    pub hero_subtitle: String,
    pub welcome_message: String,
    pub highlights: Vec<String>,
}

/// A citizen's not-yet-submitted suggestion for the personalities page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalityProposal {
    /// Local draft id; never sent as a server id.
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub proposer_email: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PersonalityProposal {
    pub fn new(name: impl Into<String>, role: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            role: role.into(),
            reason: reason.into(),
            proposer_email: None,
            created_at: Utc::now(),
        }
    }
}
