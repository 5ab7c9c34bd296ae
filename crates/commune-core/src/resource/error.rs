use thiserror::Error;

use crate::api::ApiError;
use crate::auth::AuthSignal;
use crate::models::{ItemId, MutationKey, ValidationError};
use crate::upload::UploadError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("cannot change status from {from} to {to}")]
    InvalidTransition { from: String, to: String },
    #[error("a change to {0} is already in progress")]
    MutationInFlight(MutationKey),
    #[error("demonstration data cannot be modified")]
    FallbackSnapshot,
    #[error("no staged changes for item {0}")]
    NothingStaged(ItemId),
    #[error("item {0} was not found")]
    NotFound(ItemId),
    #[error("could not encode request body: {0}")]
    Encoding(String),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Upload(#[from] UploadError),
}

impl SyncError {
    #[must_use]
    pub const fn auth_signal(&self) -> Option<AuthSignal> {
        match self {
            Self::Api(error) | Self::Upload(UploadError::Api(error)) => error.auth_signal(),
            _ => None,
        }
    }

    /// Errors detected locally, before any request was sent.
    #[must_use]
    pub const fn is_local(&self) -> bool {
        match self {
            Self::Validation(_)
            | Self::InvalidTransition { .. }
            | Self::MutationInFlight(_)
            | Self::FallbackSnapshot
            | Self::NothingStaged(_)
            | Self::Encoding(_) => true,
            Self::Upload(error) => error.is_validation(),
            Self::NotFound(_) | Self::Api(_) => false,
        }
    }

    /// Text for a user-visible notification. Server messages are shown
    /// verbatim; transport failures without one use `generic`.
    #[must_use]
    pub fn user_message(&self, generic: &str) -> String {
        match self {
            Self::Api(error) | Self::Upload(UploadError::Api(error)) => error.user_message(generic),
            Self::Upload(UploadError::LocalUrl) | Self::Encoding(_) => generic.to_string(),
            other => other.to_string(),
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(error: serde_json::Error) -> Self {
        Self::Encoding(error.to_string())
    }
}
