use std::io;

use commune_core::models::ResourceKind;
use commune_core::resource::SyncError;
use commune_core::upload::UploadError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] commune_core::Error),
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Authentication error: {0}")]
    Auth(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("{0} has no moderation status")]
    NotModerated(ResourceKind),
    #[error("Unknown store key '{0}'")]
    UnknownStoreKey(String),
    #[error("Refusing to continue without confirmation; pass --yes")]
    ConfirmationRequired,
}

impl From<commune_core::auth::AuthError> for CliError {
    fn from(error: commune_core::auth::AuthError) -> Self {
        Self::Auth(error.to_string())
    }
}
