//! commune-core - Client synchronization layer for the commune portal
//!
//! This crate contains the shared models, the authenticated request layer,
//! and the synchronized resource views used by every portal front end
//! (admin CLI, public pages, back office).

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod events;
pub mod fallback;
pub mod models;
pub mod normalize;
pub mod resource;
pub mod retry;
pub mod store;
pub mod upload;
pub mod util;

#[cfg(test)]
mod test_support;

pub use error::{Error, Result};
pub use models::{ItemId, ResourceKind};
pub use resource::{
    DataOrigin, ListQuery, PendingRemoval, Snapshot, SyncError, SyncedResource, ViewStatus,
};
