//! Traits shared by every synchronized collection

use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::id::{ItemId, ResourceKind};
use super::status::StatusTransitions;
use super::validate::Validate;

/// A record owned by one remote collection.
pub trait Resource:
    Clone + fmt::Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Payload accepted by the collection's create endpoint.
    type Draft: Serialize + DeserializeOwned + Validate + fmt::Debug + Send + Sync;

    const KIND: ResourceKind;

    fn id(&self) -> &ItemId;
}

/// A resource whose status follows a client-enforced state machine.
pub trait Moderated: Resource {
    type Status: StatusTransitions;

    fn status(&self) -> Self::Status;
}
