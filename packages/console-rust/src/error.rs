//! Error types of the console layer.
//!
//! The resource client never recovers from anything; these types wrap its
//! [`TransportError`] together with the failures the stores and the editor
//! add on top of it.

use autodrive_core::{EntityId, TransportError, ValidationError};

/// Failure to hand out a client for a resource kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("unknown resource kind: {0}")]
    UnknownResource(String),
}

/// Failure to set up the HTTP transport.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid API base URL {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Errors returned by a [`CollectionStore`](crate::store::CollectionStore).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("record {0} is not in the collection")]
    NotInCollection(EntityId),
}

/// Errors returned by a [`RecordEditor`](crate::store::RecordEditor).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditorError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("no record is being edited")]
    NotReady,
}

impl EditorError {
    /// The remote failure behind this error, however deeply it is wrapped.
    #[must_use]
    pub fn transport(&self) -> Option<&TransportError> {
        match self {
            Self::Transport(err) | Self::Store(StoreError::Transport(err)) => Some(err),
            _ => None,
        }
    }
}
