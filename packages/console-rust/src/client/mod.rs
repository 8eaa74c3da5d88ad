//! Resource clients and the providers that hand them out per resource kind.
//!
//! [`HttpApi`] talks to the real backend over `reqwest`. [`MemoryBackend`]
//! keeps records in process and backs tests and offline demos. Both are
//! [`ClientProvider`]s, so stores and editors never name a transport.

pub mod http;
pub mod memory;

use std::sync::Arc;

use autodrive_core::ResourceClient;

use crate::error::RegistryError;

pub use http::{HttpApi, HttpResourceClient, REQUEST_ID_HEADER};
pub use memory::{MemoryBackend, MemoryResourceClient, Verb};

/// Hands out a [`ResourceClient`] for any resource kind of the catalog.
pub trait ClientProvider: Send + Sync {
    /// Returns the client serving `/{resource}`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownResource`] if the catalog does not
    /// describe `resource`.
    fn client(&self, resource: &str) -> Result<Arc<dyn ResourceClient>, RegistryError>;
}
