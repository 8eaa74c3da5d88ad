use std::sync::Arc;

use async_trait::async_trait;

use crate::error::TransportError;
use crate::schema::ResourceDescriptor;
use crate::types::{EntityId, EntityRecord};

/// Uniform access to one resource kind over the five REST verbs.
///
/// Implementations: HTTP (`reqwest`) for the real backend, in-memory for tests
/// and demos. No retries happen at this layer; every failure is returned to
/// the caller as it happened.
#[async_trait]
pub trait ResourceClient: Send + Sync {
    /// Descriptor of the resource kind this client serves.
    fn descriptor(&self) -> &Arc<ResourceDescriptor>;

    /// `GET /{r}`: every record, in backend order.
    async fn list(&self) -> Result<Vec<EntityRecord>, TransportError>;

    /// `GET /{r}/{id}`.
    async fn get(&self, id: EntityId) -> Result<EntityRecord, TransportError>;

    /// `POST /{r}`. The backend assigns the identifier of the returned record.
    async fn create(&self, record: &EntityRecord) -> Result<EntityRecord, TransportError>;

    /// `PUT /{r}/{id}`.
    async fn update(
        &self,
        id: EntityId,
        record: &EntityRecord,
    ) -> Result<EntityRecord, TransportError>;

    /// `DELETE /{r}/{id}`.
    async fn delete(&self, id: EntityId) -> Result<(), TransportError>;
}
