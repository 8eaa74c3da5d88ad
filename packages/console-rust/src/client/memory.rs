//! In-process resource clients backed by [`DashMap`].
//!
//! Each call goes through the same codec as the HTTP client, so what is
//! stored is exactly what a real backend would have received: references
//! collapsed to `{ "id": n }`, undeclared fields dropped. Failures can be
//! queued per verb to exercise error paths without a network.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;

use autodrive_core::codec::{decode_record, encode_record};
use autodrive_core::{
    Catalog, EntityId, EntityRecord, ResourceClient, ResourceDescriptor, TransportError,
};

use super::ClientProvider;
use crate::error::RegistryError;

/// The five REST verbs of a resource client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    List,
    Get,
    Create,
    Update,
    Delete,
}

impl Verb {
    const ALL: [Verb; 5] = [Self::List, Self::Get, Self::Create, Self::Update, Self::Delete];

    fn index(self) -> usize {
        match self {
            Self::List => 0,
            Self::Get => 1,
            Self::Create => 2,
            Self::Update => 3,
            Self::Delete => 4,
        }
    }
}

/// In-memory records of one resource kind.
///
/// `list` returns records ordered by identifier, the way a table scan on the
/// primary key would.
pub struct MemoryResourceClient {
    descriptor: Arc<ResourceDescriptor>,
    records: DashMap<EntityId, EntityRecord>,
    next_id: AtomicI64,
    calls: [AtomicUsize; 5],
    failures: Mutex<VecDeque<(Verb, TransportError)>>,
    last_payload: Mutex<Option<Value>>,
    latency: Mutex<Option<Duration>>,
}

impl MemoryResourceClient {
    #[must_use]
    pub fn new(descriptor: Arc<ResourceDescriptor>) -> Self {
        Self {
            descriptor,
            records: DashMap::new(),
            next_id: AtomicI64::new(1),
            calls: Default::default(),
            failures: Mutex::new(VecDeque::new()),
            last_payload: Mutex::new(None),
            latency: Mutex::new(None),
        }
    }

    /// Stores `record` as if the backend already held it. Records without an
    /// identifier get the next free one.
    pub fn seed(&self, record: EntityRecord) -> EntityId {
        let id = match record.id() {
            Some(id) => {
                self.next_id.fetch_max(id.0.saturating_add(1), Ordering::Relaxed);
                id
            }
            None => self.allocate_id(),
        };
        self.records.insert(id, record.with_id(id));
        id
    }

    /// Seeds every record of a JSON array such as `[{"id": 1, "nome": "Sedan"}]`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Decode`] if an element is not a record.
    pub fn seed_json(&self, records: Value) -> Result<Vec<EntityId>, TransportError> {
        autodrive_core::codec::decode_list(&self.descriptor, records)
            .map(|records| records.into_iter().map(|r| self.seed(r)).collect())
    }

    /// Makes the next call of `verb` fail with `error`. Queued failures are
    /// consumed in order.
    pub fn fail_next(&self, verb: Verb, error: TransportError) {
        self.failures.lock().push_back((verb, error));
    }

    /// Delays every call, so concurrent callers overlap.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = Some(latency);
    }

    /// Number of times `verb` was called, failed calls included.
    #[must_use]
    pub fn calls(&self, verb: Verb) -> usize {
        self.calls[verb.index()].load(Ordering::Relaxed)
    }

    /// Total calls over every verb.
    #[must_use]
    pub fn total_calls(&self) -> usize {
        Verb::ALL.iter().map(|v| self.calls(*v)).sum()
    }

    /// JSON body received by the last `create` or `update`.
    #[must_use]
    pub fn last_payload(&self) -> Option<Value> {
        self.last_payload.lock().clone()
    }

    /// Stored record, as the backend would return it.
    #[must_use]
    pub fn stored(&self, id: EntityId) -> Option<EntityRecord> {
        self.records.get(&id).map(|r| r.clone())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn allocate_id(&self) -> EntityId {
        EntityId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    async fn enter(&self, verb: Verb) -> Result<(), TransportError> {
        self.calls[verb.index()].fetch_add(1, Ordering::Relaxed);
        debug!(resource = self.descriptor.name(), ?verb, "in-memory call");
        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        let mut failures = self.failures.lock();
        let queued = failures.iter().position(|(v, _)| *v == verb);
        match queued.and_then(|index| failures.remove(index)) {
            Some((_, error)) => Err(error),
            None => Ok(()),
        }
    }

    /// Encodes `record` as the caller handed it over and decodes it back under
    /// `id`. The encoded body is what [`Self::last_payload`] reports.
    fn receive(&self, id: EntityId, record: &EntityRecord) -> Result<EntityRecord, TransportError> {
        let payload = encode_record(&self.descriptor, record);
        *self.last_payload.lock() = Some(payload.clone());
        Ok(decode_record(&self.descriptor, payload)?.with_id(id))
    }

    fn not_found(&self, id: EntityId) -> TransportError {
        TransportError::not_found(self.descriptor.name(), id)
    }
}

#[async_trait]
impl ResourceClient for MemoryResourceClient {
    fn descriptor(&self) -> &Arc<ResourceDescriptor> {
        &self.descriptor
    }

    async fn list(&self) -> Result<Vec<EntityRecord>, TransportError> {
        self.enter(Verb::List).await?;
        let ordered: BTreeMap<EntityId, EntityRecord> = self
            .records
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();
        Ok(ordered.into_values().collect())
    }

    async fn get(&self, id: EntityId) -> Result<EntityRecord, TransportError> {
        self.enter(Verb::Get).await?;
        self.stored(id).ok_or_else(|| self.not_found(id))
    }

    async fn create(&self, record: &EntityRecord) -> Result<EntityRecord, TransportError> {
        self.enter(Verb::Create).await?;
        let id = self.allocate_id();
        let stored = self.receive(id, record)?;
        self.records.insert(id, stored.clone());
        Ok(stored)
    }

    async fn update(
        &self,
        id: EntityId,
        record: &EntityRecord,
    ) -> Result<EntityRecord, TransportError> {
        self.enter(Verb::Update).await?;
        if !self.records.contains_key(&id) {
            return Err(self.not_found(id));
        }
        let stored = self.receive(id, record)?;
        self.records.insert(id, stored.clone());
        Ok(stored)
    }

    async fn delete(&self, id: EntityId) -> Result<(), TransportError> {
        self.enter(Verb::Delete).await?;
        self.records
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| self.not_found(id))
    }
}

/// A whole in-memory backend: one [`MemoryResourceClient`] per catalog entry.
pub struct MemoryBackend {
    catalog: Arc<Catalog>,
    resources: DashMap<&'static str, Arc<MemoryResourceClient>>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new(catalog: Arc<Catalog>) -> Self {
        let resources = catalog
            .iter()
            .map(|d| (d.name(), Arc::new(MemoryResourceClient::new(Arc::clone(d)))))
            .collect();
        Self { catalog, resources }
    }

    #[must_use]
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// The concrete client of `resource`, for seeding and failure injection.
    #[must_use]
    pub fn resource(&self, resource: &str) -> Option<Arc<MemoryResourceClient>> {
        self.resources.get(resource).map(|r| Arc::clone(r.value()))
    }
}

impl ClientProvider for MemoryBackend {
    fn client(&self, resource: &str) -> Result<Arc<dyn ResourceClient>, RegistryError> {
        self.resource(resource)
            .map(|client| client as Arc<dyn ResourceClient>)
            .ok_or_else(|| RegistryError::UnknownResource(resource.to_string()))
    }
}
