//! Observable, ordered collection of one resource kind.
//!
//! State lives behind a `parking_lot` mutex that is never held across an
//! `.await`, so the store can be shared behind an `Arc` and loaded through a
//! shared reference. Status transitions:
//!
//! `Idle | Ready | Failed -> Loading -> Ready | Failed`

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use autodrive_core::{EntityId, EntityRecord, ResourceClient, ResourceDescriptor};

use crate::error::StoreError;
use crate::messages;

/// Load status of a [`CollectionStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadStatus {
    /// Nothing requested yet.
    #[default]
    Idle,
    /// A `list` call is in flight.
    Loading,
    /// The records reflect the last successful `list`.
    Ready,
    /// The last `list` failed; see [`CollectionStore::last_error`].
    Failed,
}

impl LoadStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Failed => "failed",
        }
    }
}

/// Point-in-time copy of a store's observable state.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CollectionSnapshot {
    pub records: Vec<EntityRecord>,
    pub status: LoadStatus,
    pub last_error: Option<String>,
}

/// Ordered records of one resource kind plus their load status.
pub struct CollectionStore {
    client: Arc<dyn ResourceClient>,
    state: Mutex<Shared>,
}

#[derive(Default)]
struct Shared {
    view: CollectionSnapshot,
    /// Ids deleted while a load was in flight. The listing that load
    /// returns may predate the delete, so these are filtered out of it.
    removed_during_load: HashSet<EntityId>,
}

impl CollectionStore {
    #[must_use]
    pub fn new(client: Arc<dyn ResourceClient>) -> Self {
        Self {
            client,
            state: Mutex::new(Shared::default()),
        }
    }

    #[must_use]
    pub fn descriptor(&self) -> &Arc<ResourceDescriptor> {
        self.client.descriptor()
    }

    #[must_use]
    pub fn client(&self) -> &Arc<dyn ResourceClient> {
        &self.client
    }

    #[must_use]
    pub fn status(&self) -> LoadStatus {
        self.state.lock().view.status
    }

    /// User-facing message of the last failed load or remove.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.state.lock().view.last_error.clone()
    }

    #[must_use]
    pub fn records(&self) -> Vec<EntityRecord> {
        self.state.lock().view.records.clone()
    }

    #[must_use]
    pub fn snapshot(&self) -> CollectionSnapshot {
        self.state.lock().view.clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().view.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().view.records.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.state.lock().view.records.iter().any(|r| r.id() == Some(id))
    }

    #[must_use]
    pub fn find(&self, id: EntityId) -> Option<EntityRecord> {
        self.state
            .lock()
            .view
            .records
            .iter()
            .find(|r| r.id() == Some(id))
            .cloned()
    }

    /// `(id, label)` pairs for a dropdown listing this collection.
    #[must_use]
    pub fn options(&self) -> Vec<(EntityId, String)> {
        let descriptor = self.descriptor();
        self.state
            .lock()
            .view
            .records
            .iter()
            .filter_map(|r| r.id().map(|id| (id, descriptor.option_label(r))))
            .collect()
    }

    /// Fetches the whole collection and replaces the held records.
    ///
    /// Failures are recorded in the store rather than returned. Calling this
    /// while a load is in flight does nothing.
    pub async fn load(&self) -> LoadStatus {
        // The outcome is already reflected in the store's state.
        let _ = self.fetch().await;
        self.status()
    }

    /// Like [`load`](Self::load), but also hands the failure to the caller.
    ///
    /// Returns `Ok(false)` when another load was already in flight.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Transport`] if the `list` call fails.
    pub async fn fetch(&self) -> Result<bool, StoreError> {
        let resource = self.descriptor().name();
        let Some(guard) = self.begin_load() else {
            debug!(resource, "load already in flight");
            return Ok(false);
        };

        match self.client.list().await {
            Ok(records) => {
                let records = dedupe(resource, records);
                info!(resource, count = records.len(), "collection loaded");
                guard.settle(|state| {
                    state.records = records;
                    state.status = LoadStatus::Ready;
                    state.last_error = None;
                });
                Ok(true)
            }
            Err(err) => {
                warn!(resource, error = %err, "collection load failed");
                let message = messages::load_failed(self.descriptor().noun());
                guard.settle(|state| {
                    state.status = LoadStatus::Failed;
                    state.last_error = Some(message);
                });
                Err(err.into())
            }
        }
    }

    /// Deletes `id` on the backend, then drops it from the collection.
    ///
    /// On failure the records are left untouched and the failure is both
    /// returned and kept as the store's last error.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotInCollection`] without calling the backend if
    /// `id` is not held, and [`StoreError::Transport`] if `delete` fails.
    pub async fn remove(&self, id: EntityId) -> Result<(), StoreError> {
        let resource = self.descriptor().name();
        if !self.contains(id) {
            return Err(StoreError::NotInCollection(id));
        }

        match self.client.delete(id).await {
            Ok(()) => {
                let mut state = self.state.lock();
                if state.view.status == LoadStatus::Loading {
                    state.removed_during_load.insert(id);
                }
                state.view.records.retain(|r| r.id() != Some(id));
                state.view.last_error = None;
                info!(resource, %id, "record removed");
                Ok(())
            }
            Err(err) => {
                warn!(resource, %id, error = %err, "remove failed");
                self.state.lock().view.last_error =
                    Some(messages::delete_failed(self.descriptor().noun()));
                Err(err.into())
            }
        }
    }

    fn begin_load(&self) -> Option<LoadGuard<'_>> {
        let mut state = self.state.lock();
        if state.view.status == LoadStatus::Loading {
            return None;
        }
        state.removed_during_load.clear();
        let previous = std::mem::replace(&mut state.view.status, LoadStatus::Loading);
        Some(LoadGuard {
            state: &self.state,
            previous,
            settled: false,
        })
    }
}

/// Marks a load in flight. If the load future is dropped before it settles,
/// the status goes back to what it was so the store never stays `Loading`.
struct LoadGuard<'a> {
    state: &'a Mutex<Shared>,
    previous: LoadStatus,
    settled: bool,
}

impl LoadGuard<'_> {
    /// Applies the load's outcome. Records deleted while the load was in
    /// flight never come back, even if the listing still carried them.
    fn settle(mut self, apply: impl FnOnce(&mut CollectionSnapshot)) {
        let mut state = self.state.lock();
        let Shared {
            view,
            removed_during_load,
        } = &mut *state;
        apply(view);
        if !removed_during_load.is_empty() {
            view.records
                .retain(|r| !r.id().is_some_and(|id| removed_during_load.contains(&id)));
            removed_during_load.clear();
        }
        self.settled = true;
    }
}

impl Drop for LoadGuard<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut state = self.state.lock();
        state.removed_during_load.clear();
        if state.view.status == LoadStatus::Loading {
            debug!("load abandoned, restoring previous status");
            state.view.status = self.previous;
        }
    }
}

/// Keeps the first record of each identifier.
fn dedupe(resource: &str, records: Vec<EntityRecord>) -> Vec<EntityRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|record| match record.id() {
            Some(id) if !seen.insert(id) => {
                warn!(resource, %id, "backend listed the same id twice, keeping the first");
                false
            }
            _ => true,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::time::Duration;

    use autodrive_core::{Catalog, TransportError};
    use serde_json::json;

    use super::*;
    use crate::client::{MemoryBackend, MemoryResourceClient, Verb};

    fn categories() -> (Arc<MemoryResourceClient>, CollectionStore) {
        let backend = MemoryBackend::new(Arc::new(Catalog::autodrive().unwrap()));
        let client = backend.resource("categorias").unwrap();
        let store = CollectionStore::new(client.clone());
        (client, store)
    }

    fn server_error() -> TransportError {
        TransportError::Status {
            status: 500,
            body: "internal".into(),
        }
    }

    #[tokio::test]
    async fn starts_idle_and_empty() {
        let (_, store) = categories();
        assert_eq!(store.status(), LoadStatus::Idle);
        assert!(store.is_empty());
        assert!(store.last_error().is_none());
    }

    #[tokio::test]
    async fn load_then_remove_leaves_empty_ready_store() {
        let (client, store) = categories();
        client.seed_json(json!([{ "id": 1, "nome": "Sedan" }])).unwrap();

        assert_eq!(store.load().await, LoadStatus::Ready);
        assert_eq!(store.len(), 1);
        assert_eq!(store.find(EntityId(1)).unwrap().text("nome"), Some("Sedan"));

        store.remove(EntityId(1)).await.unwrap();
        assert_eq!(store.status(), LoadStatus::Ready);
        assert!(store.is_empty());
        assert!(client.is_empty());
    }

    #[tokio::test]
    async fn failed_load_keeps_message_and_previous_records() {
        let (client, store) = categories();
        client.seed_json(json!([{ "id": 1, "nome": "Sedan" }])).unwrap();
        store.load().await;

        client.fail_next(Verb::List, server_error());
        assert_eq!(store.load().await, LoadStatus::Failed);
        assert_eq!(
            store.last_error().as_deref(),
            Some("Erro ao carregar categorias. Tente novamente mais tarde.")
        );
        assert_eq!(store.len(), 1);

        assert_eq!(store.load().await, LoadStatus::Ready);
        assert!(store.last_error().is_none());
    }

    #[tokio::test]
    async fn fetch_returns_the_transport_error() {
        let (client, store) = categories();
        client.fail_next(Verb::List, TransportError::Network("refused".into()));
        assert_eq!(
            store.fetch().await.unwrap_err(),
            StoreError::Transport(TransportError::Network("refused".into()))
        );
        assert_eq!(store.status(), LoadStatus::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_loads_issue_one_fetch() {
        let (client, store) = categories();
        client.seed_json(json!([{ "id": 1 }, { "id": 2 }])).unwrap();
        client.set_latency(Duration::from_millis(50));

        let (first, second, third) = tokio::join!(store.load(), store.load(), store.load());
        assert_eq!(client.calls(Verb::List), 1);
        assert_eq!(first, LoadStatus::Ready);
        assert_eq!(second, LoadStatus::Loading);
        assert_eq!(third, LoadStatus::Loading);
        assert_eq!(store.status(), LoadStatus::Ready);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_load_restores_previous_status() {
        let (client, store) = categories();
        client.set_latency(Duration::from_secs(10));

        let outcome = tokio::time::timeout(Duration::from_millis(10), store.load()).await;
        assert!(outcome.is_err());
        assert_eq!(store.status(), LoadStatus::Idle);
    }

    #[tokio::test]
    async fn failed_remove_leaves_records_and_sets_error() {
        let (client, store) = categories();
        client.seed_json(json!([{ "id": 1 }, { "id": 2 }])).unwrap();
        store.load().await;

        client.fail_next(Verb::Delete, server_error());
        let err = store.remove(EntityId(2)).await.unwrap_err();
        assert_eq!(err, StoreError::Transport(server_error()));
        assert_eq!(store.len(), 2);
        assert!(store.contains(EntityId(2)));
        assert_eq!(store.last_error().as_deref(), Some("Erro ao excluir categoria."));
        assert_eq!(store.status(), LoadStatus::Ready);
    }

    #[tokio::test]
    async fn remove_of_unknown_id_skips_backend() {
        let (client, store) = categories();
        store.load().await;
        assert_eq!(
            store.remove(EntityId(7)).await.unwrap_err(),
            StoreError::NotInCollection(EntityId(7))
        );
        assert_eq!(client.calls(Verb::Delete), 0);
    }

    /// Takes its listing first, then answers late, like a slow backend
    /// whose response was built before a concurrent delete.
    struct StaleListing {
        inner: Arc<MemoryResourceClient>,
        delay: Duration,
    }

    #[async_trait::async_trait]
    impl ResourceClient for StaleListing {
        fn descriptor(&self) -> &Arc<ResourceDescriptor> {
            self.inner.descriptor()
        }

        async fn list(&self) -> Result<Vec<EntityRecord>, TransportError> {
            let records = self.inner.list().await;
            tokio::time::sleep(self.delay).await;
            records
        }

        async fn get(&self, id: EntityId) -> Result<EntityRecord, TransportError> {
            self.inner.get(id).await
        }

        async fn create(&self, record: &EntityRecord) -> Result<EntityRecord, TransportError> {
            self.inner.create(record).await
        }

        async fn update(
            &self,
            id: EntityId,
            record: &EntityRecord,
        ) -> Result<EntityRecord, TransportError> {
            self.inner.update(id, record).await
        }

        async fn delete(&self, id: EntityId) -> Result<(), TransportError> {
            self.inner.delete(id).await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn record_removed_during_a_load_stays_removed() {
        let (client, _) = categories();
        client.seed_json(json!([{ "id": 1 }, { "id": 2 }])).unwrap();
        let store = CollectionStore::new(Arc::new(StaleListing {
            inner: client.clone(),
            delay: Duration::from_millis(100),
        }));
        store.load().await;

        let (status, removed) = tokio::join!(store.load(), async {
            tokio::time::sleep(Duration::from_millis(1)).await;
            store.remove(EntityId(1)).await
        });
        removed.unwrap();
        assert_eq!(status, LoadStatus::Ready);
        assert!(client.stored(EntityId(1)).is_none());
        assert!(!store.contains(EntityId(1)));
        assert!(store.contains(EntityId(2)));

        // A later load is not affected by the earlier delete.
        client.seed_json(json!([{ "id": 1 }])).unwrap();
        store.load().await;
        assert!(store.contains(EntityId(1)));
    }

    fn named(id: i64, nome: &str) -> EntityRecord {
        let mut record = EntityRecord::persisted(EntityId(id), BTreeMap::new());
        record.set("nome", json!(nome));
        record
    }

    #[test]
    fn dedupe_keeps_first_occurrence() {
        let first = named(1, "a");
        let again = named(1, "b");
        let other = named(2, "c");
        let kept = dedupe("categorias", vec![first.clone(), again, other.clone()]);
        assert_eq!(kept, vec![first, other]);
    }

    #[tokio::test]
    async fn options_use_the_descriptor_label() {
        let (client, store) = categories();
        client
            .seed_json(json!([{ "id": 1, "nome": "Sedan", "descricao": "Quatro portas" }]))
            .unwrap();
        store.load().await;
        let options = store.options();
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].0, EntityId(1));
        assert!(!options[0].1.is_empty());
    }
}
