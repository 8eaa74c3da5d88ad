//! Edit session for a single record: load, field edits, submit.
//!
//! An editor owns one [`CollectionStore`] per resource kind its reference
//! fields point at. Those are loaded next to the record so every reference
//! can be shown (and picked) as a full record rather than a bare id.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures_util::future::{try_join, try_join_all};
use serde_json::Value;
use tracing::{debug, info, warn};

use autodrive_core::{
    dates, EntityId, EntityRecord, FieldDef, FieldInput, FieldKind, ResourceClient,
    ResourceDescriptor, TransportError, ValidationError,
};

use crate::client::ClientProvider;
use crate::error::{EditorError, RegistryError};
use crate::messages;
use crate::store::CollectionStore;

/// Whether the session creates a new record or edits an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditMode {
    Create,
    Edit(EntityId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorStatus {
    Idle,
    Loading,
    /// The record is loaded and can be edited and submitted.
    Ready,
    /// Loading failed; nothing is shown for editing.
    Failed,
}

/// Record returned by the backend after a successful submit.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Created(EntityRecord),
    Updated(EntityRecord),
}

impl SubmitOutcome {
    #[must_use]
    pub fn record(&self) -> &EntityRecord {
        match self {
            Self::Created(record) | Self::Updated(record) => record,
        }
    }
}

/// Form state for one record of one resource kind.
pub struct RecordEditor {
    client: Arc<dyn ResourceClient>,
    auxiliaries: BTreeMap<&'static str, CollectionStore>,
    mode: EditMode,
    record: EntityRecord,
    status: EditorStatus,
    error: Option<String>,
    notice: Option<String>,
}

impl RecordEditor {
    /// Builds an editor for `resource`, with clients for its own kind and for
    /// every kind its reference fields point at.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownResource`] if the provider does not
    /// serve `resource` or one of its referenced kinds.
    pub fn new(provider: &dyn ClientProvider, resource: &str) -> Result<Self, RegistryError> {
        let client = provider.client(resource)?;
        let auxiliaries = client
            .descriptor()
            .auxiliary_resources()
            .into_iter()
            .map(|name| Ok((name, CollectionStore::new(provider.client(name)?))))
            .collect::<Result<_, RegistryError>>()?;
        Ok(Self {
            client,
            auxiliaries,
            mode: EditMode::Create,
            record: EntityRecord::new(),
            status: EditorStatus::Idle,
            error: None,
            notice: None,
        })
    }

    #[must_use]
    pub fn descriptor(&self) -> &Arc<ResourceDescriptor> {
        self.client.descriptor()
    }

    #[must_use]
    pub fn mode(&self) -> EditMode {
        self.mode
    }

    #[must_use]
    pub fn status(&self) -> EditorStatus {
        self.status
    }

    /// Current edit state.
    #[must_use]
    pub fn record(&self) -> &EntityRecord {
        &self.record
    }

    /// User-facing message of the last failed load or submit.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// User-facing message of the last successful submit.
    #[must_use]
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// Collection backing the dropdowns that point at `resource`.
    #[must_use]
    pub fn auxiliary(&self, resource: &str) -> Option<&CollectionStore> {
        self.auxiliaries.get(resource)
    }

    /// Choices for the reference field `name`, as `(id, label)` pairs.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::Validation`] if `name` is not a reference field.
    pub fn options(&self, name: &str) -> Result<Vec<(EntityId, String)>, EditorError> {
        let field = self.descriptor().require_field(name)?;
        match field.kind {
            FieldKind::Reference { resource } => Ok(self
                .auxiliaries
                .get(resource)
                .map(CollectionStore::options)
                .unwrap_or_default()),
            _ => Err(kind_mismatch(field).into()),
        }
    }

    /// Starts a session for a new record: loads the dropdown collections and
    /// fills every field with its default.
    ///
    /// Returns whether the editor is ready for input.
    pub async fn load_for_create(&mut self) -> bool {
        self.begin(EditMode::Create);
        let loaded = self.load_auxiliaries().await;
        match loaded {
            Ok(()) => {
                self.record = self.descriptor().blank_record(&dates::today());
                self.ready()
            }
            Err(err) => self.fail_load(&err),
        }
    }

    /// Starts a session on record `id`, fetching it and the dropdown
    /// collections concurrently.
    ///
    /// Returns whether the editor is ready for input.
    pub async fn load_for_edit(&mut self, id: EntityId) -> bool {
        self.begin(EditMode::Edit(id));
        let this = &*self;
        let record = async { this.client.get(id).await.map_err(EditorError::from) };
        let loaded = try_join(record, this.load_auxiliaries()).await;
        match loaded {
            Ok((record, ())) => match self.prepare(record) {
                Ok(record) => {
                    self.record = record;
                    self.ready()
                }
                Err(err) => self.fail_load(&err),
            },
            Err(err) => self.fail_load(&err),
        }
    }

    /// Applies form input to field `name`.
    ///
    /// For a reference field the input is an identifier; it is replaced by the
    /// matching record of the auxiliary collection, or by `null` when nothing
    /// matches.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::NotReady`] outside a loaded session and
    /// [`EditorError::Validation`] for `id`, unknown names, or input that does
    /// not fit the field kind.
    pub fn set_field(
        &mut self,
        name: &str,
        input: impl Into<FieldInput>,
    ) -> Result<(), EditorError> {
        if self.status != EditorStatus::Ready {
            return Err(EditorError::NotReady);
        }
        let descriptor = Arc::clone(self.descriptor());
        let field = descriptor.require_field(name)?;
        let value = match field.kind {
            FieldKind::Reference { resource } => self.resolve_input(field, resource, input.into())?,
            _ => field.coerce(input.into())?,
        };
        self.record.set(field.name, value);
        self.notice = None;
        Ok(())
    }

    /// The record `submit` would send: `id` only in edit mode, references
    /// collapsed to `{ "id": n }`.
    #[must_use]
    pub fn payload(&self) -> EntityRecord {
        let record = match self.mode {
            EditMode::Create => self.record.without_id(),
            EditMode::Edit(id) => self.record.with_id(id),
        };
        collapse_references(self.descriptor(), record)
    }

    /// Sends the edit state: `create` in create mode, `update` of the session
    /// id in edit mode. A successful create switches the session to editing
    /// the new record.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::NotReady`] outside a loaded session and
    /// [`EditorError::Transport`] if the backend call fails. In the latter
    /// case the edit state is kept and [`error`](Self::error) holds the
    /// message to show.
    pub async fn submit(&mut self) -> Result<SubmitOutcome, EditorError> {
        if self.status != EditorStatus::Ready {
            return Err(EditorError::NotReady);
        }
        let resource = self.descriptor().name();
        let payload = self.payload();
        let result = match self.mode {
            EditMode::Create => self.client.create(&payload).await.map(SubmitOutcome::Created),
            EditMode::Edit(id) => self
                .client
                .update(id, &payload)
                .await
                .map(SubmitOutcome::Updated),
        };

        let noun = *self.descriptor().noun();
        match result {
            Ok(outcome) => {
                info!(resource, id = ?outcome.record().id(), "record saved");
                // Later submits update the record just created.
                if let (SubmitOutcome::Created(_), Some(id)) = (&outcome, outcome.record().id()) {
                    self.mode = EditMode::Edit(id);
                }
                self.error = None;
                self.notice = Some(match &outcome {
                    SubmitOutcome::Created(_) => messages::created(&noun),
                    SubmitOutcome::Updated(_) => messages::updated(&noun),
                });
                Ok(outcome)
            }
            Err(err) => {
                warn!(resource, error = %err, "save failed");
                self.error = Some(messages::save_failed(&noun));
                Err(err.into())
            }
        }
    }

    /// Abandons the session without touching the backend.
    pub fn cancel(&mut self) {
        self.record = EntityRecord::new();
        self.status = EditorStatus::Idle;
        self.error = None;
        self.notice = None;
    }

    fn begin(&mut self, mode: EditMode) {
        debug!(resource = self.descriptor().name(), ?mode, "edit session starting");
        self.mode = mode;
        self.record = EntityRecord::new();
        self.status = EditorStatus::Loading;
        self.error = None;
        self.notice = None;
    }

    fn ready(&mut self) -> bool {
        self.status = EditorStatus::Ready;
        true
    }

    fn fail_load(&mut self, err: &EditorError) -> bool {
        warn!(resource = self.descriptor().name(), mode = ?self.mode, error = %err, "edit session failed to load");
        let message = match err.transport() {
            Some(transport) if transport.is_not_found() => {
                messages::not_found(self.descriptor().noun())
            }
            _ => messages::edit_load_failed(),
        };
        self.record = EntityRecord::new();
        self.status = EditorStatus::Failed;
        self.error = Some(message);
        false
    }

    async fn load_auxiliaries(&self) -> Result<(), EditorError> {
        try_join_all(self.auxiliaries.values().map(|store| store.fetch())).await?;
        Ok(())
    }

    /// Canonicalizes dates and swaps every reference for the full auxiliary
    /// record it points at.
    ///
    /// A date that cannot be read fails the load; null and empty dates stay
    /// as they are.
    fn prepare(&self, mut record: EntityRecord) -> Result<EntityRecord, EditorError> {
        let descriptor = Arc::clone(self.descriptor());
        for field in descriptor.fields() {
            let value = match field.kind {
                FieldKind::Date { .. } => match record.get(field.name) {
                    None | Some(Value::Null) => None,
                    Some(Value::String(s)) if s.is_empty() => None,
                    Some(raw) => match dates::canonicalize(raw) {
                        Some(canonical) => Some(Value::String(canonical)),
                        None => {
                            return Err(TransportError::Decode(format!(
                                "{}: unreadable date {raw}",
                                field.name
                            ))
                            .into())
                        }
                    },
                },
                FieldKind::Reference { resource } => {
                    Some(self.resolve_loaded(&record, field, resource))
                }
                _ => None,
            };
            if let Some(value) = value {
                record.set(field.name, value);
            }
        }
        Ok(record)
    }

    fn resolve_loaded(&self, record: &EntityRecord, field: &FieldDef, resource: &str) -> Value {
        let current = record.get(field.name);
        let id = record
            .reference_id(field.name)
            .or_else(|| current.and_then(EntityId::from_json))
            .or_else(|| {
                record
                    .get(&field.flat_reference_key())
                    .and_then(EntityId::from_json)
            });
        let Some(id) = id else {
            return Value::Null;
        };
        match self.find(resource, id) {
            Some(full) => full.to_json(),
            None => {
                debug!(field = field.name, %id, "reference not found among loaded options");
                match current {
                    Some(nested @ Value::Object(_)) => nested.clone(),
                    _ => id.to_reference(),
                }
            }
        }
    }

    fn resolve_input(
        &self,
        field: &FieldDef,
        resource: &str,
        input: FieldInput,
    ) -> Result<Value, EditorError> {
        let FieldInput::Text(raw) = input else {
            return Err(kind_mismatch(field).into());
        };
        Ok(raw
            .parse::<EntityId>()
            .ok()
            .and_then(|id| self.find(resource, id))
            .map_or(Value::Null, |record| record.to_json()))
    }

    fn find(&self, resource: &str, id: EntityId) -> Option<EntityRecord> {
        self.auxiliaries.get(resource)?.find(id)
    }
}

fn kind_mismatch(field: &FieldDef) -> ValidationError {
    ValidationError::KindMismatch {
        field: field.name.to_string(),
        expected: field.kind.expected(),
    }
}

/// Replaces every reference field with `{ "id": n }`, or `null` when it
/// holds no identifier.
fn collapse_references(descriptor: &ResourceDescriptor, mut record: EntityRecord) -> EntityRecord {
    for (field, _) in descriptor.references() {
        let id = record.reference_id(field.name).or_else(|| {
            record
                .get(field.name)
                .filter(|v| !v.is_object())
                .and_then(EntityId::from_json)
        });
        record.set(field.name, id.map_or(Value::Null, EntityId::to_reference));
    }
    record
}
