//! Two-step delete: ask, then remove through the collection store.
//!
//! `Idle -> Pending(target, prompt) -> Idle`
//!
//! A pending request is only meaningful while its target is still in the
//! collection. If the target disappears, the request reads as idle and a
//! `confirm` does nothing remote.

use std::sync::Arc;

use tracing::{debug, info};

use autodrive_core::EntityId;

use crate::error::StoreError;
use crate::messages;
use crate::store::CollectionStore;

/// Observable state of a [`ConfirmationWorkflow`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation {
    Idle,
    Pending { target: EntityId, prompt: String },
}

/// Result of [`ConfirmationWorkflow::confirm`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// There was no request to confirm.
    NothingPending,
    /// The target had already left the collection; nothing was sent.
    TargetGone(EntityId),
    /// The backend deleted the target and it left the collection.
    Removed { target: EntityId, message: String },
    /// The delete failed; the collection is unchanged.
    Failed {
        target: EntityId,
        message: String,
        error: StoreError,
    },
}

/// Delete confirmation bound to one collection store.
pub struct ConfirmationWorkflow {
    store: Arc<CollectionStore>,
    state: Confirmation,
}

impl ConfirmationWorkflow {
    #[must_use]
    pub fn new(store: Arc<CollectionStore>) -> Self {
        Self {
            store,
            state: Confirmation::Idle,
        }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<CollectionStore> {
        &self.store
    }

    /// Current state; a request whose target left the collection reads as idle.
    #[must_use]
    pub fn state(&self) -> Confirmation {
        match &self.state {
            Confirmation::Pending { target, .. } if !self.store.contains(*target) => {
                Confirmation::Idle
            }
            state => state.clone(),
        }
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self.state(), Confirmation::Pending { .. })
    }

    /// Asks to delete `target`. A request already pending is replaced.
    ///
    /// Returns the prompt to show, e.g. "Tem certeza que deseja excluir a venda ID: 3?".
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotInCollection`] if the store does not hold
    /// `target`; the workflow is left as it was.
    pub fn request(&mut self, target: EntityId) -> Result<String, StoreError> {
        if !self.store.contains(target) {
            return Err(StoreError::NotInCollection(target));
        }
        let prompt = messages::delete_prompt(self.store.descriptor().noun(), target);
        debug!(resource = self.store.descriptor().name(), %target, "delete requested");
        self.state = Confirmation::Pending {
            target,
            prompt: prompt.clone(),
        };
        Ok(prompt)
    }

    /// Removes the pending target through the store. The workflow is idle
    /// afterwards whatever the outcome.
    pub async fn confirm(&mut self) -> ConfirmOutcome {
        let Confirmation::Pending { target, .. } =
            std::mem::replace(&mut self.state, Confirmation::Idle)
        else {
            return ConfirmOutcome::NothingPending;
        };
        if !self.store.contains(target) {
            debug!(%target, "delete target already gone");
            return ConfirmOutcome::TargetGone(target);
        }

        let noun = *self.store.descriptor().noun();
        match self.store.remove(target).await {
            Ok(()) => {
                info!(resource = self.store.descriptor().name(), %target, "delete confirmed");
                ConfirmOutcome::Removed {
                    target,
                    message: messages::deleted(&noun),
                }
            }
            Err(error) => ConfirmOutcome::Failed {
                target,
                message: messages::delete_failed(&noun),
                error,
            },
        }
    }

    /// Drops the pending request without side effects. Returns whether there
    /// was one.
    pub fn cancel(&mut self) -> bool {
        let was_pending = self.is_pending();
        self.state = Confirmation::Idle;
        was_pending
    }
}

#[cfg(test)]
mod tests {
    use autodrive_core::{Catalog, TransportError};
    use serde_json::json;

    use super::*;
    use crate::client::{MemoryBackend, MemoryResourceClient, Verb};

    async fn sales() -> (Arc<MemoryResourceClient>, ConfirmationWorkflow) {
        let backend = MemoryBackend::new(Arc::new(Catalog::autodrive().unwrap()));
        let client = backend.resource("vendas").unwrap();
        client
            .seed_json(json!([{ "id": 3, "valorFinal": 45000 }, { "id": 4 }]))
            .unwrap();
        let store = Arc::new(CollectionStore::new(client.clone()));
        store.load().await;
        (client, ConfirmationWorkflow::new(store))
    }

    #[tokio::test]
    async fn request_then_cancel_changes_nothing() {
        let (client, mut workflow) = sales().await;
        let before = workflow.store().snapshot();

        assert_eq!(
            workflow.request(EntityId(3)).unwrap(),
            "Tem certeza que deseja excluir a venda ID: 3?"
        );
        assert!(workflow.is_pending());
        assert!(workflow.cancel());

        assert_eq!(workflow.state(), Confirmation::Idle);
        assert_eq!(workflow.store().snapshot(), before);
        assert_eq!(client.calls(Verb::Delete), 0);
    }

    #[tokio::test]
    async fn confirm_removes_the_target() {
        let (client, mut workflow) = sales().await;
        workflow.request(EntityId(3)).unwrap();

        assert_eq!(
            workflow.confirm().await,
            ConfirmOutcome::Removed {
                target: EntityId(3),
                message: "Venda excluída com sucesso!".into()
            }
        );
        assert_eq!(workflow.state(), Confirmation::Idle);
        assert!(!workflow.store().contains(EntityId(3)));
        assert_eq!(workflow.store().len(), 1);
        assert!(client.stored(EntityId(3)).is_none());
    }

    #[tokio::test]
    async fn failed_confirm_returns_to_idle_and_keeps_records() {
        let (client, mut workflow) = sales().await;
        client.fail_next(
            Verb::Delete,
            TransportError::Status {
                status: 409,
                body: "sale has payments".into(),
            },
        );
        workflow.request(EntityId(4)).unwrap();

        let outcome = workflow.confirm().await;
        assert!(matches!(
            &outcome,
            ConfirmOutcome::Failed { target: EntityId(4), message, .. } if message == "Erro ao excluir venda."
        ));
        assert_eq!(workflow.state(), Confirmation::Idle);
        assert_eq!(workflow.store().len(), 2);
        assert_eq!(
            workflow.store().last_error().as_deref(),
            Some("Erro ao excluir venda.")
        );
    }

    #[tokio::test]
    async fn idle_confirm_and_cancel_are_no_ops() {
        let (client, mut workflow) = sales().await;
        assert_eq!(workflow.confirm().await, ConfirmOutcome::NothingPending);
        assert!(!workflow.cancel());
        assert_eq!(client.calls(Verb::Delete), 0);
    }

    #[tokio::test]
    async fn request_requires_a_held_target() {
        let (_, mut workflow) = sales().await;
        assert_eq!(
            workflow.request(EntityId(99)).unwrap_err(),
            StoreError::NotInCollection(EntityId(99))
        );
        assert_eq!(workflow.state(), Confirmation::Idle);
    }

    #[tokio::test]
    async fn request_lapses_when_target_leaves_the_collection() {
        let (client, mut workflow) = sales().await;
        workflow.request(EntityId(3)).unwrap();

        workflow.store().remove(EntityId(3)).await.unwrap();
        assert_eq!(workflow.state(), Confirmation::Idle);
        assert_eq!(
            workflow.confirm().await,
            ConfirmOutcome::TargetGone(EntityId(3))
        );
        assert_eq!(client.calls(Verb::Delete), 1);
    }

    #[tokio::test]
    async fn new_request_replaces_the_pending_one() {
        let (_, mut workflow) = sales().await;
        workflow.request(EntityId(3)).unwrap();
        workflow.request(EntityId(4)).unwrap();
        assert!(matches!(
            workflow.state(),
            Confirmation::Pending { target: EntityId(4), .. }
        ));
    }
}
