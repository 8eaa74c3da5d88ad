//! Client-side state: collections, edit sessions, delete confirmation.

pub mod collection;
pub mod confirm;
pub mod editor;

pub use collection::{CollectionSnapshot, CollectionStore, LoadStatus};
pub use confirm::{ConfirmOutcome, Confirmation, ConfirmationWorkflow};
pub use editor::{EditMode, EditorStatus, RecordEditor, SubmitOutcome};
