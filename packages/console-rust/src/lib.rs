//! `AutoDrive` Console: REST resource clients, collection stores, record editor,
//! and delete confirmation for the dealership admin console.

pub mod client;
pub mod config;
pub mod error;
pub mod messages;
pub mod render;
pub mod store;
pub mod telemetry;

pub use client::{ClientProvider, HttpApi, MemoryBackend};
pub use config::{ConsoleConfig, LogFormat};
pub use error::{ClientError, EditorError, RegistryError, StoreError};
pub use store::{
    CollectionStore, ConfirmOutcome, ConfirmationWorkflow, LoadStatus, RecordEditor,
    SubmitOutcome,
};
