//! `AutoDrive` Core: resource descriptors, entity records, canonical dates, and the wire codec.

pub mod catalog;
pub mod codec;
pub mod dates;
pub mod error;
pub mod schema;
pub mod traits;
pub mod types;

pub use catalog::Catalog;
pub use error::{SchemaError, TransportError, ValidationError};
pub use schema::{FieldDef, FieldInput, FieldKind, Gender, Noun, ResourceDescriptor};
pub use traits::ResourceClient;
pub use types::{EntityId, EntityRecord};
