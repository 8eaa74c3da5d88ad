//! Error taxonomy shared by every layer of the console.
//!
//! [`TransportError`] is what a `ResourceClient` returns when the remote call
//! fails. [`ValidationError`] rejects field input that does not fit the field's
//! kind. [`SchemaError`] is raised while building resource descriptors.

/// Failure of a remote call made by a `ResourceClient`.
///
/// A 404 is not a separate variant: it is `Status { status: 404, .. }`, and
/// callers that care use [`TransportError::is_not_found`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("request failed with HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("backend unreachable: {0}")]
    Network(String),
    #[error("malformed response body: {0}")]
    Decode(String),
}

impl TransportError {
    /// HTTP status of the failed response, if the backend answered at all.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Network(_) | Self::Decode(_) => None,
        }
    }

    /// Whether the backend reported the addressed record as missing.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Builds the 404 error for `/{resource}/{id}`.
    #[must_use]
    pub fn not_found(resource: &str, id: impl std::fmt::Display) -> Self {
        Self::Status {
            status: 404,
            body: format!("{resource}/{id} not found"),
        }
    }
}

/// Field input rejected before it reaches the edit state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("resource {resource} has no field named {field}")]
    UnknownField { resource: String, field: String },
    #[error("the identifier is assigned by the backend and cannot be edited")]
    IdentifierReadOnly,
    #[error("field {field} expects {expected}")]
    KindMismatch {
        field: String,
        expected: &'static str,
    },
    #[error("field {field}: {input:?} is not a number")]
    InvalidNumber { field: String, input: String },
    #[error("field {field}: {input:?} is not a YYYY-MM-DD date")]
    InvalidDate { field: String, input: String },
    #[error("field {field}: {input:?} is not one of the allowed options")]
    InvalidChoice { field: String, input: String },
}

/// Inconsistent resource descriptor or catalog.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("resource name must not be empty")]
    EmptyResourceName,
    #[error("resource {resource}: field {field} is declared twice")]
    DuplicateField { resource: String, field: String },
    #[error("resource {resource}: field name {field:?} is reserved")]
    ReservedField { resource: String, field: String },
    #[error("resource {resource}: reference field {field} has no target resource")]
    EmptyReference { resource: String, field: String },
    #[error("resource {resource}: choice field {field} has no options")]
    EmptyChoice { resource: String, field: String },
    #[error("resource {resource}: display field {field} is not declared")]
    UnknownDisplayField { resource: String, field: String },
    #[error("resource {resource} is registered twice")]
    DuplicateResource { resource: String },
    #[error("resource {resource}: field {field} references unknown resource {target}")]
    UnknownReferenceTarget {
        resource: String,
        field: String,
        target: String,
    },
}
