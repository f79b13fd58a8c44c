//! Error types for store and form nodes.

use thiserror::Error;

use crate::NodeId;

/// Result type for store and form operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Configuration errors raised by node construction and mutation.
///
/// Validation failures are not errors: they are read as data from
/// [`EntityField::error`](crate::EntityField::error).
#[derive(Debug, Error)]
pub enum StoreError {
    /// A value carries a key the target entity does not declare.
    #[error("`{property}` is not a property of entity `{entity}`")]
    UnknownProperty { entity: String, property: String },

    /// A value has the wrong JSON kind for the node it is assigned to.
    #[error("expected {expected} at `{path}`, got {found}")]
    TypeMismatch {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    /// Assignment to a computed field.
    #[error("field `{0}` is computed and cannot be assigned")]
    ReadOnlyField(String),

    /// A computed field would shadow an existing member.
    #[error("entity `{entity}` already has a member named `{field}`")]
    DuplicateField { entity: String, field: String },

    /// A form node cannot be derived from another form node.
    #[error("cannot build a form node from another form node")]
    FormOfForm,

    /// A form node cannot be derived from a lone field.
    #[error("cannot build a form node from a bare field")]
    FieldFormRoot,

    /// A form-only operation was called on a store node.
    #[error("{0} is not a form node")]
    NotAForm(String),

    /// A form operation needs a source node and this one has none.
    #[error("form node {0} has no source node")]
    MissingSource(NodeId),

    /// The source node was dropped; the form node is inert.
    #[error("source of form node {0} has been dropped")]
    SourceDropped(NodeId),
}
