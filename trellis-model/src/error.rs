//! Error types for entity metadata.

use thiserror::Error;

/// Result type for metadata construction.
pub type ModelResult<T> = Result<T, ModelError>;

/// Configuration errors raised while building entity metadata.
///
/// These are never recovered from: they mean the metadata handed to the
/// engine is inconsistent.
#[derive(Debug, Error)]
pub enum ModelError {
    /// An entity composes another entity that is not part of the catalog.
    #[error("entity `{entity}` is referenced by `{referenced_by}` but was not provided")]
    UnknownEntity {
        entity: String,
        referenced_by: String,
    },

    /// A catalog lookup for an entity that does not exist.
    #[error("entity `{0}` not found")]
    EntityNotFound(String),

    /// A field refers to a domain that is not part of the catalog.
    #[error("field `{entity}.{field}` uses unknown domain `{domain}`")]
    UnknownDomain {
        entity: String,
        field: String,
        domain: String,
    },

    /// Two entities share a name.
    #[error("entity `{0}` is defined more than once")]
    DuplicateEntity(String),

    /// Two domains share a name.
    #[error("domain `{0}` is defined more than once")]
    DuplicateDomain(String),

    /// An entity declares the same entry name twice.
    #[error("entity `{entity}` declares `{entry}` more than once")]
    DuplicateEntry { entity: String, entry: String },

    /// Entities compose each other in a loop.
    #[error("entity composition cycle: {0}")]
    CyclicEntity(String),

    /// The catalog document is not valid JSON for the expected shape.
    #[error("invalid catalog: {0}")]
    Serialization(#[from] serde_json::Error),
}
