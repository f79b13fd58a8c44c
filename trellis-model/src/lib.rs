//! Entity metadata for Trellis.
//!
//! Static, immutable descriptions of data shapes:
//! - [`Domain`]: formatting and validation rules shared by many fields
//! - [`FieldEntry`], [`ObjectEntry`], [`ListEntry`]: the members of an entity
//! - [`Entity`]: a named collection of entries, composable into a DAG
//! - [`Validator`] / [`validate_field`]: the pure half of validation
//! - [`EntityCatalog`]: entities and domains loaded from configuration
//!
//! Nothing here is observable; the reactive trees built from this metadata
//! live in `trellis-store`.

mod catalog;
mod domain;
mod entity;
mod error;
mod validator;

pub use catalog::{CatalogConfig, EntityCatalog, EntityConfig, EntryConfig};
pub use domain::{DisplayFormat, Domain, FieldType};
pub use entity::{Entity, EntityBuilder, EntityEntry, FieldEntry, ListEntry, ObjectEntry};
pub use error::{ModelError, ModelResult};
pub use validator::{CustomValidator, Validator, messages, validate_field};
