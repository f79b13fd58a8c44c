//! Observable entity trees for Trellis.
//!
//! - [`build_node`] / [`build_list_node`] turn entity metadata into store
//!   nodes: trees of observable field values
//! - [`make_form_node`] derives a form node, an editable copy that follows
//!   its source until disposed
//! - [`to_flat_values`] extracts plain JSON from any node
//! - [`reconcile`] plans how a form list follows its source list
//! - [`EditRegistry`] tracks which forms are in edit mode
//!
//! Validation is attached to every field as a memoized computed; nodes
//! aggregate it into `is_valid()` and `errors()`.
//!
//! All node handles are single-threaded (`Rc`) and cheap to clone.

#![forbid(unsafe_code)]

mod assign;
mod builder;
mod error;
mod field;
mod flatten;
mod form;
mod list;
mod node;
mod object;
mod reconcile;
mod registry;

pub use builder::{build_list_node, build_node};
pub use error::{StoreError, StoreResult};
pub use field::EntityField;
pub use flatten::to_flat_values;
pub use form::{EditCondition, FormOptions, make_form_list, make_form_node, make_form_object};
pub use list::ListNode;
pub use node::{Node, NodeId};
pub use object::ObjectNode;
pub use reconcile::{Slot, reconcile};
pub use registry::EditRegistry;
