//! Object nodes: one child per entity entry.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{Map, Value};
use trellis_model::{Entity, FieldEntry};
use trellis_reactive::{Computed, batch, untracked};

use crate::assign;
use crate::error::{StoreError, StoreResult};
use crate::field::EntityField;
use crate::flatten::to_flat_values;
use crate::form::FormState;
use crate::list::ListNode;
use crate::node::{Node, NodeId, SourceRef};

pub(crate) struct ObjectInner {
    id: NodeId,
    entity: Arc<Entity>,
    children: RefCell<IndexMap<String, Node>>,
    validity: Computed<bool>,
    pub(crate) form: Option<FormState>,
    pub(crate) source: Option<SourceRef>,
}

impl ObjectInner {
    fn compute_validity(&self) -> bool {
        if let Some(form) = &self.form
            && !form.is_edit.get()
        {
            return true;
        }
        self.children.borrow().values().all(Node::is_valid)
    }
}

impl Drop for ObjectInner {
    fn drop(&mut self) {
        if let Some(form) = &self.form {
            form.release(self.id);
        }
    }
}

/// An ordered map of child nodes mirroring an [`Entity`].
///
/// Cloning yields another handle to the same node.
#[derive(Clone)]
pub struct ObjectNode {
    inner: Rc<ObjectInner>,
}

impl ObjectNode {
    pub(crate) fn new(
        entity: &Arc<Entity>,
        children: IndexMap<String, Node>,
        form: Option<FormState>,
        source: Option<SourceRef>,
    ) -> Self {
        let inner = Rc::new_cyclic(|this: &Weak<ObjectInner>| {
            let this = this.clone();
            ObjectInner {
                id: NodeId::next(),
                entity: Arc::clone(entity),
                children: RefCell::new(children),
                validity: Computed::new(move || {
                    this.upgrade().is_none_or(|inner| inner.compute_validity())
                }),
                form,
                source,
            }
        });
        Self { inner }
    }

    pub(crate) fn from_inner(inner: Rc<ObjectInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn downgrade(&self) -> Weak<ObjectInner> {
        Rc::downgrade(&self.inner)
    }

    pub(crate) fn inner(&self) -> &ObjectInner {
        &self.inner
    }

    pub fn id(&self) -> NodeId {
        self.inner.id
    }

    pub fn entity(&self) -> &Arc<Entity> {
        &self.inner.entity
    }

    pub fn is_form(&self) -> bool {
        self.inner.form.is_some()
    }

    /// Id of the node this form node was derived from.
    pub fn source_id(&self) -> Option<NodeId> {
        self.inner.source.as_ref().map(SourceRef::id)
    }

    /// The node this form node was derived from, while it is alive.
    pub fn source_node(&self) -> Option<Node> {
        self.inner.source.as_ref().and_then(SourceRef::upgrade)
    }

    pub fn child(&self, name: &str) -> Option<Node> {
        self.inner.children.borrow().get(name).cloned()
    }

    pub fn field(&self, name: &str) -> Option<EntityField> {
        match self.child(name)? {
            Node::Field(field) => Some(field),
            _ => None,
        }
    }

    pub fn object(&self, name: &str) -> Option<ObjectNode> {
        match self.child(name)? {
            Node::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn list(&self, name: &str) -> Option<ListNode> {
        match self.child(name)? {
            Node::List(list) => Some(list),
            _ => None,
        }
    }

    /// Children in entity order, computed fields last.
    pub fn children(&self) -> Vec<(String, Node)> {
        self.inner
            .children
            .borrow()
            .iter()
            .map(|(name, node)| (name.clone(), node.clone()))
            .collect()
    }

    /// Assigns a plain value tree.
    ///
    /// Keys absent from `value` are left untouched; `Null` clears the node.
    /// The whole value is checked against the node's shape before anything
    /// is written.
    pub fn set(&self, value: &Value) -> StoreResult<()> {
        assign::check_object(self, value, "")?;
        batch(|| assign::apply_object(self, value));
        Ok(())
    }

    /// Assigns the flattened values of another node.
    pub fn set_from(&self, node: &Node) -> StoreResult<()> {
        let value = untracked(|| to_flat_values(node));
        self.set(&value)
    }

    /// Sets every stored field below this node to `Null` and empties every
    /// list.
    pub fn clear(&self) {
        batch(|| assign::clear_object(self));
    }

    /// Memoized validity of the subtree. Form nodes outside edit mode are
    /// always valid.
    pub fn is_valid(&self) -> bool {
        self.inner.validity.get()
    }

    /// The node's shape with each field replaced by its error or `Null`.
    pub fn errors(&self) -> Value {
        let mut map = Map::new();
        for (name, child) in self.children() {
            map.insert(name, child.errors());
        }
        Value::Object(map)
    }

    /// Adds a read-only field derived from this node.
    ///
    /// The field is validated like any other but skipped by `set`,
    /// flattening, and form derivation.
    pub fn add_computed_field(
        &self,
        entry: FieldEntry,
        compute: impl Fn(&ObjectNode) -> Value + 'static,
    ) -> StoreResult<EntityField> {
        let name = entry.name.clone();
        if self.inner.children.borrow().contains_key(&name) {
            return Err(StoreError::DuplicateField {
                entity: self.inner.entity.name().to_string(),
                field: name,
            });
        }

        let this = self.downgrade();
        let field = EntityField::derived(Arc::new(entry), move || {
            this.upgrade()
                .map_or(Value::Null, |inner| compute(&ObjectNode::from_inner(inner)))
        });
        self.inner
            .children
            .borrow_mut()
            .insert(name, Node::Field(field.clone()));
        self.inner.validity.invalidate();
        Ok(field)
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for ObjectNode {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for ObjectNode {}

impl fmt::Debug for ObjectNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectNode")
            .field("id", &self.id())
            .field("entity", &self.entity().name())
            .field("form", &self.is_form())
            .field("source", &self.source_id())
            .finish()
    }
}
