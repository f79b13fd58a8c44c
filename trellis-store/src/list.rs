//! List nodes: an observable sequence of object nodes of one entity.

use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use serde_json::Value;
use tracing::trace;
use trellis_model::Entity;
use trellis_reactive::{Computed, Observable, batch};

use crate::assign;
use crate::builder::build_object;
use crate::error::StoreResult;
use crate::form::{FormSeed, FormState};
use crate::node::{Node, NodeId, SourceRef};
use crate::object::ObjectNode;

pub(crate) struct ListInner {
    id: NodeId,
    entity: Arc<Entity>,
    items: Observable<Vec<ObjectNode>>,
    validity: Computed<bool>,
    pub(crate) form: Option<FormState>,
    pub(crate) source: Option<SourceRef>,
}

impl Drop for ListInner {
    fn drop(&mut self) {
        if let Some(form) = &self.form {
            form.release(self.id);
        }
    }
}

/// An observable, ordered list of [`ObjectNode`]s sharing one element
/// entity.
#[derive(Clone)]
pub struct ListNode {
    inner: Rc<ListInner>,
}

impl ListNode {
    pub(crate) fn new(
        entity: &Arc<Entity>,
        form: Option<FormState>,
        source: Option<SourceRef>,
    ) -> Self {
        let items: Observable<Vec<ObjectNode>> = Observable::new(Vec::new());
        let validity = {
            let items = items.clone();
            let edit = form.as_ref().map(|form| form.is_edit.clone());
            Computed::new(move || {
                if edit.as_ref().is_some_and(|edit| !edit.get()) {
                    return true;
                }
                items.with(|items| items.iter().all(ObjectNode::is_valid))
            })
        };
        Self {
            inner: Rc::new(ListInner {
                id: NodeId::next(),
                entity: Arc::clone(entity),
                items,
                validity,
                form,
                source,
            }),
        }
    }

    pub(crate) fn from_inner(inner: Rc<ListInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn downgrade(&self) -> Weak<ListInner> {
        Rc::downgrade(&self.inner)
    }

    pub(crate) fn inner(&self) -> &ListInner {
        &self.inner
    }

    pub fn id(&self) -> NodeId {
        self.inner.id
    }

    /// The element entity.
    pub fn entity(&self) -> &Arc<Entity> {
        &self.inner.entity
    }

    pub fn is_form(&self) -> bool {
        self.inner.form.is_some()
    }

    pub fn source_id(&self) -> Option<NodeId> {
        self.inner.source.as_ref().map(SourceRef::id)
    }

    pub fn source_node(&self) -> Option<Node> {
        self.inner.source.as_ref().and_then(SourceRef::upgrade)
    }

    /// Snapshot of the elements. Tracked.
    pub fn items(&self) -> Vec<ObjectNode> {
        self.inner.items.get()
    }

    pub(crate) fn items_untracked(&self) -> Vec<ObjectNode> {
        self.inner.items.get_untracked()
    }

    pub fn get(&self, index: usize) -> Option<ObjectNode> {
        self.inner.items.with(|items| items.get(index).cloned())
    }

    pub fn len(&self) -> usize {
        self.inner.items.with(Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Position of `node` in the list.
    pub fn position(&self, node: &ObjectNode) -> Option<usize> {
        self.inner
            .items
            .with(|items| items.iter().position(|item| item == node))
    }

    /// Appends a new element seeded from `value`.
    pub fn push_node(&self, value: &Value) -> StoreResult<ObjectNode> {
        assign::check_element(&self.inner.entity, value, "")?;
        Ok(batch(|| {
            let element = self.seeded_element(value);
            self.inner.items.update(|items| items.push(element.clone()));
            element
        }))
    }

    /// Replaces every element with new ones seeded from an array. `Null`
    /// empties the list.
    pub fn set(&self, value: &Value) -> StoreResult<()> {
        assign::check_list(&self.inner.entity, value, "")?;
        batch(|| assign::apply_list(self, value));
        Ok(())
    }

    /// Removes `delete_count` elements starting at `start` and inserts new
    /// elements seeded from `values` in their place. Out-of-range bounds
    /// are clamped. Returns the removed elements.
    pub fn splice(
        &self,
        start: usize,
        delete_count: usize,
        values: &[Value],
    ) -> StoreResult<Vec<ObjectNode>> {
        for (i, value) in values.iter().enumerate() {
            assign::check_element(&self.inner.entity, value, &format!("[{i}]"))?;
        }
        Ok(batch(|| {
            let inserted: Vec<ObjectNode> =
                values.iter().map(|value| self.seeded_element(value)).collect();
            let mut removed = Vec::new();
            self.inner.items.update(|items| {
                let start = start.min(items.len());
                let end = start.saturating_add(delete_count).min(items.len());
                removed = items.splice(start..end, inserted).collect();
            });
            trace!(
                node = %self.id(),
                start,
                removed = removed.len(),
                inserted = values.len(),
                "List spliced"
            );
            removed
        }))
    }

    /// Removes `node` if it is an element of this list.
    pub fn remove(&self, node: &ObjectNode) -> bool {
        match self.position(node) {
            Some(index) => self.remove_at(index).is_some(),
            None => false,
        }
    }

    pub fn remove_at(&self, index: usize) -> Option<ObjectNode> {
        if index >= self.inner.items.with_untracked(Vec::len) {
            return None;
        }
        let mut removed = None;
        self.inner
            .items
            .update(|items| removed = Some(items.remove(index)));
        removed
    }

    /// Removes every element.
    pub fn clear(&self) {
        self.replace_items(Vec::new());
    }

    /// Memoized validity of every element. Form lists outside edit mode
    /// are always valid.
    pub fn is_valid(&self) -> bool {
        self.inner.validity.get()
    }

    /// One error object per element.
    pub fn errors(&self) -> Value {
        Value::Array(self.items().iter().map(ObjectNode::errors).collect())
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// A fresh element shaped like this list's elements. Elements of a
    /// form list are form nodes nested under the list's edit state, linked
    /// to `source` and its nested nodes.
    pub(crate) fn new_element(&self, source: Option<&ObjectNode>) -> ObjectNode {
        let seed = self.inner.form.as_ref().map(FormSeed::nested);
        build_object(&self.inner.entity, seed, source)
    }

    fn seeded_element(&self, value: &Value) -> ObjectNode {
        let element = self.new_element(None);
        assign::apply_object(&element, value);
        element
    }

    /// Swaps in a new element vector. Notifies only if membership or
    /// order changed.
    pub(crate) fn replace_items(&self, items: Vec<ObjectNode>) {
        self.inner.items.set(items);
    }
}

impl fmt::Debug for ListNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListNode")
            .field("id", &self.id())
            .field("entity", &self.entity().name())
            .field("len", &self.inner.items.with_untracked(Vec::len))
            .field("form", &self.is_form())
            .field("source", &self.source_id())
            .finish()
    }
}
