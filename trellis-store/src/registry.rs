//! Session-wide view of which forms are in edit mode.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::{debug, trace};
use trellis_reactive::{Computed, Observable};

use crate::node::NodeId;

#[derive(Default)]
struct RegistryInner {
    forms: RefCell<IndexMap<NodeId, Computed<bool>>>,
    /// Bumped on every membership change so readers re-run.
    revision: Observable<u64>,
}

/// Maps form node ids to their edit state.
///
/// Created by the caller and handed to forms through
/// [`FormOptions::registry`](crate::FormOptions::registry). Clones share
/// the same registry. All queries are tracked.
#[derive(Clone, Default)]
pub struct EditRegistry {
    inner: Rc<RegistryInner>,
}

impl EditRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register(&self, id: NodeId, is_edit: Computed<bool>) {
        self.inner.forms.borrow_mut().insert(id, is_edit);
        self.bump();
        trace!(node = %id, "Form registered for edit tracking");
    }

    /// Forgets a form. Returns whether it was registered.
    pub fn unregister(&self, id: NodeId) -> bool {
        let removed = self.inner.forms.borrow_mut().shift_remove(&id).is_some();
        if removed {
            self.bump();
            trace!(node = %id, "Form unregistered from edit tracking");
        }
        removed
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.inner.revision.with(|_| ());
        self.inner.forms.borrow().contains_key(&id)
    }

    /// Whether the form `id` is registered and in edit mode.
    pub fn is_editing(&self, id: NodeId) -> bool {
        self.inner.revision.with(|_| ());
        let is_edit = self.inner.forms.borrow().get(&id).cloned();
        is_edit.is_some_and(|is_edit| is_edit.get())
    }

    /// Whether any registered form is in edit mode.
    pub fn is_any_editing(&self) -> bool {
        self.snapshot().iter().any(|(_, is_edit)| is_edit.get())
    }

    /// Ids of the registered forms currently in edit mode, in registration
    /// order.
    pub fn editing(&self) -> Vec<NodeId> {
        self.snapshot()
            .into_iter()
            .filter(|(_, is_edit)| is_edit.get())
            .map(|(id, _)| id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.revision.with(|_| ());
        self.inner.forms.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forgets every form.
    pub fn clear(&self) {
        let forms = std::mem::take(&mut *self.inner.forms.borrow_mut());
        if !forms.is_empty() {
            self.bump();
        }
        debug!(forms = forms.len(), "Edit registry cleared");
    }

    fn snapshot(&self) -> Vec<(NodeId, Computed<bool>)> {
        self.inner.revision.with(|_| ());
        self.inner
            .forms
            .borrow()
            .iter()
            .map(|(id, is_edit)| (*id, is_edit.clone()))
            .collect()
    }

    fn bump(&self) {
        self.inner.revision.update(|revision| *revision += 1);
    }
}

impl fmt::Debug for EditRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditRegistry")
            .field("forms", &self.inner.forms.borrow().len())
            .finish()
    }
}
