//! Form nodes: editable copies of store nodes that follow their source.
//!
//! A form node has the shape of its source and its own observable values,
//! so local edits never reach the source. While subscribed, every change
//! to the source re-syncs the form. Form lists are reconciled with
//! [`reconcile`], which keeps elements created locally. An explicit
//! `reset()` rebuilds the form from the source and discards them.
//!
//! Edit state is layered: a node is in edit mode when its own flag is set,
//! its parent is in edit mode, and the root's optional condition holds.
//! Validity is only enforced in edit mode.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::debug;
use trellis_reactive::{Computed, Observable, Reaction, batch};

use crate::assign;
use crate::builder::{build_list, build_object};
use crate::error::{StoreError, StoreResult};
use crate::flatten::{flatten_object, to_flat_values};
use crate::list::ListNode;
use crate::node::{Node, NodeId, SourceRef};
use crate::object::ObjectNode;
use crate::reconcile::{PlanSummary, Slot, reconcile};
use crate::registry::EditRegistry;

/// Extra gate on a form root's edit mode, fixed at creation.
#[derive(Clone)]
pub enum EditCondition {
    Fixed(bool),
    /// Re-evaluated reactively; observables read inside are tracked.
    When(Rc<dyn Fn() -> bool>),
}

impl EditCondition {
    pub fn when(predicate: impl Fn() -> bool + 'static) -> Self {
        Self::When(Rc::new(predicate))
    }

    fn evaluate(&self) -> bool {
        match self {
            Self::Fixed(value) => *value,
            Self::When(predicate) => predicate(),
        }
    }
}

impl fmt::Debug for EditCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(value) => f.debug_tuple("Fixed").field(value).finish(),
            Self::When(_) => f.write_str("When(..)"),
        }
    }
}

/// Options for [`make_form_node`].
#[derive(Debug, Clone)]
pub struct FormOptions {
    is_empty: bool,
    initial_edit: bool,
    condition: Option<EditCondition>,
    subscribe: bool,
    registry: Option<EditRegistry>,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            is_empty: false,
            initial_edit: false,
            condition: None,
            subscribe: true,
            registry: None,
        }
    }
}

impl FormOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Leave the form's values unseeded. It still follows its source once
    /// the source changes.
    #[must_use]
    pub fn empty(mut self, is_empty: bool) -> Self {
        self.is_empty = is_empty;
        self
    }

    /// Initial value of the root's own edit flag. Defaults to `false`.
    #[must_use]
    pub fn initial_edit(mut self, edit: bool) -> Self {
        self.initial_edit = edit;
        self
    }

    #[must_use]
    pub fn edit_condition(mut self, condition: EditCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    #[must_use]
    pub fn edit_when(self, predicate: impl Fn() -> bool + 'static) -> Self {
        self.edit_condition(EditCondition::when(predicate))
    }

    /// Whether the form follows its source. Defaults to `true`.
    #[must_use]
    pub fn subscribe(mut self, subscribe: bool) -> Self {
        self.subscribe = subscribe;
        self
    }

    #[must_use]
    pub fn registry(mut self, registry: &EditRegistry) -> Self {
        self.registry = Some(registry.clone());
        self
    }
}

/// How a form node's edit state is derived.
pub(crate) struct FormSeed {
    local_edit: bool,
    parent: Option<Computed<bool>>,
    condition: Option<EditCondition>,
}

impl FormSeed {
    fn root(options: &FormOptions) -> Self {
        Self {
            local_edit: options.initial_edit,
            parent: None,
            condition: options.condition.clone(),
        }
    }

    /// Seed for a node nested under `parent`: editable as soon as the
    /// parent is.
    pub(crate) fn nested(parent: &FormState) -> Self {
        Self {
            local_edit: true,
            parent: Some(parent.is_edit.clone()),
            condition: None,
        }
    }
}

/// Form state of an object or list node.
pub(crate) struct FormState {
    local_edit: Observable<bool>,
    pub(crate) is_edit: Computed<bool>,
    subscription: RefCell<Option<Reaction>>,
    registry: RefCell<Option<EditRegistry>>,
}

impl FormState {
    pub(crate) fn new(seed: FormSeed) -> Self {
        let local_edit = Observable::new(seed.local_edit);
        let is_edit = {
            let local = local_edit.clone();
            let FormSeed {
                parent, condition, ..
            } = seed;
            Computed::new(move || {
                local.get()
                    && parent.as_ref().is_none_or(Computed::get)
                    && condition.as_ref().is_none_or(EditCondition::evaluate)
            })
        };
        Self {
            local_edit,
            is_edit,
            subscription: RefCell::new(None),
            registry: RefCell::new(None),
        }
    }

    fn register(&self, id: NodeId, registry: &EditRegistry) {
        registry.register(id, self.is_edit.clone());
        *self.registry.borrow_mut() = Some(registry.clone());
    }

    fn subscribe(&self, id: NodeId, source: SourceRef, sync: impl Fn() + 'static) {
        if self.subscription.borrow().is_some() {
            return;
        }
        let reaction = Reaction::new(
            format!("form-sync {id}"),
            move || {
                if let Some(node) = source.upgrade() {
                    to_flat_values(&node);
                }
            },
            move |()| sync(),
        );
        debug!(
            node = %id,
            deps = reaction.dependency_count(),
            "Form node subscribed to source"
        );
        *self.subscription.borrow_mut() = Some(reaction);
    }

    fn unsubscribe(&self, id: NodeId) {
        let reaction = self.subscription.borrow_mut().take();
        if let Some(reaction) = reaction {
            reaction.dispose();
            debug!(node = %id, "Form node unsubscribed from source");
        }
    }

    fn is_subscribed(&self) -> bool {
        self.subscription.borrow().is_some()
    }

    /// Stops following the source and leaves the registry. Idempotent.
    pub(crate) fn release(&self, id: NodeId) {
        self.unsubscribe(id);
        let registry = self.registry.borrow_mut().take();
        if let Some(registry) = registry {
            registry.unregister(id);
        }
    }
}

/// Derives a form node from a store object or list node.
///
/// Fails with [`StoreError::FieldFormRoot`] for a bare field and with
/// [`StoreError::FormOfForm`] if `source` is itself part of a form.
pub fn make_form_node(source: &Node, options: FormOptions) -> StoreResult<Node> {
    match source {
        Node::Field(_) => Err(StoreError::FieldFormRoot),
        Node::Object(object) => make_form_object(object, options).map(Node::Object),
        Node::List(list) => make_form_list(list, options).map(Node::List),
    }
}

pub fn make_form_object(source: &ObjectNode, options: FormOptions) -> StoreResult<ObjectNode> {
    if source.is_form() {
        return Err(StoreError::FormOfForm);
    }
    let form = build_object(
        source.entity(),
        Some(FormSeed::root(&options)),
        Some(source),
    );
    if !options.is_empty {
        batch(|| sync_object(&form, source, SyncMode::Reset));
    }
    let state = form.form_state()?;
    if let Some(registry) = &options.registry {
        state.register(form.id(), registry);
    }
    if options.subscribe {
        form.subscribe()?;
    }
    debug!(
        node = %form.id(),
        source = %source.id(),
        entity = %source.entity().name(),
        "Form node created"
    );
    Ok(form)
}

pub fn make_form_list(source: &ListNode, options: FormOptions) -> StoreResult<ListNode> {
    if source.is_form() {
        return Err(StoreError::FormOfForm);
    }
    let form = build_list(
        source.entity(),
        Some(FormSeed::root(&options)),
        Some(source),
    );
    if !options.is_empty {
        batch(|| sync_list(&form, source, SyncMode::Reset));
    }
    let state = form.form_state()?;
    if let Some(registry) = &options.registry {
        state.register(form.id(), registry);
    }
    if options.subscribe {
        form.subscribe()?;
    }
    debug!(
        node = %form.id(),
        source = %source.id(),
        entity = %source.entity().name(),
        "Form list created"
    );
    Ok(form)
}

impl ObjectNode {
    fn form_state(&self) -> StoreResult<&FormState> {
        self.inner()
            .form
            .as_ref()
            .ok_or_else(|| StoreError::NotAForm(format!("object node {}", self.id())))
    }

    fn live_source(&self) -> StoreResult<ObjectNode> {
        let source = self
            .inner()
            .source
            .as_ref()
            .ok_or(StoreError::MissingSource(self.id()))?;
        match source.upgrade() {
            Some(Node::Object(object)) => Ok(object),
            _ => Err(StoreError::SourceDropped(self.id())),
        }
    }

    /// Always `false` for store nodes.
    pub fn is_edit(&self) -> bool {
        self.inner()
            .form
            .as_ref()
            .is_some_and(|form| form.is_edit.get())
    }

    pub fn set_edit(&self, edit: bool) -> StoreResult<()> {
        self.form_state()?.local_edit.set(edit);
        Ok(())
    }

    /// Clears the form and copies its source again. List elements that
    /// only exist in the form are discarded.
    pub fn reset(&self) -> StoreResult<()> {
        self.form_state()?;
        let source = self.live_source()?;
        batch(|| {
            assign::clear_object(self);
            sync_object(self, &source, SyncMode::Reset);
        });
        debug!(node = %self.id(), source = %source.id(), "Form node reset");
        Ok(())
    }

    /// Follows the source until [`unsubscribe`](Self::unsubscribe) or
    /// [`dispose`](Self::dispose). Idempotent.
    pub fn subscribe(&self) -> StoreResult<()> {
        let state = self.form_state()?;
        let source = self
            .inner()
            .source
            .clone()
            .ok_or(StoreError::MissingSource(self.id()))?;
        let this = self.downgrade();
        state.subscribe(self.id(), source, move || {
            if let Some(inner) = this.upgrade() {
                ObjectNode::from_inner(inner).follow_source();
            }
        });
        Ok(())
    }

    pub fn unsubscribe(&self) -> StoreResult<()> {
        self.form_state()?.unsubscribe(self.id());
        Ok(())
    }

    pub fn is_subscribed(&self) -> bool {
        self.inner()
            .form
            .as_ref()
            .is_some_and(FormState::is_subscribed)
    }

    /// Unsubscribes and leaves the edit registry. The form keeps its
    /// values and stays editable. Idempotent.
    pub fn dispose(&self) -> StoreResult<()> {
        self.form_state()?.release(self.id());
        debug!(node = %self.id(), "Form node disposed");
        Ok(())
    }

    /// Whether the form's values differ from its source's. Tracked.
    pub fn is_dirty(&self) -> StoreResult<bool> {
        self.form_state()?;
        let source = self.live_source()?;
        Ok(flatten_object(self) != flatten_object(&source))
    }

    fn follow_source(&self) {
        match self.live_source() {
            Ok(source) => {
                batch(|| sync_object(self, &source, SyncMode::Carry));
                debug!(node = %self.id(), source = %source.id(), "Form node synced");
            }
            Err(err) => debug!(node = %self.id(), %err, "Skipping form sync"),
        }
    }
}

impl ListNode {
    fn form_state(&self) -> StoreResult<&FormState> {
        self.inner()
            .form
            .as_ref()
            .ok_or_else(|| StoreError::NotAForm(format!("list node {}", self.id())))
    }

    fn live_source(&self) -> StoreResult<ListNode> {
        let source = self
            .inner()
            .source
            .as_ref()
            .ok_or(StoreError::MissingSource(self.id()))?;
        match source.upgrade() {
            Some(Node::List(list)) => Ok(list),
            _ => Err(StoreError::SourceDropped(self.id())),
        }
    }

    pub fn is_edit(&self) -> bool {
        self.inner()
            .form
            .as_ref()
            .is_some_and(|form| form.is_edit.get())
    }

    pub fn set_edit(&self, edit: bool) -> StoreResult<()> {
        self.form_state()?.local_edit.set(edit);
        Ok(())
    }

    /// Rebuilds every element from the source list. Local-only elements
    /// are discarded.
    pub fn reset(&self) -> StoreResult<()> {
        self.form_state()?;
        let source = self.live_source()?;
        batch(|| sync_list(self, &source, SyncMode::Reset));
        debug!(node = %self.id(), source = %source.id(), "Form list reset");
        Ok(())
    }

    pub fn subscribe(&self) -> StoreResult<()> {
        let state = self.form_state()?;
        let source = self
            .inner()
            .source
            .clone()
            .ok_or(StoreError::MissingSource(self.id()))?;
        let this = self.downgrade();
        state.subscribe(self.id(), source, move || {
            if let Some(inner) = this.upgrade() {
                ListNode::from_inner(inner).follow_source();
            }
        });
        Ok(())
    }

    pub fn unsubscribe(&self) -> StoreResult<()> {
        self.form_state()?.unsubscribe(self.id());
        Ok(())
    }

    pub fn is_subscribed(&self) -> bool {
        self.inner()
            .form
            .as_ref()
            .is_some_and(FormState::is_subscribed)
    }

    pub fn dispose(&self) -> StoreResult<()> {
        self.form_state()?.release(self.id());
        debug!(node = %self.id(), "Form list disposed");
        Ok(())
    }

    pub fn is_dirty(&self) -> StoreResult<bool> {
        self.form_state()?;
        let source = self.live_source()?;
        Ok(to_flat_values(&Node::List(self.clone())) != to_flat_values(&Node::List(source)))
    }

    fn follow_source(&self) {
        match self.live_source() {
            Ok(source) => {
                batch(|| sync_list(self, &source, SyncMode::Carry));
                debug!(node = %self.id(), source = %source.id(), "Form list synced");
            }
            Err(err) => debug!(node = %self.id(), %err, "Skipping form sync"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SyncMode {
    /// Rebuild lists one element per source element.
    Reset,
    /// Reconcile lists, keeping matched and local-only elements.
    Carry,
}

/// Copies `source` into `target`. Reads are untracked.
fn sync_object(target: &ObjectNode, source: &ObjectNode, mode: SyncMode) {
    for (name, child) in target.children() {
        let Some(from) = source.child(&name) else {
            continue;
        };
        match (child, from) {
            (Node::Field(to), Node::Field(from)) => to.store(from.value_untracked()),
            (Node::Object(to), Node::Object(from)) => sync_object(&to, &from, mode),
            (Node::List(to), Node::List(from)) => sync_list(&to, &from, mode),
            _ => {}
        }
    }
}

fn sync_list(target: &ListNode, source: &ListNode, mode: SyncMode) {
    let sources = source.items_untracked();
    let next: Vec<ObjectNode> = match mode {
        SyncMode::Reset => sources
            .iter()
            .map(|from| element_from(target, from))
            .collect(),
        SyncMode::Carry => {
            let current = target.items_untracked();
            let keys: Vec<Option<NodeId>> = current.iter().map(ObjectNode::source_id).collect();
            let source_keys: Vec<NodeId> = sources.iter().map(ObjectNode::id).collect();
            let plan = reconcile(&keys, &source_keys);

            let summary = PlanSummary::of(&plan);
            debug!(
                node = %target.id(),
                carried = summary.carried,
                created = summary.created,
                local = summary.local,
                dropped = current.len() - summary.carried - summary.local,
                "Form list reconciled"
            );

            plan.into_iter()
                .map(|slot| match slot {
                    Slot::Carry {
                        target: t,
                        source: s,
                    } => {
                        let element = current[t].clone();
                        sync_object(&element, &sources[s], mode);
                        element
                    }
                    Slot::Create { source: s } => element_from(target, &sources[s]),
                    Slot::Local { target: t } => current[t].clone(),
                })
                .collect()
        }
    };
    target.replace_items(next);
}

/// A new form element linked to and seeded from `source`.
fn element_from(list: &ListNode, source: &ObjectNode) -> ObjectNode {
    let element = list.new_element(Some(source));
    sync_object(&element, source, SyncMode::Reset);
    element
}
