//! Reactions: side effects driven by tracked expressions.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use tracing::trace;

use crate::runtime::{self, Atom, Derivation, DerivationId, Runnable};

struct ReactionInner<T> {
    id: DerivationId,
    name: String,
    expression: Box<dyn Fn() -> T>,
    effect: Box<dyn Fn(T)>,
    deps: RefCell<Vec<Rc<Atom>>>,
    scheduled: Cell<bool>,
    disposed: Cell<bool>,
    runs: Cell<u64>,
    this: Weak<ReactionInner<T>>,
}

impl<T: 'static> ReactionInner<T> {
    fn track_expression(&self) -> T {
        let (value, deps) = runtime::track(|| (self.expression)());
        let observer: Weak<dyn Derivation> = self.this.clone();
        runtime::rebind(self.id, &observer, &self.deps, deps);
        value
    }

    fn release(&self) {
        if !self.disposed.replace(true) {
            runtime::unbind(self.id, &self.deps);
        }
    }
}

impl<T: 'static> Derivation for ReactionInner<T> {
    fn on_stale(&self) {
        if self.disposed.get() || self.scheduled.replace(true) {
            return;
        }
        if let Some(this) = self.this.upgrade() {
            runtime::schedule(this);
        }
    }
}

impl<T: 'static> Runnable for ReactionInner<T> {
    fn run(&self) {
        self.scheduled.set(false);
        if self.disposed.get() {
            return;
        }
        let value = self.track_expression();
        if self.disposed.get() {
            return;
        }
        self.runs.set(self.runs.get() + 1);
        trace!(reaction = %self.name, run = self.runs.get(), "Running reaction effect");
        crate::batch(|| runtime::untracked(|| (self.effect)(value)));
    }

    fn cancel(&self) {
        self.scheduled.set(false);
    }
}

/// Runs an effect whenever a tracked expression's dependencies change.
///
/// The expression is evaluated once on creation to collect dependencies;
/// the effect runs only on subsequent changes, with the expression's fresh
/// result. The effect itself is untracked and runs inside a batch.
///
/// A `Reaction` owns its subscription: dropping it disposes it.
pub struct Reaction {
    id: DerivationId,
    name: String,
    inner: Rc<dyn ReactionHandle>,
}

trait ReactionHandle {
    fn dispose(&self);
    fn is_disposed(&self) -> bool;
    fn run_count(&self) -> u64;
    fn dependency_count(&self) -> usize;
}

impl<T: 'static> ReactionHandle for ReactionInner<T> {
    fn dispose(&self) {
        self.release();
    }

    fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    fn run_count(&self) -> u64 {
        self.runs.get()
    }

    fn dependency_count(&self) -> usize {
        self.deps.borrow().len()
    }
}

impl Reaction {
    /// Creates a reaction and collects its initial dependencies.
    pub fn new<T: 'static>(
        name: impl Into<String>,
        expression: impl Fn() -> T + 'static,
        effect: impl Fn(T) + 'static,
    ) -> Self {
        let name = name.into();
        let inner = Rc::new_cyclic(|this| ReactionInner {
            id: runtime::next_id(),
            name: name.clone(),
            expression: Box::new(expression),
            effect: Box::new(effect),
            deps: RefCell::new(Vec::new()),
            scheduled: Cell::new(false),
            disposed: Cell::new(false),
            runs: Cell::new(0),
            this: this.clone(),
        });
        let _ = inner.track_expression();
        trace!(
            reaction = %name,
            deps = inner.deps.borrow().len(),
            "Reaction created"
        );
        Self {
            id: inner.id,
            name,
            inner,
        }
    }

    /// Stops the reaction. Safe to call repeatedly.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }

    /// Number of times the effect has run.
    #[must_use]
    pub fn run_count(&self) -> u64 {
        self.inner.run_count()
    }

    #[must_use]
    pub fn dependency_count(&self) -> usize {
        self.inner.dependency_count()
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for Reaction {
    fn drop(&mut self) {
        self.inner.dispose();
    }
}

impl std::fmt::Debug for Reaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reaction")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("disposed", &self.is_disposed())
            .field("runs", &self.run_count())
            .finish()
    }
}
