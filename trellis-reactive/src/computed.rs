//! Lazy computed values that track their dependencies automatically.
//!
//! # Design
//!
//! [`Computed<T>`] wraps a compute function and its cached result. The
//! function's reads are tracked on every evaluation, so the dependency set
//! follows the data (a computed over a list picks up elements added later).
//! When any dependency changes, the cache is marked dirty and the change is
//! forwarded to whatever depends on the computed itself. The next read
//! recomputes.
//!
//! # Invariants
//!
//! 1. `get()` never returns a stale value.
//! 2. The compute function runs at most once per dependency change cycle.
//! 3. Version increments by exactly 1 per recomputation.
//!
//! # Failure Modes
//!
//! - **Compute function panics**: the computed stays dirty and retries on
//!   the next read.
//! - **Dependency dropped**: the computed keeps its last value and never
//!   becomes dirty again from that source.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::runtime::{self, Atom, Derivation, DerivationId};

struct ComputedInner<T> {
    id: DerivationId,
    /// Identity of the computed as a dependency of other derivations.
    atom: Rc<Atom>,
    compute: Box<dyn Fn() -> T>,
    cached: RefCell<Option<T>>,
    dirty: Cell<bool>,
    version: Cell<u64>,
    deps: RefCell<Vec<Rc<Atom>>>,
    this: Weak<ComputedInner<T>>,
}

impl<T: Clone + 'static> ComputedInner<T> {
    fn value(&self) -> T {
        if !self.dirty.get() {
            if let Some(value) = self.cached.borrow().as_ref() {
                return value.clone();
            }
        }

        // Cleared before evaluating so a dependency changing mid-compute
        // leaves the computed dirty.
        self.dirty.set(false);
        let guard = DirtyOnUnwind(&self.dirty);
        let (value, deps) = runtime::track(|| (self.compute)());
        drop(guard);
        let observer: Weak<dyn Derivation> = self.this.clone();
        runtime::rebind(self.id, &observer, &self.deps, deps);

        *self.cached.borrow_mut() = Some(value.clone());
        self.version.set(self.version.get() + 1);
        value
    }
}

/// Marks the computed dirty again when its compute function panics.
struct DirtyOnUnwind<'a>(&'a Cell<bool>);

impl Drop for DirtyOnUnwind<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0.set(true);
        }
    }
}

impl<T> Derivation for ComputedInner<T> {
    fn on_stale(&self) {
        if !self.dirty.replace(true) {
            self.atom.report_changed();
        }
    }
}

impl<T> Drop for ComputedInner<T> {
    fn drop(&mut self) {
        runtime::unbind(self.id, &self.deps);
    }
}

/// A lazily evaluated, memoized value derived from observables and other
/// computeds.
///
/// Cloning a `Computed` creates a new handle to the **same** inner state.
pub struct Computed<T> {
    inner: Rc<ComputedInner<T>>,
}

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Computed<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Computed")
            .field("cached", &*self.inner.cached.borrow())
            .field("dirty", &self.inner.dirty.get())
            .field("version", &self.inner.version.get())
            .finish()
    }
}

impl<T: Clone + 'static> Computed<T> {
    /// Creates a computed from a compute function. Nothing runs until the
    /// first read.
    pub fn new(compute: impl Fn() -> T + 'static) -> Self {
        let inner = Rc::new_cyclic(|this| ComputedInner {
            id: runtime::next_id(),
            atom: Atom::new(),
            compute: Box::new(compute),
            cached: RefCell::new(None),
            dirty: Cell::new(true),
            version: Cell::new(0),
            deps: RefCell::new(Vec::new()),
            this: this.clone(),
        });
        Self { inner }
    }

    /// Returns the current value, recomputing first if any dependency
    /// changed. The read is recorded by an enclosing derivation.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.atom.report_observed();
        self.inner.value()
    }

    /// Like [`get`](Computed::get) but not recorded as a dependency.
    #[must_use]
    pub fn get_untracked(&self) -> T {
        self.inner.value()
    }

    /// Whether the cached value is stale.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.inner.dirty.get()
    }

    /// Forces the next read to recompute.
    pub fn invalidate(&self) {
        self.inner.on_stale();
    }

    /// Current version number. Increments by 1 on each recomputation.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    /// Number of dependencies recorded during the last evaluation.
    #[must_use]
    pub fn dependency_count(&self) -> usize {
        self.inner.deps.borrow().len()
    }
}
