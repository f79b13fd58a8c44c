//! Observable values.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::runtime::Atom;

struct ObservableInner<T> {
    atom: Rc<Atom>,
    value: RefCell<T>,
    version: Cell<u64>,
}

/// A shared, version-tracked value whose reads are recorded as dependencies
/// and whose writes invalidate every computed or reaction that read it.
///
/// Cloning an `Observable` creates a new handle to the **same** value.
///
/// # Invariants
///
/// 1. Version increments exactly once per mutation that changes the value.
/// 2. [`set`](Observable::set) with a value equal to the current one is a
///    no-op (no version bump, no invalidation).
/// 3. Reads inside [`with`](Observable::with) must not write the same
///    observable (the value is borrowed for the duration of the closure).
pub struct Observable<T> {
    inner: Rc<ObservableInner<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observable")
            .field("value", &*self.inner.value.borrow())
            .field("version", &self.inner.version.get())
            .finish()
    }
}

impl<T: Default + 'static> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: 'static> Observable<T> {
    /// Creates a new observable holding `value`.
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(ObservableInner {
                atom: Atom::new(),
                value: RefCell::new(value),
                version: Cell::new(0),
            }),
        }
    }

    /// Accesses the value by reference, recording the read.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.inner.atom.report_observed();
        f(&self.inner.value.borrow())
    }

    /// Accesses the value by reference without recording the read.
    pub fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Mutates the value in place and notifies observers unconditionally.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        {
            let mut value = self.inner.value.borrow_mut();
            f(&mut value);
        }
        self.bump();
    }

    /// Replaces the value, notifying observers unconditionally, and returns
    /// the previous one.
    pub fn replace(&self, value: T) -> T {
        let previous = self.inner.value.replace(value);
        self.bump();
        previous
    }

    /// Number of mutations applied so far.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    /// Number of live computeds and reactions currently depending on this
    /// value.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.inner.atom.observer_count()
    }

    /// Whether both handles point at the same value.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn bump(&self) {
        self.inner.version.set(self.inner.version.get() + 1);
        self.inner.atom.report_changed();
    }
}

impl<T: Clone + 'static> Observable<T> {
    /// Returns a clone of the value, recording the read.
    #[must_use]
    pub fn get(&self) -> T {
        self.with(T::clone)
    }

    /// Returns a clone of the value without recording the read.
    #[must_use]
    pub fn get_untracked(&self) -> T {
        self.with_untracked(T::clone)
    }
}

impl<T: PartialEq + 'static> Observable<T> {
    /// Stores `value` if it differs from the current one.
    ///
    /// Returns `true` when the value changed.
    pub fn set(&self, value: T) -> bool {
        if *self.inner.value.borrow() == value {
            return false;
        }
        self.inner.value.replace(value);
        self.bump();
        true
    }
}
