//! Thread-local dependency tracking.
//!
//! Every observable value owns an [`Atom`]. Reading a value while a
//! derivation (a computed or a reaction) is being evaluated records the atom
//! in the innermost tracking frame; afterwards the derivation subscribes to
//! exactly the atoms it read. Writing a value marks every observer stale.
//!
//! Reactions are never run synchronously from a write: they are queued and
//! drained when the outermost [`BatchScope`](crate::BatchScope) exits, so a
//! reaction always observes fully committed state.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::{Rc, Weak};

use tracing::error;

/// Upper bound on drain passes before the runtime assumes a reaction cycle.
pub(crate) const MAX_REACTION_ITERATIONS: usize = 100;

pub(crate) type DerivationId = u64;

/// Something that re-evaluates when one of its dependencies changes.
pub(crate) trait Derivation {
    fn on_stale(&self);
}

/// A scheduled unit of work (a reaction).
pub(crate) trait Runnable {
    fn run(&self);
    /// Drops a scheduled run without executing it.
    fn cancel(&self);
}

/// The identity of a single observable value.
pub(crate) struct Atom {
    id: u64,
    observers: RefCell<Vec<(DerivationId, Weak<dyn Derivation>)>>,
}

impl Atom {
    pub(crate) fn new() -> Rc<Self> {
        Rc::new(Self {
            id: next_id(),
            observers: RefCell::new(Vec::new()),
        })
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    /// Records this atom in the innermost tracking frame, if any.
    pub(crate) fn report_observed(self: &Rc<Self>) {
        RUNTIME.with(|rt| {
            if let Some(Some(frame)) = rt.tracking.borrow_mut().last_mut() {
                if frame.seen.insert(self.id) {
                    frame.atoms.push(Rc::clone(self));
                }
            }
        });
    }

    /// Marks every live observer stale. Reactions scheduled as a consequence
    /// run once the enclosing batch (opened here if none is active) ends.
    pub(crate) fn report_changed(&self) {
        let _batch = crate::BatchScope::new();
        let observers: Vec<Weak<dyn Derivation>> = {
            let mut observers = self.observers.borrow_mut();
            observers.retain(|(_, weak)| weak.strong_count() > 0);
            observers.iter().map(|(_, weak)| weak.clone()).collect()
        };
        for observer in observers {
            if let Some(derivation) = observer.upgrade() {
                derivation.on_stale();
            }
        }
    }

    fn add_observer(&self, id: DerivationId, observer: Weak<dyn Derivation>) {
        let mut observers = self.observers.borrow_mut();
        if !observers.iter().any(|(existing, _)| *existing == id) {
            observers.push((id, observer));
        }
    }

    fn remove_observer(&self, id: DerivationId) {
        self.observers
            .borrow_mut()
            .retain(|(existing, _)| *existing != id);
    }

    pub(crate) fn observer_count(&self) -> usize {
        self.observers
            .borrow()
            .iter()
            .filter(|(_, weak)| weak.strong_count() > 0)
            .count()
    }
}

#[derive(Default)]
struct Frame {
    atoms: Vec<Rc<Atom>>,
    seen: HashSet<u64>,
}

#[derive(Default)]
struct Runtime {
    /// `None` frames suppress tracking (see [`untracked`]).
    tracking: RefCell<Vec<Option<Frame>>>,
    batch_depth: Cell<usize>,
    pending: RefCell<Vec<Rc<dyn Runnable>>>,
    draining: Cell<bool>,
    next_id: Cell<u64>,
}

thread_local! {
    static RUNTIME: Runtime = Runtime::default();
}

pub(crate) fn next_id() -> u64 {
    RUNTIME.with(|rt| {
        let id = rt.next_id.get() + 1;
        rt.next_id.set(id);
        id
    })
}

/// Pops the innermost tracking frame, even when the tracked closure panics.
struct FrameGuard;

impl Drop for FrameGuard {
    fn drop(&mut self) {
        let _ = RUNTIME.try_with(|rt| rt.tracking.borrow_mut().pop());
    }
}

/// Runs `f` in a fresh tracking frame and returns the atoms it read.
pub(crate) fn track<R>(f: impl FnOnce() -> R) -> (R, Vec<Rc<Atom>>) {
    RUNTIME.with(|rt| rt.tracking.borrow_mut().push(Some(Frame::default())));
    let guard = FrameGuard;
    let result = f();
    let atoms = RUNTIME.with(|rt| {
        rt.tracking
            .borrow_mut()
            .last_mut()
            .and_then(Option::take)
            .map(|frame| frame.atoms)
            .unwrap_or_default()
    });
    drop(guard);
    (result, atoms)
}

/// Runs `f` without recording any of the values it reads as dependencies
/// of the enclosing computed or reaction.
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
    RUNTIME.with(|rt| rt.tracking.borrow_mut().push(None));
    let _guard = FrameGuard;
    f()
}

/// Replaces the subscriptions of derivation `id` with `next`.
pub(crate) fn rebind(
    id: DerivationId,
    observer: &Weak<dyn Derivation>,
    current: &RefCell<Vec<Rc<Atom>>>,
    next: Vec<Rc<Atom>>,
) {
    let mut current = current.borrow_mut();
    for old in current.iter() {
        if !next.iter().any(|atom| atom.id() == old.id()) {
            old.remove_observer(id);
        }
    }
    for atom in &next {
        atom.add_observer(id, observer.clone());
    }
    *current = next;
}

/// Drops every subscription of derivation `id`.
pub(crate) fn unbind(id: DerivationId, current: &RefCell<Vec<Rc<Atom>>>) {
    for atom in current.borrow_mut().drain(..) {
        atom.remove_observer(id);
    }
}

pub(crate) fn enter_batch() {
    RUNTIME.with(|rt| rt.batch_depth.set(rt.batch_depth.get() + 1));
}

pub(crate) fn exit_batch() {
    let outermost = RUNTIME
        .try_with(|rt| {
            let depth = rt.batch_depth.get().saturating_sub(1);
            rt.batch_depth.set(depth);
            depth == 0
        })
        .unwrap_or(false);
    if outermost && !std::thread::panicking() {
        drain_reactions();
    }
}

pub(crate) fn is_batching() -> bool {
    RUNTIME.with(|rt| rt.batch_depth.get() > 0)
}

pub(crate) fn schedule(reaction: Rc<dyn Runnable>) {
    RUNTIME.with(|rt| rt.pending.borrow_mut().push(reaction));
}

/// Resets the draining flag when the drain loop exits, panics included.
struct DrainGuard;

impl Drop for DrainGuard {
    fn drop(&mut self) {
        let _ = RUNTIME.try_with(|rt| rt.draining.set(false));
    }
}

fn drain_reactions() {
    if RUNTIME.with(|rt| rt.draining.replace(true)) {
        // An outer drain loop picks up whatever was scheduled.
        return;
    }
    let _guard = DrainGuard;

    let mut iterations = 0;
    loop {
        let pending = RUNTIME.with(|rt| std::mem::take(&mut *rt.pending.borrow_mut()));
        if pending.is_empty() {
            break;
        }
        iterations += 1;
        if iterations > MAX_REACTION_ITERATIONS {
            error!(
                iterations = MAX_REACTION_ITERATIONS,
                dropped = pending.len(),
                "Reactions did not converge, possible cycle; dropping pending reactions"
            );
            for reaction in pending {
                reaction.cancel();
            }
            break;
        }
        for reaction in pending {
            reaction.run();
        }
    }
}
