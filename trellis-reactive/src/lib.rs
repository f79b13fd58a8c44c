#![forbid(unsafe_code)]

//! Reactive primitives for Trellis.
//!
//! - [`Observable`]: a shared, version-tracked value. Reads are recorded as
//!   dependencies; writes invalidate dependents.
//! - [`Computed`]: a lazily evaluated, memoized value derived from
//!   observables and other computeds. Its dependency set is re-collected on
//!   every evaluation.
//! - [`Reaction`]: an effect that re-runs when a tracked expression's
//!   dependencies change.
//! - [`BatchScope`] / [`batch`]: defer reactions until a group of writes has
//!   committed.
//! - [`untracked`]: read without subscribing.
//!
//! # Architecture
//!
//! Everything is single-threaded: values live in `Rc<RefCell<..>>`, the
//! tracking stack and pending-reaction queue live in a thread-local runtime.
//! Observers are held as `Weak` references and cleaned up lazily, so dropping
//! a computed or reaction is enough to unsubscribe it.
//!
//! # Invariants
//!
//! 1. A write invalidates every computed that read the value, transitively,
//!    before the write returns.
//! 2. Reactions never run in the middle of a batch; when the outermost batch
//!    exits, every scheduled reaction runs once against committed state.
//! 3. A disposed reaction never runs again.

mod batch;
mod computed;
mod observable;
mod reaction;
mod runtime;

pub use batch::{BatchScope, batch};
pub use computed::Computed;
pub use observable::Observable;
pub use reaction::Reaction;
pub use runtime::untracked;
