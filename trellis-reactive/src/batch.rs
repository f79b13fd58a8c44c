//! Batched mutations.
//!
//! Inside a batch, writes apply immediately and computeds are invalidated
//! immediately, but reactions are deferred until the outermost scope exits.
//! Several assignments that belong together therefore trigger each
//! downstream reaction at most once.

use std::marker::PhantomData;

use crate::runtime;

/// RAII guard that defers reactions until it (and every enclosing scope) is
/// dropped.
///
/// The guard is tied to the current thread's runtime and is not `Send`.
#[must_use = "reactions run as soon as the scope is dropped"]
pub struct BatchScope {
    _not_send: PhantomData<*const ()>,
}

impl BatchScope {
    /// Opens a (possibly nested) batch.
    pub fn new() -> Self {
        runtime::enter_batch();
        Self {
            _not_send: PhantomData,
        }
    }

    /// Whether a batch is currently open on this thread.
    #[must_use]
    pub fn is_active() -> bool {
        runtime::is_batching()
    }
}

impl Default for BatchScope {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for BatchScope {
    fn drop(&mut self) {
        runtime::exit_batch();
    }
}

impl std::fmt::Debug for BatchScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchScope").finish()
    }
}

/// Runs `f` inside a batch and returns its result.
pub fn batch<R>(f: impl FnOnce() -> R) -> R {
    let _scope = BatchScope::new();
    f()
}
