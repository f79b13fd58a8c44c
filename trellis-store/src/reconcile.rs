//! Positional list reconciliation with carry-forward.
//!
//! Given the source identities currently held by a target list (`None` for
//! elements that exist only locally) and the identities of the source list,
//! [`reconcile`] produces the layout of the next target list:
//!
//! 1. target elements whose source is still present, in target order
//! 2. source elements no target element claims, in source order
//! 3. local-only target elements, in target order
//!
//! Target elements whose source disappeared are dropped. The function is
//! pure; applying the plan is up to the caller.

use std::collections::HashMap;
use std::hash::Hash;

/// One position of a reconciled list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// Keep target element `target`, re-synced from source element `source`.
    Carry { target: usize, source: usize },
    /// Build a new element from source element `source`.
    Create { source: usize },
    /// Keep the local-only target element `target` untouched.
    Local { target: usize },
}

/// Plans the next layout of `target` against `source`.
///
/// Each source index appears exactly once in the plan. When two target
/// elements claim the same source element, the first one wins and the
/// other is dropped.
pub fn reconcile<K: Eq + Hash>(target: &[Option<K>], source: &[K]) -> Vec<Slot> {
    let mut positions: HashMap<&K, usize> = HashMap::with_capacity(source.len());
    for (index, key) in source.iter().enumerate() {
        positions.entry(key).or_insert(index);
    }

    let mut claimed = vec![false; source.len()];
    let mut plan = Vec::with_capacity(source.len() + target.len());
    let mut local = Vec::new();
    for (index, key) in target.iter().enumerate() {
        match key {
            Some(key) => {
                if let Some(&source_index) = positions.get(key)
                    && !claimed[source_index]
                {
                    claimed[source_index] = true;
                    plan.push(Slot::Carry {
                        target: index,
                        source: source_index,
                    });
                }
            }
            None => local.push(Slot::Local { target: index }),
        }
    }

    plan.extend(
        claimed
            .iter()
            .enumerate()
            .filter(|(_, claimed)| !**claimed)
            .map(|(source, _)| Slot::Create { source }),
    );
    plan.extend(local);
    plan
}

/// Counts of each slot kind in a plan, for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct PlanSummary {
    pub carried: usize,
    pub created: usize,
    pub local: usize,
}

impl PlanSummary {
    pub(crate) fn of(plan: &[Slot]) -> Self {
        plan.iter().fold(Self::default(), |mut summary, slot| {
            match slot {
                Slot::Carry { .. } => summary.carried += 1,
                Slot::Create { .. } => summary.created += 1,
                Slot::Local { .. } => summary.local += 1,
            }
            summary
        })
    }
}
