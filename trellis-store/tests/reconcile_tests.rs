use pretty_assertions::assert_eq;
use proptest::prelude::*;
use trellis_store::{Slot, reconcile};

// ── Layout ───────────────────────────────────────────────────────

#[test]
fn identical_lists_carry_everything() {
    let plan = reconcile(&[Some('a'), Some('b')], &['a', 'b']);
    assert_eq!(
        plan,
        vec![
            Slot::Carry { target: 0, source: 0 },
            Slot::Carry { target: 1, source: 1 },
        ]
    );
}

#[test]
fn removed_source_drops_its_element() {
    // [5, 6, 7] + local 8, source loses 6.
    let plan = reconcile(&[Some(5), Some(6), Some(7), None], &[5, 7]);
    assert_eq!(
        plan,
        vec![
            Slot::Carry { target: 0, source: 0 },
            Slot::Carry { target: 2, source: 1 },
            Slot::Local { target: 3 },
        ]
    );
}

#[test]
fn new_source_goes_before_local_elements() {
    let plan = reconcile(&[Some(5), Some(7), None], &[5, 7, 9]);
    assert_eq!(
        plan,
        vec![
            Slot::Carry { target: 0, source: 0 },
            Slot::Carry { target: 1, source: 1 },
            Slot::Create { source: 2 },
            Slot::Local { target: 2 },
        ]
    );
}

#[test]
fn carried_elements_keep_target_order() {
    // The source was reordered; the target keeps its own order.
    let plan = reconcile(&[Some('a'), Some('b'), Some('c')], &['c', 'a', 'b']);
    assert_eq!(
        plan,
        vec![
            Slot::Carry { target: 0, source: 1 },
            Slot::Carry { target: 1, source: 2 },
            Slot::Carry { target: 2, source: 0 },
        ]
    );
}

#[test]
fn empty_target_creates_everything() {
    let plan = reconcile::<u8>(&[], &[1, 2]);
    assert_eq!(
        plan,
        vec![Slot::Create { source: 0 }, Slot::Create { source: 1 }]
    );
}

#[test]
fn empty_source_keeps_only_local_elements() {
    let plan = reconcile(&[None, Some(1), None], &[]);
    assert_eq!(
        plan,
        vec![Slot::Local { target: 0 }, Slot::Local { target: 2 }]
    );
}

#[test]
fn duplicate_claims_keep_the_first() {
    let plan = reconcile(&[Some(1), Some(1)], &[1]);
    assert_eq!(plan, vec![Slot::Carry { target: 0, source: 0 }]);
}

// ── Properties ───────────────────────────────────────────────────

fn lists() -> impl Strategy<Value = (Vec<Option<u8>>, Vec<u8>)> {
    (
        prop::collection::vec(prop::option::of(0u8..20), 0..16),
        prop::collection::hash_set(0u8..20, 0..16),
    )
        .prop_map(|(target, source)| (target, source.into_iter().collect()))
}

proptest! {
    /// Every source element appears exactly once, carried or created.
    #[test]
    fn every_source_is_placed_once((target, source) in lists()) {
        let plan = reconcile(&target, &source);
        let mut placed: Vec<usize> = plan
            .iter()
            .filter_map(|slot| match slot {
                Slot::Carry { source, .. } | Slot::Create { source } => Some(*source),
                Slot::Local { .. } => None,
            })
            .collect();
        placed.sort_unstable();
        prop_assert_eq!(placed, (0..source.len()).collect::<Vec<_>>());
    }

    /// Every local-only element survives, in order, at the end.
    #[test]
    fn local_elements_are_kept_last((target, source) in lists()) {
        let plan = reconcile(&target, &source);
        let expected: Vec<usize> = target
            .iter()
            .enumerate()
            .filter(|(_, key)| key.is_none())
            .map(|(index, _)| index)
            .collect();
        let tail: Vec<usize> = plan[plan.len() - expected.len()..]
            .iter()
            .map(|slot| match slot {
                Slot::Local { target } => *target,
                other => panic!("expected a local slot, got {other:?}"),
            })
            .collect();
        prop_assert_eq!(tail, expected);
    }

    /// Carried elements come first, in target order; created elements
    /// follow, in source order.
    #[test]
    fn plan_is_ordered((target, source) in lists()) {
        let plan = reconcile(&target, &source);
        let carried: Vec<usize> = plan
            .iter()
            .filter_map(|slot| match slot {
                Slot::Carry { target, .. } => Some(*target),
                _ => None,
            })
            .collect();
        let created: Vec<usize> = plan
            .iter()
            .filter_map(|slot| match slot {
                Slot::Create { source } => Some(*source),
                _ => None,
            })
            .collect();
        prop_assert!(carried.windows(2).all(|w| w[0] < w[1]));
        prop_assert!(created.windows(2).all(|w| w[0] < w[1]));

        let first_create = plan.iter().position(|slot| matches!(slot, Slot::Create { .. }));
        let last_carry = plan.iter().rposition(|slot| matches!(slot, Slot::Carry { .. }));
        if let (Some(create), Some(carry)) = (first_create, last_carry) {
            prop_assert!(carry < create);
        }
    }

    /// Carry pairs always match identities.
    #[test]
    fn carried_keys_match((target, source) in lists()) {
        for slot in reconcile(&target, &source) {
            if let Slot::Carry { target: t, source: s } = slot {
                prop_assert_eq!(target[t], Some(source[s]));
            }
        }
    }

    /// Reconciling an already reconciled layout changes nothing but
    /// turns creations into carries.
    #[test]
    fn reconcile_is_stable((target, source) in lists()) {
        let plan = reconcile(&target, &source);
        let next: Vec<Option<u8>> = plan
            .iter()
            .map(|slot| match slot {
                Slot::Carry { source: s, .. } | Slot::Create { source: s } => Some(source[*s]),
                Slot::Local { .. } => None,
            })
            .collect();
        let again = reconcile(&next, &source);
        prop_assert_eq!(again.len(), next.len());
        let no_creates = again.iter().all(|slot| !matches!(slot, Slot::Create { .. }));
        prop_assert!(no_creates);
    }
}
