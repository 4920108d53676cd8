// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs)]
use std::collections::{BTreeMap, BTreeSet};

use proptest::prelude::*;

use tempo_graph::temporal::{IndexScope, Interval, Slot, TemporalIndexStore, Timestamp};
use tempo_graph::ViewId;

fn no_views() -> std::iter::Empty<ViewId> {
    std::iter::empty()
}

fn elements_in<K: tempo_graph::TimeKey>(store: &TemporalIndexStore<K, u32>, slots: &[Slot]) -> BTreeSet<u32> {
    let index = store.index(IndexScope::Main).expect("main index");
    slots
        .iter()
        .filter_map(|slot| index.entry(*slot))
        .flat_map(|entry| entry.elements().collect::<Vec<_>>())
        .collect()
}

#[derive(Clone, Debug)]
enum Op {
    Add(u8, u32),
    Remove(u8, u32),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..8, 0u32..5).prop_map(|(k, e)| Op::Add(k, e)),
        (0u8..8, 0u32..5).prop_map(|(k, e)| Op::Remove(k, e)),
    ]
}

proptest! {
    #[test]
    fn timestamp_index_matches_refcount_model(ops in prop::collection::vec(op(), 0..64)) {
        let mut store: TemporalIndexStore<Timestamp, u32> = TemporalIndexStore::new();
        let mut model: BTreeMap<(u8, u32), u32> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Add(k, e) => {
                    let key = Timestamp::new(f64::from(k)).expect("finite");
                    store.add(key, e, no_views()).expect("add");
                    *model.entry((k, e)).or_default() += 1;
                }
                Op::Remove(k, e) => {
                    let key = Timestamp::new(f64::from(k)).expect("finite");
                    let held = model.get(&(k, e)).copied().unwrap_or(0);
                    let left = store.remove(key, &e, no_views()).expect("remove");
                    prop_assert_eq!(left, held == 1);
                    if held > 0 {
                        model.insert((k, e), held - 1);
                    }
                }
            }
        }

        let mut expected_count = 0;
        for k in 0u8..8 {
            let expected: BTreeSet<u32> = model
                .iter()
                .filter(|((key, _), count)| *key == k && **count > 0)
                .map(|((_, e), _)| *e)
                .collect();
            expected_count += expected.len();
            let slots = store.slots_at(IndexScope::Main, f64::from(k)).expect("finite point");
            prop_assert_eq!(elements_in(&store, &slots), expected);
        }
        let index = store.index(IndexScope::Main).expect("main index");
        prop_assert_eq!(index.element_count(), expected_count);
        prop_assert_eq!(index.is_empty(), expected_count == 0);
    }

    #[test]
    fn interval_range_query_is_union_of_point_queries(
        stored in prop::collection::vec((0u8..20, 0u8..10, 0u32..6), 1..24),
        (low, span) in (0u8..20, 0u8..10),
    ) {
        let mut store: TemporalIndexStore<Interval, u32> = TemporalIndexStore::new();
        for (start, len, e) in stored {
            let key = Interval::new(f64::from(start), f64::from(start) + f64::from(len)).expect("ordered");
            store.add(key, e, no_views()).expect("add");
        }

        let high = low.saturating_add(span);
        let range = Interval::new(f64::from(low), f64::from(high)).expect("ordered");
        let ranged = elements_in(&store, &store.slots_within(IndexScope::Main, &range));

        let mut pointwise = BTreeSet::new();
        for p in low..=high {
            let point = f64::from(p);
            let at = elements_in(&store, &store.slots_at(IndexScope::Main, point).expect("finite"));
            let degenerate = Interval::new(point, point).expect("closed point");
            let within = elements_in(&store, &store.slots_within(IndexScope::Main, &degenerate));
            prop_assert_eq!(&at, &within);
            pointwise.extend(at);
        }
        prop_assert_eq!(ranged, pointwise);
    }
}

#[test]
fn non_finite_points_are_rejected() {
    let store: TemporalIndexStore<Timestamp, u32> = TemporalIndexStore::new();
    assert!(store.slots_at(IndexScope::Main, f64::NAN).is_err());
    assert!(store.slots_at(IndexScope::Main, f64::INFINITY).is_err());
    assert!(Timestamp::new(f64::NEG_INFINITY).is_err());
}

#[test]
fn empty_store_reports_infinite_extremes() {
    let store: TemporalIndexStore<Interval, u32> = TemporalIndexStore::new();
    assert_eq!(store.min_timestamp(IndexScope::Main), f64::INFINITY);
    assert_eq!(store.max_timestamp(IndexScope::Main), f64::NEG_INFINITY);
}

#[test]
fn view_index_stays_a_subset_of_main() {
    let view = ViewId(0);
    let mut store: TemporalIndexStore<Timestamp, u32> = TemporalIndexStore::new();
    let t1 = Timestamp::new(1.0).expect("finite");
    let t2 = Timestamp::new(2.0).expect("finite");
    store.add(t1, 10, no_views()).expect("add");
    store.add(t2, 11, no_views()).expect("add");

    store.ensure_view_index(view, |e| *e == 10);
    store.add(t2, 10, [view]).expect("add");
    store.admit_to_view(view, &t2, 10);

    let local = store.index(IndexScope::View(view)).expect("view index");
    let main = store.index(IndexScope::Main).expect("main index");
    for (slot, entry) in local.occupied() {
        for element in entry.elements() {
            assert!(main.entry(slot).is_some_and(|m| m.contains(&element)));
        }
    }
    assert_eq!(local.element_count(), 2);

    store.evict_from_view(view, &t2, &10);
    assert_eq!(store.max_timestamp(IndexScope::View(view)), 1.0);
    assert_eq!(store.max_timestamp(IndexScope::Main), 2.0);
    assert!(store.delete_view_index(view));
    assert!(store.index(IndexScope::View(view)).is_none());
}
