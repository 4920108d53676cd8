// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs)]
use std::collections::BTreeMap;

use proptest::prelude::*;

use tempo_graph::{CompactIdRegistry, EdgeType, Label, LabelKind, RegistryError, MAX_ID};

proptest! {
    #[test]
    fn labels_and_ids_stay_inverse(ops in prop::collection::vec((any::<bool>(), 0u8..24), 0..96)) {
        let mut registry = CompactIdRegistry::new(LabelKind::Int);
        let mut live: BTreeMap<i32, EdgeType> = BTreeMap::new();

        for (add, raw) in ops {
            let label = Label::Int(i32::from(raw));
            if add {
                let id = registry.add_type(label).expect("capacity");
                if let Some(previous) = live.insert(i32::from(raw), id) {
                    prop_assert_eq!(previous, id);
                }
            } else {
                let removed = registry.remove_type(&label).expect("int label");
                prop_assert_eq!(removed, live.remove(&i32::from(raw)));
            }
        }

        prop_assert_eq!(registry.size(), live.len() + 1);
        for (raw, id) in &live {
            let label = Label::Int(*raw);
            prop_assert_eq!(registry.get_id(&label).expect("int label"), Some(*id));
            prop_assert_eq!(registry.label(*id), Some(&label));
        }
        let mut ids: Vec<u16> = live.values().map(|id| id.0).collect();
        ids.sort_unstable();
        ids.dedup();
        prop_assert_eq!(ids.len(), live.len());
        prop_assert!(ids.iter().all(|id| *id >= 1 && *id <= MAX_ID));
    }
}

#[test]
fn freed_id_is_reused_before_the_high_water_mark_moves() {
    let mut registry = CompactIdRegistry::new(LabelKind::String);
    let a = registry.add_type(Label::from("a")).unwrap();
    let b = registry.add_type(Label::from("b")).unwrap();
    assert_eq!((a, b), (EdgeType(1), EdgeType(2)));

    assert_eq!(registry.remove_type(&Label::from("a")).unwrap(), Some(a));
    let c = registry.add_type(Label::from("c")).unwrap();
    assert_eq!(c, a);
    let d = registry.add_type(Label::from("d")).unwrap();
    assert_eq!(d, EdgeType(3));
}

#[test]
fn the_label_after_the_last_id_exceeds_capacity() {
    let mut registry = CompactIdRegistry::new(LabelKind::Long);
    for raw in 0..i64::from(MAX_ID) {
        registry.add_type(Label::Long(raw)).unwrap();
    }
    assert_eq!(registry.size(), usize::from(MAX_ID) + 1);
    let err = registry.add_type(Label::Long(-1)).unwrap_err();
    assert!(matches!(err, RegistryError::CapacityExceeded { .. }));
    assert_eq!(registry.size(), usize::from(MAX_ID) + 1);

    registry.remove_type(&Label::Long(7)).unwrap();
    assert_eq!(registry.add_type(Label::Long(-1)).unwrap(), EdgeType(8));
}

#[test]
fn explicit_ids_fill_the_gap_with_free_ids() {
    let mut registry = CompactIdRegistry::new(LabelKind::Char);
    assert_eq!(registry.add_type_with_id(Label::Char('x'), 5).unwrap(), EdgeType(5));
    assert_eq!(registry.add_type_with_id(Label::Char('x'), 5).unwrap(), EdgeType(5));
    for expected in 1..5 {
        let label = Label::Char(char::from(b'a' + expected));
        assert_eq!(registry.add_type(label).unwrap(), EdgeType(u16::from(expected)));
    }
    assert_eq!(registry.add_type(Label::Char('z')).unwrap(), EdgeType(6));
    assert!(matches!(
        registry.add_type_with_id(Label::Char('y'), 5),
        Err(RegistryError::IdBound { id: 5, .. })
    ));
}

#[test]
fn clear_leaves_only_the_null_entry() {
    let mut registry = CompactIdRegistry::new(LabelKind::Bool);
    registry.add_type(Label::Bool(true)).unwrap();
    registry.clear();
    assert_eq!(registry.labels(), vec![Label::Null]);
    assert_eq!(registry.get_id(&Label::Null).unwrap(), Some(EdgeType::NULL));
    assert!(matches!(
        registry.add_type(Label::Int(3)),
        Err(RegistryError::LabelKindMismatch { .. })
    ));
}
