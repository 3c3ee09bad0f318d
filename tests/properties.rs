//! Property tests over random mutation sequences.

use proptest::prelude::*;
use shape_store::{MemorySlot, Shape, ShapeKind, Store, StoreConfig, StoreError};
use std::collections::HashSet;

#[derive(Clone, Debug)]
enum Op {
    Add(u8, ShapeKind),
    Remove(u8),
    Recolor(ShapeKind, u8),
}

fn kind() -> impl Strategy<Value = ShapeKind> {
    prop_oneof![Just(ShapeKind::Square), Just(ShapeKind::Circle)]
}

fn op() -> impl Strategy<Value = Op> {
    // Small id space so duplicates and removals of live ids are common
    prop_oneof![
        (0u8..16, kind()).prop_map(|(id, k)| Op::Add(id, k)),
        (0u8..16).prop_map(Op::Remove),
        (kind(), any::<u8>()).prop_map(|(k, c)| Op::Recolor(k, c)),
    ]
}

fn color(c: u8) -> String {
    format!("#{:02X}{:02X}{:02X}", c, c, c)
}

proptest! {
    #[test]
    fn records_match_model(ops in prop::collection::vec(op(), 0..64)) {
        let slot = MemorySlot::new();
        let store = Store::open(StoreConfig::default(), slot.clone());
        let mut model: Vec<Shape> = Vec::new();

        for op in ops {
            match op {
                Op::Add(id, k) => {
                    let shape = Shape::new(format!("id-{}", id), k, color(id));
                    let exists = model.iter().any(|s| s.id == shape.id);
                    let result = store.add(shape.clone());
                    if exists {
                        prop_assert!(matches!(result, Err(StoreError::DuplicateId(_))));
                    } else {
                        prop_assert!(result.is_ok());
                        model.push(shape);
                    }
                }
                Op::Remove(id) => {
                    let id = format!("id-{}", id);
                    let before = model.len();
                    model.retain(|s| s.id.as_str() != id);
                    prop_assert_eq!(store.remove(&id).unwrap(), before != model.len());
                    prop_assert!(store.get(&id).is_none());
                }
                Op::Recolor(k, c) => {
                    for shape in model.iter_mut().filter(|s| s.kind == k) {
                        shape.color = color(c);
                    }
                    store.recolor(k, color(c)).unwrap();
                }
            }

            let state = store.get_state();
            prop_assert_eq!(&state.records, &model);

            let ids: HashSet<_> = state.records.iter().map(|s| s.id.clone()).collect();
            prop_assert_eq!(ids.len(), state.records.len());
            prop_assert_eq!(
                state.square_count,
                model.iter().filter(|s| s.kind == ShapeKind::Square).count()
            );
            prop_assert_eq!(
                state.circle_count,
                model.iter().filter(|s| s.kind == ShapeKind::Circle).count()
            );
        }

        let reopened = Store::open(StoreConfig::default(), slot);
        prop_assert_eq!(reopened.records(), model);
    }
}
