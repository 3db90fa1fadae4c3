//! Model-based property tests for the bounded store.
//!
//! Every operation sequence is replayed against a plain `Vec` model of the
//! recency order and the two must agree after each step.

use proptest::prelude::*;
use std::sync::Arc;
use synccache_store::BoundedStore;

#[derive(Debug, Clone)]
enum Op {
    Add(u8, u32),
    Get(u8),
    Peek(u8),
    Remove(u8),
    GetOrInsert(u8, u32),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let key = 0u8..8;
    prop_oneof![
        (key.clone(), any::<u32>()).prop_map(|(k, v)| Op::Add(k, v)),
        key.clone().prop_map(Op::Get),
        key.clone().prop_map(Op::Peek),
        key.clone().prop_map(Op::Remove),
        (key, any::<u32>()).prop_map(|(k, v)| Op::GetOrInsert(k, v)),
    ]
}

/// Recency model: index 0 is the least recently touched entry.
#[derive(Default)]
struct Model {
    entries: Vec<(u8, u32)>,
    capacity: usize,
}

impl Model {
    fn position(&self, key: u8) -> Option<usize> {
        self.entries.iter().position(|(k, _)| *k == key)
    }

    fn touch(&mut self, index: usize) -> u32 {
        let entry = self.entries.remove(index);
        self.entries.push(entry);
        entry.1
    }

    fn add(&mut self, key: u8, value: u32) -> Option<u8> {
        if let Some(index) = self.position(key) {
            self.entries.remove(index);
            self.entries.push((key, value));
            return None;
        }
        let evicted = if self.entries.len() == self.capacity {
            Some(self.entries.remove(0).0)
        } else {
            None
        };
        self.entries.push((key, value));
        evicted
    }

    fn keys(&self) -> Vec<u8> {
        self.entries.iter().map(|(k, _)| *k).collect()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn store_matches_recency_model(
        capacity in 1usize..5,
        ops in prop::collection::vec(op_strategy(), 1..64),
    ) {
        let evicted_log = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = Arc::clone(&evicted_log);
        let store = BoundedStore::with_eviction_hook(capacity, move |key: &u8| {
            sink.lock().push(*key);
        })
        .unwrap();
        let mut model = Model { entries: Vec::new(), capacity };
        let mut expected_evictions = Vec::new();

        for op in ops {
            match op {
                Op::Add(k, v) => {
                    let expected = model.add(k, v);
                    expected_evictions.extend(expected);
                    prop_assert_eq!(store.add(k, v), expected);
                }
                Op::Get(k) => {
                    let expected = model.position(k).map(|i| model.touch(i));
                    prop_assert_eq!(store.get(&k), expected);
                }
                Op::Peek(k) => {
                    let expected = model.position(k).map(|i| model.entries[i].1);
                    prop_assert_eq!(store.peek(&k), expected);
                }
                Op::Remove(k) => {
                    let expected = model.position(k).map(|i| model.entries.remove(i).1);
                    prop_assert_eq!(store.remove(&k), expected);
                }
                Op::GetOrInsert(k, v) => {
                    let expected = match model.position(k) {
                        Some(i) => (model.touch(i), false),
                        None => {
                            expected_evictions.extend(model.add(k, v));
                            (v, true)
                        }
                    };
                    prop_assert_eq!(store.get_or_insert_with(k, || v), expected);
                }
            }

            prop_assert_eq!(store.keys(), model.keys());
            prop_assert!(store.len() <= capacity);
        }

        prop_assert_eq!(&*evicted_log.lock(), &expected_evictions);
    }
}
