#![cfg(test)]

// Property tests for PlainMap: equivalence with std's HashMap and
// ownership accounting for every value the map consumes.

use crate::capacity::{MAX_BUCKETS, MIN_BUCKETS};
use crate::plain_map::PlainMap;
use crate::{FnPolicy, InsertError, SetOutcome};
use proptest::prelude::*;
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

#[derive(Clone, Debug)]
enum Op {
    Add(u16, i32),
    Set(u16, i32),
    Remove(u16),
    Take(u16),
    Get(u16),
    Clear,
    Iterate,
}

fn arb_ops(key_space: u16) -> impl Strategy<Value = Vec<Op>> {
    let k = 0..key_space;
    let op = prop_oneof![
        6 => (k.clone(), any::<i32>()).prop_map(|(k, v)| Op::Add(k, v)),
        6 => (k.clone(), any::<i32>()).prop_map(|(k, v)| Op::Set(k, v)),
        3 => k.clone().prop_map(Op::Remove),
        1 => k.clone().prop_map(Op::Take),
        2 => k.prop_map(Op::Get),
        1 => Just(Op::Clear),
        1 => Just(Op::Iterate),
    ];
    proptest::collection::vec(op, 1..300)
}

// Values are (payload, shared token). Every value the map stores holds one
// clone of the token, so the token's strong count tells whether rejected,
// overwritten, removed and cleared values were all released.
type Val = (i32, Rc<()>);

// Property: state-machine equivalence against std::collections::HashMap.
// - add rejects duplicates and releases the rejected value.
// - set inserts or replaces, releasing the replaced value.
// - remove/remove_entry agree with the model; remove_entry hands the value back.
// - iteration yields each live entry exactly once.
// - revision counts structural changes only; buckets stay within limits.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine(ops in arb_ops(120)) {
        let token = Rc::new(());
        let mut sut: PlainMap<u16, Val> = PlainMap::new();
        let mut model: HashMap<u16, i32> = HashMap::new();
        let mut revision = 0u64;

        for op in ops {
            match op {
                Op::Add(k, v) => {
                    let already = model.contains_key(&k);
                    match sut.add(k, (v, token.clone())) {
                        Ok(()) => {
                            prop_assert!(!already);
                            model.insert(k, v);
                            revision += 1;
                        }
                        Err(InsertError::DuplicateKey) => prop_assert!(already),
                    }
                }
                Op::Set(k, v) => {
                    let outcome = sut.set(k, (v, token.clone()));
                    let expected = if model.insert(k, v).is_some() {
                        SetOutcome::Replaced
                    } else {
                        revision += 1;
                        SetOutcome::Inserted
                    };
                    prop_assert_eq!(outcome, expected);
                }
                Op::Remove(k) => {
                    let removed = sut.remove(&k);
                    prop_assert_eq!(removed, model.remove(&k).is_some());
                    if removed {
                        revision += 1;
                    }
                }
                Op::Take(k) => {
                    let taken = sut.remove_entry(&k).map(|(tk, (v, _))| (tk, v));
                    prop_assert_eq!(taken, model.remove(&k).map(|v| (k, v)));
                    if taken.is_some() {
                        revision += 1;
                    }
                }
                Op::Get(k) => {
                    prop_assert_eq!(sut.get(&k).map(|(v, _)| *v), model.get(&k).copied());
                }
                Op::Clear => {
                    sut.clear();
                    model.clear();
                    revision += 1;
                }
                Op::Iterate => {
                    let keys: Vec<u16> = sut.keys().copied().collect();
                    let unique: BTreeSet<u16> = keys.iter().copied().collect();
                    prop_assert_eq!(keys.len(), unique.len());
                    prop_assert_eq!(unique, model.keys().copied().collect::<BTreeSet<_>>());
                }
            }

            prop_assert_eq!(sut.len(), model.len());
            prop_assert_eq!(sut.chained_len(), model.len());
            prop_assert_eq!(sut.revision(), revision);
            prop_assert_eq!(Rc::strong_count(&token), 1 + model.len());
            prop_assert!((MIN_BUCKETS..=MAX_BUCKETS).contains(&sut.bucket_count()));
        }

        drop(sut);
        prop_assert_eq!(Rc::strong_count(&token), 1);
    }
}

// Same properties with a function-pointer policy whose hash sends every
// key to one of three chains, so chains stay long through every resize.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_fn_policy(ops in arb_ops(80)) {
        let policy: FnPolicy<u16, i32> =
            FnPolicy::new(|k: &u16| u64::from(*k % 3), |a: &u16, b: &u16| a == b);
        let mut sut: PlainMap<u16, i32, _> = PlainMap::with_policy(policy);
        let mut model: HashMap<u16, i32> = HashMap::new();

        for op in ops {
            match op {
                Op::Add(k, v) => {
                    let res = sut.add(k, v);
                    prop_assert_eq!(res.is_ok(), !model.contains_key(&k));
                    model.entry(k).or_insert(v);
                }
                Op::Set(k, v) => {
                    sut.set(k, v);
                    model.insert(k, v);
                }
                Op::Remove(k) | Op::Take(k) => {
                    prop_assert_eq!(sut.remove(&k), model.remove(&k).is_some());
                }
                Op::Get(k) => {
                    prop_assert_eq!(sut.get(&k), model.get(&k));
                }
                Op::Clear => {
                    sut.clear();
                    model.clear();
                }
                Op::Iterate => {
                    let got: HashMap<u16, i32> = sut.iter().map(|(k, v)| (*k, *v)).collect();
                    prop_assert_eq!(&got, &model);
                }
            }
            prop_assert_eq!(sut.len(), model.len());
            prop_assert_eq!(sut.chained_len(), model.len());
        }
    }
}
