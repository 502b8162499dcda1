#![cfg(test)]

// Property tests for OrderedMap kept inside the crate so they can check
// chain-level invariants that the public API does not expose.

use crate::capacity::{self, Resize, MAX_BUCKETS, MIN_BUCKETS};
use crate::ordered_map::OrderedMap;
use crate::{InsertError, SetOutcome, StdPolicy};
use proptest::prelude::*;
use std::fmt;
use std::hash::{BuildHasher, Hasher};

// Key newtype with Borrow<str> to exercise borrowed lookup.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
struct Key(String);
impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
impl std::borrow::Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, Debug)]
enum Op {
    Add(usize, i32),
    Set(usize, i32),
    Remove(usize),
    Get(usize),
    Contains(String),
    Mutate(usize, i32),
    Clear,
    Iterate,
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<Op>)> {
    proptest::collection::vec("[a-z]{0,4}", 1..=48).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let op = prop_oneof![
            6 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| Op::Add(i, v)),
            6 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| Op::Set(i, v)),
            4 => idx.clone().prop_map(Op::Remove),
            2 => idx.clone().prop_map(Op::Get),
            1 => "[a-z]{0,4}".prop_map(Op::Contains),
            1 => (idx.clone(), any::<i32>()).prop_map(|(i, d)| Op::Mutate(i, d)),
            1 => Just(Op::Clear),
            1 => Just(Op::Iterate),
        ];
        proptest::collection::vec(op, 1..200).prop_map(move |ops| (pool.clone(), ops))
    })
}

/// Insertion-ordered model: a plain Vec of pairs, oldest first.
#[derive(Default)]
struct Model {
    entries: Vec<(Key, i32)>,
    revision: u64,
}

impl Model {
    fn position(&self, k: &Key) -> Option<usize> {
        self.entries.iter().position(|(mk, _)| mk == k)
    }
}

fn check_invariants<S: BuildHasher>(
    sut: &OrderedMap<Key, i32, StdPolicy<S>>,
    model: &Model,
) -> Result<(), TestCaseError> {
    prop_assert_eq!(sut.len(), model.entries.len());
    prop_assert_eq!(sut.chained_len(), model.entries.len());
    prop_assert_eq!(sut.revision(), model.revision);
    let got: Vec<(Key, i32)> = sut.iter().map(|(k, v)| (k.clone(), *v)).collect();
    prop_assert_eq!(&got, &model.entries);
    let mut back: Vec<(Key, i32)> = sut.iter().rev().map(|(k, v)| (k.clone(), *v)).collect();
    back.reverse();
    prop_assert_eq!(&back, &model.entries);
    let b = sut.bucket_count();
    prop_assert!((MIN_BUCKETS..=MAX_BUCKETS).contains(&b));
    Ok(())
}

fn run_scenario<S: BuildHasher>(
    mut sut: OrderedMap<Key, i32, StdPolicy<S>>,
    pool: Vec<String>,
    ops: Vec<Op>,
) -> Result<(), TestCaseError> {
    let mut model = Model::default();
    for op in ops {
        let buckets_before = sut.bucket_count();
        let len_before = sut.len();
        match op {
            Op::Add(i, v) => {
                let k = Key(pool[i].clone());
                let already = model.position(&k).is_some();
                match sut.add(k.clone(), v) {
                    Ok(()) => {
                        prop_assert!(!already, "add must reject duplicates");
                        model.entries.push((k, v));
                        model.revision += 1;
                    }
                    Err(InsertError::DuplicateKey) => prop_assert!(already),
                }
            }
            Op::Set(i, v) => {
                let k = Key(pool[i].clone());
                match (sut.set(k.clone(), v), model.position(&k)) {
                    (SetOutcome::Replaced, Some(p)) => model.entries[p].1 = v,
                    (SetOutcome::Inserted, None) => {
                        model.entries.push((k, v));
                        model.revision += 1;
                    }
                    (outcome, pos) => {
                        prop_assert!(false, "set returned {:?} with model position {:?}", outcome, pos)
                    }
                }
            }
            Op::Remove(i) => {
                let k = Key(pool[i].clone());
                let removed = sut.remove(k.0.as_str());
                match model.position(&k) {
                    Some(p) => {
                        prop_assert!(removed);
                        model.entries.remove(p);
                        model.revision += 1;
                    }
                    None => prop_assert!(!removed),
                }
            }
            Op::Get(i) => {
                let k = Key(pool[i].clone());
                let expect = model.position(&k).map(|p| model.entries[p].1);
                prop_assert_eq!(sut.get(&k).copied(), expect);
            }
            Op::Contains(s) => {
                let has_model = model.entries.iter().any(|(k, _)| k.0 == s);
                prop_assert_eq!(sut.contains_key(s.as_str()), has_model);
            }
            Op::Mutate(i, d) => {
                let k = Key(pool[i].clone());
                if let Some(v) = sut.get_mut(&k) {
                    *v = v.saturating_add(d);
                }
                if let Some(p) = model.position(&k) {
                    let mv = &mut model.entries[p].1;
                    *mv = mv.saturating_add(d);
                }
            }
            Op::Clear => {
                sut.clear();
                model.entries.clear();
                model.revision += 1;
            }
            Op::Iterate => {
                prop_assert_eq!(sut.iter().len(), model.entries.len());
            }
        }

        // A structural change either kept the table or moved it to exactly
        // the size the sizing rule picks for the new count.
        if sut.len() != len_before && !model.entries.is_empty() {
            let after = sut.bucket_count();
            match capacity::decide(buckets_before, sut.len()) {
                Resize::Keep => prop_assert_eq!(after, buckets_before),
                Resize::To(n) => prop_assert_eq!(after, n),
            }
        }
        check_invariants(&sut, &model)?;
    }
    Ok(())
}

// Property: state-machine equivalence against an insertion-ordered Vec.
// - add never overwrites; set overwrites in place without moving the entry.
// - remove/get/contains agree with the model, including borrowed lookup.
// - iteration (both directions) matches insertion order after every op.
// - revision counts inserts of new keys, removals and clears only.
// - bucket count stays within limits and follows the resize rule.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        run_scenario(OrderedMap::new(), pool, ops)?;
    }
}

// Collision variant using a constant hasher: every key lands in the same
// chain, so unlinking from the head, middle and end of chains is exercised
// constantly.
#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        run_scenario(OrderedMap::with_hasher(ConstBuildHasher), pool, ops)?;
    }
}
