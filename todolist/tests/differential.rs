//! Differential test: interleaves `add`/`find` against each engine variant
//! and a `BTreeSet` oracle, checking that every `find` agrees with the
//! oracle's successor query and that `add`'s duplicate-detection agrees
//! with the oracle's membership.

use std::collections::BTreeSet;

use proptest::prelude::*;
use todolist::{SkipSet, Successor, TailSkipSet, WorkingSetSkipList};

#[derive(Debug, Clone, Copy)]
enum Op {
    Add(i32),
    Find(i32),
}

fn ops() -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(
        prop_oneof![
            (-200i32..200).prop_map(Op::Add),
            (-200i32..200).prop_map(Op::Find),
        ],
        1..400,
    )
}

fn oracle_successor(oracle: &BTreeSet<i32>, x: i32) -> Option<i32> {
    oracle.range(x..).next().copied()
}

proptest! {
    #[test]
    fn skip_set_agrees_with_btreeset(ops in ops()) {
        let mut set = SkipSet::new(0.4).unwrap();
        let mut oracle = BTreeSet::new();

        for op in ops {
            match op {
                Op::Add(x) => {
                    let inserted = set.add(x);
                    prop_assert_eq!(inserted, oracle.insert(x));
                }
                Op::Find(x) => {
                    let got = set.find(&x).into_option().copied();
                    prop_assert_eq!(got, oracle_successor(&oracle, x));
                }
            }
        }
        prop_assert_eq!(set.len(), oracle.len());
        prop_assert!(set.sanity().is_ok());
    }

    #[test]
    fn tail_skip_set_agrees_with_btreeset(ops in ops()) {
        let mut set = TailSkipSet::new(0.4, i32::MAX).unwrap();
        let mut oracle = BTreeSet::new();

        for op in ops {
            match op {
                Op::Add(x) => {
                    let inserted = set.add(x).unwrap();
                    prop_assert_eq!(inserted, oracle.insert(x));
                }
                Op::Find(x) => {
                    let got = set.find(&x).into_option().copied();
                    prop_assert_eq!(got, oracle_successor(&oracle, x));
                }
            }
        }
        prop_assert_eq!(set.len(), oracle.len());
        prop_assert!(set.sanity().is_ok());
    }

    #[test]
    fn working_set_skip_list_agrees_with_btreeset(ops in ops()) {
        let mut set = WorkingSetSkipList::new(0.4).unwrap();
        let mut oracle = BTreeSet::new();

        for op in ops {
            match op {
                Op::Add(x) => {
                    let inserted = set.add(x).unwrap();
                    prop_assert_eq!(inserted, oracle.insert(x));
                }
                Op::Find(x) => {
                    // find() here mutates recency state, but must never
                    // change which keys are present or what the answer is.
                    let got = set.find(&x).into_option().copied();
                    prop_assert_eq!(got, oracle_successor(&oracle, x));
                }
            }
        }
        prop_assert_eq!(set.len(), oracle.len());
        prop_assert!(set.sanity().is_ok());
    }
}

#[test]
fn successor_not_found_past_every_key() {
    let set = SkipSet::from_sorted(vec![1, 2, 3], 0.4).unwrap();
    assert_eq!(set.find(&4), Successor::NotFound);
}
