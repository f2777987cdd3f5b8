use super::*;

use proptest::prelude::*;
use proptest_derive::Arbitrary;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Arbitrary)]
enum Mark {
    Include,
    Exclude,
}

impl Mark {
    fn included(self) -> bool {
        self == Mark::Include
    }
}

fn validate_tree(t: &PrefixCoverTree) {
    let mut stack = vec![ROOT];
    let mut complete = 0usize;

    while let Some(id) = stack.pop() {
        let node = &t.nodes[id.0];

        if id == ROOT {
            assert!(node.parent.is_none(), "root must not have a parent");
            assert!(node.label.is_empty(), "root label must be empty");
        } else {
            let parent = node.parent.expect("non-root node without parent");
            assert_eq!(
                t.nodes[parent.0].child(first_char(&node.label)),
                Some(id),
                "parent link must point back at the node"
            );
        }

        if node.complete {
            complete += 1;
            assert!(node.is_leaf(), "complete node {:?} has children", t.full_key(id));
        } else if id != ROOT {
            assert!(!node.label.is_empty(), "only sentinels may have empty labels");
            assert!(
                node.children.len() >= 2,
                "structural node {:?} must branch",
                t.full_key(id)
            );
        }

        let firsts: Vec<Option<char>> = node.children.iter().map(|&(c, _)| c).collect();
        assert!(
            firsts.windows(2).all(|w| w[0] < w[1]),
            "children must be sorted with unique first chars"
        );

        for &(first, child) in &node.children {
            assert_eq!(first, first_char(&t.nodes[child.0].label));
            stack.push(child);
        }

        if !node.is_leaf() {
            let all = node.children.iter().all(|&(_, c)| t.nodes[c.0].value);
            assert_eq!(
                node.value,
                all,
                "value of {:?} must be the conjunction of its children",
                t.full_key(id)
            );
        }
    }

    assert_eq!(complete, t.len(), "complete node count must match len");
}

fn covers(prefix: &str, exact: bool, key: &str) -> bool {
    if exact {
        key == prefix
    } else {
        key.starts_with(prefix)
    }
}

fn build(marks: &[(String, Mark)]) -> PrefixCoverTree {
    let mut t = PrefixCoverTree::new();
    for (key, mark) in marks {
        t.insert(key, mark.included()).unwrap();
    }
    t
}

fn marks_strategy() -> impl Strategy<Value = Vec<(String, Mark)>> {
    // A tiny alphabet makes shared prefixes, splits and sentinels common.
    prop::collection::btree_map("[ab/]{0,6}", any::<Mark>(), 0..=24)
        .prop_map(|m| m.into_iter().collect::<Vec<_>>())
        .prop_shuffle()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 512,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_cover_is_sound(marks in marks_strategy()) {
        let t = build(&marks);
        validate_tree(&t);

        let cover: Vec<(String, bool)> = t.matches().collect();
        for (key, mark) in &marks {
            let covered = cover.iter().any(|(p, exact)| covers(p, *exact, key));
            prop_assert_eq!(covered, mark.included(), "key {:?}", key);
        }

        // Boundaries never nest and come out strictly ascending.
        prop_assert!(cover.windows(2).all(|w| w[0].0 < w[1].0));
        for (i, (a, exact_a)) in cover.iter().enumerate() {
            for (j, (b, _)) in cover.iter().enumerate() {
                if i != j {
                    prop_assert!(!covers(a, *exact_a, b), "{:?} covers {:?}", a, b);
                }
            }
        }

        let included = marks.iter().filter(|(_, m)| m.included()).count();
        prop_assert!(cover.len() <= included);
    }

    #[test]
    fn prop_iterate_is_sorted(marks in marks_strategy()) {
        let t = build(&marks);
        let expected: BTreeMap<String, bool> = marks
            .iter()
            .map(|(k, m)| (k.clone(), m.included()))
            .collect();

        let keys: Vec<String> = t.iterate().collect();
        let expected_keys: Vec<String> = expected.keys().cloned().collect();
        prop_assert_eq!(keys, expected_keys);
        prop_assert_eq!(t.len(), expected.len());

        for (key, value) in &expected {
            prop_assert_eq!(t.value(key), Some(*value));
        }
    }

    #[test]
    fn prop_matches_ignore_insertion_order(marks in marks_strategy()) {
        let mut sorted = marks.clone();
        sorted.sort();
        let a: Vec<(String, bool)> = build(&marks).matches().collect();
        let b: Vec<(String, bool)> = build(&sorted).matches().collect();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn prop_reinsert_is_monotonic(marks in marks_strategy()) {
        let mut t = build(&marks);
        let before: Vec<(String, bool)> = t.matches().collect();

        for (key, mark) in &marks {
            match mark {
                Mark::Include => prop_assert!(t.include(key).is_ok()),
                Mark::Exclude => {
                    let is_invalid = matches!(
                        t.include(key),
                        Err(Error::InvalidTransition { .. })
                    );
                    prop_assert!(is_invalid);
                    prop_assert!(t.exclude(key).is_ok());
                }
            }
        }

        validate_tree(&t);
        let after: Vec<(String, bool)> = t.matches().collect();
        prop_assert_eq!(before, after);
    }
}

fn for_each_permutation<T: Clone>(items: &[T], mut f: impl FnMut(Vec<T>)) {
    fn rec<T: Clone>(items: &[T], used: &mut [bool], out: &mut Vec<T>, f: &mut impl FnMut(Vec<T>)) {
        if out.len() == items.len() {
            f(out.clone());
            return;
        }
        for i in 0..items.len() {
            if used[i] {
                continue;
            }
            used[i] = true;
            out.push(items[i].clone());
            rec(items, used, out, f);
            out.pop();
            used[i] = false;
        }
    }

    let mut used = vec![false; items.len()];
    let mut out = Vec::with_capacity(items.len());
    rec(items, &mut used, &mut out, &mut f);
}

#[test]
fn exhaustive_insert_order_small_set() {
    let marks: Vec<(String, Mark)> = vec![
        ("".to_string(), Mark::Include),
        ("a".to_string(), Mark::Exclude),
        ("ab".to_string(), Mark::Include),
        ("a/".to_string(), Mark::Include),
        ("a/b".to_string(), Mark::Include),
        ("b".to_string(), Mark::Include),
    ];

    let expected: Vec<(String, bool)> = vec![
        ("".to_string(), true),
        ("a/".to_string(), false),
        ("ab".to_string(), true),
        ("b".to_string(), true),
    ];

    for_each_permutation(&marks, |perm| {
        let t = build(&perm);
        validate_tree(&t);
        let got: Vec<(String, bool)> = t.matches().collect();
        assert_eq!(got, expected, "insert order {:?}", perm);
    });
}

#[test]
fn stress_large_site() {
    let mut marks = Vec::new();
    for section in 0..100 {
        for page in 0..100 {
            let key = format!("section{}/page{}.html", section, page);
            let mark = if section % 3 == 0 || page % 10 == 0 {
                Mark::Include
            } else {
                Mark::Exclude
            };
            marks.push((key, mark));
        }
    }

    let mut rng = StdRng::seed_from_u64(0x5eed);
    marks.shuffle(&mut rng);

    let t = build(&marks);
    validate_tree(&t);
    assert_eq!(t.len(), 10_000);

    let cover: Vec<(String, bool)> = t.matches().collect();
    for (key, mark) in &marks {
        let covered = cover.iter().any(|(p, exact)| covers(p, *exact, key));
        assert_eq!(covered, mark.included(), "key {:?}", key);
    }

    let included = marks.iter().filter(|(_, m)| m.included()).count();
    assert!(
        cover.len() < included / 2,
        "cover of {} entries for {} included keys",
        cover.len(),
        included
    );
}
