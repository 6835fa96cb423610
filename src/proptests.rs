use super::*;

use alloc::vec::Vec;
use proptest::prelude::*;
use std::format;

const POOL: usize = 24;

#[derive(Debug, Clone)]
enum Op {
    Insert(usize),
    Erase(usize),
    Rebalance,
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    let index = 0..POOL;
    let op = prop_oneof![
        50 => index.clone().prop_map(Op::Insert),
        30 => index.prop_map(Op::Erase),
        20 => Just(Op::Rebalance),
    ];
    prop::collection::vec(op, 0..=300)
}

/// Coordinates drawn from a tiny range so that ties are common
fn points_strategy() -> impl Strategy<Value = Vec<[i32; 2]>> {
    prop::collection::vec([0i32..5, 0i32..5], POOL)
}

fn live_count(live: &[bool]) -> usize {
    live.iter().filter(|&&l| l).count()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 10_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_structure_survives_mutation(points in points_strategy(), ops in ops_strategy()) {
        let mut t = KdTree::<2, _>::new();
        let mut live = [false; POOL];

        for op in ops {
            match op {
                Op::Insert(i) => {
                    prop_assert_eq!(t.insert(ByAddress(&points[i])), !live[i]);
                    live[i] = true;
                }
                Op::Erase(i) => {
                    prop_assert_eq!(t.erase(ByAddress(&points[i])), live[i]);
                    live[i] = false;
                }
                Op::Rebalance => {
                    t.rebalance();
                    prop_assert!(t.max_abs_balance() <= 1);
                    prop_assert!(!t.rebalance_iteration());
                }
            }

            prop_assert_eq!(t.len(), live_count(&live));
            prop_assert_eq!(t.check_invariants(), Ok(()));
            t.assert_exact_skew();
        }

        for (p, &l) in points.iter().zip(&live) {
            prop_assert_eq!(t.contains(&ByAddress(p)), l);
        }
    }

    #[test]
    fn prop_rebalanced_height_is_minimal(points in prop::collection::vec([0i32..8, 0i32..8, 0i32..8], 1..=POOL)) {
        let mut t = KdTree::<3, _>::new();
        for p in &points {
            t.insert(ByAddress(p));
            t.rebalance();
        }
        prop_assert_eq!(t.check_invariants(), Ok(()));
        // Balances within ±1 everywhere leave no room for a taller tree
        let minimal = (usize::BITS - points.len().leading_zeros()) as usize;
        prop_assert_eq!(t.height(), minimal);
    }

    #[test]
    fn prop_drains_to_empty(points in points_strategy(), order in Just((0..POOL).collect::<Vec<_>>()).prop_shuffle()) {
        let mut t = KdTree::<2, _>::new();
        for p in &points {
            t.insert(ByAddress(p));
        }
        t.rebalance();

        for (erased, &i) in order.iter().enumerate() {
            prop_assert!(t.erase(ByAddress(&points[i])));
            prop_assert_eq!(t.len(), POOL - erased - 1);
            prop_assert_eq!(t.check_invariants(), Ok(()));
        }
        prop_assert!(t.is_empty());
        prop_assert_eq!(t.bounds(), None);
        prop_assert_eq!(t.height(), 0);
    }
}
