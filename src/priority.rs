use alloc::collections::{BTreeMap, BTreeSet};

/// Positions grouped by balance, then by floor
///
/// Mirrors every `balance` a tree holds so that the most imbalanced node closest to the root can
/// be found without a scan. Empty groups are pruned eagerly, so the first and last keys are always
/// live balances.
#[derive(Debug, Default, Clone)]
pub(crate) struct BalanceIndex {
    buckets: BTreeMap<i32, BTreeMap<u32, BTreeSet<usize>>>,
    len: usize,
}

impl BalanceIndex {
    pub fn insert(&mut self, balance: i32, floor: u32, position: usize) {
        let inserted = self
            .buckets
            .entry(balance)
            .or_default()
            .entry(floor)
            .or_default()
            .insert(position);
        debug_assert!(inserted, "position {position} indexed twice");
        self.len += 1;
    }

    pub fn remove(&mut self, balance: i32, floor: u32, position: usize) {
        let floors = self
            .buckets
            .get_mut(&balance)
            .expect("balance missing from index");
        let positions = floors.get_mut(&floor).expect("floor missing from index");
        let removed = positions.remove(&position);
        debug_assert!(removed, "position {position} missing from index");
        if positions.is_empty() {
            floors.remove(&floor);
            if floors.is_empty() {
                self.buckets.remove(&balance);
            }
        }
        self.len -= 1;
    }

    /// The lowest balance held by any position, and the shallowest position holding it
    pub fn worst_negative(&self) -> Option<(i32, usize)> {
        let (&balance, floors) = self.buckets.first_key_value()?;
        Some((balance, shallowest(floors)))
    }

    /// The highest balance held by any position, and the shallowest position holding it
    pub fn worst_positive(&self) -> Option<(i32, usize)> {
        let (&balance, floors) = self.buckets.last_key_value()?;
        Some((balance, shallowest(floors)))
    }

    pub fn contains(&self, balance: i32, floor: u32, position: usize) -> bool {
        self.buckets
            .get(&balance)
            .and_then(|floors| floors.get(&floor))
            .is_some_and(|positions| positions.contains(&position))
    }

    /// Number of indexed positions
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
        self.len = 0;
    }
}

fn shallowest(floors: &BTreeMap<u32, BTreeSet<usize>>) -> usize {
    let (_, positions) = floors.first_key_value().expect("empty balance bucket");
    *positions.first().expect("empty floor bucket")
}
