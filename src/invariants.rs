use core::fmt;

use crate::store::Position;
use crate::{KdTree, Point};

/// A structural inconsistency found by [`KdTree::check_invariants`]
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum InvariantViolation {
    /// The packed store and the handle lookup disagree on how many points are live
    StoreSizeMismatch { stored: usize, indexed: usize },
    /// A stored handle doesn't map back to the slot holding it
    HandleMismatch,
    /// The root is missing, has a parent, or isn't on floor 0
    RootMismatch,
    /// A node other than the root has no parent
    OrphanNode,
    /// A parent doesn't link to its child exactly once
    ChildLinkMismatch,
    /// A child doesn't link back to its parent
    ParentLinkMismatch,
    /// A node isn't exactly one floor below its parent
    FloorMismatch,
    /// The balance index and the balances it mirrors have drifted apart
    BalanceIndexMismatch,
    /// There isn't exactly one cached boundary per live point
    BoundaryCountMismatch,
    LeafHasBoundary,
    MissingBoundary,
    /// A cached boundary names a point that isn't a descendant of its node
    BoundaryNotInSubtree,
    /// A descendant lies outside an ancestor's cached boundary
    BoundaryTooNarrow,
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use InvariantViolation::*;
        match *self {
            StoreSizeMismatch { stored, indexed } => {
                write!(f, "{stored} points stored but {indexed} indexed")
            }
            HandleMismatch => f.write_str("handle lookup points at the wrong slot"),
            RootMismatch => f.write_str("root is missing or not at the top"),
            OrphanNode => f.write_str("non-root node has no parent"),
            ChildLinkMismatch => f.write_str("parent doesn't link to its child exactly once"),
            ParentLinkMismatch => f.write_str("child doesn't link back to its parent"),
            FloorMismatch => f.write_str("floor isn't one below the parent's"),
            BalanceIndexMismatch => f.write_str("balance index out of sync"),
            BoundaryCountMismatch => f.write_str("boundary cache length differs from point count"),
            LeafHasBoundary => f.write_str("leaf has a cached boundary"),
            MissingBoundary => f.write_str("internal node has no cached boundary"),
            BoundaryNotInSubtree => f.write_str("boundary names a point outside its subtree"),
            BoundaryTooNarrow => f.write_str("boundary excludes a descendant"),
        }
    }
}

impl core::error::Error for InvariantViolation {}

impl<const DIM: usize, P: Point<DIM>> KdTree<DIM, P> {
    /// Verify every structural invariant the tree maintains
    ///
    /// Takes time proportional to the number of points times the height. A tree modified only
    /// through its public methods always passes; this is for tests and debugging.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        use InvariantViolation::*;

        let nodes = self.store.nodes();
        if self.store.indexed() != nodes.len() {
            return Err(StoreSizeMismatch {
                stored: nodes.len(),
                indexed: self.store.indexed(),
            });
        }
        if self.bounds.len() != nodes.len() {
            return Err(BoundaryCountMismatch);
        }
        for (position, node) in nodes.iter().enumerate() {
            if self.store.position(&node.handle) != Some(position) {
                return Err(HandleMismatch);
            }
        }
        match self.root {
            None if !nodes.is_empty() => return Err(RootMismatch),
            Some(root)
                if nodes
                    .get(root)
                    .map_or(true, |node| node.parent.is_some() || node.floor != 0) =>
            {
                return Err(RootMismatch)
            }
            _ => {}
        }

        let mut balanced = 0;
        for (position, node) in nodes.iter().enumerate() {
            match node.parent {
                None if self.root != Some(position) => return Err(OrphanNode),
                None => {}
                Some(parent) => {
                    let Some(up) = nodes.get(parent) else {
                        return Err(ChildLinkMismatch);
                    };
                    if (up.lower == Some(position)) == (up.upper == Some(position)) {
                        return Err(ChildLinkMismatch);
                    }
                    if node.floor != up.floor + 1 {
                        return Err(FloorMismatch);
                    }
                }
            }
            for child in [node.lower, node.upper].into_iter().flatten() {
                if nodes.get(child).and_then(|c| c.parent) != Some(position) {
                    return Err(ParentLinkMismatch);
                }
            }
            if let Some(balance) = node.balance {
                if !self.balances.contains(balance, node.floor, position) {
                    return Err(BalanceIndexMismatch);
                }
                balanced += 1;
            }
            match (&self.bounds[position], node.is_leaf()) {
                (Some(_), true) => return Err(LeafHasBoundary),
                (None, false) => return Err(MissingBoundary),
                _ => {}
            }
        }
        if balanced != self.balances.len() {
            return Err(BalanceIndexMismatch);
        }

        // Floors strictly decrease along parent links from here on, so every walk terminates
        for (position, node) in nodes.iter().enumerate() {
            let mut ancestor = node.parent;
            while let Some(up) = ancestor {
                let bounds = self.bounds[up].as_ref().ok_or(MissingBoundary)?;
                if !bounds.contains(&node.handle) {
                    return Err(BoundaryTooNarrow);
                }
                ancestor = nodes[up].parent;
            }

            let Some(bounds) = &self.bounds[position] else {
                continue;
            };
            for handle in bounds.handles() {
                let below = self
                    .store
                    .position(&handle)
                    .ok_or(BoundaryNotInSubtree)?;
                if !self.is_strict_ancestor(position, below) {
                    return Err(BoundaryNotInSubtree);
                }
            }
        }
        Ok(())
    }

    fn is_strict_ancestor(&self, ancestor: Position, mut position: Position) -> bool {
        while let Some(parent) = self.store.node(position).parent {
            if parent == ancestor {
                return true;
            }
            position = parent;
        }
        false
    }
}

#[cfg(test)]
impl<const DIM: usize, P: Point<DIM>> KdTree<DIM, P> {
    /// Points in each position's subtree, itself included
    pub(crate) fn subtree_sizes(&self) -> alloc::vec::Vec<i32> {
        let nodes = self.store.nodes();
        let mut order: alloc::vec::Vec<Position> = (0..nodes.len()).collect();
        order.sort_unstable_by_key(|&p| core::cmp::Reverse(nodes[p].floor));
        let mut sizes = alloc::vec![1; nodes.len()];
        for p in order {
            if let Some(parent) = nodes[p].parent {
                sizes[parent] += sizes[p];
            }
        }
        sizes
    }

    /// Assert that every balance equals the upper subtree's size minus the lower's
    pub(crate) fn assert_exact_skew(&self) {
        let sizes = self.subtree_sizes();
        let size = |child: Option<Position>| child.map_or(0, |c| sizes[c]);
        for node in self.store.nodes() {
            assert_eq!(
                node.balance.unwrap_or(0),
                size(node.upper) - size(node.lower)
            );
        }
    }

    pub(crate) fn max_abs_balance(&self) -> i32 {
        self.store
            .nodes()
            .iter()
            .map(|node| node.balance.unwrap_or(0).abs())
            .max()
            .unwrap_or(0)
    }
}
