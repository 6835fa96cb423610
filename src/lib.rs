//! A mutable K-dimensional tree that keeps itself balanced by reinsertion
//!
//! [`KdTree`] indexes externally owned points through copyable handles. For every node it caches
//! the depth ("floor"), a signed balance counter, and the [`Bounds`] of the node's descendants,
//! and keeps all three current as points are inserted and erased. Searching is left to higher
//! layers, which can walk the topology with [`KdTree::lower`], [`KdTree::upper`] and
//! [`KdTree::boundary`].
//!
//! Nothing is rebalanced implicitly. After a batch of changes, call
//! [`rebalance`](KdTree::rebalance) (or [`rebalance_iteration`](KdTree::rebalance_iteration) in a
//! loop) to repeatedly reinsert the most lopsided node until every balance is within ±1.
//!
//! ```
//! use drift_kdtree::{ByAddress, KdTree};
//!
//! let points = [[0.0, 0.0], [1.0, 2.0], [3.0, 1.0], [2.0, 2.0]];
//! let mut tree = KdTree::<2, _>::new();
//! for p in &points {
//!     tree.insert(ByAddress(p));
//!     tree.rebalance();
//! }
//! assert_eq!(tree.len(), 4);
//!
//! let bounds = tree.bounds().unwrap();
//! assert_eq!(bounds.max[0], ByAddress(&points[2]));
//!
//! tree.erase(ByAddress(&points[1]));
//! assert!(!tree.contains(&ByAddress(&points[1])));
//! ```
#![no_std]

extern crate alloc;
#[cfg(test)]
extern crate std;

use alloc::vec::Vec;
use core::cmp::Ordering;

use arrayvec::ArrayVec;
use tracing::{debug, trace};

mod bounds;
mod invariants;
mod point;
mod priority;
#[cfg(test)]
mod proptests;
mod store;

pub use bounds::Bounds;
pub use invariants::InvariantViolation;
pub use point::{ByAddress, Coordinates, Point};

use point::lower_on;
use priority::BalanceIndex;
use store::{Node, Position, Side, Store};

/// A `DIM`-dimensional tree over point handles of type `P`
#[derive(Debug, Clone)]
pub struct KdTree<const DIM: usize, P> {
    root: Option<Position>,
    store: Store<P>,
    /// Box over each position's descendants, `None` for leaves
    bounds: Vec<Option<Bounds<DIM, P>>>,
    balances: BalanceIndex,
}

impl<const DIM: usize, P: Point<DIM>> KdTree<DIM, P> {
    const NONZERO_DIM: () = assert!(DIM > 0, "a tree needs at least one axis");

    /// Create an empty tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty tree with room for `capacity` points
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            root: None,
            store: Store::with_capacity(capacity),
            bounds: Vec::with_capacity(capacity),
            balances: BalanceIndex::default(),
        }
    }

    /// Add `handle` as a new leaf, returning `false` if it was already present
    ///
    /// The point descends from the root comparing one axis per floor, cycling through the axes.
    /// Each node it passes records the side it went down and grows its cached bounds to cover
    /// it. A coordinate equal to the node's goes to the lower side only if the upper side is
    /// currently heavier.
    pub fn insert(&mut self, handle: P) -> bool {
        let () = Self::NONZERO_DIM;
        if self.store.position(&handle).is_some() {
            return false;
        }

        let mut parent = None;
        let mut current = self.root;
        let mut axis = 0;
        while let Some(position) = current {
            let node = self.store.node(position);
            let side = match handle
                .coordinate(axis)
                .partial_cmp(&node.handle.coordinate(axis))
            {
                Some(Ordering::Less) => Side::Lower,
                Some(Ordering::Equal) if node.balance.unwrap_or(0) > 0 => Side::Lower,
                _ => Side::Upper,
            };
            current = node.child(side);
            self.update_balance(position, side == Side::Upper);
            self.bounds[position]
                .get_or_insert_with(|| Bounds::point(handle))
                .extend(handle);
            parent = Some((position, side));
            axis = (axis + 1) % DIM;
        }

        let position = self.store.append(handle);
        self.bounds.push(None);
        match parent {
            Some((parent, side)) => self.store.attach(parent, side, position),
            None => self.root = Some(position),
        }
        true
    }

    /// Remove `handle`, returning `false` if it wasn't present
    ///
    /// An internal node is never unlinked directly. Its handle trades places with a replacement
    /// from below, and that repeats down a chain of positions until the handle sits in a leaf,
    /// which is dropped. Every ancestor of that leaf then has its balance and cached bounds
    /// updated on the way back up to the root.
    pub fn erase(&mut self, handle: P) -> bool {
        let Some(target) = self.store.position(&handle) else {
            return false;
        };

        let mut chain = Vec::new();
        let mut current = target;
        while !self.store.is_leaf(current) {
            chain.push(current);
            current = self.replacement(current);
        }
        chain.push(current);
        trace!(length = chain.len(), "erasing through swap-chain");
        for pair in chain.windows(2) {
            self.store.swap_handles(pair[0], pair[1]);
        }

        let leaf = current;
        debug_assert!(self.store.handle(leaf) == handle, "swap-chain lost the handle");
        debug_assert!(self.bounds[leaf].is_none(), "leaf has cached bounds");
        let detached = self.store.detach(leaf);
        self.forget_balance(leaf);
        let moved = self.swap_remove(leaf);

        let Some((mut parent, side)) = detached else {
            self.root = None;
            debug_assert!(
                self.store.len() == 0 && self.bounds.is_empty() && self.balances.is_empty(),
                "erasing the root left state behind"
            );
            return true;
        };
        if parent == moved {
            parent = leaf;
        }

        // `parent` lost a point on `side`, and so did every ancestor on the side leading to it
        self.update_balance(parent, side == Side::Lower);
        let mut current = parent;
        loop {
            self.refresh_bounds(current);
            let Some((ancestor, side)) = self.store.parent_side(current) else {
                break;
            };
            self.update_balance(ancestor, side == Side::Lower);
            current = ancestor;
        }
        true
    }

    /// Reinsert the most imbalanced node, returning `false` once every balance is within ±1
    ///
    /// Considers the lowest and the highest balance in the tree, keeps those whose magnitude
    /// exceeds 1, and picks the larger. The shallowest node holding that balance is erased and
    /// inserted again.
    pub fn rebalance_iteration(&mut self) -> bool {
        let mut candidates = ArrayVec::<(i32, Position), 2>::new();
        if let Some(worst) = self.balances.worst_negative().filter(|&(b, _)| b < -1) {
            candidates.push(worst);
        }
        if let Some(worst) = self.balances.worst_positive().filter(|&(b, _)| b > 1) {
            candidates.push(worst);
        }
        // `max_by_key` keeps the last of equal maxima, so ties go to the positive side
        let Some(&(balance, position)) = candidates.iter().max_by_key(|(b, _)| b.unsigned_abs())
        else {
            return false;
        };

        let handle = self.store.handle(position);
        trace!(
            position,
            balance,
            floor = self.store.node(position).floor,
            "reinserting"
        );
        self.erase(handle);
        self.insert(handle);
        true
    }

    /// Run [`rebalance_iteration`](Self::rebalance_iteration) until it reports no work,
    /// returning how many nodes were reinserted
    pub fn rebalance(&mut self) -> usize {
        let mut iterations = 0;
        while self.rebalance_iteration() {
            iterations += 1;
        }
        debug!(iterations, points = self.len(), "rebalanced");
        iterations
    }

    /// Number of live points
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn contains(&self, handle: &P) -> bool {
        self.store.position(handle).is_some()
    }

    /// Forget every point
    pub fn clear(&mut self) {
        self.root = None;
        self.store.clear();
        self.bounds.clear();
        self.balances.clear();
    }

    /// Live handles, in storage order
    pub fn iter(&self) -> impl Iterator<Item = P> + '_ {
        self.store.nodes().iter().map(|node| node.handle)
    }

    /// The handle at the root
    pub fn origin(&self) -> Option<P> {
        self.root.map(|root| self.store.handle(root))
    }

    pub fn parent(&self, handle: &P) -> Option<P> {
        self.related(handle, |node| node.parent)
    }

    /// The child holding points below `handle` on its splitting axis
    pub fn lower(&self, handle: &P) -> Option<P> {
        self.related(handle, |node| node.lower)
    }

    /// The child holding points at or above `handle` on its splitting axis
    pub fn upper(&self, handle: &P) -> Option<P> {
        self.related(handle, |node| node.upper)
    }

    /// Depth of `handle` below the root
    ///
    /// The splitting axis of a node is its floor modulo `DIM`.
    pub fn floor(&self, handle: &P) -> Option<u32> {
        let position = self.store.position(handle)?;
        Some(self.store.node(position).floor)
    }

    /// Upper minus lower descendants of `handle`, as tracked incrementally
    pub fn balance(&self, handle: &P) -> Option<i32> {
        let position = self.store.position(handle)?;
        Some(self.store.node(position).balance.unwrap_or(0))
    }

    /// Cached bounds of the descendants of `handle`, excluding `handle` itself
    ///
    /// `None` for leaves and for handles not in the tree.
    pub fn boundary(&self, handle: &P) -> Option<&Bounds<DIM, P>> {
        self.bounds[self.store.position(handle)?].as_ref()
    }

    /// Bounds of every point in the tree
    pub fn bounds(&self) -> Option<Bounds<DIM, P>> {
        let root = self.root?;
        let mut out = Bounds::point(self.store.handle(root));
        if let Some(below) = &self.bounds[root] {
            out.union(below);
        }
        Some(out)
    }

    /// Number of floors, 0 for an empty tree
    pub fn height(&self) -> usize {
        self.store
            .nodes()
            .iter()
            .map(|node| node.floor as usize + 1)
            .max()
            .unwrap_or(0)
    }

    fn related(&self, handle: &P, f: impl FnOnce(&Node<P>) -> Option<Position>) -> Option<P> {
        let node = self.store.node(self.store.position(handle)?);
        f(node).map(|position| self.store.handle(position))
    }

    /// Step the balance at `position` by one, keeping the balance index in sync
    fn update_balance(&mut self, position: Position, increase: bool) {
        let node = self.store.node_mut(position);
        if let Some(old) = node.balance {
            self.balances.remove(old, node.floor, position);
        }
        let new = node.balance.unwrap_or(0) + if increase { 1 } else { -1 };
        node.balance = Some(new);
        self.balances.insert(new, node.floor, position);
    }

    fn forget_balance(&mut self, position: Position) {
        let node = self.store.node_mut(position);
        if let Some(balance) = node.balance.take() {
            self.balances.remove(balance, node.floor, position);
        }
    }

    /// Recompute the cached bounds of `position` from its children
    fn refresh_bounds(&mut self, position: Position) {
        let node = self.store.node(position);
        let fresh = Bounds::enclosing(
            [node.lower, node.upper]
                .into_iter()
                .flatten()
                .map(|child| (self.store.handle(child), self.bounds[child].as_ref())),
        );
        self.bounds[position] = fresh;
    }

    /// Choose the position whose handle should take over from the internal node at `position`
    ///
    /// When the lower side is heavier, that's the largest point below on the node's splitting
    /// axis; otherwise the smallest point above. The cached bounds of the child name that point
    /// directly, so no subtree is scanned.
    fn replacement(&self, position: Position) -> Position {
        let node = self.store.node(position);
        let axis = node.floor as usize % DIM;
        let (child, side) = match (node.lower, node.upper) {
            (Some(lower), _) if node.balance.unwrap_or(0) < 0 => (lower, Side::Lower),
            (_, Some(upper)) => (upper, Side::Upper),
            (Some(lower), None) => (lower, Side::Lower),
            (None, None) => unreachable!("leaves have no replacement"),
        };
        let Some(below) = &self.bounds[child] else {
            return child;
        };

        let handle = self.store.handle(child);
        let (extreme, beyond) = match side {
            Side::Lower => (below.max[axis], lower_on(&handle, &below.max[axis], axis)),
            Side::Upper => (below.min[axis], lower_on(&below.min[axis], &handle, axis)),
        };
        if !beyond {
            return child;
        }
        self.store
            .position(&extreme)
            .expect("cached bounds refer to a missing point")
    }

    /// Fill the unlinked slot at `position` with the last stored node, returning the position
    /// that node used to occupy
    fn swap_remove(&mut self, position: Position) -> Position {
        let last = self.store.len() - 1;
        if position != last {
            let moved = self.store.node(last);
            if let Some(balance) = moved.balance {
                self.balances.remove(balance, moved.floor, last);
                self.balances.insert(balance, moved.floor, position);
            }
            if self.root == Some(last) {
                self.root = Some(position);
            }
        }
        self.store.swap_remove(position);
        self.bounds.swap_remove(position);
        last
    }
}

impl<const DIM: usize, P> Default for KdTree<DIM, P> {
    fn default() -> Self {
        Self {
            root: None,
            store: Store::default(),
            bounds: Vec::new(),
            balances: BalanceIndex::default(),
        }
    }
}
