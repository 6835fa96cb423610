use alloc::vec::Vec;
use core::hash::Hash;

use hashbrown::HashMap;

/// Index of a live point's slot in the packed store
///
/// Positions are reassigned when the store is compacted, so they never leave the crate.
pub(crate) type Position = usize;

/// Which child of its parent a node is
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) enum Side {
    Lower,
    Upper,
}

/// Everything the tree knows about one position, except its cached bounds
#[derive(Debug, Clone)]
pub(crate) struct Node<P> {
    pub handle: P,
    pub parent: Option<Position>,
    pub lower: Option<Position>,
    pub upper: Option<Position>,
    /// Depth below the root
    pub floor: u32,
    /// Upper minus lower descents recorded so far, `None` until the first one
    pub balance: Option<i32>,
}

impl<P> Node<P> {
    pub fn child(&self, side: Side) -> Option<Position> {
        match side {
            Side::Lower => self.lower,
            Side::Upper => self.upper,
        }
    }

    fn child_mut(&mut self, side: Side) -> &mut Option<Position> {
        match side {
            Side::Lower => &mut self.lower,
            Side::Upper => &mut self.upper,
        }
    }

    /// Which side `child` hangs from, if it's a child at all
    fn side_of(&self, child: Position) -> Option<Side> {
        if self.lower == Some(child) {
            Some(Side::Lower)
        } else if self.upper == Some(child) {
            Some(Side::Upper)
        } else {
            None
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.lower.is_none() && self.upper.is_none()
    }
}

/// Dense array of nodes plus the reverse lookup from handle to position
#[derive(Debug, Clone)]
pub(crate) struct Store<P> {
    nodes: Vec<Node<P>>,
    positions: HashMap<P, Position>,
}

impl<P> Default for Store<P> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            positions: HashMap::default(),
        }
    }
}

impl<P: Copy + Eq + Hash> Store<P> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            positions: HashMap::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn position(&self, handle: &P) -> Option<Position> {
        self.positions.get(handle).copied()
    }

    /// Number of entries in the reverse lookup, which matches `len` unless the store is corrupt
    pub fn indexed(&self) -> usize {
        self.positions.len()
    }

    pub fn node(&self, position: Position) -> &Node<P> {
        &self.nodes[position]
    }

    pub fn node_mut(&mut self, position: Position) -> &mut Node<P> {
        &mut self.nodes[position]
    }

    pub fn nodes(&self) -> &[Node<P>] {
        &self.nodes
    }

    pub fn handle(&self, position: Position) -> P {
        self.nodes[position].handle
    }

    pub fn is_leaf(&self, position: Position) -> bool {
        self.nodes[position].is_leaf()
    }

    /// The parent of `child`, and which of its children `child` is
    pub fn parent_side(&self, child: Position) -> Option<(Position, Side)> {
        let parent = self.nodes[child].parent?;
        let side = self.nodes[parent]
            .side_of(child)
            .expect("parent doesn't refer to its child");
        Some((parent, side))
    }

    /// Store `handle` in a fresh, unlinked slot at floor 0
    pub fn append(&mut self, handle: P) -> Position {
        let position = self.nodes.len();
        self.nodes.push(Node {
            handle,
            parent: None,
            lower: None,
            upper: None,
            floor: 0,
            balance: None,
        });
        let prev = self.positions.insert(handle, position);
        debug_assert!(prev.is_none(), "handle stored twice");
        position
    }

    /// Link `child` below `parent`, one floor deeper
    pub fn attach(&mut self, parent: Position, side: Side, child: Position) {
        debug_assert!(
            self.nodes[parent].child(side).is_none(),
            "overwriting a child link"
        );
        *self.nodes[parent].child_mut(side) = Some(child);
        let floor = self.nodes[parent].floor + 1;
        let node = &mut self.nodes[child];
        node.parent = Some(parent);
        node.floor = floor;
    }

    /// Unlink a leaf from its parent, returning the parent and the side the leaf was on
    pub fn detach(&mut self, child: Position) -> Option<(Position, Side)> {
        debug_assert!(self.nodes[child].is_leaf(), "detaching a subtree");
        let (parent, side) = self.parent_side(child)?;
        *self.nodes[parent].child_mut(side) = None;
        self.nodes[child].parent = None;
        Some((parent, side))
    }

    /// Exchange the handles held by two positions, leaving topology untouched
    pub fn swap_handles(&mut self, a: Position, b: Position) {
        let handle_a = self.nodes[a].handle;
        let handle_b = self.nodes[b].handle;
        self.nodes[a].handle = handle_b;
        self.nodes[b].handle = handle_a;
        self.positions.insert(handle_a, b);
        self.positions.insert(handle_b, a);
    }

    /// Drop the unlinked node at `position`, moving the last node into its slot
    ///
    /// Links to and from the moved node are rewritten to follow it. Returns the removed node.
    pub fn swap_remove(&mut self, position: Position) -> Node<P> {
        debug_assert!(
            self.nodes[position].parent.is_none() && self.nodes[position].is_leaf(),
            "removing a linked node"
        );
        let last = self.nodes.len() - 1;
        let removed = self.nodes.swap_remove(position);
        self.positions.remove(&removed.handle);
        if position == last {
            return removed;
        }

        let moved = &self.nodes[position];
        let (handle, parent, lower, upper) = (moved.handle, moved.parent, moved.lower, moved.upper);
        *self
            .positions
            .get_mut(&handle)
            .expect("moved handle missing from store") = position;
        if let Some(parent) = parent {
            let side = self.nodes[parent]
                .side_of(last)
                .expect("parent doesn't refer to its child");
            *self.nodes[parent].child_mut(side) = Some(position);
        }
        for child in [lower, upper].into_iter().flatten() {
            self.nodes[child].parent = Some(position);
        }
        removed
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.positions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> Store<u32> {
        // 10 -> lower 20 -> upper 30
        let mut s = Store::default();
        let a = s.append(10);
        let b = s.append(20);
        let c = s.append(30);
        s.attach(a, Side::Lower, b);
        s.attach(b, Side::Upper, c);
        s
    }

    #[test]
    fn attach_sets_floor() {
        let s = chain();
        assert_eq!(s.node(2).floor, 2);
        assert_eq!(s.parent_side(2), Some((1, Side::Upper)));
        assert_eq!(s.parent_side(1), Some((0, Side::Lower)));
        assert_eq!(s.parent_side(0), None);
        assert!(s.is_leaf(2));
        assert!(!s.is_leaf(0));
    }

    #[test]
    fn swap_remove_relinks_moved_node() {
        let mut s = chain();
        let extra = s.append(40);
        s.attach(0, Side::Upper, extra);
        // Unlink the leaf holding 30, then fill its slot from the tail
        s.detach(2);
        let removed = s.swap_remove(2);
        assert_eq!(removed.handle, 30);
        assert_eq!(s.len(), 3);
        assert_eq!(s.position(&40), Some(2));
        assert_eq!(s.node(0).upper, Some(2));
        assert_eq!(s.parent_side(2), Some((0, Side::Upper)));
        assert_eq!(s.position(&30), None);
        assert_eq!(s.indexed(), 3);
    }

    #[test]
    fn swap_remove_relinks_children_of_moved_node() {
        let mut s = Store::default();
        let root = s.append(1u32);
        let leaf = s.append(2);
        let below = s.append(3);
        let inner = s.append(4);
        s.attach(root, Side::Lower, leaf);
        s.attach(root, Side::Upper, inner);
        s.attach(inner, Side::Lower, below);
        s.detach(leaf);
        s.swap_remove(leaf);
        assert_eq!(s.position(&4), Some(1));
        assert_eq!(s.node(root).upper, Some(1));
        assert_eq!(s.node(1).lower, Some(2));
        assert_eq!(s.node(2).parent, Some(1));
        assert_eq!(s.node(2).floor, 2);
    }

    #[test]
    fn swap_handles_keeps_topology() {
        let mut s = chain();
        s.swap_handles(0, 2);
        assert_eq!(s.handle(0), 30);
        assert_eq!(s.position(&10), Some(2));
        assert_eq!(s.node(0).lower, Some(1));
        assert!(s.is_leaf(2));
    }
}
