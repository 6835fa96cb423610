use core::hash::{Hash, Hasher};
use core::{fmt, ptr};

/// Handle to an externally owned point record
///
/// The tree never owns the records it indexes. It keeps copies of their handles, uses `Eq` and
/// `Hash` for identity, and reads coordinates through [`coordinate`](Self::coordinate). A point's
/// coordinates must not change while its handle is live in a tree.
pub trait Point<const DIM: usize>: Copy + Eq + Hash {
    type Scalar: PartialOrd;

    /// Coordinate on `axis`, which is always less than `DIM`
    fn coordinate(&self, axis: usize) -> Self::Scalar;
}

/// Types that expose `DIM` coordinates, but whose values aren't suitable identities
pub trait Coordinates<const DIM: usize> {
    type Scalar: PartialOrd;

    fn coordinate(&self, axis: usize) -> Self::Scalar;
}

impl<const DIM: usize, S: PartialOrd + Copy> Coordinates<DIM> for [S; DIM] {
    type Scalar = S;

    #[inline]
    fn coordinate(&self, axis: usize) -> S {
        self[axis]
    }
}

/// A borrowed point record whose identity is its address
///
/// Two `ByAddress` handles are equal only if they refer to the same record, even if the records
/// hold identical coordinates.
pub struct ByAddress<'a, T: ?Sized>(pub &'a T);

impl<'a, T: ?Sized> ByAddress<'a, T> {
    pub fn get(self) -> &'a T {
        self.0
    }
}

impl<T: ?Sized> Clone for ByAddress<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: ?Sized> Copy for ByAddress<'_, T> {}

impl<T: ?Sized> PartialEq for ByAddress<'_, T> {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self.0, other.0)
    }
}

impl<T: ?Sized> Eq for ByAddress<'_, T> {}

impl<T: ?Sized> Hash for ByAddress<'_, T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        ptr::hash(self.0, state)
    }
}

impl<T: ?Sized> fmt::Debug for ByAddress<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ByAddress({:p})", self.0)
    }
}

impl<const DIM: usize, T: Coordinates<DIM> + ?Sized> Point<DIM> for ByAddress<'_, T> {
    type Scalar = T::Scalar;

    #[inline]
    fn coordinate(&self, axis: usize) -> T::Scalar {
        self.0.coordinate(axis)
    }
}

/// `true` if `a` is strictly below `b` on `axis`
#[inline]
pub(crate) fn lower_on<const DIM: usize, P: Point<DIM>>(a: &P, b: &P, axis: usize) -> bool {
    a.coordinate(axis) < b.coordinate(axis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_ignores_coordinates() {
        let points = [[1.0f32, 2.0], [1.0, 2.0]];
        let a = ByAddress(&points[0]);
        let b = ByAddress(&points[1]);
        assert_ne!(a, b);
        assert_eq!(a, ByAddress(&points[0]));
        assert_eq!(Point::<2>::coordinate(&a, 1), 2.0);
    }

    #[test]
    fn strict_comparison() {
        let points = [[1, 5], [1, 7]];
        let a = ByAddress(&points[0]);
        let b = ByAddress(&points[1]);
        assert!(!lower_on::<2, _>(&a, &b, 0));
        assert!(!lower_on::<2, _>(&b, &a, 0));
        assert!(lower_on::<2, _>(&a, &b, 1));
    }
}
