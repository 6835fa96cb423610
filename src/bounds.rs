use crate::point::{lower_on, Point};

/// An axis-aligned bounding box described by the points that attain its extremes
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Bounds<const DIM: usize, P> {
    /// Point with the smallest coordinate on each axis
    pub min: [P; DIM],
    /// Point with the largest coordinate on each axis
    pub max: [P; DIM],
}

impl<const DIM: usize, P: Point<DIM>> Bounds<DIM, P> {
    /// Construct a box covering a single point
    pub fn point(p: P) -> Self {
        Self {
            min: [p; DIM],
            max: [p; DIM],
        }
    }

    /// Grow to cover `p`
    pub fn extend(&mut self, p: P) {
        for i in 0..DIM {
            if lower_on(&p, &self.min[i], i) {
                self.min[i] = p;
            }
            if lower_on(&self.max[i], &p, i) {
                self.max[i] = p;
            }
        }
    }

    /// Grow to cover `other`
    pub fn union(&mut self, other: &Self) {
        for i in 0..DIM {
            if lower_on(&other.min[i], &self.min[i], i) {
                self.min[i] = other.min[i];
            }
            if lower_on(&self.max[i], &other.max[i], i) {
                self.max[i] = other.max[i];
            }
        }
    }

    /// Whether `p` lies inside the box, boundary included
    pub fn contains(&self, p: &P) -> bool {
        (0..DIM).all(|i| !lower_on(p, &self.min[i], i) && !lower_on(&self.max[i], p, i))
    }

    /// Every handle the box refers to, minima first
    pub fn handles(&self) -> impl Iterator<Item = P> + '_ {
        self.min.iter().chain(&self.max).copied()
    }

    /// Smallest box covering each child point together with that child's own cached box
    ///
    /// Children are folded in iteration order, so on ties the earliest extreme wins. Returns
    /// `None` when there are no children.
    pub(crate) fn enclosing<'a, I>(children: I) -> Option<Self>
    where
        I: IntoIterator<Item = (P, Option<&'a Self>)>,
        P: 'a,
    {
        let mut out: Option<Self> = None;
        for (child, cached) in children {
            let acc = out.get_or_insert_with(|| Self::point(child));
            acc.extend(child);
            if let Some(cached) = cached {
                acc.union(cached);
            }
        }
        out
    }
}
