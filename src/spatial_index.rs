//! Component B: a bounding-box spatial index with `insert`/`query`, built on
//! `rstar` (the R-tree crate this corpus' closest geometry library, `geo`,
//! uses for exactly this kind of bounding-box range query — see e.g.
//! `geo::algorithm::concave_hull`). No deletions, matching spec.md §4.2.

use crate::geometry::Vec2;
use rstar::{RTree, RTreeObject, AABB};

/// An axis-aligned bounding rectangle in the plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub lo: Vec2,
    pub hi: Vec2,
}

impl Rect {
    pub fn from_points(a: Vec2, b: Vec2) -> Self {
        Self {
            lo: Vec2::new(a.x.min(b.x), a.y.min(b.y)),
            hi: Vec2::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    pub fn from_center_radius(center: Vec2, radius: f64) -> Self {
        Self {
            lo: Vec2::new(center.x - radius, center.y - radius),
            hi: Vec2::new(center.x + radius, center.y + radius),
        }
    }

    pub fn union(self, other: Rect) -> Rect {
        Rect {
            lo: Vec2::new(self.lo.x.min(other.lo.x), self.lo.y.min(other.lo.y)),
            hi: Vec2::new(self.hi.x.max(other.hi.x), self.hi.y.max(other.hi.y)),
        }
    }

    fn envelope(self) -> AABB<[f64; 2]> {
        AABB::from_corners([self.lo.x, self.lo.y], [self.hi.x, self.hi.y])
    }
}

struct Entry<T> {
    rect: Rect,
    payload: T,
}

impl<T> RTreeObject for Entry<T> {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.rect.envelope()
    }
}

/// A grow-only bounding-box index over opaque payloads (`RegionI`-style
/// indices into a slice or arena live elsewhere, per spec.md §4.2 — boundary
/// segments during MIC queries, finished slices during collision/shortcut
/// queries).
pub struct SpatialIndex<T> {
    tree: RTree<Entry<T>>,
}

impl<T> Default for SpatialIndex<T> {
    fn default() -> Self {
        Self { tree: RTree::new() }
    }
}

impl<T> SpatialIndex<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, rect: Rect, payload: T) {
        self.tree.insert(Entry { rect, payload });
    }

    /// All payloads whose bounding rectangle overlaps `rect`.
    pub fn query(&self, rect: Rect) -> impl Iterator<Item = &T> {
        self.tree
            .locate_in_envelope_intersecting(&rect.envelope())
            .map(|e| &e.payload)
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_returns_only_overlapping_rects() {
        let mut idx: SpatialIndex<usize> = SpatialIndex::new();
        idx.insert(Rect::from_points(Vec2::new(0.0, 0.0), Vec2::new(1.0, 1.0)), 0usize);
        idx.insert(Rect::from_points(Vec2::new(5.0, 5.0), Vec2::new(6.0, 6.0)), 1usize);

        let hits: Vec<_> = idx
            .query(Rect::from_points(Vec2::new(-1.0, -1.0), Vec2::new(2.0, 2.0)))
            .copied()
            .collect();
        assert_eq!(hits, vec![0]);
    }

    #[test]
    fn rect_union_covers_both_inputs() {
        let a = Rect::from_points(Vec2::new(0.0, 0.0), Vec2::new(1.0, 1.0));
        let b = Rect::from_points(Vec2::new(3.0, -2.0), Vec2::new(4.0, 0.5));
        let u = a.union(b);
        assert_eq!(u.lo, Vec2::new(0.0, -2.0));
        assert_eq!(u.hi, Vec2::new(4.0, 1.0));
    }
}
