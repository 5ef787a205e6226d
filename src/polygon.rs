//! A default, in-crate `Polyline` implementation plus the `Region` type that
//! ties an outer perimeter and its islands together for MIC queries
//! (spec.md §3 "Region", §6 "Construction inputs").

use crate::collaborators::{Polyline, Segment};
use crate::geometry::Vec2;

/// A closed polygon made of line and/or arc segments, in perimeter order.
#[derive(Debug, Clone)]
pub struct Polygon {
    segments: Vec<Segment>,
}

impl Polygon {
    pub fn from_segments(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// Builds a closed polygon from straight-line vertices (implicit closing
    /// edge from the last vertex back to the first).
    pub fn from_points(points: &[Vec2]) -> Self {
        let mut segments = Vec::with_capacity(points.len());
        for w in points.windows(2) {
            segments.push(Segment::Line { p0: w[0], p1: w[1] });
        }
        if let (Some(&first), Some(&last)) = (points.first(), points.last()) {
            if first != last {
                segments.push(Segment::Line { p0: last, p1: first });
            }
        }
        Self { segments }
    }

    pub fn points(&self) -> &[Segment] {
        &self.segments
    }

    pub fn bounds(&self) -> (Vec2, Vec2) {
        let mut lo = Vec2::new(f64::INFINITY, f64::INFINITY);
        let mut hi = Vec2::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
        for seg in &self.segments {
            for p in [seg.start(), seg.end()] {
                lo.x = lo.x.min(p.x);
                lo.y = lo.y.min(p.y);
                hi.x = hi.x.max(p.x);
                hi.y = hi.y.max(p.y);
            }
        }
        (lo, hi)
    }
}

impl Polyline for Polygon {
    fn num_segments(&self) -> usize {
        self.segments.len()
    }

    fn get_segment(&self, i: usize) -> Segment {
        self.segments[i]
    }
}

/// The planar region to clear: an outer perimeter and zero or more island
/// holes (spec.md §3).
pub struct Region {
    pub outer: Box<dyn Polyline>,
    pub islands: Vec<Box<dyn Polyline>>,
}

impl Region {
    pub fn new(outer: Box<dyn Polyline>, islands: Vec<Box<dyn Polyline>>) -> Self {
        Self { outer, islands }
    }

    /// Distance from `p` to the nearest boundary segment (outer or island).
    pub fn nearest_boundary_dist(&self, p: Vec2) -> f64 {
        let mut best = self.outer.nearest(p).0;
        for island in &self.islands {
            best = best.min(island.nearest(p).0);
        }
        best
    }

    /// `p` is inside the outer perimeter and outside every island, with
    /// `tol` slack on boundaries (spec.md §3 "strictly inside the region").
    pub fn contains(&self, p: Vec2, tol: f64) -> bool {
        if !self.outer.point_in_polyline(p, tol) {
            return false;
        }
        for island in &self.islands {
            if island.point_in_polyline(p, tol) {
                return false;
            }
        }
        true
    }

    /// Maximum Inscribed Circle radius at `p` (spec.md §3): distance to the
    /// nearest boundary, minus the cutter radius, minus the margin. Points
    /// outside the region (or inside an island) have an MIC of `-infinity`.
    pub fn mic_radius(&self, p: Vec2, cutter_r: f64, margin: f64, tol: f64) -> f64 {
        if !self.contains(p, tol) {
            return f64::NEG_INFINITY;
        }
        self.nearest_boundary_dist(p) - cutter_r - margin
    }

    pub fn bounds(&self) -> (Vec2, Vec2) {
        let mut lo = Vec2::new(f64::INFINITY, f64::INFINITY);
        let mut hi = Vec2::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
        for i in 0..self.outer.num_segments() {
            for p in [self.outer.get_segment(i).start(), self.outer.get_segment(i).end()] {
                lo.x = lo.x.min(p.x);
                lo.y = lo.y.min(p.y);
                hi.x = hi.x.max(p.x);
                hi.y = hi.y.max(p.y);
            }
        }
        (lo, hi)
    }
}

/// A point is passable when its MIC radius exceeds 10% of the cutter radius
/// (spec.md §3).
pub fn is_passable(mic_radius: f64, cutter_r: f64) -> bool {
    mic_radius > 0.1 * cutter_r
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> Polygon {
        Polygon::from_points(&[
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 0.0),
            Vec2::new(10.0, 10.0),
            Vec2::new(0.0, 10.0),
        ])
    }

    #[test]
    fn square_contains_centroid_not_corner_exterior() {
        let sq = unit_square();
        let region = Region::new(Box::new(sq), vec![]);
        assert!(region.contains(Vec2::new(5.0, 5.0), 1e-6));
        assert!(!region.contains(Vec2::new(-1.0, 5.0), 1e-6));
    }

    #[test]
    fn mic_radius_decreases_toward_boundary() {
        let sq = unit_square();
        let region = Region::new(Box::new(sq), vec![]);
        let center_mic = region.mic_radius(Vec2::new(5.0, 5.0), 1.0, 0.0, 1e-6);
        let edge_mic = region.mic_radius(Vec2::new(1.0, 5.0), 1.0, 0.0, 1e-6);
        assert!(center_mic > edge_mic);
        assert!((center_mic - 4.0).abs() < 1e-9);
    }

    #[test]
    fn island_excludes_interior_points() {
        let outer = unit_square();
        let island = Polygon::from_points(&[
            Vec2::new(4.0, 4.0),
            Vec2::new(6.0, 4.0),
            Vec2::new(6.0, 6.0),
            Vec2::new(4.0, 6.0),
        ]);
        let region = Region::new(Box::new(outer), vec![Box::new(island)]);
        assert!(!region.contains(Vec2::new(5.0, 5.0), 1e-6));
        assert!(region.contains(Vec2::new(1.0, 1.0), 1e-6));
    }
}
