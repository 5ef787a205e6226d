//! Component C: boundary sampling, the Voronoi stabilisation hack, and the
//! filter pass that turns raw Voronoi edges into MAT segments (spec.md
//! §4.3).

use crate::collaborators::{Polyline, Segment, VoronoiEdges};
use crate::geometry::Vec2;
use crate::polygon::Region;

/// A retained Medial Axis Transform segment (spec.md §3 "MAT segment").
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatSegment {
    pub a: Vec2,
    pub b: Vec2,
}

impl MatSegment {
    pub fn length(&self) -> f64 {
        self.a.dist(self.b)
    }
}

/// Step 1: walk each polyline segment, emitting `p1` then interior samples
/// spaced by `spacing` along the segment's arc length. Emitting the segment
/// start first (rather than resampling it away) is what preserves sharp
/// corners.
pub fn sample_boundary(poly: &dyn Polyline, spacing: f64) -> Vec<Vec2> {
    let spacing = spacing.max(1e-6);
    let mut out = Vec::new();
    for i in 0..poly.num_segments() {
        let seg = poly.get_segment(i);
        out.push(seg.start());
        let len = match seg {
            Segment::Line { p0, p1 } => p0.dist(p1),
            Segment::Arc { radius, sweep, .. } => radius * sweep.abs(),
        };
        let n_interior = (len / spacing).floor() as usize;
        for k in 1..n_interior {
            let u = (k as f64 * spacing) / len.max(1e-12);
            let p = match seg {
                Segment::Line { p0, p1 } => p0.lerp(p1, u),
                Segment::Arc { center, radius, start_angle, sweep } => {
                    let a = start_angle + sweep * u;
                    center + Vec2::new(a.cos(), a.sin()) * radius
                }
            };
            out.push(p);
        }
    }
    out
}

/// Samples the outer perimeter and every island at `cutter_r / 10` spacing
/// (spec.md §4.3 step 1).
pub fn sample_region(region: &Region, cutter_r: f64) -> Vec<Vec2> {
    let spacing = (cutter_r / 10.0).max(1e-6);
    let mut pts = sample_boundary(region.outer.as_ref(), spacing);
    for island in &region.islands {
        pts.extend(sample_boundary(island.as_ref(), spacing));
    }
    pts
}

/// Step 2: append a phantom point below the leftmost-bottom sample to
/// stabilise sweep-line Voronoi generators that mishandle collinear/extreme
/// input (spec.md §4.3 step 2; Design Notes §9 calls this "an acknowledged
/// workaround for a specific generator's sensitivity"). Gated behind
/// `stabilize_voronoi` so it can be dropped once paired with a
/// better-behaved generator.
pub fn with_voronoi_phantom_point(
    points: &[Vec2],
    stabilize_voronoi: bool,
) -> (Vec<Vec2>, (Vec2, Vec2)) {
    let mut lo = Vec2::new(f64::INFINITY, f64::INFINITY);
    let mut hi = Vec2::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
    for p in points {
        lo.x = lo.x.min(p.x);
        lo.y = lo.y.min(p.y);
        hi.x = hi.x.max(p.x);
        hi.y = hi.y.max(p.y);
    }

    if !stabilize_voronoi || points.is_empty() {
        return (points.to_vec(), (lo, hi));
    }

    // Leftmost-bottom sample, tie-broken by smallest x then smallest y.
    let anchor = points
        .iter()
        .copied()
        .min_by(|a, b| (a.y, a.x).partial_cmp(&(b.y, b.x)).unwrap())
        .unwrap();

    let drop = (hi.x - lo.x) / 2.0;
    let phantom = Vec2::new(anchor.x, anchor.y - drop);

    let mut pts = points.to_vec();
    pts.push(phantom);
    lo.y = lo.y.min(phantom.y);
    (pts, (lo, hi))
}

/// Step 3: drop degenerate edges and edges with an endpoint outside the
/// region (outside the outer perimeter, or inside any island), both tested
/// with `general_tolerance`. `check_interior_crossing`, when set, also drops
/// edges whose interior crosses a boundary segment — off by default per
/// spec.md §4.3 ("behaviour gated by a compile-time flag; off by default").
pub fn filter_voronoi_edges(
    edges: &[(Vec2, Vec2)],
    region: &Region,
    general_tolerance: f64,
    check_interior_crossing: bool,
) -> Vec<MatSegment> {
    edges
        .iter()
        .filter_map(|&(a, b)| {
            if a.dist(b) < general_tolerance {
                return None;
            }
            if !region.contains(a, general_tolerance) || !region.contains(b, general_tolerance) {
                return None;
            }
            if check_interior_crossing && segment_crosses_boundary(a, b, region) {
                return None;
            }
            Some(MatSegment { a, b })
        })
        .collect()
}

fn segment_crosses_boundary(a: Vec2, b: Vec2, region: &Region) -> bool {
    let polys: Vec<&dyn Polyline> = std::iter::once(region.outer.as_ref())
        .chain(region.islands.iter().map(|b| b.as_ref()))
        .collect();
    for poly in polys {
        for i in 0..poly.num_segments() {
            let seg = poly.get_segment(i);
            if let Segment::Line { p0, p1 } = seg {
                if segments_intersect_interior(a, b, p0, p1) {
                    return true;
                }
            }
        }
    }
    false
}

fn segments_intersect_interior(p1: Vec2, p2: Vec2, p3: Vec2, p4: Vec2) -> bool {
    let d1 = cross(p4 - p3, p1 - p3);
    let d2 = cross(p4 - p3, p2 - p3);
    let d3 = cross(p2 - p1, p3 - p1);
    let d4 = cross(p2 - p1, p4 - p1);
    (d1 * d2 < 0.0) && (d3 * d4 < 0.0)
}

fn cross(a: Vec2, b: Vec2) -> f64 {
    a.x * b.y - a.y * b.x
}

/// A reference Voronoi edge generator: Bowyer-Watson Delaunay triangulation,
/// dualized by connecting the circumcenters of triangles sharing an edge.
/// Production users are expected to swap in a dedicated library (this
/// corpus' closest analog is `boostvoronoi`, used for exactly this
/// medial-axis/centerline purpose by `hallr`'s `cmd_centerline`); this
/// implementation exists so the crate is runnable end-to-end without an
/// external collaborator.
#[derive(Default)]
pub struct DelaunayVoronoi;

impl VoronoiEdges for DelaunayVoronoi {
    fn generate(&self, xs: &[f64], ys: &[f64], _bounds: (Vec2, Vec2)) -> Vec<(Vec2, Vec2)> {
        let pts: Vec<Vec2> = xs.iter().zip(ys).map(|(&x, &y)| Vec2::new(x, y)).collect();
        let triangles = bowyer_watson(&pts);
        dual_edges(&pts, &triangles)
    }
}

#[derive(Clone, Copy)]
struct Triangle {
    v: [usize; 3],
}

fn bowyer_watson(points: &[Vec2]) -> Vec<Triangle> {
    if points.len() < 3 {
        return Vec::new();
    }

    let mut lo = Vec2::new(f64::INFINITY, f64::INFINITY);
    let mut hi = Vec2::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
    for p in points {
        lo.x = lo.x.min(p.x);
        lo.y = lo.y.min(p.y);
        hi.x = hi.x.max(p.x);
        hi.y = hi.y.max(p.y);
    }
    let dx = (hi.x - lo.x).max(1.0);
    let dy = (hi.y - lo.y).max(1.0);
    let d = dx.max(dy) * 20.0 + 10.0;
    let cx = (lo.x + hi.x) / 2.0;
    let cy = (lo.y + hi.y) / 2.0;

    // Super-triangle vertices, appended after the real points.
    let mut pts = points.to_vec();
    let super_base = pts.len();
    pts.push(Vec2::new(cx - d, cy - d));
    pts.push(Vec2::new(cx + d, cy - d));
    pts.push(Vec2::new(cx, cy + d));

    let mut triangles = vec![Triangle { v: [super_base, super_base + 1, super_base + 2] }];

    for i in 0..points.len() {
        let p = pts[i];
        let mut bad: Vec<usize> = Vec::new();
        for (ti, tri) in triangles.iter().enumerate() {
            if in_circumcircle(&pts, tri, p) {
                bad.push(ti);
            }
        }

        let mut edge_count: std::collections::HashMap<(usize, usize), usize> =
            std::collections::HashMap::new();
        for &ti in &bad {
            let tri = triangles[ti];
            for &(a, b) in &[(tri.v[0], tri.v[1]), (tri.v[1], tri.v[2]), (tri.v[2], tri.v[0])] {
                let key = if a < b { (a, b) } else { (b, a) };
                *edge_count.entry(key).or_insert(0) += 1;
            }
        }
        let boundary: Vec<(usize, usize)> = edge_count
            .into_iter()
            .filter(|&(_, c)| c == 1)
            .map(|(e, _)| e)
            .collect();

        let mut bad_set = vec![false; triangles.len()];
        for &ti in &bad {
            bad_set[ti] = true;
        }
        let mut kept: Vec<Triangle> = triangles
            .iter()
            .enumerate()
            .filter(|&(ti, _)| !bad_set[ti])
            .map(|(_, &t)| t)
            .collect();

        for (a, b) in boundary {
            kept.push(Triangle { v: [a, b, i] });
        }
        triangles = kept;
    }

    triangles
        .into_iter()
        .filter(|t| t.v.iter().all(|&i| i < super_base))
        .collect()
}

fn in_circumcircle(pts: &[Vec2], tri: &Triangle, p: Vec2) -> bool {
    let [a, b, c] = tri.v.map(|i| pts[i]);
    let ax = a.x - p.x;
    let ay = a.y - p.y;
    let bx = b.x - p.x;
    let by = b.y - p.y;
    let cx = c.x - p.x;
    let cy = c.y - p.y;
    let det = (ax * ax + ay * ay) * (bx * cy - cx * by)
        - (bx * bx + by * by) * (ax * cy - cx * ay)
        + (cx * cx + cy * cy) * (ax * by - bx * ay);
    // Orientation-dependent sign; normalize by the triangle's own winding so
    // the test works regardless of vertex order.
    let winding = (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x);
    if winding > 0.0 { det > 0.0 } else { det < 0.0 }
}

fn circumcenter(a: Vec2, b: Vec2, c: Vec2) -> Option<Vec2> {
    let d = 2.0 * (a.x * (b.y - c.y) + b.x * (c.y - a.y) + c.x * (a.y - b.y));
    if d.abs() < 1e-12 {
        return None;
    }
    let a2 = a.dot(a);
    let b2 = b.dot(b);
    let c2 = c.dot(c);
    let ux = (a2 * (b.y - c.y) + b2 * (c.y - a.y) + c2 * (a.y - b.y)) / d;
    let uy = (a2 * (c.x - b.x) + b2 * (a.x - c.x) + c2 * (b.x - a.x)) / d;
    Some(Vec2::new(ux, uy))
}

fn dual_edges(pts: &[Vec2], triangles: &[Triangle]) -> Vec<(Vec2, Vec2)> {
    let centers: Vec<Option<Vec2>> = triangles
        .iter()
        .map(|t| circumcenter(pts[t.v[0]], pts[t.v[1]], pts[t.v[2]]))
        .collect();

    let mut edge_owner: std::collections::HashMap<(usize, usize), usize> =
        std::collections::HashMap::new();
    let mut out = Vec::new();
    for (ti, tri) in triangles.iter().enumerate() {
        for &(a, b) in &[(tri.v[0], tri.v[1]), (tri.v[1], tri.v[2]), (tri.v[2], tri.v[0])] {
            let key = if a < b { (a, b) } else { (b, a) };
            if let Some(&other_ti) = edge_owner.get(&key) {
                if let (Some(c1), Some(c2)) = (centers[ti], centers[other_ti]) {
                    out.push((c1, c2));
                }
            } else {
                edge_owner.insert(key, ti);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polygon::Polygon;

    fn unit_square_region() -> Region {
        Region::new(
            Box::new(Polygon::from_points(&[
                Vec2::new(0.0, 0.0),
                Vec2::new(10.0, 0.0),
                Vec2::new(10.0, 10.0),
                Vec2::new(0.0, 10.0),
            ])),
            vec![],
        )
    }

    #[test]
    fn sample_boundary_preserves_corners() {
        let region = unit_square_region();
        let pts = sample_region(&region, 2.0);
        // Every corner should appear as an emitted sample.
        for corner in [
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 0.0),
            Vec2::new(10.0, 10.0),
            Vec2::new(0.0, 10.0),
        ] {
            assert!(pts.iter().any(|p| p.dist(corner) < 1e-9));
        }
    }

    #[test]
    fn phantom_point_sits_below_anchor_and_expands_bounds() {
        let pts = vec![Vec2::new(0.0, 0.0), Vec2::new(10.0, 10.0)];
        let (with_phantom, (lo, _hi)) = with_voronoi_phantom_point(&pts, true);
        assert_eq!(with_phantom.len(), 3);
        assert!(lo.y <= -4.9);
    }

    #[test]
    fn filter_drops_edges_outside_region() {
        let region = unit_square_region();
        let edges = vec![
            (Vec2::new(2.0, 2.0), Vec2::new(8.0, 8.0)),
            (Vec2::new(-5.0, -5.0), Vec2::new(-3.0, -3.0)),
            (Vec2::new(1.0, 1.0), Vec2::new(1.0, 1.0 + 1e-9)),
        ];
        let kept = filter_voronoi_edges(&edges, &region, 1e-3, false);
        assert_eq!(kept.len(), 1);
        assert!(kept[0].a.dist(Vec2::new(2.0, 2.0)) < 1e-9);
    }

    #[test]
    fn delaunay_voronoi_produces_edges_for_square_samples() {
        let region = unit_square_region();
        let samples = sample_region(&region, 2.5);
        let xs: Vec<f64> = samples.iter().map(|p| p.x).collect();
        let ys: Vec<f64> = samples.iter().map(|p| p.y).collect();
        let gen = DelaunayVoronoi;
        let edges = gen.generate(&xs, &ys, region.bounds());
        assert!(!edges.is_empty());
    }
}
