//! External interfaces of spec.md §6: the collaborator traits this crate
//! consumes rather than owns. `polygon::Polygon` supplies a default
//! `Polyline` implementation for callers who have no CAD import of their
//! own; production users are expected to bring their own implementations
//! backed by whatever CAD kernel and Voronoi engine they already have (e.g.
//! `boostvoronoi` for [`VoronoiEdges`]).

use crate::geometry::{RotationDir, Vec2};
use serde::Deserialize;

/// Milling direction, fed into slice rotation sense and gating smooth-chord
/// emission (spec.md §6, §7.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MillDirection {
    Cw,
    Ccw,
    Unknown,
}

impl MillDirection {
    pub fn rotation(self) -> RotationDir {
        match self {
            MillDirection::Cw => RotationDir::Cw,
            MillDirection::Ccw => RotationDir::Ccw,
            MillDirection::Unknown => RotationDir::Unknown,
        }
    }
}

/// One segment of a polyline perimeter: a line or an arc.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Segment {
    Line { p0: Vec2, p1: Vec2 },
    Arc { center: Vec2, radius: f64, start_angle: f64, sweep: f64 },
}

impl Segment {
    pub fn start(&self) -> Vec2 {
        match *self {
            Segment::Line { p0, .. } => p0,
            Segment::Arc { center, radius, start_angle, .. } => {
                center + Vec2::new(start_angle.cos(), start_angle.sin()) * radius
            }
        }
    }

    pub fn end(&self) -> Vec2 {
        match *self {
            Segment::Line { p1, .. } => p1,
            Segment::Arc { center, radius, start_angle, sweep } => {
                let a = start_angle + sweep;
                center + Vec2::new(a.cos(), a.sin()) * radius
            }
        }
    }

    /// Shortest distance from `p` to this segment, and the nearest point.
    pub fn nearest(&self, p: Vec2) -> (f64, Vec2) {
        match *self {
            Segment::Line { p0, p1 } => {
                let ab = p1 - p0;
                let len2 = ab.dot(ab);
                let t = if len2 <= 1e-18 {
                    0.0
                } else {
                    ((p - p0).dot(ab) / len2).clamp(0.0, 1.0)
                };
                let q = p0 + ab * t;
                (p.dist(q), q)
            }
            Segment::Arc { center, radius, start_angle, sweep } => {
                let to_p = p - center;
                let ang = to_p.y.atan2(to_p.x);
                let mut rel = ang - start_angle;
                let two_pi = std::f64::consts::TAU;
                rel = rel.rem_euclid(two_pi) * sweep.signum();
                let sweep_abs = sweep.abs();
                let rel = rel.rem_euclid(two_pi);
                let on_arc = rel <= sweep_abs || (two_pi - rel) <= 1e-9;
                let candidate = if on_arc {
                    let u = (rel / sweep_abs.max(1e-12)).clamp(0.0, 1.0);
                    let a = start_angle + sweep * u;
                    center + Vec2::new(a.cos(), a.sin()) * radius
                } else {
                    // Nearer endpoint.
                    let p0 = self.start();
                    let p1 = self.end();
                    if p.dist2(p0) < p.dist2(p1) { p0 } else { p1 }
                };
                (p.dist(candidate), candidate)
            }
        }
    }
}

/// The perimeter-query surface spec.md §6 asks external polyline
/// implementations to expose.
pub trait Polyline {
    fn num_segments(&self) -> usize;
    fn get_segment(&self, i: usize) -> Segment;

    fn get_perimeter(&self) -> f64 {
        (0..self.num_segments())
            .map(|i| match self.get_segment(i) {
                Segment::Line { p0, p1 } => p0.dist(p1),
                Segment::Arc { radius, sweep, .. } => radius * sweep.abs(),
            })
            .sum()
    }

    /// Shortest distance from `p` to any segment of this polyline, and the
    /// nearest point.
    fn nearest(&self, p: Vec2) -> (f64, Vec2) {
        let mut best_d = f64::INFINITY;
        let mut best_p = p;
        for i in 0..self.num_segments() {
            let (d, q) = self.get_segment(i).nearest(p);
            if d < best_d {
                best_d = d;
                best_p = q;
            }
        }
        (best_d, best_p)
    }

    /// Even-odd / winding point-in-polyline test with tolerance on the
    /// boundary (spec.md §6: `PointInPolyline(p, tol)`).
    fn point_in_polyline(&self, p: Vec2, tol: f64) -> bool {
        let (boundary_d, _) = self.nearest(p);
        if boundary_d <= tol {
            return true;
        }
        let mut winding = 0.0;
        for i in 0..self.num_segments() {
            let seg = self.get_segment(i);
            let pts = flatten_segment(&seg, tol.max(1e-6));
            for w in pts.windows(2) {
                winding += signed_angle(p, w[0], w[1]);
            }
        }
        winding.abs() > std::f64::consts::PI
    }

    /// Arc-length-parameterized point at `u in [0,1]` along the whole
    /// perimeter (spec.md §6: `Get_parametric_pt(u)`).
    fn get_parametric_pt(&self, u: f64) -> Vec2 {
        let u = u.clamp(0.0, 1.0);
        let target = u * self.get_perimeter();
        let mut acc = 0.0;
        for i in 0..self.num_segments() {
            let seg = self.get_segment(i);
            let len = match seg {
                Segment::Line { p0, p1 } => p0.dist(p1),
                Segment::Arc { radius, sweep, .. } => radius * sweep.abs(),
            };
            if acc + len >= target || i == self.num_segments() - 1 {
                let local_u = if len <= 1e-12 { 0.0 } else { (target - acc) / len };
                return match seg {
                    Segment::Line { p0, p1 } => p0.lerp(p1, local_u.clamp(0.0, 1.0)),
                    Segment::Arc { center, radius, start_angle, sweep } => {
                        let a = start_angle + sweep * local_u.clamp(0.0, 1.0);
                        center + Vec2::new(a.cos(), a.sin()) * radius
                    }
                };
            }
            acc += len;
        }
        self.get_segment(0).start()
    }
}

fn flatten_segment(seg: &Segment, tol: f64) -> Vec<Vec2> {
    match *seg {
        Segment::Line { p0, p1 } => vec![p0, p1],
        Segment::Arc { center, radius, start_angle, sweep } => {
            crate::geometry::Arc { center, radius, start_angle, sweep }.flatten(tol)
        }
    }
}

/// Signed angle subtended at `p` by the segment `a -> b`, used to accumulate
/// winding number.
fn signed_angle(p: Vec2, a: Vec2, b: Vec2) -> f64 {
    let va = a - p;
    let vb = b - p;
    let cross = va.x * vb.y - va.y * vb.x;
    let dot = va.dot(vb);
    cross.atan2(dot)
}

/// The Voronoi edge generator of spec.md §6 ("a black box returning
/// unordered line segments").
pub trait VoronoiEdges {
    fn generate(&self, xs: &[f64], ys: &[f64], bounds: (Vec2, Vec2)) -> Vec<(Vec2, Vec2)>;
}

/// The flat-spiral generator of spec.md §6, used for the entry cut.
pub trait SpiralGenerator {
    fn generate(&self, center: Vec2, start: Vec2, pitch: f64, dir: RotationDir) -> Vec<Vec2>;
}

/// A simple Archimedean flat-spiral reference implementation, sufficient for
/// tests and for callers without their own entry-cut strategy.
pub struct ArchimedeanSpiral {
    pub max_turns: usize,
    pub points_per_turn: usize,
}

impl Default for ArchimedeanSpiral {
    fn default() -> Self {
        Self { max_turns: 64, points_per_turn: 32 }
    }
}

impl SpiralGenerator for ArchimedeanSpiral {
    fn generate(&self, center: Vec2, start: Vec2, pitch: f64, dir: RotationDir) -> Vec<Vec2> {
        let start_radius = center.dist(start);
        if start_radius <= 1e-9 || pitch <= 1e-9 {
            return vec![start];
        }
        let start_angle = (start.y - center.y).atan2(start.x - center.x);
        let sign = match dir.resolved() {
            RotationDir::Cw => -1.0,
            _ => 1.0,
        };
        let n_turns = (start_radius / pitch).ceil().max(1.0) as usize;
        let n_turns = n_turns.min(self.max_turns);
        let total_steps = n_turns * self.points_per_turn;
        let mut pts = Vec::with_capacity(total_steps + 1);
        for i in 0..=total_steps {
            let t = i as f64 / self.points_per_turn as f64;
            let r = (start_radius - pitch * t).max(0.0);
            let a = start_angle + sign * t * std::f64::consts::TAU;
            pts.push(center + Vec2::new(a.cos(), a.sin()) * r);
            if r <= 1e-9 {
                break;
            }
        }
        pts
    }
}

/// Bitmask over the path-item kinds a caller may ask `run()` to emit
/// (spec.md §6 `emit_options`). Implemented as a plain flag set over `u32`
/// rather than pulling in a bitflags-style crate — the corpus has no such
/// dependency and the set is small and closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct EmitOptions(u32);

impl EmitOptions {
    pub const SEGMENT: EmitOptions = EmitOptions(1 << 0);
    pub const BRANCH_ENTRY: EmitOptions = EmitOptions(1 << 1);
    pub const CHORD: EmitOptions = EmitOptions(1 << 2);
    pub const SMOOTH_CHORD: EmitOptions = EmitOptions(1 << 3);
    pub const SEGMENT_CHORD: EmitOptions = EmitOptions(1 << 4);
    pub const SPIRAL: EmitOptions = EmitOptions(1 << 5);
    pub const RETURN_TO_BASE: EmitOptions = EmitOptions(1 << 6);
    pub const DEBUG_MAT: EmitOptions = EmitOptions(1 << 7);

    pub const NONE: EmitOptions = EmitOptions(0);
    pub const ALL: EmitOptions = EmitOptions(0xFF);

    pub fn contains(self, flag: EmitOptions) -> bool {
        self.0 & flag.0 == flag.0
    }

    pub fn union(self, rhs: EmitOptions) -> EmitOptions {
        EmitOptions(self.0 | rhs.0)
    }

    pub fn remove(self, flag: EmitOptions) -> EmitOptions {
        EmitOptions(self.0 & !flag.0)
    }
}

impl std::ops::BitOr for EmitOptions {
    type Output = EmitOptions;
    fn bitor(self, rhs: EmitOptions) -> EmitOptions {
        self.union(rhs)
    }
}

impl std::ops::BitOrAssign for EmitOptions {
    fn bitor_assign(&mut self, rhs: EmitOptions) {
        *self = self.union(rhs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_options_bitwise_union() {
        let opts = EmitOptions::SEGMENT | EmitOptions::CHORD;
        assert!(opts.contains(EmitOptions::SEGMENT));
        assert!(opts.contains(EmitOptions::CHORD));
        assert!(!opts.contains(EmitOptions::SMOOTH_CHORD));
    }

    #[test]
    fn spiral_starts_at_given_radius_and_shrinks() {
        let spiral = ArchimedeanSpiral::default();
        let center = Vec2::new(0.0, 0.0);
        let start = Vec2::new(10.0, 0.0);
        let pts = spiral.generate(center, start, 1.0, RotationDir::Cw);
        assert!(pts.first().unwrap().dist(start) < 1e-6);
        assert!(pts.last().unwrap().dist(center) < 1.0);
    }
}
