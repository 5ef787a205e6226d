//! Component A: vector algebra, arc/biarc construction and spline sampling.
//!
//! `Vec2` and `Arc` are the crate's own concrete geometry types; the external
//! `Polyline`/`ArcSeg` collaborators of [`crate::collaborators`] are free to
//! wrap these or their own.

use std::ops::{Add, Div, Mul, Sub};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn dot(self, rhs: Vec2) -> f64 {
        self.x * rhs.x + self.y * rhs.y
    }

    #[inline]
    pub fn length(self) -> f64 {
        self.dot(self).sqrt()
    }

    #[inline]
    pub fn dist(self, rhs: Vec2) -> f64 {
        (self - rhs).length()
    }

    #[inline]
    pub fn dist2(self, rhs: Vec2) -> f64 {
        let d = self - rhs;
        d.dot(d)
    }

    pub fn normalized(self) -> Vec2 {
        let l = self.length();
        if l <= f64::EPSILON {
            Vec2::ZERO
        } else {
            self / l
        }
    }

    /// Unit left normal, i.e. `self` rotated +90 degrees (does not normalize `self` first).
    #[inline]
    pub fn left_normal(self) -> Vec2 {
        Vec2::new(-self.y, self.x)
    }

    #[inline]
    pub fn lerp(self, rhs: Vec2, t: f64) -> Vec2 {
        self + (rhs - self) * t
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    #[inline]
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    #[inline]
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Vec2 {
    type Output = Vec2;
    #[inline]
    fn mul(self, rhs: f64) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<f64> for Vec2 {
    type Output = Vec2;
    #[inline]
    fn div(self, rhs: f64) -> Vec2 {
        Vec2::new(self.x / rhs, self.y / rhs)
    }
}

/// Rotation sense of an arc or slice segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationDir {
    Cw,
    Ccw,
    /// Unresolved direction; collapses to `Cw` wherever a concrete sense is
    /// required (per spec.md §4.5: "`Unknown` ≡ `CW`").
    Unknown,
}

impl RotationDir {
    pub fn resolved(self) -> RotationDir {
        match self {
            RotationDir::Unknown => RotationDir::Cw,
            other => other,
        }
    }
}

/// A single circular arc, described by center/radius/start angle/signed sweep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arc {
    pub center: Vec2,
    pub radius: f64,
    pub start_angle: f64,
    /// Signed sweep in radians; positive is CCW.
    pub sweep: f64,
}

impl Arc {
    pub fn p1(&self) -> Vec2 {
        self.point_at(0.0)
    }

    pub fn p2(&self) -> Vec2 {
        self.point_at(1.0)
    }

    pub fn point_at(&self, u: f64) -> Vec2 {
        let a = self.start_angle + self.sweep * u;
        self.center + Vec2::new(a.cos(), a.sin()) * self.radius
    }

    /// Tangent direction (unit) at parameter `u`, consistent with the arc's
    /// sweep sign.
    pub fn tangent_at(&self, u: f64) -> Vec2 {
        let a = self.start_angle + self.sweep * u;
        let radial = Vec2::new(a.cos(), a.sin());
        let ccw_tangent = radial.left_normal();
        if self.sweep >= 0.0 {
            ccw_tangent
        } else {
            ccw_tangent * -1.0
        }
    }

    /// Flattens the arc into a polyline with a maximum chord deviation of `tol`.
    pub fn flatten(&self, tol: f64) -> Vec<Vec2> {
        let tol = tol.max(1e-9);
        let radius = self.radius.max(1e-9);
        // Max angular step such that the sagitta (chord deviation) stays under tol:
        //   tol = r * (1 - cos(theta/2))  =>  theta = 2*acos(1 - tol/r)
        let cos_arg = (1.0 - tol / radius).clamp(-1.0, 1.0);
        let max_step = (2.0 * cos_arg.acos()).max(1e-6);
        let n_steps = ((self.sweep.abs() / max_step).ceil() as usize).max(1);
        (0..=n_steps)
            .map(|i| self.point_at(i as f64 / n_steps as f64))
            .collect()
    }
}

/// The intersection points of circles `(c1, r1)` and `(c2, r2)`, or `None`
/// when they are disjoint, one contains the other without touching, or they
/// are concentric (spec.md §4.5 "tentative slice construction").
pub fn circle_intersections(c1: Vec2, r1: f64, c2: Vec2, r2: f64) -> Option<(Vec2, Vec2)> {
    let d = c1.dist(c2);
    if d <= 1e-12 || d > r1 + r2 || d < (r1 - r2).abs() {
        return None;
    }
    let a = (r1 * r1 - r2 * r2 + d * d) / (2.0 * d);
    let h = (r1 * r1 - a * a).max(0.0).sqrt();
    let mid = c1 + (c2 - c1) * (a / d);
    let perp = (c2 - c1).left_normal() * (1.0 / d);
    Some((mid + perp * h, mid - perp * h))
}

/// Either a straight chord or a tangent-continuous pair of arcs joining two
/// endpoints with prescribed tangents — see spec.md §4.1.
#[derive(Debug, Clone)]
pub enum Biarc {
    Line(Vec2, Vec2),
    Arcs(Arc, Arc),
}

impl Biarc {
    pub fn flatten(&self, tol: f64) -> Vec<Vec2> {
        match self {
            Biarc::Line(a, b) => vec![*a, *b],
            Biarc::Arcs(a1, a2) => {
                let mut pts = a1.flatten(tol);
                let mut rest = a2.flatten(tol);
                if let Some(first) = rest.first().copied() {
                    if pts.last().map(|p| p.dist(first) < 1e-9).unwrap_or(false) {
                        rest.remove(0);
                    }
                }
                pts.append(&mut rest);
                pts
            }
        }
    }
}

/// Builds a tangent-continuous biarc between `(p1, t1)` and `(p2, t2)`, per
/// Ryan Juckett's construction (spec.md §4.1). `t1`/`t2` must be unit
/// vectors. Degenerates to a straight line when both denominators vanish.
pub fn build_biarc(p1: Vec2, t1: Vec2, p2: Vec2, t2: Vec2) -> Biarc {
    let v = p2 - p1;
    let t = t1 + t2;
    let t1_dot_t2 = t1.dot(t2);
    let d = 2.0 * (1.0 - t1_dot_t2);

    let d2 = if d.abs() > 1e-12 {
        let v_dot_t = v.dot(t);
        let disc = v_dot_t * v_dot_t + 2.0 * (1.0 - t1_dot_t2) * v.dot(v);
        (-v_dot_t + disc.max(0.0).sqrt()) / d
    } else {
        let d_prime = 4.0 * v.dot(t2);
        if d_prime.abs() <= 1e-12 {
            return Biarc::Line(p1, p2);
        }
        v.dot(v) / d_prime
    };

    let pm = (p1 + p2 + (t1 - t2) * d2) * 0.5;

    let arc1 = arc_through(p1, t1, pm);
    let arc2 = arc_through(p2, t2, pm).map(reverse_arc);

    match (arc1, arc2) {
        (Some(a1), Some(a2)) => Biarc::Arcs(a1, a2),
        _ => Biarc::Line(p1, p2),
    }
}

/// Finds the arc starting at `p` with tangent `t` that passes through `pm`.
/// Returns `None` when the construction degenerates to a straight segment
/// (i.e. `p`, `pm` and the tangent are colinear).
fn arc_through(p: Vec2, t: Vec2, pm: Vec2) -> Option<Arc> {
    let n = t.left_normal();
    let pm_p = pm - p;
    let denom = 2.0 * n.dot(pm_p);
    if denom.abs() <= 1e-12 {
        return None;
    }
    let k = pm_p.dot(pm_p) / denom;
    let center = p + n * k;
    let radius = (p - center).length();
    if radius <= 1e-9 {
        return None;
    }
    let start_angle = (p.y - center.y).atan2(p.x - center.x);
    let end_angle = (pm.y - center.y).atan2(pm.x - center.x);
    let dir_sign = (p - center).dot(n).signum();
    let mut sweep = end_angle - start_angle;
    // Normalize sweep to have the sign implied by the arc's rotation direction
    // (sign of (p-c)·n, per spec.md §4.1) and the shortest matching arc.
    while sweep <= -std::f64::consts::PI {
        sweep += 2.0 * std::f64::consts::PI;
    }
    while sweep > std::f64::consts::PI {
        sweep -= 2.0 * std::f64::consts::PI;
    }
    if dir_sign > 0.0 && sweep < 0.0 {
        sweep += 2.0 * std::f64::consts::PI;
    } else if dir_sign < 0.0 && sweep > 0.0 {
        sweep -= 2.0 * std::f64::consts::PI;
    }
    Some(Arc {
        center,
        radius,
        start_angle,
        sweep,
    })
}

fn reverse_arc(arc: Arc) -> Arc {
    Arc {
        center: arc.center,
        radius: arc.radius,
        start_angle: arc.start_angle + arc.sweep,
        sweep: -arc.sweep,
    }
}

/// Samples a cubic Bezier curve at `n` interior steps (inclusive of both
/// endpoints), used by the spline sampler ahead of arc-fit post-processing.
pub fn sample_cubic_bezier(p0: Vec2, p1: Vec2, p2: Vec2, p3: Vec2, n: usize) -> Vec<Vec2> {
    let n = n.max(1);
    (0..=n)
        .map(|i| {
            let t = i as f64 / n as f64;
            let mt = 1.0 - t;
            p0 * (mt * mt * mt)
                + p1 * (3.0 * mt * mt * t)
                + p2 * (3.0 * mt * t * t)
                + p3 * (t * t * t)
        })
        .collect()
}

/// Samples a cubic Hermite spline (two endpoints + two tangents) at `n`
/// interior steps.
pub fn sample_hermite(p0: Vec2, t0: Vec2, p1: Vec2, t1: Vec2, n: usize) -> Vec<Vec2> {
    let n = n.max(1);
    (0..=n)
        .map(|i| {
            let t = i as f64 / n as f64;
            let t2 = t * t;
            let t3 = t2 * t;
            let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
            let h10 = t3 - 2.0 * t2 + t;
            let h01 = -2.0 * t3 + 3.0 * t2;
            let h11 = t3 - t2;
            p0 * h00 + t0 * h10 + p1 * h01 + t1 * h11
        })
        .collect()
}

/// Recursively flattens a polyline of samples to `tol` maximum deviation from
/// the chord between retained points (a simple Douglas-Peucker pass), used as
/// the "arc-fit post-processing" step of spec.md §4.1's spline sampler: each
/// surviving straight run is then handed to the `Polyline::ArcFit` external
/// collaborator by callers that want arcs instead of polylines.
pub fn simplify_rdp(points: &[Vec2], tol: f64) -> Vec<Vec2> {
    if points.len() < 3 {
        return points.to_vec();
    }
    let mut keep = vec![false; points.len()];
    keep[0] = true;
    keep[points.len() - 1] = true;
    rdp_recurse(points, 0, points.len() - 1, tol, &mut keep);
    points
        .iter()
        .zip(keep.iter())
        .filter_map(|(p, &k)| k.then_some(*p))
        .collect()
}

fn rdp_recurse(points: &[Vec2], lo: usize, hi: usize, tol: f64, keep: &mut [bool]) {
    if hi <= lo + 1 {
        return;
    }
    let a = points[lo];
    let b = points[hi];
    let ab = b - a;
    let ab_len2 = ab.dot(ab);
    let mut worst_i = lo;
    let mut worst_d2 = 0.0;
    for i in (lo + 1)..hi {
        let p = points[i];
        let d2 = if ab_len2 <= 1e-18 {
            p.dist2(a)
        } else {
            let t = ((p - a).dot(ab) / ab_len2).clamp(0.0, 1.0);
            p.dist2(a + ab * t)
        };
        if d2 > worst_d2 {
            worst_d2 = d2;
            worst_i = i;
        }
    }
    if worst_d2.sqrt() > tol {
        keep[worst_i] = true;
        rdp_recurse(points, lo, worst_i, tol, keep);
        rdp_recurse(points, worst_i, hi, tol, keep);
    }
}
