//! Component E (part 1): the `Slice` type and the circular-segment
//! "engagement" geometry used to bound how much fresh material each slice
//! removes (spec.md §4.5).

use crate::geometry::{circle_intersections, RotationDir, Vec2};

/// A single placed cut: a ball of stock removed at `center` with `radius`,
/// tied to its parent slice by arena index (spec.md §3 "Slice", Design Notes
/// §9 — arena allocation with index-based parents).
#[derive(Debug, Clone)]
pub struct Slice {
    pub branch: usize,
    pub center: Vec2,
    pub radius: f64,
    /// Arc-length position along the owning branch's curve where this slice
    /// sits.
    pub dist: f64,
    pub parent: Option<usize>,
    /// Fraction of this slice's circumference in contact with fresh material,
    /// in `[0, 1]` (`1.0` means the full circle, as for a root plunge).
    pub engagement: f64,
    pub dir: RotationDir,
    /// Tool entry point onto this slice's cutting arc (spec.md §3 "Start").
    pub start: Vec2,
    /// Tool exit point off this slice's cutting arc (spec.md §3 "End").
    pub end: Vec2,
    /// Signed sweep in radians from `start` to `end`, consistent with `dir`
    /// (positive CCW, matching [`crate::geometry::Arc::sweep`]).
    pub sweep: f64,
}

impl Slice {
    pub fn bounds(&self) -> (Vec2, Vec2) {
        (
            Vec2::new(self.center.x - self.radius, self.center.y - self.radius),
            Vec2::new(self.center.x + self.radius, self.center.y + self.radius),
        )
    }
}

/// The Start/End points and signed sweep of a slice's cutting arc: the arc of
/// the new ball `(center, radius)` between its two intersections with the
/// parent ball `(parent_center, parent_radius)`, swept the "fresh" way
/// (through the point of the new circle farthest from the parent) in
/// direction `dir` (spec.md §4.5 "tentative slice construction"). Falls back
/// to a full circle, entered and exited at the point farthest from the
/// parent, when the two balls don't actually intersect (shouldn't happen for
/// a genuine child slice, but keeps this total).
pub fn cutting_arc_endpoints(
    center: Vec2,
    radius: f64,
    parent_center: Vec2,
    parent_radius: f64,
    dir: RotationDir,
) -> (Vec2, Vec2, f64) {
    let two_pi = std::f64::consts::TAU;
    let angle_of = |p: Vec2| (p.y - center.y).atan2(p.x - center.x);
    let away = (center - parent_center).normalized();
    let far_point = if away == Vec2::ZERO { center + Vec2::new(radius, 0.0) } else { center + away * radius };

    let Some((i1, i2)) = circle_intersections(center, radius, parent_center, parent_radius) else {
        let sweep = if dir.resolved() == RotationDir::Ccw { two_pi } else { -two_pi };
        return (far_point, far_point, sweep);
    };

    let far_angle = angle_of(far_point);
    let a1 = angle_of(i1);
    let a2 = angle_of(i2);
    let ccw_i1_to_i2 = (a2 - a1).rem_euclid(two_pi);
    let far_rel = (far_angle - a1).rem_euclid(two_pi);

    let (ccw_start, ccw_end, ccw_sweep) = if far_rel <= ccw_i1_to_i2 {
        (i1, i2, ccw_i1_to_i2)
    } else {
        (i2, i1, two_pi - ccw_i1_to_i2)
    };

    match dir.resolved() {
        RotationDir::Ccw => (ccw_start, ccw_end, ccw_sweep),
        _ => (ccw_end, ccw_start, -ccw_sweep),
    }
}

/// The angular half-width, on `new`'s own circle, of the arc that lies inside
/// `old`'s circle (i.e. already-cut material), as seen from `new`'s center
/// looking toward `old`'s center. Spec.md §4.5's engagement bound is computed
/// from exactly this per-collider overlap, unioned across all colliders.
fn covered_half_angle(new_center: Vec2, new_r: f64, old_center: Vec2, old_r: f64) -> Option<f64> {
    let d = new_center.dist(old_center);
    if d >= new_r + old_r {
        return None; // Circles don't touch: no coverage.
    }
    if d + new_r <= old_r {
        return Some(std::f64::consts::PI); // new is entirely swallowed by old.
    }
    if d <= 1e-12 {
        // Concentric (or nearly): either fully covered (handled above) or not
        // at all, since unequal concentric circles never partially overlap.
        return None;
    }
    let cos_half = ((d * d + new_r * new_r - old_r * old_r) / (2.0 * d * new_r)).clamp(-1.0, 1.0);
    Some(cos_half.acos())
}

/// Direction (as an angle) from `new_center` toward `old_center`.
fn bearing(new_center: Vec2, old_center: Vec2) -> f64 {
    let v = old_center - new_center;
    v.y.atan2(v.x)
}

/// Fraction, in `[0, 1]`, of `new`'s circumference that is NOT covered by the
/// union of `colliders`' circles — the fresh-material contact fraction spec.md
/// §4.5 calls "engagement". Colliders are merged as angular intervals on
/// `new`'s own circle rather than tested independently, so overlapping
/// colliders aren't double-subtracted.
pub fn engagement_fraction(new_center: Vec2, new_r: f64, colliders: &[(Vec2, f64)]) -> f64 {
    if new_r <= 1e-12 {
        return 1.0;
    }
    let mut intervals: Vec<(f64, f64)> = Vec::new();
    for &(c, r) in colliders {
        if c == new_center && r == new_r {
            continue;
        }
        if let Some(half) = covered_half_angle(new_center, new_r, c, r) {
            if half >= std::f64::consts::PI - 1e-12 {
                return 0.0; // Fully covered by at least one collider.
            }
            let center_angle = bearing(new_center, c);
            intervals.push((center_angle - half, center_angle + half));
        }
    }
    if intervals.is_empty() {
        return 1.0;
    }
    1.0 - union_angle_fraction(&intervals)
}

/// Total measure of the union of angular intervals, expressed as a fraction
/// of the full circle. Each interval is normalized to a `[start, start+width)`
/// span starting in `[0, 2*PI)`, split in two where it wraps past `2*PI`, then
/// merged by a standard sweep over the sorted spans.
fn union_angle_fraction(intervals: &[(f64, f64)]) -> f64 {
    let two_pi = std::f64::consts::TAU;
    let mut spans: Vec<(f64, f64)> = Vec::new();
    for &(lo, hi) in intervals {
        let width = (hi - lo).min(two_pi);
        let start = lo.rem_euclid(two_pi);
        if start + width <= two_pi {
            spans.push((start, start + width));
        } else {
            spans.push((start, two_pi));
            spans.push((0.0, start + width - two_pi));
        }
    }
    spans.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());

    let mut covered = 0.0;
    let mut cur: Option<(f64, f64)> = None;
    for (s, e) in spans {
        cur = Some(match cur {
            None => (s, e),
            Some((cs, ce)) if s <= ce => (cs, ce.max(e)),
            Some((cs, ce)) => {
                covered += ce - cs;
                (s, e)
            }
        });
    }
    if let Some((cs, ce)) = cur {
        covered += ce - cs;
    }
    (covered / two_pi).clamp(0.0, 1.0)
}
