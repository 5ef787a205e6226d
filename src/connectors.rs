//! Component G: routing between branches — the lowest common ancestor of two
//! branches, and the ray-vs-ball-union "shortcut" test that decides whether a
//! direct chord is safe to cut instead of retracing the tree (spec.md §4.7).

use crate::bucket_vec::BucketVec;
use crate::geometry::Vec2;
use crate::slice::Slice;
use crate::spatial_index::{Rect, SpatialIndex};
use crate::tree_builder::MedialTree;

/// Lowest common ancestor of branches `a` and `b` in `tree`, by walking both
/// parent chains to the root and taking the last branch common to both
/// (spec.md §4.7 "switch_branch").
pub fn lowest_common_ancestor(tree: &MedialTree, a: usize, b: usize) -> usize {
    let chain_a = ancestor_chain(tree, a);
    let chain_b: std::collections::HashSet<usize> = ancestor_chain(tree, b).into_iter().collect();
    chain_a
        .into_iter()
        .find(|n| chain_b.contains(n))
        .unwrap_or(tree.root)
}

fn ancestor_chain(tree: &MedialTree, mut node: usize) -> Vec<usize> {
    let mut chain = vec![node];
    while let Some(parent) = tree.branches[node].parent {
        chain.push(parent);
        node = parent;
    }
    chain
}

/// The straight-line path from `a` to `b`, for stitching the two branches at
/// their lowest common ancestor when no cheaper shortcut is available
/// (spec.md §4.7 `switch_branch`). The caller is responsible for rendering
/// this with the crate's chord/smooth-chord emission rules.
pub fn switch_branch(tree: &MedialTree, from_branch: usize, to_branch: usize, from_pt: Vec2, to_pt: Vec2) -> (usize, Vec2, Vec2) {
    let lca = lowest_common_ancestor(tree, from_branch, to_branch);
    (lca, from_pt, to_pt)
}

/// Whether the straight segment `a -> b` lies entirely within the union of
/// `colliders`' balls (each `(center, radius)`), to within `tol` — i.e.
/// whether it is safe to cut `a -> b` directly instead of retracing already
/// milled corridors (spec.md §4.7). Implemented as a toggle sweep over the
/// segment/circle intersection parameters: each circle covers one interval of
/// `t in [0,1]` along the segment, and the segment is covered overall iff the
/// union of those intervals spans `[0,1]`.
pub fn may_shortcut(a: Vec2, b: Vec2, colliders: &[(Vec2, f64)], tol: f64) -> bool {
    let d = b - a;
    let len2 = d.dot(d);
    if len2 <= 1e-18 {
        return true;
    }

    let mut intervals: Vec<(f64, f64)> = Vec::new();
    for &(c, r) in colliders {
        if let Some((t0, t1)) = segment_circle_interval(a, d, len2, c, r) {
            intervals.push((t0.max(0.0), t1.min(1.0)));
        }
    }
    if intervals.is_empty() {
        return false;
    }
    intervals.sort_by(|x, y| x.0.partial_cmp(&y.0).unwrap());

    let mut covered_to = 0.0;
    for (lo, hi) in intervals {
        if lo > covered_to + tol {
            return false;
        }
        covered_to = covered_to.max(hi);
        if covered_to >= 1.0 - tol {
            return true;
        }
    }
    covered_to >= 1.0 - tol
}

/// Parameter interval `[t0, t1] subset of [0,1]` over which the point
/// `a + d*t` lies within the circle `(c, r)`, or `None` if the segment misses
/// the circle entirely.
fn segment_circle_interval(a: Vec2, d: Vec2, len2: f64, c: Vec2, r: f64) -> Option<(f64, f64)> {
    let f = a - c;
    let b_coef = 2.0 * f.dot(d);
    let c_coef = f.dot(f) - r * r;
    let disc = b_coef * b_coef - 4.0 * len2 * c_coef;
    if disc < 0.0 {
        return None;
    }
    let sqrt_disc = disc.sqrt();
    let t0 = (-b_coef - sqrt_disc) / (2.0 * len2);
    let t1 = (-b_coef + sqrt_disc) / (2.0 * len2);
    if t1 < 0.0 || t0 > 1.0 {
        return None;
    }
    Some((t0, t1))
}

/// Lowest common ancestor of slices `a` and `b` in the cut tree formed by
/// their `parent` links (spec.md §4.7 "switch_branch", applied at slice
/// granularity — the cut tree, not the medial tree of branches, is what the
/// stitcher actually walks between two arbitrary slices).
pub fn lowest_common_ancestor_slice(slices: &BucketVec<Slice>, a: usize, b: usize) -> usize {
    let chain_a = slice_ancestor_chain(slices, a);
    let chain_b: std::collections::HashSet<usize> = slice_ancestor_chain(slices, b).into_iter().collect();
    chain_a.into_iter().find(|n| chain_b.contains(n)).unwrap_or(a)
}

fn slice_ancestor_chain(slices: &BucketVec<Slice>, mut node: usize) -> Vec<usize> {
    let mut chain = vec![node];
    while let Some(parent) = slices[node].parent {
        chain.push(parent);
        node = parent;
    }
    chain
}

/// Routes from slice `src` (exiting at `src_pt`) to slice `dst` (entering at
/// `dst_pt`), per spec.md §4.7 `switch_branch`: walk the cut tree up from
/// `src` to the lowest common ancestor of `src`/`dst` and back down to `dst`,
/// appending each intermediate slice's center to the returned polyline unless
/// [`may_shortcut`] verifies the straight segment from the current point to
/// `dst_pt` is already covered by milled material, in which case routing
/// stops early. When `dst` is `src`'s direct child (or vice versa) the two
/// chains meet immediately and this degenerates to the single hop
/// `[src_pt, dst_pt]`.
pub fn route_between_slices(
    slices: &BucketVec<Slice>,
    index: &SpatialIndex<usize>,
    src: usize,
    dst: usize,
    src_pt: Vec2,
    dst_pt: Vec2,
    tol: f64,
) -> Vec<Vec2> {
    let lca = lowest_common_ancestor_slice(slices, src, dst);

    let up = if lca == src { Vec::new() } else { path_up_to(&slice_ancestor_chain(slices, src), lca) };
    let down = if lca == dst { Vec::new() } else { path_down_from(&slice_ancestor_chain(slices, dst), lca) };
    let path: Vec<usize> = up.into_iter().chain(down).collect();

    let lookup = |i: usize| (slices[i].center, slices[i].radius);
    let mut out = vec![src_pt];
    let mut current = src_pt;
    for node in path {
        if may_shortcut_indexed(current, dst_pt, tol, lookup, index) {
            break;
        }
        current = slices[node].center;
        out.push(current);
    }
    out.push(dst_pt);
    out
}

/// `chain`'s elements strictly after its first (the node itself), up to and
/// including `lca`.
fn path_up_to(chain: &[usize], lca: usize) -> Vec<usize> {
    let mut out = Vec::new();
    for &n in chain.iter().skip(1) {
        out.push(n);
        if n == lca {
            break;
        }
    }
    out
}

/// `chain`'s elements strictly between its first (the node itself) and `lca`,
/// exclusive of both, in root-to-node order (reversed from the parent walk).
fn path_down_from(chain: &[usize], lca: usize) -> Vec<usize> {
    let mut out = Vec::new();
    for &n in chain.iter().skip(1) {
        if n == lca {
            break;
        }
        out.push(n);
    }
    out.reverse();
    out
}

/// Spatial-index-backed overload of [`may_shortcut`]: gathers colliders from
/// `index` within the segment's bounding box instead of requiring the caller
/// to pass every slice.
pub fn may_shortcut_indexed(
    a: Vec2,
    b: Vec2,
    tol: f64,
    slice_lookup: impl Fn(usize) -> (Vec2, f64),
    index: &SpatialIndex<usize>,
) -> bool {
    let rect = Rect::from_points(a, b);
    let colliders: Vec<(Vec2, f64)> = index.query(rect).map(|&i| slice_lookup(i)).collect();
    may_shortcut(a, b, &colliders, tol)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::RotationDir;

    fn mk_slice(center: Vec2, radius: f64, parent: Option<usize>) -> Slice {
        Slice {
            branch: 0,
            center,
            radius,
            dist: 0.0,
            parent,
            engagement: 0.5,
            dir: RotationDir::Ccw,
            start: center,
            end: center,
            sweep: 0.0,
        }
    }

    /// A 5-slice cut tree: root -> a -> (leaf1, leaf2) with leaf1/leaf2
    /// sharing grandparent `root` via parent `a`.
    fn five_slice_tree() -> BucketVec<Slice> {
        let mut slices = BucketVec::new();
        slices.push(mk_slice(Vec2::new(0.0, 0.0), 1.0, None)); // 0: root
        slices.push(mk_slice(Vec2::new(2.0, 0.0), 1.0, Some(0))); // 1: a
        slices.push(mk_slice(Vec2::new(4.0, 0.0), 1.0, Some(1))); // 2: b (unused branch)
        slices.push(mk_slice(Vec2::new(2.0, 2.0), 1.0, Some(1))); // 3: leaf1
        slices.push(mk_slice(Vec2::new(2.0, -2.0), 1.0, Some(1))); // 4: leaf2
        slices
    }

    #[test]
    fn lca_of_two_leaves_is_their_shared_grandparent() {
        let slices = five_slice_tree();
        assert_eq!(lowest_common_ancestor_slice(&slices, 3, 4), 1);
    }

    #[test]
    fn routing_direct_parent_child_is_a_single_hop() {
        let slices = five_slice_tree();
        let index = SpatialIndex::new();
        let path = route_between_slices(&slices, &index, 1, 3, Vec2::new(2.0, 0.0), Vec2::new(2.0, 2.0), 1e-6);
        assert_eq!(path, vec![Vec2::new(2.0, 0.0), Vec2::new(2.0, 2.0)]);
    }

    #[test]
    fn routing_between_leaves_passes_through_shared_ancestor_without_cover() {
        let slices = five_slice_tree();
        let index = SpatialIndex::new(); // no colliders: nothing can be shortcut
        let path = route_between_slices(&slices, &index, 3, 4, Vec2::new(2.0, 2.0), Vec2::new(2.0, -2.0), 1e-6);
        // Retraces through slice 1 (the LCA) since no collider covers the direct jump.
        assert_eq!(path, vec![Vec2::new(2.0, 2.0), Vec2::new(2.0, 0.0), Vec2::new(2.0, -2.0)]);
    }

    #[test]
    fn routing_between_leaves_shortcuts_when_colliders_cover_the_direct_path() {
        let mut slices = five_slice_tree();
        slices.push(mk_slice(Vec2::new(2.0, 0.0), 3.0, None)); // 5: wide collider ball
        let mut index = SpatialIndex::new();
        // This wide collider ball covers the straight jump between the two
        // leaves directly, so routing should skip the grandparent retrace.
        index.insert(Rect::from_center_radius(Vec2::new(2.0, 0.0), 3.0), 5usize);
        let path = route_between_slices(&slices, &index, 3, 4, Vec2::new(2.0, 2.0), Vec2::new(2.0, -2.0), 1e-6);
        assert_eq!(path, vec![Vec2::new(2.0, 2.0), Vec2::new(2.0, -2.0)]);
    }

    #[test]
    fn segment_fully_inside_one_ball_may_shortcut() {
        let ok = may_shortcut(
            Vec2::new(-1.0, 0.0),
            Vec2::new(1.0, 0.0),
            &[(Vec2::new(0.0, 0.0), 5.0)],
            1e-6,
        );
        assert!(ok);
    }

    #[test]
    fn segment_outside_every_ball_may_not_shortcut() {
        let ok = may_shortcut(
            Vec2::new(-1.0, 0.0),
            Vec2::new(1.0, 0.0),
            &[(Vec2::new(100.0, 100.0), 1.0)],
            1e-6,
        );
        assert!(!ok);
    }

    #[test]
    fn chain_of_balls_can_cover_a_longer_segment() {
        let ok = may_shortcut(
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 0.0),
            &[
                (Vec2::new(1.5, 0.0), 2.0),
                (Vec2::new(5.0, 0.0), 2.1),
                (Vec2::new(8.5, 0.0), 2.0),
            ],
            1e-6,
        );
        assert!(ok);
    }

    #[test]
    fn gap_between_balls_blocks_shortcut() {
        let ok = may_shortcut(
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 0.0),
            &[(Vec2::new(1.0, 0.0), 1.0), (Vec2::new(9.0, 0.0), 1.0)],
            1e-6,
        );
        assert!(!ok);
    }

    #[test]
    fn may_shortcut_is_permutation_stable_for_collider_order() {
        let colliders_a = [(Vec2::new(1.5, 0.0), 2.0), (Vec2::new(8.5, 0.0), 2.0), (Vec2::new(5.0, 0.0), 2.1)];
        let colliders_b = [(Vec2::new(5.0, 0.0), 2.1), (Vec2::new(1.5, 0.0), 2.0), (Vec2::new(8.5, 0.0), 2.0)];
        let a = Vec2::new(0.0, 0.0);
        let b = Vec2::new(10.0, 0.0);
        assert_eq!(may_shortcut(a, b, &colliders_a, 1e-6), may_shortcut(a, b, &colliders_b, 1e-6));
    }
}
