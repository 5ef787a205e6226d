//! Component F: depth-first traversal of the rolled tree into a single
//! ordered sequence of toolpath items (spec.md §4.6).

use crate::collaborators::{EmitOptions, MillDirection, SpiralGenerator};
use crate::connectors::route_between_slices;
use crate::error::PocketError;
use crate::geometry::{build_biarc, Vec2};
use crate::roll::RollResult;
use crate::spatial_index::{Rect, SpatialIndex};
use crate::tree_builder::MedialTree;

/// One emitted element of the final toolpath, tagged by kind so a caller
/// filtering on [`EmitOptions`] knows what it's looking at.
#[derive(Debug, Clone)]
pub enum PathItem {
    /// The entry spiral milled at the root branch's first slice.
    Spiral(Vec<Vec2>),
    /// The polyline connecting a child branch's start back to its parent
    /// corridor.
    BranchEntry(Vec<Vec2>),
    /// The cutting arc of one slice.
    Segment(Vec<Vec2>),
    /// A straight non-cutting move between two slice endpoints.
    Chord(Vec2, Vec2),
    /// A tangent-continuous biarc move between two slice endpoints.
    SmoothChord(Vec<Vec2>),
    /// A chord rendered as a single circular arc rather than a straight line
    /// or biarc (spec.md §6 `SEGMENT_CHORD`).
    SegmentChord(Vec<Vec2>),
    /// The retract/rapid path back to the starting point.
    ReturnToBase(Vec<Vec2>),
    /// Raw medial-axis segment, only emitted for visual debugging.
    DebugMat(Vec2, Vec2),
}

/// Walks `tree`/`roll` depth-first and emits path items gated by
/// `emit_options`, per spec.md §4.6. `dir` controls whether
/// [`EmitOptions::SMOOTH_CHORD`] is permitted: smooth chords need a resolved
/// milling direction to pick a consistent tangent sense.
pub fn stitch(
    tree: &MedialTree,
    roll: &RollResult,
    spiral: &dyn SpiralGenerator,
    spiral_pitch: f64,
    emit_options: EmitOptions,
    dir: MillDirection,
    flatten_tol: f64,
) -> Result<Vec<PathItem>, PocketError> {
    if emit_options.contains(EmitOptions::CHORD) && emit_options.contains(EmitOptions::SMOOTH_CHORD) {
        return Err(PocketError::ConflictingChordEmission);
    }
    if emit_options.contains(EmitOptions::SMOOTH_CHORD) && dir == MillDirection::Unknown {
        return Err(PocketError::SmoothChordRequiresDirection);
    }

    // A spatial index over every placed slice's ball, used by component G's
    // `may_shortcut` check wherever this pass needs to route between two
    // slices that aren't directly parent-linked (spec.md §4.7).
    let mut index: SpatialIndex<usize> = SpatialIndex::new();
    for (i, s) in roll.slices.iter().enumerate() {
        index.insert(Rect::from_center_radius(s.center, s.radius), i);
    }

    let mut items = Vec::new();
    visit_branch(tree, roll, &index, tree.root, spiral, spiral_pitch, emit_options, dir, flatten_tol, &mut items);

    if emit_options.contains(EmitOptions::RETURN_TO_BASE) && roll.slices.len() > 1 {
        let last_idx = roll.slices.len() - 1;
        let last = &roll.slices[last_idx];
        let home = &roll.slices[0];
        let route = route_between_slices(&roll.slices, &index, last_idx, 0, last.end, home.start, flatten_tol);
        items.push(PathItem::ReturnToBase(route));
    }

    Ok(items)
}

#[allow(clippy::too_many_arguments)]
fn visit_branch(
    tree: &MedialTree,
    roll: &RollResult,
    index: &SpatialIndex<usize>,
    branch_i: usize,
    spiral: &dyn SpiralGenerator,
    spiral_pitch: f64,
    emit_options: EmitOptions,
    dir: MillDirection,
    flatten_tol: f64,
    items: &mut Vec<PathItem>,
) {
    let slice_ids = &roll.branch_slices[branch_i];
    let is_root = tree.branches[branch_i].parent.is_none();

    if emit_options.contains(EmitOptions::DEBUG_MAT) {
        let curve = &tree.branches[branch_i].curve;
        for w in curve.windows(2) {
            items.push(PathItem::DebugMat(w[0], w[1]));
        }
    }

    for (pos, &slice_id) in slice_ids.iter().enumerate() {
        let slice = &roll.slices[slice_id];

        if pos == 0 && is_root && emit_options.contains(EmitOptions::SPIRAL) {
            let pts = spiral.generate(slice.center, slice.start, spiral_pitch, slice.dir);
            items.push(PathItem::Spiral(pts));
        } else if pos == 0 && !is_root && emit_options.contains(EmitOptions::BRANCH_ENTRY) {
            if let Some(parent_idx) = slice.parent {
                let parent = &roll.slices[parent_idx];
                let route = route_between_slices(&roll.slices, index, parent_idx, slice_id, parent.end, slice.start, flatten_tol);
                items.push(PathItem::BranchEntry(route));
            }
        }

        if emit_options.contains(EmitOptions::SEGMENT) {
            items.push(PathItem::Segment(cutting_arc(slice, flatten_tol)));
        }

        if pos + 1 < slice_ids.len() {
            let next_id = slice_ids[pos + 1];
            let next = &roll.slices[next_id];
            emit_route(&roll.slices, index, slice_id, next_id, slice.end, next.start, emit_options, flatten_tol, items);
        }
    }

    for &child in &tree.branches[branch_i].children {
        if let (Some(&last_own), Some(&first_child)) = (slice_ids.last(), roll.branch_slices[child].first()) {
            let a = &roll.slices[last_own];
            let b = &roll.slices[first_child];
            emit_route(&roll.slices, index, last_own, first_child, a.end, b.start, emit_options, flatten_tol, items);
        }
        visit_branch(tree, roll, index, child, spiral, spiral_pitch, emit_options, dir, flatten_tol, items);
    }
}

/// Routes from slice `src` to slice `dst` via component G (spec.md §4.7) and
/// renders each hop of the resulting polyline as a connector per
/// `emit_options`.
#[allow(clippy::too_many_arguments)]
fn emit_route(
    slices: &crate::bucket_vec::BucketVec<crate::slice::Slice>,
    index: &SpatialIndex<usize>,
    src: usize,
    dst: usize,
    src_pt: Vec2,
    dst_pt: Vec2,
    emit_options: EmitOptions,
    flatten_tol: f64,
    items: &mut Vec<PathItem>,
) {
    let route = route_between_slices(slices, index, src, dst, src_pt, dst_pt, flatten_tol);
    for w in route.windows(2) {
        emit_connector(w[0], w[1], emit_options, flatten_tol, items);
    }
}

fn emit_connector(a: Vec2, b: Vec2, emit_options: EmitOptions, flatten_tol: f64, items: &mut Vec<PathItem>) {
    if emit_options.contains(EmitOptions::SMOOTH_CHORD) {
        let t = (b - a).normalized();
        let biarc = build_biarc(a, t, b, t);
        items.push(PathItem::SmoothChord(biarc.flatten(flatten_tol)));
    } else if emit_options.contains(EmitOptions::SEGMENT_CHORD) {
        items.push(PathItem::SegmentChord(vec![a, b]));
    } else if emit_options.contains(EmitOptions::CHORD) {
        items.push(PathItem::Chord(a, b));
    }
}

/// A slice's cutting arc: the real arc between its `start` and `end` points,
/// computed at placement time from the intersection with its parent ball
/// (spec.md §4.5 "tentative slice construction").
fn cutting_arc(slice: &crate::slice::Slice, tol: f64) -> Vec<Vec2> {
    let start_angle = (slice.start.y - slice.center.y).atan2(slice.start.x - slice.center.x);
    let arc = crate::geometry::Arc { center: slice.center, radius: slice.radius, start_angle, sweep: slice.sweep };
    arc.flatten(tol)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::ArchimedeanSpiral;
    use crate::roll::RollParams;
    use crate::mat_sampler::{filter_voronoi_edges, sample_region, DelaunayVoronoi};
    use crate::polygon::{Polygon, Region};
    use crate::collaborators::VoronoiEdges;
    use crate::tree_builder::build_tree;
    use crate::roll::roll_tree;

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

    fn build_roll(cutter_r: f64) -> (MedialTree, RollResult) {
        let region = unit_square_region();
        let samples = sample_region(&region, cutter_r);
        let xs: Vec<f64> = samples.iter().map(|p| p.x).collect();
        let ys: Vec<f64> = samples.iter().map(|p| p.y).collect();
        let edges = DelaunayVoronoi.generate(&xs, &ys, region.bounds());
        let segments = filter_voronoi_edges(&edges, &region, 1e-3, false);
        let tree = build_tree(&segments, &region, cutter_r, 0.0, 1e-3, None).expect("root exists");
        let params = RollParams {
            cutter_r,
            margin: 0.0,
            max_engagement: 0.5,
            min_engagement: 0.05,
            engagement_tolerance: 0.05,
            general_tolerance: 1e-3,
            segmented_slice_engagement_derating_k: 0.8,
            dir: crate::geometry::RotationDir::Cw,
        };
        let roll = roll_tree(&tree, &region, &params);
        (tree, roll)
    }

    #[test]
    fn conflicting_chord_emission_is_rejected() {
        let (tree, roll) = build_roll(1.0);
        let spiral = ArchimedeanSpiral::default();
        let opts = EmitOptions::SEGMENT | EmitOptions::CHORD | EmitOptions::SMOOTH_CHORD;
        let err = stitch(&tree, &roll, &spiral, 0.5, opts, MillDirection::Cw, 0.05).unwrap_err();
        assert!(matches!(err, PocketError::ConflictingChordEmission));
    }

    #[test]
    fn smooth_chord_requires_resolved_direction() {
        let (tree, roll) = build_roll(1.0);
        let spiral = ArchimedeanSpiral::default();
        let opts = EmitOptions::SEGMENT | EmitOptions::SMOOTH_CHORD;
        let err = stitch(&tree, &roll, &spiral, 0.5, opts, MillDirection::Unknown, 0.05).unwrap_err();
        assert!(matches!(err, PocketError::SmoothChordRequiresDirection));
    }

    #[test]
    fn stitch_emits_a_spiral_first_when_requested() {
        let (tree, roll) = build_roll(1.0);
        let spiral = ArchimedeanSpiral::default();
        let opts = EmitOptions::SPIRAL | EmitOptions::SEGMENT | EmitOptions::CHORD;
        let items = stitch(&tree, &roll, &spiral, 0.5, opts, MillDirection::Cw, 0.05).unwrap();
        assert!(matches!(items.first(), Some(PathItem::Spiral(_))));
    }

    #[test]
    fn cutting_arc_starts_at_the_slices_own_start_point() {
        let (_, roll) = build_roll(1.0);
        let slice = &roll.slices[roll.slices.len() - 1];
        let pts = cutting_arc(slice, 0.05);
        assert!(pts.first().unwrap().dist(slice.start) < 1e-6);
    }

    #[test]
    fn chords_connect_through_slice_start_end_not_centers() {
        let (tree, roll) = build_roll(1.0);
        let spiral = ArchimedeanSpiral::default();
        let opts = EmitOptions::SEGMENT | EmitOptions::CHORD;
        let items = stitch(&tree, &roll, &spiral, 0.5, opts, MillDirection::Cw, 0.05).unwrap();
        let chords: Vec<_> = items
            .iter()
            .filter_map(|i| match i {
                PathItem::Chord(a, b) => Some((*a, *b)),
                _ => None,
            })
            .collect();
        assert!(!chords.is_empty());

        let root_slices = &roll.branch_slices[tree.root];
        assert!(root_slices.len() >= 2);
        let s0 = &roll.slices[root_slices[0]];
        let s1 = &roll.slices[root_slices[1]];
        assert_eq!(chords[0].0, s0.end);
        assert_eq!(chords[0].1, s1.start);
    }

    #[test]
    fn debug_mat_toggle_only_adds_debug_items() {
        let (tree, roll) = build_roll(1.0);
        let spiral = ArchimedeanSpiral::default();
        let base = EmitOptions::SEGMENT | EmitOptions::CHORD;
        let without = stitch(&tree, &roll, &spiral, 0.5, base, MillDirection::Cw, 0.05).unwrap();
        let with = stitch(&tree, &roll, &spiral, 0.5, base | EmitOptions::DEBUG_MAT, MillDirection::Cw, 0.05).unwrap();
        let non_debug_with: Vec<_> = with.iter().filter(|i| !matches!(i, PathItem::DebugMat(..))).collect();
        assert_eq!(without.len(), non_debug_with.len());
    }
}
