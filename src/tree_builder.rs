//! Component D: turns filtered MAT segments into a rooted tree of
//! traversable corridors (spec.md §4.4).

use crate::bucket_vec::BucketVec;
use crate::geometry::Vec2;
use crate::mat_sampler::MatSegment;
use crate::polygon::{is_passable, Region};
use std::collections::HashMap;

/// A node in the medial tree (spec.md §3 "Branch"). Stored in an arena
/// (`MedialTree::branches`); `parent`/`children` are indices into that same
/// arena per Design Notes §9 ("implementations may allocate ... in an arena
/// and represent parents as indices").
#[derive(Debug, Clone)]
pub struct Branch {
    pub curve: Vec<Vec2>,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
}

impl Branch {
    pub fn start(&self) -> Vec2 {
        *self.curve.first().expect("branch curve must have >= 2 points")
    }

    pub fn end(&self) -> Vec2 {
        *self.curve.last().expect("branch curve must have >= 2 points")
    }

    pub fn length(&self) -> f64 {
        self.curve.windows(2).map(|w| w[0].dist(w[1])).sum()
    }

    /// Arc-length parameterized point at `u in [0,1]` along this branch's
    /// curve (spec.md §3 `get_parametric_pt`).
    pub fn get_parametric_pt(&self, u: f64) -> Vec2 {
        let u = u.clamp(0.0, 1.0);
        let total = self.length();
        if total <= 1e-12 {
            return self.start();
        }
        let target = u * total;
        let mut acc = 0.0;
        for w in self.curve.windows(2) {
            let seg_len = w[0].dist(w[1]);
            if acc + seg_len >= target {
                let local_u = if seg_len <= 1e-12 { 0.0 } else { (target - acc) / seg_len };
                return w[0].lerp(w[1], local_u);
            }
            acc += seg_len;
        }
        self.end()
    }

    /// Finds the `u` parameter of the curve point nearest to `p`.
    pub fn nearest_param(&self, p: Vec2) -> f64 {
        let total = self.length();
        if total <= 1e-12 {
            return 0.0;
        }
        let mut acc = 0.0;
        let mut best_u = 0.0;
        let mut best_d2 = f64::INFINITY;
        for w in self.curve.windows(2) {
            let seg_len = w[0].dist(w[1]);
            let ab = w[1] - w[0];
            let len2 = ab.dot(ab);
            let t = if len2 <= 1e-18 { 0.0 } else { ((p - w[0]).dot(ab) / len2).clamp(0.0, 1.0) };
            let q = w[0] + ab * t;
            let d2 = p.dist2(q);
            if d2 < best_d2 {
                best_d2 = d2;
                best_u = (acc + seg_len * t) / total;
            }
            acc += seg_len;
        }
        best_u
    }
}

/// The rooted tree produced by [`build_tree`]: an arena of branches plus the
/// root index.
pub struct MedialTree {
    pub branches: BucketVec<Branch>,
    pub root: usize,
}

impl MedialTree {
    /// Total curve length of the subtree rooted at `branch_i` — the "deep
    /// distance" children are sorted by (spec.md §3, §4.4).
    pub fn deep_distance(&self, branch_i: usize) -> f64 {
        let branch = &self.branches[branch_i];
        branch.length()
            + branch
                .children
                .iter()
                .map(|&c| self.deep_distance(c))
                .sum::<f64>()
    }
}

fn quantize(p: Vec2, tol: f64) -> (i64, i64) {
    let tol = tol.max(1e-9);
    ((p.x / tol).round() as i64, (p.y / tol).round() as i64)
}

/// Endpoint pool keyed by quantized coordinate: which (unused) MAT segments
/// have a *passable* endpoint there (spec.md §4.4 "segment pool").
struct SegmentPool<'a> {
    segments: &'a [MatSegment],
    by_point: HashMap<(i64, i64), Vec<usize>>,
    used: Vec<bool>,
    tol: f64,
}

impl<'a> SegmentPool<'a> {
    fn build(segments: &'a [MatSegment], region: &Region, cutter_r: f64, margin: f64, tol: f64) -> Self {
        let mut by_point: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
        for (i, seg) in segments.iter().enumerate() {
            for end in [seg.a, seg.b] {
                let mic = region.mic_radius(end, cutter_r, margin, tol);
                if is_passable(mic, cutter_r) {
                    by_point.entry(quantize(end, tol)).or_default().push(i);
                }
            }
        }
        Self { segments, by_point, used: vec![false; segments.len()], tol }
    }

    /// Returns the *other* endpoint of every unused segment incident to `p`,
    /// marking those segments used (spec.md §4.4 `Pull_follow_points`).
    fn pull_follow_points(&mut self, p: Vec2) -> Vec<Vec2> {
        let key = quantize(p, self.tol);
        let Some(candidates) = self.by_point.remove(&key) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for seg_i in candidates {
            if self.used[seg_i] {
                continue;
            }
            self.used[seg_i] = true;
            let seg = self.segments[seg_i];
            let other = if seg.a.dist(p) <= seg.b.dist(p) { seg.b } else { seg.a };
            out.push(other);
        }
        out
    }

    /// The passable registered endpoint with the greatest MIC radius.
    fn max_mic_endpoint(&self, region: &Region, cutter_r: f64, margin: f64) -> Option<Vec2> {
        self.by_point
            .keys()
            .flat_map(|&k| self.by_point[&k].iter().flat_map(|&i| [self.segments[i].a, self.segments[i].b]))
            .map(|p| (p, region.mic_radius(p, cutter_r, margin, self.tol)))
            .filter(|&(_, mic)| is_passable(mic, cutter_r))
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
            .map(|(p, _)| p)
    }
}

/// Builds the rooted medial tree from filtered MAT segments (spec.md §4.4).
/// `startpoint` is the optional user entry point. Returns `None` when no
/// admissible root exists (spec.md §7.2 "infeasible pocket").
pub fn build_tree(
    segments: &[MatSegment],
    region: &Region,
    cutter_r: f64,
    margin: f64,
    general_tolerance: f64,
    startpoint: Option<Vec2>,
) -> Option<MedialTree> {
    let mut pool = SegmentPool::build(segments, region, cutter_r, margin, general_tolerance);

    let (root_curve_start, root_mat_point) = match startpoint {
        None => {
            let p = pool.max_mic_endpoint(region, cutter_r, margin)?;
            (None, p)
        }
        Some(sp) => {
            let mic = region.mic_radius(sp, cutter_r, margin, general_tolerance);
            if !is_passable(mic, cutter_r) {
                log::warn!("startpoint is outside the pocket");
                return None;
            }
            let candidate = nearest_reachable_endpoint(sp, &pool, region, general_tolerance)?;
            (Some(sp), candidate)
        }
    };

    let mut branches: BucketVec<Branch> = BucketVec::new();
    let mut root_curve = Vec::new();
    if let Some(sp) = root_curve_start {
        root_curve.push(sp);
    }
    root_curve.push(root_mat_point);

    let root_followers = pool.pull_follow_points(root_mat_point);
    branches.push(Branch { curve: root_curve, parent: None, children: Vec::new() });
    let root_i = 0usize;

    attach_segments(&mut branches, root_i, root_mat_point, root_followers, &mut pool, general_tolerance);

    prune_and_sort_children(&mut branches, root_i, general_tolerance);

    Some(MedialTree { branches, root: root_i })
}

fn nearest_reachable_endpoint(
    sp: Vec2,
    pool: &SegmentPool,
    region: &Region,
    tol: f64,
) -> Option<Vec2> {
    let mut candidates: Vec<Vec2> = pool
        .by_point
        .values()
        .flat_map(|v| v.iter().flat_map(|&i| [pool.segments[i].a, pool.segments[i].b]))
        .collect();
    candidates.sort_by(|a, b| sp.dist2(*a).partial_cmp(&sp.dist2(*b)).unwrap());
    candidates
        .into_iter()
        .find(|&c| straight_segment_inside_region(sp, c, region, tol))
}

fn straight_segment_inside_region(a: Vec2, b: Vec2, region: &Region, tol: f64) -> bool {
    let n = ((a.dist(b) / tol.max(1e-6)).ceil() as usize).max(4);
    (0..=n).all(|i| region.contains(a.lerp(b, i as f64 / n as f64), tol))
}

/// Greedy growth: walk from `running_end`, repeatedly pulling followers; a
/// single follower extends the current branch in place, multiple followers
/// spawn child branches that are recursed into (spec.md §4.4
/// `attach_segments`).
fn attach_segments(
    branches: &mut BucketVec<Branch>,
    mut branch_i: usize,
    mut running_end: Vec2,
    mut followers: Vec<Vec2>,
    pool: &mut SegmentPool,
    tol: f64,
) {
    loop {
        match followers.len() {
            0 => return,
            1 => {
                let next = followers[0];
                branches[branch_i].curve.push(next);
                running_end = next;
                followers = pool.pull_follow_points(running_end);
            }
            _ => {
                for next in followers {
                    let child_i = branches.len();
                    branches.push(Branch {
                        curve: vec![running_end, next],
                        parent: Some(branch_i),
                        children: Vec::new(),
                    });
                    branches[branch_i].children.push(child_i);
                    let child_followers = pool.pull_follow_points(next);
                    attach_segments(branches, child_i, next, child_followers, pool, tol);
                }
                return;
            }
        }
        let _ = &mut branch_i;
    }
}

/// Discards children whose deep distance is `<= general_tolerance` and sorts
/// surviving children by ascending deep distance (spec.md §4.4).
fn prune_and_sort_children(branches: &mut BucketVec<Branch>, branch_i: usize, tol: f64) {
    let children = branches[branch_i].children.clone();
    for &c in &children {
        prune_and_sort_children(branches, c, tol);
    }

    let mut survivors: Vec<usize> = Vec::new();
    for c in children {
        let deep = subtree_length(branches, c);
        if deep > tol {
            survivors.push(c);
        }
    }
    survivors.sort_by(|&a, &b| {
        subtree_length(branches, a)
            .partial_cmp(&subtree_length(branches, b))
            .unwrap()
    });
    branches[branch_i].children = survivors;
}

fn subtree_length(branches: &BucketVec<Branch>, branch_i: usize) -> f64 {
    let branch = &branches[branch_i];
    branch.length() + branch.children.iter().map(|&c| subtree_length(branches, c)).sum::<f64>()
}
