// Library crate root.
//
// This crate is a library only: the teacher's PNG/raster test harness had no
// counterpart once the carving approach moved from rasters to vector medial
// axes, so no binary target is kept.

pub mod bucket_vec;
pub mod collaborators;
pub mod connectors;
pub mod desc;
pub mod error;
pub mod geometry;
pub mod mat_sampler;
pub mod polygon;
pub mod roll;
pub mod slice;
pub mod spatial_index;
pub mod stitcher;
pub mod tree_builder;

#[cfg(test)]
pub mod test_helpers;

use collaborators::{EmitOptions, MillDirection, SpiralGenerator, VoronoiEdges};
use error::PocketError;
use geometry::Vec2;
use polygon::Region;
use roll::RollParams;
use stitcher::PathItem;

/// Run-time parameters for a single `run()` call (spec.md §6). Defaults are
/// conservative: half engagement, tight tolerances relative to a 1-unit
/// cutter.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct Config {
    pub cutter_radius: f64,
    pub margin: f64,
    pub max_engagement: f64,
    pub min_engagement: f64,
    pub engagement_tolerance: f64,
    pub general_tolerance: f64,
    pub segmented_slice_engagement_derating_k: f64,
    pub mill_direction: MillDirection,
    pub emit_options: EmitOptions,
    pub spiral_pitch: f64,
    pub flatten_tolerance: f64,
    pub stabilize_voronoi: bool,
    pub check_interior_crossing: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cutter_radius: 1.0,
            margin: 0.0,
            max_engagement: 0.5,
            min_engagement: 0.05,
            engagement_tolerance: 0.02,
            general_tolerance: 1e-3,
            segmented_slice_engagement_derating_k: 0.8,
            mill_direction: MillDirection::Unknown,
            emit_options: EmitOptions::SEGMENT | EmitOptions::SPIRAL | EmitOptions::BRANCH_ENTRY | EmitOptions::CHORD,
            spiral_pitch: 0.5,
            flatten_tolerance: 0.05,
            stabilize_voronoi: true,
            check_interior_crossing: false,
        }
    }
}

impl Config {
    fn validate(&self) -> Result<(), PocketError> {
        if self.cutter_radius <= 0.0 {
            log::error!("cutter_radius {} is not positive", self.cutter_radius);
            return Err(PocketError::InvalidCutterRadius);
        }
        if self.max_engagement <= 0.0 || self.max_engagement > 1.0 {
            log::error!("max_engagement {} is outside (0, 1]", self.max_engagement);
            return Err(PocketError::InvalidMaxEngagement);
        }
        if self.min_engagement < 0.0 || self.min_engagement >= self.max_engagement {
            log::error!(
                "min_engagement {} is outside [0, max_engagement={})",
                self.min_engagement,
                self.max_engagement
            );
            return Err(PocketError::InvalidMinEngagement);
        }
        if self.emit_options.contains(EmitOptions::CHORD) && self.emit_options.contains(EmitOptions::SMOOTH_CHORD) {
            log::error!("emit_options requests both CHORD and SMOOTH_CHORD");
            return Err(PocketError::ConflictingChordEmission);
        }
        if self.emit_options.contains(EmitOptions::SMOOTH_CHORD) && self.mill_direction == MillDirection::Unknown {
            log::error!("emit_options requests SMOOTH_CHORD but mill_direction is Unknown");
            return Err(PocketError::SmoothChordRequiresDirection);
        }
        Ok(())
    }
}

/// Non-fatal bookkeeping collected over a run, additive to the spec's core
/// return value: counts useful for diagnosing a pocket that clears but looks
/// suspicious (spec.md §7's non-fatal edge cases).
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub mat_segments_sampled: usize,
    pub mat_segments_kept: usize,
    pub branches: usize,
    pub slices_placed: usize,
}

/// Runs the full pocket-clearing pipeline (spec.md §4): sample the region's
/// boundary, generate Voronoi edges via `voronoi`, filter them into MAT
/// segments, build the rooted medial tree, roll engagement-bounded slices
/// along it, and stitch the result into an ordered toolpath.
pub fn run(
    region: &Region,
    voronoi: &dyn VoronoiEdges,
    spiral: &dyn SpiralGenerator,
    config: &Config,
    startpoint: Option<Vec2>,
) -> Result<(Vec<PathItem>, RunReport), PocketError> {
    config.validate()?;

    let samples = mat_sampler::sample_region(region, config.cutter_radius);
    let (stabilized, bounds) = mat_sampler::with_voronoi_phantom_point(&samples, config.stabilize_voronoi);
    let xs: Vec<f64> = stabilized.iter().map(|p| p.x).collect();
    let ys: Vec<f64> = stabilized.iter().map(|p| p.y).collect();
    let raw_edges = voronoi.generate(&xs, &ys, bounds);

    let mat_segments = mat_sampler::filter_voronoi_edges(
        &raw_edges,
        region,
        config.general_tolerance,
        config.check_interior_crossing,
    );

    let tree = match tree_builder::build_tree(
        &mat_segments,
        region,
        config.cutter_radius,
        config.margin,
        config.general_tolerance,
        startpoint,
    ) {
        Some(tree) => tree,
        None => {
            log::warn!("no admissible medial tree root for this region; pocket is infeasible");
            return Ok((Vec::new(), RunReport::default()));
        }
    };

    let roll_params = RollParams {
        cutter_r: config.cutter_radius,
        margin: config.margin,
        max_engagement: config.max_engagement,
        min_engagement: config.min_engagement,
        engagement_tolerance: config.engagement_tolerance,
        general_tolerance: config.general_tolerance,
        segmented_slice_engagement_derating_k: config.segmented_slice_engagement_derating_k,
        dir: config.mill_direction.rotation(),
    };
    let rolled = roll::roll_tree(&tree, region, &roll_params);

    let path = stitcher::stitch(
        &tree,
        &rolled,
        spiral,
        config.spiral_pitch,
        config.emit_options,
        config.mill_direction,
        config.flatten_tolerance,
    )?;

    let report = RunReport {
        mat_segments_sampled: stabilized.len(),
        mat_segments_kept: mat_segments.len(),
        branches: tree.branches.len(),
        slices_placed: rolled.slices.len(),
    };

    Ok((path, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use collaborators::ArchimedeanSpiral;
    use mat_sampler::DelaunayVoronoi;
    use test_helpers::{narrow_channel_region, square_with_centered_island, unit_square_region};

    #[test]
    fn run_clears_a_unit_square() {
        let region = unit_square_region(10.0);
        let voronoi = DelaunayVoronoi;
        let spiral = ArchimedeanSpiral::default();
        let config = Config::default();
        let (path, report) = run(&region, &voronoi, &spiral, &config, None).expect("square pocket should clear");
        assert!(!path.is_empty());
        assert!(report.slices_placed > 0);
        assert!(matches!(path.first(), Some(PathItem::Spiral(_))));
    }

    #[test]
    fn run_clears_a_square_with_a_centered_island() {
        let region = square_with_centered_island(10.0, 2.0);
        let voronoi = DelaunayVoronoi;
        let spiral = ArchimedeanSpiral::default();
        let config = Config { cutter_radius: 0.5, ..Config::default() };
        let (path, report) = run(&region, &voronoi, &spiral, &config, None).expect("should clear around island");
        assert!(!path.is_empty());
        assert!(report.branches >= 1);
    }

    #[test]
    fn run_branches_for_a_narrow_channel() {
        let region = narrow_channel_region(10.0, 4.0, 3.0);
        let voronoi = DelaunayVoronoi;
        let spiral = ArchimedeanSpiral::default();
        let config = Config { cutter_radius: 0.6, ..Config::default() };
        let (_, report) = run(&region, &voronoi, &spiral, &config, None).expect("dog-bone pocket should clear");
        assert!(report.branches >= 1);
    }

    #[test]
    fn run_with_a_startpoint_outside_the_region_is_infeasible_not_an_error() {
        let region = unit_square_region(10.0);
        let voronoi = DelaunayVoronoi;
        let spiral = ArchimedeanSpiral::default();
        let config = Config::default();
        let (path, report) = run(&region, &voronoi, &spiral, &config, Some(Vec2::new(-5.0, -5.0)))
            .expect("an infeasible pocket is reported, not an error");
        assert!(path.is_empty());
        assert_eq!(report.slices_placed, 0);
    }

    #[test]
    fn invalid_cutter_radius_is_rejected_before_any_geometry_work() {
        let region = unit_square_region(10.0);
        let voronoi = DelaunayVoronoi;
        let spiral = ArchimedeanSpiral::default();
        let config = Config { cutter_radius: 0.0, ..Config::default() };
        let err = run(&region, &voronoi, &spiral, &config, None).unwrap_err();
        assert!(matches!(err, PocketError::InvalidCutterRadius));
    }

    #[test]
    fn rerun_with_identical_inputs_is_deterministic() {
        let region = unit_square_region(10.0);
        let voronoi = DelaunayVoronoi;
        let spiral = ArchimedeanSpiral::default();
        let config = Config::default();
        let (_, report_a) = run(&region, &voronoi, &spiral, &config, None).unwrap();
        let (_, report_b) = run(&region, &voronoi, &spiral, &config, None).unwrap();
        assert_eq!(report_a.slices_placed, report_b.slices_placed);
        assert_eq!(report_a.branches, report_b.branches);
    }
}
