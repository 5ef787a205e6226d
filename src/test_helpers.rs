//! Geometry fixtures shared by this crate's unit tests (spec.md §8 scenarios):
//! a few canonical regions built out of straight-line polygons.

use crate::collaborators::Segment;
use crate::geometry::Vec2;
use crate::polygon::{Polygon, Region};

pub fn unit_square_region(side: f64) -> Region {
    Region::new(
        Box::new(Polygon::from_points(&[
            Vec2::new(0.0, 0.0),
            Vec2::new(side, 0.0),
            Vec2::new(side, side),
            Vec2::new(0.0, side),
        ])),
        vec![],
    )
}

/// A square region with a circular island at its center (spec.md §8 scenario
/// 2: "square with a circular island"). `island_radius` is the island's
/// radius, not a side length.
pub fn square_with_centered_island(side: f64, island_radius: f64) -> Region {
    let center = Vec2::new(side / 2.0, side / 2.0);
    let island = Polygon::from_segments(vec![Segment::Arc {
        center,
        radius: island_radius,
        start_angle: 0.0,
        sweep: std::f64::consts::TAU,
    }]);
    Region::new(
        Box::new(Polygon::from_points(&[
            Vec2::new(0.0, 0.0),
            Vec2::new(side, 0.0),
            Vec2::new(side, side),
            Vec2::new(0.0, side),
        ])),
        vec![Box::new(island)],
    )
}

/// A dog-bone shaped region: two square lobes joined by a channel narrower
/// than either lobe, forcing the medial tree to branch (spec.md §8 "narrow
/// channel").
pub fn narrow_channel_region(lobe: f64, channel_len: f64, channel_w: f64) -> Region {
    let outer = vec![
        Vec2::new(0.0, 0.0),
        Vec2::new(lobe, 0.0),
        Vec2::new(lobe, (lobe - channel_w) / 2.0),
        Vec2::new(lobe + channel_len, (lobe - channel_w) / 2.0),
        Vec2::new(lobe + channel_len, 0.0),
        Vec2::new(lobe + channel_len + lobe, 0.0),
        Vec2::new(lobe + channel_len + lobe, lobe),
        Vec2::new(lobe + channel_len, lobe),
        Vec2::new(lobe + channel_len, (lobe + channel_w) / 2.0),
        Vec2::new(lobe, (lobe + channel_w) / 2.0),
        Vec2::new(lobe, lobe),
        Vec2::new(0.0, lobe),
    ];
    Region::new(Box::new(Polygon::from_points(&outer)), vec![])
}
