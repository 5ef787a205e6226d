//! Serde-based description types for loading a pocket region (and its tool
//! parameters) from JSON, in the teacher's `CompDesc`-style pattern: flat
//! vertex lists, a units tag, and a small top-level envelope.

use serde::Deserialize;

use crate::collaborators::MillDirection;
use crate::geometry::Vec2;
use crate::polygon::{Polygon, Region};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    Inch,
    Mm,
}

/// A closed polygon boundary as a flat `[x0, y0, x1, y1, ...]` vertex list
/// (implicit closing edge from the last vertex back to the first), matching
/// the teacher's `PolyDesc` shape.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct FlatVerts(pub Vec<f64>);

impl FlatVerts {
    pub fn to_points(&self) -> Vec<Vec2> {
        self.0.chunks_exact(2).map(|xy| Vec2::new(xy[0], xy[1])).collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegionDesc {
    pub version: u32,
    pub units: Units,
    pub outer: FlatVerts,
    #[serde(default)]
    pub islands: Vec<FlatVerts>,
    #[serde(default)]
    pub startpoint: Option<[f64; 2]>,
}

impl RegionDesc {
    pub fn to_region(&self) -> Region {
        let outer = Box::new(Polygon::from_points(&self.outer.to_points()));
        let islands = self
            .islands
            .iter()
            .map(|fv| Box::new(Polygon::from_points(&fv.to_points())) as Box<dyn crate::collaborators::Polyline>)
            .collect();
        Region::new(outer, islands)
    }

    pub fn startpoint_vec2(&self) -> Option<Vec2> {
        self.startpoint.map(|[x, y]| Vec2::new(x, y))
    }
}

/// Tool/strategy parameters commonly supplied alongside a region (spec.md
/// §6), kept separate from [`crate::Config`] so a region file can travel
/// independently of the run-time tolerances.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolDesc {
    pub cutter_diameter: f64,
    #[serde(default)]
    pub mill_direction: Option<String>,
}

impl ToolDesc {
    pub fn cutter_radius(&self) -> f64 {
        self.cutter_diameter / 2.0
    }

    pub fn direction(&self) -> MillDirection {
        match self.mill_direction.as_deref() {
            Some("cw") | Some("CW") => MillDirection::Cw,
            Some("ccw") | Some("CCW") => MillDirection::Ccw,
            _ => MillDirection::Unknown,
        }
    }
}

pub fn parse_region_json(json_text: &str) -> Result<RegionDesc, serde_json::Error> {
    serde_json::from_str(json_text)
}

pub fn parse_tool_json(json_text: &str) -> Result<ToolDesc, serde_json::Error> {
    serde_json::from_str(json_text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_desc_deserializes_square_with_island() {
        let sample = r#"
        {
            "version": 1,
            "units": "mm",
            "outer": [0,0, 10,0, 10,10, 0,10],
            "islands": [
                [4,4, 6,4, 6,6, 4,6]
            ],
            "startpoint": [1.0, 1.0]
        }
        "#;

        let desc: RegionDesc = parse_region_json(sample).expect("sample json should deserialize");
        assert_eq!(desc.version, 1);
        assert_eq!(desc.units, Units::Mm);
        assert_eq!(desc.outer.to_points().len(), 4);
        assert_eq!(desc.islands.len(), 1);
        assert_eq!(desc.startpoint_vec2(), Some(Vec2::new(1.0, 1.0)));

        let region = desc.to_region();
        assert!(region.contains(Vec2::new(1.0, 1.0), 1e-6));
        assert!(!region.contains(Vec2::new(5.0, 5.0), 1e-6));
    }

    #[test]
    fn tool_desc_reads_cutter_radius_and_direction() {
        let sample = r#"{"cutter_diameter": 6.0, "mill_direction": "ccw"}"#;
        let tool: ToolDesc = parse_tool_json(sample).expect("sample json should deserialize");
        assert!((tool.cutter_radius() - 3.0).abs() < 1e-9);
        assert_eq!(tool.direction(), MillDirection::Ccw);
    }

    #[test]
    fn tool_desc_defaults_to_unknown_direction() {
        let sample = r#"{"cutter_diameter": 6.0}"#;
        let tool: ToolDesc = parse_tool_json(sample).expect("sample json should deserialize");
        assert_eq!(tool.direction(), MillDirection::Unknown);
    }
}
