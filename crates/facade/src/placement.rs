//! Placement context supplied by the tile/building placement system.
//!
//! Plan coordinates are `Vec2(x, z)`; the compiler lifts them to world space
//! as `Vec3(x, base_elevation + y, z)`.

use bevy::math::Vec2;
use serde::{Deserialize, Serialize};

/// One tile's contribution to an exterior face.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TileEdge {
    pub tile: u32,
    pub start: Vec2,
    pub end: Vec2,
}

impl TileEdge {
    pub fn new(tile: u32, start: Vec2, end: Vec2) -> Self {
        Self { tile, start, end }
    }

    pub fn length(&self) -> f32 {
        self.start.distance(self.end)
    }
}

/// One exterior orientation of the building with its tile edges in order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FacePlacement {
    #[serde(default)]
    pub label: Option<String>,
    pub edges: Vec<TileEdge>,
}

/// Street or sidewalk area that extrusions must stay out of.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreetPolygon {
    pub points: Vec<Vec2>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlacementContext {
    /// Faces in footprint order; edges wind consistently around the footprint.
    pub faces: Vec<FacePlacement>,
    #[serde(default)]
    pub street_clearance: Vec<StreetPolygon>,
    #[serde(default)]
    pub base_elevation: f32,
}

impl PlacementContext {
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Axis-aligned rectangular footprint split into square tiles, one face
    /// per side, wound counter-clockwise in plan. Used by hosts that only
    /// know a lot rectangle, and by tests.
    pub fn rectangle(origin: Vec2, tiles_x: u32, tiles_z: u32, tile_size: f32) -> Self {
        let corners = [
            origin,
            origin + Vec2::new(tiles_x as f32 * tile_size, 0.0),
            origin + Vec2::new(tiles_x as f32 * tile_size, tiles_z as f32 * tile_size),
            origin + Vec2::new(0.0, tiles_z as f32 * tile_size),
        ];
        let counts = [tiles_x, tiles_z, tiles_x, tiles_z];
        let labels = ["south", "east", "north", "west"];

        let mut faces = Vec::with_capacity(4);
        let mut tile_id = 0;
        for side in 0..4 {
            let a = corners[side];
            let b = corners[(side + 1) % 4];
            let n = counts[side].max(1);
            let mut edges = Vec::with_capacity(n as usize);
            for i in 0..n {
                let start = if i == 0 { a } else { a.lerp(b, i as f32 / n as f32) };
                let end = if i + 1 == n {
                    b
                } else {
                    a.lerp(b, (i + 1) as f32 / n as f32)
                };
                edges.push(TileEdge::new(tile_id, start, end));
                tile_id += 1;
            }
            faces.push(FacePlacement {
                label: Some(labels[side].to_string()),
                edges,
            });
        }

        Self {
            faces,
            street_clearance: Vec::new(),
            base_elevation: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rectangle_faces_share_corners() {
        let ctx = PlacementContext::rectangle(Vec2::ZERO, 2, 1, 5.0);
        assert_eq!(ctx.faces.len(), 4);
        assert_eq!(ctx.faces[0].edges.len(), 2);
        assert_eq!(ctx.faces[1].edges.len(), 1);
        for i in 0..4 {
            let last = ctx.faces[i].edges.last().unwrap().end;
            let next_first = ctx.faces[(i + 1) % 4].edges[0].start;
            assert_eq!(last, next_first, "face {i} does not meet face {}", (i + 1) % 4);
        }
    }

    #[test]
    fn test_rectangle_tile_edges_are_contiguous() {
        let ctx = PlacementContext::rectangle(Vec2::new(10.0, 20.0), 3, 2, 4.0);
        let south = &ctx.faces[0];
        for pair in south.edges.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        let total: f32 = south.edges.iter().map(|e| e.length()).sum();
        assert!((total - 12.0).abs() < 1e-4, "got: {total}");
    }

    #[test]
    fn test_placement_json_roundtrip_fields() {
        let json = r#"{
            "faces": [ { "edges": [ { "tile": 7, "start": [0.0, 0.0], "end": [4.0, 0.0] } ] } ],
            "street_clearance": [ { "points": [[0.0, -1.0], [4.0, -1.0], [4.0, -5.0]] } ]
        }"#;
        let ctx = PlacementContext::from_json_str(json).unwrap();
        assert_eq!(ctx.faces[0].edges[0].tile, 7);
        assert_eq!(ctx.faces[0].edges[0].end, Vec2::new(4.0, 0.0));
        assert_eq!(ctx.street_clearance[0].points.len(), 3);
        assert_eq!(ctx.base_elevation, 0.0);
    }
}
