//! Data-driven compiler parameters.
//!
//! Every tolerance and tiling constant the compiler uses lives in a single
//! [`FacadeParams`] resource so hosts can tune it without recompilation. The
//! struct deserializes from JSON with missing fields falling back to the
//! defaults below.

use bevy::prelude::Resource;
use serde::{Deserialize, Serialize};

/// Two tile edges are collinear when their directions differ by less than this.
pub const DEFAULT_ANGLE_EPSILON_DEG: f32 = 0.5;

/// Endpoint distance (meters) under which two points are treated as shared.
pub const DEFAULT_POSITION_EPSILON: f32 = 1e-3;

/// Spans shorter than this are dropped as degenerate.
pub const DEFAULT_MIN_SPAN_LENGTH: f32 = 0.05;

/// Number of segments an arch is sampled into.
pub const DEFAULT_ARCH_SEGMENTS: u32 = 12;

/// Miter length cap, as a multiple of the offset depth.
pub const DEFAULT_MITER_LIMIT: f32 = 4.0;

/// Gap kept between a clamped belt vertex and a street polygon.
pub const DEFAULT_STREET_CLEARANCE_MARGIN: f32 = 0.01;

/// Triangles with less than this area (square meters) are never emitted.
pub const DEFAULT_MIN_TRIANGLE_AREA: f32 = 1e-7;

/// Offsets between consecutive window layers when a definition gives none.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerOffsetDefaults {
    pub frame: f32,
    pub glass: f32,
    pub shade: f32,
    pub interior: f32,
}

impl Default for LayerOffsetDefaults {
    fn default() -> Self {
        Self {
            frame: 0.02,
            glass: 0.03,
            shade: 0.04,
            interior: 0.10,
        }
    }
}

/// Tunables for one compile pass. Read-only for the duration of the pass.
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FacadeParams {
    pub angle_epsilon_deg: f32,
    pub position_epsilon: f32,
    pub min_span_length: f32,
    pub arch_segments: u32,
    /// UV units per meter for every surface: walls, reveals, belts, roofs.
    pub uv_scale: f32,
    pub miter_limit: f32,
    pub street_clearance_margin: f32,
    pub min_triangle_area: f32,
    pub layer_offsets: LayerOffsetDefaults,
    /// Frame ring width used when a window definition leaves it unset.
    pub default_frame_width: f32,
}

impl Default for FacadeParams {
    fn default() -> Self {
        Self {
            angle_epsilon_deg: DEFAULT_ANGLE_EPSILON_DEG,
            position_epsilon: DEFAULT_POSITION_EPSILON,
            min_span_length: DEFAULT_MIN_SPAN_LENGTH,
            arch_segments: DEFAULT_ARCH_SEGMENTS,
            uv_scale: 1.0,
            miter_limit: DEFAULT_MITER_LIMIT,
            street_clearance_margin: DEFAULT_STREET_CLEARANCE_MARGIN,
            min_triangle_area: DEFAULT_MIN_TRIANGLE_AREA,
            layer_offsets: LayerOffsetDefaults::default(),
            default_frame_width: 0.06,
        }
    }
}

impl FacadeParams {
    /// Parse parameter overrides from JSON. Absent fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Cosine threshold for the collinearity test.
    pub fn collinear_cos(&self) -> f32 {
        self.angle_epsilon_deg.to_radians().cos()
    }

    /// Widest gap between consecutive spans that still counts as a joint.
    /// A dropped degenerate span leaves a gap up to `min_span_length`.
    pub fn seam_tolerance(&self) -> f32 {
        self.min_span_length.max(0.0) + self.position_epsilon
    }

    /// Arch sampling count, never below two segments.
    pub fn arch_segment_count(&self) -> usize {
        self.arch_segments.max(2) as usize
    }
}
