use serde::Serialize;

use crate::belt::BeltReport;
use crate::error::FacadeError;
use crate::layout::{SkippedCandidate, SpacerElement};
use crate::material::MaterialRef;
use crate::span_merge::SpanId;
use crate::spec::BayAddress;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpanReport {
    pub id: SpanId,
    pub start: [f32; 2],
    pub end: [f32; 2],
    pub length: f32,
    pub tiles: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FaceReport {
    pub face: usize,
    pub label: Option<String>,
    pub spans: Vec<SpanReport>,
}

/// A window that made it onto the facade.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpeningReport {
    pub bay: BayAddress,
    pub span: SpanId,
    pub window: String,
    pub left: f32,
    pub width: f32,
    pub sill: f32,
    pub top: f32,
    pub inset: f32,
    pub door: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BayReport {
    pub bay: BayAddress,
    pub wall: MaterialRef,
    pub reveal: MaterialRef,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RoofReport {
    pub built: bool,
    pub rings_built: usize,
    pub rings_skipped: usize,
}

/// Metadata produced next to the mesh by one compile.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompileReport {
    /// `1.0` for a counter-clockwise footprint in plan, `-1.0` for clockwise.
    pub outward_sign: f32,
    pub faces: Vec<FaceReport>,
    pub openings: Vec<OpeningReport>,
    pub skipped: Vec<SkippedCandidate>,
    /// Spacer and column bands of every row, mandatory ones included.
    pub spacers: Vec<SpacerElement>,
    pub bays: Vec<BayReport>,
    pub belts: Vec<BeltReport>,
    pub roof: RoofReport,
    pub triangle_count: usize,
    pub vertex_count: usize,
    pub fingerprint: u32,
    pub diagnostics: Vec<FacadeError>,
}

impl CompileReport {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn bay(&self, bay: BayAddress) -> Option<&BayReport> {
        self.bays.iter().find(|b| b.bay == bay)
    }

    pub fn spans_of(&self, face: usize) -> &[SpanReport] {
        self.faces
            .iter()
            .find(|f| f.face == face)
            .map_or(&[], |f| f.spans.as_slice())
    }
}
