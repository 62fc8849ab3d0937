//! Merges the tile edges of one exterior face into continuous wall spans.
//!
//! Placement hands over one edge per tile. Adjacent collinear edges are
//! joined so layout and geometry always see one run per straight wall,
//! whatever the tiling underneath.

use bevy::log::{debug, warn};
use bevy::math::Vec2;
use serde::Serialize;

use crate::config::FacadeParams;
use crate::error::FacadeError;
use crate::placement::TileEdge;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SpanId {
    pub face: usize,
    pub index: usize,
}

/// One continuous straight wall run on a face.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Span {
    pub id: SpanId,
    pub start: Vec2,
    pub end: Vec2,
    pub direction: Vec2,
    pub length: f32,
    pub corner_padding: f32,
    /// Tiles whose edges make up the span, in order.
    pub tiles: Vec<u32>,
}

impl Span {
    /// Length available to openings once both corner paddings are reserved.
    pub fn usable_length(&self) -> f32 {
        (self.length - 2.0 * self.corner_padding).max(0.0)
    }
}

#[derive(Debug, Default)]
pub struct SpanMerge {
    pub spans: Vec<Span>,
    pub diagnostics: Vec<FacadeError>,
}

struct OpenSpan {
    start: Vec2,
    end: Vec2,
    direction: Vec2,
    tiles: Vec<u32>,
}

pub struct FaceSpanMerger<'a> {
    params: &'a FacadeParams,
    corner_padding: f32,
}

impl<'a> FaceSpanMerger<'a> {
    pub fn new(params: &'a FacadeParams, corner_padding: f32) -> Self {
        Self {
            params,
            corner_padding,
        }
    }

    /// Walk the face's edges in tile order and emit its spans.
    pub fn merge(&self, face: usize, edges: &[TileEdge]) -> SpanMerge {
        let eps = self.params.position_epsilon;
        let cos_limit = self.params.collinear_cos();
        let mut out = SpanMerge::default();
        let mut current: Option<OpenSpan> = None;

        for edge in edges {
            if edge.length() < eps {
                // Zero-length edges neither extend nor break a span.
                continue;
            }
            let direction = (edge.end - edge.start).normalize_or_zero();

            if let Some(open) = current.as_mut() {
                let adjacent = edge.start.distance(open.end) <= eps;
                let collinear = direction.dot(open.direction) >= cos_limit;
                if adjacent && collinear {
                    open.end = edge.end;
                    open.tiles.push(edge.tile);
                    // Track the run's overall direction so small per-tile
                    // deviations cannot accumulate into a bend.
                    open.direction = (open.end - open.start).normalize_or_zero();
                    continue;
                }
            }

            if let Some(done) = current.take() {
                self.close(face, done, &mut out);
            }
            current = Some(OpenSpan {
                start: edge.start,
                end: edge.end,
                direction,
                tiles: vec![edge.tile],
            });
        }
        if let Some(done) = current.take() {
            self.close(face, done, &mut out);
        }

        debug!(
            "face {face}: {} tile edges merged into {} spans",
            edges.len(),
            out.spans.len()
        );
        out
    }

    fn close(&self, face: usize, open: OpenSpan, out: &mut SpanMerge) {
        let length = open.start.distance(open.end);
        if length < self.params.min_span_length {
            warn!("face {face}: dropping degenerate span of length {length:.4}");
            out.diagnostics
                .push(FacadeError::DegenerateFace { face, length });
            return;
        }
        out.spans.push(Span {
            id: SpanId {
                face,
                index: out.spans.len(),
            },
            start: open.start,
            end: open.end,
            direction: (open.end - open.start).normalize_or_zero(),
            length,
            corner_padding: self.corner_padding,
            tiles: open.tiles,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn merge(edges: &[TileEdge]) -> SpanMerge {
        let params = FacadeParams::default();
        FaceSpanMerger::new(&params, 0.5).merge(0, edges)
    }

    #[test]
    fn test_two_collinear_edges_make_one_span() {
        let edges = [
            TileEdge::new(1, Vec2::new(0.0, 0.0), Vec2::new(4.0, 0.0)),
            TileEdge::new(2, Vec2::new(4.0, 0.0), Vec2::new(10.0, 0.0)),
        ];
        let result = merge(&edges);
        assert_eq!(result.spans.len(), 1);
        let span = &result.spans[0];
        assert!((span.length - 10.0).abs() < 1e-5, "got: {}", span.length);
        assert_eq!(span.tiles, vec![1, 2]);
        assert!((span.usable_length() - 9.0).abs() < 1e-5);
    }

    #[test]
    fn test_single_tile_is_one_span() {
        let edges = [TileEdge::new(0, Vec2::ZERO, Vec2::new(5.0, 0.0))];
        assert_eq!(merge(&edges).spans.len(), 1);
    }

    #[test]
    fn test_direction_change_breaks_span() {
        let edges = [
            TileEdge::new(0, Vec2::new(0.0, 0.0), Vec2::new(4.0, 0.0)),
            TileEdge::new(1, Vec2::new(4.0, 0.0), Vec2::new(4.0, 4.0)),
        ];
        let result = merge(&edges);
        assert_eq!(result.spans.len(), 2);
        assert_eq!(result.spans[1].id.index, 1);
    }

    #[test]
    fn test_gap_breaks_span() {
        let edges = [
            TileEdge::new(0, Vec2::new(0.0, 0.0), Vec2::new(4.0, 0.0)),
            TileEdge::new(1, Vec2::new(4.5, 0.0), Vec2::new(8.0, 0.0)),
        ];
        assert_eq!(merge(&edges).spans.len(), 2);
    }

    #[test]
    fn test_zero_length_edge_does_not_break_span() {
        let edges = [
            TileEdge::new(0, Vec2::new(0.0, 0.0), Vec2::new(4.0, 0.0)),
            TileEdge::new(1, Vec2::new(4.0, 0.0), Vec2::new(4.0, 0.0)),
            TileEdge::new(2, Vec2::new(4.0, 0.0), Vec2::new(8.0, 0.0)),
        ];
        let result = merge(&edges);
        assert_eq!(result.spans.len(), 1);
        assert_eq!(result.spans[0].tiles, vec![0, 2]);
    }

    #[test]
    fn test_short_span_is_degenerate_warning() {
        let edges = [
            TileEdge::new(0, Vec2::new(0.0, 0.0), Vec2::new(4.0, 0.0)),
            TileEdge::new(1, Vec2::new(4.0, 0.0), Vec2::new(4.0, 0.02)),
        ];
        let result = merge(&edges);
        assert_eq!(result.spans.len(), 1);
        assert!(matches!(
            result.diagnostics.as_slice(),
            [FacadeError::DegenerateFace { face: 0, .. }]
        ));
    }

    #[test]
    fn test_slight_angle_within_epsilon_merges() {
        let bend = 0.2_f32.to_radians();
        let end = Vec2::new(4.0, 0.0) + Vec2::new(bend.cos(), bend.sin()) * 4.0;
        let edges = [
            TileEdge::new(0, Vec2::ZERO, Vec2::new(4.0, 0.0)),
            TileEdge::new(1, Vec2::new(4.0, 0.0), end),
        ];
        assert_eq!(merge(&edges).spans.len(), 1);
    }
}
