use serde::Serialize;

use crate::span_merge::SpanId;
use crate::spec::{BayAddress, SpacerKind};

/// One placed window. `left` is measured along the span from its start.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowInstance {
    pub face: usize,
    pub span: SpanId,
    pub floor: usize,
    pub column: usize,
    pub left: f32,
    pub width: f32,
    pub window: String,
    /// Position of the candidate in the row's cycled pattern.
    pub candidate: usize,
}

impl WindowInstance {
    pub fn right(&self) -> f32 {
        self.left + self.width
    }

    pub fn bay(&self) -> BayAddress {
        BayAddress::new(self.face, self.floor, self.column)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpacerElement {
    pub face: usize,
    pub span: SpanId,
    pub floor: usize,
    pub left: f32,
    pub width: f32,
    pub kind: SpacerKind,
    pub mandatory: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedCandidate {
    pub face: usize,
    pub span: SpanId,
    pub floor: usize,
    pub candidate: usize,
    pub window: String,
    pub reason: String,
}

/// A vertical slice `[start, end]` of a span on one floor; one bay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColumnStrip {
    pub column: usize,
    pub start: f32,
    pub end: f32,
    /// Index into [`RowLayout::windows`] of the window inside the strip.
    pub window: Option<usize>,
}

/// Layout of one span on one floor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowLayout {
    pub span: SpanId,
    pub floor: usize,
    pub windows: Vec<WindowInstance>,
    pub spacers: Vec<SpacerElement>,
    pub skipped: Vec<SkippedCandidate>,
    pub strips: Vec<ColumnStrip>,
}

impl RowLayout {
    /// A row without openings: a single strip across the whole span.
    pub fn blank(span: SpanId, floor: usize, length: f32, column: usize) -> Self {
        Self {
            span,
            floor,
            windows: Vec::new(),
            spacers: Vec::new(),
            skipped: Vec::new(),
            strips: vec![ColumnStrip {
                column,
                start: 0.0,
                end: length,
                window: None,
            }],
        }
    }

    /// Column number following the last strip of this row.
    pub fn next_column(&self) -> usize {
        self.strips.last().map_or(0, |s| s.column + 1)
    }

    /// Every vertical cut position of the row: strip boundaries and the
    /// opening jambs.
    pub fn cut_positions(&self) -> Vec<f32> {
        let mut cuts: Vec<f32> = Vec::with_capacity(self.strips.len() + 1 + 2 * self.windows.len());
        for strip in &self.strips {
            cuts.push(strip.start);
            cuts.push(strip.end);
        }
        for w in &self.windows {
            cuts.push(w.left);
            cuts.push(w.right());
        }
        cuts.sort_by(f32::total_cmp);
        cuts.dedup();
        cuts
    }
}
