//! Window placement along one span per floor.
//!
//! Candidates come from the row pattern, cycled left to right. A candidate is
//! placed only if it fits whole after everything already placed; the first
//! one that does not fit ends the row, so earlier windows are never resized
//! or moved back to make room. The placed subset is then distributed
//! equidistantly over the usable length.

mod types;


pub use types::{ColumnStrip, RowLayout, SkippedCandidate, SpacerElement, WindowInstance};

use bevy::log::{debug, warn};

use crate::config::FacadeParams;
use crate::error::FacadeError;
use crate::span_merge::Span;
use crate::spec::{BeltSpec, BuildingSpec, SpacerAnchor, SpacerKind, WindowRowSpec};

/// Upper bound on candidates generated for a fill-mode row.
const MAX_FILL_CANDIDATES: usize = 4096;

/// Output of laying out one span on one floor.
#[derive(Debug)]
pub struct RowOutcome {
    pub layout: RowLayout,
    pub diagnostics: Vec<FacadeError>,
}

struct Pending<'a> {
    candidate: usize,
    window: &'a str,
    width: f32,
    spacer: Option<(f32, SpacerKind)>,
}

pub struct WindowLayoutEngine<'a> {
    spec: &'a BuildingSpec,
    params: &'a FacadeParams,
}

impl<'a> WindowLayoutEngine<'a> {
    pub fn new(spec: &'a BuildingSpec, params: &'a FacadeParams) -> Self {
        Self { spec, params }
    }

    /// Lay the floor's window row out along `span`. Columns are numbered
    /// from `first_column`. `belts` are the belts running along this face.
    pub fn layout_row(&self, span: &Span, floor: usize, first_column: usize, belts: &[&BeltSpec]) -> RowOutcome {
        let mut diagnostics = Vec::new();
        let blank = RowLayout::blank(span.id, floor, span.length, first_column);
        let Some(floor_spec) = self.spec.floors.get(floor) else {
            return RowOutcome {
                layout: blank,
                diagnostics,
            };
        };
        let Some((row, _)) = floor_spec.window_layer() else {
            return RowOutcome {
                layout: blank,
                diagnostics,
            };
        };
        if row.pattern.is_empty() || row.count == Some(0) {
            return RowOutcome {
                layout: blank,
                diagnostics,
            };
        }

        let location = format!("face {} span {} floor {floor}", span.id.face, span.id.index);
        let eps = self.params.position_epsilon;
        let pad = span.corner_padding;
        let padded = span.length - 2.0 * pad;
        if padded <= eps {
            if row.count.is_some() {
                warn!("{location}: no room inside the corner padding");
                diagnostics.push(FacadeError::unfittable(
                    location,
                    "span is shorter than twice the corner padding",
                ));
            }
            return RowOutcome {
                layout: blank,
                diagnostics,
            };
        }

        // Mandatory spacers are reserved first; if they cannot all fit they
        // are dropped and the row gets the whole padded length.
        let mut layout = blank;
        let mandatory: f32 = row.mandatory_spacers.iter().map(|s| s.width).sum();
        let (region_start, usable) = if mandatory <= padded + eps {
            let mut start_cursor = pad;
            let mut end_cursor = span.length - pad;
            for spacer in &row.mandatory_spacers {
                let left = match spacer.anchor {
                    SpacerAnchor::Start => {
                        let left = start_cursor;
                        start_cursor += spacer.width;
                        left
                    }
                    SpacerAnchor::End => {
                        end_cursor -= spacer.width;
                        end_cursor
                    }
                };
                layout.spacers.push(SpacerElement {
                    face: span.id.face,
                    span: span.id,
                    floor,
                    left,
                    width: spacer.width,
                    kind: spacer.kind,
                    mandatory: true,
                });
            }
            (start_cursor, (end_cursor - start_cursor).max(0.0))
        } else {
            warn!("{location}: mandatory spacers ({mandatory:.3} m) do not fit in {padded:.3} m");
            diagnostics.push(FacadeError::unfittable(
                format!("{location} mandatory_spacers"),
                format!("{mandatory:.3} m of mandatory spacers exceed the usable {padded:.3} m"),
            ));
            (pad, padded)
        };

        let floor_base = self.spec.floor_bases().get(floor).copied().unwrap_or(0.0);
        let placed = self.pick_candidates(row, floor, floor_base, usable, belts, &location, &mut layout, &mut diagnostics);

        // Equidistant distribution of the placed subset.
        let n = placed.len();
        if n > 0 {
            let widths: f32 = placed
                .iter()
                .map(|p| p.width + p.spacer.map_or(0.0, |(w, _)| w))
                .sum();
            let slack = (usable - widths - (n - 1) as f32 * row.min_spacing).max(0.0);
            let e = slack / (n + 1) as f32;

            let mut x = region_start;
            for (i, pending) in placed.iter().enumerate() {
                x += if i == 0 { e } else { row.min_spacing + e };
                if let Some((width, kind)) = pending.spacer {
                    layout.spacers.push(SpacerElement {
                        face: span.id.face,
                        span: span.id,
                        floor,
                        left: x,
                        width,
                        kind,
                        mandatory: false,
                    });
                    x += width;
                }
                layout.windows.push(WindowInstance {
                    face: span.id.face,
                    span: span.id,
                    floor,
                    column: first_column + i,
                    left: x,
                    width: pending.width,
                    window: pending.window.to_string(),
                    candidate: pending.candidate,
                });
                x += pending.width;
            }
            layout.strips = column_strips(&layout.windows, span.length, first_column);
        }

        debug!(
            "{location}: placed {} windows, skipped {}",
            layout.windows.len(),
            layout.skipped.len()
        );
        RowOutcome {
            layout,
            diagnostics,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn pick_candidates(
        &self,
        row: &'a WindowRowSpec,
        floor: usize,
        floor_base: f32,
        usable: f32,
        belts: &[&BeltSpec],
        location: &str,
        layout: &mut RowLayout,
        diagnostics: &mut Vec<FacadeError>,
    ) -> Vec<Pending<'a>> {
        let eps = self.params.position_epsilon;
        let floor_height = self.spec.floors.get(floor).map_or(0.0, |f| f.height);
        let total = row.count.unwrap_or(MAX_FILL_CANDIDATES);
        let explicit = row.count.is_some();

        let mut placed: Vec<Pending<'a>> = Vec::new();
        let mut cursor = 0.0;
        let mut stopped: Option<String> = None;

        for candidate in 0..total {
            let element = &row.pattern[candidate % row.pattern.len()];
            let def = self.spec.window(&element.window);

            let reason = match (&stopped, def) {
                (Some(reason), _) => Some(reason.clone()),
                (None, None) => Some(format!("unknown window '{}'", element.window)),
                (None, Some(def)) => {
                    let spacer = element.spacer_before.map_or(0.0, |s| s.width);
                    let gap = if placed.is_empty() { 0.0 } else { row.min_spacing };
                    let need = gap + spacer + def.width;
                    let bottom = floor_base + def.sill_height;
                    let top = floor_base + def.top();
                    if def.top() > floor_height - eps {
                        Some(format!(
                            "window top {:.3} m exceeds the floor height {floor_height:.3} m",
                            def.top()
                        ))
                    } else if belts.iter().any(|b| b.overlaps(bottom, top)) {
                        Some("window overlaps a belt band".to_string())
                    } else if cursor + need > usable + eps {
                        if !explicit {
                            // Fill mode ends at the first window that runs out of room.
                            break;
                        }
                        Some(format!(
                            "needs {need:.3} m at {cursor:.3} m but only {usable:.3} m is usable"
                        ))
                    } else {
                        cursor += need;
                        placed.push(Pending {
                            candidate,
                            window: element.window.as_str(),
                            width: def.width,
                            spacer: element.spacer_before.map(|s| (s.width, s.kind)),
                        });
                        None
                    }
                }
            };

            if let Some(reason) = reason {
                if stopped.is_none() {
                    warn!("{location}: candidate {candidate} ('{}') skipped: {reason}", element.window);
                }
                diagnostics.push(FacadeError::unfittable(
                    format!("{location} candidate {candidate}"),
                    reason.clone(),
                ));
                layout.skipped.push(SkippedCandidate {
                    face: layout.span.face,
                    span: layout.span,
                    floor,
                    candidate,
                    window: element.window.clone(),
                    reason: reason.clone(),
                });
                if stopped.is_none() {
                    stopped = Some(format!("follows skipped candidate {candidate}: {reason}"));
                }
                if !explicit {
                    break;
                }
            }
        }
        placed
    }
}

/// Partition `[0, length]` into one strip per window, split at the middle
/// of each gap between neighbours.
pub fn column_strips(windows: &[WindowInstance], length: f32, first_column: usize) -> Vec<ColumnStrip> {
    if windows.is_empty() {
        return vec![ColumnStrip {
            column: first_column,
            start: 0.0,
            end: length,
            window: None,
        }];
    }
    let mut strips = Vec::with_capacity(windows.len());
    let mut start = 0.0;
    for (i, w) in windows.iter().enumerate() {
        let end = match windows.get(i + 1) {
            Some(next) => 0.5 * (w.right() + next.left),
            None => length,
        };
        strips.push(ColumnStrip {
            column: first_column + i,
            start,
            end,
            window: Some(i),
        });
        start = end;
    }
    strips
}
