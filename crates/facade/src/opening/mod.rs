//! Wall openings: boundary outlines, the cut wall surface, and reveals.
//!
//! All opening coordinates are wall-local: `u` along the span from its
//! start, `v` building-relative height. Wall and reveal vertices on an
//! opening boundary are computed from the same `(u, v)` values so the two
//! surfaces share bit-identical positions.

mod reveal;
mod wall;


pub use reveal::build_reveal;
pub use wall::{build_row_walls, RowWalls};

use bevy::log::warn;
use bevy::math::Vec2;
use serde::Serialize;

use crate::config::FacadeParams;
use crate::error::FacadeError;
use crate::layout::WindowInstance;
use crate::spec::{WindowDefinition, WindowStyle};

/// Boundary of one opening, split into the parts the wall cut needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpeningOutline {
    pub left: f32,
    pub right: f32,
    pub sill: f32,
    /// Height where the jambs end and the arch (if any) starts.
    pub spring: f32,
    pub top: f32,
    /// Sill on the floor line: the opening notches the wall from below.
    pub door: bool,
    /// Head of the boundary from `(right, spring)` over to `(left, spring)`,
    /// counter-clockwise, inclusive of both ends.
    pub upper: Vec<Vec2>,
}

impl OpeningOutline {
    pub fn rectangle(left: f32, right: f32, sill: f32, top: f32, door: bool) -> Self {
        Self {
            left,
            right,
            sill,
            spring: top,
            top,
            door,
            upper: vec![Vec2::new(right, top), Vec2::new(left, top)],
        }
    }

    /// Segmental arch of the given rise over a rectangle. The rise is
    /// limited to half the width (semicircle) and to the opening height.
    pub fn arched(left: f32, right: f32, sill: f32, top: f32, rise: f32, segments: usize, door: bool) -> Self {
        let half = 0.5 * (right - left);
        let rise = rise.min(half).min(top - sill);
        if rise <= 1e-6 || half <= 1e-6 {
            return Self::rectangle(left, right, sill, top, door);
        }
        let spring = top - rise;
        let radius = (half * half + rise * rise) / (2.0 * rise);
        let center = Vec2::new(left + half, top - radius);
        let sweep = (half / radius).clamp(-1.0, 1.0).asin();

        let mut upper = Vec::with_capacity(segments + 1);
        upper.push(Vec2::new(right, spring));
        for i in 1..segments {
            let phi = sweep - 2.0 * sweep * i as f32 / segments as f32;
            upper.push(center + Vec2::new(phi.sin(), phi.cos()) * radius);
        }
        upper.push(Vec2::new(left, spring));

        Self {
            left,
            right,
            sill,
            spring,
            top,
            door,
            upper: clean_chain(upper),
        }
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    /// Closed boundary loop, counter-clockwise in `(u, v)`.
    pub fn boundary(&self) -> Vec<Vec2> {
        let mut loop_points = Vec::with_capacity(self.upper.len() + 2);
        loop_points.push(Vec2::new(self.left, self.sill));
        loop_points.push(Vec2::new(self.right, self.sill));
        for p in &self.upper {
            if loop_points.last() != Some(p) {
                loop_points.push(*p);
            }
        }
        while loop_points.len() > 1 && loop_points.last() == loop_points.first() {
            loop_points.pop();
        }
        loop_points
    }
}

/// Merge coincident points and remove exactly collinear interior points.
/// The two end points are always kept.
fn clean_chain(points: Vec<Vec2>) -> Vec<Vec2> {
    let mut deduped: Vec<Vec2> = Vec::with_capacity(points.len());
    for p in points {
        if deduped.last().is_none_or(|last| last.distance_squared(p) > 1e-12) {
            deduped.push(p);
        }
    }
    if deduped.len() < 3 {
        return deduped;
    }
    let last = deduped.len() - 1;
    let mut out = Vec::with_capacity(deduped.len());
    out.push(deduped[0]);
    for i in 1..last {
        let prev = *out.last().unwrap_or(&deduped[0]);
        let cross = (deduped[i] - prev).perp_dot(deduped[i + 1] - deduped[i]);
        if cross != 0.0 {
            out.push(deduped[i]);
        }
    }
    out.push(deduped[last]);
    out
}

/// A placed window cut into the wall.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Opening {
    /// Index into the row's windows.
    pub window: usize,
    pub outline: OpeningOutline,
    /// Reveal depth after clamping to the wall thickness.
    pub inset: f32,
}

impl Opening {
    pub fn has_reveal(&self) -> bool {
        self.inset > 0.0
    }
}

/// Builds the outline of each placed window.
pub struct OpeningGeometryBuilder<'a> {
    params: &'a FacadeParams,
    wall_thickness: f32,
}

impl<'a> OpeningGeometryBuilder<'a> {
    pub fn new(params: &'a FacadeParams, wall_thickness: f32) -> Self {
        Self {
            params,
            wall_thickness,
        }
    }

    /// Outline and clamped inset for `instance` on a floor starting at `floor_base`.
    pub fn opening(
        &self,
        index: usize,
        instance: &WindowInstance,
        def: &WindowDefinition,
        floor_base: f32,
        inset: f32,
        diagnostics: &mut Vec<FacadeError>,
    ) -> Opening {
        let door = def.sill_height <= self.params.position_epsilon;
        let sill = if door { floor_base } else { floor_base + def.sill_height };
        let top = floor_base + def.top();
        let (left, right) = (instance.left, instance.right());
        let outline = match def.style {
            WindowStyle::Rectangular => OpeningOutline::rectangle(left, right, sill, top, door),
            WindowStyle::Arched { rise } => OpeningOutline::arched(
                left,
                right,
                sill,
                top,
                rise,
                self.params.arch_segment_count(),
                door,
            ),
        };

        let mut depth = inset.max(0.0);
        if depth > self.wall_thickness {
            let location = format!(
                "face {} span {} floor {} window {}",
                instance.face, instance.span.index, instance.floor, instance.candidate
            );
            warn!(
                "{location}: inset {depth:.3} m clamped to the wall thickness {:.3} m",
                self.wall_thickness
            );
            diagnostics.push(FacadeError::unfittable(
                location,
                format!(
                    "inset {depth:.3} m exceeds the wall thickness {:.3} m",
                    self.wall_thickness
                ),
            ));
            depth = self.wall_thickness;
        }

        Opening {
            window: index,
            outline,
            inset: depth,
        }
    }
}
