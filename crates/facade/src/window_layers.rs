//! Layered window assemblies: frame, muntins, glass, shade and interior
//! backdrop, stacked behind the reveal along the wall's local normal.
//!
//! Every position is expressed in the span's wall frame `(u, v, depth)`, so
//! two instances of the same definition on opposite faces get identical
//! layer spacing relative to their own outward normal.

use bevy::math::Vec2;
use serde::Serialize;

use crate::config::FacadeParams;
use crate::geometry::{offset_chain, WallFrame};
use crate::mesh::{MeshBuffers, SurfaceKind};
use crate::opening::Opening;
use crate::spec::{ShadeDirection, WindowDefinition};

/// Depth of each layer behind the wall surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LayerDepths {
    pub frame: f32,
    pub glass: f32,
    pub shade: f32,
    pub interior: f32,
}

#[derive(Debug, Default)]
pub struct WindowAssembly {
    pub layers: Vec<(SurfaceKind, MeshBuffers)>,
    pub depths: Option<LayerDepths>,
}

impl WindowAssembly {
    pub fn layer(&self, kind: SurfaceKind) -> Option<&MeshBuffers> {
        self.layers.iter().find(|(k, _)| *k == kind).map(|(_, b)| b)
    }
}

/// Clip a polygon to the half-plane where `side(p) >= 0`; `side` must be affine.
fn clip_half_plane(points: &[Vec2], side: impl Fn(Vec2) -> f32) -> Vec<Vec2> {
    let n = points.len();
    let mut out = Vec::with_capacity(n + 2);
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        let (sa, sb) = (side(a), side(b));
        if sa >= 0.0 {
            out.push(a);
        }
        if (sa >= 0.0) != (sb >= 0.0) {
            let t = sa / (sa - sb);
            out.push(a.lerp(b, t));
        }
    }
    out
}

/// Lowest and highest `v` where the vertical line `u = x` meets a loop.
fn vertical_extent(points: &[Vec2], x: f32) -> Option<(f32, f32)> {
    let n = points.len();
    let mut lo = f32::INFINITY;
    let mut hi = f32::NEG_INFINITY;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        if (a.x <= x && b.x >= x) || (b.x <= x && a.x >= x) {
            let y = if (b.x - a.x).abs() < 1e-9 {
                a.y.max(b.y)
            } else {
                a.y + (x - a.x) / (b.x - a.x) * (b.y - a.y)
            };
            lo = lo.min(y);
            hi = hi.max(y);
        }
    }
    (lo < hi).then_some((lo, hi))
}

/// Leftmost and rightmost `u` where the horizontal line `v = y` meets a loop.
fn horizontal_extent(points: &[Vec2], y: f32) -> Option<(f32, f32)> {
    let swapped: Vec<Vec2> = points.iter().map(|p| Vec2::new(p.y, p.x)).collect();
    vertical_extent(&swapped, y)
}

pub struct WindowLayerAssembler<'a> {
    params: &'a FacadeParams,
}

impl<'a> WindowLayerAssembler<'a> {
    pub fn new(params: &'a FacadeParams) -> Self {
        Self { params }
    }

    pub fn depths(&self, def: &WindowDefinition, window_plane: f32) -> LayerDepths {
        let defaults = &self.params.layer_offsets;
        let layers = &def.layers;
        let frame = window_plane + layers.frame.offset.unwrap_or(defaults.frame);
        let glass = frame + layers.glass.offset.unwrap_or(defaults.glass);
        let shade = glass + layers.shade.offset.unwrap_or(defaults.shade);
        let interior = shade + layers.interior.offset.unwrap_or(defaults.interior);
        LayerDepths {
            frame,
            glass,
            shade,
            interior,
        }
    }

    fn push_plane_polygon(&self, out: &mut MeshBuffers, frame: &WallFrame, points: &[Vec2], depth: f32) {
        if points.len() < 3 {
            return;
        }
        let world: Vec<_> = points
            .iter()
            .map(|p| frame.inset_point(p.x, p.y, depth))
            .collect();
        let uv: Vec<_> = points.iter().map(|p| *p * self.params.uv_scale).collect();
        out.push_polygon(points, &world, &uv, frame.normal(), self.params.min_triangle_area);
    }

    fn push_bar(&self, out: &mut MeshBuffers, frame: &WallFrame, min: Vec2, max: Vec2, depth: f32) {
        if max.x - min.x <= 0.0 || max.y - min.y <= 0.0 {
            return;
        }
        let corners = [
            Vec2::new(min.x, min.y),
            Vec2::new(max.x, min.y),
            Vec2::new(max.x, max.y),
            Vec2::new(min.x, max.y),
        ];
        self.push_plane_polygon(out, frame, &corners, depth);
    }

    /// Build every layer of one window behind its opening.
    pub fn assemble(&self, frame: &WallFrame, opening: &Opening, def: &WindowDefinition) -> WindowAssembly {
        let boundary = opening.outline.boundary();
        if boundary.len() < 3 {
            return WindowAssembly::default();
        }
        let depths = self.depths(def, opening.inset);
        let width = opening.outline.width();
        let height = opening.outline.top - opening.outline.sill;
        let frame_width = def
            .frame_width
            .unwrap_or(self.params.default_frame_width)
            .clamp(0.0, 0.45 * width.min(height));

        // Inner loop: the boundary pulled in by the frame width.
        let inner: Vec<Vec2> = if frame_width > 0.0 {
            offset_chain(&boundary, true, frame_width, -1.0, self.params.miter_limit)
                .into_iter()
                .map(|v| v.point)
                .collect()
        } else {
            boundary.clone()
        };

        let mut assembly = WindowAssembly {
            layers: Vec::with_capacity(5),
            depths: Some(depths),
        };

        // Frame ring.
        if frame_width > 0.0 {
            let mut ring = MeshBuffers::new();
            let n = boundary.len();
            for i in 0..n {
                let j = (i + 1) % n;
                let quad = [boundary[i], boundary[j], inner[j], inner[i]];
                self.push_plane_polygon(&mut ring, frame, &quad, depths.frame);
            }
            assembly.layers.push((SurfaceKind::WindowFrame, ring));
        }

        // Muntin grid inside the inner loop, in the frame plane.
        let grid = def.muntins;
        if grid.width > 0.0 && (grid.columns > 1 || grid.rows > 1) {
            let mut bars = MeshBuffers::new();
            let (lo, hi) = inner
                .iter()
                .fold((Vec2::splat(f32::INFINITY), Vec2::splat(f32::NEG_INFINITY)), |(lo, hi), p| {
                    (lo.min(*p), hi.max(*p))
                });
            let half = 0.5 * grid.width;
            for c in 1..grid.columns {
                let x = lo.x + (hi.x - lo.x) * c as f32 / grid.columns as f32;
                if let Some((y0, y1)) = vertical_extent(&inner, x) {
                    self.push_bar(&mut bars, frame, Vec2::new(x - half, y0), Vec2::new(x + half, y1), depths.frame);
                }
            }
            for r in 1..grid.rows {
                let y = lo.y + (hi.y - lo.y) * r as f32 / grid.rows as f32;
                if let Some((x0, x1)) = horizontal_extent(&inner, y) {
                    self.push_bar(&mut bars, frame, Vec2::new(x0, y - half), Vec2::new(x1, y + half), depths.frame);
                }
            }
            if !bars.is_empty() {
                assembly.layers.push((SurfaceKind::WindowMuntin, bars));
            }
        }

        let mut glass = MeshBuffers::new();
        self.push_plane_polygon(&mut glass, frame, &inner, depths.glass);
        assembly.layers.push((SurfaceKind::WindowGlass, glass));

        let coverage = def.shade.coverage.clamp(0.0, 1.0);
        if coverage > 0.0 {
            let (lo, hi) = inner
                .iter()
                .fold((Vec2::splat(f32::INFINITY), Vec2::splat(f32::NEG_INFINITY)), |(lo, hi), p| {
                    (lo.min(*p), hi.max(*p))
                });
            let covered = match def.shade.direction {
                ShadeDirection::TopToBottom => {
                    let edge = hi.y - coverage * (hi.y - lo.y);
                    clip_half_plane(&inner, |p| p.y - edge)
                }
                ShadeDirection::LeftToRight => {
                    let edge = lo.x + coverage * (hi.x - lo.x);
                    clip_half_plane(&inner, |p| edge - p.x)
                }
                ShadeDirection::RightToLeft => {
                    let edge = hi.x - coverage * (hi.x - lo.x);
                    clip_half_plane(&inner, |p| p.x - edge)
                }
            };
            let mut shade = MeshBuffers::new();
            self.push_plane_polygon(&mut shade, frame, &covered, depths.shade);
            assembly.layers.push((SurfaceKind::WindowShade, shade));
        }

        let mut interior = MeshBuffers::new();
        self.push_plane_polygon(&mut interior, frame, &inner, depths.interior);
        assembly.layers.push((SurfaceKind::WindowInterior, interior));

        assembly
    }
}
