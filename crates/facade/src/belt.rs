//! Horizontal bands extruded outward from the wall along the footprint.
//!
//! Spans are chained in footprint order and offset with miter joins. Every
//! offset vertex is pulled back toward the wall so it stays out of the
//! street clearance polygons; a fully clamped belt is dropped. Street
//! corners that reach in between two vertices get a vertex of their own.

use bevy::log::{debug, warn};
use bevy::math::{Vec2, Vec3};
use serde::Serialize;

use crate::config::FacadeParams;
use crate::error::FacadeError;
use crate::geometry::{first_boundary_crossing, lift, offset_chain, point_in_polygon, right_perp, OffsetVertex};
use crate::mesh::MeshBuffers;
use crate::placement::StreetPolygon;
use crate::span_merge::Span;
use crate::spec::BeltSpec;

/// Rounds of street-corner splitting per chain. A round only splits where the
/// previous round left a corner inside the band.
const CLEARANCE_ROUNDS: usize = 4;

/// Splits closer than this to an existing vertex are not worth a vertex.
const MIN_SPLIT: f32 = 1e-4;

/// A run of consecutive spans whose ends meet.
#[derive(Debug, Clone, PartialEq)]
pub struct SpanChain {
    pub points: Vec<Vec2>,
    pub closed: bool,
}

/// Chain spans in order. A chain breaks where a span starts farther than
/// `seam` from the previous span's end, and is closed when it returns to its
/// start. Gaps wider than `eps` but within `seam` are bridged with a short
/// extra edge.
pub fn chain_spans<'s>(spans: impl IntoIterator<Item = &'s Span>, eps: f32, seam: f32) -> Vec<SpanChain> {
    let mut chains: Vec<Vec<Vec2>> = Vec::new();
    for span in spans {
        match chains.last_mut() {
            Some(points) if points.last().is_some_and(|p| p.distance(span.start) <= seam) => {
                push_distinct(points, span.start, eps);
                points.push(span.end);
            }
            _ => chains.push(vec![span.start, span.end]),
        }
    }

    // A chain that ends where the first one starts wraps around the footprint.
    if chains.len() > 1 {
        let first_start = chains[0][0];
        let last_end = chains.last().and_then(|c| c.last().copied());
        if last_end.is_some_and(|p| p.distance(first_start) <= seam) {
            if let Some(mut tail) = chains.pop() {
                for &p in &chains[0] {
                    push_distinct(&mut tail, p, eps);
                }
                chains[0] = tail;
            }
        }
    }

    chains
        .into_iter()
        .map(|mut points| {
            let gap = points
                .first()
                .zip(points.last())
                .map_or(f32::INFINITY, |(a, b)| a.distance(*b));
            let closed = if gap <= eps {
                points.len() > 3
            } else {
                gap <= seam && points.len() >= 3
            };
            if closed && gap <= eps {
                points.pop();
            }
            SpanChain { points, closed }
        })
        .collect()
}

fn push_distinct(points: &mut Vec<Vec2>, p: Vec2, eps: f32) {
    if points.last().map_or(true, |q| q.distance(p) > eps) {
        points.push(p);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BeltReport {
    pub belt: usize,
    pub chains: usize,
    pub closed_chains: usize,
    pub vertices: usize,
    /// Vertices whose depth was reduced by street clearance.
    pub clamped_vertices: usize,
    pub min_depth: f32,
    pub max_depth: f32,
    pub skipped: Option<String>,
}

#[derive(Debug)]
pub struct BeltOutcome {
    pub report: BeltReport,
    pub mesh: MeshBuffers,
    pub diagnostics: Vec<FacadeError>,
}

pub struct BeltExtruder<'a> {
    params: &'a FacadeParams,
    streets: &'a [StreetPolygon],
    outward_sign: f32,
    base_elevation: f32,
}

impl<'a> BeltExtruder<'a> {
    pub fn new(params: &'a FacadeParams, streets: &'a [StreetPolygon], outward_sign: f32, base_elevation: f32) -> Self {
        Self {
            params,
            streets,
            outward_sign,
            base_elevation,
        }
    }

    /// Pull an offset vertex back so it stays `street_clearance_margin` short
    /// of every street polygon. Returns `true` if it moved.
    pub fn clamp_to_streets(&self, vertex: &mut OffsetVertex) -> bool {
        let reach = vertex.base.distance(vertex.point);
        if reach <= 0.0 {
            return false;
        }
        let mut allowed = reach;
        for street in self.streets {
            let polygon = &street.points;
            if point_in_polygon(vertex.base, polygon) {
                allowed = 0.0;
                break;
            }
            if let Some(t) = first_boundary_crossing(vertex.base, vertex.point, polygon) {
                allowed = allowed.min((t * reach - self.params.street_clearance_margin).max(0.0));
            }
        }
        if allowed >= reach {
            return false;
        }
        let direction = (vertex.point - vertex.base) / reach;
        vertex.point = vertex.base + direction * allowed;
        vertex.depth *= allowed / reach;
        true
    }

    /// Pull `vertex` back so it stops `street_clearance_margin` short of
    /// `corner`, which lies on its offset ray. Returns `true` if it moved.
    fn clamp_to_corner(&self, vertex: &mut OffsetVertex, corner: Vec2) -> bool {
        let reach = vertex.base.distance(vertex.point);
        let allowed = (vertex.base.distance(corner) - self.params.street_clearance_margin).max(0.0);
        if reach <= 0.0 || allowed >= reach {
            return false;
        }
        let direction = (vertex.point - vertex.base) / reach;
        vertex.point = vertex.base + direction * allowed;
        vertex.depth *= allowed / reach;
        true
    }

    /// Clamp a whole offset chain. Vertex clamping alone misses a street
    /// corner that pokes into the band between two vertices, so each such
    /// corner gets a vertex whose offset ray passes through it. Returns the
    /// number of clamped vertices.
    fn clear_streets(&self, vertices: &mut Vec<OffsetVertex>, closed: bool) -> usize {
        let mut clamped = 0;
        for v in vertices.iter_mut() {
            if self.clamp_to_streets(v) {
                clamped += 1;
            }
        }
        if self.streets.is_empty() {
            return clamped;
        }

        for _ in 0..CLEARANCE_ROUNDS {
            let n = vertices.len();
            if n < 2 {
                break;
            }
            let edges = if closed { n } else { n - 1 };
            let mut split = false;
            let mut out = Vec::with_capacity(n + 2);
            for i in 0..edges {
                let (a, b) = (vertices[i], vertices[(i + 1) % n]);
                out.push(a);
                let band = [a.base, b.base, b.point, a.point];
                let mut inserted: Vec<(f32, OffsetVertex)> = Vec::new();
                for corner in self.streets.iter().flat_map(|s| s.points.iter().copied()) {
                    if !point_in_polygon(corner, &band) {
                        continue;
                    }
                    let Some(t) = ray_through(&a, &b, corner) else {
                        continue;
                    };
                    let mut v = OffsetVertex {
                        base: a.base.lerp(b.base, t),
                        point: a.point.lerp(b.point, t),
                        depth: a.depth + (b.depth - a.depth) * t,
                    };
                    let street = self.clamp_to_streets(&mut v);
                    let corner_hit = self.clamp_to_corner(&mut v, corner);
                    if street || corner_hit {
                        clamped += 1;
                    }
                    inserted.push((t, v));
                }
                inserted.sort_by(|x, y| x.0.total_cmp(&y.0));
                split |= !inserted.is_empty();
                out.extend(inserted.into_iter().map(|(_, v)| v));
            }
            if !closed {
                out.push(vertices[n - 1]);
            }
            *vertices = out;
            if !split {
                break;
            }
        }
        clamped
    }

    /// Extrude `belt` along the spans it applies to.
    pub fn extrude(&self, index: usize, belt: &BeltSpec, spans: &[Span], building_height: f32) -> BeltOutcome {
        let location = format!("belts[{index}]");
        let mut report = BeltReport {
            belt: index,
            chains: 0,
            closed_chains: 0,
            vertices: 0,
            clamped_vertices: 0,
            min_depth: 0.0,
            max_depth: 0.0,
            skipped: None,
        };
        let mut diagnostics = Vec::new();
        let mut mesh = MeshBuffers::new();

        let bottom = belt.bottom.max(0.0);
        let top = belt.top.min(building_height);
        if top <= bottom {
            let reason = format!(
                "range {:.3}..{:.3} m lies outside the building height {building_height:.3} m",
                belt.bottom, belt.top
            );
            warn!("{location}: skipped, {reason}");
            diagnostics.push(FacadeError::unfittable(location, reason.clone()));
            report.skipped = Some(reason);
            return BeltOutcome {
                report,
                mesh,
                diagnostics,
            };
        }

        let chains = chain_spans(
            spans.iter().filter(|s| belt.applies_to(s.id.face)),
            self.params.position_epsilon,
            self.params.seam_tolerance(),
        );
        report.chains = chains.len();
        report.closed_chains = chains.iter().filter(|c| c.closed).count();

        let mut offsets: Vec<(Vec<OffsetVertex>, bool)> = Vec::with_capacity(chains.len());
        for chain in &chains {
            let mut vertices = offset_chain(
                &chain.points,
                chain.closed,
                belt.depth,
                self.outward_sign,
                self.params.miter_limit,
            );
            report.clamped_vertices += self.clear_streets(&mut vertices, chain.closed);
            report.vertices += vertices.len();
            offsets.push((vertices, chain.closed));
        }

        let depths: Vec<f32> = offsets
            .iter()
            .flat_map(|(v, _)| v.iter().map(|v| v.depth))
            .collect();
        report.min_depth = depths.iter().copied().fold(f32::INFINITY, f32::min);
        report.max_depth = depths.iter().copied().fold(0.0, f32::max);
        if report.vertices == 0 || report.max_depth <= self.params.position_epsilon {
            let reason = "street clearance leaves no room for the extrusion".to_string();
            warn!("{location}: skipped, {reason}");
            diagnostics.push(FacadeError::unfittable(location, reason.clone()));
            report.skipped = Some(reason);
            report.min_depth = report.min_depth.min(report.max_depth);
            return BeltOutcome {
                report,
                mesh,
                diagnostics,
            };
        }

        let y0 = self.base_elevation + bottom;
        let y1 = self.base_elevation + top;
        for (vertices, closed) in &offsets {
            self.emit_chain(&mut mesh, vertices, *closed, y0, y1);
        }
        debug!(
            "{location}: {} chains, {} vertices ({} clamped), {} triangles",
            report.chains,
            report.vertices,
            report.clamped_vertices,
            mesh.triangle_count()
        );
        BeltOutcome {
            report,
            mesh,
            diagnostics,
        }
    }

    fn emit_chain(&self, mesh: &mut MeshBuffers, vertices: &[OffsetVertex], closed: bool, y0: f32, y1: f32) {
        let n = vertices.len();
        if n < 2 {
            return;
        }
        let scale = self.params.uv_scale;
        let min_area = self.params.min_triangle_area;
        let plan_uv = |p: Vec2| p * scale;
        let (v0, v1) = (y0 - self.base_elevation, y1 - self.base_elevation);

        let edges = if closed { n } else { n - 1 };
        let mut along = 0.0;
        for i in 0..edges {
            let a = vertices[i];
            let b = vertices[(i + 1) % n];
            let run = a.point.distance(b.point);
            let d = (b.point - a.point).normalize_or_zero();
            let d = if d == Vec2::ZERO {
                (b.base - a.base).normalize_or_zero()
            } else {
                d
            };
            let out = lift(right_perp(d) * self.outward_sign, 0.0);

            mesh.push_quad(
                [
                    lift(a.point, y0),
                    lift(b.point, y0),
                    lift(b.point, y1),
                    lift(a.point, y1),
                ],
                [
                    Vec2::new(along, v0) * scale,
                    Vec2::new(along + run, v0) * scale,
                    Vec2::new(along + run, v1) * scale,
                    Vec2::new(along, v1) * scale,
                ],
                out,
                min_area,
            );
            along += run;

            for (y, normal) in [(y1, Vec3::Y), (y0, Vec3::NEG_Y)] {
                mesh.push_quad(
                    [
                        lift(a.base, y),
                        lift(b.base, y),
                        lift(b.point, y),
                        lift(a.point, y),
                    ],
                    [
                        plan_uv(a.base),
                        plan_uv(b.base),
                        plan_uv(b.point),
                        plan_uv(a.point),
                    ],
                    normal,
                    min_area,
                );
            }
        }

        if !closed {
            let first = (vertices[0], (vertices[0].base - vertices[1].base).normalize_or_zero());
            let last = (
                vertices[n - 1],
                (vertices[n - 1].base - vertices[n - 2].base).normalize_or_zero(),
            );
            for (v, facing) in [first, last] {
                let depth = v.base.distance(v.point);
                mesh.push_quad(
                    [
                        lift(v.base, y0),
                        lift(v.point, y0),
                        lift(v.point, y1),
                        lift(v.base, y1),
                    ],
                    [
                        Vec2::new(0.0, v0) * scale,
                        Vec2::new(depth, v0) * scale,
                        Vec2::new(depth, v1) * scale,
                        Vec2::new(0.0, v1) * scale,
                    ],
                    lift(facing, 0.0),
                    min_area,
                );
            }
        }
    }
}

/// Parameter `t` in `(0, 1)` along edge `a -> b` whose interpolated offset
/// ray, from `lerp(base)` to `lerp(point)`, passes through `p`.
fn ray_through(a: &OffsetVertex, b: &OffsetVertex, p: Vec2) -> Option<f32> {
    let e = b.base - a.base;
    let d0 = a.point - a.base;
    let d1 = (b.point - b.base) - d0;
    let w = p - a.base;
    // cross(d0 + t d1, w - t e) = 0
    let qa = -d1.perp_dot(e);
    let qb = d1.perp_dot(w) - d0.perp_dot(e);
    let qc = d0.perp_dot(w);
    let inside = |t: f32| t > MIN_SPLIT && t < 1.0 - MIN_SPLIT;
    if qa.abs() < 1e-9 {
        if qb.abs() < 1e-12 {
            return None;
        }
        return Some(-qc / qb).filter(|t| inside(*t));
    }
    let disc = qb * qb - 4.0 * qa * qc;
    if disc < 0.0 {
        return None;
    }
    let root = disc.sqrt();
    [(-qb - root) / (2.0 * qa), (-qb + root) / (2.0 * qa)]
        .into_iter()
        .filter(|t| inside(*t))
        .min_by(f32::total_cmp)
}
