//! Roof rings stacked above the top floor, the ledges between them, and
//! the flat cap that closes the topmost loop.

use bevy::log::{debug, warn};
use bevy::math::{Vec2, Vec3};

use crate::config::FacadeParams;
use crate::error::FacadeError;
use crate::geometry::{lift, offset_chain, right_perp, signed_area, WallFrame};
use crate::mesh::MeshBuffers;
use crate::spec::RoofRing;

/// Closed footprint loop with the wall-top breakpoints of each edge.
pub struct RoofFootprint<'f> {
    /// Loop corners; edge `i` starts at `corners[i]`.
    pub corners: &'f [Vec2],
    /// Where the wall below edge `i` ends. Missing entries mean the next
    /// corner. An end short of the next corner leaves a bridged seam.
    pub ends: &'f [Vec2],
    /// Per edge, distances from the edge start where the wall's top line
    /// carries vertices, strictly inside the edge.
    pub edge_breaks: &'f [Vec<f32>],
}

impl RoofFootprint<'_> {
    fn end(&self, i: usize) -> Vec2 {
        let next = self.corners[(i + 1) % self.corners.len()];
        self.ends.get(i).copied().unwrap_or(next)
    }
}

#[derive(Debug, Default)]
pub struct RoofOutcome {
    /// Ring walls plus the ledge below each ring, one entry per built ring.
    pub rings: Vec<MeshBuffers>,
    pub cap: MeshBuffers,
    pub diagnostics: Vec<FacadeError>,
}

pub struct RoofBuilder<'a> {
    params: &'a FacadeParams,
    outward_sign: f32,
    base_elevation: f32,
}

impl<'a> RoofBuilder<'a> {
    pub fn new(params: &'a FacadeParams, outward_sign: f32, base_elevation: f32) -> Self {
        Self {
            params,
            outward_sign,
            base_elevation,
        }
    }

    /// Footprint edge `i` in plan, densified with its wall-top breakpoints
    /// and ending at the next corner.
    fn edge_points(footprint: &RoofFootprint<'_>, i: usize) -> Vec<Vec2> {
        let n = footprint.corners.len();
        let a = footprint.corners[i];
        let b = footprint.end(i);
        let next = footprint.corners[(i + 1) % n];
        // Same parameterization as the wall below, so shared vertices match exactly.
        let frame = WallFrame::new(a, b, 1.0, 0.0);
        let mut points = vec![a];
        if let Some(breaks) = footprint.edge_breaks.get(i) {
            for &u in breaks {
                if u > 0.0 && u < frame.length {
                    points.push(frame.plan_point(u));
                }
            }
        }
        points.push(b);
        if next != b {
            points.push(next);
        }
        points
    }

    /// Build all rings that fit and the cap. `height` is the building-relative
    /// top of the walls.
    pub fn build(&self, footprint: &RoofFootprint<'_>, height: f32, rings: &[RoofRing]) -> RoofOutcome {
        let mut out = RoofOutcome::default();
        let corners = footprint.corners;
        let n = corners.len();
        if n < 3 {
            return out;
        }
        let eps = self.params.position_epsilon;
        let min_area = self.params.min_triangle_area;
        let scale = self.params.uv_scale;
        let footprint_area = signed_area(corners);

        let mut previous: Vec<Vec2> = corners.to_vec();
        let mut previous_is_footprint = true;
        let mut level = height;
        let mut inset = 0.0;

        for (k, ring) in rings.iter().enumerate() {
            let target = inset + ring.inset;
            let offset = offset_chain(corners, true, target, -self.outward_sign, self.params.miter_limit);
            let inverted = offset.iter().any(|v| v.depth < target - 1e-5);
            let current: Vec<Vec2> = offset.iter().map(|v| v.point).collect();
            let area = signed_area(&current);
            if inverted || area * footprint_area <= 0.0 || area.abs() < min_area {
                let location = format!("roof_rings[{k}]");
                warn!(
                    "{location}: inset {target:.3} m collapses the footprint, skipping it and {} ring(s) above",
                    rings.len() - k - 1
                );
                out.diagnostics.push(FacadeError::unfittable(
                    location,
                    format!("cumulative inset {target:.3} m inverts the footprint"),
                ));
                break;
            }

            let mut buffers = MeshBuffers::new();
            let y = self.base_elevation + level;
            // Ledge from the previous loop in to this ring.
            if ring.inset > eps {
                for i in 0..n {
                    let j = (i + 1) % n;
                    let mut plan = if previous_is_footprint {
                        Self::edge_points(footprint, i)
                    } else {
                        vec![previous[i], previous[j]]
                    };
                    plan.push(current[j]);
                    plan.push(current[i]);
                    let world: Vec<Vec3> = plan.iter().map(|p| lift(*p, y)).collect();
                    let uv: Vec<Vec2> = plan.iter().map(|p| *p * scale).collect();
                    buffers.push_polygon(&plan, &world, &uv, Vec3::Y, min_area);
                }
            }

            // Ring walls. When a ring stands flush on the floor below, its
            // bottom edge has to carry the breakpoints of that edge.
            let flush_on_walls = previous_is_footprint && ring.inset <= eps;
            let top = level + ring.height;
            let mut along = 0.0;
            for i in 0..n {
                let j = (i + 1) % n;
                let bottom_points = if flush_on_walls {
                    Self::edge_points(footprint, i)
                } else {
                    vec![current[i], current[j]]
                };
                let (a, b) = (current[i], current[j]);
                let run = a.distance(b);
                let d = (b - a) / run.max(f32::EPSILON);
                let normal = lift(right_perp(d) * self.outward_sign, 0.0);

                // Unroll the wall into (distance along the edge, height).
                let mut plane: Vec<Vec2> = bottom_points
                    .iter()
                    .map(|p| Vec2::new((*p - a).dot(d), level))
                    .collect();
                let mut world: Vec<Vec3> = bottom_points.iter().map(|p| lift(*p, y)).collect();
                plane.push(Vec2::new(run, top));
                world.push(lift(b, self.base_elevation + top));
                plane.push(Vec2::new(0.0, top));
                world.push(lift(a, self.base_elevation + top));
                let uv: Vec<Vec2> = plane
                    .iter()
                    .map(|p| Vec2::new(along + p.x, p.y) * scale)
                    .collect();
                buffers.push_polygon(&plane, &world, &uv, normal, min_area);
                along += run;
            }

            debug!(
                "roof ring {k}: inset {target:.3} m, {:.3}..{top:.3} m, {} triangles",
                level,
                buffers.triangle_count()
            );
            out.rings.push(buffers);
            previous = current;
            previous_is_footprint = false;
            level = top;
            inset = target;
        }

        // Cap over the last loop.
        let plan: Vec<Vec2> = if previous_is_footprint {
            (0..n)
                .flat_map(|i| {
                    let mut pts = Self::edge_points(footprint, i);
                    pts.pop();
                    pts
                })
                .collect()
        } else {
            previous
        };
        let y = self.base_elevation + level;
        let world: Vec<Vec3> = plan.iter().map(|p| lift(*p, y)).collect();
        let uv: Vec<Vec2> = plan.iter().map(|p| *p * scale).collect();
        out.cap.push_polygon(&plan, &world, &uv, Vec3::Y, min_area);
        out
    }
}
