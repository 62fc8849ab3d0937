//! Plan-space polygon helpers and the wall-local coordinate frame.

mod offset;
mod triangulate;

pub use offset::{offset_chain, OffsetVertex};
pub use triangulate::triangulate_polygon;

use bevy::math::{Vec2, Vec3};

/// Signed area of a closed loop. Positive for counter-clockwise loops in (x, z).
pub fn signed_area(points: &[Vec2]) -> f32 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut acc = 0.0;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        acc += a.x * b.y - b.x * a.y;
    }
    acc * 0.5
}

/// Even-odd point-in-polygon test. Points on the boundary may go either way.
pub fn point_in_polygon(p: Vec2, polygon: &[Vec2]) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let a = polygon[i];
        let b = polygon[j];
        if (a.y > p.y) != (b.y > p.y) {
            let x = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if p.x < x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Parameter `t` in `[0, 1]` along `p -> q` where it crosses segment `a -> b`.
pub fn segment_crossing(p: Vec2, q: Vec2, a: Vec2, b: Vec2) -> Option<f32> {
    let d1 = q - p;
    let d2 = b - a;
    let cross = d1.perp_dot(d2);
    if cross.abs() < 1e-9 {
        return None; // parallel or coincident
    }
    let d = a - p;
    let t = d.perp_dot(d2) / cross;
    let u = d.perp_dot(d1) / cross;
    if (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u) {
        Some(t)
    } else {
        None
    }
}

/// Smallest `t` along `p -> q` at which the segment touches the polygon boundary.
pub fn first_boundary_crossing(p: Vec2, q: Vec2, polygon: &[Vec2]) -> Option<f32> {
    let n = polygon.len();
    (0..n)
        .filter_map(|i| segment_crossing(p, q, polygon[i], polygon[(i + 1) % n]))
        .min_by(f32::total_cmp)
}

/// Right-hand perpendicular in plan. Outward for counter-clockwise footprints.
pub fn right_perp(d: Vec2) -> Vec2 {
    Vec2::new(d.y, -d.x)
}

/// Lift a plan point to world space at height `y`.
pub fn lift(p: Vec2, y: f32) -> Vec3 {
    Vec3::new(p.x, y, p.y)
}

/// Wall-local frame of one span: `u` runs along the span, `v` up from the
/// base elevation, `normal` points out of the building.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallFrame {
    pub start: Vec2,
    pub end: Vec2,
    pub direction: Vec2,
    /// Outward normal in plan.
    pub plan_normal: Vec2,
    pub length: f32,
    pub base_elevation: f32,
}

impl WallFrame {
    pub fn new(start: Vec2, end: Vec2, outward_sign: f32, base_elevation: f32) -> Self {
        let direction = (end - start).normalize_or_zero();
        Self {
            start,
            end,
            direction,
            plan_normal: right_perp(direction) * outward_sign,
            length: start.distance(end),
            base_elevation,
        }
    }

    pub fn u_axis(&self) -> Vec3 {
        lift(self.direction, 0.0)
    }

    pub fn normal(&self) -> Vec3 {
        lift(self.plan_normal, 0.0)
    }

    /// Plan position at `u`. The span ends are returned exactly so adjacent
    /// spans share bit-identical corner vertices.
    pub fn plan_point(&self, u: f32) -> Vec2 {
        if u <= 0.0 {
            self.start
        } else if u >= self.length {
            self.end
        } else {
            self.start + self.direction * u
        }
    }

    pub fn point(&self, u: f32, v: f32) -> Vec3 {
        lift(self.plan_point(u), self.base_elevation + v)
    }

    /// World position of a wall-local point pushed `depth` into the wall.
    pub fn inset_point(&self, u: f32, v: f32, depth: f32) -> Vec3 {
        self.point(u, v) - self.normal() * depth
    }

    /// World-space direction of a wall-local vector.
    pub fn vector(&self, du: f32, dv: f32) -> Vec3 {
        self.u_axis() * du + Vec3::Y * dv
    }
}
