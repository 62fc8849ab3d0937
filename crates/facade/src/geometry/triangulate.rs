//! Ear clipping for simple polygons that keeps every boundary vertex.
//!
//! Collinear boundary vertices are never filtered out: they are shared with a
//! neighbouring surface and dropping them would leave a T-junction crack.

use bevy::log::debug;
use bevy::math::Vec2;

use super::signed_area;

/// Twice-area threshold below which a corner counts as flat.
const FLAT_EPS: f32 = 1e-9;

fn area2(a: Vec2, b: Vec2, c: Vec2) -> f32 {
    (b - a).perp_dot(c - a)
}

/// Inclusive containment: points on the triangle's edges count as inside.
fn in_triangle(p: Vec2, a: Vec2, b: Vec2, c: Vec2) -> bool {
    area2(a, b, p) >= -FLAT_EPS && area2(b, c, p) >= -FLAT_EPS && area2(c, a, p) >= -FLAT_EPS
}

fn is_ear(points: &[Vec2], ring: &[usize], i: usize) -> bool {
    let m = ring.len();
    let (ia, ib, ic) = (ring[(i + m - 1) % m], ring[i], ring[(i + 1) % m]);
    let (a, b, c) = (points[ia], points[ib], points[ic]);
    if area2(a, b, c) <= FLAT_EPS {
        return false;
    }
    ring.iter().all(|&j| {
        j == ia
            || j == ib
            || j == ic
            || points[j] == a
            || points[j] == b
            || points[j] == c
            || !in_triangle(points[j], a, b, c)
    })
}

/// Triangulate a simple polygon. Triangles are returned as index triples
/// wound counter-clockwise in the plane regardless of the input winding.
pub fn triangulate_polygon(points: &[Vec2]) -> Vec<[usize; 3]> {
    let n = points.len();
    if n < 3 {
        return Vec::new();
    }
    let mut ring: Vec<usize> = if signed_area(points) >= 0.0 {
        (0..n).collect()
    } else {
        (0..n).rev().collect()
    };

    let mut triangles = Vec::with_capacity(n - 2);
    while ring.len() > 3 {
        let m = ring.len();
        let ear = (0..m).find(|&i| is_ear(points, &ring, i)).or_else(|| {
            // No clean ear: clip the most convex corner so the loop still
            // terminates on near-degenerate input.
            debug!("triangulate_polygon: no clean ear among {m} vertices");
            (0..m)
                .map(|i| {
                    let a = points[ring[(i + m - 1) % m]];
                    let b = points[ring[i]];
                    let c = points[ring[(i + 1) % m]];
                    (i, area2(a, b, c))
                })
                .filter(|(_, area)| *area > FLAT_EPS)
                .max_by(|x, y| x.1.total_cmp(&y.1))
                .map(|(i, _)| i)
        });
        let Some(i) = ear else {
            break; // only flat corners remain
        };
        let tri = [ring[(i + m - 1) % m], ring[i], ring[(i + 1) % m]];
        triangles.push(tri);
        ring.remove(i);
    }

    if ring.len() == 3 && area2(points[ring[0]], points[ring[1]], points[ring[2]]) > FLAT_EPS {
        triangles.push([ring[0], ring[1], ring[2]]);
    }
    triangles
}
