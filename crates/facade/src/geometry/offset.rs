//! Miter-joined offsetting of plan chains.
//!
//! Used outward for belts and inward for roof rings and window frames. At
//! corners where the two offset edges converge the depth is clamped to the
//! corner's local limit so the offset chain never folds over itself.

use bevy::math::Vec2;

use super::right_perp;

/// One vertex of an offset chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OffsetVertex {
    /// The source vertex.
    pub base: Vec2,
    /// The offset position.
    pub point: Vec2,
    /// Offset depth actually applied at this vertex after clamping.
    pub depth: f32,
}

/// Offset a chain of points by `depth` toward `side * right_perp(edge)`.
///
/// `side = 1.0` is the right-hand side (outward for a counter-clockwise
/// footprint), `side = -1.0` the left. `closed` joins the last point back to
/// the first. Miter lengths are capped at `miter_limit * depth`.
pub fn offset_chain(
    points: &[Vec2],
    closed: bool,
    depth: f32,
    side: f32,
    miter_limit: f32,
) -> Vec<OffsetVertex> {
    let n = points.len();
    if n < 2 {
        return points
            .iter()
            .map(|&p| OffsetVertex {
                base: p,
                point: p,
                depth: 0.0,
            })
            .collect();
    }
    let edge_count = if closed { n } else { n - 1 };
    let edge = |i: usize| -> (Vec2, f32) {
        let a = points[i % n];
        let b = points[(i + 1) % n];
        ((b - a).normalize_or_zero(), a.distance(b))
    };

    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let incoming = if i > 0 {
            Some(edge(i - 1))
        } else if closed {
            Some(edge(n - 1))
        } else {
            None
        };
        let outgoing = if i < edge_count { Some(edge(i)) } else { None };

        let p = points[i];
        let vertex = match (incoming, outgoing) {
            (Some((d_in, len_in)), Some((d_out, len_out))) => {
                join(p, d_in, len_in, d_out, len_out, depth, side, miter_limit)
            }
            (Some((d, _)), None) | (None, Some((d, _))) => OffsetVertex {
                base: p,
                point: p + right_perp(d) * side * depth,
                depth,
            },
            (None, None) => OffsetVertex {
                base: p,
                point: p,
                depth: 0.0,
            },
        };
        out.push(vertex);
    }
    out
}

#[allow(clippy::too_many_arguments)]
fn join(
    p: Vec2,
    d_in: Vec2,
    len_in: f32,
    d_out: Vec2,
    len_out: f32,
    depth: f32,
    side: f32,
    miter_limit: f32,
) -> OffsetVertex {
    let n_in = right_perp(d_in) * side;
    let n_out = right_perp(d_out) * side;
    let m = (n_in + n_out).normalize_or_zero();
    if m == Vec2::ZERO {
        // Chain doubles back on itself; no usable miter.
        return OffsetVertex {
            base: p,
            point: p,
            depth: 0.0,
        };
    }

    let cos_half = m.dot(n_in).max(1e-4);
    let mut local_depth = depth;

    // Offset edges converge when the chain turns toward the offset side.
    let converging = side * d_in.perp_dot(d_out) < 0.0;
    if converging {
        let turn = d_in.dot(d_out).clamp(-1.0, 1.0).acos();
        let tan_half = (turn * 0.5).tan();
        if tan_half > 1e-6 {
            let limit = 0.5 * len_in.min(len_out) / tan_half;
            local_depth = local_depth.min(limit);
        }
    }

    let scale = (1.0 / cos_half).min(miter_limit.max(1.0));
    OffsetVertex {
        base: p,
        point: p + m * local_depth * scale,
        depth: local_depth,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(size: f32) -> Vec<Vec2> {
        vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(size, 0.0),
            Vec2::new(size, size),
            Vec2::new(0.0, size),
        ]
    }

    #[test]
    fn test_outward_square_offset() {
        let out = offset_chain(&square(10.0), true, 1.0, 1.0, 4.0);
        assert_eq!(out.len(), 4);
        assert!((out[0].point - Vec2::new(-1.0, -1.0)).length() < 1e-5, "got {:?}", out[0]);
        assert!((out[2].point - Vec2::new(11.0, 11.0)).length() < 1e-5);
        assert!(out.iter().all(|v| (v.depth - 1.0).abs() < 1e-6));
    }

    #[test]
    fn test_inward_square_offset() {
        let out = offset_chain(&square(10.0), true, 1.0, -1.0, 4.0);
        assert!((out[0].point - Vec2::new(1.0, 1.0)).length() < 1e-5);
        assert!((out[2].point - Vec2::new(9.0, 9.0)).length() < 1e-5);
    }

    #[test]
    fn test_concave_corner_is_clamped() {
        // L-shaped footprint (CCW); the reflex corner at (1, 1) sits between
        // two 3 m edges, so a right-angle turn allows at most 1.5 m.
        let pts = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(4.0, 0.0),
            Vec2::new(4.0, 1.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(1.0, 4.0),
            Vec2::new(0.0, 4.0),
        ];
        let out = offset_chain(&pts, true, 2.0, 1.0, 4.0);
        let reflex = out[3];
        assert!(reflex.depth < 2.0, "got {:?}", reflex);
        assert!((reflex.depth - 1.5).abs() < 1e-4, "got {:?}", reflex);
        // Convex corners keep the full depth.
        assert!((out[0].depth - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_open_chain_ends_use_edge_normal() {
        let pts = vec![Vec2::new(0.0, 0.0), Vec2::new(5.0, 0.0), Vec2::new(5.0, 5.0)];
        let out = offset_chain(&pts, false, 0.5, 1.0, 4.0);
        assert!((out[0].point - Vec2::new(0.0, -0.5)).length() < 1e-6);
        assert!((out[2].point - Vec2::new(5.5, 5.0)).length() < 1e-6);
    }

    #[test]
    fn test_miter_limit_caps_sharp_corners() {
        let pts = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 0.0),
            Vec2::new(0.0, 0.5),
        ];
        let out = offset_chain(&pts, true, 1.0, 1.0, 2.0);
        for v in &out {
            assert!((v.point - v.base).length() <= 2.0 + 1e-4, "got {:?}", v);
        }
    }
}
