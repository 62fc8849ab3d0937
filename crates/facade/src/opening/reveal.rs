use bevy::math::Vec2;

use super::Opening;
use crate::config::FacadeParams;
use crate::geometry::WallFrame;
use crate::mesh::MeshBuffers;

/// Extrude an opening's boundary into the wall by its inset: one quad per
/// boundary edge, normals facing into the opening. UVs are
/// `(arc length, depth)` in meters, so reveal texel density matches the wall.
/// Doors get no sill quad. Returns the number of quads emitted.
pub fn build_reveal(out: &mut MeshBuffers, frame: &WallFrame, opening: &Opening, params: &FacadeParams) -> usize {
    let boundary = opening.outline.boundary();
    let n = boundary.len();
    if n < 3 || opening.inset <= 0.0 {
        return 0;
    }
    let depth = opening.inset;
    let scale = params.uv_scale;
    let sill = opening.outline.sill;

    let mut quads = 0;
    let mut along = 0.0;
    for i in 0..n {
        let a = boundary[i];
        let b = boundary[(i + 1) % n];
        let length = a.distance(b);
        let (s0, s1) = (along, along + length);
        along = s1;

        if opening.outline.door && a.y == sill && b.y == sill {
            continue;
        }
        let t = (b - a) / length.max(f32::EPSILON);
        // The boundary is counter-clockwise, so the opening lies to the left.
        let inward = Vec2::new(-t.y, t.x);
        let normal = frame.vector(inward.x, inward.y);

        let corners = [
            frame.point(a.x, a.y),
            frame.point(b.x, b.y),
            frame.inset_point(b.x, b.y, depth),
            frame.inset_point(a.x, a.y, depth),
        ];
        let uvs = [
            Vec2::new(s0, 0.0) * scale,
            Vec2::new(s1, 0.0) * scale,
            Vec2::new(s1, depth) * scale,
            Vec2::new(s0, depth) * scale,
        ];
        if out.push_quad(corners, uvs, normal, params.min_triangle_area) > 0 {
            quads += 1;
        }
    }
    quads
}
