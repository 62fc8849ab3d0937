use bevy::math::Vec2;

use super::{build_reveal, Opening};
use crate::config::FacadeParams;
use crate::geometry::WallFrame;
use crate::layout::RowLayout;
use crate::mesh::{FacadeMesh, SurfaceKind};
use crate::spec::MaterialId;

/// Everything needed to build the wall of one span on one floor.
pub struct RowWalls<'r> {
    pub frame: &'r WallFrame,
    pub layout: &'r RowLayout,
    /// One per window of `layout`, same order.
    pub openings: &'r [Opening],
    /// Building-relative bottom and top of the floor.
    pub v0: f32,
    pub v1: f32,
    /// Sorted `u` positions every surface touching the bottom (top) slice
    /// line must carry as vertices.
    pub bottom_breaks: &'r [f32],
    pub top_breaks: &'r [f32],
    /// Wall and reveal material per strip of `layout`, same order.
    pub wall_materials: &'r [MaterialId],
    pub reveal_materials: &'r [MaterialId],
}

/// Push `p` unless it repeats the previous point.
fn push_unique(points: &mut Vec<Vec2>, p: Vec2) {
    if points.last() != Some(&p) {
        points.push(p);
    }
}

/// Points on the line `v` at every break strictly between `a` and `b`,
/// in the direction from `a` to `b`.
fn breaks_between(points: &mut Vec<Vec2>, breaks: &[f32], a: f32, b: f32, v: f32) {
    if a <= b {
        for &u in breaks.iter().filter(|&&u| u > a && u < b) {
            push_unique(points, Vec2::new(u, v));
        }
    } else {
        for &u in breaks.iter().rev().filter(|&&u| u < a && u > b) {
            push_unique(points, Vec2::new(u, v));
        }
    }
}

fn close_loop(mut points: Vec<Vec2>) -> Vec<Vec2> {
    while points.len() > 1 && points.last() == points.first() {
        points.pop();
    }
    points
}

/// Emit one wall slab polygon given in `(u, v)`.
fn emit_slab(
    mesh: &mut FacadeMesh,
    frame: &WallFrame,
    material: &MaterialId,
    slab: &[Vec2],
    params: &FacadeParams,
) -> usize {
    if slab.len() < 3 {
        return 0;
    }
    let world: Vec<_> = slab.iter().map(|p| frame.point(p.x, p.y)).collect();
    let uv: Vec<_> = slab.iter().map(|p| *p * params.uv_scale).collect();
    mesh.group_mut(material, SurfaceKind::Wall)
        .push_polygon(slab, &world, &uv, frame.normal(), params.min_triangle_area)
}

/// Triangulate the wall surface of one row strip by strip, cutting each
/// window's opening and adding its reveal. Returns the number of wall
/// triangles emitted.
pub fn build_row_walls(row: &RowWalls<'_>, params: &FacadeParams, mesh: &mut FacadeMesh) -> usize {
    let (v0, v1) = (row.v0, row.v1);
    let mut triangles = 0;

    for (i, strip) in row.layout.strips.iter().enumerate() {
        let (s0, s1) = (strip.start, strip.end);
        let Some(wall_material) = row.wall_materials.get(i) else {
            continue;
        };
        let opening = strip.window.and_then(|w| row.openings.get(w));

        let Some(opening) = opening else {
            let mut slab = Vec::new();
            push_unique(&mut slab, Vec2::new(s0, v0));
            breaks_between(&mut slab, row.bottom_breaks, s0, s1, v0);
            push_unique(&mut slab, Vec2::new(s1, v0));
            push_unique(&mut slab, Vec2::new(s1, v1));
            breaks_between(&mut slab, row.top_breaks, s1, s0, v1);
            push_unique(&mut slab, Vec2::new(s0, v1));
            triangles += emit_slab(mesh, row.frame, wall_material, &close_loop(slab), params);
            continue;
        };

        let o = &opening.outline;
        let (l, r) = (o.left, o.right);

        // Left slab: strip start to the left jamb, full floor height.
        let mut left = Vec::new();
        push_unique(&mut left, Vec2::new(s0, v0));
        breaks_between(&mut left, row.bottom_breaks, s0, l, v0);
        push_unique(&mut left, Vec2::new(l, v0));
        push_unique(&mut left, Vec2::new(l, o.sill));
        push_unique(&mut left, Vec2::new(l, o.spring));
        push_unique(&mut left, Vec2::new(l, v1));
        breaks_between(&mut left, row.top_breaks, l, s0, v1);
        push_unique(&mut left, Vec2::new(s0, v1));
        triangles += emit_slab(mesh, row.frame, wall_material, &close_loop(left), params);

        // Right slab: right jamb to the strip end.
        let mut right = Vec::new();
        push_unique(&mut right, Vec2::new(r, v0));
        breaks_between(&mut right, row.bottom_breaks, r, s1, v0);
        push_unique(&mut right, Vec2::new(s1, v0));
        push_unique(&mut right, Vec2::new(s1, v1));
        breaks_between(&mut right, row.top_breaks, s1, r, v1);
        push_unique(&mut right, Vec2::new(r, v1));
        push_unique(&mut right, Vec2::new(r, o.spring));
        push_unique(&mut right, Vec2::new(r, o.sill));
        triangles += emit_slab(mesh, row.frame, wall_material, &close_loop(right), params);

        // Below the sill; doors have none.
        if !o.door {
            let mut below = Vec::new();
            push_unique(&mut below, Vec2::new(l, v0));
            breaks_between(&mut below, row.bottom_breaks, l, r, v0);
            push_unique(&mut below, Vec2::new(r, v0));
            push_unique(&mut below, Vec2::new(r, o.sill));
            push_unique(&mut below, Vec2::new(l, o.sill));
            triangles += emit_slab(mesh, row.frame, wall_material, &close_loop(below), params);
        }

        // Above the head, bounded below by the arch chain.
        let mut above = Vec::new();
        for p in o.upper.iter().rev() {
            push_unique(&mut above, *p);
        }
        push_unique(&mut above, Vec2::new(r, v1));
        breaks_between(&mut above, row.top_breaks, r, l, v1);
        push_unique(&mut above, Vec2::new(l, v1));
        triangles += emit_slab(mesh, row.frame, wall_material, &close_loop(above), params);

        if opening.has_reveal() {
            let reveal_material = row.reveal_materials.get(i).unwrap_or(wall_material);
            build_reveal(
                mesh.group_mut(reveal_material, SurfaceKind::Reveal),
                row.frame,
                opening,
                params,
            );
        }
    }
    triangles
}
