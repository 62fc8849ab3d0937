//! Tagged output buffers: one triangle list per (material, surface kind).

use std::collections::BTreeMap;

use bevy::math::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use xxhash_rust::xxh32::Xxh32;

use crate::geometry::triangulate_polygon;
use crate::spec::MaterialId;

// ---------------------------------------------------------------------------
// SurfaceKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceKind {
    Wall,
    Reveal,
    Belt,
    RoofRing,
    RoofCap,
    WindowFrame,
    WindowMuntin,
    WindowGlass,
    WindowShade,
    WindowInterior,
}

impl SurfaceKind {
    pub const ALL: [SurfaceKind; 10] = [
        SurfaceKind::Wall,
        SurfaceKind::Reveal,
        SurfaceKind::Belt,
        SurfaceKind::RoofRing,
        SurfaceKind::RoofCap,
        SurfaceKind::WindowFrame,
        SurfaceKind::WindowMuntin,
        SurfaceKind::WindowGlass,
        SurfaceKind::WindowShade,
        SurfaceKind::WindowInterior,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SurfaceKind::Wall => "wall",
            SurfaceKind::Reveal => "reveal",
            SurfaceKind::Belt => "belt",
            SurfaceKind::RoofRing => "roof_ring",
            SurfaceKind::RoofCap => "roof_cap",
            SurfaceKind::WindowFrame => "window_frame",
            SurfaceKind::WindowMuntin => "window_muntin",
            SurfaceKind::WindowGlass => "window_glass",
            SurfaceKind::WindowShade => "window_shade",
            SurfaceKind::WindowInterior => "window_interior",
        }
    }

    /// Surfaces that belong to the opaque building shell.
    pub fn is_shell(self) -> bool {
        matches!(
            self,
            SurfaceKind::Wall | SurfaceKind::Reveal | SurfaceKind::RoofRing | SurfaceKind::RoofCap
        )
    }
}

// ---------------------------------------------------------------------------
// MeshBuffers
// ---------------------------------------------------------------------------

/// A flat triangle list. Every triangle is wound counter-clockwise when seen
/// from the side its vertex normals point to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshBuffers {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
}

impl MeshBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn position(&self, index: u32) -> Vec3 {
        Vec3::from_array(self.positions[index as usize])
    }

    pub fn push_vertex(&mut self, position: Vec3, normal: Vec3, uv: Vec2) -> u32 {
        let index = self.positions.len() as u32;
        self.positions.push(position.to_array());
        self.normals.push(normal.to_array());
        self.uvs.push(uv.to_array());
        index
    }

    /// Emit one triangle, flipping it if needed so its geometric normal
    /// agrees with `facing`. Returns `false` when it was dropped for having
    /// less than `min_area`.
    pub fn push_triangle_facing(&mut self, a: u32, b: u32, c: u32, facing: Vec3, min_area: f32) -> bool {
        let (pa, pb, pc) = (self.position(a), self.position(b), self.position(c));
        let cross = (pb - pa).cross(pc - pa);
        if cross.length() * 0.5 < min_area {
            return false;
        }
        if cross.dot(facing) >= 0.0 {
            self.indices.extend_from_slice(&[a, b, c]);
        } else {
            self.indices.extend_from_slice(&[a, c, b]);
        }
        true
    }

    /// Triangulate a planar polygon given in a 2D parameterization of its
    /// plane. `plane[i]`, `world[i]` and `uv[i]` describe the same vertex.
    pub fn push_polygon(
        &mut self,
        plane: &[Vec2],
        world: &[Vec3],
        uv: &[Vec2],
        normal: Vec3,
        min_area: f32,
    ) -> usize {
        debug_assert_eq!(plane.len(), world.len());
        debug_assert_eq!(plane.len(), uv.len());
        let triangles = triangulate_polygon(plane);
        if triangles.is_empty() {
            return 0;
        }
        let base = self.positions.len() as u32;
        for (p, t) in world.iter().zip(uv) {
            self.push_vertex(*p, normal, *t);
        }
        triangles
            .iter()
            .filter(|t| {
                self.push_triangle_facing(
                    base + t[0] as u32,
                    base + t[1] as u32,
                    base + t[2] as u32,
                    normal,
                    min_area,
                )
            })
            .count()
    }

    /// Quad `a b c d` in loop order, split along `a c`.
    pub fn push_quad(&mut self, corners: [Vec3; 4], uvs: [Vec2; 4], normal: Vec3, min_area: f32) -> usize {
        let base = self.positions.len() as u32;
        for (p, t) in corners.iter().zip(uvs) {
            self.push_vertex(*p, normal, t);
        }
        let mut emitted = 0;
        if self.push_triangle_facing(base, base + 1, base + 2, normal, min_area) {
            emitted += 1;
        }
        if self.push_triangle_facing(base, base + 2, base + 3, normal, min_area) {
            emitted += 1;
        }
        emitted
    }

    pub fn append(&mut self, other: &MeshBuffers) {
        let base = self.positions.len() as u32;
        self.positions.extend_from_slice(&other.positions);
        self.normals.extend_from_slice(&other.normals);
        self.uvs.extend_from_slice(&other.uvs);
        self.indices.extend(other.indices.iter().map(|i| i + base));
    }

    /// Iterate triangles as world-space corner triples.
    pub fn triangles(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        self.indices
            .chunks_exact(3)
            .map(|t| [self.position(t[0]), self.position(t[1]), self.position(t[2])])
    }

    fn hash_into(&self, hasher: &mut Xxh32) {
        for p in &self.positions {
            for c in p {
                hasher.update(&c.to_le_bytes());
            }
        }
        for n in &self.normals {
            for c in n {
                hasher.update(&c.to_le_bytes());
            }
        }
        for t in &self.uvs {
            for c in t {
                hasher.update(&c.to_le_bytes());
            }
        }
        for i in &self.indices {
            hasher.update(&i.to_le_bytes());
        }
    }
}

// ---------------------------------------------------------------------------
// FacadeMesh
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SurfaceKey {
    pub material: MaterialId,
    pub kind: SurfaceKind,
}

/// Compiled geometry of one building, grouped by resolved material and
/// surface kind. Groups iterate in key order, so output is deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FacadeMesh {
    pub groups: BTreeMap<SurfaceKey, MeshBuffers>,
}

impl FacadeMesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn group_mut(&mut self, material: &MaterialId, kind: SurfaceKind) -> &mut MeshBuffers {
        self.groups
            .entry(SurfaceKey {
                material: material.clone(),
                kind,
            })
            .or_default()
    }

    pub fn group(&self, material: &MaterialId, kind: SurfaceKind) -> Option<&MeshBuffers> {
        self.groups.get(&SurfaceKey {
            material: material.clone(),
            kind,
        })
    }

    /// Merge `other` into this mesh group by group.
    pub fn merge(&mut self, other: FacadeMesh) {
        for (key, buffers) in other.groups {
            match self.groups.get_mut(&key) {
                Some(existing) => existing.append(&buffers),
                None => {
                    self.groups.insert(key, buffers);
                }
            }
        }
    }

    /// Drop groups that ended up without triangles.
    pub fn prune_empty(&mut self) {
        self.groups.retain(|_, buffers| !buffers.is_empty());
    }

    pub fn by_kind(&self, kind: SurfaceKind) -> impl Iterator<Item = (&MaterialId, &MeshBuffers)> {
        self.groups
            .iter()
            .filter(move |(key, _)| key.kind == kind)
            .map(|(key, buffers)| (&key.material, buffers))
    }

    pub fn triangle_count(&self) -> usize {
        self.groups.values().map(MeshBuffers::triangle_count).sum()
    }

    pub fn vertex_count(&self) -> usize {
        self.groups.values().map(MeshBuffers::vertex_count).sum()
    }

    pub fn kind_triangle_count(&self, kind: SurfaceKind) -> usize {
        self.by_kind(kind).map(|(_, b)| b.triangle_count()).sum()
    }

    /// Stable hash over every key and buffer, used to check that rebuilds
    /// of unchanged input are bit-identical.
    pub fn fingerprint(&self) -> u32 {
        let mut hasher = Xxh32::new(0);
        for (key, buffers) in &self.groups {
            hasher.update(key.material.as_str().as_bytes());
            hasher.update(key.kind.as_str().as_bytes());
            hasher.update(&(buffers.indices.len() as u64).to_le_bytes());
            buffers.hash_into(&mut hasher);
        }
        hasher.digest()
    }
}
