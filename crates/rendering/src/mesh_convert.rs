//! Tagged facade buffers to bevy meshes and PBR materials.

use bevy::prelude::*;
use bevy::render::mesh::{Indices, PrimitiveTopology};
use bevy::render::render_asset::RenderAssetUsages;

use facade::{MeshBuffers, PbrMapSet, SurfaceKind};

/// Build a triangle-list mesh from one surface group.
pub fn buffers_to_mesh(buffers: &MeshBuffers) -> Mesh {
    Mesh::new(
        PrimitiveTopology::TriangleList,
        RenderAssetUsages::RENDER_WORLD | RenderAssetUsages::MAIN_WORLD,
    )
    .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, buffers.positions.clone())
    .with_inserted_attribute(Mesh::ATTRIBUTE_NORMAL, buffers.normals.clone())
    .with_inserted_attribute(Mesh::ATTRIBUTE_UV_0, buffers.uvs.clone())
    .with_inserted_indices(Indices::U32(buffers.indices.clone()))
}

/// Standard material for a map set. Textures are only loaded when an asset
/// server is available; without one the tint alone is used.
pub fn standard_material(
    set: &PbrMapSet,
    kind: SurfaceKind,
    asset_server: Option<&AssetServer>,
) -> StandardMaterial {
    let [r, g, b, a] = set.tint;
    let mut material = StandardMaterial {
        base_color: Color::srgba(r, g, b, a),
        perceptual_roughness: if kind == SurfaceKind::WindowGlass { 0.08 } else { 0.85 },
        reflectance: if kind == SurfaceKind::WindowGlass { 0.6 } else { 0.4 },
        alpha_mode: if set.alpha_blend {
            AlphaMode::Blend
        } else {
            AlphaMode::Opaque
        },
        ..default()
    };

    let Some(server) = asset_server else {
        return material;
    };
    if let Some(path) = &set.basecolor {
        material.base_color_texture = Some(server.load(path.clone()));
    }
    if let Some(path) = &set.normal_gl {
        material.normal_map_texture = Some(server.load(path.clone()));
    }
    // ARM packs occlusion in R and roughness/metallic in G/B, the layout
    // bevy reads from both slots.
    if let Some(path) = &set.arm {
        let arm: Handle<Image> = server.load(path.clone());
        material.metallic_roughness_texture = Some(arm.clone());
        material.occlusion_texture = Some(arm);
        material.perceptual_roughness = 1.0;
        material.metallic = 1.0;
    }
    material
}

#[cfg(test)]
mod tests {
    use bevy::render::mesh::VertexAttributeValues;

    use super::*;

    fn quad() -> MeshBuffers {
        let mut buffers = MeshBuffers::new();
        buffers.push_quad(
            [
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(2.0, 0.0, 0.0),
                Vec3::new(2.0, 3.0, 0.0),
                Vec3::new(0.0, 3.0, 0.0),
            ],
            [
                Vec2::new(0.0, 0.0),
                Vec2::new(2.0, 0.0),
                Vec2::new(2.0, 3.0),
                Vec2::new(0.0, 3.0),
            ],
            Vec3::Z,
            1e-7,
        );
        buffers
    }

    #[test]
    fn test_mesh_carries_every_buffer() {
        let buffers = quad();
        let mesh = buffers_to_mesh(&buffers);
        assert_eq!(mesh.count_vertices(), buffers.vertex_count());
        assert_eq!(mesh.indices().map(Indices::len), Some(buffers.indices.len()));
        match mesh.attribute(Mesh::ATTRIBUTE_UV_0) {
            Some(VertexAttributeValues::Float32x2(uvs)) => assert_eq!(uvs, &buffers.uvs),
            other => panic!("expected Float32x2 uvs, got: {other:?}"),
        }
        match mesh.attribute(Mesh::ATTRIBUTE_NORMAL) {
            Some(VertexAttributeValues::Float32x3(normals)) => {
                assert!(normals.iter().all(|n| *n == [0.0, 0.0, 1.0]));
            }
            other => panic!("expected Float32x3 normals, got: {other:?}"),
        }
    }

    #[test]
    fn test_glass_blends_and_walls_are_opaque() {
        let glass = PbrMapSet {
            alpha_blend: true,
            ..PbrMapSet::tinted([0.5, 0.6, 0.7, 0.3])
        };
        let material = standard_material(&glass, SurfaceKind::WindowGlass, None);
        assert!(matches!(material.alpha_mode, AlphaMode::Blend));
        assert!(material.base_color_texture.is_none());

        let brick = PbrMapSet::from_directory("materials", "brick_wall", "png", "png", Some("png"));
        let material = standard_material(&brick, SurfaceKind::Wall, None);
        assert!(matches!(material.alpha_mode, AlphaMode::Opaque));
        // Maps need an asset server.
        assert!(material.normal_map_texture.is_none());
    }
}
