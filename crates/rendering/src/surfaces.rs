//! One entity per published surface group.

use bevy::prelude::*;

use facade::material::MaterialResolver;
use facade::{PbrMapSet, SurfaceKey};

use crate::mesh_convert::{buffers_to_mesh, standard_material};
use crate::rebuild::PublishedFacade;

/// Marks an entity that renders one `(material, surface kind)` group.
#[derive(Component, Debug, Clone, PartialEq, Eq)]
pub struct FacadeSurface {
    pub key: SurfaceKey,
    pub generation: u64,
}

/// Replace every surface entity with the groups of the published facade.
/// Old and new entities are swapped within this one run.
pub fn sync_surfaces(
    mut commands: Commands,
    published: Res<PublishedFacade>,
    existing: Query<Entity, With<FacadeSurface>>,
    meshes: Option<ResMut<Assets<Mesh>>>,
    materials: Option<ResMut<Assets<StandardMaterial>>>,
    asset_server: Option<Res<AssetServer>>,
) {
    if !published.is_changed() {
        return;
    }
    for entity in &existing {
        commands.entity(entity).despawn_recursive();
    }
    let Some(build) = published.current.as_ref() else {
        return;
    };
    // Headless hosts keep the bookkeeping entities without render assets.
    let mut render_assets = meshes.zip(materials);
    let resolver = MaterialResolver::new(&build.snapshot.spec, &build.snapshot.registry);
    let fallback = PbrMapSet::default();

    for (key, buffers) in &build.output.mesh.groups {
        let surface = FacadeSurface {
            key: key.clone(),
            generation: build.generation,
        };
        let Some((meshes, materials)) = render_assets.as_mut() else {
            commands.spawn((surface, Transform::IDENTITY));
            continue;
        };

        let set = resolver.get(&key.material).unwrap_or_else(|| {
            warn!("facade material '{}' is not registered, using plain grey", key.material);
            &fallback
        });
        let mut mesh = buffers_to_mesh(buffers);
        if set.normal_gl.is_some() {
            if let Err(err) = mesh.generate_tangents() {
                warn!("facade surface {}/{}: no tangents: {err}", key.material, key.kind.as_str());
            }
        }
        let material = standard_material(set, key.kind, asset_server.as_deref());
        commands.spawn((
            Mesh3d(meshes.add(mesh)),
            MeshMaterial3d(materials.add(material)),
            Transform::IDENTITY,
            surface,
        ));
    }
    debug!(
        "facade generation {}: {} surface entities",
        build.generation,
        build.output.mesh.groups.len()
    );
}
