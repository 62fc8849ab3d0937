//! Bevy host integration for the facade compiler.
//!
//! [`FacadeRenderPlugin`] watches [`FacadeSource`], recompiles it off the main
//! thread and swaps the facade's surface entities when a compile for the
//! newest edit is ready.

use bevy::prelude::*;

pub mod mesh_convert;
pub mod rebuild;
pub mod source;
pub mod surfaces;


pub use rebuild::{FacadeDiagnostics, PublishedBuild, PublishedFacade, RebuildQueue, RebuildTracker};
pub use source::{FacadeSnapshot, FacadeSource};
pub use surfaces::FacadeSurface;

/// Ordering of the rebuild systems inside `Update`.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct FacadeRebuildSet;

pub struct FacadeRenderPlugin;

impl Plugin for FacadeRenderPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<FacadeSource>()
            .init_resource::<RebuildQueue>()
            .init_resource::<PublishedFacade>()
            .init_resource::<FacadeDiagnostics>()
            .add_systems(
                Update,
                (
                    rebuild::dispatch_rebuilds,
                    rebuild::collect_rebuilds,
                    surfaces::sync_surfaces,
                )
                    .chain()
                    .in_set(FacadeRebuildSet),
            );
    }
}
