//! Procedural building facades: compiles a layered building spec and its
//! placement into watertight, UV-mapped geometry grouped by material and
//! surface kind, plus a report of what was placed, skipped and resolved.

pub mod belt;
pub mod compiler;
pub mod config;
pub mod error;
pub mod geometry;
pub mod layout;
pub mod material;
pub mod mesh;
pub mod opening;
pub mod placement;
pub mod roof;
pub mod span_merge;
pub mod spec;
pub mod window_layers;

pub use compiler::{compile, CompileJob, CompileOutput, CompileReport};
pub use config::FacadeParams;
pub use error::FacadeError;
pub use material::{MaterialRegistry, PbrMapSet};
pub use mesh::{FacadeMesh, MeshBuffers, SurfaceKey, SurfaceKind};
pub use placement::PlacementContext;
pub use spec::{BuildingSpec, MaterialId};
