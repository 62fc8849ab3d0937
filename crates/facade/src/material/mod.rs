//! Material definitions, the global registry, and per-surface resolution.

mod registry;
mod resolver;

#[cfg(test)]
mod tests;

pub use registry::{ManifestEntry, ManifestError, MaterialManifest, MaterialRegistry};
pub use resolver::{BayMaterials, BayResolution, MaterialResolver};

use serde::{Deserialize, Serialize};

use crate::spec::{BayAddress, MaterialId};

fn default_true() -> bool {
    true
}

fn default_tint() -> [f32; 4] {
    [1.0, 1.0, 1.0, 1.0]
}

/// Texture set of one PBR material. Paths are asset-relative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PbrMapSet {
    #[serde(default)]
    pub basecolor: Option<String>,
    /// OpenGL-convention (Y+) normal map.
    #[serde(default)]
    pub normal_gl: Option<String>,
    /// Packed ambient occlusion (R), roughness (G), metallic (B).
    #[serde(default)]
    pub arm: Option<String>,
    /// Whether the material is meant for vertical wall surfaces.
    #[serde(default = "default_true")]
    pub is_wall: bool,
    /// Multiplied with the base color map; the whole color when there is none.
    #[serde(default = "default_tint")]
    pub tint: [f32; 4],
    #[serde(default)]
    pub alpha_blend: bool,
}

impl Default for PbrMapSet {
    fn default() -> Self {
        Self {
            basecolor: None,
            normal_gl: None,
            arm: None,
            is_wall: true,
            tint: default_tint(),
            alpha_blend: false,
        }
    }
}

impl PbrMapSet {
    pub fn tinted(tint: [f32; 4]) -> Self {
        Self {
            tint,
            ..Default::default()
        }
    }

    /// The layout the material importer writes: `<root>/<slug>/basecolor.<ext>`
    /// and siblings.
    pub fn from_directory(root: &str, slug: &str, base_ext: &str, normal_ext: &str, arm_ext: Option<&str>) -> Self {
        let dir = if root.is_empty() {
            slug.to_string()
        } else {
            format!("{}/{slug}", root.trim_end_matches('/'))
        };
        Self {
            basecolor: Some(format!("{dir}/basecolor.{base_ext}")),
            normal_gl: Some(format!("{dir}/normal_gl.{normal_ext}")),
            arm: arm_ext.map(|ext| format!("{dir}/arm.{ext}")),
            is_wall: is_wall_slug(slug),
            ..Default::default()
        }
    }
}

/// Classify a material slug as wall-suitable from its name.
///
/// Ground surfaces only count when they name a wall explicitly
/// (`"roof_tiles"` no, `"tiles_wall"` yes); grass never does.
pub fn is_wall_slug(slug: &str) -> bool {
    const SURFACE: [&str; 9] = [
        "asphalt", "crosswalk", "paver", "paving", "terrain", "coast", "rocks", "roof", "tiles",
    ];
    const STRONG_WALL: [&str; 2] = ["wall", "cladding"];
    const WALLISH: [&str; 8] = [
        "brick", "plaster", "stone", "concrete", "metal", "iron", "shutter", "plate",
    ];

    let s = slug.to_lowercase();
    if s.contains("grass") {
        return false;
    }
    if SURFACE.iter().any(|k| s.contains(k)) {
        return STRONG_WALL.iter().any(|k| s.contains(k));
    }
    WALLISH.iter().any(|k| s.contains(k))
}

/// Where a resolved material came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MaterialSource {
    /// The bay's own override, or its master's when the bay links.
    BayOverride { master: BayAddress },
    LayerDefault,
    /// Set on the element itself (belt, roof ring, window layer).
    Element,
    WindowDefinition,
    BuildingDefault,
    GlobalFallback,
}

/// A resolved material id and how it was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaterialRef {
    pub id: MaterialId,
    pub source: MaterialSource,
}

impl MaterialRef {
    pub fn new(id: MaterialId, source: MaterialSource) -> Self {
        Self { id, source }
    }
}
