use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use bevy::log::warn;
use serde::{Deserialize, Serialize};

use super::PbrMapSet;
use crate::mesh::SurfaceKind;
use crate::spec::MaterialId;

/// Highest `_manifest.json` version this build understands.
pub const MANIFEST_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Importer manifest
// ---------------------------------------------------------------------------

/// `_manifest.json` as written by the PBR material importer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialManifest {
    pub version: u32,
    #[serde(default)]
    pub failures: u32,
    #[serde(default)]
    pub materials: Vec<ManifestEntry>,
}

/// One imported material. Map fields hold the archive member the map was
/// extracted from; only their extension matters once imported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub slug: String,
    #[serde(default)]
    pub zip: Option<String>,
    #[serde(default)]
    pub is_wall: Option<bool>,
    #[serde(default)]
    pub basecolor: Option<String>,
    #[serde(default)]
    pub normal_gl: Option<String>,
    #[serde(default)]
    pub arm: Option<String>,
    #[serde(default)]
    pub extra_files: Vec<String>,
}

fn extension_of(member: &str) -> Option<String> {
    Path::new(member)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

impl ManifestEntry {
    /// Map set under `root/<slug>/`, or `None` when a required map is missing.
    pub fn map_set(&self, root: &str) -> Option<PbrMapSet> {
        let base = self.basecolor.as_deref()?;
        let normal = self.normal_gl.as_deref()?;
        let base_ext = extension_of(base).unwrap_or_else(|| "jpg".to_string());
        let normal_ext = extension_of(normal).unwrap_or_else(|| "jpg".to_string());
        let arm_ext = self
            .arm
            .as_deref()
            .map(|arm| extension_of(arm).unwrap_or_else(|| "jpg".to_string()));
        let mut set = PbrMapSet::from_directory(root, &self.slug, &base_ext, &normal_ext, arm_ext.as_deref());
        if let Some(is_wall) = self.is_wall {
            set.is_wall = is_wall;
        }
        Some(set)
    }
}

#[derive(Debug)]
pub enum ManifestError {
    Parse(serde_json::Error),
    VersionMismatch { expected_max: u32, found: u32 },
}

impl fmt::Display for ManifestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManifestError::Parse(e) => write!(f, "Manifest parse error: {e}"),
            ManifestError::VersionMismatch {
                expected_max,
                found,
            } => write!(
                f,
                "Version mismatch: manifest is v{found}, but this build only supports up to v{expected_max}"
            ),
        }
    }
}

impl std::error::Error for ManifestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ManifestError::Parse(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ManifestError {
    fn from(e: serde_json::Error) -> Self {
        ManifestError::Parse(e)
    }
}

// ---------------------------------------------------------------------------
// MaterialRegistry
// ---------------------------------------------------------------------------

/// Global id -> material table shared by every building, plus the fallbacks
/// used when nothing more specific resolves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialRegistry {
    pub materials: BTreeMap<MaterialId, PbrMapSet>,
    /// Per-surface-kind fallbacks, consulted before the registry-wide one.
    #[serde(default)]
    pub fallbacks: BTreeMap<SurfaceKind, MaterialId>,
    pub global_fallback: MaterialId,
}

impl Default for MaterialRegistry {
    fn default() -> Self {
        Self::with_builtin_fallbacks()
    }
}

impl MaterialRegistry {
    /// Empty registry whose only entry is `global_fallback`.
    pub fn new(global_fallback: MaterialId) -> Self {
        let mut materials = BTreeMap::new();
        materials.insert(global_fallback.clone(), PbrMapSet::default());
        Self {
            materials,
            fallbacks: BTreeMap::new(),
            global_fallback,
        }
    }

    /// Untextured fallbacks for every surface kind.
    pub fn with_builtin_fallbacks() -> Self {
        let mut registry = Self::new(MaterialId::from("builtin/wall"));
        let builtins: [(SurfaceKind, &str, PbrMapSet); 6] = [
            (SurfaceKind::Belt, "builtin/trim", PbrMapSet::tinted([0.82, 0.80, 0.76, 1.0])),
            (SurfaceKind::RoofCap, "builtin/roof", PbrMapSet {
                is_wall: false,
                ..PbrMapSet::tinted([0.35, 0.35, 0.37, 1.0])
            }),
            (SurfaceKind::WindowFrame, "builtin/frame", PbrMapSet::tinted([0.92, 0.92, 0.90, 1.0])),
            (SurfaceKind::WindowGlass, "builtin/glass", PbrMapSet {
                alpha_blend: true,
                is_wall: false,
                ..PbrMapSet::tinted([0.55, 0.65, 0.72, 0.35])
            }),
            (SurfaceKind::WindowShade, "builtin/shade", PbrMapSet::tinted([0.86, 0.82, 0.70, 1.0])),
            (SurfaceKind::WindowInterior, "builtin/interior", PbrMapSet {
                is_wall: false,
                ..PbrMapSet::tinted([0.08, 0.08, 0.09, 1.0])
            }),
        ];
        for (kind, id, set) in builtins {
            let id = MaterialId::from(id);
            registry.materials.insert(id.clone(), set);
            registry.fallbacks.insert(kind, id);
        }
        // Muntins share the frame finish.
        registry
            .fallbacks
            .insert(SurfaceKind::WindowMuntin, MaterialId::from("builtin/frame"));
        registry
    }

    /// Builtin fallbacks plus every importable entry of a `_manifest.json`
    /// whose maps live under `root`.
    pub fn from_manifest_json(json: &str, root: &str) -> Result<Self, ManifestError> {
        let manifest: MaterialManifest = serde_json::from_str(json)?;
        if manifest.version > MANIFEST_VERSION {
            return Err(ManifestError::VersionMismatch {
                expected_max: MANIFEST_VERSION,
                found: manifest.version,
            });
        }
        let mut registry = Self::with_builtin_fallbacks();
        for entry in &manifest.materials {
            match entry.map_set(root) {
                Some(set) => {
                    registry.insert(MaterialId::new(entry.slug.clone()), set);
                }
                None => warn!(
                    "material manifest: '{}' is missing a base color or normal map, skipped",
                    entry.slug
                ),
            }
        }
        Ok(registry)
    }

    pub fn insert(&mut self, id: MaterialId, set: PbrMapSet) -> Option<PbrMapSet> {
        self.materials.insert(id, set)
    }

    pub fn get(&self, id: &MaterialId) -> Option<&PbrMapSet> {
        self.materials.get(id)
    }

    pub fn contains(&self, id: &MaterialId) -> bool {
        self.materials.contains_key(id)
    }

    /// Fallback for a surface kind, then the registry-wide fallback.
    pub fn fallback_for(&self, kind: SurfaceKind) -> &MaterialId {
        self.fallbacks.get(&kind).unwrap_or(&self.global_fallback)
    }
}
