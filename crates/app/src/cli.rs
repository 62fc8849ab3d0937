//! Command line arguments and input loading shared by the viewer and the
//! headless compile mode.

use std::fmt;
use std::path::{Path, PathBuf};

use bevy::math::Vec2;
use clap::Parser;

use facade::material::ManifestError;
use facade::{BuildingSpec, FacadeParams, MaterialRegistry, PlacementContext};

#[derive(Parser, Debug, Clone)]
#[command(name = "facade-viewer")]
#[command(about = "Compile and view procedural building facades", long_about = None)]
pub struct Cli {
    /// Building spec JSON
    #[arg(value_name = "SPEC")]
    pub spec: PathBuf,

    /// Placement context JSON; a rectangular lot is used when omitted
    #[arg(long, short = 'p', value_name = "PATH")]
    pub placement: Option<PathBuf>,

    /// Tiles along x for the default rectangular lot
    #[arg(long, default_value_t = 3)]
    pub tiles_x: u32,

    /// Tiles along z for the default rectangular lot
    #[arg(long, default_value_t = 2)]
    pub tiles_z: u32,

    /// Tile edge length in meters for the default rectangular lot
    #[arg(long, default_value_t = 6.0)]
    pub tile_size: f32,

    /// Material importer `_manifest.json`
    #[arg(long, value_name = "PATH")]
    pub materials: Option<PathBuf>,

    /// Asset-relative directory the manifest's maps live under
    #[arg(long, value_name = "DIR", default_value = "materials")]
    pub materials_root: String,

    /// Compiler parameters JSON
    #[arg(long, value_name = "PATH")]
    pub params: Option<PathBuf>,

    /// Compile once without a window and print the report JSON
    #[arg(long)]
    pub compile: bool,

    /// Write the report to this file instead of stdout (with --compile)
    #[arg(long, short = 'o', value_name = "PATH")]
    pub output: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// LoadError
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum LoadError {
    Io { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, source: serde_json::Error },
    Manifest { path: PathBuf, source: ManifestError },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Io { path, source } => write!(f, "{}: {source}", path.display()),
            LoadError::Parse { path, source } => {
                write!(f, "{}: invalid JSON: {source}", path.display())
            }
            LoadError::Manifest { path, source } => write!(f, "{}: {source}", path.display()),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Io { source, .. } => Some(source),
            LoadError::Parse { source, .. } => Some(source),
            LoadError::Manifest { source, .. } => Some(source),
        }
    }
}

fn read(path: &Path) -> Result<String, LoadError> {
    std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn parse<T>(path: &Path, from_str: impl FnOnce(&str) -> Result<T, serde_json::Error>) -> Result<T, LoadError> {
    let text = read(path)?;
    from_str(&text).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Everything a compile needs, loaded from the paths on the command line.
#[derive(Debug, Clone)]
pub struct Inputs {
    pub spec: BuildingSpec,
    pub placement: PlacementContext,
    pub registry: MaterialRegistry,
    pub params: FacadeParams,
}

pub fn load_spec(path: &Path) -> Result<BuildingSpec, LoadError> {
    parse(path, BuildingSpec::from_json_str)
}

impl Cli {
    pub fn default_lot(&self) -> PlacementContext {
        PlacementContext::rectangle(Vec2::ZERO, self.tiles_x, self.tiles_z, self.tile_size)
    }

    pub fn load(&self) -> Result<Inputs, LoadError> {
        let spec = load_spec(&self.spec)?;
        let placement = match &self.placement {
            Some(path) => parse(path, PlacementContext::from_json_str)?,
            None => self.default_lot(),
        };
        let registry = match &self.materials {
            Some(path) => MaterialRegistry::from_manifest_json(&read(path)?, &self.materials_root)
                .map_err(|source| LoadError::Manifest {
                    path: path.clone(),
                    source,
                })?,
            None => MaterialRegistry::default(),
        };
        let params = match &self.params {
            Some(path) => parse(path, FacadeParams::from_json_str)?,
            None => FacadeParams::default(),
        };
        Ok(Inputs {
            spec,
            placement,
            registry,
            params,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_compile_invocation() {
        let cli = Cli::try_parse_from([
            "facade-viewer",
            "house.json",
            "--compile",
            "--tiles-x",
            "4",
            "-o",
            "report.json",
        ])
        .unwrap();
        assert!(cli.compile);
        assert_eq!(cli.spec, PathBuf::from("house.json"));
        assert_eq!(cli.output, Some(PathBuf::from("report.json")));
        assert_eq!(cli.default_lot().faces.len(), 4);
        assert_eq!(cli.default_lot().faces[0].edges.len(), 4);
    }

    #[test]
    fn test_missing_spec_names_the_path() {
        let cli = Cli::try_parse_from(["facade-viewer", "/nonexistent/spec.json"]).unwrap();
        let err = cli.load().unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/spec.json"), "got: {err}");
    }

    #[test]
    fn test_bad_json_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spec.json");
        std::fs::write(&path, "{ \"floors\": ").unwrap();
        let err = load_spec(&path).unwrap_err();
        assert!(matches!(err, LoadError::Parse { .. }), "got: {err}");
    }
}
