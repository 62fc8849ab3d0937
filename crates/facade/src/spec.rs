//! The declarative building specification consumed by the compiler.
//!
//! A [`BuildingSpec`] is authored outside this crate and treated as an
//! immutable snapshot for the duration of a compile pass. All types here
//! deserialize from the building JSON document.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::material::PbrMapSet;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Key into the material table or the global registry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MaterialId(pub String);

impl MaterialId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MaterialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MaterialId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Address of one facade cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BayAddress {
    pub face: usize,
    pub floor: usize,
    pub column: usize,
}

impl BayAddress {
    pub const fn new(face: usize, floor: usize, column: usize) -> Self {
        Self {
            face,
            floor,
            column,
        }
    }

    pub fn path(&self) -> String {
        format!("bays[{}][{}][{}]", self.face, self.floor, self.column)
    }
}

impl fmt::Display for BayAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.face, self.floor, self.column)
    }
}

// ---------------------------------------------------------------------------
// Floors and layers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloorSpec {
    pub height: f32,
    #[serde(default)]
    pub layers: Vec<LayerSpec>,
}

impl FloorSpec {
    pub fn wall_material(&self) -> Option<&MaterialId> {
        self.layers.iter().find_map(|layer| match layer {
            LayerSpec::Wall { material } => material.as_ref(),
            _ => None,
        })
    }

    pub fn window_layer(&self) -> Option<(&WindowRowSpec, Option<&MaterialId>)> {
        self.layers.iter().find_map(|layer| match layer {
            LayerSpec::Windows { row, material } => Some((row, material.as_ref())),
            _ => None,
        })
    }
}

/// One entry of a floor's layer stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LayerSpec {
    /// The facade surface. Its material is the layer default for walls.
    Wall {
        #[serde(default)]
        material: Option<MaterialId>,
    },
    /// A row of windows. Its material is the layer default for reveals.
    Windows {
        #[serde(default)]
        material: Option<MaterialId>,
        row: WindowRowSpec,
    },
}

impl LayerSpec {
    pub fn kind_name(&self) -> &'static str {
        match self {
            LayerSpec::Wall { .. } => "wall",
            LayerSpec::Windows { .. } => "windows",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowRowSpec {
    /// Cycled left to right to produce candidates.
    pub pattern: Vec<RowElement>,
    /// Number of candidates; `None` fills the span until one does not fit.
    #[serde(default)]
    pub count: Option<usize>,
    #[serde(default)]
    pub min_spacing: f32,
    /// Reveal depth of every opening in the row.
    #[serde(default)]
    pub inset: f32,
    #[serde(default)]
    pub mandatory_spacers: Vec<SpacerSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowElement {
    pub window: String,
    #[serde(default)]
    pub spacer_before: Option<SpacerBand>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpacerBand {
    pub width: f32,
    #[serde(default)]
    pub kind: SpacerKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpacerSpec {
    pub width: f32,
    #[serde(default)]
    pub kind: SpacerKind,
    #[serde(default)]
    pub anchor: SpacerAnchor,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpacerKind {
    #[default]
    Spacer,
    Column,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpacerAnchor {
    #[default]
    Start,
    End,
}

// ---------------------------------------------------------------------------
// Window catalog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowDefinition {
    pub id: String,
    pub width: f32,
    /// Total height including any arch rise.
    pub height: f32,
    pub sill_height: f32,
    #[serde(default)]
    pub style: WindowStyle,
    #[serde(default)]
    pub shade: ShadeConfig,
    #[serde(default)]
    pub frame_material: Option<MaterialId>,
    #[serde(default)]
    pub muntin_material: Option<MaterialId>,
    #[serde(default)]
    pub frame_width: Option<f32>,
    #[serde(default)]
    pub muntins: MuntinGrid,
    #[serde(default)]
    pub layers: WindowLayerSet,
}

impl WindowDefinition {
    pub fn top(&self) -> f32 {
        self.sill_height + self.height
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WindowStyle {
    #[default]
    Rectangular,
    /// Segmental arch; semicircular when `rise` is half the width.
    Arched { rise: f32 },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadeConfig {
    pub direction: ShadeDirection,
    /// Fraction of the glazed area covered, 0..=1.
    pub coverage: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShadeDirection {
    #[default]
    TopToBottom,
    LeftToRight,
    RightToLeft,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MuntinGrid {
    pub columns: u32,
    pub rows: u32,
    pub width: f32,
}

impl Default for MuntinGrid {
    fn default() -> Self {
        Self {
            columns: 1,
            rows: 1,
            width: 0.03,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerParams {
    pub material: Option<MaterialId>,
    /// Distance inward from the previous layer (or the window plane).
    pub offset: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowLayerSet {
    pub frame: LayerParams,
    pub glass: LayerParams,
    pub shade: LayerParams,
    pub interior: LayerParams,
}

// ---------------------------------------------------------------------------
// Bays, belts, roof
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BayContent {
    Own {
        #[serde(default)]
        material: Option<MaterialId>,
    },
    Link { to: BayAddress },
}

impl Default for BayContent {
    fn default() -> Self {
        BayContent::Own { material: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeltSpec {
    /// Building-relative y of the band's lower edge.
    pub bottom: f32,
    pub top: f32,
    pub depth: f32,
    #[serde(default)]
    pub material: Option<MaterialId>,
    /// Face indices the belt runs along; `None` wraps the whole footprint.
    #[serde(default)]
    pub faces: Option<Vec<usize>>,
}

impl BeltSpec {
    pub fn applies_to(&self, face: usize) -> bool {
        self.faces.as_ref().is_none_or(|faces| faces.contains(&face))
    }

    pub fn overlaps(&self, bottom: f32, top: f32) -> bool {
        bottom < self.top && top > self.bottom
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoofRing {
    pub height: f32,
    /// Inward offset from the level below.
    pub inset: f32,
    #[serde(default)]
    pub material: Option<MaterialId>,
}

// ---------------------------------------------------------------------------
// Building
// ---------------------------------------------------------------------------

fn default_corner_padding() -> f32 {
    0.5
}

fn default_wall_thickness() -> f32 {
    0.3
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingSpec {
    pub floors: Vec<FloorSpec>,
    #[serde(default)]
    pub roof_rings: Vec<RoofRing>,
    #[serde(default)]
    pub belts: Vec<BeltSpec>,
    #[serde(default)]
    pub window_catalog: Vec<WindowDefinition>,
    /// `bays[face][floor][column]`; missing cells are masters without override.
    #[serde(default)]
    pub bays: Vec<Vec<Vec<BayContent>>>,
    #[serde(default)]
    pub materials: BTreeMap<MaterialId, PbrMapSet>,
    #[serde(default)]
    pub default_material: Option<MaterialId>,
    #[serde(default)]
    pub roof_material: Option<MaterialId>,
    #[serde(default = "default_corner_padding")]
    pub corner_padding: f32,
    #[serde(default = "default_wall_thickness")]
    pub wall_thickness: f32,
}

impl BuildingSpec {
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn window(&self, id: &str) -> Option<&WindowDefinition> {
        self.window_catalog.iter().find(|w| w.id == id)
    }

    /// Explicitly authored content of a bay, if any.
    pub fn bay(&self, addr: BayAddress) -> Option<&BayContent> {
        self.bays
            .get(addr.face)
            .and_then(|floors| floors.get(addr.floor))
            .and_then(|columns| columns.get(addr.column))
    }

    /// Building-relative y of the bottom of each floor.
    pub fn floor_bases(&self) -> Vec<f32> {
        let mut bases = Vec::with_capacity(self.floors.len());
        let mut y = 0.0;
        for floor in &self.floors {
            bases.push(y);
            y += floor.height;
        }
        bases
    }

    pub fn total_height(&self) -> f32 {
        self.floors.iter().map(|f| f.height).sum()
    }
}
