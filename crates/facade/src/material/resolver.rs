use std::collections::BTreeMap;

use bevy::log::{debug, warn};
use serde::Serialize;

use super::{MaterialRef, MaterialRegistry, MaterialSource, PbrMapSet};
use crate::error::FacadeError;
use crate::mesh::SurfaceKind;
use crate::spec::{BayAddress, BayContent, BeltSpec, BuildingSpec, MaterialId, RoofRing, WindowDefinition};

/// Outcome of following one bay's links to its master.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BayResolution {
    pub address: BayAddress,
    /// The bay that owns the content; the bay itself when it does not link.
    pub master: BayAddress,
    pub override_material: Option<MaterialId>,
    /// The link walk hit a cycle; the bay falls back to the building default.
    pub cyclic: bool,
}

/// Every bay of a compile pass resolved to its wall and reveal material.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BayMaterials {
    pub walls: BTreeMap<BayAddress, MaterialRef>,
    pub reveals: BTreeMap<BayAddress, MaterialRef>,
    pub diagnostics: Vec<FacadeError>,
}

impl BayMaterials {
    pub fn wall(&self, bay: BayAddress) -> Option<&MaterialRef> {
        self.walls.get(&bay)
    }

    pub fn reveal(&self, bay: BayAddress) -> Option<&MaterialRef> {
        self.reveals.get(&bay)
    }
}

/// Resolves material references against the building's own table and the
/// global registry. The building table shadows registry entries.
pub struct MaterialResolver<'a> {
    spec: &'a BuildingSpec,
    registry: &'a MaterialRegistry,
}

impl<'a> MaterialResolver<'a> {
    pub fn new(spec: &'a BuildingSpec, registry: &'a MaterialRegistry) -> Self {
        Self { spec, registry }
    }

    pub fn get(&self, id: &MaterialId) -> Option<&'a PbrMapSet> {
        self.spec.materials.get(id).or_else(|| self.registry.get(id))
    }

    pub fn contains(&self, id: &MaterialId) -> bool {
        self.get(id).is_some()
    }

    fn fallback(&self, kind: SurfaceKind) -> MaterialRef {
        MaterialRef::new(self.registry.fallback_for(kind).clone(), MaterialSource::GlobalFallback)
    }

    /// Building default, then the global fallback for `kind`.
    pub fn building_default(&self, kind: SurfaceKind) -> MaterialRef {
        match &self.spec.default_material {
            Some(id) => MaterialRef::new(id.clone(), MaterialSource::BuildingDefault),
            None => self.fallback(kind),
        }
    }

    /// Follow a bay's links with a visited-set walk.
    pub fn walk_bay(&self, address: BayAddress) -> Result<BayResolution, FacadeError> {
        let mut visited: Vec<BayAddress> = Vec::new();
        let mut current = address;
        loop {
            if let Some(pos) = visited.iter().position(|b| *b == current) {
                let mut cycle = visited[pos..].to_vec();
                cycle.push(current);
                return Err(FacadeError::CyclicBayLink {
                    bay: address,
                    cycle,
                });
            }
            visited.push(current);
            match self.spec.bay(current) {
                Some(BayContent::Link { to }) => current = *to,
                Some(BayContent::Own { material }) => {
                    return Ok(BayResolution {
                        address,
                        master: current,
                        override_material: material.clone(),
                        cyclic: false,
                    })
                }
                None => {
                    return Ok(BayResolution {
                        address,
                        master: current,
                        override_material: None,
                        cyclic: false,
                    })
                }
            }
        }
    }

    /// Resolve a bay's link chain, recording a cycle as a diagnostic.
    pub fn resolve_bay(&self, address: BayAddress, diagnostics: &mut Vec<FacadeError>) -> BayResolution {
        match self.walk_bay(address) {
            Ok(resolution) => resolution,
            Err(err) => {
                warn!("{err}; using the building default");
                diagnostics.push(err);
                BayResolution {
                    address,
                    master: address,
                    override_material: None,
                    cyclic: true,
                }
            }
        }
    }

    /// Wall material of a resolved bay: override, the master floor's wall
    /// layer, building default, global fallback.
    pub fn wall(&self, bay: &BayResolution) -> MaterialRef {
        if bay.cyclic {
            return self.building_default(SurfaceKind::Wall);
        }
        let resolved = if let Some(id) = &bay.override_material {
            MaterialRef::new(id.clone(), MaterialSource::BayOverride { master: bay.master })
        } else if let Some(id) = self
            .spec
            .floors
            .get(bay.master.floor)
            .and_then(|floor| floor.wall_material())
        {
            MaterialRef::new(id.clone(), MaterialSource::LayerDefault)
        } else {
            self.building_default(SurfaceKind::Wall)
        };
        if self.get(&resolved.id).is_some_and(|set| !set.is_wall) {
            debug!(
                "bay {}: material '{}' is not flagged for walls",
                bay.address, resolved.id
            );
        }
        resolved
    }

    /// Reveal material of a resolved bay: override, the windows layer, the
    /// wall layer, building default, global fallback.
    pub fn reveal(&self, bay: &BayResolution) -> MaterialRef {
        if bay.cyclic {
            return self.building_default(SurfaceKind::Reveal);
        }
        if let Some(id) = &bay.override_material {
            return MaterialRef::new(id.clone(), MaterialSource::BayOverride { master: bay.master });
        }
        let floor = self.spec.floors.get(bay.master.floor);
        let layer = floor
            .and_then(|f| f.window_layer().and_then(|(_, material)| material))
            .or_else(|| floor.and_then(|f| f.wall_material()));
        match layer {
            Some(id) => MaterialRef::new(id.clone(), MaterialSource::LayerDefault),
            None => self.building_default(SurfaceKind::Reveal),
        }
    }

    /// Resolve every bay in `addresses` into a flat map.
    pub fn resolve_all(&self, addresses: impl IntoIterator<Item = BayAddress>) -> BayMaterials {
        let mut out = BayMaterials::default();
        for address in addresses {
            let bay = self.resolve_bay(address, &mut out.diagnostics);
            out.walls.insert(address, self.wall(&bay));
            out.reveals.insert(address, self.reveal(&bay));
        }
        out
    }

    /// Window layer material: the layer's own, then the definition's
    /// frame or muntin material, then the global fallback for the layer.
    pub fn window_layer(&self, def: &WindowDefinition, kind: SurfaceKind) -> MaterialRef {
        let layers = &def.layers;
        let own = match kind {
            SurfaceKind::WindowFrame | SurfaceKind::WindowMuntin => layers.frame.material.as_ref(),
            SurfaceKind::WindowGlass => layers.glass.material.as_ref(),
            SurfaceKind::WindowShade => layers.shade.material.as_ref(),
            SurfaceKind::WindowInterior => layers.interior.material.as_ref(),
            _ => None,
        };
        // Muntins have no layer entry of their own; the definition's muntin
        // material wins over the frame layer for them.
        if kind == SurfaceKind::WindowMuntin {
            if let Some(id) = &def.muntin_material {
                return MaterialRef::new(id.clone(), MaterialSource::WindowDefinition);
            }
        }
        if let Some(id) = own {
            return MaterialRef::new(id.clone(), MaterialSource::Element);
        }
        let definition = match kind {
            SurfaceKind::WindowFrame | SurfaceKind::WindowMuntin => def.frame_material.as_ref(),
            _ => None,
        };
        match definition {
            Some(id) => MaterialRef::new(id.clone(), MaterialSource::WindowDefinition),
            None => self.fallback(kind),
        }
    }

    pub fn belt(&self, belt: &BeltSpec) -> MaterialRef {
        match &belt.material {
            Some(id) => MaterialRef::new(id.clone(), MaterialSource::Element),
            None => self.building_default(SurfaceKind::Belt),
        }
    }

    pub fn roof_ring(&self, ring: &RoofRing) -> MaterialRef {
        match &ring.material {
            Some(id) => MaterialRef::new(id.clone(), MaterialSource::Element),
            None => self.building_default(SurfaceKind::RoofRing),
        }
    }

    pub fn roof_cap(&self) -> MaterialRef {
        match &self.spec.roof_material {
            Some(id) => MaterialRef::new(id.clone(), MaterialSource::Element),
            None => self.building_default(SurfaceKind::RoofCap),
        }
    }
}
