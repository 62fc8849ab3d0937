//! Inputs of the facade rebuild: immutable snapshots plus a generation
//! counter that every edit bumps.

use std::sync::Arc;

use bevy::prelude::*;

use facade::{BuildingSpec, FacadeParams, MaterialRegistry, PlacementContext};

/// Everything one compile reads, shared with the background task by `Arc`.
#[derive(Debug, Clone)]
pub struct FacadeSnapshot {
    pub spec: Arc<BuildingSpec>,
    pub placement: Arc<PlacementContext>,
    pub registry: Arc<MaterialRegistry>,
    pub params: Arc<FacadeParams>,
}

/// The building currently being edited. Hosts replace parts of it through the
/// setters; each call starts a new generation and supersedes any rebuild of
/// an older one.
#[derive(Resource, Debug, Default)]
pub struct FacadeSource {
    spec: Option<Arc<BuildingSpec>>,
    placement: Arc<PlacementContext>,
    registry: Arc<MaterialRegistry>,
    params: Arc<FacadeParams>,
    generation: u64,
}

impl FacadeSource {
    pub fn new(
        spec: BuildingSpec,
        placement: PlacementContext,
        registry: MaterialRegistry,
        params: FacadeParams,
    ) -> Self {
        Self {
            spec: Some(Arc::new(spec)),
            placement: Arc::new(placement),
            registry: Arc::new(registry),
            params: Arc::new(params),
            generation: 1,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn spec(&self) -> Option<&BuildingSpec> {
        self.spec.as_deref()
    }

    pub fn placement(&self) -> &PlacementContext {
        &self.placement
    }

    pub fn set_spec(&mut self, spec: BuildingSpec) {
        self.spec = Some(Arc::new(spec));
        self.bump();
    }

    /// Edit the building spec in place. Copies it first when a rebuild still holds the
    /// current snapshot.
    pub fn edit_spec(&mut self, edit: impl FnOnce(&mut BuildingSpec)) {
        if let Some(spec) = self.spec.as_mut() {
            edit(Arc::make_mut(spec));
            self.bump();
        }
    }

    pub fn set_placement(&mut self, placement: PlacementContext) {
        self.placement = Arc::new(placement);
        self.bump();
    }

    pub fn set_registry(&mut self, registry: MaterialRegistry) {
        self.registry = Arc::new(registry);
        self.bump();
    }

    pub fn set_params(&mut self, params: FacadeParams) {
        self.params = Arc::new(params);
        self.bump();
    }

    /// Drop the building; the next rebuild removes its surfaces.
    pub fn clear(&mut self) {
        self.spec = None;
        self.bump();
    }

    /// The current inputs, or `None` while no building is loaded.
    pub fn snapshot(&self) -> Option<FacadeSnapshot> {
        let spec = self.spec.clone()?;
        Some(FacadeSnapshot {
            spec,
            placement: Arc::clone(&self.placement),
            registry: Arc::clone(&self.registry),
            params: Arc::clone(&self.params),
        })
    }

    fn bump(&mut self) {
        self.generation += 1;
    }
}
