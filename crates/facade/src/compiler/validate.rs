//! Up-front checks that reject a malformed spec before any geometry is built.
//! Every finding is an `InvalidSpec` carrying a JSON path into the input.

use std::collections::BTreeSet;

use crate::error::FacadeError;
use crate::material::MaterialResolver;
use crate::placement::PlacementContext;
use crate::spec::{BayAddress, BayContent, BuildingSpec, LayerParams, LayerSpec, MaterialId, WindowDefinition, WindowStyle};

struct Validator<'a> {
    spec: &'a BuildingSpec,
    placement: &'a PlacementContext,
    resolver: &'a MaterialResolver<'a>,
    errors: Vec<FacadeError>,
}

impl Validator<'_> {
    fn fail(&mut self, path: impl Into<String>, reason: impl Into<String>) {
        self.errors.push(FacadeError::invalid(path, reason));
    }

    fn positive(&mut self, path: impl FnOnce() -> String, value: f32) {
        if !(value.is_finite() && value > 0.0) {
            self.fail(path(), format!("must be positive, got {value}"));
        }
    }

    fn non_negative(&mut self, path: impl FnOnce() -> String, value: f32) {
        if !(value.is_finite() && value >= 0.0) {
            self.fail(path(), format!("must not be negative, got {value}"));
        }
    }

    fn material(&mut self, path: impl FnOnce() -> String, id: Option<&MaterialId>) {
        if let Some(id) = id {
            if !self.resolver.contains(id) {
                self.fail(path(), format!("unknown material '{id}'"));
            }
        }
    }

    fn building(&mut self) {
        let spec = self.spec;
        if spec.floors.is_empty() {
            self.fail("floors", "building has no floors");
        }
        self.non_negative(|| "corner_padding".into(), spec.corner_padding);
        self.non_negative(|| "wall_thickness".into(), spec.wall_thickness);
        self.material(|| "default_material".into(), spec.default_material.as_ref());
        self.material(|| "roof_material".into(), spec.roof_material.as_ref());
    }

    fn floors(&mut self) {
        let spec = self.spec;
        for (i, floor) in spec.floors.iter().enumerate() {
            self.positive(|| format!("floors[{i}].height"), floor.height);
            let mut kinds = BTreeSet::new();
            for (j, layer) in floor.layers.iter().enumerate() {
                let path = format!("floors[{i}].layers[{j}]");
                if !kinds.insert(layer.kind_name()) {
                    self.fail(path.clone(), format!("second '{}' layer in one floor", layer.kind_name()));
                }
                match layer {
                    LayerSpec::Wall { material } => {
                        self.material(|| format!("{path}.material"), material.as_ref());
                    }
                    LayerSpec::Windows { material, row } => {
                        self.material(|| format!("{path}.material"), material.as_ref());
                        self.non_negative(|| format!("{path}.row.min_spacing"), row.min_spacing);
                        self.non_negative(|| format!("{path}.row.inset"), row.inset);
                        for (p, element) in row.pattern.iter().enumerate() {
                            if spec.window(&element.window).is_none() {
                                self.fail(
                                    format!("{path}.row.pattern[{p}].window"),
                                    format!("unknown window '{}'", element.window),
                                );
                            }
                            if let Some(band) = &element.spacer_before {
                                self.non_negative(|| format!("{path}.row.pattern[{p}].spacer_before.width"), band.width);
                            }
                        }
                        for (m, spacer) in row.mandatory_spacers.iter().enumerate() {
                            self.positive(|| format!("{path}.row.mandatory_spacers[{m}].width"), spacer.width);
                        }
                    }
                }
            }
        }
    }

    fn layer_params(&mut self, path: &str, name: &str, layer: &LayerParams) {
        self.material(|| format!("{path}.layers.{name}.material"), layer.material.as_ref());
        if let Some(offset) = layer.offset {
            self.non_negative(|| format!("{path}.layers.{name}.offset"), offset);
        }
    }

    fn window(&mut self, i: usize, def: &WindowDefinition, seen: &mut BTreeSet<String>) {
        let path = format!("window_catalog[{i}]");
        if !seen.insert(def.id.clone()) {
            self.fail(format!("{path}.id"), format!("duplicate window id '{}'", def.id));
        }
        self.positive(|| format!("{path}.width"), def.width);
        self.positive(|| format!("{path}.height"), def.height);
        self.non_negative(|| format!("{path}.sill_height"), def.sill_height);
        if let WindowStyle::Arched { rise } = def.style {
            self.non_negative(|| format!("{path}.style.rise"), rise);
        }
        if let Some(width) = def.frame_width {
            self.non_negative(|| format!("{path}.frame_width"), width);
        }
        self.non_negative(|| format!("{path}.muntins.width"), def.muntins.width);
        if def.muntins.columns == 0 || def.muntins.rows == 0 {
            self.fail(format!("{path}.muntins"), "muntin grid needs at least one column and row");
        }
        let coverage = def.shade.coverage;
        if !(0.0..=1.0).contains(&coverage) {
            self.fail(format!("{path}.shade.coverage"), format!("must lie in 0..=1, got {coverage}"));
        }
        self.material(|| format!("{path}.frame_material"), def.frame_material.as_ref());
        self.material(|| format!("{path}.muntin_material"), def.muntin_material.as_ref());
        self.layer_params(&path, "frame", &def.layers.frame);
        self.layer_params(&path, "glass", &def.layers.glass);
        self.layer_params(&path, "shade", &def.layers.shade);
        self.layer_params(&path, "interior", &def.layers.interior);
    }

    fn belts_and_roof(&mut self) {
        let spec = self.spec;
        let faces = self.placement.faces.len();
        for (i, belt) in spec.belts.iter().enumerate() {
            let path = format!("belts[{i}]");
            if !(belt.top > belt.bottom) {
                self.fail(
                    path.clone(),
                    format!("inverted range {}..{}", belt.bottom, belt.top),
                );
            }
            self.non_negative(|| format!("{path}.depth"), belt.depth);
            self.material(|| format!("{path}.material"), belt.material.as_ref());
            for (j, face) in belt.faces.iter().flatten().enumerate() {
                if *face >= faces {
                    self.fail(format!("{path}.faces[{j}]"), format!("face {face} out of range (0..{faces})"));
                }
            }
        }
        for (i, ring) in spec.roof_rings.iter().enumerate() {
            self.positive(|| format!("roof_rings[{i}].height"), ring.height);
            self.non_negative(|| format!("roof_rings[{i}].inset"), ring.inset);
            self.material(|| format!("roof_rings[{i}].material"), ring.material.as_ref());
        }
    }

    fn bays(&mut self) {
        let faces = self.placement.faces.len();
        let spec = self.spec;
        let floors = spec.floors.len();
        for (f, face) in spec.bays.iter().enumerate() {
            if f >= faces && face.iter().any(|floor| !floor.is_empty()) {
                self.fail(format!("bays[{f}]"), format!("face {f} out of range (0..{faces})"));
                continue;
            }
            for (k, floor) in face.iter().enumerate() {
                if k >= floors && !floor.is_empty() {
                    self.fail(format!("bays[{f}][{k}]"), format!("floor {k} out of range (0..{floors})"));
                    continue;
                }
                for (c, bay) in floor.iter().enumerate() {
                    let path = format!("bays[{f}][{k}][{c}]");
                    match bay {
                        BayContent::Own { material } => {
                            self.material(|| format!("{path}.material"), material.as_ref());
                        }
                        BayContent::Link { to } => {
                            if to.face >= faces || to.floor >= floors {
                                self.fail(format!("{path}.to"), format!("link target {to} out of range"));
                            }
                        }
                    }
                }
            }
        }
    }

    fn placement(&mut self) {
        let placement = self.placement;
        for (i, face) in placement.faces.iter().enumerate() {
            if face.edges.is_empty() {
                self.fail(format!("faces[{i}].edges"), "face has no tile edges");
            }
            for (j, edge) in face.edges.iter().enumerate() {
                if !(edge.start.is_finite() && edge.end.is_finite()) {
                    self.fail(format!("faces[{i}].edges[{j}]"), "non-finite edge coordinates");
                }
            }
        }
        for (i, street) in placement.street_clearance.iter().enumerate() {
            if street.points.len() < 3 {
                self.fail(
                    format!("street_clearance[{i}].points"),
                    format!("polygon needs at least 3 points, got {}", street.points.len()),
                );
            }
        }
        if !placement.base_elevation.is_finite() {
            self.fail("base_elevation", "must be finite");
        }
    }
}

/// Bay cells and link targets checked against the columns the row layouts
/// actually produced. Runs after layout, since column counts depend on how
/// many windows fit.
pub fn validate_bay_columns(spec: &BuildingSpec, addresses: &[BayAddress]) -> Vec<FacadeError> {
    let produced: BTreeSet<BayAddress> = addresses.iter().copied().collect();
    let mut errors = Vec::new();
    for (f, face) in spec.bays.iter().enumerate() {
        for (k, floor) in face.iter().enumerate() {
            for (c, bay) in floor.iter().enumerate() {
                let cell = BayAddress::new(f, k, c);
                if !produced.contains(&cell) {
                    errors.push(FacadeError::invalid(
                        cell.path(),
                        format!("face {f} floor {k} has no column {c}"),
                    ));
                    continue;
                }
                if let BayContent::Link { to } = bay {
                    if !produced.contains(to) {
                        errors.push(FacadeError::invalid(
                            format!("{}.to", cell.path()),
                            format!("link target {to} is not a column of the facade"),
                        ));
                    }
                }
            }
        }
    }
    errors
}

/// Every `InvalidSpec` problem in the inputs, in input order.
pub fn validate(spec: &BuildingSpec, placement: &PlacementContext, resolver: &MaterialResolver<'_>) -> Vec<FacadeError> {
    let mut v = Validator {
        spec,
        placement,
        resolver,
        errors: Vec::new(),
    };
    v.building();
    v.floors();
    let mut seen = BTreeSet::new();
    for (i, def) in spec.window_catalog.iter().enumerate() {
        v.window(i, def, &mut seen);
    }
    v.belts_and_roof();
    v.bays();
    v.placement();
    v.errors
}
