//! Top-level driver: validates a building spec against its placement, runs
//! every stage in dependency order and emits the tagged mesh plus report.
//!
//! [`compile`] runs the whole thing at once. [`CompileJob`] does the same
//! work one unit per [`CompileJob::step`] (a face, the belts, the roof) so a
//! host can yield between units; nothing is handed out before the job is
//! finished.

mod report;
mod validate;


pub use report::{BayReport, CompileReport, FaceReport, OpeningReport, RoofReport, SpanReport};
pub use validate::{validate, validate_bay_columns};

use bevy::log::{debug, error, info};
use bevy::math::Vec2;

use crate::belt::BeltExtruder;
use crate::config::FacadeParams;
use crate::error::FacadeError;
use crate::geometry::{signed_area, WallFrame};
use crate::layout::{RowLayout, WindowLayoutEngine};
use crate::material::{BayMaterials, MaterialRegistry, MaterialResolver};
use crate::mesh::{FacadeMesh, SurfaceKind};
use crate::opening::{build_row_walls, Opening, OpeningGeometryBuilder, RowWalls};
use crate::placement::PlacementContext;
use crate::roof::{RoofBuilder, RoofFootprint};
use crate::span_merge::{FaceSpanMerger, Span};
use crate::spec::{BayAddress, BeltSpec, BuildingSpec, WindowDefinition};
use crate::window_layers::WindowLayerAssembler;

/// Mesh and metadata of one finished compile.
#[derive(Debug, Clone)]
pub struct CompileOutput {
    pub mesh: FacadeMesh,
    pub report: CompileReport,
}

/// Compile `spec` on `placement` in one go.
pub fn compile(
    spec: &BuildingSpec,
    placement: &PlacementContext,
    registry: &MaterialRegistry,
    params: &FacadeParams,
) -> Result<CompileOutput, FacadeError> {
    let mut job = CompileJob::new(spec, placement, registry, params)?;
    while !job.is_finished() {
        job.step();
    }
    job.finish()
}

/// Union of the sorted cut positions of two rows sharing a slice line.
fn merged_breaks(a: &[f32], b: Option<&[f32]>) -> Vec<f32> {
    let mut out = a.to_vec();
    if let Some(b) = b {
        out.extend_from_slice(b);
        out.sort_by(f32::total_cmp);
        out.dedup();
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Face(usize),
    Belts,
    Roof,
    Done,
}

struct FaceState {
    spans: Vec<Span>,
    /// `rows[span][floor]`.
    rows: Vec<Vec<RowLayout>>,
    /// Cut positions of each row, same indexing as `rows`.
    cuts: Vec<Vec<Vec<f32>>>,
}

/// A compile split into resumable units of work.
pub struct CompileJob<'a> {
    spec: &'a BuildingSpec,
    placement: &'a PlacementContext,
    params: &'a FacadeParams,
    resolver: MaterialResolver<'a>,
    faces: Vec<FaceState>,
    bays: BayMaterials,
    floor_bases: Vec<f32>,
    outward_sign: f32,
    closed_footprint: bool,
    stage: Stage,
    mesh: FacadeMesh,
    report: CompileReport,
}

impl<'a> CompileJob<'a> {
    /// Validate the inputs and run the planning stages: span merging,
    /// winding detection, row layouts and bay resolution. Geometry is built
    /// by [`step`](Self::step).
    pub fn new(
        spec: &'a BuildingSpec,
        placement: &'a PlacementContext,
        registry: &'a MaterialRegistry,
        params: &'a FacadeParams,
    ) -> Result<Self, FacadeError> {
        #[cfg(feature = "trace")]
        let _span = bevy::log::info_span!("facade_plan").entered();

        let resolver = MaterialResolver::new(spec, registry);
        let mut problems = validate(spec, placement, &resolver).into_iter();
        if let Some(first) = problems.next() {
            let more = problems.count();
            error!("building spec rejected: {first} ({more} more problem(s))");
            return Err(first);
        }

        let mut report = CompileReport::default();

        // Spans per face.
        let merger = FaceSpanMerger::new(params, spec.corner_padding);
        let mut faces = Vec::with_capacity(placement.faces.len());
        for (f, face) in placement.faces.iter().enumerate() {
            let merged = merger.merge(f, &face.edges);
            report.diagnostics.extend(merged.diagnostics);
            report.faces.push(FaceReport {
                face: f,
                label: face.label.clone(),
                spans: merged
                    .spans
                    .iter()
                    .map(|s| SpanReport {
                        id: s.id,
                        start: s.start.to_array(),
                        end: s.end.to_array(),
                        length: s.length,
                        tiles: s.tiles.clone(),
                    })
                    .collect(),
            });
            faces.push(FaceState {
                spans: merged.spans,
                rows: Vec::new(),
                cuts: Vec::new(),
            });
        }

        // A footprint is closed when every span ends where the next one
        // starts, give or take the gap a dropped degenerate span leaves.
        let all: Vec<&Span> = faces.iter().flat_map(|f| f.spans.iter()).collect();
        let seam = params.seam_tolerance();
        let closed_footprint = all.len() >= 3
            && (0..all.len()).all(|i| all[i].end.distance(all[(i + 1) % all.len()].start) <= seam);
        // Winding comes from the raw tile edges so dropped spans cannot
        // flip it. Open footprints count as counter-clockwise.
        let outward_sign = if closed_footprint {
            let corners: Vec<Vec2> = placement
                .faces
                .iter()
                .flat_map(|face| face.edges.iter())
                .filter(|edge| edge.length() >= params.position_epsilon)
                .map(|edge| edge.start)
                .collect();
            if signed_area(&corners) < 0.0 {
                -1.0
            } else {
                1.0
            }
        } else {
            1.0
        };
        report.outward_sign = outward_sign;

        // Row layouts. Columns run on across the spans of a face per floor.
        let engine = WindowLayoutEngine::new(spec, params);
        let mut addresses = Vec::new();
        for (f, face) in faces.iter_mut().enumerate() {
            let belts: Vec<&BeltSpec> = spec.belts.iter().filter(|b| b.applies_to(f)).collect();
            face.rows = vec![Vec::with_capacity(spec.floors.len()); face.spans.len()];
            for floor in 0..spec.floors.len() {
                let mut column = 0;
                for (s, span) in face.spans.iter().enumerate() {
                    let outcome = engine.layout_row(span, floor, column, &belts);
                    report.diagnostics.extend(outcome.diagnostics);
                    column = outcome.layout.next_column();
                    for strip in &outcome.layout.strips {
                        addresses.push(BayAddress::new(f, floor, strip.column));
                    }
                    report.skipped.extend(outcome.layout.skipped.iter().cloned());
                    report.spacers.extend(outcome.layout.spacers.iter().cloned());
                    face.rows[s].push(outcome.layout);
                }
            }
            face.cuts = face
                .rows
                .iter()
                .map(|floors| floors.iter().map(RowLayout::cut_positions).collect())
                .collect();
        }

        let mut problems = validate_bay_columns(spec, &addresses).into_iter();
        if let Some(first) = problems.next() {
            let more = problems.count();
            error!("building spec rejected: {first} ({more} more problem(s))");
            return Err(first);
        }

        let bays = resolver.resolve_all(addresses);
        report.diagnostics.extend(bays.diagnostics.iter().cloned());
        report.bays = bays
            .walls
            .iter()
            .filter_map(|(addr, wall)| {
                bays.reveal(*addr).map(|reveal| BayReport {
                    bay: *addr,
                    wall: wall.clone(),
                    reveal: reveal.clone(),
                })
            })
            .collect();

        let stage = if faces.is_empty() { Stage::Belts } else { Stage::Face(0) };
        Ok(Self {
            spec,
            placement,
            params,
            resolver,
            faces,
            bays,
            floor_bases: spec.floor_bases(),
            outward_sign,
            closed_footprint,
            stage,
            mesh: FacadeMesh::new(),
            report,
        })
    }

    pub fn is_finished(&self) -> bool {
        self.stage == Stage::Done
    }

    /// Run the next unit of work. Returns `false` once nothing is left.
    pub fn step(&mut self) -> bool {
        match self.stage {
            Stage::Face(f) => {
                self.build_face(f);
                self.stage = if f + 1 < self.faces.len() {
                    Stage::Face(f + 1)
                } else {
                    Stage::Belts
                };
            }
            Stage::Belts => {
                self.build_belts();
                self.stage = Stage::Roof;
            }
            Stage::Roof => {
                self.build_roof();
                self.stage = Stage::Done;
            }
            Stage::Done => return false,
        }
        true
    }

    /// Hand out the result. Runs any remaining steps first.
    pub fn finish(mut self) -> Result<CompileOutput, FacadeError> {
        while self.step() {}
        self.mesh.prune_empty();
        self.report.triangle_count = self.mesh.triangle_count();
        self.report.vertex_count = self.mesh.vertex_count();
        self.report.fingerprint = self.mesh.fingerprint();
        info!(
            "facade compiled: {} faces, {} openings, {} skipped, {} triangles in {} groups, {} diagnostics",
            self.faces.len(),
            self.report.openings.len(),
            self.report.skipped.len(),
            self.report.triangle_count,
            self.mesh.groups.len(),
            self.report.diagnostics.len()
        );
        Ok(CompileOutput {
            mesh: self.mesh,
            report: self.report,
        })
    }

    fn wall_height(&self) -> f32 {
        match (self.floor_bases.last(), self.spec.floors.last()) {
            (Some(base), Some(floor)) => base + floor.height,
            _ => 0.0,
        }
    }

    fn build_face(&mut self, f: usize) {
        #[cfg(feature = "trace")]
        let _span = bevy::log::info_span!("facade_face", face = f).entered();

        let spec = self.spec;
        let params = self.params;
        let base_elevation = self.placement.base_elevation;
        let openings_builder = OpeningGeometryBuilder::new(params, spec.wall_thickness);
        let assembler = WindowLayerAssembler::new(params);
        let Some(face) = self.faces.get(f) else {
            return;
        };

        for (s, span) in face.spans.iter().enumerate() {
            let frame = WallFrame::new(span.start, span.end, self.outward_sign, base_elevation);
            for (k, floor) in spec.floors.iter().enumerate() {
                let Some(row) = face.rows[s].get(k) else {
                    continue;
                };
                let v0 = self.floor_bases[k];
                let v1 = v0 + floor.height;
                let cuts = &face.cuts[s];
                let bottom_breaks = merged_breaks(&cuts[k], k.checked_sub(1).map(|b| cuts[b].as_slice()));
                let top_breaks = merged_breaks(&cuts[k], cuts.get(k + 1).map(Vec::as_slice));
                let inset = floor.window_layer().map_or(0.0, |(r, _)| r.inset);

                let mut openings: Vec<Opening> = Vec::with_capacity(row.windows.len());
                let mut defs: Vec<&WindowDefinition> = Vec::with_capacity(row.windows.len());
                for (i, instance) in row.windows.iter().enumerate() {
                    // Layout only places windows it found in the catalog.
                    let Some(def) = spec.window(&instance.window) else {
                        continue;
                    };
                    let opening =
                        openings_builder.opening(i, instance, def, v0, inset, &mut self.report.diagnostics);
                    self.report.openings.push(OpeningReport {
                        bay: instance.bay(),
                        span: instance.span,
                        window: instance.window.clone(),
                        left: instance.left,
                        width: instance.width,
                        sill: opening.outline.sill,
                        top: opening.outline.top,
                        inset: opening.inset,
                        door: opening.outline.door,
                    });
                    openings.push(opening);
                    defs.push(def);
                }

                let bay_of = |column: usize| BayAddress::new(f, k, column);
                let wall_materials: Vec<_> = row
                    .strips
                    .iter()
                    .map(|strip| match self.bays.wall(bay_of(strip.column)) {
                        Some(r) => r.id.clone(),
                        None => self.resolver.building_default(SurfaceKind::Wall).id,
                    })
                    .collect();
                let reveal_materials: Vec<_> = row
                    .strips
                    .iter()
                    .map(|strip| match self.bays.reveal(bay_of(strip.column)) {
                        Some(r) => r.id.clone(),
                        None => self.resolver.building_default(SurfaceKind::Reveal).id,
                    })
                    .collect();

                let triangles = build_row_walls(
                    &RowWalls {
                        frame: &frame,
                        layout: row,
                        openings: &openings,
                        v0,
                        v1,
                        bottom_breaks: &bottom_breaks,
                        top_breaks: &top_breaks,
                        wall_materials: &wall_materials,
                        reveal_materials: &reveal_materials,
                    },
                    params,
                    &mut self.mesh,
                );

                for (opening, def) in openings.iter().zip(&defs) {
                    let assembly = assembler.assemble(&frame, opening, def);
                    for (kind, buffers) in &assembly.layers {
                        let material = self.resolver.window_layer(def, *kind);
                        self.mesh.group_mut(&material.id, *kind).append(buffers);
                    }
                }
                debug!(
                    "face {f} span {s} floor {k}: {triangles} wall triangles, {} openings",
                    openings.len()
                );
            }
        }
    }

    fn build_belts(&mut self) {
        #[cfg(feature = "trace")]
        let _span = bevy::log::info_span!("facade_belts").entered();

        if self.spec.belts.is_empty() {
            return;
        }
        let spans: Vec<Span> = self.faces.iter().flat_map(|f| f.spans.iter().cloned()).collect();
        let height = self.wall_height();
        let extruder = BeltExtruder::new(
            self.params,
            &self.placement.street_clearance,
            self.outward_sign,
            self.placement.base_elevation,
        );
        for (i, belt) in self.spec.belts.iter().enumerate() {
            let outcome = extruder.extrude(i, belt, &spans, height);
            let material = self.resolver.belt(belt);
            self.mesh
                .group_mut(&material.id, SurfaceKind::Belt)
                .append(&outcome.mesh);
            self.report.diagnostics.extend(outcome.diagnostics);
            self.report.belts.push(outcome.report);
        }
    }

    fn build_roof(&mut self) {
        #[cfg(feature = "trace")]
        let _span = bevy::log::info_span!("facade_roof").entered();

        if !self.closed_footprint {
            debug!("footprint is open, no roof");
            return;
        }
        let mut corners = Vec::new();
        let mut ends = Vec::new();
        let mut edge_breaks = Vec::new();
        for face in &self.faces {
            for (s, span) in face.spans.iter().enumerate() {
                corners.push(span.start);
                ends.push(span.end);
                edge_breaks.push(face.cuts[s].last().cloned().unwrap_or_default());
            }
        }
        let footprint = RoofFootprint {
            corners: &corners,
            ends: &ends,
            edge_breaks: &edge_breaks,
        };
        let rings = &self.spec.roof_rings;
        let outcome = RoofBuilder::new(self.params, self.outward_sign, self.placement.base_elevation).build(
            &footprint,
            self.wall_height(),
            rings,
        );
        self.report.roof = RoofReport {
            built: true,
            rings_built: outcome.rings.len(),
            rings_skipped: rings.len() - outcome.rings.len(),
        };
        for (ring, buffers) in rings.iter().zip(&outcome.rings) {
            let material = self.resolver.roof_ring(ring);
            self.mesh
                .group_mut(&material.id, SurfaceKind::RoofRing)
                .append(buffers);
        }
        let cap = self.resolver.roof_cap();
        self.mesh
            .group_mut(&cap.id, SurfaceKind::RoofCap)
            .append(&outcome.cap);
        self.report.diagnostics.extend(outcome.diagnostics);
    }
}
