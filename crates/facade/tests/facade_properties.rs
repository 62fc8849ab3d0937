//! Whole-pipeline properties of compiled facades: placement bounds, span
//! merging, strict skipping, street clearance, determinism, watertightness
//! and winding.

use std::collections::{HashMap, HashSet};

use bevy::math::{Vec2, Vec3};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use facade::geometry::point_in_polygon;
use facade::placement::{FacePlacement, StreetPolygon, TileEdge};
use facade::spec::SpacerKind;
use facade::{
    compile, BuildingSpec, CompileOutput, FacadeError, FacadeParams, MaterialId, MaterialRegistry, PlacementContext,
    SurfaceKind,
};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

const HOUSE: &str = r#"{
    "floors": [
        { "height": 3.2, "layers": [
            { "kind": "wall", "material": "brick" },
            { "kind": "windows", "row": {
                "pattern": [ { "window": "tall" }, { "window": "arch", "spacer_before": { "width": 0.3 } } ],
                "min_spacing": 0.7, "inset": 0.25,
                "mandatory_spacers": [ { "width": 0.4, "kind": "column", "anchor": "start" } ] } }
        ] },
        { "height": 3.0, "layers": [
            { "kind": "wall", "material": "stucco" },
            { "kind": "windows", "material": "stone", "row": {
                "pattern": [ { "window": "square" } ], "min_spacing": 0.9, "inset": 0.15 } }
        ] },
        { "height": 2.8, "layers": [ { "kind": "wall" } ] }
    ],
    "window_catalog": [
        { "id": "tall", "width": 1.1, "height": 1.9, "sill_height": 0.7,
          "muntins": { "columns": 2, "rows": 3, "width": 0.03 },
          "shade": { "direction": "left_to_right", "coverage": 0.4 } },
        { "id": "arch", "width": 1.0, "height": 1.9, "sill_height": 0.7,
          "style": { "type": "arched", "rise": 0.5 } },
        { "id": "square", "width": 1.0, "height": 1.0, "sill_height": 1.0,
          "shade": { "direction": "top_to_bottom", "coverage": 0.5 } }
    ],
    "materials": { "brick": {}, "stucco": {}, "stone": {} },
    "belts": [ { "bottom": 3.1, "top": 3.35, "depth": 0.5 } ],
    "roof_rings": [ { "height": 0.9, "inset": 0.0 }, { "height": 0.5, "inset": 0.6 } ],
    "default_material": "brick"
}"#;

fn house() -> BuildingSpec {
    BuildingSpec::from_json_str(HOUSE).unwrap()
}

fn run(spec: &BuildingSpec, placement: &PlacementContext) -> CompileOutput {
    compile(spec, placement, &MaterialRegistry::default(), &FacadeParams::default()).unwrap()
}

/// The same footprint walked the other way round.
fn clockwise(placement: &PlacementContext) -> PlacementContext {
    let faces = placement
        .faces
        .iter()
        .rev()
        .map(|face| FacePlacement {
            label: face.label.clone(),
            edges: face
                .edges
                .iter()
                .rev()
                .map(|e| TileEdge::new(e.tile, e.end, e.start))
                .collect(),
        })
        .collect();
    PlacementContext {
        faces,
        street_clearance: placement.street_clearance.clone(),
        base_elevation: placement.base_elevation,
    }
}

fn random_lot(rng: &mut ChaCha8Rng) -> PlacementContext {
    let origin = Vec2::new(rng.gen_range(-50.0..50.0), rng.gen_range(-50.0..50.0));
    let mut lot = PlacementContext::rectangle(
        origin,
        rng.gen_range(1..5),
        rng.gen_range(1..4),
        rng.gen_range(4.0..8.0),
    );
    lot.base_elevation = rng.gen_range(0.0..20.0);
    lot
}

// ---------------------------------------------------------------------------
// Mesh inspection
// ---------------------------------------------------------------------------

type Key = [i64; 3];

fn key(p: Vec3) -> Key {
    [
        (p.x * 1e4).round() as i64,
        (p.y * 1e4).round() as i64,
        (p.z * 1e4).round() as i64,
    ]
}

/// Every shell edge is shared by two triangles unless it runs along the
/// bottom of the building or is the inner edge of a reveal.
fn assert_watertight(out: &CompileOutput, base_elevation: f32) {
    let mut edges: HashMap<(Key, Key), Vec<SurfaceKind>> = HashMap::new();
    let mut wall_vertices: HashSet<Key> = HashSet::new();
    for (surface, buffers) in &out.mesh.groups {
        if !surface.kind.is_shell() {
            continue;
        }
        for t in buffers.triangles() {
            let k = [key(t[0]), key(t[1]), key(t[2])];
            if surface.kind == SurfaceKind::Wall {
                wall_vertices.extend(k);
            }
            for i in 0..3 {
                let (a, b) = (k[i], k[(i + 1) % 3]);
                let edge = if a < b { (a, b) } else { (b, a) };
                edges.entry(edge).or_default().push(surface.kind);
            }
        }
    }
    let floor_y = key(Vec3::new(0.0, base_elevation, 0.0))[1];
    let mut open = 0;
    for ((a, b), kinds) in &edges {
        assert!(kinds.len() <= 2, "edge {a:?}-{b:?} shared by {} triangles", kinds.len());
        if kinds.len() == 2 {
            continue;
        }
        let bottom = a[1] == floor_y && b[1] == floor_y;
        let inner_reveal = kinds[0] == SurfaceKind::Reveal && !wall_vertices.contains(a) && !wall_vertices.contains(b);
        assert!(bottom || inner_reveal, "open {:?} edge {a:?}-{b:?}", kinds[0]);
        open += 1;
    }
    assert!(open > 0);
}

fn assert_wall_windings(out: &CompileOutput) {
    for (_, buffers) in out.mesh.by_kind(SurfaceKind::Wall) {
        for tri in buffers.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| buffers.position(i));
            let normal = Vec3::from_array(buffers.normals[tri[0] as usize]);
            let geometric = (b - a).cross(c - a);
            assert!(geometric.dot(normal) > 0.0, "inverted wall triangle {a} {b} {c}");
        }
    }
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

#[test]
fn test_windows_stay_inside_corner_padding() {
    let spec = house();
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    for _ in 0..24 {
        let lot = random_lot(&mut rng);
        let out = run(&spec, &lot);
        for opening in &out.report.openings {
            let span = &out.report.spans_of(opening.bay.face)[opening.span.index];
            let pad = spec.corner_padding;
            assert!(opening.left >= pad - 1e-4, "left {} inside padding", opening.left);
            assert!(
                opening.left + opening.width <= span.length - pad + 1e-4,
                "right {} past {}",
                opening.left + opening.width,
                span.length - pad
            );
        }
    }
}

#[test]
fn test_adjacent_tile_edges_merge_into_one_span() {
    let spec = house();
    let reference = PlacementContext::rectangle(Vec2::ZERO, 1, 1, 10.0);
    let mut split = reference.clone();
    split.faces[0].edges = vec![
        TileEdge::new(0, Vec2::new(0.0, 0.0), Vec2::new(4.0, 0.0)),
        TileEdge::new(1, Vec2::new(4.0, 0.0), Vec2::new(10.0, 0.0)),
    ];

    let merged = run(&spec, &split);
    let spans = merged.report.spans_of(0);
    assert_eq!(spans.len(), 1);
    assert!((spans[0].length - 10.0).abs() < 1e-4, "got: {}", spans[0].length);
    assert_eq!(spans[0].tiles, vec![0, 1]);

    let whole = run(&spec, &reference);
    let lefts = |out: &CompileOutput| -> Vec<(usize, f32)> {
        out.report
            .openings
            .iter()
            .filter(|o| o.bay.face == 0)
            .map(|o| (o.bay.floor, o.left))
            .collect()
    };
    assert_eq!(lefts(&merged), lefts(&whole));
}

#[test]
fn test_unfit_window_is_skipped_without_moving_others() {
    let json = r#"{
        "floors": [ { "height": 3.0, "layers": [ { "kind": "windows", "row": {
            "pattern": [ { "window": "w" } ], "count": COUNT, "min_spacing": 2.5 } } ] } ],
        "window_catalog": [ { "id": "w", "width": 2.0, "height": 1.5, "sill_height": 1.0 } ],
        "corner_padding": 1.0
    }"#;
    // 12 m faces leave 10 m after padding. Two windows take 6.5 m; the
    // third would start at 9 and needs 2 m.
    let lot = PlacementContext::rectangle(Vec2::ZERO, 1, 1, 12.0);
    let two = run(&BuildingSpec::from_json_str(&json.replace("COUNT", "2")).unwrap(), &lot);
    let four = run(&BuildingSpec::from_json_str(&json.replace("COUNT", "4")).unwrap(), &lot);

    let face0 = |out: &CompileOutput| -> Vec<f32> {
        out.report
            .openings
            .iter()
            .filter(|o| o.bay.face == 0)
            .map(|o| o.left)
            .collect()
    };
    assert_eq!(face0(&four), face0(&two));
    assert_eq!(face0(&four).len(), 2);
    let skipped: Vec<usize> = four
        .report
        .skipped
        .iter()
        .filter(|s| s.face == 0)
        .map(|s| s.candidate)
        .collect();
    assert_eq!(skipped, vec![2, 3]);
    assert!(four.report.diagnostics.iter().any(|d| matches!(d, FacadeError::UnfittableGeometry { .. })));
}

#[test]
fn test_belts_respect_street_clearance() {
    let spec = house();
    let mut rng = ChaCha8Rng::seed_from_u64(0xbe17);
    for _ in 0..32 {
        let mut lot = random_lot(&mut rng);
        let south = &lot.faces[0];
        let x0 = south.edges[0].start.x;
        let x1 = south.edges.last().map_or(x0, |e| e.end.x);
        let z0 = south.edges[0].start.y;
        let gap = rng.gen_range(0.05..0.45);
        let street = vec![
            Vec2::new(x0 - 20.0, z0 - gap),
            Vec2::new(x1 + 20.0, z0 - gap),
            Vec2::new(x1 + 20.0, z0 - gap - 15.0),
            Vec2::new(x0 - 20.0, z0 - gap - 15.0),
        ];
        lot.street_clearance = vec![StreetPolygon {
            points: street.clone(),
        }];

        let out = run(&spec, &lot);
        let belt = &out.report.belts[0];
        assert!(belt.skipped.is_none(), "gap {gap}: belt dropped");
        assert!(belt.clamped_vertices > 0, "gap {gap}: nothing clamped");
        assert!(out.mesh.kind_triangle_count(SurfaceKind::Belt) > 0);
        for (_, buffers) in out.mesh.by_kind(SurfaceKind::Belt) {
            for p in &buffers.positions {
                let plan = Vec2::new(p[0], p[2]);
                assert!(!point_in_polygon(plan, &street), "belt vertex {plan} inside the street");
            }
        }
    }
}

#[test]
fn test_recompile_is_identical() {
    let spec = house();
    let lot = PlacementContext::rectangle(Vec2::new(3.0, -2.0), 3, 2, 6.0);
    let a = run(&spec, &lot);
    let b = run(&spec, &lot);
    assert_eq!(a.report.fingerprint, b.report.fingerprint);
    assert_eq!(a.mesh, b.mesh);

    let mut edited = spec.clone();
    edited.floors[1].height = 3.1;
    let c = run(&edited, &lot);
    assert_ne!(a.report.fingerprint, c.report.fingerprint);
}

#[test]
fn test_shell_is_watertight() {
    let spec = house();
    let lot = PlacementContext::rectangle(Vec2::new(1.5, 2.5), 3, 2, 5.0);
    let out = run(&spec, &lot);
    assert!(out.report.diagnostics.is_empty(), "got: {:?}", out.report.diagnostics);
    assert_watertight(&out, 0.0);
}

#[test]
fn test_shell_is_watertight_on_random_lots() {
    let spec = house();
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    for _ in 0..8 {
        let lot = random_lot(&mut rng);
        assert_watertight(&run(&spec, &lot), lot.base_elevation);
        let reversed = clockwise(&lot);
        assert_watertight(&run(&spec, &reversed), lot.base_elevation);
    }
}

#[test]
fn test_walls_face_outward_for_both_windings() {
    let spec = house();
    let lot = PlacementContext::rectangle(Vec2::ZERO, 2, 2, 5.0);
    let ccw = run(&spec, &lot);
    let cw = run(&spec, &clockwise(&lot));
    assert_eq!(ccw.report.outward_sign, 1.0);
    assert_eq!(cw.report.outward_sign, -1.0);
    assert_wall_windings(&ccw);
    assert_wall_windings(&cw);

    // Outward means away from the footprint centre.
    let center = Vec3::new(5.0, 0.0, 5.0);
    for out in [&ccw, &cw] {
        for (_, buffers) in out.mesh.by_kind(SurfaceKind::Wall) {
            for (p, n) in buffers.positions.iter().zip(&buffers.normals) {
                let p = Vec3::from_array(*p);
                let away = Vec3::new(p.x - center.x, 0.0, p.z - center.z);
                assert!(Vec3::from_array(*n).dot(away) > 0.0);
            }
        }
    }
    assert_eq!(ccw.mesh.triangle_count(), cw.mesh.triangle_count());
}

/// A clockwise 10 m square whose east side steps out by 2 cm halfway down.
/// The step is its own face and too short to keep.
fn clockwise_lot_with_jog() -> PlacementContext {
    let face = |tile: u32, points: &[(f32, f32)]| FacePlacement {
        label: None,
        edges: points
            .windows(2)
            .enumerate()
            .map(|(i, w)| {
                TileEdge::new(
                    tile + i as u32,
                    Vec2::new(w[0].0, w[0].1),
                    Vec2::new(w[1].0, w[1].1),
                )
            })
            .collect(),
    };
    PlacementContext {
        faces: vec![
            face(0, &[(0.0, 0.0), (0.0, 5.0), (0.0, 10.0)]),
            face(2, &[(0.0, 10.0), (5.0, 10.0), (10.0, 10.0)]),
            face(4, &[(10.0, 10.0), (10.0, 5.0)]),
            face(5, &[(10.0, 5.0), (10.02, 5.0)]),
            face(6, &[(10.02, 5.0), (10.02, 0.0)]),
            face(7, &[(10.02, 0.0), (5.0, 0.0), (0.0, 0.0)]),
        ],
        street_clearance: Vec::new(),
        base_elevation: 0.0,
    }
}

#[test]
fn test_dropped_jog_keeps_clockwise_winding_and_roof() {
    let out = run(&house(), &clockwise_lot_with_jog());
    assert!(
        out.report
            .diagnostics
            .iter()
            .any(|d| matches!(d, FacadeError::DegenerateFace { face: 3, .. })),
        "got: {:?}",
        out.report.diagnostics
    );
    assert!(out.report.spans_of(3).is_empty());
    assert_eq!(out.report.outward_sign, -1.0);
    assert!(out.report.roof.built);
    assert_eq!(out.report.roof.rings_built, 2);
    assert!(out.mesh.kind_triangle_count(SurfaceKind::RoofCap) > 0);

    assert_wall_windings(&out);
    let center = Vec3::new(5.0, 0.0, 5.0);
    for (_, buffers) in out.mesh.by_kind(SurfaceKind::Wall) {
        for (p, n) in buffers.positions.iter().zip(&buffers.normals) {
            let p = Vec3::from_array(*p);
            let away = Vec3::new(p.x - center.x, 0.0, p.z - center.z);
            assert!(Vec3::from_array(*n).dot(away) > 0.0, "wall at {p} faces inward");
        }
    }

    // The belt runs as one closed chain across the seam, outside the walls.
    let belt = &out.report.belts[0];
    assert_eq!((belt.chains, belt.closed_chains), (1, 1));
    let xs: Vec<f32> = out
        .mesh
        .by_kind(SurfaceKind::Belt)
        .flat_map(|(_, b)| b.positions.iter().map(|p| p[0]))
        .collect();
    assert!(xs.iter().copied().fold(f32::INFINITY, f32::min) < -0.4);
    assert!(xs.iter().copied().fold(f32::NEG_INFINITY, f32::max) > 10.4);
}

#[test]
fn test_report_lists_row_spacers() {
    let spec = house();
    let out = run(&spec, &PlacementContext::rectangle(Vec2::ZERO, 2, 2, 5.0));
    let spacers = &out.report.spacers;

    // The start-anchored column sits right after the corner padding of
    // every ground floor span.
    let mandatory: Vec<_> = spacers.iter().filter(|s| s.mandatory).collect();
    assert_eq!(mandatory.len(), 4, "got: {spacers:?}");
    for spacer in &mandatory {
        assert_eq!(spacer.floor, 0);
        assert_eq!(spacer.kind, SpacerKind::Column);
        assert_eq!(spacer.left, spec.corner_padding);
        assert_eq!(spacer.width, 0.4);
    }

    // Every placed arch brings its spacer band along.
    let arches = out.report.openings.iter().filter(|o| o.window == "arch").count();
    let bands: Vec<_> = spacers.iter().filter(|s| !s.mandatory).collect();
    assert!(arches > 0);
    assert_eq!(bands.len(), arches);
    assert!(bands.iter().all(|s| s.kind == SpacerKind::Spacer && s.width == 0.3));

    let json: serde_json::Value = serde_json::from_str(&out.report.to_json().unwrap()).unwrap();
    assert_eq!(json["spacers"].as_array().map(Vec::len), Some(spacers.len()));
}

#[test]
fn test_two_bay_cycle_falls_back_to_building_default() {
    let mut spec = house();
    spec.default_material = Some(MaterialId::from("stone"));
    spec.bays = serde_json::from_str(
        r#"[ [], [ [], [ { "type": "link", "to": { "face": 1, "floor": 1, "column": 1 } },
                         { "type": "link", "to": { "face": 1, "floor": 1, "column": 0 } } ] ] ]"#,
    )
    .unwrap();
    let out = run(&spec, &PlacementContext::rectangle(Vec2::ZERO, 2, 2, 5.0));
    let cycles: Vec<_> = out
        .report
        .diagnostics
        .iter()
        .filter_map(|d| match d {
            FacadeError::CyclicBayLink { bay, cycle } => Some((*bay, cycle.len())),
            _ => None,
        })
        .collect();
    assert_eq!(cycles.len(), 2, "got: {cycles:?}");
    assert!(cycles.iter().all(|(_, len)| *len == 3));
    for (bay, _) in cycles {
        assert_eq!(out.report.bay(bay).unwrap().wall.id, MaterialId::from("stone"));
    }
}

#[test]
fn test_reveal_materials_follow_windows_layer() {
    let out = run(&house(), &PlacementContext::rectangle(Vec2::ZERO, 2, 2, 5.0));
    assert!(out.mesh.group(&MaterialId::from("stone"), SurfaceKind::Reveal).is_some());
    assert!(out.mesh.group(&MaterialId::from("stucco"), SurfaceKind::Wall).is_some());
    // The top floor has no wall material of its own.
    let top = out.report.bay(facade::spec::BayAddress::new(0, 2, 0)).unwrap();
    assert_eq!(top.wall.id, MaterialId::from("brick"));
}
