use super::*;
use crate::error::FacadeError;
use crate::mesh::SurfaceKind;
use crate::spec::{BayAddress, BayContent, BuildingSpec, MaterialId};

fn spec(json: &str) -> BuildingSpec {
    BuildingSpec::from_json_str(json).unwrap()
}

const BASE: &str = r#"{
    "floors": [
        { "height": 3.0, "layers": [ { "kind": "wall", "material": "brick" } ] },
        { "height": 3.0 }
    ],
    "default_material": "plaster"
}"#;

fn with_bays(mut s: BuildingSpec, bays: Vec<Vec<Vec<BayContent>>>) -> BuildingSpec {
    s.bays = bays;
    s
}

#[test]
fn test_wall_resolution_order() {
    let registry = MaterialRegistry::default();
    let s = with_bays(
        spec(BASE),
        vec![vec![vec![
            BayContent::Own {
                material: Some(MaterialId::from("stone")),
            },
            BayContent::Own { material: None },
        ]]],
    );
    let resolver = MaterialResolver::new(&s, &registry);
    let mut diags = Vec::new();

    let overridden = resolver.resolve_bay(BayAddress::new(0, 0, 0), &mut diags);
    assert_eq!(resolver.wall(&overridden).id, MaterialId::from("stone"));

    let layer = resolver.resolve_bay(BayAddress::new(0, 0, 1), &mut diags);
    let r = resolver.wall(&layer);
    assert_eq!(r.id, MaterialId::from("brick"));
    assert_eq!(r.source, MaterialSource::LayerDefault);

    // Floor 1 has no wall layer.
    let building = resolver.resolve_bay(BayAddress::new(0, 1, 0), &mut diags);
    let r = resolver.wall(&building);
    assert_eq!(r.id, MaterialId::from("plaster"));
    assert_eq!(r.source, MaterialSource::BuildingDefault);
    assert!(diags.is_empty());
}

#[test]
fn test_global_fallback_without_building_default() {
    let registry = MaterialRegistry::default();
    let mut s = spec(BASE);
    s.default_material = None;
    let resolver = MaterialResolver::new(&s, &registry);
    let mut diags = Vec::new();
    let bay = resolver.resolve_bay(BayAddress::new(0, 1, 3), &mut diags);
    let r = resolver.wall(&bay);
    assert_eq!(&r.id, registry.fallback_for(SurfaceKind::Wall));
    assert_eq!(r.source, MaterialSource::GlobalFallback);
}

#[test]
fn test_link_follows_to_master() {
    let registry = MaterialRegistry::default();
    let s = with_bays(
        spec(BASE),
        vec![vec![
            vec![BayContent::Own {
                material: Some(MaterialId::from("stone")),
            }],
            vec![
                BayContent::Link {
                    to: BayAddress::new(0, 0, 0),
                },
                BayContent::Link {
                    to: BayAddress::new(0, 1, 0),
                },
            ],
        ]],
    );
    let resolver = MaterialResolver::new(&s, &registry);
    let chained = resolver.walk_bay(BayAddress::new(0, 1, 1)).unwrap();
    assert_eq!(chained.master, BayAddress::new(0, 0, 0));
    let r = resolver.wall(&chained);
    assert_eq!(r.id, MaterialId::from("stone"));
    assert_eq!(
        r.source,
        MaterialSource::BayOverride {
            master: BayAddress::new(0, 0, 0)
        }
    );
}

#[test]
fn test_two_bay_cycle_uses_building_default() {
    let registry = MaterialRegistry::default();
    let s = with_bays(
        spec(BASE),
        vec![vec![vec![
            BayContent::Link {
                to: BayAddress::new(0, 0, 1),
            },
            BayContent::Link {
                to: BayAddress::new(0, 0, 0),
            },
            BayContent::Link {
                to: BayAddress::new(0, 0, 0),
            },
        ]]],
    );
    let resolver = MaterialResolver::new(&s, &registry);
    let all = resolver.resolve_all((0..3).map(|c| BayAddress::new(0, 0, c)));

    for c in 0..3 {
        let r = all.wall(BayAddress::new(0, 0, c)).unwrap();
        assert_eq!(r.id, MaterialId::from("plaster"), "bay {c}");
    }
    let cyclic: Vec<BayAddress> = all
        .diagnostics
        .iter()
        .filter_map(|d| match d {
            FacadeError::CyclicBayLink { bay, .. } => Some(*bay),
            _ => None,
        })
        .collect();
    assert_eq!(cyclic.len(), 3, "got: {:?}", all.diagnostics);
    if let FacadeError::CyclicBayLink { cycle, .. } = &all.diagnostics[0] {
        assert_eq!(cycle.first(), cycle.last());
        assert_eq!(cycle.len(), 3);
    }
}

#[test]
fn test_reveal_prefers_window_layer_material() {
    let registry = MaterialRegistry::default();
    let s = spec(
        r#"{
        "floors": [ { "height": 3.0, "layers": [
            { "kind": "wall", "material": "brick" },
            { "kind": "windows", "material": "sandstone", "row": { "pattern": [] } }
        ] } ]
    }"#,
    );
    let resolver = MaterialResolver::new(&s, &registry);
    let mut diags = Vec::new();
    let bay = resolver.resolve_bay(BayAddress::new(0, 0, 0), &mut diags);
    assert_eq!(resolver.reveal(&bay).id, MaterialId::from("sandstone"));
    assert_eq!(resolver.wall(&bay).id, MaterialId::from("brick"));
}

#[test]
fn test_window_layer_resolution() {
    let registry = MaterialRegistry::default();
    let s = spec(
        r#"{
        "floors": [ { "height": 3.0 } ],
        "window_catalog": [ { "id": "w", "width": 1.0, "height": 1.5, "sill_height": 0.9,
            "frame_material": "oak", "layers": { "glass": { "material": "tinted" } } } ]
    }"#,
    );
    let resolver = MaterialResolver::new(&s, &registry);
    let def = s.window("w").unwrap();
    assert_eq!(resolver.window_layer(def, SurfaceKind::WindowGlass).id, MaterialId::from("tinted"));
    assert_eq!(resolver.window_layer(def, SurfaceKind::WindowFrame).id, MaterialId::from("oak"));
    assert_eq!(resolver.window_layer(def, SurfaceKind::WindowMuntin).id, MaterialId::from("oak"));
    assert_eq!(
        &resolver.window_layer(def, SurfaceKind::WindowShade).id,
        registry.fallback_for(SurfaceKind::WindowShade)
    );
}

#[test]
fn test_spec_table_shadows_registry() {
    let mut registry = MaterialRegistry::default();
    registry.insert(MaterialId::from("brick"), PbrMapSet::tinted([1.0, 0.0, 0.0, 1.0]));
    let mut s = spec(BASE);
    s.materials
        .insert(MaterialId::from("brick"), PbrMapSet::tinted([0.0, 1.0, 0.0, 1.0]));
    let resolver = MaterialResolver::new(&s, &registry);
    let set = resolver.get(&MaterialId::from("brick")).unwrap();
    assert_eq!(set.tint, [0.0, 1.0, 0.0, 1.0]);
}

#[test]
fn test_wall_slug_classifier() {
    assert!(is_wall_slug("red_brick_03"));
    assert!(is_wall_slug("concrete_wall_006"));
    assert!(is_wall_slug("roof_tiles_wall"));
    assert!(!is_wall_slug("roof_tiles_14"));
    assert!(!is_wall_slug("aerial_grass_rock"));
    assert!(!is_wall_slug("forest_leaves"));
}

#[test]
fn test_manifest_import() {
    let json = r#"{
        "version": 1,
        "failures": 1,
        "materials": [
            { "slug": "red_brick_03", "zip": "downloads/red_brick_03_1k.zip", "is_wall": true,
              "basecolor": "textures/red_brick_03_diff_1k.jpg",
              "normal_gl": "textures/red_brick_03_nor_gl_1k.png",
              "arm": "textures/red_brick_03_arm_1k.jpg", "extra_files": [] },
            { "slug": "half_done", "basecolor": "textures/half_done_diff_1k.jpg" }
        ]
    }"#;
    let registry = MaterialRegistry::from_manifest_json(json, "pbr").unwrap();
    let brick = registry.get(&MaterialId::from("red_brick_03")).unwrap();
    assert_eq!(brick.basecolor.as_deref(), Some("pbr/red_brick_03/basecolor.jpg"));
    assert_eq!(brick.normal_gl.as_deref(), Some("pbr/red_brick_03/normal_gl.png"));
    assert_eq!(brick.arm.as_deref(), Some("pbr/red_brick_03/arm.jpg"));
    assert!(brick.is_wall);
    assert!(!registry.contains(&MaterialId::from("half_done")));
    assert!(registry.contains(registry.fallback_for(SurfaceKind::WindowGlass)));
}

#[test]
fn test_manifest_newer_version_rejected() {
    let err = MaterialRegistry::from_manifest_json(r#"{ "version": 7, "materials": [] }"#, "pbr")
        .unwrap_err();
    let msg = format!("{err}");
    assert!(msg.contains("v7"), "got: {msg}");
}
