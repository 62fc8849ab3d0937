//! Facade compile benchmarks.
//!
//! Measures a full compile of a mid-rise block at growing footprint sizes,
//! plus the planning stage alone (spans, layouts, bay resolution).
//!
//! Run with: `cargo bench -p facade --bench compile_bench`

use bevy::math::Vec2;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use facade::{compile, BuildingSpec, CompileJob, FacadeParams, MaterialRegistry, PlacementContext};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// A building with `floors` identical storeys over a shop floor.
fn block_spec(floors: usize) -> BuildingSpec {
    let upper = r#"{ "height": 3.0, "layers": [
        { "kind": "wall", "material": "brick" },
        { "kind": "windows", "row": {
            "pattern": [ { "window": "sash" }, { "window": "arch" } ],
            "min_spacing": 0.8, "inset": 0.2 } } ] }"#;
    let mut storeys = vec![
        r#"{ "height": 4.0, "layers": [
            { "kind": "wall", "material": "stone" },
            { "kind": "windows", "row": {
                "pattern": [ { "window": "door" }, { "window": "shop" } ],
                "min_spacing": 0.6, "inset": 0.25 } } ] }"#
            .to_string(),
    ];
    storeys.extend(std::iter::repeat(upper.to_string()).take(floors));
    let json = format!(
        r#"{{
            "floors": [ {} ],
            "window_catalog": [
                {{ "id": "door", "width": 1.2, "height": 2.4, "sill_height": 0.0 }},
                {{ "id": "shop", "width": 2.4, "height": 2.6, "sill_height": 0.5,
                   "muntins": {{ "columns": 3, "rows": 2, "width": 0.04 }} }},
                {{ "id": "sash", "width": 1.1, "height": 1.7, "sill_height": 0.8,
                   "muntins": {{ "columns": 2, "rows": 3, "width": 0.03 }},
                   "shade": {{ "direction": "top_to_bottom", "coverage": 0.3 }} }},
                {{ "id": "arch", "width": 1.1, "height": 1.9, "sill_height": 0.8,
                   "style": {{ "type": "arched", "rise": 0.55 }} }}
            ],
            "materials": {{ "brick": {{}}, "stone": {{}} }},
            "belts": [ {{ "bottom": 3.85, "top": 4.15, "depth": 0.25 }} ],
            "roof_rings": [ {{ "height": 0.9, "inset": 0.0 }}, {{ "height": 0.6, "inset": 0.8 }} ]
        }}"#,
        storeys.join(",")
    );
    BuildingSpec::from_json_str(&json).unwrap_or_else(|e| panic!("bench spec: {e}"))
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_full_compile(c: &mut Criterion) {
    let spec = block_spec(5);
    let registry = MaterialRegistry::default();
    let params = FacadeParams::default();
    let mut group = c.benchmark_group("compile");
    for tiles in [2u32, 6, 12] {
        let lot = PlacementContext::rectangle(Vec2::ZERO, tiles, tiles / 2 + 1, 6.0);
        group.bench_with_input(BenchmarkId::from_parameter(tiles), &lot, |b, lot| {
            b.iter(|| compile(black_box(&spec), black_box(lot), &registry, &params));
        });
    }
    group.finish();
}

fn bench_planning(c: &mut Criterion) {
    let spec = block_spec(12);
    let registry = MaterialRegistry::default();
    let params = FacadeParams::default();
    let lot = PlacementContext::rectangle(Vec2::ZERO, 12, 6, 6.0);
    c.bench_function("plan_only", |b| {
        b.iter(|| CompileJob::new(black_box(&spec), black_box(&lot), &registry, &params).is_ok());
    });
}

criterion_group!(benches, bench_full_compile, bench_planning);
criterion_main!(benches);
