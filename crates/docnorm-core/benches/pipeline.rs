use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::{json, Value};

use docnorm_core::{compute_identity, Dataset, Pipeline, PipelineConfig};

fn records(n: usize) -> Vec<Value> {
    (0..n)
        .map(|i| {
            json!({
                "name": format!(" person {} ", i),
                "status": if i % 3 == 0 { "Active" } else { "inactive" },
                "country": ["no", "se", "Norway", "dk"][i % 4],
                "age": i % 90,
                "noise": {"row": i, "tags": ["a", "b"]}
            })
        })
        .collect()
}

fn config() -> PipelineConfig {
    serde_json::from_value(json!({
        "fields_to_keep": ["name", "status", "country", "age"],
        "normalization_map": {
            "name": {"dynamic_rules": [{"if": {"apply_function": "trim"}}]},
            "status": {
                "value_mappings": {"\"Active\"": "active"},
                "dynamic_rules": [{"if": {"$regex": "^inact"}, "then": "inactive"}],
                "default": "UNKNOWN"
            },
            "country": {
                "value_mappings": {"\"Norway\"": "NO"},
                "dynamic_rules": [{"if": {"apply_function": "to_uppercase"}}]
            }
        },
        "grouping": {"id": "id", "profile": {"name": "name", "age": "age"}, "meta": {"status": "status", "country": "country"}}
    }))
    .expect("bench config")
}

fn bench_pipeline(c: &mut Criterion) {
    let pipeline = Pipeline::new(&config()).expect("valid config");
    let dataset = Dataset::Records(records(1_000));

    c.bench_function("pipeline_1k_records", |b| {
        b.iter(|| pipeline.run(black_box(&dataset)))
    });
}

fn bench_identity(c: &mut Criterion) {
    let record = records(1).remove(0);
    c.bench_function("compute_identity", |b| {
        b.iter(|| compute_identity(black_box(&record)))
    });
}

criterion_group!(benches, bench_pipeline, bench_identity);
criterion_main!(benches);
