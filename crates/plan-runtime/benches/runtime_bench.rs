use criterion::{black_box, criterion_group, criterion_main, Criterion};
use persistence::MemoryStorage;
use plan_core::PlannerConfig;
use plan_runtime::{open_session, run_scenario, Scenario};
use serde_json::json;
use std::time::{Duration, Instant};

fn scenario() -> Scenario {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../assets/scenarios/cevicheria_valle.yaml");
    Scenario::load(path).unwrap()
}

fn bench_edits(c: &mut Criterion) {
    let scenario = scenario();
    let mut ctl = open_session(Box::new(MemoryStorage::new()), PlannerConfig::default());
    let start = Instant::now();
    run_scenario(&mut ctl, &scenario, start).unwrap();
    let mut t = start;
    let mut rent = 1500u64;
    c.bench_function("edit + tick with debounced persist", |b| {
        b.iter(|| {
            rent = 1500 + (rent + 7) % 500;
            t += Duration::from_millis(400);
            ctl.edit("fixed_costs.rent", json!(rent), t).unwrap();
            ctl.tick(black_box(t)).unwrap();
        })
    });
}

fn bench_walk(c: &mut Criterion) {
    let scenario = scenario();
    c.bench_function("scenario walk to analysis", |b| {
        b.iter(|| {
            let mut ctl = open_session(Box::new(MemoryStorage::new()), PlannerConfig::default());
            let walk = run_scenario(&mut ctl, black_box(&scenario), Instant::now()).unwrap();
            black_box(walk.reached)
        })
    });
}

criterion_group!(benches, bench_edits, bench_walk);
criterion_main!(benches);
