//! # Query Benchmarks
//!
//! Filter and union view throughput over a populated store.
//!
//! Run with: `cargo bench -p sensornet-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use sensornet_core::{
    Fields, JoinEngine, MutationEngine, Predicate, Predicates, QueryEngine, Table, TableStore,
    Value,
};
use std::hint::black_box;

fn field(pairs: &[(&str, Value)]) -> Fields {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect()
}

/// One station, ten places, one sensor per place, `records` readings
/// spread across the sensors.
fn populated_store(records: usize) -> TableStore {
    let mut store = TableStore::new();
    MutationEngine::insert(
        &mut store,
        Table::Station,
        field(&[("name", "Summit".into()), ("region", "Alpine".into())]),
    )
    .expect("station");

    for p in 0..10i64 {
        MutationEngine::insert(
            &mut store,
            Table::Place,
            field(&[("place_code", format!("P-{}", p).into()), ("station_id", 0.into())]),
        )
        .expect("place");
        MutationEngine::insert(
            &mut store,
            Table::Sensor,
            field(&[("sensor_type", "temperature".into()), ("place_id", p.into())]),
        )
        .expect("sensor");
    }

    for r in 0..records {
        let r = r as i64;
        MutationEngine::insert(
            &mut store,
            Table::Record,
            field(&[
                ("timestamp", format!("t{}", r).into()),
                ("measured_value", (r % 100).into()),
                ("sensor_id", (r % 10).into()),
            ]),
        )
        .expect("record");
    }

    store
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter");

    let mut predicates = Predicates::new();
    predicates.insert("measured_value".to_string(), Predicate::range(10, 40));
    predicates.insert("sensor_id".to_string(), Predicate::any([1, 3, 5]));

    for size in [100, 1000, 10000].iter() {
        let store = populated_store(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                QueryEngine::filter(
                    black_box(store.get_all(Table::Record)),
                    Table::Record,
                    &predicates,
                )
            });
        });
    }

    group.finish();
}

fn bench_union_view(c: &mut Criterion) {
    let mut group = c.benchmark_group("union_view");

    for size in [100, 1000, 10000].iter() {
        let store = populated_store(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| JoinEngine::union_view(black_box(&store), Table::Record));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_filter, bench_union_view);
criterion_main!(benches);
