//! # Property-Based Tests
//!
//! Id assignment, filter laws and the text encoding, checked with proptest.

use proptest::collection::vec;
use proptest::prelude::*;
use sensornet_core::{
    Engine, Fields, Frame, Predicate, Predicates, QueryEngine, RowId, Table, Value,
    table_from_bytes, table_to_bytes,
};
use std::collections::BTreeSet;

fn named(name: &str) -> Fields {
    let mut fields = Fields::new();
    fields.insert("name".to_string(), Value::from(name));
    fields
}

fn engine_with_stations(n: usize) -> Engine {
    let mut engine = Engine::new();
    for i in 0..n {
        engine
            .insert(Table::Station, named(&format!("s{}", i)))
            .expect("insert");
    }
    engine
}

fn record_frame(values: &[i64]) -> Frame {
    let rows = values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            vec![
                Value::Integer(i as i64),
                Value::Text(format!("t{}", i)),
                Value::Integer(*v),
                Value::Integer(v.rem_euclid(3)),
            ]
        })
        .collect();
    Frame::with_rows(Table::Record.fields().iter().copied(), rows).expect("frame")
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// Inserting N rows into an empty table yields ids 0..N-1.
    #[test]
    fn sequential_inserts_yield_dense_ids(n in 1usize..40) {
        let engine = engine_with_stations(n);
        let expected: Vec<RowId> = (0..n as u64).map(RowId).collect();
        prop_assert_eq!(engine.store().get_all(Table::Station).ids(), expected);
    }

    /// The next id is always one past the current maximum.
    #[test]
    fn next_id_follows_current_max(
        n in 1usize..30,
        doomed in vec(0u64..30, 0..10),
    ) {
        let mut engine = engine_with_stations(n);
        let doomed: Vec<RowId> = doomed.into_iter().map(RowId).collect();
        engine.delete(Table::Station, &doomed).expect("delete");

        let expected = engine
            .store()
            .get_all(Table::Station)
            .ids()
            .into_iter()
            .max()
            .map_or(RowId(0), RowId::next);
        let id = engine.insert(Table::Station, named("late")).expect("insert");
        prop_assert_eq!(id, expected);
    }

    /// Deleting the max row then inserting hands out the same id.
    #[test]
    fn deleted_max_id_is_reused(n in 1usize..30) {
        let mut engine = engine_with_stations(n);
        let max = RowId(n as u64 - 1);

        prop_assert_eq!(engine.delete(Table::Station, &[max]).expect("delete"), 1);
        prop_assert_eq!(engine.insert(Table::Station, named("again")).expect("insert"), max);
    }

    /// Filtering returns an order-preserving subsequence.
    #[test]
    fn filter_is_subsequence(
        values in vec(-50i64..50, 0..60),
        low in -50i64..50,
        span in 0i64..40,
    ) {
        let frame = record_frame(&values);
        let mut predicates = Predicates::new();
        predicates.insert("measured_value".to_string(), Predicate::range(low, low + span));

        let out = QueryEngine::filter(&frame, Table::Record, &predicates).expect("filter");

        let ids = out.ids();
        prop_assert!(ids.windows(2).all(|w| w[0] < w[1]));
        for row in 0..out.len() {
            let v = out.value(row, "measured_value").cloned().unwrap_or_default();
            prop_assert!(matches!(v, Value::Integer(x) if x >= low && x <= low + span));
        }
        let expected = values.iter().filter(|&&v| v >= low && v <= low + span).count();
        prop_assert_eq!(out.len(), expected);
    }

    /// Conjunction equals filtering twice.
    #[test]
    fn conjunction_equals_composition(
        values in vec(-20i64..20, 0..60),
        key in 0i64..3,
        cap in -20i64..20,
    ) {
        let frame = record_frame(&values);
        let by_key = Predicate::exact(key);
        let by_cap = Predicate::at_most(cap);

        let mut both = Predicates::new();
        both.insert("sensor_id".to_string(), by_key.clone());
        both.insert("measured_value".to_string(), by_cap.clone());
        let combined = QueryEngine::filter(&frame, Table::Record, &both).expect("both");

        let mut first = Predicates::new();
        first.insert("sensor_id".to_string(), by_key);
        let mut second = Predicates::new();
        second.insert("measured_value".to_string(), by_cap);
        let staged = QueryEngine::filter(&frame, Table::Record, &first).expect("first");
        let staged = QueryEngine::filter(&staged, Table::Record, &second).expect("second");

        prop_assert_eq!(combined, staged);
    }

    /// Set membership on ids returns exactly the present ids.
    #[test]
    fn id_membership_returns_present_ids(n in 0usize..30, wanted in vec(0u64..40, 0..15)) {
        let engine = engine_with_stations(n);
        let mut predicates = Predicates::new();
        predicates.insert("id".to_string(), Predicate::any(wanted.iter().copied()));

        let out = engine.query::<&str>(Table::Station, &predicates, None).expect("query");

        let expected: Vec<RowId> = wanted
            .iter()
            .filter(|&&id| id < n as u64)
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(RowId)
            .collect();
        prop_assert_eq!(out.ids(), expected);
    }

    /// Text cells survive encoding, including embedded delimiters.
    #[test]
    fn text_cells_roundtrip(
        names in vec("[a-zA-Z][a-zA-Z ,;]{0,10}", 0..20),
        delimiter in prop::sample::select(vec![b',', b';', b'\t', b'|']),
    ) {
        let rows = names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                vec![
                    Value::Integer(i as i64),
                    Value::from(name.as_str()),
                    Value::Null,
                    Value::Integer(1),
                ]
            })
            .collect();
        let frame =
            Frame::with_rows(Table::Station.fields().iter().copied(), rows).expect("frame");

        let bytes = table_to_bytes(&frame, delimiter).expect("encode");
        let restored = table_from_bytes(Table::Station, &bytes, delimiter).expect("decode");

        prop_assert_eq!(restored, frame);
    }

    /// Whatever text is inserted, the stored table equals its reloaded copy.
    #[test]
    fn inserted_values_equal_reloaded_values(
        names in vec(
            prop_oneof!["\\PC{0,12}", "0[0-9]{0,6}", "-?[0-9]{1,4}\\.[0-9]{0,3}"],
            1..12,
        ),
        altitude in prop_oneof![
            any::<i64>().prop_map(Value::Integer),
            (-1e19f64..1e19).prop_map(Value::Float),
        ],
        delimiter in prop::sample::select(vec![b',', b';', b'\t', b'|']),
    ) {
        let mut engine = Engine::new();
        for name in &names {
            let mut fields = named(name);
            fields.insert("region".to_string(), altitude.clone());
            engine.insert(Table::Station, fields).expect("insert");
        }
        let frame = engine.store().get_all(Table::Station);

        let bytes = table_to_bytes(frame, delimiter).expect("encode");
        let restored = table_from_bytes(Table::Station, &bytes, delimiter).expect("decode");

        prop_assert_eq!(&restored, frame);
    }
}
