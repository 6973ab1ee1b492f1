//! Property-based tests for row building and chunk sizing invariants.

use std::collections::BTreeMap;

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use tl_common::{Column, Event, LogicalType, Value};
use tl_core::estimate::{portion, DefaultEstimator};
use tl_core::rows::build_rows;
use tl_core::schema::FieldMapping;

fn mapping(with_others: bool) -> FieldMapping {
    let mut entries = BTreeMap::from([
        (
            ".timestamp".to_string(),
            Column::new("ts", LogicalType::Timestamp, false),
        ),
        (".input".to_string(), Column::new("tag", LogicalType::Text, false)),
        ("log".to_string(), Column::new("msg", LogicalType::Text, true)),
        ("count".to_string(), Column::new("n", LogicalType::Uint64, true)),
        ("body".to_string(), Column::new("raw", LogicalType::Bytes, true)),
    ]);
    if with_others {
        entries.insert(
            ".others".to_string(),
            Column::new("rest", LogicalType::Json, true),
        );
    }
    FieldMapping::new(entries).expect("valid mapping")
}

fn arb_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Nil),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        any::<u64>().prop_map(Value::Uint),
        "[a-z0-9 ]{0,40}".prop_map(Value::Str),
        prop::collection::vec(any::<u8>(), 0..32).prop_map(Value::Bytes),
    ]
}

fn arb_message() -> impl Strategy<Value = BTreeMap<String, Value>> {
    prop::collection::btree_map(
        prop_oneof![
            Just("log".to_string()),
            Just("count".to_string()),
            Just("body".to_string()),
            "[a-z]{1,8}",
        ],
        arb_value(),
        0..6,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // ── Row arity ────────────────────────────────────────────────────

    /// Every built row carries exactly one cell per mapped column.
    #[test]
    fn row_arity_matches_mapping(
        messages in prop::collection::vec(arb_message(), 0..20),
        with_others in any::<bool>(),
    ) {
        let mapping = mapping(with_others);
        let events: Vec<Event> = messages
            .into_iter()
            .map(|message| {
                let mut e = Event::new(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(), "app");
                e.message = message;
                e
            })
            .collect();

        let built = build_rows(&events, &mapping, &DefaultEstimator).unwrap();
        prop_assert_eq!(built.rows.len(), events.len());
        for row in &built.rows {
            prop_assert_eq!(row.len(), mapping.column_count());
            let names: Vec<&str> = row.column_names().collect();
            prop_assert_eq!(names[0], "ts");
            prop_assert_eq!(names[1], "tag");
        }
        prop_assert!(built.max_row_bytes >= 1);
    }

    // ── Portion bounds ───────────────────────────────────────────────

    /// A portion is never zero for a non-empty batch and never exceeds it.
    #[test]
    fn portion_is_bounded(
        ceiling in 0usize..100_000_000,
        max_row_bytes in 0usize..10_000_000,
        total in 1usize..100_000,
    ) {
        let p = portion(ceiling, max_row_bytes, total);
        prop_assert!(p >= 1);
        prop_assert!(p <= total);
    }

    /// Chunks of a portion never exceed the ceiling unless a single row does.
    #[test]
    fn portion_respects_ceiling(
        ceiling in 1usize..100_000_000,
        max_row_bytes in 1usize..10_000_000,
        total in 1usize..100_000,
    ) {
        let p = portion(ceiling, max_row_bytes, total);
        if p > 1 {
            prop_assert!(p * max_row_bytes <= ceiling);
        }
    }

    /// The chunk loop covers every row exactly once.
    #[test]
    fn chunks_cover_all_rows(
        ceiling in 1usize..10_000,
        max_row_bytes in 1usize..1_000,
        total in 0usize..500,
    ) {
        let p = portion(ceiling, max_row_bytes, total);
        let mut covered = 0;
        let mut position = 0;
        while position < total {
            let end = (position + p).min(total);
            prop_assert!(end > position);
            covered += end - position;
            position = end;
        }
        prop_assert_eq!(covered, total);
    }
}
