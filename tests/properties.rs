use hospital_report::{
    aggregate, rank, Aggregation, Cell, CleaningRule, CleaningStage, GroupKey, RecordSet, Value,
};
use proptest::prelude::*;

fn value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Missing),
        prop::sample::select(vec!["A", "B", "C", "D"]).prop_map(Value::text),
        (0u32..500).prop_map(|n| Value::Text(n.to_string())),
        Just(Value::text("n/a")),
    ]
}

fn record_set_strategy() -> impl Strategy<Value = RecordSet> {
    prop::collection::vec(
        (value_strategy(), value_strategy(), value_strategy()),
        0..40,
    )
    .prop_map(|rows| {
        RecordSet::from_rows(
            ["State", "Category", "Beds"],
            rows.into_iter().map(|(a, b, c)| vec![a, b, c]).collect(),
        )
    })
}

proptest! {
    #[test]
    fn select_is_idempotent(rs in record_set_strategy()) {
        let once = rs.select(&["Beds", "State"]).unwrap();
        let twice = once.select(&["Beds", "State"]).unwrap();
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn cleaning_is_deterministic(rs in record_set_strategy()) {
        let stage = CleaningStage::new(vec![
            CleaningRule::drop_if_missing("State"),
            CleaningRule::fill_default("Category", "Unknown"),
            CleaningRule::coerce_numeric("Beds", 0.0),
        ]);
        prop_assert_eq!(stage.apply(&rs).unwrap(), stage.apply(&rs).unwrap());
    }

    #[test]
    fn counts_add_up_to_input_rows(rs in record_set_strategy()) {
        let t = aggregate(&rs, &GroupKey::new(["State", "Category"]), &Aggregation::Count).unwrap();
        let total: i64 = t
            .column_cells("Count")
            .unwrap()
            .map(|c| match c {
                Cell::Integer(n) => *n,
                _ => 0,
            })
            .sum();
        prop_assert_eq!(total as usize, rs.len());
    }

    #[test]
    fn rank_is_stable_and_a_fixed_point(rs in record_set_strategy(), limit in prop::option::of(0usize..6)) {
        let counts = aggregate(&rs, &GroupKey::new(["Category"]), &Aggregation::Count).unwrap();
        let ranked = rank(&counts, "Count", None, true).unwrap();

        // Equal counts keep the order in which their groups first appeared.
        let order_in = |t: &hospital_report::ReportTable| -> Vec<(i64, String)> {
            t.rows()
                .map(|r| {
                    let n = r.get("Count").and_then(Cell::as_f64).unwrap_or(0.0) as i64;
                    let k = r.get("Category").map(|c| c.to_string()).unwrap_or_default();
                    (n, k)
                })
                .collect()
        };
        let input_order = order_in(&counts);
        let ranked_order = order_in(&ranked);
        for pair in ranked_order.windows(2) {
            prop_assert!(pair[0].0 >= pair[1].0);
            if pair[0].0 == pair[1].0 {
                let pos = |k: &(i64, String)| input_order.iter().position(|x| x == k);
                prop_assert!(pos(&pair[0]) < pos(&pair[1]));
            }
        }

        let limited = rank(&counts, "Count", limit, true).unwrap();
        prop_assert_eq!(&rank(&limited, "Count", limit, true).unwrap(), &limited);
    }

    #[test]
    fn missing_rate_is_bounded(rs in record_set_strategy()) {
        let t = aggregate(&rs, &GroupKey::global(), &Aggregation::MissingRate("Beds".into())).unwrap();
        let rate = t.row(0).and_then(|r| r.get("MissingRate")).and_then(Cell::as_f64).unwrap();
        prop_assert!((0.0..=1.0).contains(&rate));

        let missing = rs.column("Beds").unwrap().filter(|v| v.is_missing()).count();
        prop_assert_eq!(rate == 0.0, missing == 0);
        prop_assert_eq!(rate == 1.0, !rs.is_empty() && missing == rs.len());
    }
}
