use hospital_report::loader::{load_csv, LoadOptions};
use hospital_report::output::export_all;
use hospital_report::reports::{generate_all, ObjectiveConfig, BEDS, NAME, STATE};
use hospital_report::{
    aggregate, rank, Aggregation, Cell, CleaningRule, CleaningStage, GroupKey, PipelineError,
    RecordSet, Value,
};
use std::path::Path;

fn fixture() -> RecordSet {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/hospital_directory.csv");
    let (records, report) = load_csv(path, &LoadOptions::default()).expect("fixture loads");
    assert_eq!(report.loaded_rows, 8);
    records
}

#[test]
fn test_sum_then_rank_scenario() {
    let input = RecordSet::from_rows(
        ["State", "Beds"],
        vec![
            vec![Value::text("A"), Value::text("10")],
            vec![Value::text("A"), Value::Missing],
            vec![Value::text("B"), Value::text("5")],
        ],
    );
    let cleaned = CleaningStage::new(vec![CleaningRule::coerce_numeric("Beds", 0.0)])
        .apply(&input)
        .unwrap()
        .records;
    let beds: Vec<Option<f64>> = cleaned.column("Beds").unwrap().map(Value::as_number).collect();
    assert_eq!(beds, vec![Some(10.0), Some(0.0), Some(5.0)]);

    let sums = aggregate(&cleaned, &GroupKey::new(["State"]), &Aggregation::Sum("Beds".into())).unwrap();
    let rows: Vec<Vec<Cell>> = sums.rows().map(|r| r.cells().to_vec()).collect();
    assert_eq!(
        rows,
        vec![
            vec![Cell::Text("A".into()), Cell::Float(10.0)],
            vec![Cell::Text("B".into()), Cell::Float(5.0)],
        ]
    );

    let top = rank(&sums, "Sum", Some(1), true).unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(top.row(0).unwrap().cells(), &[Cell::Text("A".into()), Cell::Float(10.0)]);
}

#[test]
fn test_uncleaned_beds_reject_sum() {
    let raw = fixture();
    let err = aggregate(&raw, &GroupKey::new([STATE]), &Aggregation::Sum(BEDS.into())).unwrap_err();
    assert!(matches!(err, PipelineError::TypeMismatch { ref field, .. } if field == BEDS));
}

#[test]
fn test_missing_rate_on_raw_and_cleaned_sets() {
    let raw = fixture();
    let cleaned = CleaningStage::new(vec![CleaningRule::drop_if_missing(NAME)])
        .apply(&raw)
        .unwrap()
        .records;
    let rate = |rs: &RecordSet| {
        aggregate(rs, &GroupKey::global(), &Aggregation::MissingRate(NAME.into()))
            .unwrap()
            .row(0)
            .and_then(|r| r.get("MissingRate").and_then(Cell::as_f64))
            .unwrap()
    };
    assert_eq!(rate(&raw), 0.125);
    assert_eq!(rate(&cleaned), 0.0);
}

#[test]
fn test_full_run_over_fixture() {
    let raw = fixture();
    let config = ObjectiveConfig {
        top_n: 2,
        histogram_bins: 4,
    };
    let reports = generate_all(&raw, &config).unwrap();

    let states: Vec<String> = reports
        .states
        .by_state
        .column_cells(STATE)
        .unwrap()
        .map(|c| c.to_string())
        .collect();
    assert_eq!(states, vec!["Kerala", "Goa", "Bihar"]);

    assert_eq!(reports.cleaning.cleaned.len(), 7);
    let top_beds = reports.beds.top_states_by_beds.row(0).unwrap();
    assert_eq!(top_beds.get(STATE), Some(&Cell::Text("Bihar".into())));
    assert_eq!(top_beds.get(BEDS), Some(&Cell::Float(2175.0)));
    assert_eq!(reports.beds.histogram.len(), 4);
    assert_eq!(reports.dashboard.summary.total_beds, 3637.0);

    let dir = tempfile::tempdir().unwrap();
    let files = export_all(dir.path(), &reports).unwrap();
    assert_eq!(files.len(), reports.tables().len() + 1);
    assert!(dir.path().join("summary.json").exists());
    assert!(dir.path().join("state_distribution.csv").exists());
}
