//! Ordered per-field repair rules and the missing-data diagnostic.

use crate::error::{Result, Stage};
use crate::record_set::{value_at, Record, RecordSet};
use crate::report::{Cell, Column, ColumnType, ReportTable};
use crate::types::Value;
use crate::util::parse_f64_safe;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub enum CleaningRule {
    DropIfMissing(String),
    FillDefault(String, Value),
    /// Unparsable or missing values become the default. Never an error.
    CoerceNumeric(String, f64),
    /// As `CoerceNumeric`, then truncated toward zero.
    CoerceInteger(String, f64),
}

impl CleaningRule {
    pub fn drop_if_missing(field: impl Into<String>) -> Self {
        CleaningRule::DropIfMissing(field.into())
    }

    pub fn fill_default(field: impl Into<String>, value: impl Into<Value>) -> Self {
        CleaningRule::FillDefault(field.into(), value.into())
    }

    pub fn coerce_numeric(field: impl Into<String>, default: f64) -> Self {
        CleaningRule::CoerceNumeric(field.into(), default)
    }

    pub fn coerce_integer(field: impl Into<String>, default: f64) -> Self {
        CleaningRule::CoerceInteger(field.into(), default)
    }

    pub fn field(&self) -> &str {
        match self {
            CleaningRule::DropIfMissing(f)
            | CleaningRule::FillDefault(f, _)
            | CleaningRule::CoerceNumeric(f, _)
            | CleaningRule::CoerceInteger(f, _) => f,
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            CleaningRule::DropIfMissing(_) => "drop-if-missing",
            CleaningRule::FillDefault(..) => "fill-default",
            CleaningRule::CoerceNumeric(..) => "coerce-numeric",
            CleaningRule::CoerceInteger(..) => "coerce-integer",
        }
    }
}

/// How many rows one rule touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleEffect {
    pub field: String,
    pub action: &'static str,
    pub affected: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CleanOutcome {
    pub records: RecordSet,
    pub effects: Vec<RuleEffect>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleaningStage {
    rules: Vec<CleaningRule>,
}

impl CleaningStage {
    pub fn new(rules: Vec<CleaningRule>) -> Self {
        CleaningStage { rules }
    }

    /// Apply every rule in declaration order; each sees the previous output.
    pub fn apply(&self, input: &RecordSet) -> Result<CleanOutcome> {
        // Every field resolves before any rule runs.
        let idxs = self
            .rules
            .iter()
            .map(|r| input.field_index(r.field(), Stage::Clean))
            .collect::<Result<Vec<_>>>()?;

        let mut current = input.clone();
        let mut effects = Vec::with_capacity(self.rules.len());
        for (rule, idx) in self.rules.iter().zip(idxs) {
            let (next, affected) = apply_rule(rule, idx, &current);
            debug!(
                field = rule.field(),
                action = rule.action(),
                affected,
                rows = next.len(),
                "Applied cleaning rule"
            );
            effects.push(RuleEffect {
                field: rule.field().to_string(),
                action: rule.action(),
                affected,
            });
            current = next;
        }
        Ok(CleanOutcome {
            records: current,
            effects,
        })
    }
}

fn apply_rule(rule: &CleaningRule, idx: usize, input: &RecordSet) -> (RecordSet, usize) {
    match rule {
        CleaningRule::DropIfMissing(_) => {
            let rows: Vec<Record> = input
                .rows()
                .filter(|r| !value_at(r, idx).is_missing())
                .cloned()
                .collect();
            let dropped = input.len() - rows.len();
            (input.with_rows(rows), dropped)
        }
        CleaningRule::FillDefault(_, value) => {
            let mut filled = 0usize;
            let rows = input
                .rows()
                .map(|r| {
                    if value_at(r, idx).is_missing() {
                        filled += 1;
                        set_value(r, idx, value.clone())
                    } else {
                        r.clone()
                    }
                })
                .collect();
            (input.with_rows(rows), filled)
        }
        CleaningRule::CoerceNumeric(_, default) | CleaningRule::CoerceInteger(_, default) => {
            let truncate = matches!(rule, CleaningRule::CoerceInteger(..));
            let mut substituted = 0usize;
            let rows = input
                .rows()
                .map(|r| {
                    let parsed = match value_at(r, idx) {
                        Value::Number(n) => Some(*n),
                        Value::Text(s) => parse_f64_safe(Some(s)),
                        Value::Missing => None,
                    };
                    let n = parsed.unwrap_or_else(|| {
                        substituted += 1;
                        *default
                    });
                    // `+ 0.0` folds the -0.0 that truncating (-1, 0) leaves.
                    let n = if truncate { n.trunc() + 0.0 } else { n };
                    set_value(r, idx, Value::Number(n))
                })
                .collect();
            (input.with_rows(rows), substituted)
        }
    }
}

fn set_value(record: &Record, idx: usize, value: Value) -> Record {
    let mut out = record.clone();
    if out.len() <= idx {
        out.resize(idx + 1, Value::Missing);
    }
    out[idx] = value;
    out
}

/// Per-field missing counts and percentages (0-100) over `input`.
///
/// Runs on any record set, so it can describe raw data before cleaning and
/// confirm the result after.
pub fn missing_report(input: &RecordSet, fields: &[&str]) -> Result<ReportTable> {
    let idxs = fields
        .iter()
        .map(|f| input.field_index(f, Stage::MissingReport))
        .collect::<Result<Vec<_>>>()?;
    let total = input.len();
    let rows = fields
        .iter()
        .zip(idxs)
        .map(|(field, idx)| {
            let missing = input.rows().filter(|r| value_at(r, idx).is_missing()).count();
            let pct = if total == 0 {
                0.0
            } else {
                missing as f64 / total as f64 * 100.0
            };
            vec![
                Cell::Text(field.to_string()),
                Cell::Integer(missing as i64),
                Cell::Float(pct),
            ]
        })
        .collect();
    ReportTable::new(
        "missing_data",
        vec![
            Column::new("Column", ColumnType::Text),
            Column::new("Missing Count", ColumnType::Integer),
            Column::new("Missing Percentage", ColumnType::Float),
        ],
        rows,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;

    fn raw() -> RecordSet {
        RecordSet::from_rows(
            ["Name", "Phone", "Beds"],
            vec![
                vec![Value::text("One"), Value::Missing, Value::text("10")],
                vec![Value::Missing, Value::text("555"), Value::text("abc")],
                vec![Value::text("Three"), Value::text("777"), Value::Missing],
                vec![Value::text("Four")],
            ],
        )
    }

    #[test]
    fn test_drop_if_missing_keeps_order() {
        let stage = CleaningStage::new(vec![CleaningRule::drop_if_missing("Name")]);
        let out = stage.apply(&raw()).unwrap();
        let names: Vec<String> = out.records.column("Name").unwrap().map(|v| v.to_string()).collect();
        assert_eq!(names, vec!["One", "Three", "Four"]);
        assert_eq!(out.effects[0].affected, 1);
    }

    #[test]
    fn test_fill_default_only_touches_missing() {
        let stage = CleaningStage::new(vec![CleaningRule::fill_default("Phone", "Not Available")]);
        let out = stage.apply(&raw()).unwrap();
        let phones: Vec<String> = out.records.column("Phone").unwrap().map(|v| v.to_string()).collect();
        assert_eq!(phones, vec!["Not Available", "555", "777", "Not Available"]);
        assert_eq!(out.effects[0].affected, 2);
    }

    #[test]
    fn test_coerce_numeric_substitutes_default_silently() {
        let stage = CleaningStage::new(vec![CleaningRule::coerce_numeric("Beds", 0.0)]);
        let out = stage.apply(&raw()).unwrap();
        let beds: Vec<Option<f64>> = out.records.column("Beds").unwrap().map(Value::as_number).collect();
        assert_eq!(beds, vec![Some(10.0), Some(0.0), Some(0.0), Some(0.0)]);
        assert_eq!(out.effects[0].affected, 3);
    }

    #[test]
    fn test_coerce_integer_truncates_toward_zero() {
        let rs = RecordSet::from_rows(
            ["Beds"],
            vec![
                vec![Value::text("10.7")],
                vec![Value::text("-2.5")],
                vec![Value::text("-0.4")],
                vec![Value::Number(3.9)],
                vec![Value::text("n/a")],
            ],
        );
        let stage = CleaningStage::new(vec![CleaningRule::coerce_integer("Beds", 1.5)]);
        let out = stage.apply(&rs).unwrap();
        let beds: Vec<Option<f64>> = out.records.column("Beds").unwrap().map(Value::as_number).collect();
        assert_eq!(beds, vec![Some(10.0), Some(-2.0), Some(0.0), Some(3.0), Some(1.0)]);
        assert!(out.records.value(2, "Beds").and_then(Value::as_number).unwrap().is_sign_positive());
        assert_eq!(out.effects[0].action, "coerce-integer");
        assert_eq!(out.effects[0].affected, 1);
    }

    #[test]
    fn test_rules_apply_in_order() {
        let stage = CleaningStage::new(vec![
            CleaningRule::drop_if_missing("Name"),
            CleaningRule::coerce_numeric("Beds", -1.0),
        ]);
        let out = stage.apply(&raw()).unwrap();
        assert_eq!(out.records.len(), 3);
        // "abc" was on the dropped row, so only the two missing values hit the default.
        assert_eq!(out.effects[1].affected, 2);
    }

    #[test]
    fn test_unknown_field_fails_before_any_rule() {
        let stage = CleaningStage::new(vec![
            CleaningRule::drop_if_missing("Name"),
            CleaningRule::fill_default("Mobile", "n/a"),
        ]);
        let err = stage.apply(&raw()).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::MissingField { ref field, stage: Stage::Clean } if field == "Mobile"
        ));
    }

    #[test]
    fn test_missing_report_runs_on_raw_input() {
        let t = missing_report(&raw(), &["Name", "Phone", "Beds"]).unwrap();
        let pcts: Vec<f64> = t
            .column_cells("Missing Percentage")
            .unwrap()
            .filter_map(Cell::as_f64)
            .collect();
        assert_eq!(pcts, vec![25.0, 50.0, 50.0]);
    }

    #[test]
    fn test_cleaning_is_deterministic() {
        let stage = CleaningStage::new(vec![
            CleaningRule::fill_default("Phone", "none"),
            CleaningRule::coerce_numeric("Beds", 0.0),
        ]);
        assert_eq!(stage.apply(&raw()).unwrap(), stage.apply(&raw()).unwrap());
    }
}
