//! Grouped reductions over a [`RecordSet`].
//!
//! Every function here is a one-shot pure computation: partition, reduce,
//! emit a [`ReportTable`]. Numeric reductions never coerce; a text value
//! reaching one is a `TypeMismatch`.

use crate::error::{PipelineError, Result, Stage};
use crate::record_set::{value_at, Record, RecordSet};
use crate::report::{Cell, Column, ColumnType, ReportTable};
use crate::types::Value;
use crate::util::{average, quantile_sorted, sample_std, sort_floats};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Fields to partition on, and whether rows with a missing key value are
/// skipped (`exclude_missing`) or grouped under `Missing`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupKey {
    pub fields: Vec<String>,
    pub exclude_missing: bool,
}

impl GroupKey {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        GroupKey {
            fields: fields.into_iter().map(Into::into).collect(),
            exclude_missing: false,
        }
    }

    /// No key fields: the whole record set is a single group.
    pub fn global() -> Self {
        GroupKey::default()
    }

    pub fn excluding_missing(mut self) -> Self {
        self.exclude_missing = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Aggregation {
    Count,
    Sum(String),
    SummaryStats(String),
    MissingRate(String),
}

impl Aggregation {
    fn columns(&self) -> Vec<Column> {
        match self {
            Aggregation::Count => vec![Column::new("Count", ColumnType::Integer)],
            Aggregation::Sum(_) => vec![Column::new("Sum", ColumnType::Float)],
            Aggregation::MissingRate(_) => vec![Column::new("MissingRate", ColumnType::Float)],
            Aggregation::SummaryStats(_) => {
                let mut cols = vec![Column::new("count", ColumnType::Integer)];
                cols.extend(
                    SUMMARY_LABELS
                        .iter()
                        .map(|l| Column::new(*l, ColumnType::Float)),
                );
                cols
            }
        }
    }

    fn label(&self) -> String {
        match self {
            Aggregation::Count => "count".to_string(),
            Aggregation::Sum(f) => format!("sum_{}", f),
            Aggregation::SummaryStats(f) => format!("summary_{}", f),
            Aggregation::MissingRate(f) => format!("missing_rate_{}", f),
        }
    }
}

const SUMMARY_LABELS: [&str; 7] = ["mean", "std", "min", "25%", "50%", "75%", "max"];

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum KeyPart {
    Text(String),
    Number(u64),
    Missing,
}

impl From<&Value> for KeyPart {
    fn from(v: &Value) -> Self {
        match v {
            Value::Text(s) => KeyPart::Text(s.clone()),
            // -0.0 and 0.0 must land in the same group.
            Value::Number(n) if *n == 0.0 => KeyPart::Number(0f64.to_bits()),
            Value::Number(n) => KeyPart::Number(n.to_bits()),
            Value::Missing => KeyPart::Missing,
        }
    }
}

struct Group<'a> {
    key: Vec<Value>,
    rows: Vec<(usize, &'a Record)>,
}

/// Partition `input` by `key`, groups in order of first appearance.
fn partition<'a>(input: &'a RecordSet, key: &GroupKey, idxs: &[usize]) -> Vec<Group<'a>> {
    let mut groups: Vec<Group<'a>> = Vec::new();
    if idxs.is_empty() {
        groups.push(Group {
            key: Vec::new(),
            rows: input.rows().enumerate().collect(),
        });
        return groups;
    }
    let mut index: HashMap<Vec<KeyPart>, usize> = HashMap::new();
    for (row_no, r) in input.rows().enumerate() {
        let values: Vec<&Value> = idxs.iter().map(|&i| value_at(r, i)).collect();
        if key.exclude_missing && values.iter().any(|v| v.is_missing()) {
            continue;
        }
        let parts: Vec<KeyPart> = values.iter().map(|v| KeyPart::from(*v)).collect();
        let slot = *index.entry(parts).or_insert_with(|| {
            groups.push(Group {
                key: values.iter().map(|v| (*v).clone()).collect(),
                rows: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].rows.push((row_no, r));
    }
    groups
}

/// Float if every present value is a number, otherwise text.
fn key_column_type<'a>(values: impl Iterator<Item = &'a Value>) -> ColumnType {
    let mut saw_number = false;
    for v in values {
        match v {
            Value::Text(_) => return ColumnType::Text,
            Value::Number(_) => saw_number = true,
            Value::Missing => {}
        }
    }
    if saw_number {
        ColumnType::Float
    } else {
        ColumnType::Text
    }
}

fn key_cell(v: &Value, ty: ColumnType) -> Cell {
    match (v, ty) {
        (Value::Number(n), ColumnType::Text) => Cell::Text(n.to_string()),
        _ => Cell::from(v),
    }
}

/// Numbers of `field` across `rows`, skipping missing values.
fn numeric_values(
    rows: &[(usize, &Record)],
    idx: usize,
    field: &str,
    stage: Stage,
) -> Result<Vec<f64>> {
    let mut out = Vec::with_capacity(rows.len());
    for (row_no, r) in rows {
        match value_at(r, idx) {
            Value::Number(n) => out.push(*n),
            Value::Missing => {}
            Value::Text(s) => {
                return Err(PipelineError::TypeMismatch {
                    field: field.to_string(),
                    stage,
                    row: *row_no,
                    value: s.clone(),
                })
            }
        }
    }
    Ok(out)
}

fn summary_cells(mut values: Vec<f64>) -> Vec<Cell> {
    let mut cells = vec![Cell::Integer(values.len() as i64)];
    if values.is_empty() {
        cells.extend(SUMMARY_LABELS.iter().map(|_| Cell::Missing));
        return cells;
    }
    sort_floats(&mut values);
    cells.push(Cell::Float(average(&values)));
    cells.push(sample_std(&values).into());
    cells.push(quantile_sorted(&values, 0.0).into());
    cells.push(quantile_sorted(&values, 0.25).into());
    cells.push(quantile_sorted(&values, 0.5).into());
    cells.push(quantile_sorted(&values, 0.75).into());
    cells.push(quantile_sorted(&values, 1.0).into());
    cells
}

/// A reduction with its field resolved to a schema position.
enum Resolved<'a> {
    Count,
    Sum(&'a str, usize),
    SummaryStats(&'a str, usize),
    MissingRate(usize),
}

impl<'a> Resolved<'a> {
    fn resolve(input: &RecordSet, reduction: &'a Aggregation) -> Result<Self> {
        let idx = |f: &str| input.field_index(f, Stage::Aggregate);
        Ok(match reduction {
            Aggregation::Count => Resolved::Count,
            Aggregation::Sum(f) => Resolved::Sum(f, idx(f.as_str())?),
            Aggregation::SummaryStats(f) => Resolved::SummaryStats(f, idx(f.as_str())?),
            Aggregation::MissingRate(f) => Resolved::MissingRate(idx(f.as_str())?),
        })
    }

    fn reduce(&self, group: &Group<'_>) -> Result<Vec<Cell>> {
        let cells = match *self {
            Resolved::Count => vec![Cell::Integer(group.rows.len() as i64)],
            Resolved::Sum(field, idx) => {
                let values = numeric_values(&group.rows, idx, field, Stage::Aggregate)?;
                vec![Cell::Float(values.iter().sum())]
            }
            Resolved::SummaryStats(field, idx) => {
                summary_cells(numeric_values(&group.rows, idx, field, Stage::Aggregate)?)
            }
            Resolved::MissingRate(idx) => {
                let missing = group
                    .rows
                    .iter()
                    .filter(|(_, r)| value_at(r, idx).is_missing())
                    .count();
                let rate = if group.rows.is_empty() {
                    0.0
                } else {
                    missing as f64 / group.rows.len() as f64
                };
                vec![Cell::Float(rate)]
            }
        };
        Ok(cells)
    }
}

/// Group `input` by `key` and reduce each group with `reduction`.
///
/// Output columns are the key fields followed by the reduction's columns;
/// one row per group in order of first appearance.
pub fn aggregate(input: &RecordSet, key: &GroupKey, reduction: &Aggregation) -> Result<ReportTable> {
    let key_idxs = key
        .fields
        .iter()
        .map(|f| input.field_index(f, Stage::Aggregate))
        .collect::<Result<Vec<_>>>()?;
    let resolved = Resolved::resolve(input, reduction)?;

    let groups = partition(input, key, &key_idxs);
    debug!(
        fields = ?key.fields,
        reduction = %reduction.label(),
        groups = groups.len(),
        rows = input.len(),
        "Partitioned records"
    );

    let mut columns: Vec<Column> = key
        .fields
        .iter()
        .enumerate()
        .map(|(k, f)| Column::new(f.clone(), key_column_type(groups.iter().map(|g| &g.key[k]))))
        .collect();
    columns.extend(reduction.columns());

    let rows = groups
        .iter()
        .map(|g| {
            let mut row: Vec<Cell> = g
                .key
                .iter()
                .zip(&columns)
                .map(|(v, c)| key_cell(v, c.ty))
                .collect();
            row.extend(resolved.reduce(g)?);
            Ok(row)
        })
        .collect::<Result<Vec<_>>>()?;

    ReportTable::new(reduction.label(), columns, rows)
}

/// Ascending order with numbers before text and missing last.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.total_cmp(y),
        (Value::Text(x), Value::Text(y)) => x.cmp(y),
        (Value::Number(_), _) => Ordering::Less,
        (_, Value::Number(_)) => Ordering::Greater,
        (Value::Text(_), Value::Missing) => Ordering::Less,
        (Value::Missing, Value::Text(_)) => Ordering::Greater,
        (Value::Missing, Value::Missing) => Ordering::Equal,
    }
}

fn pivot_label(v: &Value) -> String {
    match v {
        Value::Missing => "<missing>".to_string(),
        other => other.to_string(),
    }
}

/// Counts cross-tabulated by two fields, with absent combinations as 0.
///
/// Row and column labels are sorted ascending. The first output column holds
/// the `row_field` labels; one integer column follows per distinct
/// `column_field` value.
pub fn pivot_counts(
    input: &RecordSet,
    row_field: &str,
    column_field: &str,
    exclude_missing: bool,
) -> Result<ReportTable> {
    let ri = input.field_index(row_field, Stage::Pivot)?;
    let ci = input.field_index(column_field, Stage::Pivot)?;

    let mut row_labels: Vec<Value> = Vec::new();
    let mut col_labels: Vec<Value> = Vec::new();
    let mut seen_rows: HashSet<KeyPart> = HashSet::new();
    let mut seen_cols: HashSet<KeyPart> = HashSet::new();
    let mut counts: HashMap<(KeyPart, KeyPart), i64> = HashMap::new();

    for r in input.rows() {
        let (rv, cv) = (value_at(r, ri), value_at(r, ci));
        if exclude_missing && (rv.is_missing() || cv.is_missing()) {
            continue;
        }
        let (rk, ck) = (KeyPart::from(rv), KeyPart::from(cv));
        if seen_rows.insert(rk.clone()) {
            row_labels.push(rv.clone());
        }
        if seen_cols.insert(ck.clone()) {
            col_labels.push(cv.clone());
        }
        *counts.entry((rk, ck)).or_insert(0) += 1;
    }
    row_labels.sort_by(compare_values);
    col_labels.sort_by(compare_values);

    let row_type = key_column_type(row_labels.iter());
    let mut columns = vec![Column::new(row_field, row_type)];
    columns.extend(
        col_labels
            .iter()
            .map(|v| Column::new(pivot_label(v), ColumnType::Integer)),
    );

    let rows = row_labels
        .iter()
        .map(|rv| {
            let rk = KeyPart::from(rv);
            let mut row = vec![key_cell(rv, row_type)];
            row.extend(col_labels.iter().map(|cv| {
                let n = counts.get(&(rk.clone(), KeyPart::from(cv))).copied().unwrap_or(0);
                Cell::Integer(n)
            }));
            row
        })
        .collect();

    debug!(
        row_field,
        column_field,
        rows = row_labels.len(),
        columns = col_labels.len(),
        "Built pivot"
    );
    ReportTable::new(format!("pivot_{}_{}", row_field, column_field), columns, rows)
}

/// Equal-width histogram of a numeric field; the last bin is closed.
pub fn histogram(input: &RecordSet, field: &str, bins: usize) -> Result<ReportTable> {
    if bins == 0 {
        return Err(PipelineError::InvalidArgument(
            "histogram needs at least one bin".to_string(),
        ));
    }
    let idx = input.field_index(field, Stage::Histogram)?;
    let rows: Vec<(usize, &Record)> = input.rows().enumerate().collect();
    let values = numeric_values(&rows, idx, field, Stage::Histogram)?;

    let (lo, hi) = match (
        values.iter().copied().reduce(f64::min),
        values.iter().copied().reduce(f64::max),
    ) {
        (Some(lo), Some(hi)) if lo < hi => (lo, hi),
        (Some(v), Some(_)) => (v - 0.5, v + 0.5),
        _ => (0.0, 1.0),
    };
    // Halved operands keep `hi - lo` finite across the whole f64 range.
    let span = hi / 2.0 - lo / 2.0;
    let edge = |i: usize| {
        if i == bins {
            hi
        } else {
            let t = i as f64 / bins as f64;
            lo * (1.0 - t) + hi * t
        }
    };

    let mut counts = vec![0i64; bins];
    for v in &values {
        let t = (v / 2.0 - lo / 2.0) / span;
        let b = ((t * bins as f64).floor() as usize).min(bins - 1);
        counts[b] += 1;
    }

    let table_rows = counts
        .iter()
        .enumerate()
        .map(|(i, &c)| vec![Cell::Float(edge(i)), Cell::Float(edge(i + 1)), Cell::Integer(c)])
        .collect();

    ReportTable::new(
        format!("histogram_{}", field),
        vec![
            Column::new("Bin Start", ColumnType::Float),
            Column::new("Bin End", ColumnType::Float),
            Column::new("Count", ColumnType::Integer),
        ],
        table_rows,
    )
}
