//! Ordering and top-N views over a [`ReportTable`].

use crate::error::{PipelineError, Result};
use crate::report::{Cell, Column, ColumnType, ReportTable};
use std::cmp::Ordering;

/// Ascending order with numbers before text and missing last.
fn compare_cells(a: &Cell, b: &Cell) -> Ordering {
    match (a, b) {
        (Cell::Missing, Cell::Missing) => Ordering::Equal,
        (Cell::Missing, _) => Ordering::Greater,
        (_, Cell::Missing) => Ordering::Less,
        (Cell::Text(x), Cell::Text(y)) => x.cmp(y),
        (Cell::Text(_), _) => Ordering::Greater,
        (_, Cell::Text(_)) => Ordering::Less,
        (x, y) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            _ => Ordering::Equal,
        },
    }
}

/// Sort `table` by `metric_column` and keep the first `limit` rows.
///
/// The sort is stable, so equal metrics keep their input order, and missing
/// metrics stay at the bottom whichever direction is asked for.
pub fn rank(
    table: &ReportTable,
    metric_column: &str,
    limit: Option<usize>,
    descending: bool,
) -> Result<ReportTable> {
    let idx = table.column_index(metric_column)?;
    let (name, columns, mut rows) = table.clone().into_parts();
    rows.sort_by(|a, b| {
        let (x, y) = (&a[idx], &b[idx]);
        match (x, y) {
            (Cell::Missing, _) | (_, Cell::Missing) => compare_cells(x, y),
            _ if descending => compare_cells(y, x),
            _ => compare_cells(x, y),
        }
    });
    if let Some(n) = limit {
        rows.truncate(n);
    }
    ReportTable::new(name, columns, rows)
}

/// Append `share_column`: each row's percentage of the `metric_column` total.
///
/// Missing metrics contribute nothing and get a missing share.
pub fn with_share(table: &ReportTable, metric_column: &str, share_column: &str) -> Result<ReportTable> {
    let idx = table.column_index(metric_column)?;
    if table.columns()[idx].ty == ColumnType::Text {
        return Err(PipelineError::InvalidArgument(format!(
            "share needs a numeric column, '{}' in table '{}' holds text",
            metric_column,
            table.name()
        )));
    }
    let total: f64 = table
        .column_cells(metric_column)?
        .filter_map(Cell::as_f64)
        .sum();
    let (name, mut columns, mut rows) = table.clone().into_parts();
    columns.push(Column::new(share_column, ColumnType::Float));
    for row in &mut rows {
        let share = match row[idx].as_f64() {
            Some(_) if total == 0.0 => Cell::Float(0.0),
            Some(v) => Cell::Float(v / total * 100.0),
            None => Cell::Missing,
        };
        row.push(share);
    }
    ReportTable::new(name, columns, rows)
}
