//! The pipeline's output contract: a named, typed, immutable table.

use crate::error::{PipelineError, Result};
use crate::types::Value;
use crate::util::format_number;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColumnType {
    Text,
    Integer,
    Float,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Column {
            name: name.into(),
            ty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Text(String),
    Integer(i64),
    Float(f64),
    Missing,
}

impl Cell {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Integer(i) => Some(*i as f64),
            Cell::Float(f) => Some(*f),
            _ => None,
        }
    }

    fn fits(&self, ty: ColumnType) -> bool {
        matches!(
            (self, ty),
            (Cell::Missing, _)
                | (Cell::Text(_), ColumnType::Text)
                | (Cell::Integer(_), ColumnType::Integer)
                | (Cell::Float(_), ColumnType::Float)
        )
    }

    /// Rendering used by console previews.
    pub fn display(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Integer(i) => crate::util::format_int(*i),
            Cell::Float(f) => format_number(*f, 2),
            Cell::Missing => String::new(),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(s) => f.write_str(s),
            Cell::Integer(i) => write!(f, "{}", i),
            Cell::Float(v) => write!(f, "{}", v),
            Cell::Missing => Ok(()),
        }
    }
}

impl From<&Value> for Cell {
    fn from(v: &Value) -> Self {
        match v {
            Value::Text(s) => Cell::Text(s.clone()),
            Value::Number(n) => Cell::Float(*n),
            Value::Missing => Cell::Missing,
        }
    }
}

impl From<Option<f64>> for Cell {
    fn from(v: Option<f64>) -> Self {
        v.map(Cell::Float).unwrap_or(Cell::Missing)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportTable {
    name: String,
    columns: Vec<Column>,
    rows: Vec<Vec<Cell>>,
}

impl ReportTable {
    /// Validates column names and every row before the table exists.
    pub fn new(name: impl Into<String>, columns: Vec<Column>, rows: Vec<Vec<Cell>>) -> Result<Self> {
        let name = name.into();
        let mut seen = HashSet::with_capacity(columns.len());
        if let Some(dup) = columns
            .iter()
            .map(|c| c.name.as_str())
            .find(|n| !seen.insert(*n))
        {
            return Err(PipelineError::DuplicateColumn {
                table: name,
                column: dup.to_string(),
            });
        }
        for (r, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(PipelineError::RowShape {
                    table: name,
                    row: r,
                    expected: columns.len(),
                    found: row.len(),
                });
            }
            if let Some((col, _)) = columns.iter().zip(row).find(|(c, cell)| !cell.fits(c.ty)) {
                return Err(PipelineError::CellType {
                    table: name,
                    column: col.name.clone(),
                    row: r,
                });
            }
        }
        Ok(ReportTable {
            name,
            columns,
            rows,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, column: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c.name == column)
            .ok_or_else(|| PipelineError::UnknownColumn {
                column: column.to_string(),
                table: self.name.clone(),
            })
    }

    /// Rows in table order. Each call starts again from the first row.
    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().map(move |cells| Row {
            table: self,
            cells,
        })
    }

    pub fn row(&self, idx: usize) -> Option<Row<'_>> {
        self.rows.get(idx).map(|cells| Row { table: self, cells })
    }

    /// Cells of one column, top to bottom.
    pub fn column_cells(&self, column: &str) -> Result<impl Iterator<Item = &Cell>> {
        let idx = self.column_index(column)?;
        Ok(self.rows.iter().map(move |r| &r[idx]))
    }

    /// A copy of this table under a new name.
    pub fn with_name(&self, name: impl Into<String>) -> ReportTable {
        ReportTable {
            name: name.into(),
            ..self.clone()
        }
    }

    /// A copy of this table with column `old` called `new`.
    pub fn renamed(&self, old: &str, new: &str) -> Result<ReportTable> {
        let idx = self.column_index(old)?;
        let mut columns = self.columns.clone();
        columns[idx].name = new.to_string();
        ReportTable::new(self.name.clone(), columns, self.rows.clone())
    }

    pub(crate) fn into_parts(self) -> (String, Vec<Column>, Vec<Vec<Cell>>) {
        (self.name, self.columns, self.rows)
    }
}

/// Borrowed view of one table row.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    table: &'a ReportTable,
    cells: &'a [Cell],
}

impl<'a> Row<'a> {
    pub fn cells(&self) -> &'a [Cell] {
        self.cells
    }

    pub fn get(&self, column: &str) -> Option<&'a Cell> {
        let idx = self.table.columns.iter().position(|c| c.name == column)?;
        self.cells.get(idx)
    }
}
