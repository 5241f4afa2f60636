//! Immutable, schema-carrying collection of records.
//!
//! Every operation returns a new [`RecordSet`]; nothing mutates an existing one.

use crate::error::{PipelineError, Result, Stage};
use crate::types::{Schema, Value};
use std::sync::Arc;

static MISSING: Value = Value::Missing;

pub type Record = Vec<Value>;

#[derive(Debug, Clone, PartialEq)]
pub struct RecordSet {
    schema: Arc<Schema>,
    rows: Vec<Record>,
}

impl RecordSet {
    pub fn new(schema: Schema, rows: Vec<Record>) -> Self {
        RecordSet {
            schema: Arc::new(schema),
            rows,
        }
    }

    /// Build a record set from field names and rows of values.
    pub fn from_rows<F, S>(fields: F, rows: Vec<Record>) -> Self
    where
        F: IntoIterator<Item = S>,
        S: Into<String>,
    {
        RecordSet::new(Schema::new(fields), rows)
    }

    pub(crate) fn with_rows(&self, rows: Vec<Record>) -> Self {
        RecordSet {
            schema: Arc::clone(&self.schema),
            rows,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = &Record> {
        self.rows.iter()
    }

    /// Resolve a field to its schema position, failing with `MissingField`.
    pub fn field_index(&self, field: &str, stage: Stage) -> Result<usize> {
        self.schema
            .position(field)
            .ok_or_else(|| PipelineError::MissingField {
                field: field.to_string(),
                stage,
            })
    }

    /// Value of `field` in row `row`; short records read as missing.
    pub fn value(&self, row: usize, field: &str) -> Option<&Value> {
        let idx = self.schema.position(field)?;
        self.rows.get(row).map(|r| value_at(r, idx))
    }

    /// Every row's value for one field, in row order.
    pub fn column(&self, field: &str) -> Result<impl Iterator<Item = &Value>> {
        let idx = self.field_index(field, Stage::Select)?;
        Ok(self.rows.iter().map(move |r| value_at(r, idx)))
    }

    /// Projection onto `fields`, in the order given. Row order is preserved.
    pub fn select(&self, fields: &[&str]) -> Result<RecordSet> {
        let idxs = fields
            .iter()
            .map(|f| self.field_index(f, Stage::Select))
            .collect::<Result<Vec<_>>>()?;
        let rows = self
            .rows
            .iter()
            .map(|r| idxs.iter().map(|&i| value_at(r, i).clone()).collect())
            .collect();
        Ok(RecordSet::from_rows(fields.iter().copied(), rows))
    }

    /// Drop every row whose value for `field` is missing.
    pub fn filter_non_missing(&self, field: &str) -> Result<RecordSet> {
        let idx = self.field_index(field, Stage::Filter)?;
        let rows = self
            .rows
            .iter()
            .filter(|r| !value_at(r, idx).is_missing())
            .cloned()
            .collect();
        Ok(self.with_rows(rows))
    }
}

pub(crate) fn value_at(record: &Record, idx: usize) -> &Value {
    record.get(idx).unwrap_or(&MISSING)
}
