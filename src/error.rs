use std::fmt;
use std::io;

use thiserror::Error;

/// Pipeline step that raised an error, carried for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Select,
    Filter,
    Clean,
    MissingReport,
    Aggregate,
    Pivot,
    Histogram,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Select => "select",
            Stage::Filter => "filter",
            Stage::Clean => "clean",
            Stage::MissingReport => "missing-report",
            Stage::Aggregate => "aggregate",
            Stage::Pivot => "pivot",
            Stage::Histogram => "histogram",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{stage}: field '{field}' is not in the record schema")]
    MissingField { field: String, stage: Stage },
    #[error("{stage}: field '{field}' has non-numeric value '{value}' at row {row}")]
    TypeMismatch {
        field: String,
        stage: Stage,
        row: usize,
        value: String,
    },
    #[error("column '{column}' is not present in table '{table}'")]
    UnknownColumn { column: String, table: String },
    #[error("table '{table}': row {row} has {found} cells, expected {expected}")]
    RowShape {
        table: String,
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("table '{table}': row {row} holds a cell of the wrong type for column '{column}'")]
    CellType {
        table: String,
        column: String,
        row: usize,
    },
    #[error("table '{table}': column '{column}' appears more than once")]
    DuplicateColumn { table: String, column: String },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_names_stage_and_field() {
        let err = PipelineError::MissingField {
            field: "Beds".to_string(),
            stage: Stage::Aggregate,
        };
        assert_eq!(
            err.to_string(),
            "aggregate: field 'Beds' is not in the record schema"
        );
    }

    #[test]
    fn test_type_mismatch_reports_offending_value() {
        let err = PipelineError::TypeMismatch {
            field: "Beds".to_string(),
            stage: Stage::Histogram,
            row: 3,
            value: "ten".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("'ten'"));
        assert!(msg.contains("row 3"));
    }
}
