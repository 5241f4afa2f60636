use crate::error::Result;
use crate::record_set::{Record, RecordSet};
use crate::types::{Schema, Value};
use csv::ReaderBuilder;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

/// Cell texts read as missing, after trimming.
pub const DEFAULT_NA_VALUES: [&str; 19] = [
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub delimiter: u8,
    pub na_values: Vec<String>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions {
            delimiter: b',',
            na_values: DEFAULT_NA_VALUES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub total_rows: usize,
    pub loaded_rows: usize,
    pub parse_errors: usize,
}

pub fn load_csv(path: impl AsRef<Path>, options: &LoadOptions) -> Result<(RecordSet, LoadReport)> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)?;
    let (records, report) = load_reader(file, options)?;
    info!(
        path = %path.display(),
        rows = report.loaded_rows,
        skipped = report.parse_errors,
        "Loaded dataset"
    );
    Ok((records, report))
}

/// Read delimited text into a [`RecordSet`]; the header row is the schema.
///
/// Rows the CSV reader cannot decode, and rows with more cells than the
/// header, are skipped and counted.
pub fn load_reader<R: Read>(reader: R, options: &LoadOptions) -> Result<(RecordSet, LoadReport)> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .delimiter(options.delimiter)
        .from_reader(reader);
    let schema = Schema::new(rdr.headers()?.iter().map(|h| h.trim().to_string()));

    let mut total_rows = 0usize;
    let mut parse_errors = 0usize;
    let mut rows: Vec<Record> = Vec::new();
    for result in rdr.records() {
        total_rows += 1;
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                warn!(row = total_rows, error = %e, "Skipping undecodable row");
                parse_errors += 1;
                continue;
            }
        };
        if record.len() > schema.len() {
            warn!(
                row = total_rows,
                expected = schema.len(),
                found = record.len(),
                "Skipping row with more fields than the header"
            );
            parse_errors += 1;
            continue;
        }
        rows.push(
            record
                .iter()
                .map(|cell| to_value(cell, &options.na_values))
                .collect(),
        );
    }

    let report = LoadReport {
        total_rows,
        loaded_rows: rows.len(),
        parse_errors,
    };
    Ok((RecordSet::new(schema, rows), report))
}

fn to_value(cell: &str, na_values: &[String]) -> Value {
    let cell = cell.trim();
    if na_values.iter().any(|na| na == cell) {
        Value::Missing
    } else {
        Value::Text(cell.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_reader_maps_na_tokens() {
        let csv = "State,Beds,Telephone\nA, 10 ,\nB,NA,555\nC,N/A\n";
        let (rs, report) = load_reader(csv.as_bytes(), &LoadOptions::default()).unwrap();
        assert_eq!(report.total_rows, 3);
        assert_eq!(report.loaded_rows, 3);
        assert_eq!(rs.value(0, "Beds"), Some(&Value::text("10")));
        assert_eq!(rs.value(0, "Telephone"), Some(&Value::Missing));
        assert_eq!(rs.value(1, "Beds"), Some(&Value::Missing));
        // Short row: the absent trailing field reads as missing.
        assert_eq!(rs.value(2, "Telephone"), Some(&Value::Missing));
    }

    #[test]
    fn test_load_reader_maps_spreadsheet_na_tokens() {
        let csv = "State,Beds\nA,#N/A N/A\nB,1.#QNAN\nC,-nan\nD,#NA\n";
        let (rs, _) = load_reader(csv.as_bytes(), &LoadOptions::default()).unwrap();
        let beds: Vec<&Value> = rs.column("Beds").unwrap().collect();
        assert!(beds.iter().all(|v| v.is_missing()));
    }

    #[test]
    fn test_load_reader_skips_overlong_rows() {
        let csv = "State,Beds\nA,10,EXTRA\nB,5\n";
        let (rs, report) = load_reader(csv.as_bytes(), &LoadOptions::default()).unwrap();
        assert_eq!(
            report,
            LoadReport {
                total_rows: 2,
                loaded_rows: 1,
                parse_errors: 1,
            }
        );
        assert_eq!(rs.value(0, "State"), Some(&Value::text("B")));
    }

    #[test]
    fn test_load_reader_custom_delimiter() {
        let options = LoadOptions {
            delimiter: b';',
            ..LoadOptions::default()
        };
        let (rs, _) = load_reader("State;Beds\nA;1\n".as_bytes(), &options).unwrap();
        assert_eq!(rs.schema().fields(), &["State".to_string(), "Beds".to_string()]);
    }

    #[test]
    fn test_load_csv_missing_file() {
        let err = load_csv("does/not/exist.csv", &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, crate::error::PipelineError::Io(_)));
    }
}
