use crate::error::Result;
use crate::report::ReportTable;
use crate::reports::HospitalReports;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tabled::{builder::Builder, settings::Style};
use tracing::debug;

pub fn write_csv(path: impl AsRef<Path>, table: &ReportTable) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path.as_ref())?;
    wtr.write_record(table.column_names())?;
    for row in table.rows() {
        wtr.write_record(row.cells().iter().map(|c| c.to_string()))?;
    }
    wtr.flush()?;
    debug!(path = %path.as_ref().display(), table = table.name(), rows = table.len(), "Wrote CSV");
    Ok(())
}

pub fn write_json<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

/// Markdown rendering of the first `max_rows` rows, or `None` when empty.
pub fn render_markdown(table: &ReportTable, max_rows: usize) -> Option<String> {
    if table.is_empty() || max_rows == 0 {
        return None;
    }
    let mut records: Vec<Vec<String>> = vec![table.column_names().map(str::to_string).collect()];
    records.extend(
        table
            .rows()
            .take(max_rows)
            .map(|r| r.cells().iter().map(|c| c.display()).collect()),
    );
    let mut rendered = Builder::from(records).build();
    Some(rendered.with(Style::markdown()).to_string())
}

pub fn preview_table(title: &str, table: &ReportTable, max_rows: usize) {
    println!("{}", title);
    println!("");
    match render_markdown(table, max_rows) {
        Some(s) => println!("{}\n", s),
        None => println!("(no rows)\n"),
    }
}

/// Write every table as `<name>.csv` and the dashboard summary as
/// `summary.json` under `out_dir`. Returns the files written.
pub fn export_all(out_dir: impl AsRef<Path>, reports: &HospitalReports) -> Result<Vec<PathBuf>> {
    let out_dir = out_dir.as_ref();
    std::fs::create_dir_all(out_dir)?;
    let mut written = Vec::new();
    for (_, table) in reports.tables() {
        let path = out_dir.join(format!("{}.csv", table.name()));
        write_csv(&path, table)?;
        written.push(path);
    }
    let summary = out_dir.join("summary.json");
    write_json(&summary, &reports.dashboard.summary)?;
    written.push(summary);
    Ok(written)
}
