//! Cleaning, aggregation and reporting pipeline for a hospital directory.
//!
//! A [`RecordSet`] is loaded once, repaired by a [`CleaningStage`], reduced
//! by [`aggregate`] and friends, ordered by [`rank`], and handed to
//! rendering as immutable [`ReportTable`]s.

pub mod aggregate;
pub mod cleaning;
pub mod error;
pub mod loader;
pub mod output;
pub mod ranked;
pub mod record_set;
pub mod report;
pub mod reports;
pub mod types;
pub mod util;

pub use aggregate::{aggregate, histogram, pivot_counts, Aggregation, GroupKey};
pub use cleaning::{missing_report, CleanOutcome, CleaningRule, CleaningStage, RuleEffect};
pub use error::{PipelineError, Result, Stage};
pub use ranked::{rank, with_share};
pub use record_set::{Record, RecordSet};
pub use report::{Cell, Column, ColumnType, ReportTable, Row};
pub use types::{Schema, Value};
