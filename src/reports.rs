//! The five hospital-directory analyses, each a short pipeline of load,
//! clean, aggregate and rank steps ending in [`ReportTable`]s.

use crate::aggregate::{aggregate, histogram, pivot_counts, Aggregation, GroupKey};
use crate::cleaning::{missing_report, CleaningRule, CleaningStage, RuleEffect};
use crate::error::Result;
use crate::ranked::{rank, with_share};
use crate::record_set::RecordSet;
use crate::report::{Cell, Column, ColumnType, ReportTable};
use crate::types::DatasetSummary;
use chrono::Utc;
use once_cell::sync::Lazy;
use tracing::info;

pub const STATE: &str = "State";
pub const CATEGORY: &str = "Hospital_Category";
pub const NAME: &str = "Hospital_Name";
pub const ADDRESS: &str = "Address_Original_First_Line";
pub const TELEPHONE: &str = "Telephone";
pub const MOBILE: &str = "Mobile_Number";
pub const BEDS: &str = "Total_Num_Beds";

pub const IMPORTANT_FIELDS: [&str; 5] = [NAME, ADDRESS, TELEPHONE, MOBILE, BEDS];

pub const NOT_AVAILABLE: &str = "Not Available";

/// Rows without a name are dropped, contact gaps are filled and bed counts
/// are forced to whole numbers with 0 for anything unreadable.
pub static CLEANING_PLAN: Lazy<CleaningStage> = Lazy::new(|| {
    CleaningStage::new(vec![
        CleaningRule::drop_if_missing(NAME),
        CleaningRule::fill_default(TELEPHONE, NOT_AVAILABLE),
        CleaningRule::fill_default(MOBILE, NOT_AVAILABLE),
        CleaningRule::coerce_integer(BEDS, 0.0),
    ])
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectiveConfig {
    pub top_n: usize,
    pub histogram_bins: usize,
}

impl Default for ObjectiveConfig {
    fn default() -> Self {
        ObjectiveConfig {
            top_n: 10,
            histogram_bins: 30,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StateDistribution {
    pub by_state: ReportTable,
    pub top_states: ReportTable,
}

#[derive(Debug, Clone)]
pub struct CategoryDistribution {
    pub by_category: ReportTable,
    pub state_by_category: ReportTable,
}

#[derive(Debug, Clone)]
pub struct CleaningResult {
    pub missing_before: ReportTable,
    pub effects: ReportTable,
    pub missing_after: ReportTable,
    pub cleaned: RecordSet,
}

#[derive(Debug, Clone)]
pub struct BedAnalysis {
    pub summary: ReportTable,
    pub histogram: ReportTable,
    pub top_states_by_beds: ReportTable,
}

#[derive(Debug)]
pub struct Dashboard {
    pub top_states_by_beds: ReportTable,
    pub categories: ReportTable,
    pub bed_histogram: ReportTable,
    pub top_states_by_count: ReportTable,
    pub summary: DatasetSummary,
}

/// Hospitals per state, most first, and the top states with their share.
pub fn state_distribution(raw: &RecordSet, config: &ObjectiveConfig) -> Result<StateDistribution> {
    let counts = aggregate(
        raw,
        &GroupKey::new([STATE]).excluding_missing(),
        &Aggregation::Count,
    )?
    .renamed("Count", "Hospital Count")?;
    let by_state = rank(&counts, "Hospital Count", None, true)?.with_name("state_distribution");
    let top = rank(&by_state, "Hospital Count", Some(config.top_n), true)?;
    let top_states = with_share(&top, "Hospital Count", "Share %")?.with_name("top_states");
    info!(states = by_state.len(), "Computed state distribution");
    Ok(StateDistribution {
        by_state,
        top_states,
    })
}

/// Hospitals per category, and the state-by-category count matrix.
pub fn category_distribution(raw: &RecordSet) -> Result<CategoryDistribution> {
    let with_category = raw.filter_non_missing(CATEGORY)?;
    let counts = aggregate(&with_category, &GroupKey::new([CATEGORY]), &Aggregation::Count)?
        .renamed(CATEGORY, "Hospital Type")?;
    let by_category = rank(&counts, "Count", None, true)?.with_name("category_distribution");
    let state_by_category =
        pivot_counts(&with_category, STATE, CATEGORY, true)?.with_name("state_category_matrix");
    info!(
        categories = by_category.len(),
        states = state_by_category.len(),
        "Computed category distribution"
    );
    Ok(CategoryDistribution {
        by_category,
        state_by_category,
    })
}

fn effects_table(effects: &[RuleEffect]) -> Result<ReportTable> {
    let rows = effects
        .iter()
        .map(|e| {
            vec![
                Cell::Text(e.field.clone()),
                Cell::Text(e.action.to_string()),
                Cell::Integer(e.affected as i64),
            ]
        })
        .collect();
    ReportTable::new(
        "cleaning_effects",
        vec![
            Column::new("Field", ColumnType::Text),
            Column::new("Rule", ColumnType::Text),
            Column::new("Rows Affected", ColumnType::Integer),
        ],
        rows,
    )
}

/// Missing-data report on the raw set, the cleaning pass, and a recount.
pub fn clean_directory(raw: &RecordSet) -> Result<CleaningResult> {
    let missing_before = missing_report(raw, &IMPORTANT_FIELDS)?.with_name("missing_before_cleaning");
    let outcome = CLEANING_PLAN.apply(raw)?;
    let effects = effects_table(&outcome.effects)?;
    let missing_after =
        missing_report(&outcome.records, &IMPORTANT_FIELDS)?.with_name("missing_after_cleaning");
    info!(
        before = raw.len(),
        after = outcome.records.len(),
        "Cleaned hospital directory"
    );
    Ok(CleaningResult {
        missing_before,
        effects,
        missing_after,
        cleaned: outcome.records,
    })
}

fn top_states_by_beds(cleaned: &RecordSet, top_n: usize) -> Result<ReportTable> {
    let sums = aggregate(
        cleaned,
        &GroupKey::new([STATE]).excluding_missing(),
        &Aggregation::Sum(BEDS.to_string()),
    )?;
    Ok(rank(&sums, "Sum", Some(top_n), true)?
        .renamed("Sum", BEDS)?
        .with_name("top_states_by_beds"))
}

/// Bed-count statistics, distribution and the states with the most beds.
pub fn bed_analysis(cleaned: &RecordSet, config: &ObjectiveConfig) -> Result<BedAnalysis> {
    let summary = aggregate(
        cleaned,
        &GroupKey::global(),
        &Aggregation::SummaryStats(BEDS.to_string()),
    )?
    .with_name("bed_summary");
    let histogram = histogram(cleaned, BEDS, config.histogram_bins)?.with_name("bed_histogram");
    let top_states_by_beds = top_states_by_beds(cleaned, config.top_n)?;
    Ok(BedAnalysis {
        summary,
        histogram,
        top_states_by_beds,
    })
}

/// Headline numbers for the cleaned set.
pub fn summarize(cleaned: &RecordSet) -> Result<DatasetSummary> {
    let states = aggregate(
        cleaned,
        &GroupKey::new([STATE]).excluding_missing(),
        &Aggregation::Count,
    )?;
    let totals = aggregate(
        cleaned,
        &GroupKey::global(),
        &Aggregation::Sum(BEDS.to_string()),
    )?;
    let total_beds = totals
        .row(0)
        .and_then(|r| r.get("Sum"))
        .and_then(Cell::as_f64)
        .unwrap_or(0.0);
    let mean_beds = if cleaned.is_empty() {
        0.0
    } else {
        total_beds / cleaned.len() as f64
    };
    Ok(DatasetSummary {
        total_hospitals: cleaned.len(),
        total_states: states.len(),
        total_beds,
        mean_beds,
        generated_at: Utc::now(),
    })
}

/// The four dashboard panels plus the summary numbers.
pub fn dashboard(cleaned: &RecordSet, beds: &BedAnalysis, config: &ObjectiveConfig) -> Result<Dashboard> {
    let category_counts = aggregate(
        cleaned,
        &GroupKey::new([CATEGORY]).excluding_missing(),
        &Aggregation::Count,
    )?;
    let categories = with_share(&rank(&category_counts, "Count", None, true)?, "Count", "Share %")?
        .with_name("dashboard_categories");
    let state_counts = aggregate(
        cleaned,
        &GroupKey::new([STATE]).excluding_missing(),
        &Aggregation::Count,
    )?;
    let top_states_by_count = rank(&state_counts, "Count", Some(config.top_n), true)?
        .renamed("Count", "Hospital Count")?
        .with_name("dashboard_top_states_by_count");
    Ok(Dashboard {
        top_states_by_beds: beds.top_states_by_beds.with_name("dashboard_top_states_by_beds"),
        categories,
        bed_histogram: beds.histogram.with_name("dashboard_bed_histogram"),
        top_states_by_count,
        summary: summarize(cleaned)?,
    })
}

/// Every table produced for one run, in presentation order.
#[derive(Debug)]
pub struct HospitalReports {
    pub states: StateDistribution,
    pub categories: CategoryDistribution,
    pub cleaning: CleaningResult,
    pub beds: BedAnalysis,
    pub dashboard: Dashboard,
}

impl HospitalReports {
    /// Tables paired with a display title.
    pub fn tables(&self) -> Vec<(&'static str, &ReportTable)> {
        vec![
            ("State-wise Distribution of Hospitals", &self.states.by_state),
            ("Top States by Hospital Count", &self.states.top_states),
            ("Distribution of Hospitals by Type", &self.categories.by_category),
            ("State-wise Distribution of Hospital Types", &self.categories.state_by_category),
            ("Missing Data Percentage in Important Fields", &self.cleaning.missing_before),
            ("Cleaning Rules Applied", &self.cleaning.effects),
            ("Remaining Missing Values After Cleaning", &self.cleaning.missing_after),
            ("Summary of Total Number of Beds", &self.beds.summary),
            ("Distribution of Total Number of Beds", &self.beds.histogram),
            ("Top States with Most Hospital Beds", &self.beds.top_states_by_beds),
            ("Dashboard: Top States by Total Beds", &self.dashboard.top_states_by_beds),
            ("Dashboard: Hospital Categories", &self.dashboard.categories),
            ("Dashboard: Bed Distribution", &self.dashboard.bed_histogram),
            ("Dashboard: Top States by Number of Hospitals", &self.dashboard.top_states_by_count),
        ]
    }
}

/// Run all five analyses over a freshly loaded set.
pub fn generate_all(raw: &RecordSet, config: &ObjectiveConfig) -> Result<HospitalReports> {
    let states = state_distribution(raw, config)?;
    let categories = category_distribution(raw)?;
    let cleaning = clean_directory(raw)?;
    let beds = bed_analysis(&cleaning.cleaned, config)?;
    let dashboard = dashboard(&cleaning.cleaned, &beds, config)?;
    Ok(HospitalReports {
        states,
        categories,
        cleaning,
        beds,
        dashboard,
    })
}
