//! # Aggregation
//!
//! Pure functions over a collection of [`PrMetric`] rows producing the
//! grouped statistics the dashboard renders.
//!
//! Every function returns an [`Aggregate`]: [`Aggregate::NoData`] when the
//! relevant input is empty, [`Aggregate::Data`] otherwise. No function
//! divides by zero, panics, or yields NaN.
//!
//! "Merged records" throughout are rows with `duration_ms` present.

use crate::model::{Priority, PrMetric, ReviewStatus};
use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

mod dashboard;
mod trend;

pub use dashboard::DashboardSummary;
pub use trend::{merge_time_trend, MergeTrend, TrendDirection, TrendPoint, FLAT_SLOPE_THRESHOLD};

/// Days in the calendar density window, today included
pub const CALENDAR_WINDOW_DAYS: i64 = 365;

// ============================================================================
// Aggregate wrapper
// ============================================================================

/// Result of an aggregation: explicit "no data" or a value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum Aggregate<T> {
    NoData,
    Data(T),
}

impl<T> Aggregate<T> {
    pub fn is_no_data(&self) -> bool {
        matches!(self, Self::NoData)
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            Self::NoData => None,
            Self::Data(value) => Some(value),
        }
    }

    pub fn into_data(self) -> Option<T> {
        match self {
            Self::NoData => None,
            Self::Data(value) => Some(value),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Aggregate<U> {
        match self {
            Self::NoData => Aggregate::NoData,
            Self::Data(value) => Aggregate::Data(f(value)),
        }
    }
}

impl<T> From<Option<T>> for Aggregate<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::NoData, Self::Data)
    }
}

// ============================================================================
// Scalar statistics
// ============================================================================

fn finite(values: &[f64]) -> Vec<f64> {
    values.iter().copied().filter(|v| v.is_finite()).collect()
}

/// Arithmetic mean of the finite values
pub fn mean(values: &[f64]) -> Aggregate<f64> {
    let values = finite(values);
    if values.is_empty() {
        return Aggregate::NoData;
    }
    Aggregate::Data(values.iter().sum::<f64>() / values.len() as f64)
}

/// Median of the finite values; an even count averages the two central values
pub fn median(values: &[f64]) -> Aggregate<f64> {
    let mut values = finite(values);
    if values.is_empty() {
        return Aggregate::NoData;
    }

    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;

    if values.len() % 2 == 0 {
        Aggregate::Data((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Aggregate::Data(values[mid])
    }
}

/// Rows with a recorded ready-to-merge duration
pub fn merged_records(records: &[PrMetric]) -> impl Iterator<Item = &PrMetric> {
    records.iter().filter(|r| r.duration_ms.is_some())
}

// ============================================================================
// Grouped durations
// ============================================================================

/// Attribute a grouped statistic is keyed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKey {
    Author,
    Repo,
    Priority,
}

impl GroupKey {
    fn key_of(&self, record: &PrMetric) -> String {
        match self {
            Self::Author => record.author.clone(),
            Self::Repo => record.repo.full_name(),
            Self::Priority => record.priority.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationUnit {
    Hours,
    Days,
}

impl DurationUnit {
    fn of(&self, record: &PrMetric) -> Option<f64> {
        match self {
            Self::Hours => record.duration_hours(),
            Self::Days => record.duration_days(),
        }
    }
}

/// Duration statistics for one group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStat {
    pub key: String,
    pub count: usize,
    pub mean: f64,
    pub median: f64,
}

/// Mean and median merged duration per group, highest mean first.
pub fn mean_duration_by(
    records: &[PrMetric],
    key: GroupKey,
    unit: DurationUnit,
) -> Aggregate<Vec<GroupStat>> {
    let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for record in merged_records(records) {
        if let Some(value) = unit.of(record) {
            groups.entry(key.key_of(record)).or_default().push(value);
        }
    }

    let mut stats: Vec<GroupStat> = groups
        .into_iter()
        .filter_map(|(key, values)| {
            Some(GroupStat {
                count: values.len(),
                mean: mean(&values).into_data()?,
                median: median(&values).into_data()?,
                key,
            })
        })
        .collect();

    if stats.is_empty() {
        return Aggregate::NoData;
    }

    stats.sort_by(|a, b| b.mean.total_cmp(&a.mean).then_with(|| a.key.cmp(&b.key)));
    Aggregate::Data(stats)
}

// ============================================================================
// Histogram
// ============================================================================

/// Histogram bucket bounds in hours: label and exclusive upper bound
const DURATION_BUCKETS: [(&str, Option<f64>); 7] = [
    ("<1h", Some(1.0)),
    ("1-4h", Some(4.0)),
    ("4-8h", Some(8.0)),
    ("8-24h", Some(24.0)),
    ("1-3d", Some(72.0)),
    ("3-7d", Some(168.0)),
    (">7d", None),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBucket {
    pub label: String,
    pub upper_hours: Option<f64>,
    pub count: usize,
}

/// Merged records counted into fixed duration buckets; every bucket listed.
pub fn duration_histogram(records: &[PrMetric]) -> Aggregate<Vec<HistogramBucket>> {
    let mut buckets: Vec<HistogramBucket> = DURATION_BUCKETS
        .iter()
        .map(|(label, upper)| HistogramBucket {
            label: label.to_string(),
            upper_hours: *upper,
            count: 0,
        })
        .collect();

    let mut any = false;
    for hours in merged_records(records).filter_map(PrMetric::duration_hours) {
        any = true;
        let index = DURATION_BUCKETS
            .iter()
            .position(|(_, upper)| upper.map_or(true, |max| hours < max))
            .unwrap_or(DURATION_BUCKETS.len() - 1);
        buckets[index].count += 1;
    }

    if any {
        Aggregate::Data(buckets)
    } else {
        Aggregate::NoData
    }
}

// ============================================================================
// Throughput and calendar
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeekCount {
    /// ISO week label, `YYYY-Www`
    pub week: String,
    pub count: usize,
}

/// Merges per ISO week of `merged_at`, in label order.
pub fn weekly_throughput(records: &[PrMetric]) -> Aggregate<Vec<WeekCount>> {
    let mut weeks: BTreeMap<String, usize> = BTreeMap::new();
    for merged_at in merged_records(records).filter_map(|r| r.merged_at) {
        let iso = merged_at.iso_week();
        *weeks
            .entry(format!("{}-W{:02}", iso.year(), iso.week()))
            .or_default() += 1;
    }

    if weeks.is_empty() {
        return Aggregate::NoData;
    }

    Aggregate::Data(
        weeks
            .into_iter()
            .map(|(week, count)| WeekCount { week, count })
            .collect(),
    )
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub count: usize,
}

/// Merges per UTC day over `[today - 364d, today]`; every day listed.
pub fn calendar_density(records: &[PrMetric], today: NaiveDate) -> Aggregate<Vec<CalendarDay>> {
    let merged: Vec<NaiveDate> = merged_records(records)
        .filter_map(|r| r.merged_at)
        .map(|at| at.date_naive())
        .collect();

    if merged.is_empty() {
        return Aggregate::NoData;
    }

    let start = today - Duration::days(CALENDAR_WINDOW_DAYS - 1);
    let mut days: BTreeMap<NaiveDate, usize> = start
        .iter_days()
        .take_while(|d| *d <= today)
        .map(|d| (d, 0))
        .collect();

    for date in merged {
        if let Some(count) = days.get_mut(&date) {
            *count += 1;
        }
    }

    Aggregate::Data(
        days.into_iter()
            .map(|(date, count)| CalendarDay { date, count })
            .collect(),
    )
}

// ============================================================================
// Due-date compliance
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DueDateCompliance {
    pub on_time: usize,
    pub late: usize,
    pub total: usize,
    pub on_time_pct: f64,
    pub late_pct: f64,
}

/// On-time share among rows with both a due date and a merge date.
///
/// Merging exactly at the due date counts as on time.
pub fn due_date_compliance(records: &[PrMetric]) -> Aggregate<DueDateCompliance> {
    let (mut on_time, mut late) = (0usize, 0usize);
    for record in records {
        if let (Some(merged), Some(due)) = (record.merged_at, record.due_date) {
            if merged <= due {
                on_time += 1;
            } else {
                late += 1;
            }
        }
    }

    let total = on_time + late;
    if total == 0 {
        return Aggregate::NoData;
    }

    Aggregate::Data(DueDateCompliance {
        on_time,
        late,
        total,
        on_time_pct: on_time as f64 * 100.0 / total as f64,
        late_pct: late as f64 * 100.0 / total as f64,
    })
}

// ============================================================================
// Breakdowns
// ============================================================================

/// Count and mean hours of one record subset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubsetStat {
    pub count: usize,
    pub mean_hours: Option<f64>,
}

impl SubsetStat {
    fn of<'a>(records: impl Iterator<Item = &'a PrMetric>) -> Self {
        let hours: Vec<f64> = records.filter_map(PrMetric::duration_hours).collect();
        Self {
            count: hours.len(),
            mean_hours: mean(&hours).into_data(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DraftComparison {
    pub drafts: SubsetStat,
    pub non_drafts: SubsetStat,
}

/// Merged duration of PRs that went through draft vs. those that did not
pub fn draft_comparison(records: &[PrMetric]) -> Aggregate<DraftComparison> {
    if merged_records(records).next().is_none() {
        return Aggregate::NoData;
    }

    Aggregate::Data(DraftComparison {
        drafts: SubsetStat::of(merged_records(records).filter(|r| r.was_draft)),
        non_drafts: SubsetStat::of(merged_records(records).filter(|r| !r.was_draft)),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriorityStat {
    pub priority: Priority,
    #[serde(flatten)]
    pub stat: SubsetStat,
}

/// Merged count and mean hours for every priority, most urgent first
pub fn priority_breakdown(records: &[PrMetric]) -> Aggregate<Vec<PriorityStat>> {
    if merged_records(records).next().is_none() {
        return Aggregate::NoData;
    }

    Aggregate::Data(
        Priority::DESCENDING
            .iter()
            .map(|priority| PriorityStat {
                priority: *priority,
                stat: SubsetStat::of(merged_records(records).filter(|r| r.priority == *priority)),
            })
            .collect(),
    )
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewStatusCount {
    pub status: ReviewStatus,
    pub qa: usize,
    pub dev: usize,
}

/// Rows per review status on each track, merged or not
pub fn review_status_overview(records: &[PrMetric]) -> Aggregate<Vec<ReviewStatusCount>> {
    if records.is_empty() {
        return Aggregate::NoData;
    }

    Aggregate::Data(
        ReviewStatus::ALL
            .iter()
            .map(|status| ReviewStatusCount {
                status: *status,
                qa: records.iter().filter(|r| r.qa_review == *status).count(),
                dev: records.iter().filter(|r| r.dev_review == *status).count(),
            })
            .collect(),
    )
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpenToMerge {
    pub count: usize,
    pub mean_days: f64,
    pub median_days: f64,
}

/// Days from `opened_at` to `merged_at` over rows with a merge date
pub fn open_to_merge_days(records: &[PrMetric]) -> Aggregate<OpenToMerge> {
    let days: Vec<f64> = records
        .iter()
        .filter_map(PrMetric::open_to_merge_days)
        .collect();

    match (mean(&days), median(&days)) {
        (Aggregate::Data(mean_days), Aggregate::Data(median_days)) => {
            Aggregate::Data(OpenToMerge {
                count: days.len(),
                mean_days,
                median_days,
            })
        }
        _ => Aggregate::NoData,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    pub authors: Vec<String>,
    pub repos: Vec<String>,
}

/// Sorted distinct authors and repositories
pub fn filter_options(records: &[PrMetric]) -> Aggregate<FilterOptions> {
    if records.is_empty() {
        return Aggregate::NoData;
    }

    let authors: BTreeSet<String> = records.iter().map(|r| r.author.clone()).collect();
    let repos: BTreeSet<String> = records.iter().map(|r| r.repo.full_name()).collect();

    Aggregate::Data(FilterOptions {
        authors: authors.into_iter().collect(),
        repos: repos.into_iter().collect(),
    })
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
