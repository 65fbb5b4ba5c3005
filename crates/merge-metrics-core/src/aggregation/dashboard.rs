//! Every dashboard aggregate computed in one pass over the filtered rows.

use super::{
    calendar_density, draft_comparison, due_date_compliance, duration_histogram, filter_options,
    mean_duration_by, merge_time_trend, merged_records, open_to_merge_days, priority_breakdown,
    review_status_overview, weekly_throughput, Aggregate, CalendarDay, DraftComparison,
    DueDateCompliance, DurationUnit, FilterOptions, GroupKey, GroupStat, HistogramBucket,
    MergeTrend, OpenToMerge, PriorityStat, ReviewStatusCount, WeekCount,
};
use crate::model::PrMetric;
use chrono::NaiveDate;
use serde::Serialize;

/// Aggregates backing the dashboard view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub total_records: usize,
    pub merged_records: usize,
    pub by_author_hours: Aggregate<Vec<GroupStat>>,
    pub by_repo_hours: Aggregate<Vec<GroupStat>>,
    pub by_priority_hours: Aggregate<Vec<GroupStat>>,
    pub duration_histogram: Aggregate<Vec<HistogramBucket>>,
    pub weekly_throughput: Aggregate<Vec<WeekCount>>,
    pub merge_time_trend: Aggregate<MergeTrend>,
    pub due_date_compliance: Aggregate<DueDateCompliance>,
    pub calendar_density: Aggregate<Vec<CalendarDay>>,
    pub draft_comparison: Aggregate<DraftComparison>,
    pub priority_breakdown: Aggregate<Vec<PriorityStat>>,
    pub review_status: Aggregate<Vec<ReviewStatusCount>>,
    pub open_to_merge: Aggregate<OpenToMerge>,
    pub filter_options: Aggregate<FilterOptions>,
}

impl DashboardSummary {
    /// Build every aggregate over `records`, with the calendar ending on `today`
    pub fn build(records: &[PrMetric], today: NaiveDate) -> Self {
        Self {
            total_records: records.len(),
            merged_records: merged_records(records).count(),
            by_author_hours: mean_duration_by(records, GroupKey::Author, DurationUnit::Hours),
            by_repo_hours: mean_duration_by(records, GroupKey::Repo, DurationUnit::Hours),
            by_priority_hours: mean_duration_by(records, GroupKey::Priority, DurationUnit::Hours),
            duration_histogram: duration_histogram(records),
            weekly_throughput: weekly_throughput(records),
            merge_time_trend: merge_time_trend(records),
            due_date_compliance: due_date_compliance(records),
            calendar_density: calendar_density(records, today),
            draft_comparison: draft_comparison(records),
            priority_breakdown: priority_breakdown(records),
            review_status: review_status_overview(records),
            open_to_merge: open_to_merge_days(records),
            filter_options: filter_options(records),
        }
    }

    /// Replace the filter options with ones drawn from `rows`.
    ///
    /// Pass the rows of the date range alone so a selected author, repository
    /// or priority does not hide the other choices.
    pub fn with_filter_options(mut self, rows: &[PrMetric]) -> Self {
        self.filter_options = filter_options(rows);
        self
    }
}
