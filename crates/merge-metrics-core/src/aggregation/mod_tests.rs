//! Tests for the dashboard aggregation functions.

use super::*;
use crate::model::{MetricUpsert, TicketColumns};
use crate::RepoName;
use chrono::{DateTime, TimeZone, Utc};

const HOUR_MS: i64 = 3_600_000;

struct Row {
    author: &'static str,
    repo: &'static str,
    pr_number: u64,
    opened_at: DateTime<Utc>,
    duration_hours: Option<f64>,
    priority: Priority,
    was_draft: bool,
    due_date: Option<DateTime<Utc>>,
}

impl Row {
    fn merged(pr_number: u64, hours: f64) -> Self {
        Self {
            author: "alice",
            repo: "widgets",
            pr_number,
            opened_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            duration_hours: Some(hours),
            priority: Priority::Medium,
            was_draft: false,
            due_date: None,
        }
    }

    fn open(pr_number: u64) -> Self {
        Self {
            duration_hours: None,
            ..Self::merged(pr_number, 0.0)
        }
    }

    fn build(self) -> PrMetric {
        let mut upsert = MetricUpsert::new(
            RepoName::new("octo-org", self.repo).unwrap(),
            self.pr_number,
            "title",
            self.author,
            self.opened_at,
        );
        upsert.ready_at = Some(self.opened_at);
        upsert.ticket = Some(TicketColumns {
            jira_ticket: None,
            priority: self.priority,
            due_date: self.due_date,
        });
        upsert.was_draft = Some(self.was_draft);
        if let Some(hours) = self.duration_hours {
            let duration_ms = (hours * HOUR_MS as f64) as i64;
            upsert.duration_ms = Some(duration_ms);
            upsert.merged_at = Some(self.opened_at + chrono::Duration::milliseconds(duration_ms));
        }
        upsert.apply(None)
    }
}

// ============================================================================
// Scalar statistics
// ============================================================================

#[test]
fn test_median_even_count_averages_middle() {
    assert_eq!(median(&[1.0, 2.0, 3.0, 4.0]), Aggregate::Data(2.5));
    assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Aggregate::Data(2.5));
}

#[test]
fn test_median_odd_count_takes_middle() {
    assert_eq!(median(&[1.0, 2.0, 3.0]), Aggregate::Data(2.0));
    assert_eq!(median(&[3.0, 1.0, 2.0]), Aggregate::Data(2.0));
}

#[test]
fn test_mean_and_median_ignore_non_finite() {
    assert_eq!(mean(&[]), Aggregate::NoData);
    assert_eq!(median(&[f64::NAN]), Aggregate::NoData);
    assert_eq!(mean(&[2.0, f64::INFINITY, 4.0]), Aggregate::Data(3.0));
}

#[test]
fn test_median_in_days_from_records() {
    let records: Vec<PrMetric> = [24.0, 48.0, 72.0, 96.0]
        .iter()
        .enumerate()
        .map(|(i, h)| Row::merged(i as u64, *h).build())
        .collect();

    let stats = mean_duration_by(&records, GroupKey::Author, DurationUnit::Days)
        .into_data()
        .unwrap();
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].median, 2.5);
    assert_eq!(stats[0].mean, 2.5);
    assert_eq!(stats[0].count, 4);
}

// ============================================================================
// Empty input
// ============================================================================

#[test]
fn test_every_aggregation_handles_empty_input() {
    let today = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
    let summary = DashboardSummary::build(&[], today);

    assert_eq!(summary.total_records, 0);
    assert!(summary.by_author_hours.is_no_data());
    assert!(summary.by_repo_hours.is_no_data());
    assert!(summary.by_priority_hours.is_no_data());
    assert!(summary.duration_histogram.is_no_data());
    assert!(summary.weekly_throughput.is_no_data());
    assert!(summary.merge_time_trend.is_no_data());
    assert!(summary.due_date_compliance.is_no_data());
    assert!(summary.calendar_density.is_no_data());
    assert!(summary.draft_comparison.is_no_data());
    assert!(summary.priority_breakdown.is_no_data());
    assert!(summary.review_status.is_no_data());
    assert!(summary.open_to_merge.is_no_data());
    assert!(summary.filter_options.is_no_data());
}

#[test]
fn test_unmerged_only_input_has_no_duration_data() {
    let records = vec![Row::open(1).build(), Row::open(2).build()];

    assert!(mean_duration_by(&records, GroupKey::Repo, DurationUnit::Hours).is_no_data());
    assert!(duration_histogram(&records).is_no_data());
    assert!(weekly_throughput(&records).is_no_data());
    assert!(review_status_overview(&records).data().is_some());
}

#[test]
fn test_no_data_serializes_explicitly() {
    let json = serde_json::to_value(Aggregate::<f64>::NoData).unwrap();
    assert_eq!(json, serde_json::json!({ "status": "no_data" }));

    let json = serde_json::to_value(Aggregate::Data(1.5)).unwrap();
    assert_eq!(json, serde_json::json!({ "status": "data", "data": 1.5 }));
}

// ============================================================================
// Grouping and buckets
// ============================================================================

#[test]
fn test_groups_sorted_by_mean_descending() {
    let records = vec![
        Row {
            author: "alice",
            ..Row::merged(1, 2.0)
        }
        .build(),
        Row {
            author: "bob",
            ..Row::merged(2, 10.0)
        }
        .build(),
        Row {
            author: "bob",
            ..Row::merged(3, 20.0)
        }
        .build(),
    ];

    let stats = mean_duration_by(&records, GroupKey::Author, DurationUnit::Hours)
        .into_data()
        .unwrap();

    assert_eq!(stats[0].key, "bob");
    assert_eq!(stats[0].mean, 15.0);
    assert_eq!(stats[0].count, 2);
    assert_eq!(stats[1].key, "alice");
}

#[test]
fn test_histogram_bounds_are_exclusive_upper() {
    let records: Vec<PrMetric> = [0.5, 1.0, 3.9, 4.0, 23.0, 24.0, 71.0, 167.0, 168.0, 900.0]
        .iter()
        .enumerate()
        .map(|(i, h)| Row::merged(i as u64, *h).build())
        .collect();

    let buckets = duration_histogram(&records).into_data().unwrap();
    let counts: Vec<(String, usize)> = buckets
        .into_iter()
        .map(|b| (b.label, b.count))
        .collect();

    assert_eq!(
        counts,
        vec![
            ("<1h".to_string(), 1),
            ("1-4h".to_string(), 2),
            ("4-8h".to_string(), 1),
            ("8-24h".to_string(), 1),
            ("1-3d".to_string(), 2),
            ("3-7d".to_string(), 1),
            (">7d".to_string(), 2),
        ]
    );
}

#[test]
fn test_weekly_throughput_uses_iso_weeks() {
    // 2024-12-30 belongs to ISO week 2025-W01
    let late_december = Row {
        opened_at: Utc.with_ymd_and_hms(2024, 12, 30, 8, 0, 0).unwrap(),
        ..Row::merged(1, 1.0)
    };
    let early_january = Row {
        opened_at: Utc.with_ymd_and_hms(2024, 1, 3, 8, 0, 0).unwrap(),
        ..Row::merged(2, 1.0)
    };
    let same_week = Row {
        opened_at: Utc.with_ymd_and_hms(2024, 1, 4, 8, 0, 0).unwrap(),
        ..Row::merged(3, 1.0)
    };

    let weeks = weekly_throughput(&[
        late_december.build(),
        early_january.build(),
        same_week.build(),
    ])
    .into_data()
    .unwrap();

    assert_eq!(
        weeks,
        vec![
            WeekCount {
                week: "2024-W01".to_string(),
                count: 2
            },
            WeekCount {
                week: "2025-W01".to_string(),
                count: 1
            },
        ]
    );
}

// ============================================================================
// Compliance
// ============================================================================

#[test]
fn test_due_date_compliance_late_and_equal() {
    let merged_jan_10 = Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap();
    let opened = merged_jan_10 - chrono::Duration::hours(1);

    let late = Row {
        opened_at: opened,
        due_date: Some(Utc.with_ymd_and_hms(2024, 1, 9, 0, 0, 0).unwrap()),
        ..Row::merged(1, 1.0)
    };
    let exactly_due = Row {
        opened_at: opened,
        due_date: Some(merged_jan_10),
        ..Row::merged(2, 1.0)
    };
    let no_due_date = Row::merged(3, 1.0);

    let compliance =
        due_date_compliance(&[late.build(), exactly_due.build(), no_due_date.build()])
            .into_data()
            .unwrap();

    assert_eq!(compliance.on_time, 1);
    assert_eq!(compliance.late, 1);
    assert_eq!(compliance.total, 2);
    assert_eq!(compliance.on_time_pct, 50.0);
    assert_eq!(compliance.late_pct, 50.0);
}

// ============================================================================
// Calendar and breakdowns
// ============================================================================

#[test]
fn test_calendar_lists_every_day_of_window() {
    let today = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
    let in_window = Row {
        opened_at: Utc.with_ymd_and_hms(2024, 3, 30, 10, 0, 0).unwrap(),
        ..Row::merged(1, 1.0)
    };
    let outside_window = Row {
        opened_at: Utc.with_ymd_and_hms(2023, 1, 1, 10, 0, 0).unwrap(),
        ..Row::merged(2, 1.0)
    };

    let days = calendar_density(&[in_window.build(), outside_window.build()], today)
        .into_data()
        .unwrap();

    assert_eq!(days.len(), 365);
    assert_eq!(days.first().unwrap().date, today - chrono::Duration::days(364));
    assert_eq!(days.last().unwrap().date, today);
    assert_eq!(days.iter().map(|d| d.count).sum::<usize>(), 1);
    assert_eq!(days[363].count, 1);
}

#[test]
fn test_draft_comparison_splits_by_was_draft() {
    let records = vec![
        Row {
            was_draft: true,
            ..Row::merged(1, 10.0)
        }
        .build(),
        Row::merged(2, 2.0).build(),
        Row::merged(3, 4.0).build(),
    ];

    let comparison = draft_comparison(&records).into_data().unwrap();
    assert_eq!(comparison.drafts.count, 1);
    assert_eq!(comparison.drafts.mean_hours, Some(10.0));
    assert_eq!(comparison.non_drafts.count, 2);
    assert_eq!(comparison.non_drafts.mean_hours, Some(3.0));
}

#[test]
fn test_priority_breakdown_lists_all_levels_in_order() {
    let records = vec![
        Row {
            priority: Priority::Highest,
            ..Row::merged(1, 6.0)
        }
        .build(),
        Row::merged(2, 2.0).build(),
    ];

    let breakdown = priority_breakdown(&records).into_data().unwrap();
    let levels: Vec<Priority> = breakdown.iter().map(|p| p.priority).collect();

    assert_eq!(levels, Priority::DESCENDING.to_vec());
    assert_eq!(breakdown[0].stat.count, 1);
    assert_eq!(breakdown[0].stat.mean_hours, Some(6.0));
    assert_eq!(breakdown[1].stat.count, 0);
    assert_eq!(breakdown[1].stat.mean_hours, None);
}

#[test]
fn test_review_overview_counts_all_rows() {
    let records = vec![Row::open(1).build(), Row::merged(2, 1.0).build()];
    let overview = review_status_overview(&records).into_data().unwrap();

    let pending = overview
        .iter()
        .find(|c| c.status == ReviewStatus::Pending)
        .unwrap();
    assert_eq!(pending.qa, 2);
    assert_eq!(pending.dev, 2);
}

#[test]
fn test_open_to_merge_days() {
    let records = vec![
        Row::merged(1, 24.0).build(),
        Row::merged(2, 72.0).build(),
        Row::open(3).build(),
    ];
    let stats = open_to_merge_days(&records).into_data().unwrap();
    assert_eq!(stats.count, 2);
    assert_eq!(stats.mean_days, 2.0);
    assert_eq!(stats.median_days, 2.0);
}

#[test]
fn test_filter_options_are_sorted_and_distinct() {
    let records = vec![
        Row {
            author: "zed",
            repo: "gadgets",
            ..Row::open(1)
        }
        .build(),
        Row::open(2).build(),
        Row::merged(3, 1.0).build(),
    ];

    let options = filter_options(&records).into_data().unwrap();
    assert_eq!(options.authors, vec!["alice", "zed"]);
    assert_eq!(options.repos, vec!["octo-org/gadgets", "octo-org/widgets"]);
}

#[test]
fn test_summary_filter_options_from_wider_rows() {
    let today = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
    let selected = vec![Row::merged(1, 2.0).build()];
    let whole_range = vec![
        Row::merged(1, 2.0).build(),
        Row {
            author: "zed",
            ..Row::open(2)
        }
        .build(),
    ];

    let summary = DashboardSummary::build(&selected, today).with_filter_options(&whole_range);

    assert_eq!(summary.total_records, 1);
    let options = summary.filter_options.into_data().unwrap();
    assert_eq!(options.authors, vec!["alice", "zed"]);
}
