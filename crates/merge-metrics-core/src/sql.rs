//! Postgres upsert rendering for batch backfills.
//!
//! The rendered script creates the `pr_metrics` table if needed and upserts
//! every row in one `INSERT ... ON CONFLICT (repo, pr_number) DO UPDATE`
//! statement. `opened_at` is never overwritten and an existing `merged_at`
//! is kept, with `duration_ms` measured against it, matching the store
//! semantics.

use crate::model::PrMetric;
use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt::Write;

/// Table definition for the metric store
pub const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS pr_metrics (
  id bigint GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
  repo text NOT NULL,
  pr_number integer NOT NULL,
  title text NOT NULL,
  author text NOT NULL,
  opened_at timestamptz NOT NULL,
  ready_at timestamptz,
  merged_at timestamptz,
  duration_ms bigint,
  was_draft boolean NOT NULL DEFAULT false,
  priority text NOT NULL DEFAULT 'medium',
  due_date timestamptz,
  qa_review text NOT NULL DEFAULT 'pending',
  dev_review text NOT NULL DEFAULT 'pending',
  jira_ticket text,
  UNIQUE (repo, pr_number)
);";

const COLUMNS: &str = "repo, pr_number, title, author, opened_at, ready_at, merged_at, \
duration_ms, was_draft, priority, due_date, qa_review, dev_review, jira_ticket";

const ON_CONFLICT: &str = "ON CONFLICT (repo, pr_number) DO UPDATE SET
  title = EXCLUDED.title,
  author = EXCLUDED.author,
  ready_at = EXCLUDED.ready_at,
  merged_at = COALESCE(pr_metrics.merged_at, EXCLUDED.merged_at),
  duration_ms = CASE
    WHEN pr_metrics.merged_at IS NOT NULL AND EXCLUDED.ready_at IS NOT NULL
      THEN (EXTRACT(EPOCH FROM (pr_metrics.merged_at - EXCLUDED.ready_at)) * 1000)::bigint
    ELSE EXCLUDED.duration_ms
  END,
  was_draft = EXCLUDED.was_draft,
  priority = EXCLUDED.priority,
  due_date = EXCLUDED.due_date,
  qa_review = EXCLUDED.qa_review,
  dev_review = EXCLUDED.dev_review,
  jira_ticket = EXCLUDED.jira_ticket;";

/// Quote a string literal, doubling embedded single quotes
pub fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn timestamp(value: DateTime<Utc>) -> String {
    quote(&value.to_rfc3339_opts(SecondsFormat::Secs, true))
}

fn nullable<T>(value: Option<T>, render: impl FnOnce(T) -> String) -> String {
    value.map(render).unwrap_or_else(|| "NULL".to_string())
}

/// One `VALUES` tuple for `metric`
pub fn render_row(metric: &PrMetric) -> String {
    format!(
        "({}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {})",
        quote(&metric.repo.full_name()),
        metric.pr_number,
        quote(&metric.title),
        quote(&metric.author),
        timestamp(metric.opened_at),
        nullable(metric.ready_at, timestamp),
        nullable(metric.merged_at, timestamp),
        nullable(metric.duration_ms, |ms| ms.to_string()),
        metric.was_draft,
        quote(metric.priority.as_str()),
        nullable(metric.due_date, timestamp),
        quote(metric.qa_review.as_str()),
        quote(metric.dev_review.as_str()),
        nullable(metric.jira_ticket.as_deref(), quote),
    )
}

/// Schema plus one idempotent upsert statement covering `records`.
///
/// With no records only the schema is emitted.
pub fn render_upsert_batch(records: &[PrMetric]) -> String {
    let mut script = String::new();
    let _ = writeln!(script, "-- Schema\n{}\n", SCHEMA);

    if records.is_empty() {
        return script;
    }

    let rows: Vec<String> = records.iter().map(render_row).collect();
    let _ = writeln!(script, "INSERT INTO pr_metrics ({}) VALUES", COLUMNS);
    let _ = writeln!(script, "{}", rows.join(",\n"));
    let _ = writeln!(script, "{}", ON_CONFLICT);

    script
}

#[cfg(test)]
#[path = "sql_tests.rs"]
mod tests;
