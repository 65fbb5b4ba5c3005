//! Linear trend of merge time over chronologically ordered merges.
//!
//! The regression runs against position in merge order, not wall-clock time,
//! so bursts of merges do not dominate the fit.

use super::{median, merged_records, Aggregate};
use crate::model::PrMetric;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Slopes within `±FLAT_SLOPE_THRESHOLD` days per merge are flat
pub const FLAT_SLOPE_THRESHOLD: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Flat,
    Increasing,
    Decreasing,
}

impl TrendDirection {
    pub fn from_slope(slope: f64) -> Self {
        if slope > FLAT_SLOPE_THRESHOLD {
            Self::Increasing
        } else if slope < -FLAT_SLOPE_THRESHOLD {
            Self::Decreasing
        } else {
            Self::Flat
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub index: usize,
    pub merged_at: DateTime<Utc>,
    pub days: f64,
    pub fitted: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergeTrend {
    pub slope: f64,
    pub intercept: f64,
    pub direction: TrendDirection,
    pub median_days: f64,
    pub points: Vec<TrendPoint>,
}

/// Ordinary least squares of ready-to-merge days against merge order.
///
/// A single merge gives slope 0 through its own value.
pub fn merge_time_trend(records: &[PrMetric]) -> Aggregate<MergeTrend> {
    let mut series: Vec<(DateTime<Utc>, f64)> = merged_records(records)
        .filter_map(|r| Some((r.merged_at?, r.duration_days()?)))
        .filter(|(_, days)| days.is_finite())
        .collect();

    if series.is_empty() {
        return Aggregate::NoData;
    }

    series.sort_by_key(|(merged_at, _)| *merged_at);

    let ys: Vec<f64> = series.iter().map(|(_, days)| *days).collect();
    let (slope, intercept) = least_squares(&ys);

    let Aggregate::Data(median_days) = median(&ys) else {
        return Aggregate::NoData;
    };

    let points = series
        .into_iter()
        .enumerate()
        .map(|(index, (merged_at, days))| TrendPoint {
            index,
            merged_at,
            days,
            fitted: intercept + slope * index as f64,
        })
        .collect();

    Aggregate::Data(MergeTrend {
        slope,
        intercept,
        direction: TrendDirection::from_slope(slope),
        median_days,
        points,
    })
}

/// `(slope, intercept)` of `y` against `x = 0..n`; `ys` must be non-empty
fn least_squares(ys: &[f64]) -> (f64, f64) {
    let n = ys.len() as f64;
    if ys.len() < 2 {
        return (0.0, ys.first().copied().unwrap_or(0.0));
    }

    let (mut sum_x, mut sum_y, mut sum_xy, mut sum_xx) = (0.0, 0.0, 0.0, 0.0);
    for (i, y) in ys.iter().enumerate() {
        let x = i as f64;
        sum_x += x;
        sum_y += y;
        sum_xy += x * y;
        sum_xx += x * x;
    }

    let denominator = n * sum_xx - sum_x * sum_x;
    let slope = if denominator == 0.0 {
        0.0
    } else {
        (n * sum_xy - sum_x * sum_y) / denominator
    };
    let intercept = (sum_y - slope * sum_x) / n;

    (slope, intercept)
}

#[cfg(test)]
#[path = "trend_tests.rs"]
mod tests;
