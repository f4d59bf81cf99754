// Copyright 2026 the Atrium Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Aggregate statistics over completed measurements.

use crate::measurement::Measurement;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// How many slowest entries a summary carries.
const SLOWEST_LIMIT: usize = 10;

/// Options for [`TelemetryPipeline::summary`](crate::TelemetryPipeline::summary).
#[derive(Debug, Clone, Default)]
pub struct SummaryOptions {
    /// Only measurements started within this window count; `None` means all.
    pub timeframe: Option<Duration>,
    /// Include the per-measurement detail list.
    pub include_details: bool,
}

/// One entry in the slowest-measurements list.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SlowestEntry {
    /// Metric name.
    pub name: String,
    /// Duration in milliseconds.
    pub duration_ms: f64,
}

/// Per-measurement detail, present when requested.
#[derive(Debug, Clone, Serialize)]
pub struct MeasurementDetail {
    /// Metric name.
    pub name: String,
    /// Duration in milliseconds.
    pub duration_ms: f64,
    /// Wall-clock start, Unix milliseconds.
    pub started_at: u64,
    /// The measurement's metadata.
    pub metadata: Value,
}

/// Aggregate view over the completed-measurement buffer.
#[derive(Debug, Clone, Serialize)]
pub struct TelemetrySummary {
    /// Number of measurements in the window.
    pub count: usize,
    /// Arithmetic mean, milliseconds.
    pub mean_ms: f64,
    /// Median, milliseconds.
    pub median_ms: f64,
    /// 95th percentile (nearest rank), milliseconds.
    pub p95_ms: f64,
    /// Up to ten slowest measurements, slowest first.
    pub slowest: Vec<SlowestEntry>,
    /// Full detail list, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<MeasurementDetail>>,
}

impl TelemetrySummary {
    /// Computes a summary over `measurements` (already timeframe-filtered).
    pub(crate) fn compute(measurements: &[&Measurement], include_details: bool) -> Self {
        let mut durations: Vec<f64> = measurements.iter().map(|m| m.duration_ms()).collect();
        durations.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let mut slowest: Vec<SlowestEntry> = measurements
            .iter()
            .map(|m| SlowestEntry {
                name: m.name.clone(),
                duration_ms: m.duration_ms(),
            })
            .collect();
        slowest.sort_by(|a, b| {
            b.duration_ms
                .partial_cmp(&a.duration_ms)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        slowest.truncate(SLOWEST_LIMIT);

        let details = include_details.then(|| {
            measurements
                .iter()
                .map(|m| MeasurementDetail {
                    name: m.name.clone(),
                    duration_ms: m.duration_ms(),
                    started_at: m.started_at,
                    metadata: m.metadata.clone(),
                })
                .collect()
        });

        Self {
            count: durations.len(),
            mean_ms: mean(&durations),
            median_ms: median(&durations),
            p95_ms: percentile(&durations, 95),
            slowest,
            details,
        }
    }
}

fn mean(sorted: &[f64]) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    sorted.iter().sum::<f64>() / sorted.len() as f64
}

fn median(sorted: &[f64]) -> f64 {
    match sorted.len() {
        0 => 0.0,
        n if n % 2 == 1 => sorted[n / 2],
        n => (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0,
    }
}

/// Nearest-rank percentile over an ascending-sorted slice.
fn percentile(sorted: &[f64], pct: usize) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = (pct * sorted.len()).div_ceil(100).max(1);
    sorted[rank - 1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statistics_on_empty_input_are_zero() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(median(&[]), 0.0);
        assert_eq!(percentile(&[], 95), 0.0);
    }

    #[test]
    fn median_handles_odd_and_even_counts() {
        assert_eq!(median(&[1.0, 2.0, 3.0]), 2.0);
        assert_eq!(median(&[1.0, 2.0, 3.0, 4.0]), 2.5);
    }

    #[test]
    fn p95_is_nearest_rank() {
        let values: Vec<f64> = (1..=100).map(|v| v as f64).collect();
        assert_eq!(percentile(&values, 95), 95.0);
        assert_eq!(percentile(&[10.0], 95), 10.0);
    }

    #[test]
    fn summary_picks_the_slowest_first() {
        let mut slow = Measurement::begin("slow", Value::Null);
        slow.complete(Value::Null);
        slow.duration = Some(Duration::from_millis(200));
        let mut fast = Measurement::begin("fast", Value::Null);
        fast.complete(Value::Null);
        fast.duration = Some(Duration::from_millis(5));

        let summary = TelemetrySummary::compute(&[&fast, &slow], false);
        assert_eq!(summary.count, 2);
        assert_eq!(summary.slowest[0].name, "slow");
        assert!(summary.details.is_none());
    }

    #[test]
    fn details_are_included_on_request() {
        let mut m = Measurement::begin("x", Value::Null);
        m.complete(Value::Null);

        let summary = TelemetrySummary::compute(&[&m], true);
        let details = summary.details.expect("details requested");
        assert_eq!(details.len(), 1);
        assert_eq!(details[0].name, "x");
    }
}
