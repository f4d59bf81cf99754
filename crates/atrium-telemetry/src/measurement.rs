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

//! A single tracked span of work.

use serde_json::Value;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Whether a measurement is still open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasurementStatus {
    /// Started but not yet ended.
    Active,
    /// Ended; `duration` is set.
    Completed,
}

/// A named span with a start, an optional end, and free-form metadata.
///
/// Duration is taken from a monotonic clock; `started_at` is wall-clock Unix
/// milliseconds and exists for timeframe filtering in summaries.
#[derive(Debug, Clone)]
pub struct Measurement {
    /// Unique id handed back by `start_measurement`.
    pub id: Uuid,
    /// Metric name, e.g. `"paint"` or `"image-decode"`.
    pub name: String,
    /// Wall-clock start, Unix milliseconds.
    pub started_at: u64,
    /// Monotonic start.
    pub start: Instant,
    /// Elapsed time, set on completion.
    pub duration: Option<Duration>,
    /// Open or completed.
    pub status: MeasurementStatus,
    /// Free-form annotations, merged from start and end calls.
    pub metadata: Value,
}

impl Measurement {
    /// Opens a new active measurement.
    pub fn begin(name: impl Into<String>, metadata: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            started_at: now_millis(),
            start: Instant::now(),
            duration: None,
            status: MeasurementStatus::Active,
            metadata,
        }
    }

    /// A measurement that arrives already completed (observer samples).
    pub fn completed(name: impl Into<String>, duration: Duration, metadata: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            started_at: now_millis(),
            start: Instant::now(),
            duration: Some(duration),
            status: MeasurementStatus::Completed,
            metadata,
        }
    }

    /// Closes the measurement, folding `extra` into its metadata.
    pub fn complete(&mut self, extra: Value) {
        self.duration = Some(self.start.elapsed());
        self.status = MeasurementStatus::Completed;
        merge_metadata(&mut self.metadata, extra);
    }

    /// Duration in fractional milliseconds; `0.0` while still active.
    pub fn duration_ms(&self) -> f64 {
        self.duration.map(|d| d.as_secs_f64() * 1000.0).unwrap_or(0.0)
    }
}

/// Shallow-merges `extra` object keys into `metadata`; non-object extras are
/// ignored, a non-object target is replaced.
fn merge_metadata(metadata: &mut Value, extra: Value) {
    let Value::Object(extra) = extra else {
        return;
    };
    if extra.is_empty() {
        return;
    }
    match metadata {
        Value::Object(map) => map.extend(extra),
        other => *other = Value::Object(extra),
    }
}

pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn begin_opens_an_active_measurement() {
        let m = Measurement::begin("paint", json!({ "phase": "first" }));
        assert_eq!(m.status, MeasurementStatus::Active);
        assert!(m.duration.is_none());
        assert_eq!(m.duration_ms(), 0.0);
    }

    #[test]
    fn complete_sets_duration_and_merges_metadata() {
        let mut m = Measurement::begin("paint", json!({ "phase": "first" }));
        m.complete(json!({ "pixels": 1024 }));

        assert_eq!(m.status, MeasurementStatus::Completed);
        assert!(m.duration.is_some());
        assert_eq!(m.metadata["phase"], "first");
        assert_eq!(m.metadata["pixels"], 1024);
    }

    #[test]
    fn non_object_extra_leaves_metadata_alone() {
        let mut m = Measurement::begin("paint", json!({ "phase": "first" }));
        m.complete(json!(42));
        assert_eq!(m.metadata, json!({ "phase": "first" }));
    }

    #[test]
    fn ids_are_unique() {
        let a = Measurement::begin("x", Value::Null);
        let b = Measurement::begin("x", Value::Null);
        assert_ne!(a.id, b.id);
    }
}
