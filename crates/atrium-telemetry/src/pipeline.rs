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

//! The consent-gated measurement pipeline.

use crate::measurement::{now_millis, Measurement, MeasurementStatus};
use crate::observer::{MetricSample, ObserverRegistry, PerformanceObserver};
use crate::scheduler::ReportScheduler;
use crate::summary::{SummaryOptions, TelemetrySummary};
use atrium_consent::{ConsentEvent, ConsentGate};
use std::any::Any;
use std::collections::{HashMap, VecDeque};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

/// Default cap on the completed-measurement buffer.
const MEASUREMENT_CAP: usize = 500;

/// Invoked when a completed measurement exceeds its metric's threshold.
/// Panics inside the callback are caught and logged.
pub type ThresholdCallback = Arc<dyn Fn(&Measurement) + Send + Sync>;

struct Threshold {
    limit: Duration,
    callback: ThresholdCallback,
}

/// Collects measurements, polls observers, fires threshold alerts, and
/// produces summaries — but only while armed by a granted consent.
///
/// Disarmed, every tracking entry point is a no-op; arming and disarming
/// follow [`ConsentEvent`]s so a revocation mid-session both stops collection
/// and discards what was gathered.
pub struct TelemetryPipeline {
    armed: AtomicBool,
    active: Mutex<HashMap<Uuid, Measurement>>,
    completed: Mutex<VecDeque<Measurement>>,
    thresholds: Mutex<HashMap<String, Vec<Threshold>>>,
    observers: ObserverRegistry,
    scheduler: Mutex<ReportScheduler>,
    capacity: usize,
}

impl TelemetryPipeline {
    /// Creates a disarmed pipeline with the default buffer cap.
    pub fn new() -> Self {
        Self::with_capacity(MEASUREMENT_CAP)
    }

    /// Creates a disarmed pipeline whose completed buffer holds at most
    /// `capacity` measurements (oldest evicted).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            armed: AtomicBool::new(false),
            active: Mutex::new(HashMap::new()),
            completed: Mutex::new(VecDeque::new()),
            thresholds: Mutex::new(HashMap::new()),
            observers: ObserverRegistry::new(),
            scheduler: Mutex::new(ReportScheduler::default()),
            capacity,
        }
    }

    /// Resolves consent through `gate` and arms the pipeline only on a grant.
    /// Returns whether the pipeline ended up armed.
    pub async fn initialize_with_consent(&self, gate: &ConsentGate) -> bool {
        if gate.initialize_consent().await {
            self.arm();
        } else {
            log::info!("Telemetry stays disarmed: consent not granted");
        }
        self.is_armed()
    }

    /// Applies a consent transition: grants arm, declines disarm, a
    /// revocation additionally discards everything collected so far.
    pub fn handle_consent_event(&self, event: &ConsentEvent) {
        match event {
            ConsentEvent::Granted { .. } => self.arm(),
            ConsentEvent::Declined => self.disarm(),
            ConsentEvent::Revoked => {
                self.disarm();
                self.discard();
            }
        }
    }

    /// Arms the pipeline.
    pub fn arm(&self) {
        if !self.armed.swap(true, Ordering::SeqCst) {
            log::info!("Telemetry pipeline armed");
        }
    }

    /// Disarms the pipeline; buffered data is kept until discarded.
    pub fn disarm(&self) {
        if self.armed.swap(false, Ordering::SeqCst) {
            log::info!("Telemetry pipeline disarmed");
        }
    }

    /// `true` while consent-armed.
    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }

    /// Registers a performance observer to be drained on each tick.
    pub fn register_observer(&self, observer: Arc<dyn PerformanceObserver>) {
        self.observers.register(observer);
    }

    /// Opens a named measurement. Returns `None` when disarmed.
    pub fn start_measurement(
        &self,
        name: impl Into<String>,
        metadata: serde_json::Value,
    ) -> Option<Uuid> {
        if !self.is_armed() {
            return None;
        }
        let measurement = Measurement::begin(name, metadata);
        let id = measurement.id;
        self.active.lock().unwrap().insert(id, measurement);
        Some(id)
    }

    /// Closes a measurement, folding `extra` into its metadata, and returns
    /// the completed record.
    ///
    /// An unknown (or already ended) id warns and returns `None`.
    pub fn end_measurement(&self, id: Uuid, extra: serde_json::Value) -> Option<Measurement> {
        if !self.is_armed() {
            return None;
        }
        let Some(mut measurement) = self.active.lock().unwrap().remove(&id) else {
            log::warn!("end_measurement: unknown or already completed measurement id {id}");
            return None;
        };
        measurement.complete(extra);
        self.record(measurement.clone());
        Some(measurement)
    }

    /// Registers a threshold for `metric`: any completed measurement with
    /// that name whose duration exceeds `limit` triggers `callback`.
    pub fn set_threshold(
        &self,
        metric: impl Into<String>,
        limit: Duration,
        callback: ThresholdCallback,
    ) {
        self.thresholds
            .lock()
            .unwrap()
            .entry(metric.into())
            .or_default()
            .push(Threshold { limit, callback });
    }

    /// Drains observers and, when the report interval has elapsed, emits and
    /// returns a summary. No-op while disarmed.
    pub fn tick(&self) -> Option<TelemetrySummary> {
        if !self.is_armed() {
            return None;
        }
        for sample in self.observers.drain_all() {
            self.record_sample(sample);
        }

        let mut scheduler = self.scheduler.lock().unwrap();
        if !scheduler.should_report() {
            return None;
        }
        scheduler.mark_reported();
        drop(scheduler);

        let summary = self.summary(SummaryOptions::default());
        log::info!(
            "Telemetry summary: count={} mean={:.1}ms p95={:.1}ms",
            summary.count,
            summary.mean_ms,
            summary.p95_ms
        );
        Some(summary)
    }

    /// Computes an aggregate over completed measurements, optionally limited
    /// to those started within `options.timeframe`.
    pub fn summary(&self, options: SummaryOptions) -> TelemetrySummary {
        let completed = self.completed.lock().unwrap();
        let cutoff = options
            .timeframe
            .map(|window| now_millis().saturating_sub(window.as_millis() as u64));
        let selected: Vec<&Measurement> = completed
            .iter()
            .filter(|m| cutoff.map_or(true, |c| m.started_at >= c))
            .collect();
        TelemetrySummary::compute(&selected, options.include_details)
    }

    /// Number of completed measurements currently buffered.
    pub fn completed_count(&self) -> usize {
        self.completed.lock().unwrap().len()
    }

    /// Drops all collected data, open and completed.
    pub fn discard(&self) {
        let dropped =
            self.active.lock().unwrap().len() + self.completed.lock().unwrap().len();
        self.active.lock().unwrap().clear();
        self.completed.lock().unwrap().clear();
        if dropped > 0 {
            log::info!("Discarded {dropped} telemetry measurements");
        }
    }

    /// Changes the periodic-report interval.
    pub fn set_report_interval(&self, interval: Duration) {
        self.scheduler.lock().unwrap().set_interval(interval);
    }

    fn record_sample(&self, sample: MetricSample) {
        let measurement = Measurement::completed(
            sample.kind.as_str(),
            sample.duration,
            sample.metadata,
        );
        self.record(measurement);
    }

    fn record(&self, measurement: Measurement) {
        debug_assert_eq!(measurement.status, MeasurementStatus::Completed);
        self.check_thresholds(&measurement);

        let mut completed = self.completed.lock().unwrap();
        if completed.len() >= self.capacity {
            completed.pop_front();
        }
        completed.push_back(measurement);
    }

    fn check_thresholds(&self, measurement: &Measurement) {
        let thresholds = self.thresholds.lock().unwrap();
        let Some(entries) = thresholds.get(&measurement.name) else {
            return;
        };
        for threshold in entries {
            let Some(duration) = measurement.duration else {
                continue;
            };
            if duration <= threshold.limit {
                continue;
            }
            let callback = threshold.callback.clone();
            let result =
                std::panic::catch_unwind(AssertUnwindSafe(|| callback(measurement)));
            if result.is_err() {
                log::error!(
                    "Threshold callback for '{}' panicked; continuing",
                    measurement.name
                );
            }
        }
    }
}

impl Default for TelemetryPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TelemetryPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryPipeline")
            .field("armed", &self.is_armed())
            .field("active", &self.active.lock().unwrap().len())
            .field("completed", &self.completed_count())
            .field("observers", &self.observers.len())
            .finish()
    }
}

#[async_trait::async_trait]
impl atrium_core::Service for TelemetryPipeline {
    async fn destroy(&self) -> anyhow::Result<()> {
        self.disarm();
        self.discard();
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
