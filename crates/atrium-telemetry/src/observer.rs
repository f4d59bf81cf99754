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

//! Performance observers and their registry.
//!
//! An observer is a source of completed metric samples: paint timing,
//! navigation timing, long tasks, and the web-vitals trio. The pipeline
//! drains every registered observer on each tick, but only while armed.

use serde_json::Value;
use std::fmt::Debug;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// The sample streams the pipeline knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObserverKind {
    /// Paint timing (first paint, first contentful paint).
    Paint,
    /// Navigation timing.
    Navigation,
    /// Tasks blocking the main thread.
    LongTask,
    /// Largest contentful paint.
    LargestContentfulPaint,
    /// First input delay.
    FirstInputDelay,
    /// Cumulative layout shift.
    CumulativeLayoutShift,
}

impl ObserverKind {
    /// Stable metric-name form used for recorded measurements.
    pub fn as_str(&self) -> &'static str {
        match self {
            ObserverKind::Paint => "paint",
            ObserverKind::Navigation => "navigation",
            ObserverKind::LongTask => "long-task",
            ObserverKind::LargestContentfulPaint => "largest-contentful-paint",
            ObserverKind::FirstInputDelay => "first-input-delay",
            ObserverKind::CumulativeLayoutShift => "cumulative-layout-shift",
        }
    }

    /// All built-in kinds, in registration order.
    pub fn all() -> &'static [ObserverKind] {
        &[
            ObserverKind::Paint,
            ObserverKind::Navigation,
            ObserverKind::LongTask,
            ObserverKind::LargestContentfulPaint,
            ObserverKind::FirstInputDelay,
            ObserverKind::CumulativeLayoutShift,
        ]
    }
}

/// One completed sample emitted by an observer.
#[derive(Debug, Clone)]
pub struct MetricSample {
    /// Which stream produced it.
    pub kind: ObserverKind,
    /// Recorded duration (or score expressed as time).
    pub duration: Duration,
    /// Free-form sample detail.
    pub metadata: Value,
}

/// A drainable source of metric samples.
pub trait PerformanceObserver: Send + Sync + Debug {
    /// The stream this observer feeds.
    fn kind(&self) -> ObserverKind;

    /// Takes all samples accumulated since the last drain.
    fn drain(&self) -> Vec<MetricSample>;
}

/// The standard observer implementation: the embedding shell pushes samples
/// in, the pipeline drains them out.
#[derive(Debug)]
pub struct SampleFeed {
    kind: ObserverKind,
    queue: Mutex<Vec<MetricSample>>,
}

impl SampleFeed {
    /// Creates an empty feed for `kind`.
    pub fn new(kind: ObserverKind) -> Self {
        Self {
            kind,
            queue: Mutex::new(Vec::new()),
        }
    }

    /// Queues a sample with the given duration and detail.
    pub fn push(&self, duration: Duration, metadata: Value) {
        self.queue.lock().unwrap().push(MetricSample {
            kind: self.kind,
            duration,
            metadata,
        });
    }

    /// Number of samples waiting to be drained.
    pub fn pending(&self) -> usize {
        self.queue.lock().unwrap().len()
    }
}

impl PerformanceObserver for SampleFeed {
    fn kind(&self) -> ObserverKind {
        self.kind
    }

    fn drain(&self) -> Vec<MetricSample> {
        std::mem::take(&mut *self.queue.lock().unwrap())
    }
}

/// A thread-safe registry of performance observers.
#[derive(Debug, Clone, Default)]
pub struct ObserverRegistry {
    observers: Arc<Mutex<Vec<Arc<dyn PerformanceObserver>>>>,
}

impl ObserverRegistry {
    /// Creates a new, empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an observer.
    pub fn register(&self, observer: Arc<dyn PerformanceObserver>) {
        let kind = observer.kind();
        self.observers.lock().unwrap().push(observer);
        log::info!("Registered performance observer: {}", kind.as_str());
    }

    /// Drains every registered observer, concatenating their samples.
    pub fn drain_all(&self) -> Vec<MetricSample> {
        let observers = self.observers.lock().unwrap().clone();
        observers.iter().flat_map(|o| o.drain()).collect()
    }

    /// Number of registered observers.
    pub fn len(&self) -> usize {
        self.observers.lock().unwrap().len()
    }

    /// `true` when no observers are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
