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

//! # Atrium Telemetry
//!
//! The consent-gated measurement pipeline: explicit span tracking, pluggable
//! performance observers, threshold alerting, bounded buffers, and periodic
//! summary reporting. The whole pipeline is inert until armed by a granted
//! consent; disarmed, every tracking call is a no-op.
//!
//! The `analytics` module carries the adjacent visitor bookkeeping: the
//! stable visitor id, the session id, the capped visit log, and the
//! geolocation provider chain.

pub mod analytics;
pub mod measurement;
pub mod observer;
pub mod pipeline;
pub mod scheduler;
pub mod summary;

pub use measurement::{Measurement, MeasurementStatus};
pub use observer::{MetricSample, ObserverKind, ObserverRegistry, PerformanceObserver, SampleFeed};
pub use pipeline::TelemetryPipeline;
pub use scheduler::ReportScheduler;
pub use summary::{SummaryOptions, TelemetrySummary};
