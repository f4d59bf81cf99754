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

use std::time::{Duration, Instant};

/// Gates the pipeline's periodic summary reporting.
#[derive(Debug)]
pub struct ReportScheduler {
    last_report: Instant,
    interval: Duration,
}

impl ReportScheduler {
    /// Creates a scheduler with the given report interval.
    pub fn new(interval: Duration) -> Self {
        Self {
            last_report: Instant::now(),
            interval,
        }
    }

    /// Creates a scheduler with the default 30-second interval.
    pub fn with_default_interval() -> Self {
        Self::new(Duration::from_secs(30))
    }

    /// `true` once the interval has elapsed since the last report.
    pub fn should_report(&self) -> bool {
        self.last_report.elapsed() >= self.interval
    }

    /// Marks a report as emitted, resetting the timer.
    pub fn mark_reported(&mut self) {
        self.last_report = Instant::now();
    }

    /// The current interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Changes the interval.
    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }
}

impl Default for ReportScheduler {
    fn default() -> Self {
        Self::with_default_interval()
    }
}
