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

//! Persisted consent and detection records.

use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Version of the consent record scheme. A stored record carrying any other
/// version is treated as absent and consent is re-requested.
pub const CONSENT_SCHEME_VERSION: &str = "1.0";

/// Storage key for the persisted [`ConsentRecord`].
pub const CONSENT_KEY: &str = "portfolio_performance_consent";

/// Storage key for the persisted [`EuDetectionCache`].
pub const EU_DETECTION_KEY: &str = "portfolio_eu_detection";

/// How long a cached EU detection result stays valid.
pub const EU_DETECTION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// How a consent decision was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsentMethod {
    /// Granted automatically for a confidently non-EU visitor.
    #[serde(rename = "auto")]
    Auto,
    /// An explicit visitor action (banner button, settings page).
    #[serde(rename = "manual")]
    Manual,
    /// The UI's own grant-after-countdown flow.
    #[serde(rename = "auto-countdown")]
    AutoCountdown,
}

/// A consent decision, immutable once written; a new decision supersedes
/// (never merges with) the stored one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsentRecord {
    /// Whether telemetry may run.
    pub granted: bool,
    /// Unix milliseconds when the decision was made.
    pub timestamp: u64,
    /// Scheme version the record was written under.
    pub version: String,
    /// How the decision was reached.
    pub method: ConsentMethod,
    /// Free-form origin of the decision (e.g. "banner", "settings").
    #[serde(default)]
    pub reason: Option<String>,
}

impl ConsentRecord {
    /// Creates a record stamped with the current time and scheme version.
    pub fn new(granted: bool, method: ConsentMethod, reason: Option<String>) -> Self {
        Self {
            granted,
            timestamp: unix_millis(),
            version: CONSENT_SCHEME_VERSION.to_string(),
            method,
            reason,
        }
    }

    /// `true` when the record was written under the running scheme version.
    pub fn is_current(&self) -> bool {
        self.version == CONSENT_SCHEME_VERSION
    }
}

/// Outcome of each individual EU heuristic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodResults {
    /// Timezone is on the EU allow-list.
    pub timezone: bool,
    /// Primary language is on the EU allow-list.
    pub language: bool,
    /// Locale writes the day before the month.
    pub date_format: bool,
}

/// Cached jurisdiction verdict, valid for 24 hours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EuDetectionCache {
    /// The ORed verdict.
    pub is_eu: bool,
    /// Unix milliseconds when the detection ran.
    pub timestamp: u64,
    /// The three individual heuristic outcomes.
    pub method_results: MethodResults,
}

impl EuDetectionCache {
    /// Creates a cache entry stamped with the current time.
    pub fn new(is_eu: bool, method_results: MethodResults) -> Self {
        Self {
            is_eu,
            timestamp: unix_millis(),
            method_results,
        }
    }

    /// `true` while the entry is younger than [`EU_DETECTION_TTL`].
    pub fn is_fresh(&self) -> bool {
        let age_ms = unix_millis().saturating_sub(self.timestamp);
        age_ms < EU_DETECTION_TTL.as_millis() as u64
    }
}

/// Current time as Unix milliseconds.
pub(crate) fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
