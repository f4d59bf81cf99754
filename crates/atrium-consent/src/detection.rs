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

//! Best-effort EU jurisdiction detection.
//!
//! Three independent heuristics, ORed: timezone membership, language
//! membership, and day-before-month date ordering. This is deliberately a
//! coarse heuristic, not a geolocation oracle; the individual results are
//! cached alongside the verdict for 24 hours.

use crate::environment::VisitorEnvironment;
use crate::record::{EuDetectionCache, MethodResults, EU_DETECTION_KEY};
use atrium_core::storage::{self, KeyValueStore};
use std::sync::Arc;

/// IANA timezones of EU member states.
const EU_TIMEZONES: &[&str] = &[
    "Europe/Amsterdam",
    "Europe/Athens",
    "Europe/Berlin",
    "Europe/Bratislava",
    "Europe/Brussels",
    "Europe/Bucharest",
    "Europe/Budapest",
    "Europe/Copenhagen",
    "Europe/Dublin",
    "Europe/Helsinki",
    "Europe/Lisbon",
    "Europe/Ljubljana",
    "Europe/Luxembourg",
    "Europe/Madrid",
    "Europe/Malta",
    "Europe/Nicosia",
    "Europe/Paris",
    "Europe/Prague",
    "Europe/Riga",
    "Europe/Rome",
    "Europe/Sofia",
    "Europe/Stockholm",
    "Europe/Tallinn",
    "Europe/Vienna",
    "Europe/Vilnius",
    "Europe/Warsaw",
    "Europe/Zagreb",
    "Atlantic/Canary",
    "Atlantic/Madeira",
];

/// Primary language subtags of EU official languages. English is absent on
/// purpose: alone it says nothing about jurisdiction.
const EU_LANGUAGES: &[&str] = &[
    "bg", "cs", "da", "de", "el", "es", "et", "fi", "fr", "ga", "hr", "hu", "it", "lt", "lv",
    "mt", "nl", "pl", "pt", "ro", "sk", "sl", "sv",
];

/// Runs (and caches) the EU jurisdiction heuristics.
#[derive(Debug)]
pub struct EuDetector {
    environment: Arc<dyn VisitorEnvironment>,
    store: Arc<dyn KeyValueStore>,
}

impl EuDetector {
    /// Creates a detector reading from `environment` and caching in `store`.
    pub fn new(environment: Arc<dyn VisitorEnvironment>, store: Arc<dyn KeyValueStore>) -> Self {
        Self { environment, store }
    }

    /// Returns the cached verdict if younger than 24 hours, otherwise
    /// re-evaluates the heuristics and refreshes the cache.
    ///
    /// Storage failures are logged and never prevent a verdict.
    pub fn detect(&self) -> bool {
        self.detect_with_results().0
    }

    /// Like [`detect`](Self::detect), also returning the per-heuristic
    /// outcomes.
    pub fn detect_with_results(&self) -> (bool, MethodResults) {
        match storage::get_json::<EuDetectionCache>(self.store.as_ref(), EU_DETECTION_KEY) {
            Ok(Some(cache)) if cache.is_fresh() => {
                log::trace!("EU detection cache hit: is_eu={}", cache.is_eu);
                return (cache.is_eu, cache.method_results);
            }
            Ok(_) => {}
            Err(e) => log::warn!("Failed to read EU detection cache: {e}"),
        }

        let results = MethodResults {
            timezone: self.timezone_is_eu(),
            language: self.language_is_eu(),
            date_format: self.environment.day_before_month().unwrap_or(false),
        };
        let is_eu = results.timezone || results.language || results.date_format;
        log::debug!(
            "EU detection: tz={} lang={} date={} -> {is_eu}",
            results.timezone,
            results.language,
            results.date_format
        );

        let cache = EuDetectionCache::new(is_eu, results);
        if let Err(e) = storage::put_json(self.store.as_ref(), EU_DETECTION_KEY, &cache) {
            log::warn!("Failed to persist EU detection cache: {e}");
        }
        (is_eu, results)
    }

    fn timezone_is_eu(&self) -> bool {
        self.environment
            .timezone()
            .is_some_and(|tz| EU_TIMEZONES.contains(&tz.as_str()))
    }

    fn language_is_eu(&self) -> bool {
        self.environment
            .language()
            .and_then(|tag| tag.split('-').next().map(str::to_ascii_lowercase))
            .is_some_and(|primary| EU_LANGUAGES.contains(&primary.as_str()))
    }
}
