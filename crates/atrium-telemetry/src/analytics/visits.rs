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

//! The capped, durable visit log.

use crate::analytics::geo::GeoLocation;
use crate::measurement::now_millis;
use atrium_core::storage::{self, KeyValueStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Durable storage key for the visit log.
pub const VISITS_KEY: &str = "portfolio_visits";

/// Only the most recent visits are kept.
pub const VISIT_CAP: usize = 100;

/// One recorded page visit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitRecord {
    /// Unix milliseconds.
    pub timestamp: u64,
    /// Visited path.
    pub path: String,
    /// Referrer, when known.
    #[serde(default)]
    pub referrer: Option<String>,
    /// Session the visit belongs to.
    pub session_id: String,
    /// Coarse location annotation, when resolved.
    #[serde(default)]
    pub location: Option<GeoLocation>,
}

impl VisitRecord {
    /// Creates a record stamped with the current time.
    pub fn new(
        path: impl Into<String>,
        referrer: Option<String>,
        session_id: impl Into<String>,
        location: Option<GeoLocation>,
    ) -> Self {
        Self {
            timestamp: now_millis(),
            path: path.into(),
            referrer,
            session_id: session_id.into(),
            location,
        }
    }
}

/// Appends visits to durable storage, truncated to [`VISIT_CAP`] entries.
#[derive(Debug, Clone)]
pub struct VisitLog {
    store: Arc<dyn KeyValueStore>,
}

impl VisitLog {
    /// Creates a log over `store`.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Appends a visit, evicting the oldest entries beyond the cap.
    /// Storage failures are logged and dropped.
    pub fn record(&self, visit: VisitRecord) {
        let mut visits = self.all();
        visits.push(visit);
        if visits.len() > VISIT_CAP {
            let excess = visits.len() - VISIT_CAP;
            visits.drain(..excess);
        }
        if let Err(e) = storage::put_json(self.store.as_ref(), VISITS_KEY, &visits) {
            log::warn!("Failed to persist visit log: {e}");
        }
    }

    /// All stored visits, oldest first. A missing or corrupt log reads as
    /// empty.
    pub fn all(&self) -> Vec<VisitRecord> {
        match storage::get_json(self.store.as_ref(), VISITS_KEY) {
            Ok(Some(visits)) => visits,
            Ok(None) => Vec::new(),
            Err(e) => {
                log::warn!("Failed to read visit log: {e}");
                Vec::new()
            }
        }
    }
}
