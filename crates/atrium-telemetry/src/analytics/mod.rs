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

//! Visitor analytics: identity, visit log, geolocation.

pub mod geo;
pub mod visitor;
pub mod visits;

pub use geo::{GeoLocation, GeoProvider, GeoResolver, HttpGeoProvider, GEO_REQUEST_TIMEOUT};
pub use visitor::{visitor_id, SessionStore, VISITOR_ID_KEY};
pub use visits::{VisitLog, VisitRecord, VISITS_KEY, VISIT_CAP};

use atrium_core::storage::KeyValueStore;
use atrium_core::Service;
use std::any::Any;
use std::sync::Arc;

/// The analytics service: stable visitor identity, per-process session
/// identity, and the location-annotated visit log.
///
/// Consent gating happens upstream; callers only invoke this while the
/// telemetry pipeline is armed.
#[derive(Debug)]
pub struct Analytics {
    store: Arc<dyn KeyValueStore>,
    session: SessionStore,
    visits: VisitLog,
    geo: GeoResolver,
}

impl Analytics {
    /// Creates the analytics service over `store` with the given provider
    /// chain.
    pub fn new(store: Arc<dyn KeyValueStore>, geo: GeoResolver) -> Self {
        Self {
            visits: VisitLog::new(store.clone()),
            session: SessionStore::new(),
            store,
            geo,
        }
    }

    /// The stable visitor id, minted on first use.
    pub fn visitor_id(&self) -> String {
        visitor_id(self.store.as_ref())
    }

    /// The session id, minted on first access.
    pub fn session_id(&self) -> String {
        self.session.session_id()
    }

    /// Records a visit, annotated with a resolved location when any
    /// providers are configured.
    pub async fn record_visit(&self, path: &str, referrer: Option<String>) -> VisitRecord {
        let location = if self.geo.is_empty() {
            None
        } else {
            Some(self.geo.resolve().await)
        };
        let record = VisitRecord::new(path, referrer, self.session_id(), location);
        self.visits.record(record.clone());
        record
    }

    /// All stored visits, oldest first.
    pub fn visits(&self) -> Vec<VisitRecord> {
        self.visits.all()
    }
}

#[async_trait::async_trait]
impl Service for Analytics {
    fn as_any(&self) -> &dyn Any {
        self
    }
}
