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

//! The consent gate state machine.

use crate::detection::EuDetector;
use crate::record::{ConsentMethod, ConsentRecord, CONSENT_KEY};
use crate::request::{ConsentRequest, ConsentResponder};
use atrium_core::storage::{self, KeyValueStore};
use atrium_core::EventBus;
use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

/// Where the gate currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsentState {
    /// `initialize_consent` has not run yet.
    Unchecked,
    /// A banner request is out and the gate is awaiting the decision.
    Pending,
    /// Telemetry may run.
    Granted,
    /// Telemetry must not run.
    Declined,
}

/// Events the gate publishes for downstream consumers (telemetry arming).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsentEvent {
    /// Consent is in effect.
    Granted {
        /// How it was reached.
        method: ConsentMethod,
    },
    /// Consent was refused.
    Declined,
    /// A previously granted consent was withdrawn.
    Revoked,
}

/// Decides whether telemetry may run for this visitor.
///
/// The decision procedure runs at most once per process (later calls return
/// the settled answer): a persisted, version-current record is adopted
/// outright; otherwise a confidently non-EU visitor is auto-granted, and an
/// EU (or ambiguous) visitor is asked via a [`ConsentRequest::Banner`] sent
/// over the injected channel. If no UI answers, the gate falls closed.
pub struct ConsentGate {
    detector: EuDetector,
    store: Arc<dyn KeyValueStore>,
    requests: flume::Sender<ConsentRequest>,
    events: EventBus<ConsentEvent>,
    state: RwLock<ConsentState>,
    checked: AtomicBool,
}

impl ConsentGate {
    /// Creates a gate. Banner requests go out on `requests`; the caller keeps
    /// the receiving half and wires it to a UI surface.
    pub fn new(
        detector: EuDetector,
        store: Arc<dyn KeyValueStore>,
        requests: flume::Sender<ConsentRequest>,
    ) -> Self {
        Self {
            detector,
            store,
            requests,
            events: EventBus::new(),
            state: RwLock::new(ConsentState::Unchecked),
            checked: AtomicBool::new(false),
        }
    }

    /// Runs the consent decision procedure once and returns whether telemetry
    /// may run. Subsequent calls return the settled answer without side
    /// effects.
    pub async fn initialize_consent(&self) -> bool {
        if self.checked.swap(true, Ordering::SeqCst) {
            return self.has_consent();
        }

        match storage::get_json::<ConsentRecord>(self.store.as_ref(), CONSENT_KEY) {
            Ok(Some(record)) if record.is_current() => {
                log::info!(
                    "Adopting stored consent record: granted={} method={:?}",
                    record.granted,
                    record.method
                );
                return self.settle(record.granted, record.method);
            }
            Ok(Some(record)) => {
                log::info!(
                    "Stored consent record has scheme version '{}'; re-requesting consent",
                    record.version
                );
            }
            Ok(None) => {}
            Err(e) => log::warn!("Failed to read consent record: {e}"),
        }

        if !self.detector.detect() {
            log::info!("Visitor is outside EU jurisdiction; granting consent automatically");
            self.persist(ConsentRecord::new(true, ConsentMethod::Auto, None));
            return self.settle(true, ConsentMethod::Auto);
        }

        self.request_decision().await
    }

    /// Sends the banner request and awaits the visitor's decision.
    async fn request_decision(&self) -> bool {
        *self.state.write().unwrap() = ConsentState::Pending;

        let (responder, rx) = ConsentResponder::channel();
        if self
            .requests
            .send(ConsentRequest::Banner { responder })
            .is_err()
        {
            // No UI surface is listening. Fall closed without persisting so
            // the next run with a UI can ask again.
            log::warn!("No consent UI attached; declining telemetry for this session");
            return self.settle(false, ConsentMethod::Auto);
        }

        match rx.await {
            Ok(decision) => {
                self.persist(ConsentRecord::new(
                    decision.granted,
                    decision.method,
                    decision.reason,
                ));
                self.settle(decision.granted, decision.method)
            }
            Err(_) => {
                log::warn!("Consent banner dismissed without a decision; declining telemetry");
                self.settle(false, ConsentMethod::Auto)
            }
        }
    }

    /// Explicitly grants consent (e.g. from a settings page), superseding any
    /// stored record.
    pub fn grant_consent(&self, method: ConsentMethod, reason: Option<String>) {
        self.checked.store(true, Ordering::SeqCst);
        self.persist(ConsentRecord::new(true, method, reason));
        self.settle(true, method);
    }

    /// Withdraws a previously granted consent and deletes the stored record.
    pub fn revoke_consent(&self) {
        if let Err(e) = self.store.remove(CONSENT_KEY) {
            log::warn!("Failed to remove consent record: {e}");
        }
        self.checked.store(true, Ordering::SeqCst);
        *self.state.write().unwrap() = ConsentState::Declined;
        self.events.publish(ConsentEvent::Revoked);
        log::info!("Consent revoked");
    }

    /// Asks the UI layer to show the detailed consent information view.
    pub fn show_details(&self) {
        if self.requests.send(ConsentRequest::ShowDetails).is_err() {
            log::debug!("No consent UI attached; details request dropped");
        }
    }

    /// `true` once consent has been granted and not revoked.
    pub fn has_consent(&self) -> bool {
        *self.state.read().unwrap() == ConsentState::Granted
    }

    /// The gate's current state.
    pub fn state(&self) -> ConsentState {
        *self.state.read().unwrap()
    }

    /// Subscribes to the gate's consent events.
    pub fn subscribe(&self) -> flume::Receiver<ConsentEvent> {
        self.events.subscribe()
    }

    fn settle(&self, granted: bool, method: ConsentMethod) -> bool {
        *self.state.write().unwrap() = if granted {
            ConsentState::Granted
        } else {
            ConsentState::Declined
        };
        self.events.publish(if granted {
            ConsentEvent::Granted { method }
        } else {
            ConsentEvent::Declined
        });
        granted
    }

    fn persist(&self, record: ConsentRecord) {
        if let Err(e) = storage::put_json(self.store.as_ref(), CONSENT_KEY, &record) {
            log::warn!("Failed to persist consent record: {e}");
        }
    }
}

impl std::fmt::Debug for ConsentGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsentGate")
            .field("state", &self.state())
            .field("checked", &self.checked.load(Ordering::SeqCst))
            .finish()
    }
}

#[async_trait::async_trait]
impl atrium_core::Service for ConsentGate {
    fn as_any(&self) -> &dyn Any {
        self
    }
}
