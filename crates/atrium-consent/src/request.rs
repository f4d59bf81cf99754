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

//! The request/response channel between the gate and the UI layer.

use crate::record::ConsentMethod;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

/// A message the gate sends to whoever renders consent UI.
#[derive(Debug, Clone)]
pub enum ConsentRequest {
    /// Show the consent banner and resolve the responder with the visitor's
    /// choice.
    Banner {
        /// Single-use reply channel for the visitor's decision.
        responder: ConsentResponder,
    },
    /// Show the detailed consent/privacy information view.
    ShowDetails,
}

/// The visitor's answer to a [`ConsentRequest::Banner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsentDecision {
    /// Whether telemetry may run.
    pub granted: bool,
    /// How the decision was reached.
    pub method: ConsentMethod,
    /// Free-form origin of the decision (e.g. "banner").
    pub reason: Option<String>,
}

impl ConsentDecision {
    /// An affirmative decision.
    pub fn accept(method: ConsentMethod, reason: impl Into<String>) -> Self {
        Self {
            granted: true,
            method,
            reason: Some(reason.into()),
        }
    }

    /// A negative decision.
    pub fn decline(reason: impl Into<String>) -> Self {
        Self {
            granted: false,
            method: ConsentMethod::Manual,
            reason: Some(reason.into()),
        }
    }
}

/// Single-use reply handle carried inside a banner request.
///
/// The handle is cloneable so the request can fan out to several UI surfaces,
/// but only the first [`resolve`](Self::resolve) wins; later calls are
/// ignored and report `false`.
#[derive(Debug, Clone)]
pub struct ConsentResponder {
    tx: Arc<Mutex<Option<oneshot::Sender<ConsentDecision>>>>,
}

impl ConsentResponder {
    /// Creates a responder and the receiving half the gate awaits.
    pub fn channel() -> (Self, oneshot::Receiver<ConsentDecision>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                tx: Arc::new(Mutex::new(Some(tx))),
            },
            rx,
        )
    }

    /// Delivers the visitor's decision. Returns `true` if this call was the
    /// one that resolved the request.
    pub fn resolve(&self, decision: ConsentDecision) -> bool {
        let sender = self.tx.lock().unwrap().take();
        match sender {
            Some(tx) => tx.send(decision).is_ok(),
            None => {
                log::debug!("Consent request already resolved; ignoring duplicate decision");
                false
            }
        }
    }

    /// `true` once a decision has been delivered (or attempted).
    pub fn is_resolved(&self) -> bool {
        self.tx.lock().unwrap().is_none()
    }
}
