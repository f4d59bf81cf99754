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

//! # Atrium Consent
//!
//! The consent gate: detects whether the visitor is in an EU jurisdiction
//! (three independent heuristics, ORed), manages a persisted, versioned
//! consent record, and — when consent must be asked for — emits a request to
//! the UI layer over an injected event channel and awaits its single-use
//! response. Telemetry activation elsewhere in the runtime keys off the
//! events this crate publishes.

pub mod detection;
pub mod environment;
pub mod gate;
pub mod record;
pub mod request;

pub use detection::EuDetector;
pub use environment::{StaticEnvironment, SystemEnvironment, VisitorEnvironment};
pub use gate::{ConsentEvent, ConsentGate, ConsentState};
pub use record::{ConsentMethod, ConsentRecord, EuDetectionCache, CONSENT_SCHEME_VERSION};
pub use request::{ConsentDecision, ConsentRequest, ConsentResponder};
