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

//! # Atrium Config
//!
//! Hierarchical, namespaced configuration for the Atrium runtime: dot-path
//! access over a JSON tree, layered source merging with environment
//! overrides, change notification with wildcard patterns, percentage-rollout
//! feature flags, and the non-fatal remote config fetch.

pub mod features;
pub mod remote;
pub mod store;
pub mod watch;

pub use features::FeatureFlag;
pub use remote::RemoteConfigSpec;
pub use store::{ConfigError, ConfigResult, ConfigSources, ConfigStore, SetOptions, ValueKind};
pub use watch::WatchId;
