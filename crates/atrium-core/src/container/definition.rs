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

//! Service definitions and registration options.

use crate::service::{LifecycleHooks, ServiceSource, ServiceStatus};

/// Options accepted by [`register`](crate::container::ServiceContainer::register).
///
/// The defaults mirror the common case: a lazily created singleton with no
/// dependencies, no config block, and no lifecycle hooks.
#[derive(Debug, Clone)]
pub struct ServiceOptions {
    /// At most one instance per name when `true`.
    pub singleton: bool,
    /// Deferred until the first `get` when `true`; created at registration
    /// time otherwise.
    pub lazy: bool,
    /// Names of services that must be created first and are passed to the
    /// factory in this order.
    pub dependencies: Vec<String>,
    /// Opaque config block handed to the factory.
    pub config: serde_json::Value,
    /// Hooks run around creation and destruction.
    pub hooks: LifecycleHooks,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            singleton: true,
            lazy: true,
            dependencies: Vec::new(),
            config: serde_json::Value::Object(serde_json::Map::new()),
            hooks: LifecycleHooks::default(),
        }
    }
}

impl ServiceOptions {
    /// Convenience constructor for a definition that only declares
    /// dependencies.
    pub fn with_dependencies<I, S>(dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            dependencies: dependencies.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Marks the service for eager creation at registration time.
    pub fn eager(mut self) -> Self {
        self.lazy = false;
        self
    }
}

/// A registered service: its source, wiring, and creation state.
#[derive(Debug, Clone)]
pub struct ServiceDefinition {
    pub(crate) name: String,
    pub(crate) source: ServiceSource,
    pub(crate) singleton: bool,
    pub(crate) lazy: bool,
    pub(crate) dependencies: Vec<String>,
    pub(crate) config: serde_json::Value,
    pub(crate) hooks: LifecycleHooks,
    pub(crate) status: ServiceStatus,
}

impl ServiceDefinition {
    pub(crate) fn new(name: String, source: ServiceSource, options: ServiceOptions) -> Self {
        Self {
            name,
            source,
            singleton: options.singleton,
            lazy: options.lazy,
            dependencies: options.dependencies,
            config: options.config,
            hooks: options.hooks,
            status: ServiceStatus::Registered,
        }
    }

    /// The registered name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared dependency names, in declaration order.
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// The current creation state.
    pub fn status(&self) -> ServiceStatus {
        self.status
    }

    /// Whether at most one instance exists for this name.
    pub fn is_singleton(&self) -> bool {
        self.singleton
    }

    /// Whether creation is deferred until first request.
    pub fn is_lazy(&self) -> bool {
        self.lazy
    }

    /// A copy with creation state reset, used when seeding child containers.
    pub(crate) fn reset(&self) -> Self {
        let mut copy = self.clone();
        copy.status = ServiceStatus::Registered;
        copy
    }
}
