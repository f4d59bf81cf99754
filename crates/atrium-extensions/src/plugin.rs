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

//! The plugin contract.

use crate::hooks::HookHandler;
use crate::host::HostApi;
use crate::middleware::MiddlewareFn;
use async_trait::async_trait;
use serde_json::Value;

/// Lifecycle state of a registered plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginStatus {
    /// Registered, nothing executed yet.
    Registered,
    /// `initialize` completed successfully.
    Initialized,
    /// Explicitly destroyed; owned hooks and middleware removed.
    Destroyed,
    /// The last `initialize` attempt failed.
    Error,
}

impl PluginStatus {
    /// Stable string form used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            PluginStatus::Registered => "registered",
            PluginStatus::Initialized => "initialized",
            PluginStatus::Destroyed => "destroyed",
            PluginStatus::Error => "error",
        }
    }
}

/// A hook contribution a plugin declares up front.
///
/// Declared hooks are registered automatically before the plugin's
/// `initialize` runs and are owned by the plugin for teardown.
pub struct HookSpec {
    /// Chain name to attach to.
    pub name: String,
    /// The handler.
    pub handler: HookHandler,
    /// Chain priority; higher runs earlier.
    pub priority: i32,
    /// Critical hooks abort their chain on failure.
    pub critical: bool,
}

impl std::fmt::Debug for HookSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookSpec")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("critical", &self.critical)
            .finish()
    }
}

/// A middleware contribution a plugin declares up front.
pub struct MiddlewareSpec {
    /// Name used in logs and failure attribution.
    pub name: String,
    /// The transformation.
    pub func: MiddlewareFn,
    /// Restricts the middleware to one chain kind; `None` runs everywhere.
    pub kind: Option<String>,
    /// Chain priority; higher runs earlier.
    pub priority: i32,
}

impl std::fmt::Debug for MiddlewareSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiddlewareSpec")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("priority", &self.priority)
            .finish()
    }
}

/// A host-managed plugin.
///
/// Only `initialize` is required; dependency and contribution declarations
/// default to empty, and `destroy` to a no-op.
#[async_trait]
pub trait Plugin: Send + Sync + 'static {
    /// Names of plugins that must be initialized before this one.
    fn dependencies(&self) -> Vec<String> {
        Vec::new()
    }

    /// Hook contributions to register before `initialize` runs.
    fn hooks(&self) -> Vec<HookSpec> {
        Vec::new()
    }

    /// Middleware contributions to register before `initialize` runs.
    fn middleware(&self) -> Vec<MiddlewareSpec> {
        Vec::new()
    }

    /// Called once with the merged options and a plugin-scoped host API.
    ///
    /// Hooks and middleware added through `api` are attributed to this
    /// plugin and removed when it is destroyed.
    async fn initialize(&self, options: &Value, api: &HostApi) -> anyhow::Result<()>;

    /// Called when the plugin is destroyed, after its contributions have
    /// been removed.
    async fn destroy(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
