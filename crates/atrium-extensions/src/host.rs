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

//! The plugin host.
//!
//! Registration stores a plugin without executing anything; initialization
//! recursively brings declared dependencies up first, registers declared
//! contributions, and runs the plugin's own `initialize` with a scoped API.
//! Everything a plugin contributes is tracked so destroy removes exactly its
//! hooks and middleware.

use crate::error::{PluginError, PluginResult};
use crate::hooks::{HookHandler, HookId, HookRegistry};
use crate::middleware::{MiddlewareFn, MiddlewareId, MiddlewareRegistry};
use crate::plugin::{Plugin, PluginStatus};
use atrium_core::graph::find_cycle;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, RwLock};

/// Key-value state shared across all hooks and plugins of one host.
#[derive(Debug, Clone, Default)]
pub struct SharedContext {
    values: Arc<RwLock<HashMap<String, Value>>>,
}

impl SharedContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a context value.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.values.read().unwrap().get(key).cloned()
    }

    /// Writes a context value.
    pub fn set(&self, key: &str, value: Value) {
        self.values.write().unwrap().insert(key.to_string(), value);
    }
}

/// The plugin-scoped API handed to `Plugin::initialize`.
///
/// Contributions made through it are attributed to the owning plugin; the
/// host collects them afterwards for teardown bookkeeping.
pub struct HostApi {
    plugin: String,
    hooks: HookRegistry,
    middleware: MiddlewareRegistry,
    context: SharedContext,
    owned_hooks: Mutex<Vec<(String, HookId)>>,
    owned_middleware: Mutex<Vec<MiddlewareId>>,
}

impl HostApi {
    fn new(
        plugin: String,
        hooks: HookRegistry,
        middleware: MiddlewareRegistry,
        context: SharedContext,
    ) -> Self {
        Self {
            plugin,
            hooks,
            middleware,
            context,
            owned_hooks: Mutex::new(Vec::new()),
            owned_middleware: Mutex::new(Vec::new()),
        }
    }

    /// Adds a hook owned by this plugin.
    pub fn add_hook(
        &self,
        name: &str,
        handler: HookHandler,
        priority: i32,
        critical: bool,
    ) -> HookId {
        let id = self.hooks.add(name, handler, priority, critical);
        self.owned_hooks.lock().unwrap().push((name.to_string(), id));
        id
    }

    /// Removes one of this plugin's hooks early.
    pub fn remove_hook(&self, name: &str, id: HookId) -> bool {
        self.owned_hooks
            .lock()
            .unwrap()
            .retain(|(n, i)| !(n == name && *i == id));
        self.hooks.remove(name, id)
    }

    /// Adds a middleware owned by this plugin.
    pub fn add_middleware(
        &self,
        name: &str,
        func: MiddlewareFn,
        kind: Option<String>,
        priority: i32,
    ) -> MiddlewareId {
        let id = self.middleware.add(name, func, kind, priority);
        self.owned_middleware.lock().unwrap().push(id);
        id
    }

    /// Runs a hook chain with the host's shared context.
    pub fn execute_hooks(&self, name: &str, data: Value) -> PluginResult<Value> {
        self.hooks.execute(name, data, &self.context)
    }

    /// Reads a shared-context value.
    pub fn get_context(&self, key: &str) -> Option<Value> {
        self.context.get(key)
    }

    /// Writes a shared-context value.
    pub fn set_context(&self, key: &str, value: Value) {
        self.context.set(key, value);
    }

    /// The plugin this API is scoped to.
    pub fn plugin_name(&self) -> &str {
        &self.plugin
    }

    fn take_owned(&self) -> (Vec<(String, HookId)>, Vec<MiddlewareId>) {
        (
            std::mem::take(&mut self.owned_hooks.lock().unwrap()),
            std::mem::take(&mut self.owned_middleware.lock().unwrap()),
        )
    }
}

struct PluginDefinition {
    plugin: Arc<dyn Plugin>,
    options: Value,
    dependencies: Vec<String>,
    owned_hooks: Vec<(String, HookId)>,
    owned_middleware: Vec<MiddlewareId>,
    status: PluginStatus,
}

/// The plugin registry and hook/middleware execution engine.
#[derive(Default)]
pub struct ExtensionHost {
    plugins: RwLock<HashMap<String, PluginDefinition>>,
    hooks: HookRegistry,
    middleware: MiddlewareRegistry,
    context: SharedContext,
}

impl ExtensionHost {
    /// Creates an empty host.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a plugin under `name` without executing anything.
    ///
    /// Fails with [`PluginError::Duplicate`] if the name is taken.
    pub fn register(
        &self,
        name: &str,
        plugin: Arc<dyn Plugin>,
        options: Value,
    ) -> PluginResult<()> {
        let mut plugins = self.plugins.write().unwrap();
        if plugins.contains_key(name) {
            return Err(PluginError::Duplicate(name.to_string()));
        }
        let dependencies = plugin.dependencies();
        plugins.insert(
            name.to_string(),
            PluginDefinition {
                plugin,
                options,
                dependencies,
                owned_hooks: Vec::new(),
                owned_middleware: Vec::new(),
                status: PluginStatus::Registered,
            },
        );
        log::debug!("Registered plugin '{name}'.");
        Ok(())
    }

    /// Initializes `name`, bringing its declared dependencies up first.
    ///
    /// `overrides` is shallow-merged over the registration-time options
    /// (override keys win). Initializing an already initialized plugin is a
    /// no-op with a warning. A dependency that was never registered fails
    /// with [`PluginError::MissingDependency`] before any contribution of
    /// this plugin is registered.
    pub async fn initialize(&self, name: &str, overrides: Value) -> PluginResult<()> {
        self.init_inner(name, overrides).await
    }

    /// Destroys `name`: removes every hook and middleware it owns, then
    /// calls its `destroy`. Unknown names are a no-op with a warning.
    pub async fn destroy(&self, name: &str) -> PluginResult<()> {
        let (plugin, owned_hooks, owned_middleware) = {
            let mut plugins = self.plugins.write().unwrap();
            let Some(def) = plugins.get_mut(name) else {
                log::warn!("Ignoring destroy for unknown plugin '{name}'.");
                return Ok(());
            };
            (
                def.plugin.clone(),
                std::mem::take(&mut def.owned_hooks),
                std::mem::take(&mut def.owned_middleware),
            )
        };

        for (hook_name, id) in owned_hooks {
            self.hooks.remove(&hook_name, id);
        }
        for id in owned_middleware {
            self.middleware.remove(id);
        }
        if let Err(e) = plugin.destroy().await {
            log::error!("Plugin '{name}' destroy failed: {e:#}");
        }
        self.mark(name, PluginStatus::Destroyed);
        log::debug!("Destroyed plugin '{name}'.");
        Ok(())
    }

    /// Runs the hook chain under `name` with the host's shared context.
    pub fn execute_hooks(&self, name: &str, data: Value) -> PluginResult<Value> {
        self.hooks.execute(name, data, &self.context)
    }

    /// Runs the middleware chain for `kind`.
    pub async fn execute_middleware(&self, kind: &str, data: Value) -> PluginResult<Value> {
        self.middleware.execute(kind, data).await
    }

    /// The hook registry, for host-level (non-plugin) contributions.
    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    /// The middleware registry, for host-level contributions.
    pub fn middleware(&self) -> &MiddlewareRegistry {
        &self.middleware
    }

    /// The shared context.
    pub fn context(&self) -> &SharedContext {
        &self.context
    }

    /// The lifecycle state of `name`, if registered.
    pub fn status(&self, name: &str) -> Option<PluginStatus> {
        self.plugins.read().unwrap().get(name).map(|d| d.status)
    }

    /// Returns `true` if a plugin is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.plugins.read().unwrap().contains_key(name)
    }

    /// All registered plugin names.
    pub fn names(&self) -> Vec<String> {
        self.plugins.read().unwrap().keys().cloned().collect()
    }

    fn mark(&self, name: &str, status: PluginStatus) {
        if let Some(def) = self.plugins.write().unwrap().get_mut(name) {
            def.status = status;
        }
    }

    /// Recursive initialization. Boxed for async recursion.
    fn init_inner<'a>(
        &'a self,
        name: &'a str,
        overrides: Value,
    ) -> Pin<Box<dyn Future<Output = PluginResult<()>> + Send + 'a>> {
        Box::pin(async move {
            let (plugin, options, dependencies) = {
                let plugins = self.plugins.read().unwrap();
                let def = plugins
                    .get(name)
                    .ok_or_else(|| PluginError::Unknown(name.to_string()))?;
                if def.status == PluginStatus::Initialized {
                    log::warn!("Plugin '{name}' is already initialized; skipping.");
                    return Ok(());
                }
                (def.plugin.clone(), def.options.clone(), def.dependencies.clone())
            };

            // All declared dependencies must be registered before any side
            // effect happens for this plugin.
            for dep in &dependencies {
                if !self.contains(dep) {
                    return Err(PluginError::MissingDependency {
                        plugin: name.to_string(),
                        dependency: dep.clone(),
                    });
                }
            }

            let cycle = {
                let plugins = self.plugins.read().unwrap();
                find_cycle(name.to_string(), &mut |n: &String| {
                    plugins
                        .get(n)
                        .map(|d| d.dependencies.clone())
                        .unwrap_or_default()
                })
            };
            if let Some(path) = cycle {
                return Err(PluginError::Circular(path));
            }

            for dep in &dependencies {
                if self.status(dep) != Some(PluginStatus::Initialized) {
                    self.init_inner(dep, Value::Null).await?;
                }
            }

            let merged = merge_options(options, overrides);
            let api = HostApi::new(
                name.to_string(),
                self.hooks.clone(),
                self.middleware.clone(),
                self.context.clone(),
            );

            for spec in plugin.hooks() {
                api.add_hook(&spec.name, spec.handler, spec.priority, spec.critical);
            }
            for spec in plugin.middleware() {
                api.add_middleware(&spec.name, spec.func, spec.kind, spec.priority);
            }

            if let Err(e) = plugin.initialize(&merged, &api).await {
                // Roll back everything this attempt contributed.
                let (owned_hooks, owned_middleware) = api.take_owned();
                for (hook_name, id) in owned_hooks {
                    self.hooks.remove(&hook_name, id);
                }
                for id in owned_middleware {
                    self.middleware.remove(id);
                }
                self.mark(name, PluginStatus::Error);
                return Err(PluginError::Initialization {
                    plugin: name.to_string(),
                    source: e,
                });
            }

            let (owned_hooks, owned_middleware) = api.take_owned();
            {
                let mut plugins = self.plugins.write().unwrap();
                if let Some(def) = plugins.get_mut(name) {
                    def.owned_hooks = owned_hooks;
                    def.owned_middleware = owned_middleware;
                    def.status = PluginStatus::Initialized;
                }
            }
            log::debug!("Initialized plugin '{name}'.");
            Ok(())
        })
    }
}

impl std::fmt::Debug for ExtensionHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionHost")
            .field("plugins", &self.names())
            .field("middleware", &self.middleware.len())
            .finish()
    }
}

#[async_trait::async_trait]
impl atrium_core::Service for ExtensionHost {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// Shallow object merge; override keys win, non-object overrides are ignored
/// unless the base is null.
fn merge_options(base: Value, overrides: Value) -> Value {
    match (base, overrides) {
        (Value::Object(mut base), Value::Object(overrides)) => {
            base.extend(overrides);
            Value::Object(base)
        }
        (Value::Null, overrides) => overrides,
        (base, Value::Null) => base,
        (base, _) => base,
    }
}
