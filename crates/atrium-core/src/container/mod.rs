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

//! The dependency-injection container managing long-lived service instances.
//!
//! Services are registered by name with declared dependencies and created
//! lazily on first request (or eagerly at registration). Resolution is
//! strictly depth-first: a service is never handed out before every declared
//! dependency has been fully created and initialized. The dependency graph
//! reachable from a request is checked for cycles before any instantiation
//! side effect happens.

mod definition;
mod error;

pub use definition::{ServiceDefinition, ServiceOptions};
pub use error::{ServiceError, ServiceResult};

use crate::graph::find_cycle;
use crate::service::{
    LifecycleEvent, LifecycleHooks, LifecyclePhase, Service, ServiceSource, ServiceStatus,
};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, RwLock};

/// A name-keyed dependency-injection container.
///
/// # Example
///
/// ```rust,ignore
/// let container = ServiceContainer::new();
/// container
///     .register("clock", ServiceSource::Instance(Arc::new(Clock)), ServiceOptions::default())
///     .await?;
/// let clock = container.get("clock").await?;
/// let clock = clock.as_any().downcast_ref::<Clock>().expect("wrong type");
/// ```
#[derive(Debug, Default)]
pub struct ServiceContainer {
    definitions: RwLock<HashMap<String, ServiceDefinition>>,
    instances: RwLock<HashMap<String, Arc<dyn Service>>>,
}

impl ServiceContainer {
    /// Creates an empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a service under `name`.
    ///
    /// Fails with [`ServiceError::Duplicate`] if the name is taken. When the
    /// options mark the service non-lazy, creation is triggered immediately
    /// and any creation failure is returned to the caller.
    pub async fn register(
        &self,
        name: &str,
        source: ServiceSource,
        options: ServiceOptions,
    ) -> ServiceResult<()> {
        let lazy = options.lazy;
        {
            let mut definitions = self.definitions.write().unwrap();
            if definitions.contains_key(name) {
                return Err(ServiceError::Duplicate(name.to_string()));
            }
            definitions.insert(
                name.to_string(),
                ServiceDefinition::new(name.to_string(), source, options),
            );
        }
        log::debug!("Registered service '{name}' (lazy: {lazy}).");

        if !lazy {
            self.get(name).await?;
        }
        Ok(())
    }

    /// Resolves (and, if needed, creates) the service registered as `name`.
    ///
    /// Cached singleton instances are returned directly. Otherwise the
    /// dependency graph reachable from `name` is first checked for cycles —
    /// a [`ServiceError::Circular`] leaves no partial instances behind —
    /// and then dependencies are created depth-first before the service
    /// itself is instantiated and its `initialize` awaited.
    pub async fn get(&self, name: &str) -> ServiceResult<Arc<dyn Service>> {
        if let Some(instance) = self.cached(name) {
            return Ok(instance);
        }
        if !self.definitions.read().unwrap().contains_key(name) {
            return Err(ServiceError::Unknown(name.to_string()));
        }

        // Cycle check before any side effect.
        let cycle = {
            let definitions = self.definitions.read().unwrap();
            find_cycle(name.to_string(), &mut |n: &String| {
                definitions
                    .get(n)
                    .map(|d| d.dependencies.clone())
                    .unwrap_or_default()
            })
        };
        if let Some(path) = cycle {
            return Err(ServiceError::Circular(path));
        }

        self.resolve(name).await
    }

    /// Destroys the instance registered as `name`.
    ///
    /// Runs the before/after destroy hooks around the instance's own
    /// `destroy`. Destroying an unregistered or never-created service is a
    /// no-op with a warning.
    pub async fn destroy(&self, name: &str) -> ServiceResult<()> {
        let hooks = match self.definitions.read().unwrap().get(name) {
            Some(def) => def.hooks.clone(),
            None => {
                log::warn!("Ignoring destroy for unregistered service '{name}'.");
                return Ok(());
            }
        };
        let Some(instance) = self.instances.write().unwrap().remove(name) else {
            log::warn!("Ignoring destroy for never-created service '{name}'.");
            return Ok(());
        };

        run_hook(&hooks, LifecyclePhase::BeforeDestroy, name, Some(&instance));
        if let Err(e) = instance.destroy().await {
            log::error!("Service '{name}' destroy failed: {e:#}");
        }
        run_hook(&hooks, LifecyclePhase::AfterDestroy, name, None);

        if let Some(def) = self.definitions.write().unwrap().get_mut(name) {
            def.status = ServiceStatus::Registered;
        }
        log::debug!("Destroyed service '{name}'.");
        Ok(())
    }

    /// Destroys every created instance. Used at shutdown.
    pub async fn destroy_all(&self) {
        let names: Vec<String> = self.instances.read().unwrap().keys().cloned().collect();
        for name in names {
            if let Err(e) = self.destroy(&name).await {
                log::error!("Failed to destroy service '{name}': {e}");
            }
        }
    }

    /// Returns a new container seeded with copies of every current
    /// definition (not instances), then merged with `additional` services.
    ///
    /// Used for scoped and test containers. Eagerness is not re-triggered;
    /// the child creates everything on first request.
    pub fn create_child(
        &self,
        additional: Vec<(String, ServiceSource, ServiceOptions)>,
    ) -> ServiceContainer {
        let child = ServiceContainer::new();
        {
            let parent_defs = self.definitions.read().unwrap();
            let mut child_defs = child.definitions.write().unwrap();
            for (name, def) in parent_defs.iter() {
                child_defs.insert(name.clone(), def.reset());
            }
            for (name, source, options) in additional {
                child_defs.insert(
                    name.clone(),
                    ServiceDefinition::new(name, source, options),
                );
            }
        }
        child
    }

    /// Returns `true` if a service is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.definitions.read().unwrap().contains_key(name)
    }

    /// The creation state of `name`, if registered.
    pub fn status(&self, name: &str) -> Option<ServiceStatus> {
        self.definitions.read().unwrap().get(name).map(|d| d.status)
    }

    /// All registered service names.
    pub fn names(&self) -> Vec<String> {
        self.definitions.read().unwrap().keys().cloned().collect()
    }

    /// The number of registered services.
    pub fn len(&self) -> usize {
        self.definitions.read().unwrap().len()
    }

    /// Returns `true` if no services are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A JSON view of the service map for the debug surface.
    pub fn snapshot(&self) -> serde_json::Value {
        let definitions = self.definitions.read().unwrap();
        let instances = self.instances.read().unwrap();
        let mut map = serde_json::Map::new();
        for (name, def) in definitions.iter() {
            map.insert(
                name.clone(),
                serde_json::json!({
                    "status": def.status.as_str(),
                    "singleton": def.singleton,
                    "lazy": def.lazy,
                    "dependencies": def.dependencies,
                    "cached": instances.contains_key(name),
                }),
            );
        }
        serde_json::Value::Object(map)
    }

    fn cached(&self, name: &str) -> Option<Arc<dyn Service>> {
        self.instances.read().unwrap().get(name).cloned()
    }

    fn mark(&self, name: &str, status: ServiceStatus) {
        if let Some(def) = self.definitions.write().unwrap().get_mut(name) {
            def.status = status;
        }
    }

    /// Depth-first creation. Boxed for async recursion.
    fn resolve<'a>(
        &'a self,
        name: &'a str,
    ) -> Pin<Box<dyn Future<Output = ServiceResult<Arc<dyn Service>>> + Send + 'a>> {
        Box::pin(async move {
            if let Some(instance) = self.cached(name) {
                return Ok(instance);
            }

            let (source, dependencies, config, hooks, singleton) = {
                let mut definitions = self.definitions.write().unwrap();
                let def = definitions
                    .get_mut(name)
                    .ok_or_else(|| ServiceError::Unknown(name.to_string()))?;
                def.status = ServiceStatus::Creating;
                (
                    def.source.clone(),
                    def.dependencies.clone(),
                    def.config.clone(),
                    def.hooks.clone(),
                    def.singleton,
                )
            };

            let mut resolved = Vec::with_capacity(dependencies.len());
            for dep in &dependencies {
                match self.resolve(dep).await {
                    Ok(instance) => resolved.push(instance),
                    Err(e) => {
                        self.mark(name, ServiceStatus::Error);
                        return Err(e);
                    }
                }
            }

            run_hook(&hooks, LifecyclePhase::BeforeCreate, name, None);

            let instance = match source {
                ServiceSource::Instance(instance) => instance,
                ServiceSource::Factory(factory) => match factory(&config, &resolved) {
                    Ok(instance) => instance,
                    Err(e) => {
                        self.mark(name, ServiceStatus::Error);
                        return Err(ServiceError::Creation {
                            name: name.to_string(),
                            source: e,
                        });
                    }
                },
            };

            if let Err(e) = instance.initialize().await {
                self.mark(name, ServiceStatus::Error);
                return Err(ServiceError::Creation {
                    name: name.to_string(),
                    source: e,
                });
            }

            if singleton {
                // The instance map entry is written at most once per name.
                self.instances
                    .write()
                    .unwrap()
                    .entry(name.to_string())
                    .or_insert_with(|| instance.clone());
            }
            self.mark(name, ServiceStatus::Created);
            run_hook(&hooks, LifecyclePhase::AfterCreate, name, Some(&instance));
            log::debug!("Created service '{name}'.");

            Ok(instance)
        })
    }
}

/// Runs a lifecycle hook, logging failures instead of propagating them.
fn run_hook(
    hooks: &LifecycleHooks,
    phase: LifecyclePhase,
    service: &str,
    instance: Option<&Arc<dyn Service>>,
) {
    if let Some(hook) = hooks.for_phase(phase) {
        let event = LifecycleEvent {
            service,
            phase,
            instance,
        };
        if let Err(e) = hook(&event) {
            log::error!("Lifecycle hook {phase:?} for '{service}' failed: {e:#}");
        }
    }
}
