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

//! The core contract implemented by every long-lived runtime service.

use async_trait::async_trait;
use std::any::Any;
use std::sync::Arc;

/// A long-lived, container-managed service.
///
/// Services are stored as `Arc<dyn Service>` inside the
/// [`ServiceContainer`](crate::container::ServiceContainer) and retrieved by
/// name. Concrete types are recovered via [`as_any`](Service::as_any).
///
/// Both lifecycle methods default to no-ops so that plain value services can
/// implement the trait with a single line.
#[async_trait]
pub trait Service: std::fmt::Debug + Send + Sync + 'static {
    /// Called once after construction, before the service is handed out.
    ///
    /// The container awaits this and only caches the instance on success.
    async fn initialize(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called when the service is explicitly destroyed.
    async fn destroy(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Allows downcasting to the concrete service type.
    fn as_any(&self) -> &dyn Any;
}

/// How the container obtains an instance for a registered name.
#[derive(Clone)]
pub enum ServiceSource {
    /// A ready-made instance, used as-is.
    Instance(Arc<dyn Service>),
    /// A factory invoked with the definition's config block and the resolved
    /// dependency instances, in declaration order.
    Factory(ServiceFactory),
}

impl std::fmt::Debug for ServiceSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceSource::Instance(_) => f.write_str("ServiceSource::Instance"),
            ServiceSource::Factory(_) => f.write_str("ServiceSource::Factory"),
        }
    }
}

/// Factory signature for [`ServiceSource::Factory`].
pub type ServiceFactory = Arc<
    dyn Fn(&serde_json::Value, &[Arc<dyn Service>]) -> anyhow::Result<Arc<dyn Service>>
        + Send
        + Sync,
>;

/// Creation state of a registered service definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceStatus {
    /// Registered but never instantiated.
    Registered,
    /// Instantiation is in progress.
    Creating,
    /// Instantiated and initialized successfully.
    Created,
    /// The last instantiation attempt failed.
    Error,
}

impl ServiceStatus {
    /// Stable string form used in debug snapshots.
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceStatus::Registered => "registered",
            ServiceStatus::Creating => "creating",
            ServiceStatus::Created => "created",
            ServiceStatus::Error => "error",
        }
    }
}

/// The lifecycle phase a hook is invoked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    /// Before the factory runs.
    BeforeCreate,
    /// After the instance is initialized and cached.
    AfterCreate,
    /// Before the instance's `destroy` is called.
    BeforeDestroy,
    /// After the instance has been dropped from the cache.
    AfterDestroy,
}

/// Context passed to a lifecycle hook.
pub struct LifecycleEvent<'a> {
    /// Name of the service the hook fires for.
    pub service: &'a str,
    /// Which phase is being entered.
    pub phase: LifecyclePhase,
    /// The instance, when one exists at this phase.
    pub instance: Option<&'a Arc<dyn Service>>,
}

/// A lifecycle hook callback.
///
/// Hook errors are logged by the container and never abort the creation or
/// destruction they surround.
pub type LifecycleHook = Arc<dyn Fn(&LifecycleEvent<'_>) -> anyhow::Result<()> + Send + Sync>;

/// The optional per-service lifecycle hooks.
#[derive(Clone, Default)]
pub struct LifecycleHooks {
    /// Runs before the factory is invoked.
    pub before_create: Option<LifecycleHook>,
    /// Runs after the instance is ready.
    pub after_create: Option<LifecycleHook>,
    /// Runs before the instance is destroyed.
    pub before_destroy: Option<LifecycleHook>,
    /// Runs after the instance is removed.
    pub after_destroy: Option<LifecycleHook>,
}

impl LifecycleHooks {
    pub(crate) fn for_phase(&self, phase: LifecyclePhase) -> Option<&LifecycleHook> {
        match phase {
            LifecyclePhase::BeforeCreate => self.before_create.as_ref(),
            LifecyclePhase::AfterCreate => self.after_create.as_ref(),
            LifecyclePhase::BeforeDestroy => self.before_destroy.as_ref(),
            LifecyclePhase::AfterDestroy => self.after_destroy.as_ref(),
        }
    }
}

impl std::fmt::Debug for LifecycleHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleHooks")
            .field("before_create", &self.before_create.is_some())
            .field("after_create", &self.after_create.is_some())
            .field("before_destroy", &self.before_destroy.is_some())
            .field("after_destroy", &self.after_destroy.is_some())
            .finish()
    }
}
