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

//! # Atrium Runtime
//!
//! The composition root. [`Runtime`] owns one of each manager — config
//! store, consent gate, telemetry pipeline, analytics, extension host, and
//! the service container they are all registered into — and wires them
//! together at startup: load config, resolve consent (possibly via a UI
//! round-trip), arm telemetry only on a grant, and keep telemetry in sync
//! with later consent events. Nothing here is ambient; everything reachable
//! from the runtime is owned by it.

pub mod leaves;

pub use leaves::{ImageCache, NavigationHelper};

use atrium_config::{remote, ConfigSources, ConfigStore, RemoteConfigSpec};
use atrium_consent::{
    ConsentGate, ConsentRequest, EuDetector, SystemEnvironment, VisitorEnvironment,
};
use atrium_core::storage::{InMemoryStore, KeyValueStore};
use atrium_core::{ServiceContainer, ServiceOptions, ServiceSource};
use atrium_extensions::ExtensionHost;
use atrium_telemetry::analytics::{Analytics, GeoResolver};
use atrium_telemetry::{ObserverKind, SampleFeed, TelemetryPipeline};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Configures and assembles a [`Runtime`].
pub struct RuntimeBuilder {
    store: Option<Arc<dyn KeyValueStore>>,
    environment: Option<Arc<dyn VisitorEnvironment>>,
    sources: ConfigSources,
    remote: Option<RemoteConfigSpec>,
    geo: GeoResolver,
}

impl RuntimeBuilder {
    /// Starts from defaults: in-memory storage, the process environment,
    /// empty config sources, and no geolocation providers.
    pub fn new() -> Self {
        Self {
            store: None,
            environment: None,
            sources: ConfigSources::default(),
            remote: None,
            geo: GeoResolver::new(),
        }
    }

    /// Uses `store` for all durable keys (consent, detection cache, visits,
    /// visitor id).
    pub fn with_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Uses `environment` for the EU jurisdiction heuristics.
    pub fn with_environment(mut self, environment: Arc<dyn VisitorEnvironment>) -> Self {
        self.environment = Some(environment);
        self
    }

    /// Sets the layered config sources loaded at startup.
    pub fn with_sources(mut self, sources: ConfigSources) -> Self {
        self.sources = sources;
        self
    }

    /// Fetches remote config from `spec` at startup (non-fatal on failure).
    pub fn with_remote_config(mut self, spec: RemoteConfigSpec) -> Self {
        self.remote = Some(spec);
        self
    }

    /// Sets the geolocation provider chain used for visit annotation.
    pub fn with_geo(mut self, geo: GeoResolver) -> Self {
        self.geo = geo;
        self
    }

    /// Assembles the runtime. No consent or network activity happens here;
    /// that is deferred to [`Runtime::start`].
    pub fn build(self) -> Runtime {
        let store: Arc<dyn KeyValueStore> =
            self.store.unwrap_or_else(|| Arc::new(InMemoryStore::new()));
        let environment: Arc<dyn VisitorEnvironment> = self
            .environment
            .unwrap_or_else(|| Arc::new(SystemEnvironment));

        let (consent_tx, consent_rx) = flume::unbounded();
        let detector = EuDetector::new(environment, store.clone());
        let consent = Arc::new(ConsentGate::new(detector, store.clone(), consent_tx));

        let telemetry = Arc::new(TelemetryPipeline::new());
        let mut feeds = HashMap::new();
        for &kind in ObserverKind::all() {
            let feed = Arc::new(SampleFeed::new(kind));
            telemetry.register_observer(feed.clone());
            feeds.insert(kind, feed);
        }

        Runtime {
            config: Arc::new(ConfigStore::new()),
            consent,
            telemetry,
            analytics: Arc::new(Analytics::new(store.clone(), self.geo)),
            extensions: Arc::new(ExtensionHost::new()),
            services: ServiceContainer::new(),
            feeds,
            consent_requests: Mutex::new(Some(consent_rx)),
            pending: Mutex::new(Some((self.sources, self.remote))),
            store,
        }
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The assembled service runtime.
pub struct Runtime {
    config: Arc<ConfigStore>,
    consent: Arc<ConsentGate>,
    telemetry: Arc<TelemetryPipeline>,
    analytics: Arc<Analytics>,
    extensions: Arc<ExtensionHost>,
    services: ServiceContainer,
    feeds: HashMap<ObserverKind, Arc<SampleFeed>>,
    consent_requests: Mutex<Option<flume::Receiver<ConsentRequest>>>,
    pending: Mutex<Option<(ConfigSources, Option<RemoteConfigSpec>)>>,
    store: Arc<dyn KeyValueStore>,
}

impl Runtime {
    /// Starts a builder.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Claims the stream of consent UI requests. Claimable once; a UI
    /// surface must claim it before [`start`](Self::start) runs — an
    /// unclaimed stream is dropped at startup so an EU visitor's consent
    /// falls closed instead of waiting forever.
    pub fn consent_requests(&self) -> Option<flume::Receiver<ConsentRequest>> {
        self.consent_requests.lock().unwrap().take()
    }

    /// Boots the runtime: loads config, registers every service, resolves
    /// consent, and arms telemetry on a grant.
    pub async fn start(&self) -> anyhow::Result<()> {
        // Take the pending sources in their own statement so no guard lives
        // across the fetch await and the future stays Send.
        let pending = self.pending.lock().unwrap().take();
        if let Some((mut sources, remote_spec)) = pending {
            if let Some(spec) = remote_spec {
                sources.remote = Some(remote::fetch(&spec).await);
            }
            self.config.load(sources);
        }
        self.config.set_visitor_id(self.analytics.visitor_id());

        // Drop the request stream if no UI claimed it; the gate then falls
        // closed for EU visitors instead of awaiting a decision forever.
        drop(self.consent_requests.lock().unwrap().take());

        self.register_services().await?;

        // Keep telemetry in sync with consent transitions for the rest of
        // the process lifetime.
        let events = self.consent.subscribe();
        let telemetry = self.telemetry.clone();
        tokio::spawn(async move {
            while let Ok(event) = events.recv_async().await {
                telemetry.handle_consent_event(&event);
            }
        });

        let armed = self.telemetry.initialize_with_consent(&self.consent).await;
        if armed {
            self.analytics.record_visit("/", None).await;
        }
        log::info!(
            "Runtime started ({} services, telemetry armed: {armed})",
            self.services.len()
        );
        Ok(())
    }

    async fn register_services(&self) -> anyhow::Result<()> {
        self.services
            .register(
                "config",
                ServiceSource::Instance(self.config.clone()),
                ServiceOptions::default().eager(),
            )
            .await?;
        self.services
            .register(
                "consent",
                ServiceSource::Instance(self.consent.clone()),
                ServiceOptions::default().eager(),
            )
            .await?;
        self.services
            .register(
                "telemetry",
                ServiceSource::Instance(self.telemetry.clone()),
                ServiceOptions::default().eager(),
            )
            .await?;
        self.services
            .register(
                "analytics",
                ServiceSource::Instance(self.analytics.clone()),
                ServiceOptions::default().eager(),
            )
            .await?;
        self.services
            .register(
                "extensions",
                ServiceSource::Instance(self.extensions.clone()),
                ServiceOptions::default().eager(),
            )
            .await?;

        let image_options = ServiceOptions {
            config: json!({ "capacity": 32 }),
            ..ServiceOptions::default()
        };
        self.services
            .register(
                "image-cache",
                ServiceSource::Factory(Arc::new(|config, _deps| {
                    let capacity = config
                        .get("capacity")
                        .and_then(Value::as_u64)
                        .unwrap_or(32) as usize;
                    Ok(Arc::new(ImageCache::new(capacity)))
                })),
                image_options,
            )
            .await?;

        self.services
            .register(
                "navigation",
                ServiceSource::Factory(Arc::new(|_config, deps| {
                    let config_store = deps
                        .first()
                        .and_then(|s| s.as_any().downcast_ref::<ConfigStore>())
                        .ok_or_else(|| anyhow::anyhow!("navigation requires the config store"))?;
                    Ok(Arc::new(NavigationHelper::from_config(config_store)))
                })),
                ServiceOptions::with_dependencies(["config"]),
            )
            .await?;

        Ok(())
    }

    /// The config store.
    pub fn config(&self) -> &Arc<ConfigStore> {
        &self.config
    }

    /// The consent gate.
    pub fn consent(&self) -> &Arc<ConsentGate> {
        &self.consent
    }

    /// The telemetry pipeline.
    pub fn telemetry(&self) -> &Arc<TelemetryPipeline> {
        &self.telemetry
    }

    /// The analytics service.
    pub fn analytics(&self) -> &Arc<Analytics> {
        &self.analytics
    }

    /// The extension host.
    pub fn extensions(&self) -> &Arc<ExtensionHost> {
        &self.extensions
    }

    /// The service container.
    pub fn services(&self) -> &ServiceContainer {
        &self.services
    }

    /// The durable key-value store backing consent and analytics.
    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    /// The sample feed for `kind`, for the embedding shell to push
    /// performance entries into.
    pub fn feed(&self, kind: ObserverKind) -> Option<&Arc<SampleFeed>> {
        self.feeds.get(&kind)
    }

    /// A JSON view of the service map for inspection and logging.
    pub fn debug_snapshot(&self) -> Value {
        self.services.snapshot()
    }

    /// Tears everything down: destroys all container-managed services
    /// (discarding telemetry buffers on the way).
    pub async fn shutdown(&self) {
        self.services.destroy_all().await;
        log::info!("Runtime shut down.");
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("services", &self.services.names())
            .field("telemetry_armed", &self.telemetry.is_armed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atrium_consent::{ConsentDecision, ConsentMethod, StaticEnvironment};
    use atrium_core::ServiceStatus;

    fn non_eu_runtime() -> Runtime {
        Runtime::builder()
            .with_environment(Arc::new(StaticEnvironment::new(
                "America/Los_Angeles",
                "en-US",
                false,
            )))
            .build()
    }

    #[tokio::test]
    async fn non_eu_startup_arms_telemetry_and_records_a_visit() {
        let runtime = non_eu_runtime();
        runtime.start().await.unwrap();

        assert!(runtime.telemetry().is_armed());
        assert_eq!(runtime.analytics().visits().len(), 1);
        assert_eq!(runtime.services().status("config"), Some(ServiceStatus::Created));
    }

    #[tokio::test]
    async fn start_runs_on_a_spawned_task() {
        // tokio::spawn requires the boot future to be Send; embedding shells
        // rely on that.
        let runtime = Arc::new(non_eu_runtime());
        let boot = tokio::spawn({
            let runtime = runtime.clone();
            async move { runtime.start().await }
        });
        boot.await.unwrap().unwrap();
        assert!(runtime.telemetry().is_armed());
    }

    #[tokio::test]
    async fn eu_startup_waits_for_the_ui_decision() {
        let runtime = Runtime::builder()
            .with_environment(Arc::new(StaticEnvironment::new(
                "Europe/Berlin",
                "de-DE",
                true,
            )))
            .build();

        let requests = runtime.consent_requests().expect("stream unclaimed");
        let ui = tokio::spawn(async move {
            if let Ok(ConsentRequest::Banner { responder }) = requests.recv_async().await {
                responder.resolve(ConsentDecision::accept(ConsentMethod::Manual, "banner"));
            }
        });

        runtime.start().await.unwrap();
        ui.await.unwrap();

        assert!(runtime.telemetry().is_armed());
    }

    #[tokio::test]
    async fn eu_decline_leaves_telemetry_inert() {
        let runtime = Runtime::builder()
            .with_environment(Arc::new(StaticEnvironment::new(
                "Europe/Berlin",
                "de-DE",
                true,
            )))
            .build();

        let requests = runtime.consent_requests().expect("stream unclaimed");
        let ui = tokio::spawn(async move {
            if let Ok(ConsentRequest::Banner { responder }) = requests.recv_async().await {
                responder.resolve(ConsentDecision::decline("banner"));
            }
        });

        runtime.start().await.unwrap();
        ui.await.unwrap();

        assert!(!runtime.telemetry().is_armed());
        assert!(runtime.analytics().visits().is_empty());
    }

    #[tokio::test]
    async fn factory_services_resolve_through_the_container() {
        let runtime = non_eu_runtime();
        runtime
            .config()
            .set(
                "navigation.sections",
                json!(["/", "/work"]),
                Default::default(),
            )
            .unwrap();
        runtime.start().await.unwrap();

        let nav = runtime.services().get("navigation").await.unwrap();
        let nav = nav
            .as_any()
            .downcast_ref::<NavigationHelper>()
            .expect("navigation service type");
        assert!(nav.is_section("/work"));

        let cache = runtime.services().get("image-cache").await.unwrap();
        let cache = cache.as_any().downcast_ref::<ImageCache>().unwrap();
        cache.put("hero", "https://example.test/hero.webp");
        assert!(cache.get("hero").is_some());
    }

    #[tokio::test]
    async fn revocation_mid_session_discards_telemetry() {
        let runtime = non_eu_runtime();
        runtime.start().await.unwrap();
        assert!(runtime.telemetry().is_armed());

        let id = runtime
            .telemetry()
            .start_measurement("paint", Value::Null)
            .unwrap();
        runtime.telemetry().end_measurement(id, Value::Null);
        assert_eq!(runtime.telemetry().completed_count(), 1);

        runtime.consent().revoke_consent();
        // The consent pump runs on a spawned task; give it a moment.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        assert!(!runtime.telemetry().is_armed());
        assert_eq!(runtime.telemetry().completed_count(), 0);
    }

    #[tokio::test]
    async fn debug_snapshot_lists_every_service() {
        let runtime = non_eu_runtime();
        runtime.start().await.unwrap();

        let snapshot = runtime.debug_snapshot();
        let map = snapshot.as_object().unwrap();
        for name in ["config", "consent", "telemetry", "analytics", "extensions"] {
            assert_eq!(map[name]["status"], "created", "service {name}");
        }
        assert_eq!(map["image-cache"]["status"], "registered");
    }

    #[tokio::test]
    async fn shutdown_destroys_created_services() {
        let runtime = non_eu_runtime();
        runtime.start().await.unwrap();

        runtime.shutdown().await;

        assert_eq!(
            runtime.services().status("telemetry"),
            Some(ServiceStatus::Registered)
        );
        assert!(!runtime.telemetry().is_armed());
    }
}
