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

use async_trait::async_trait;
use atrium_core::container::{ServiceContainer, ServiceError, ServiceOptions};
use atrium_core::service::{LifecycleHooks, Service, ServiceSource, ServiceStatus};
use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// A minimal service that remembers which dependencies it was built with.
#[derive(Debug)]
struct Probe {
    label: String,
    dependency_count: usize,
}

impl Service for Probe {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A service whose `initialize` always fails.
#[derive(Debug)]
struct BrokenInit;

#[async_trait]
impl Service for BrokenInit {
    async fn initialize(&self) -> anyhow::Result<()> {
        anyhow::bail!("refusing to start")
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A service that records its own destruction into a shared journal.
#[derive(Debug)]
struct Journaled {
    journal: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Service for Journaled {
    async fn destroy(&self) -> anyhow::Result<()> {
        self.journal.lock().unwrap().push("instance destroy".to_string());
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn probe_factory(label: &str, counter: Arc<AtomicUsize>) -> ServiceSource {
    let label = label.to_string();
    ServiceSource::Factory(Arc::new(move |_config, deps| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(Probe {
            label: label.clone(),
            dependency_count: deps.len(),
        }))
    }))
}

#[tokio::test]
async fn singleton_returns_the_same_instance() {
    let container = ServiceContainer::new();
    let created = Arc::new(AtomicUsize::new(0));
    container
        .register(
            "images",
            probe_factory("images", created.clone()),
            ServiceOptions::default(),
        )
        .await
        .unwrap();

    let first = container.get("images").await.unwrap();
    let second = container.get("images").await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(created.load(Ordering::SeqCst), 1);
    assert_eq!(container.status("images"), Some(ServiceStatus::Created));
}

#[tokio::test]
async fn diamond_dependencies_are_created_exactly_once() {
    // a -> {b, c}, b -> d, c -> d: d serves two dependents but is built once.
    let container = ServiceContainer::new();
    let d_created = Arc::new(AtomicUsize::new(0));

    container
        .register("d", probe_factory("d", d_created.clone()), ServiceOptions::default())
        .await
        .unwrap();
    container
        .register(
            "b",
            probe_factory("b", Arc::new(AtomicUsize::new(0))),
            ServiceOptions::with_dependencies(["d"]),
        )
        .await
        .unwrap();
    container
        .register(
            "c",
            probe_factory("c", Arc::new(AtomicUsize::new(0))),
            ServiceOptions::with_dependencies(["d"]),
        )
        .await
        .unwrap();
    container
        .register(
            "a",
            probe_factory("a", Arc::new(AtomicUsize::new(0))),
            ServiceOptions::with_dependencies(["b", "c"]),
        )
        .await
        .unwrap();

    let a = container.get("a").await.unwrap();
    let a = a.as_any().downcast_ref::<Probe>().unwrap();

    assert_eq!(a.label, "a");
    assert_eq!(a.dependency_count, 2);
    assert_eq!(d_created.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn mutual_dependency_fails_and_caches_nothing() {
    let container = ServiceContainer::new();
    let a_created = Arc::new(AtomicUsize::new(0));
    let b_created = Arc::new(AtomicUsize::new(0));

    container
        .register(
            "a",
            probe_factory("a", a_created.clone()),
            ServiceOptions::with_dependencies(["b"]),
        )
        .await
        .unwrap();
    container
        .register(
            "b",
            probe_factory("b", b_created.clone()),
            ServiceOptions::with_dependencies(["a"]),
        )
        .await
        .unwrap();

    let err = container.get("a").await.expect_err("cycle expected");
    match err {
        ServiceError::Circular(path) => {
            assert_eq!(path.first(), path.last());
            assert!(path.len() >= 3);
        }
        other => panic!("expected Circular, got {other}"),
    }

    // No partial instances were created on either side.
    assert_eq!(a_created.load(Ordering::SeqCst), 0);
    assert_eq!(b_created.load(Ordering::SeqCst), 0);
    assert_eq!(container.status("a"), Some(ServiceStatus::Registered));
    assert_eq!(container.status("b"), Some(ServiceStatus::Registered));
}

#[tokio::test]
async fn unknown_service_is_an_error() {
    let container = ServiceContainer::new();
    let err = container.get("ghost").await.err().expect("error expected");
    assert!(matches!(err, ServiceError::Unknown(ref name) if name == "ghost"));
}

#[tokio::test]
async fn duplicate_registration_is_an_error() {
    let container = ServiceContainer::new();
    container
        .register(
            "nav",
            probe_factory("nav", Arc::new(AtomicUsize::new(0))),
            ServiceOptions::default(),
        )
        .await
        .unwrap();

    let err = container
        .register(
            "nav",
            probe_factory("nav", Arc::new(AtomicUsize::new(0))),
            ServiceOptions::default(),
        )
        .await
        .expect_err("duplicate expected");
    assert!(matches!(err, ServiceError::Duplicate(name) if name == "nav"));
}

#[tokio::test]
async fn eager_registration_creates_immediately() {
    let container = ServiceContainer::new();
    let created = Arc::new(AtomicUsize::new(0));

    container
        .register(
            "eager",
            probe_factory("eager", created.clone()),
            ServiceOptions::default().eager(),
        )
        .await
        .unwrap();

    assert_eq!(created.load(Ordering::SeqCst), 1);
    assert_eq!(container.status("eager"), Some(ServiceStatus::Created));
}

#[tokio::test]
async fn failed_initialize_marks_error_and_never_caches() {
    let container = ServiceContainer::new();
    let attempts = Arc::new(AtomicUsize::new(0));
    let attempts_in_factory = attempts.clone();

    container
        .register(
            "broken",
            ServiceSource::Factory(Arc::new(move |_config, _deps| {
                attempts_in_factory.fetch_add(1, Ordering::SeqCst);
                Ok(Arc::new(BrokenInit))
            })),
            ServiceOptions::default(),
        )
        .await
        .unwrap();

    let err = container.get("broken").await.expect_err("init failure");
    assert!(matches!(err, ServiceError::Creation { .. }));
    assert_eq!(container.status("broken"), Some(ServiceStatus::Error));

    // A failed singleton is not cached; the next request tries again.
    let _ = container.get("broken").await.expect_err("still failing");
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn destroy_runs_hooks_around_instance_destroy() {
    let container = ServiceContainer::new();
    let journal = Arc::new(Mutex::new(Vec::new()));

    let hooks = {
        let before = journal.clone();
        let after = journal.clone();
        LifecycleHooks {
            before_destroy: Some(Arc::new(move |event| {
                before
                    .lock()
                    .unwrap()
                    .push(format!("before_destroy {}", event.service));
                Ok(())
            })),
            after_destroy: Some(Arc::new(move |event| {
                after
                    .lock()
                    .unwrap()
                    .push(format!("after_destroy {}", event.service));
                Ok(())
            })),
            ..LifecycleHooks::default()
        }
    };

    let instance_journal = journal.clone();
    container
        .register(
            "journaled",
            ServiceSource::Factory(Arc::new(move |_config, _deps| {
                Ok(Arc::new(Journaled {
                    journal: instance_journal.clone(),
                }))
            })),
            ServiceOptions {
                hooks,
                ..ServiceOptions::default()
            },
        )
        .await
        .unwrap();

    container.get("journaled").await.unwrap();
    container.destroy("journaled").await.unwrap();

    let entries = journal.lock().unwrap().clone();
    assert_eq!(
        entries,
        vec![
            "before_destroy journaled",
            "instance destroy",
            "after_destroy journaled"
        ]
    );
    assert_eq!(container.status("journaled"), Some(ServiceStatus::Registered));
}

#[tokio::test]
async fn destroying_unknown_or_uncreated_services_is_a_no_op() {
    let container = ServiceContainer::new();
    container.destroy("ghost").await.unwrap();

    container
        .register(
            "lazy",
            probe_factory("lazy", Arc::new(AtomicUsize::new(0))),
            ServiceOptions::default(),
        )
        .await
        .unwrap();
    container.destroy("lazy").await.unwrap();
    assert_eq!(container.status("lazy"), Some(ServiceStatus::Registered));
}

#[tokio::test]
async fn hook_failures_do_not_block_creation() {
    let container = ServiceContainer::new();
    let hooks = LifecycleHooks {
        before_create: Some(Arc::new(|_event| anyhow::bail!("hook exploded"))),
        ..LifecycleHooks::default()
    };

    container
        .register(
            "resilient",
            probe_factory("resilient", Arc::new(AtomicUsize::new(0))),
            ServiceOptions {
                hooks,
                ..ServiceOptions::default()
            },
        )
        .await
        .unwrap();

    assert!(container.get("resilient").await.is_ok());
}

#[tokio::test]
async fn child_container_copies_definitions_but_not_instances() {
    let container = ServiceContainer::new();
    let created = Arc::new(AtomicUsize::new(0));
    container
        .register(
            "shared",
            probe_factory("shared", created.clone()),
            ServiceOptions::default(),
        )
        .await
        .unwrap();
    container.get("shared").await.unwrap();

    let child = container.create_child(vec![(
        "extra".to_string(),
        probe_factory("extra", Arc::new(AtomicUsize::new(0))),
        ServiceOptions::default(),
    )]);

    assert!(child.contains("shared"));
    assert!(child.contains("extra"));
    assert_eq!(child.status("shared"), Some(ServiceStatus::Registered));

    // Resolving in the child builds a fresh instance.
    child.get("shared").await.unwrap();
    assert_eq!(created.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn container_and_errors_format_with_debug() {
    let container = ServiceContainer::new();
    container
        .register(
            "images",
            probe_factory("images", Arc::new(AtomicUsize::new(0))),
            ServiceOptions::default(),
        )
        .await
        .unwrap();
    container.get("images").await.unwrap();

    // Cached instances are Arc<dyn Service>, so this formats through the
    // trait's Debug bound.
    let rendered = format!("{container:?}");
    assert!(rendered.contains("images"));

    let err = container.get("ghost").await.expect_err("unknown expected");
    assert!(format!("{err:?}").contains("ghost"));
}

#[tokio::test]
async fn factory_receives_config_block() {
    let container = ServiceContainer::new();
    let seen = Arc::new(Mutex::new(None));
    let seen_in_factory = seen.clone();

    container
        .register(
            "configured",
            ServiceSource::Factory(Arc::new(move |config, _deps| {
                *seen_in_factory.lock().unwrap() = Some(config.clone());
                Ok(Arc::new(Probe {
                    label: "configured".to_string(),
                    dependency_count: 0,
                }))
            })),
            ServiceOptions {
                config: serde_json::json!({"cache_size": 64}),
                ..ServiceOptions::default()
            },
        )
        .await
        .unwrap();

    container.get("configured").await.unwrap();
    assert_eq!(
        *seen.lock().unwrap(),
        Some(serde_json::json!({"cache_size": 64}))
    );
}
