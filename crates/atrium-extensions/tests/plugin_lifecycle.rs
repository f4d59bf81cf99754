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

//! End-to-end plugin host behavior.

use async_trait::async_trait;
use atrium_extensions::{
    ExtensionHost, HookSpec, HostApi, Plugin, PluginError, PluginStatus,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// A plugin that records its initialization and contributes one hook.
#[derive(Debug, Default)]
struct TracingPlugin {
    deps: Vec<String>,
    init_count: AtomicUsize,
    seen_options: Mutex<Option<Value>>,
}

impl TracingPlugin {
    fn with_deps(deps: &[&str]) -> Self {
        Self {
            deps: deps.iter().map(|d| d.to_string()).collect(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl Plugin for TracingPlugin {
    fn dependencies(&self) -> Vec<String> {
        self.deps.clone()
    }

    async fn initialize(&self, options: &Value, api: &HostApi) -> anyhow::Result<()> {
        self.init_count.fetch_add(1, Ordering::SeqCst);
        *self.seen_options.lock().unwrap() = Some(options.clone());
        let tag = api.plugin_name().to_string();
        api.add_hook(
            "page:render",
            Arc::new(move |data, _ctx| {
                let mut order = data.as_array().cloned().unwrap_or_default();
                order.push(json!(tag.clone()));
                Ok(Some(Value::Array(order)))
            }),
            0,
            false,
        );
        Ok(())
    }
}

/// A plugin whose `initialize` always fails after contributing hooks.
#[derive(Debug)]
struct BrokenPlugin;

#[async_trait]
impl Plugin for BrokenPlugin {
    fn hooks(&self) -> Vec<HookSpec> {
        vec![HookSpec {
            name: "page:render".to_string(),
            handler: Arc::new(|_, _| Ok(None)),
            priority: 0,
            critical: false,
        }]
    }

    async fn initialize(&self, _options: &Value, _api: &HostApi) -> anyhow::Result<()> {
        anyhow::bail!("configuration invalid")
    }
}

#[tokio::test]
async fn dependencies_initialize_before_dependents() {
    let host = ExtensionHost::new();
    host.register("analytics", Arc::new(TracingPlugin::default()), Value::Null)
        .unwrap();
    host.register(
        "gallery",
        Arc::new(TracingPlugin::with_deps(&["analytics"])),
        Value::Null,
    )
    .unwrap();

    host.initialize("gallery", Value::Null).await.unwrap();

    assert_eq!(host.status("analytics"), Some(PluginStatus::Initialized));
    assert_eq!(host.status("gallery"), Some(PluginStatus::Initialized));

    // The dependency's hook registered first, so it runs first on a tie.
    let order = host.execute_hooks("page:render", json!([])).unwrap();
    assert_eq!(order, json!(["analytics", "gallery"]));
}

#[tokio::test]
async fn missing_dependency_fails_without_side_effects() {
    let host = ExtensionHost::new();
    host.register(
        "gallery",
        Arc::new(TracingPlugin::with_deps(&["image-cache"])),
        Value::Null,
    )
    .unwrap();

    let err = host.initialize("gallery", Value::Null).await.unwrap_err();
    assert!(matches!(
        err,
        PluginError::MissingDependency { ref plugin, ref dependency }
            if plugin == "gallery" && dependency == "image-cache"
    ));

    // Nothing was registered on the chain.
    assert!(host.hooks().is_empty("page:render"));
    assert_eq!(host.status("gallery"), Some(PluginStatus::Registered));
}

#[tokio::test]
async fn duplicate_registration_is_rejected() {
    let host = ExtensionHost::new();
    host.register("gallery", Arc::new(TracingPlugin::default()), Value::Null)
        .unwrap();
    let err = host
        .register("gallery", Arc::new(TracingPlugin::default()), Value::Null)
        .unwrap_err();
    assert!(matches!(err, PluginError::Duplicate(ref name) if name == "gallery"));
}

#[tokio::test]
async fn reinitialization_is_a_warned_no_op() {
    let host = ExtensionHost::new();
    let plugin = Arc::new(TracingPlugin::default());
    host.register("gallery", plugin.clone(), Value::Null).unwrap();

    host.initialize("gallery", Value::Null).await.unwrap();
    host.initialize("gallery", Value::Null).await.unwrap();

    assert_eq!(plugin.init_count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn override_options_win_over_registration_options() {
    let host = ExtensionHost::new();
    let plugin = Arc::new(TracingPlugin::default());
    host.register(
        "gallery",
        plugin.clone(),
        json!({ "columns": 3, "lazy": true }),
    )
    .unwrap();

    host.initialize("gallery", json!({ "columns": 4 })).await.unwrap();

    let seen = plugin.seen_options.lock().unwrap().clone().unwrap();
    assert_eq!(seen, json!({ "columns": 4, "lazy": true }));
}

#[tokio::test]
async fn mutual_dependencies_are_rejected() {
    let host = ExtensionHost::new();
    host.register("a", Arc::new(TracingPlugin::with_deps(&["b"])), Value::Null)
        .unwrap();
    host.register("b", Arc::new(TracingPlugin::with_deps(&["a"])), Value::Null)
        .unwrap();

    let err = host.initialize("a", Value::Null).await.unwrap_err();
    assert!(matches!(err, PluginError::Circular(_)));
    assert_eq!(host.status("a"), Some(PluginStatus::Registered));
    assert_eq!(host.status("b"), Some(PluginStatus::Registered));
}

#[tokio::test]
async fn failed_initialize_rolls_back_contributions() {
    let host = ExtensionHost::new();
    host.register("broken", Arc::new(BrokenPlugin), Value::Null).unwrap();

    let err = host.initialize("broken", Value::Null).await.unwrap_err();
    assert!(matches!(err, PluginError::Initialization { ref plugin, .. } if plugin == "broken"));
    assert_eq!(host.status("broken"), Some(PluginStatus::Error));

    // The declared hook was removed again.
    assert!(host.hooks().is_empty("page:render"));
}

#[tokio::test]
async fn destroy_removes_exactly_the_plugins_hooks() {
    let host = ExtensionHost::new();
    host.register("gallery", Arc::new(TracingPlugin::default()), Value::Null)
        .unwrap();
    host.register("analytics", Arc::new(TracingPlugin::default()), Value::Null)
        .unwrap();
    host.initialize("gallery", Value::Null).await.unwrap();
    host.initialize("analytics", Value::Null).await.unwrap();
    assert_eq!(host.hooks().len("page:render"), 2);

    host.destroy("gallery").await.unwrap();

    assert_eq!(host.status("gallery"), Some(PluginStatus::Destroyed));
    assert_eq!(host.hooks().len("page:render"), 1);
    let order = host.execute_hooks("page:render", json!([])).unwrap();
    assert_eq!(order, json!(["analytics"]));
}

#[tokio::test]
async fn destroying_an_unknown_plugin_is_a_no_op() {
    let host = ExtensionHost::new();
    host.destroy("ghost").await.unwrap();
}

#[tokio::test]
async fn initializing_an_unknown_plugin_fails() {
    let host = ExtensionHost::new();
    let err = host.initialize("ghost", Value::Null).await.unwrap_err();
    assert!(matches!(err, PluginError::Unknown(ref name) if name == "ghost"));
}
