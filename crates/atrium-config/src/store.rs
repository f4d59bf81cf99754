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

//! The hierarchical configuration store.

use crate::features::FeatureFlag;
use crate::watch::{WatchCallback, WatchId, WatcherRegistry};
use atrium_core::service::Service;
use serde_json::{Map, Value};
use std::any::Any;
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::RwLock;

/// A specialized `Result` type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// An error that can occur while mutating configuration.
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// A validated `set` wrote a value of the wrong declared type.
    Type {
        /// The dot-path being written.
        path: String,
        /// The declared type at that path.
        expected: &'static str,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Type { path, expected } => {
                write!(f, "Config value at '{path}' must be of type {expected}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// JSON value types usable in declared requirements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// A boolean.
    Bool,
    /// Any JSON number.
    Number,
    /// A string.
    String,
    /// An array.
    Array,
    /// An object.
    Object,
}

impl ValueKind {
    fn matches(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (ValueKind::Bool, Value::Bool(_))
                | (ValueKind::Number, Value::Number(_))
                | (ValueKind::String, Value::String(_))
                | (ValueKind::Array, Value::Array(_))
                | (ValueKind::Object, Value::Object(_))
        )
    }

    fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Bool => "bool",
            ValueKind::Number => "number",
            ValueKind::String => "string",
            ValueKind::Array => "array",
            ValueKind::Object => "object",
        }
    }
}

/// Options for [`ConfigStore::set`].
#[derive(Clone)]
pub struct SetOptions {
    /// Origin tag recorded in the debug log.
    pub source: Option<String>,
    /// Whether watchers are notified (default `true`).
    pub notify: bool,
    /// Whether declared type requirements are enforced (default `true`).
    pub validate: bool,
}

impl Default for SetOptions {
    fn default() -> Self {
        Self {
            source: None,
            notify: true,
            validate: true,
        }
    }
}

/// Layered configuration sources, merged in ascending priority.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Built-in defaults (lowest priority).
    pub defaults: Value,
    /// Environment-level settings.
    pub environment: Value,
    /// Local overrides (e.g. a user file).
    pub local: Value,
    /// Runtime-computed settings.
    pub runtime: Value,
    /// Remote config, when fetched (highest priority).
    pub remote: Option<Value>,
}

/// Result of [`ConfigStore::validate`]: never thrown, always reported.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    /// `true` when no errors were found.
    pub valid: bool,
    /// Violations of declared requirements.
    pub errors: Vec<String>,
    /// Non-fatal oddities (missing optional keys, null values).
    pub warnings: Vec<String>,
}

struct Requirement {
    path: String,
    kind: ValueKind,
    required: bool,
}

/// Hierarchical, namespaced key-value configuration with dot-path access,
/// change notification, and feature-flag evaluation.
///
/// Resolved paths are cached; `set` invalidates every cached path that is a
/// dot-boundary prefix or extension of the written path before notifying
/// watchers.
#[derive(Default)]
pub struct ConfigStore {
    root: RwLock<Value>,
    overrides: RwLock<Value>,
    cache: RwLock<HashMap<String, Value>>,
    watchers: WatcherRegistry,
    requirements: RwLock<Vec<Requirement>>,
    visitor_id: RwLock<Option<String>>,
}

impl ConfigStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            root: RwLock::new(Value::Object(Map::new())),
            overrides: RwLock::new(Value::Object(Map::new())),
            ..Self::default()
        }
    }

    /// Merges the layered `sources` into a fresh tree, then re-applies the
    /// active environment's override block on top.
    ///
    /// Values written with [`set`](Self::set) belong to the runtime layer and
    /// are folded back in at its position, so writes made before a load
    /// survive it (remote config still outranks them).
    ///
    /// The active environment is the string at `environment`; its override
    /// block lives under `environments.<name>`. Loading clears the
    /// resolution cache.
    pub fn load(&self, sources: ConfigSources) {
        let mut merged = Value::Object(Map::new());
        deep_merge(&mut merged, &sources.defaults);
        deep_merge(&mut merged, &sources.environment);
        deep_merge(&mut merged, &sources.local);
        deep_merge(&mut merged, &sources.runtime);
        deep_merge(&mut merged, &self.overrides.read().unwrap());
        if let Some(remote) = &sources.remote {
            deep_merge(&mut merged, remote);
        }

        if let Some(env) = lookup(&merged, "environment").and_then(|v| v.as_str().map(String::from))
        {
            if let Some(overrides) = lookup(&merged, &format!("environments.{env}")).cloned() {
                log::info!("Applying '{env}' environment overrides.");
                deep_merge(&mut merged, &overrides);
            }
        }

        *self.root.write().unwrap() = merged;
        self.cache.write().unwrap().clear();
    }

    /// Returns the value at `path`, or `default` if the path is absent.
    pub fn get(&self, path: &str, default: Value) -> Value {
        if let Some(hit) = self.cache.read().unwrap().get(path) {
            return hit.clone();
        }
        let resolved = lookup(&self.root.read().unwrap(), path).cloned();
        match resolved {
            Some(value) => {
                self.cache
                    .write()
                    .unwrap()
                    .insert(path.to_string(), value.clone());
                value
            }
            None => default,
        }
    }

    /// Typed accessor; absent paths and type mismatches read as `None`.
    pub fn get_as<T: serde::de::DeserializeOwned>(&self, path: &str) -> Option<T> {
        let value = self.get(path, Value::Null);
        serde_json::from_value(value).ok()
    }

    /// Writes `value` at `path`, creating intermediate objects as needed.
    ///
    /// Invalidates cached resolutions that share a dot-boundary with `path`
    /// and notifies exact and wildcard watchers unless disabled.
    pub fn set(&self, path: &str, value: Value, options: SetOptions) -> ConfigResult<()> {
        if options.validate {
            let requirements = self.requirements.read().unwrap();
            if let Some(req) = requirements.iter().find(|r| r.path == path) {
                if !req.kind.matches(&value) {
                    return Err(ConfigError::Type {
                        path: path.to_string(),
                        expected: req.kind.as_str(),
                    });
                }
            }
        }

        insert(&mut self.root.write().unwrap(), path, value.clone());
        insert(&mut self.overrides.write().unwrap(), path, value.clone());

        {
            let mut cache = self.cache.write().unwrap();
            cache.retain(|key, _| !related_paths(key, path));
        }

        match &options.source {
            Some(source) => log::debug!("Config set '{path}' (source: {source})."),
            None => log::debug!("Config set '{path}'."),
        }

        if options.notify {
            self.watchers.notify(path, &value);
        }
        Ok(())
    }

    /// Registers a watcher for an exact path or a `*`/`?` wildcard pattern.
    pub fn watch(&self, pattern: &str, callback: WatchCallback) -> WatchId {
        self.watchers.add(pattern, callback)
    }

    /// Removes a watcher. Returns `false` if the id is unknown.
    pub fn unwatch(&self, id: WatchId) -> bool {
        self.watchers.remove(id)
    }

    /// Declares a typed key for [`validate`](Self::validate) and validated
    /// writes.
    pub fn declare(&self, path: &str, kind: ValueKind, required: bool) {
        self.requirements.write().unwrap().push(Requirement {
            path: path.to_string(),
            kind,
            required,
        });
    }

    /// Checks declared keys against the current tree.
    ///
    /// Missing required keys and type mismatches are errors; missing optional
    /// keys and null values are warnings. Never panics or throws.
    pub fn validate(&self) -> ValidationReport {
        let root = self.root.read().unwrap();
        let requirements = self.requirements.read().unwrap();
        let mut report = ValidationReport::default();

        for req in requirements.iter() {
            match lookup(&root, &req.path) {
                None => {
                    if req.required {
                        report
                            .errors
                            .push(format!("missing required key '{}'", req.path));
                    } else {
                        report
                            .warnings
                            .push(format!("optional key '{}' is absent", req.path));
                    }
                }
                Some(Value::Null) => {
                    report.warnings.push(format!("key '{}' is null", req.path));
                }
                Some(value) if !req.kind.matches(value) => {
                    report.errors.push(format!(
                        "key '{}' must be of type {}",
                        req.path,
                        req.kind.as_str()
                    ));
                }
                Some(_) => {}
            }
        }

        report.valid = report.errors.is_empty();
        report
    }

    /// Sets the stable visitor id used for rollout bucketing.
    pub fn set_visitor_id(&self, id: impl Into<String>) {
        *self.visitor_id.write().unwrap() = Some(id.into());
    }

    /// Evaluates the feature flag at `features.<name>`.
    ///
    /// A bare boolean is taken at face value. A flag object is evaluated as
    /// enabled + conditions + rollout; an absent or malformed flag yields
    /// `default`.
    pub fn get_feature(&self, name: &str, default: bool) -> bool {
        let value = self.get(&format!("features.{name}"), Value::Null);
        match value {
            Value::Bool(flag) => flag,
            Value::Object(_) => match serde_json::from_value::<FeatureFlag>(value) {
                Ok(flag) => {
                    if !flag.enabled || !self.conditions_hold(&flag.conditions) {
                        return false;
                    }
                    let visitor = self
                        .visitor_id
                        .read()
                        .unwrap()
                        .clone()
                        .unwrap_or_default();
                    flag.in_rollout(&visitor)
                }
                Err(e) => {
                    log::warn!("Malformed feature flag '{name}': {e}");
                    default
                }
            },
            Value::Null => default,
            other => {
                log::warn!("Feature flag '{name}' has unexpected shape: {other}");
                default
            }
        }
    }

    /// Every condition entry must equal the config value at its path.
    fn conditions_hold(&self, conditions: &Value) -> bool {
        let Value::Object(map) = conditions else {
            return true;
        };
        map.iter()
            .all(|(path, expected)| &self.get(path, Value::Null) == expected)
    }
}

impl std::fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigStore")
            .field("cached_paths", &self.cache.read().unwrap().len())
            .field("watchers", &self.watchers.len())
            .finish()
    }
}

impl Service for ConfigStore {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// `true` when one path is the other, or a dot-boundary prefix of the other.
fn related_paths(a: &str, b: &str) -> bool {
    a == b
        || a.strip_prefix(b).is_some_and(|rest| rest.starts_with('.'))
        || b.strip_prefix(a).is_some_and(|rest| rest.starts_with('.'))
}

/// Resolves a dot-path inside a JSON tree.
fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Writes a dot-path, creating (or replacing non-object) intermediates.
fn insert(root: &mut Value, path: &str, value: Value) {
    let mut current = root;
    let segments: Vec<&str> = path.split('.').collect();
    for (i, segment) in segments.iter().enumerate() {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        let map = current
            .as_object_mut()
            .expect("just coerced to an object");
        if i == segments.len() - 1 {
            map.insert((*segment).to_string(), value);
            return;
        }
        current = map
            .entry((*segment).to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
}

/// Recursively merges `overlay` on top of `base`. Objects merge per key;
/// everything else replaces.
pub(crate) fn deep_merge(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        base_map.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (base_slot, overlay_value) => {
            if !overlay_value.is_null() {
                *base_slot = overlay_value.clone();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn store_with(tree: Value) -> ConfigStore {
        let store = ConfigStore::new();
        store.load(ConfigSources {
            defaults: tree,
            ..ConfigSources::default()
        });
        store
    }

    #[test]
    fn dot_path_get_and_default() {
        let store = store_with(json!({"theme": {"palette": {"primary": "#222"}}}));
        assert_eq!(
            store.get("theme.palette.primary", Value::Null),
            json!("#222")
        );
        assert_eq!(
            store.get("theme.palette.missing", json!("fallback")),
            json!("fallback")
        );
    }

    #[test]
    fn set_creates_intermediate_objects() {
        let store = ConfigStore::new();
        store
            .set("site.nav.depth", json!(3), SetOptions::default())
            .unwrap();
        assert_eq!(store.get("site.nav.depth", Value::Null), json!(3));
    }

    #[test]
    fn set_invalidates_prefix_and_extension_cache_entries() {
        let store = store_with(json!({"theme": {"palette": {"primary": "#222"}}}));

        // Populate the cache at both levels.
        store.get("theme.palette", Value::Null);
        store.get("theme.palette.primary", Value::Null);

        store
            .set("theme.palette", json!({"primary": "#eee"}), SetOptions::default())
            .unwrap();

        assert_eq!(
            store.get("theme.palette.primary", Value::Null),
            json!("#eee")
        );
        assert_eq!(
            store.get("theme.palette", Value::Null),
            json!({"primary": "#eee"})
        );
    }

    #[test]
    fn watchers_fire_on_set_unless_disabled() {
        let store = ConfigStore::new();
        let hits = Arc::new(Mutex::new(Vec::new()));
        let hits_in_cb = hits.clone();
        store.watch(
            "theme.*",
            Arc::new(move |path, value| {
                hits_in_cb
                    .lock()
                    .unwrap()
                    .push((path.to_string(), value.clone()));
            }),
        );

        store
            .set("theme.mode", json!("dark"), SetOptions::default())
            .unwrap();
        store
            .set(
                "theme.mode",
                json!("light"),
                SetOptions {
                    notify: false,
                    ..SetOptions::default()
                },
            )
            .unwrap();

        let hits = hits.lock().unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0], ("theme.mode".to_string(), json!("dark")));
    }

    #[test]
    fn load_merges_sources_in_ascending_priority() {
        let store = ConfigStore::new();
        store.load(ConfigSources {
            defaults: json!({"a": 1, "b": 1, "c": 1}),
            environment: json!({"b": 2}),
            local: json!({"c": 3}),
            runtime: json!({}),
            remote: Some(json!({"c": 4})),
        });

        assert_eq!(store.get("a", Value::Null), json!(1));
        assert_eq!(store.get("b", Value::Null), json!(2));
        assert_eq!(store.get("c", Value::Null), json!(4));
    }

    #[test]
    fn environment_overrides_reapply_after_merge() {
        let store = ConfigStore::new();
        store.load(ConfigSources {
            defaults: json!({
                "environment": "production",
                "api": {"base": "http://localhost"},
                "environments": {
                    "production": {"api": {"base": "https://example.org"}}
                }
            }),
            ..ConfigSources::default()
        });

        assert_eq!(
            store.get("api.base", Value::Null),
            json!("https://example.org")
        );
    }

    #[test]
    fn set_before_load_survives_at_the_runtime_layer() {
        let store = ConfigStore::new();
        store
            .set("navigation.sections", json!(["/", "/work"]), SetOptions::default())
            .unwrap();

        store.load(ConfigSources {
            defaults: json!({"navigation": {"sections": []}, "theme": "light"}),
            ..ConfigSources::default()
        });

        assert_eq!(
            store.get("navigation.sections", Value::Null),
            json!(["/", "/work"])
        );
        assert_eq!(store.get("theme", Value::Null), json!("light"));
    }

    #[test]
    fn remote_config_outranks_earlier_set_writes() {
        let store = ConfigStore::new();
        store.set("theme", json!("dark"), SetOptions::default()).unwrap();

        store.load(ConfigSources {
            remote: Some(json!({"theme": "remote"})),
            ..ConfigSources::default()
        });

        assert_eq!(store.get("theme", Value::Null), json!("remote"));
    }

    #[test]
    fn validated_set_rejects_wrong_type() {
        let store = ConfigStore::new();
        store.declare("site.title", ValueKind::String, true);

        let err = store
            .set("site.title", json!(42), SetOptions::default())
            .expect_err("type error expected");
        assert!(matches!(err, ConfigError::Type { .. }));

        // Skipping validation lets the write through.
        store
            .set(
                "site.title",
                json!(42),
                SetOptions {
                    validate: false,
                    ..SetOptions::default()
                },
            )
            .unwrap();
    }

    #[test]
    fn validate_reports_instead_of_throwing() {
        let store = store_with(json!({"site": {"title": 42, "tagline": null}}));
        store.declare("site.title", ValueKind::String, true);
        store.declare("site.tagline", ValueKind::String, false);
        store.declare("site.owner", ValueKind::String, true);
        store.declare("site.footer", ValueKind::String, false);

        let report = store.validate();
        assert!(!report.valid);
        assert_eq!(report.errors.len(), 2); // wrong type + missing required
        assert_eq!(report.warnings.len(), 2); // null + missing optional
    }

    #[test]
    fn boolean_feature_flags_read_directly() {
        let store = store_with(json!({"features": {"gallery": true, "beta": false}}));
        assert!(store.get_feature("gallery", false));
        assert!(!store.get_feature("beta", true));
        assert!(store.get_feature("missing", true));
    }

    #[test]
    fn rollout_flags_respect_enabled_and_bounds() {
        let store = store_with(json!({
            "features": {
                "off": {"enabled": false, "rollout": 100},
                "none": {"enabled": true, "rollout": 0},
                "all": {"enabled": true, "rollout": 100}
            }
        }));
        store.set_visitor_id("visitor-1");

        assert!(!store.get_feature("off", true));
        assert!(!store.get_feature("none", true));
        assert!(store.get_feature("all", false));
    }

    #[test]
    fn flag_conditions_must_match_config() {
        let store = store_with(json!({
            "environment": "production",
            "features": {
                "cdn": {
                    "enabled": true,
                    "rollout": 100,
                    "conditions": {"environment": "staging"}
                }
            }
        }));
        assert!(!store.get_feature("cdn", true));
    }

    #[test]
    fn typed_accessor_deserializes() {
        let store = store_with(json!({"telemetry": {"max_measurements": 256}}));
        assert_eq!(store.get_as::<usize>("telemetry.max_measurements"), Some(256));
        assert_eq!(store.get_as::<usize>("telemetry.missing"), None);
    }
}
