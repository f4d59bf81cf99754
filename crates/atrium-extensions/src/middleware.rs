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

//! Typed, sequentially awaited middleware chains.

use crate::error::{PluginError, PluginResult};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// An async transformation applied to a value flowing through a chain.
pub type MiddlewareFn = Arc<
    dyn Fn(Value) -> Pin<Box<dyn Future<Output = anyhow::Result<Value>> + Send>> + Send + Sync,
>;

/// Opaque handle identifying one registered middleware, used for removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MiddlewareId(u64);

struct MiddlewareEntry {
    id: MiddlewareId,
    name: String,
    func: MiddlewareFn,
    kind: Option<String>,
    priority: i32,
    seq: u64,
}

/// A thread-safe registry of middleware.
///
/// Execution filters to middleware whose kind is unset or matches the
/// requested kind, orders by descending priority (registration order on
/// ties), and awaits each in turn; the first failure aborts the chain and
/// propagates.
#[derive(Clone, Default)]
pub struct MiddlewareRegistry {
    entries: Arc<Mutex<Vec<MiddlewareEntry>>>,
    next: Arc<AtomicU64>,
}

impl MiddlewareRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a middleware. `kind: None` makes it run for every chain kind.
    pub fn add(
        &self,
        name: &str,
        func: MiddlewareFn,
        kind: Option<String>,
        priority: i32,
    ) -> MiddlewareId {
        let seq = self.next.fetch_add(1, Ordering::Relaxed);
        let id = MiddlewareId(seq);
        self.entries.lock().unwrap().push(MiddlewareEntry {
            id,
            name: name.to_string(),
            func,
            kind,
            priority,
            seq,
        });
        log::debug!("Added middleware '{name}' (priority {priority}).");
        id
    }

    /// Removes a middleware. Returns whether it was present.
    pub fn remove(&self, id: MiddlewareId) -> bool {
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|e| e.id != id);
        entries.len() < before
    }

    /// Runs the chain for `kind`, threading `data` through each middleware.
    pub async fn execute(&self, kind: &str, data: Value) -> PluginResult<Value> {
        let selected: Vec<(String, MiddlewareFn)> = {
            let entries = self.entries.lock().unwrap();
            let mut matching: Vec<&MiddlewareEntry> = entries
                .iter()
                .filter(|e| e.kind.as_deref().map_or(true, |k| k == kind))
                .collect();
            matching.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.seq.cmp(&b.seq)));
            matching
                .into_iter()
                .map(|e| (e.name.clone(), e.func.clone()))
                .collect()
        };

        let mut value = data;
        for (name, func) in selected {
            value = func(value).await.map_err(|e| PluginError::Middleware {
                name,
                source: e,
            })?;
        }
        Ok(value)
    }

    /// Total number of registered middleware, across kinds.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    /// `true` when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for MiddlewareRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiddlewareRegistry")
            .field("entries", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tagger(tag: &'static str) -> MiddlewareFn {
        Arc::new(move |data| {
            Box::pin(async move {
                let mut order = data.as_array().cloned().unwrap_or_default();
                order.push(json!(tag));
                Ok(Value::Array(order))
            })
        })
    }

    #[tokio::test]
    async fn kind_filter_includes_untyped_middleware() {
        let registry = MiddlewareRegistry::new();
        registry.add("images-only", tagger("image"), Some("image".to_string()), 5);
        registry.add("everything", tagger("any"), None, 1);
        registry.add("nav-only", tagger("nav"), Some("navigation".to_string()), 10);

        let result = registry.execute("image", json!([])).await.unwrap();
        assert_eq!(result, json!(["image", "any"]));
    }

    #[tokio::test]
    async fn chains_run_in_descending_priority_order() {
        let registry = MiddlewareRegistry::new();
        registry.add("low", tagger("p1"), None, 1);
        registry.add("high", tagger("p10"), None, 10);
        registry.add("mid", tagger("p5"), None, 5);

        let result = registry.execute("any", json!([])).await.unwrap();
        assert_eq!(result, json!(["p10", "p5", "p1"]));
    }

    #[tokio::test]
    async fn failure_aborts_and_propagates() {
        let registry = MiddlewareRegistry::new();
        registry.add(
            "broken",
            Arc::new(|_| Box::pin(async { anyhow::bail!("transform failed") })),
            None,
            10,
        );
        registry.add("unreached", tagger("late"), None, 1);

        let err = registry.execute("any", json!([])).await.unwrap_err();
        assert!(matches!(err, PluginError::Middleware { ref name, .. } if name == "broken"));
    }

    #[tokio::test]
    async fn removal_by_id() {
        let registry = MiddlewareRegistry::new();
        let id = registry.add("gone", tagger("gone"), None, 1);
        assert!(registry.remove(id));
        assert!(!registry.remove(id));

        let result = registry.execute("any", json!([])).await.unwrap();
        assert_eq!(result, json!([]));
    }
}
