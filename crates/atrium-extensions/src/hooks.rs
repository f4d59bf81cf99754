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

//! Named, priority-ordered hook chains.

use crate::error::{PluginError, PluginResult};
use crate::host::SharedContext;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// A hook handler.
///
/// Receives the current accumulator and the shared context; returning
/// `Some(value)` replaces the accumulator for the rest of the chain,
/// returning `None` leaves it untouched.
pub type HookHandler =
    Arc<dyn Fn(&Value, &SharedContext) -> anyhow::Result<Option<Value>> + Send + Sync>;

/// Opaque handle identifying one registered hook, used for removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(u64);

struct HookEntry {
    id: HookId,
    handler: HookHandler,
    priority: i32,
    critical: bool,
    seq: u64,
}

/// A thread-safe registry of named hook chains.
///
/// Chains run in descending priority order; equal priorities keep
/// registration order. A failing hook is logged and skipped unless it was
/// registered as critical, in which case it aborts the whole invocation.
#[derive(Clone, Default)]
pub struct HookRegistry {
    chains: Arc<Mutex<HashMap<String, Vec<HookEntry>>>>,
    next: Arc<AtomicU64>,
}

impl HookRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a handler to the chain registered under `name`.
    pub fn add(
        &self,
        name: &str,
        handler: HookHandler,
        priority: i32,
        critical: bool,
    ) -> HookId {
        let seq = self.next.fetch_add(1, Ordering::Relaxed);
        let id = HookId(seq);
        self.chains
            .lock()
            .unwrap()
            .entry(name.to_string())
            .or_default()
            .push(HookEntry {
                id,
                handler,
                priority,
                critical,
                seq,
            });
        log::debug!("Added hook to chain '{name}' (priority {priority}, critical {critical}).");
        id
    }

    /// Removes a handler from the chain under `name`. Returns whether it was
    /// present.
    pub fn remove(&self, name: &str, id: HookId) -> bool {
        let mut chains = self.chains.lock().unwrap();
        let Some(entries) = chains.get_mut(name) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|e| e.id != id);
        let removed = entries.len() < before;
        if entries.is_empty() {
            chains.remove(name);
        }
        removed
    }

    /// Runs the chain under `name`, threading `data` through each handler.
    ///
    /// Returns the final accumulator. An empty or unknown chain returns the
    /// input unchanged.
    pub fn execute(
        &self,
        name: &str,
        data: Value,
        context: &SharedContext,
    ) -> PluginResult<Value> {
        let entries: Vec<(HookHandler, bool)> = {
            let chains = self.chains.lock().unwrap();
            let Some(entries) = chains.get(name) else {
                return Ok(data);
            };
            let mut ordered: Vec<&HookEntry> = entries.iter().collect();
            ordered.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.seq.cmp(&b.seq)));
            ordered
                .into_iter()
                .map(|e| (e.handler.clone(), e.critical))
                .collect()
        };

        let mut accumulator = data;
        for (handler, critical) in entries {
            match handler(&accumulator, context) {
                Ok(Some(value)) => accumulator = value,
                Ok(None) => {}
                Err(e) if critical => {
                    return Err(PluginError::CriticalHook {
                        hook: name.to_string(),
                        source: e,
                    });
                }
                Err(e) => {
                    log::warn!("Hook in chain '{name}' failed (non-critical, skipped): {e:#}");
                }
            }
        }
        Ok(accumulator)
    }

    /// Number of handlers in the chain under `name`.
    pub fn len(&self, name: &str) -> usize {
        self.chains
            .lock()
            .unwrap()
            .get(name)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// `true` when no handler is registered under `name`.
    pub fn is_empty(&self, name: &str) -> bool {
        self.len(name) == 0
    }
}

impl std::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let chains = self.chains.lock().unwrap();
        let mut counts: Vec<(String, usize)> = chains
            .iter()
            .map(|(name, entries)| (name.clone(), entries.len()))
            .collect();
        counts.sort();
        f.debug_struct("HookRegistry").field("chains", &counts).finish()
    }
}
