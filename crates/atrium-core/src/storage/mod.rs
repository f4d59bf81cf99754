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

//! Durable, origin-scoped key-value storage.
//!
//! Consent records, detection caches, the visit log, and the visitor id all
//! live behind the [`KeyValueStore`] trait so tests and the headless binary
//! can swap the backing medium freely.

pub mod backend;
pub mod file_backend;
pub mod memory_backend;

pub use backend::{KeyValueStore, StorageError, StorageResult};
pub use file_backend::JsonFileStore;
pub use memory_backend::InMemoryStore;

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Reads `key` and deserializes its JSON value.
///
/// A value that fails to deserialize is treated as absent (and logged), so a
/// corrupt record never takes the caller down.
pub fn get_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> StorageResult<Option<T>> {
    let Some(raw) = store.get(key)? else {
        return Ok(None);
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            log::warn!("Discarding malformed stored value for '{key}': {e}");
            Ok(None)
        }
    }
}

/// Serializes `value` as JSON and writes it under `key`.
pub fn put_json<T: Serialize>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> StorageResult<()> {
    let raw = serde_json::to_string(value)
        .map_err(|e| StorageError::Serialization(e.to_string()))?;
    store.put(key, raw)
}
