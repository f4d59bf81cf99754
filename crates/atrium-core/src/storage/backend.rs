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

//! The storage backend contract.

use std::fmt::{Debug, Display};

/// A specialized `Result` type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// An error that can occur in a storage backend.
#[derive(Debug, Clone)]
pub enum StorageError {
    /// The backing medium failed (I/O, poisoned lock, ...).
    Backend(String),
    /// A value could not be serialized for storage.
    Serialization(String),
}

impl Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Backend(msg) => write!(f, "Storage backend error: {msg}"),
            StorageError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {}

/// A durable string key-value store.
///
/// Implementations must be safe to share behind an `Arc` across the runtime.
/// All values are opaque strings; JSON helpers live in the parent module.
pub trait KeyValueStore: Send + Sync + Debug {
    /// Returns the value stored under `key`, if any.
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    fn put(&self, key: &str, value: String) -> StorageResult<()>;

    /// Removes `key`. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> StorageResult<()>;

    /// Lists all stored keys.
    fn keys(&self) -> StorageResult<Vec<String>>;
}
