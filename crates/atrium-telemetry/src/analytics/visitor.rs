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

//! Visitor and session identity.

use atrium_core::storage::KeyValueStore;
use std::sync::Mutex;
use uuid::Uuid;

/// Durable storage key for the stable visitor identifier.
pub const VISITOR_ID_KEY: &str = "analytics_user_id";

/// Returns the stable visitor id, creating and persisting one on first use.
///
/// The id is an opaque string; a storage write failure is logged and the
/// freshly minted id is still returned for the current session.
pub fn visitor_id(store: &dyn KeyValueStore) -> String {
    match store.get(VISITOR_ID_KEY) {
        Ok(Some(id)) if !id.is_empty() => return id,
        Ok(_) => {}
        Err(e) => log::warn!("Failed to read visitor id: {e}"),
    }

    let id = Uuid::new_v4().to_string();
    if let Err(e) = store.put(VISITOR_ID_KEY, id.clone()) {
        log::warn!("Failed to persist visitor id: {e}");
    }
    id
}

/// Session-scoped identity: one id per process, created on first access.
#[derive(Debug, Default)]
pub struct SessionStore {
    id: Mutex<Option<String>>,
}

impl SessionStore {
    /// Creates an empty session store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the session id, minting it on the first call.
    pub fn session_id(&self) -> String {
        let mut guard = self.id.lock().unwrap();
        guard
            .get_or_insert_with(|| Uuid::new_v4().to_string())
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atrium_core::storage::InMemoryStore;

    #[test]
    fn visitor_id_is_created_once() {
        let store = InMemoryStore::new();
        let first = visitor_id(&store);
        let second = visitor_id(&store);
        assert_eq!(first, second);
        assert!(!first.is_empty());
    }

    #[test]
    fn existing_visitor_id_is_kept() {
        let store = InMemoryStore::new();
        store.put(VISITOR_ID_KEY, "legacy-id".to_string()).unwrap();
        assert_eq!(visitor_id(&store), "legacy-id");
    }

    #[test]
    fn session_id_is_stable_within_a_session() {
        let session = SessionStore::new();
        assert_eq!(session.session_id(), session.session_id());
    }

    #[test]
    fn sessions_differ_between_stores() {
        let a = SessionStore::new();
        let b = SessionStore::new();
        assert_ne!(a.session_id(), b.session_id());
    }
}
