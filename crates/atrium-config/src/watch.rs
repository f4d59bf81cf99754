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

//! Change-notification watchers for configuration paths.
//!
//! A watcher subscribes to an exact dot-path or a wildcard pattern where `*`
//! matches any run of characters (including dots) and `?` matches a single
//! character.

use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// Handle identifying a registered watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchId(u64);

/// Callback invoked with the changed path and its new value.
pub type WatchCallback = Arc<dyn Fn(&str, &Value) + Send + Sync>;

struct Watcher {
    id: WatchId,
    pattern: String,
    callback: WatchCallback,
}

/// Registry of path watchers.
#[derive(Default)]
pub(crate) struct WatcherRegistry {
    watchers: RwLock<Vec<Watcher>>,
    next_id: AtomicU64,
}

impl WatcherRegistry {
    pub(crate) fn add(&self, pattern: &str, callback: WatchCallback) -> WatchId {
        let id = WatchId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.watchers.write().unwrap().push(Watcher {
            id,
            pattern: pattern.to_string(),
            callback,
        });
        id
    }

    pub(crate) fn remove(&self, id: WatchId) -> bool {
        let mut watchers = self.watchers.write().unwrap();
        let before = watchers.len();
        watchers.retain(|w| w.id != id);
        watchers.len() != before
    }

    /// Invokes every watcher whose pattern matches `path`, exact keys first.
    pub(crate) fn notify(&self, path: &str, value: &Value) {
        let matched: Vec<WatchCallback> = {
            let watchers = self.watchers.read().unwrap();
            watchers
                .iter()
                .filter(|w| w.pattern == path || glob_match(&w.pattern, path))
                .map(|w| w.callback.clone())
                .collect()
        };
        for callback in matched {
            callback(path, value);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.watchers.read().unwrap().len()
    }
}

/// Matches `pattern` against `text` with `*` (any run) and `?` (one char).
pub(crate) fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();
    match_from(&pattern, &text)
}

fn match_from(pattern: &[char], text: &[char]) -> bool {
    match pattern.first() {
        None => text.is_empty(),
        Some('*') => {
            // Try every possible span for the star, shortest first.
            (0..=text.len()).any(|skip| match_from(&pattern[1..], &text[skip..]))
        }
        Some('?') => !text.is_empty() && match_from(&pattern[1..], &text[1..]),
        Some(c) => text.first() == Some(c) && match_from(&pattern[1..], &text[1..]),
    }
}
