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

//! Leaf consumer services wired into the container.
//!
//! These are the stand-ins for the shell's image and navigation helpers:
//! small services that exist to consume configuration and exercise the
//! container's factory and dependency paths.

use atrium_config::ConfigStore;
use atrium_core::Service;
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::RwLock;

/// A capped in-memory cache for resolved image URLs.
#[derive(Debug)]
pub struct ImageCache {
    capacity: usize,
    entries: RwLock<(HashMap<String, String>, VecDeque<String>)>,
}

impl ImageCache {
    /// Creates a cache holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: RwLock::new((HashMap::new(), VecDeque::new())),
        }
    }

    /// Inserts a resolved URL, evicting the oldest entry at capacity.
    pub fn put(&self, key: impl Into<String>, url: impl Into<String>) {
        let key = key.into();
        let mut guard = self.entries.write().unwrap();
        let (map, order) = &mut *guard;
        if !map.contains_key(&key) {
            if map.len() >= self.capacity {
                if let Some(oldest) = order.pop_front() {
                    map.remove(&oldest);
                }
            }
            order.push_back(key.clone());
        }
        map.insert(key, url.into());
    }

    /// Looks up a resolved URL.
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.read().unwrap().0.get(key).cloned()
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap().0.len()
    }

    /// `true` when the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl Service for ImageCache {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Navigation helper: knows the configured section paths.
#[derive(Debug)]
pub struct NavigationHelper {
    sections: Vec<String>,
}

impl NavigationHelper {
    /// Reads `navigation.sections` from the config store.
    pub fn from_config(config: &ConfigStore) -> Self {
        let sections = config
            .get("navigation.sections", Value::Array(Vec::new()))
            .as_array()
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Self { sections }
    }

    /// The configured section paths, in order.
    pub fn sections(&self) -> &[String] {
        &self.sections
    }

    /// `true` when `path` is a configured section.
    pub fn is_section(&self, path: &str) -> bool {
        self.sections.iter().any(|s| s == path)
    }
}

#[async_trait::async_trait]
impl Service for NavigationHelper {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_cache_evicts_the_oldest_entry() {
        let cache = ImageCache::new(2);
        cache.put("a", "url-a");
        cache.put("b", "url-b");
        cache.put("c", "url-c");

        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").is_none());
        assert_eq!(cache.get("c").as_deref(), Some("url-c"));
    }

    #[test]
    fn image_cache_overwrites_in_place() {
        let cache = ImageCache::new(2);
        cache.put("a", "url-a");
        cache.put("a", "url-a2");
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("a").as_deref(), Some("url-a2"));
    }

    #[test]
    fn navigation_reads_sections_from_config() {
        let config = ConfigStore::new();
        config
            .set(
                "navigation.sections",
                serde_json::json!(["/", "/work", "/about"]),
                Default::default(),
            )
            .unwrap();

        let nav = NavigationHelper::from_config(&config);
        assert_eq!(nav.sections().len(), 3);
        assert!(nav.is_section("/work"));
        assert!(!nav.is_section("/missing"));
    }
}
