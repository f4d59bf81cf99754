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

//! Plugin host error types.

use std::fmt;

/// Result alias for plugin host operations.
pub type PluginResult<T> = Result<T, PluginError>;

/// Errors surfaced by the plugin host.
#[derive(Debug)]
pub enum PluginError {
    /// A plugin with this name is already registered.
    Duplicate(String),
    /// No plugin is registered under this name.
    Unknown(String),
    /// A declared dependency was never registered.
    MissingDependency {
        /// The plugin being initialized.
        plugin: String,
        /// The dependency it declared.
        dependency: String,
    },
    /// The plugin dependency graph contains a cycle.
    Circular(Vec<String>),
    /// The plugin's own `initialize` failed.
    Initialization {
        /// The failing plugin.
        plugin: String,
        /// The underlying failure.
        source: anyhow::Error,
    },
    /// A hook marked critical failed, aborting its chain.
    CriticalHook {
        /// The hook chain name.
        hook: String,
        /// The underlying failure.
        source: anyhow::Error,
    },
    /// A middleware failed, aborting its chain.
    Middleware {
        /// The middleware's registered name.
        name: String,
        /// The underlying failure.
        source: anyhow::Error,
    },
}

impl fmt::Display for PluginError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginError::Duplicate(name) => {
                write!(f, "Plugin '{name}' is already registered")
            }
            PluginError::Unknown(name) => write!(f, "Unknown plugin: '{name}'"),
            PluginError::MissingDependency { plugin, dependency } => write!(
                f,
                "Plugin '{plugin}' depends on unregistered plugin '{dependency}'"
            ),
            PluginError::Circular(path) => {
                write!(f, "Circular plugin dependency: {}", path.join(" -> "))
            }
            PluginError::Initialization { plugin, source } => {
                write!(f, "Plugin '{plugin}' failed to initialize: {source}")
            }
            PluginError::CriticalHook { hook, source } => {
                write!(f, "Critical hook in chain '{hook}' failed: {source}")
            }
            PluginError::Middleware { name, source } => {
                write!(f, "Middleware '{name}' failed: {source}")
            }
        }
    }
}

impl std::error::Error for PluginError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PluginError::Initialization { source, .. }
            | PluginError::CriticalHook { source, .. }
            | PluginError::Middleware { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_offenders() {
        let err = PluginError::MissingDependency {
            plugin: "gallery".to_string(),
            dependency: "image-cache".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Plugin 'gallery' depends on unregistered plugin 'image-cache'"
        );

        let err = PluginError::Circular(vec![
            "a".to_string(),
            "b".to_string(),
            "a".to_string(),
        ]);
        assert_eq!(err.to_string(), "Circular plugin dependency: a -> b -> a");
    }

    #[test]
    fn sources_are_preserved() {
        use std::error::Error;
        let err = PluginError::Initialization {
            plugin: "gallery".to_string(),
            source: anyhow::anyhow!("boom"),
        };
        assert!(err.source().is_some());
    }
}
