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

//! Error taxonomy for the service container.

use std::fmt::Display;

/// A specialized `Result` type for container operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// An error that can occur while registering or resolving services.
#[derive(Debug)]
pub enum ServiceError {
    /// A service with this name is already registered.
    Duplicate(String),
    /// No service with this name is registered.
    Unknown(String),
    /// The dependency graph reachable from the requested service contains a
    /// cycle; the path starts and ends at the repeated name.
    Circular(Vec<String>),
    /// The factory or the instance's `initialize` failed.
    Creation {
        /// The service whose instantiation failed.
        name: String,
        /// The underlying failure.
        source: anyhow::Error,
    },
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceError::Duplicate(name) => {
                write!(f, "Service '{name}' is already registered")
            }
            ServiceError::Unknown(name) => write!(f, "Service '{name}' is not registered"),
            ServiceError::Circular(path) => {
                write!(f, "Circular service dependency: {}", path.join(" -> "))
            }
            ServiceError::Creation { name, source } => {
                write!(f, "Failed to create service '{name}': {source}")
            }
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServiceError::Creation { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}
