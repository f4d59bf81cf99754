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

//! # Atrium Core
//!
//! Foundational crate for the Atrium service runtime: the service container,
//! the `Service` contract, dependency-graph utilities, the generic event bus,
//! and the key-value storage abstraction shared by the higher-level crates.

#![warn(missing_docs)]

pub mod container;
pub mod event;
pub mod graph;
pub mod service;
pub mod storage;

pub use container::{ServiceContainer, ServiceError, ServiceOptions, ServiceResult};
pub use event::EventBus;
pub use service::{Service, ServiceSource, ServiceStatus};
