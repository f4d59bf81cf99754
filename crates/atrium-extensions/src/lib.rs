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

//! # Atrium Extensions
//!
//! The plugin host: plugins implement the [`Plugin`] trait, declare
//! dependencies on other plugins, and contribute handlers to named,
//! priority-ordered hook chains and typed, awaited middleware chains. The
//! host tracks which hooks and middleware each plugin owns so destroying a
//! plugin tears down exactly its contributions.

pub mod error;
pub mod hooks;
pub mod host;
pub mod middleware;
pub mod plugin;

pub use error::{PluginError, PluginResult};
pub use hooks::{HookHandler, HookId, HookRegistry};
pub use host::{ExtensionHost, HostApi, SharedContext};
pub use middleware::{MiddlewareFn, MiddlewareId, MiddlewareRegistry};
pub use plugin::{HookSpec, MiddlewareSpec, Plugin, PluginStatus};
