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

//! Geolocation provider chain.
//!
//! Providers are queried in order; each failure is logged individually and
//! the chain moves on. Only when every provider fails does the resolver hand
//! back the minimal fallback.

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

/// Per-provider request timeout.
pub const GEO_REQUEST_TIMEOUT: Duration = Duration::from_secs(8);

/// Coarse location used to annotate visit records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoLocation {
    /// Country name or code; `"unknown"` for the fallback.
    pub country: String,
    /// Region/state, when the provider reports one.
    #[serde(default)]
    pub region: Option<String>,
    /// City, when the provider reports one.
    #[serde(default)]
    pub city: Option<String>,
}

impl GeoLocation {
    /// The all-providers-failed fallback.
    pub fn unknown() -> Self {
        Self {
            country: "unknown".to_string(),
            region: None,
            city: None,
        }
    }
}

/// One geolocation source.
#[async_trait]
pub trait GeoProvider: Send + Sync + Debug {
    /// Provider name, for logs.
    fn name(&self) -> &str;

    /// Resolves the visitor's coarse location.
    async fn locate(&self) -> anyhow::Result<GeoLocation>;
}

/// A provider backed by an HTTP JSON endpoint.
///
/// The endpoint is expected to answer a JSON object; `country` (or
/// `country_name`), `region` and `city` fields are read when present.
#[derive(Debug)]
pub struct HttpGeoProvider {
    name: String,
    url: String,
    client: reqwest::Client,
}

impl HttpGeoProvider {
    /// Creates a provider for `url` with the standard request timeout.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(GEO_REQUEST_TIMEOUT)
            .build()
            .context("building geolocation HTTP client")?;
        Ok(Self {
            name: name.into(),
            url: url.into(),
            client,
        })
    }
}

#[async_trait]
impl GeoProvider for HttpGeoProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn locate(&self) -> anyhow::Result<GeoLocation> {
        let body: Value = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let country = body
            .get("country")
            .or_else(|| body.get("country_name"))
            .and_then(Value::as_str)
            .context("provider response carries no country")?
            .to_string();
        let field = |key: &str| body.get(key).and_then(Value::as_str).map(str::to_string);

        Ok(GeoLocation {
            country,
            region: field("region").or_else(|| field("region_name")),
            city: field("city"),
        })
    }
}

/// Queries providers in order until one succeeds.
#[derive(Debug, Clone, Default)]
pub struct GeoResolver {
    providers: Vec<Arc<dyn GeoProvider>>,
}

impl GeoResolver {
    /// Creates an empty resolver; [`resolve`](Self::resolve) on it yields the
    /// fallback immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a provider to the chain.
    pub fn with_provider(mut self, provider: Arc<dyn GeoProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Number of configured providers.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// `true` when no providers are configured.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Walks the chain; first success wins, every failure is logged, and an
    /// exhausted chain yields [`GeoLocation::unknown`].
    pub async fn resolve(&self) -> GeoLocation {
        for provider in &self.providers {
            match provider.locate().await {
                Ok(location) => {
                    log::debug!(
                        "Geolocation resolved by '{}': {}",
                        provider.name(),
                        location.country
                    );
                    return location;
                }
                Err(e) => {
                    log::warn!("Geolocation provider '{}' failed: {e:#}", provider.name());
                }
            }
        }
        log::warn!("All geolocation providers failed; using fallback");
        GeoLocation::unknown()
    }
}
