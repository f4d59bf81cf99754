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

//! Remote configuration contract.
//!
//! The endpoint is expected to return a JSON object that gets merged into
//! the config tree. Any failure — network, HTTP status, or a non-object
//! body — is logged and yields an empty object; remote config is never a
//! startup blocker.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::Duration;

/// Where and how to fetch remote configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfigSpec {
    /// Endpoint returning a JSON object.
    pub url: String,
    /// HTTP method; anything unrecognized falls back to GET.
    #[serde(default = "default_method")]
    pub method: String,
    /// Extra request headers.
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

fn default_method() -> String {
    "GET".to_string()
}

/// Default timeout for the remote config request.
pub const REMOTE_CONFIG_TIMEOUT: Duration = Duration::from_secs(8);

/// Fetches the remote config object described by `spec`.
///
/// Returns an empty JSON object on any failure.
pub async fn fetch(spec: &RemoteConfigSpec) -> Value {
    match try_fetch(spec).await {
        Ok(Value::Object(map)) => Value::Object(map),
        Ok(other) => {
            log::warn!(
                "Remote config at {} returned a non-object ({}); ignoring.",
                spec.url,
                kind_of(&other)
            );
            empty_object()
        }
        Err(e) => {
            log::warn!("Remote config fetch from {} failed: {e}", spec.url);
            empty_object()
        }
    }
}

async fn try_fetch(spec: &RemoteConfigSpec) -> Result<Value, anyhow::Error> {
    let client = reqwest::Client::new();
    let method = reqwest::Method::from_bytes(spec.method.to_uppercase().as_bytes())
        .unwrap_or(reqwest::Method::GET);

    let mut request = client
        .request(method, &spec.url)
        .timeout(REMOTE_CONFIG_TIMEOUT);
    for (name, value) in &spec.headers {
        request = request.header(name, value);
    }

    let response = request.send().await?.error_for_status()?;
    Ok(response.json().await?)
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_deserializes_with_defaults() {
        let spec: RemoteConfigSpec =
            serde_json::from_str(r#"{"url": "https://example.org/config.json"}"#).unwrap();
        assert_eq!(spec.method, "GET");
        assert!(spec.headers.is_empty());
    }

    #[tokio::test]
    async fn unreachable_endpoint_yields_empty_object() {
        let spec = RemoteConfigSpec {
            // Reserved port; connection is refused immediately.
            url: "http://127.0.0.1:9/config.json".to_string(),
            method: "GET".to_string(),
            headers: HashMap::new(),
        };
        assert_eq!(fetch(&spec).await, Value::Object(Map::new()));
    }

    #[tokio::test]
    async fn bogus_method_falls_back_to_get() {
        let spec = RemoteConfigSpec {
            url: "http://127.0.0.1:9/config.json".to_string(),
            method: "not a method".to_string(),
            headers: HashMap::new(),
        };
        // Still resolves to the non-fatal empty object rather than panicking.
        assert_eq!(fetch(&spec).await, Value::Object(Map::new()));
    }
}
