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

//! Headless shell: boots the runtime, answers consent requests on the
//! command line's behalf (declining, since nobody is watching), and logs the
//! service map.

use atrium_config::ConfigSources;
use atrium_consent::{ConsentDecision, ConsentRequest};
use atrium_core::storage::JsonFileStore;
use atrium_runtime::Runtime;
use serde_json::json;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let store = JsonFileStore::open(JsonFileStore::default_path())?;
    let runtime = Runtime::builder()
        .with_store(Arc::new(store))
        .with_sources(ConfigSources {
            defaults: json!({
                "environment": "production",
                "navigation": { "sections": ["/", "/work", "/about", "/contact"] },
                "features": {
                    "lazy-images": { "enabled": true, "rollout": 100 }
                }
            }),
            ..ConfigSources::default()
        })
        .build();

    // Headless consent surface: log the request and decline, so an EU
    // detection never stalls the boot and never persists a silent grant.
    let requests = runtime
        .consent_requests()
        .expect("consent request stream claimed twice");
    tokio::spawn(async move {
        while let Ok(request) = requests.recv_async().await {
            match request {
                ConsentRequest::Banner { responder } => {
                    log::info!("Consent banner requested; declining (headless run)");
                    responder.resolve(ConsentDecision::decline("headless"));
                }
                ConsentRequest::ShowDetails => {
                    log::info!("Consent details requested (headless run, ignored)");
                }
            }
        }
    });

    runtime.start().await?;
    log::info!("Service map: {}", runtime.debug_snapshot());

    runtime.shutdown().await;
    Ok(())
}
