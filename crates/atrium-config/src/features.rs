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

//! Feature flags with percentage rollout.
//!
//! Rollout bucketing is deterministic per visitor: the stable visitor id is
//! hashed (FNV-1a) modulo 100 and compared against the flag's rollout
//! percentage. A hash at or above the rollout excludes the visitor.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A declarative feature flag, usually parsed from the `features.*` subtree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureFlag {
    /// Master switch; a disabled flag is `false` for everyone.
    pub enabled: bool,
    /// Percentage of visitors the flag is live for, clamped to `[0, 100]`.
    #[serde(default = "full_rollout")]
    pub rollout: i64,
    /// Config paths that must equal the given values for the flag to apply.
    #[serde(default)]
    pub conditions: Value,
}

fn full_rollout() -> i64 {
    100
}

impl FeatureFlag {
    /// The rollout percentage clamped to `[0, 100]`.
    pub fn rollout_clamped(&self) -> u64 {
        self.rollout.clamp(0, 100) as u64
    }

    /// Evaluates the rollout for a visitor, ignoring `conditions`.
    pub fn in_rollout(&self, visitor_id: &str) -> bool {
        if !self.enabled {
            return false;
        }
        let rollout = self.rollout_clamped();
        if rollout >= 100 {
            return true;
        }
        if rollout == 0 {
            return false;
        }
        rollout_bucket(visitor_id) < rollout
    }
}

/// Maps a visitor id onto a stable bucket in `0..100`.
pub fn rollout_bucket(visitor_id: &str) -> u64 {
    fnv1a(visitor_id.as_bytes()) % 100
}

/// 64-bit FNV-1a.
fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    let mut hash = OFFSET_BASIS;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}
