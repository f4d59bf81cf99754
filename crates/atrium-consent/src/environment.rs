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

//! The visitor-environment seam the EU heuristics read from.

use std::fmt::Debug;

/// Signals about the visitor's locale environment.
///
/// Detection degrades gracefully: any signal may be absent, and an absent
/// signal never counts toward an EU verdict.
pub trait VisitorEnvironment: Send + Sync + Debug {
    /// IANA timezone name (e.g. `Europe/Berlin`).
    fn timezone(&self) -> Option<String>;

    /// BCP 47 language tag (e.g. `de-DE`, `en-US`).
    fn language(&self) -> Option<String>;

    /// `true` when the locale's short date puts the day before the month.
    fn day_before_month(&self) -> Option<bool>;
}

/// Reads the environment of the hosting process (`TZ`, `LANG`).
///
/// The date-order signal is derived from the language tag: `en-US` (and the
/// handful of other month-first locales) answer `false`, everything else
/// `true`.
#[derive(Debug, Default)]
pub struct SystemEnvironment;

/// Locales that write the month before the day.
const MONTH_FIRST_LOCALES: &[&str] = &["en-US", "en-PH", "en-CA"];

impl VisitorEnvironment for SystemEnvironment {
    fn timezone(&self) -> Option<String> {
        std::env::var("TZ").ok().filter(|tz| !tz.is_empty())
    }

    fn language(&self) -> Option<String> {
        // LANG looks like "de_DE.UTF-8"; normalize to a BCP 47-ish tag.
        let raw = std::env::var("LANG").ok().filter(|l| !l.is_empty())?;
        let tag = raw.split('.').next().unwrap_or(&raw).replace('_', "-");
        Some(tag)
    }

    fn day_before_month(&self) -> Option<bool> {
        let language = self.language()?;
        Some(!MONTH_FIRST_LOCALES.iter().any(|l| language.eq_ignore_ascii_case(l)))
    }
}

/// A fixed environment for tests and embedding shells that know better.
#[derive(Debug, Clone, Default)]
pub struct StaticEnvironment {
    /// IANA timezone name, if known.
    pub timezone: Option<String>,
    /// BCP 47 language tag, if known.
    pub language: Option<String>,
    /// Day-before-month date ordering, if known.
    pub day_before_month: Option<bool>,
}

impl StaticEnvironment {
    /// Shorthand for a fully specified environment.
    pub fn new(timezone: &str, language: &str, day_before_month: bool) -> Self {
        Self {
            timezone: Some(timezone.to_string()),
            language: Some(language.to_string()),
            day_before_month: Some(day_before_month),
        }
    }
}

impl VisitorEnvironment for StaticEnvironment {
    fn timezone(&self) -> Option<String> {
        self.timezone.clone()
    }

    fn language(&self) -> Option<String> {
        self.language.clone()
    }

    fn day_before_month(&self) -> Option<bool> {
        self.day_before_month
    }
}
