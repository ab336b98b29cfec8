// Copyright 2024 FastLabs Developers
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

//! A file-backed, phase-tagged logger for application startup.
//!
//! [`StartupLog`] records what happens before the main [`LogContext`](crate::LogContext) is
//! configured. It shares the level vocabulary of [`Logger`](crate::Logger) and tags every entry
//! with a lifecycle [`Phase`].

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

mod diagnostics;
mod record;
mod startup;

pub use self::diagnostics::Diagnostics;
pub use self::diagnostics::PhaseRecord;
pub use self::record::Banner;
pub use self::record::Outcome;
pub use self::record::PhaseMark;
pub use self::record::ShutdownBanner;
pub use self::record::StartupEntry;
pub use self::record::StartupRecord;
pub use self::record::parse_log;
pub use self::record::redacted_env;
pub use self::startup::StartupLog;
pub use self::startup::StartupLogBuilder;

/// Application lifecycle phases, in the order they normally run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Process start.
    Init,
    /// Reading the environment.
    Environment,
    /// Loading configuration.
    Config,
    /// Setting up the logging backend.
    Backend,
    /// Starting services.
    Services,
    /// Serving.
    Ready,
    /// Shutting down.
    Shutdown,
}

impl Phase {
    /// Every phase in lifecycle order.
    pub const ALL: [Phase; 7] = [
        Phase::Init,
        Phase::Environment,
        Phase::Config,
        Phase::Backend,
        Phase::Services,
        Phase::Ready,
        Phase::Shutdown,
    ];

    /// The lowercase name of this phase.
    pub const fn name(&self) -> &'static str {
        match self {
            Phase::Init => "init",
            Phase::Environment => "environment",
            Phase::Config => "config",
            Phase::Backend => "backend",
            Phase::Services => "services",
            Phase::Ready => "ready",
            Phase::Shutdown => "shutdown",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}
