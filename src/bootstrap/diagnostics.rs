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

use serde::Serialize;

use super::Outcome;
use super::Phase;
use super::PhaseMark;
use super::StartupRecord;
use crate::Level;

/// A completed phase and how long it took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PhaseRecord {
    /// The phase.
    pub phase: Phase,
    /// Milliseconds from the phase start to its completion.
    pub duration_ms: u64,
}

/// A summary of one startup run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    /// The service named in the startup banner.
    pub service: Option<String>,
    /// Phases completed, in completion order.
    pub phases_completed: Vec<PhaseRecord>,
    /// The phase of the most recent entry.
    pub current_phase: Option<Phase>,
    /// The phase that was running when startup failed.
    pub failed_phase: Option<Phase>,
    /// How startup ended, if it has.
    pub outcome: Option<Outcome>,
    /// Number of error entries.
    pub errors: usize,
    /// Number of warning entries.
    pub warnings: usize,
    /// The message of the most recent error entry.
    pub last_error: Option<String>,
    /// Total startup time, once startup has ended.
    pub total_duration_ms: Option<u64>,
}

impl Diagnostics {
    /// Summarise records read back with [`parse_log`](super::parse_log).
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a StartupRecord>) -> Self {
        let mut diagnostics = Diagnostics::default();
        for record in records {
            diagnostics.observe(record);
        }
        diagnostics
    }

    /// Fold one record into the summary.
    pub fn observe(&mut self, record: &StartupRecord) {
        match record {
            StartupRecord::Startup(banner) => {
                self.service = Some(banner.service.clone());
            }
            StartupRecord::Entry(entry) => {
                self.current_phase = Some(entry.phase);
                match entry.level {
                    Level::Error => {
                        self.errors += 1;
                        self.last_error = Some(entry.message.clone());
                    }
                    Level::Warn => self.warnings += 1,
                    Level::Debug | Level::Info => {}
                }
                if entry.mark == Some(PhaseMark::Completed) {
                    let duration_ms = entry
                        .data
                        .as_ref()
                        .and_then(|data| data.get("duration_ms"))
                        .and_then(|ms| ms.as_u64())
                        .unwrap_or(0);
                    self.phases_completed.push(PhaseRecord {
                        phase: entry.phase,
                        duration_ms,
                    });
                }
            }
            StartupRecord::Shutdown(banner) => {
                self.outcome = Some(banner.outcome);
                self.failed_phase = banner.failed_phase;
                self.total_duration_ms = Some(banner.duration_ms);
            }
        }
    }

    /// Whether startup ended successfully.
    pub fn is_completed(&self) -> bool {
        self.outcome == Some(Outcome::Completed)
    }

    /// The completion record of `phase`, if it completed.
    pub fn phase(&self, phase: Phase) -> Option<&PhaseRecord> {
        self.phases_completed.iter().find(|r| r.phase == phase)
    }
}
