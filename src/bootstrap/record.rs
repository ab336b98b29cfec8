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

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use super::Phase;
use crate::Error;
use crate::Level;

const SENSITIVE_MARKERS: &[&str] = &[
    "SECRET",
    "TOKEN",
    "PASSWORD",
    "KEY",
    "AUTH",
    "CREDENTIAL",
    "COOKIE",
];

const REDACTED: &str = "[REDACTED]";

/// One line of a startup log.
///
/// Lines are tagged by `type`:
///
/// ```json
/// {"type":"startup","time":"2024-08-11T14:44:57Z","pid":4242,"hostname":"web-1","service":"shop","env":{"HOME":"/root"}}
/// {"type":"entry","time":"2024-08-11T14:44:57Z","level":"info","phase":"config","message":"loaded","elapsed_ms":12}
/// {"type":"shutdown","time":"2024-08-11T14:44:58Z","outcome":"completed","duration_ms":1040}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StartupRecord {
    /// Written when the log is opened.
    Startup(Banner),
    /// A phase-tagged entry.
    Entry(StartupEntry),
    /// Written when startup completes or fails.
    Shutdown(ShutdownBanner),
}

/// The startup banner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Banner {
    /// When the log was opened.
    pub time: String,
    /// The process id.
    pub pid: u32,
    /// The host name.
    pub hostname: String,
    /// The service name.
    pub service: String,
    /// The process environment with sensitive values replaced.
    pub env: BTreeMap<String, String>,
}

/// Marks entries that open or close a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseMark {
    /// The phase started.
    Started,
    /// The phase completed.
    Completed,
}

/// A phase-tagged startup entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartupEntry {
    /// When the entry was written.
    pub time: String,
    /// The entry level.
    pub level: Level,
    /// The phase current when the entry was written.
    pub phase: Phase,
    /// The message.
    pub message: String,
    /// Optional structured data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Milliseconds since the log was opened.
    pub elapsed_ms: u64,
    /// Set on entries that open or close a phase.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mark: Option<PhaseMark>,
}

/// How startup ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// Every phase ran.
    Completed,
    /// Startup was aborted.
    Failed,
}

/// The shutdown banner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShutdownBanner {
    /// When startup ended.
    pub time: String,
    /// How startup ended.
    pub outcome: Outcome,
    /// Milliseconds from opening the log to the end of startup.
    pub duration_ms: u64,
    /// The phase that was running when startup failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_phase: Option<Phase>,
    /// The failure message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Read a startup log back. Lines that are not valid records are skipped.
///
/// # Errors
///
/// Return an error if the file cannot be read.
pub fn parse_log(path: impl AsRef<Path>) -> Result<Vec<StartupRecord>, Error> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|err| {
        Error::from_io_error(err).with_context("path", path.display())
    })?;

    Ok(content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect())
}

/// Snapshot `vars`, replacing the value of every variable whose name looks sensitive.
///
/// # Examples
///
/// ```
/// use duolog::bootstrap::redacted_env;
///
/// let env = redacted_env([("HOME", "/root"), ("DB_PASSWORD", "hunter2")]);
/// assert_eq!(env["HOME"], "/root");
/// assert_eq!(env["DB_PASSWORD"], "[REDACTED]");
/// ```
pub fn redacted_env<I, K, V>(vars: I) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    vars.into_iter()
        .map(|(key, value)| {
            let key = key.into();
            let upper = key.to_ascii_uppercase();
            let value = if SENSITIVE_MARKERS.iter().any(|m| upper.contains(m)) {
                REDACTED.to_string()
            } else {
                value.into()
            };
            (key, value)
        })
        .collect()
}
