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

//! The human-facing half of every log call.

use std::fmt;
use std::io::Write;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;

use jiff::Zoned;

use crate::Level;

/// Format one console line: `HH:MM:SS [namespace] message`.
///
/// Console lines carry no metadata and no structured fields.
///
/// # Examples
///
/// ```
/// use duolog::console::format_line;
///
/// let time = "2024-08-11T22:44:57+00:00[UTC]".parse().unwrap();
/// assert_eq!(format_line(&time, "http.router", "ready"), "22:44:57 [http.router] ready");
/// ```
pub fn format_line(time: &Zoned, namespace: &str, message: &str) -> String {
    format!("{} [{namespace}] {message}", time.strftime("%H:%M:%S"))
}

/// Where console lines are written.
pub trait ConsoleSink: fmt::Debug + Send + Sync + 'static {
    /// Write one formatted line emitted at `level`.
    fn write_line(&self, level: Level, line: &str);

    /// Flush buffered lines.
    ///
    /// Default to a no-op.
    fn flush(&self) {}
}

/// The process console: info lines on stdout, warn and error lines on stderr.
#[derive(Default, Debug)]
#[non_exhaustive]
pub struct StdConsole {}

impl ConsoleSink for StdConsole {
    fn write_line(&self, level: Level, line: &str) {
        // A closed console is not worth a diagnostic.
        let _ = match level {
            Level::Warn | Level::Error => writeln!(std::io::stderr(), "{line}"),
            Level::Debug | Level::Info => writeln!(std::io::stdout(), "{line}"),
        };
    }

    fn flush(&self) {
        let _ = std::io::stdout().flush();
        let _ = std::io::stderr().flush();
    }
}

/// A console that keeps every line in memory, for tests and embedding.
///
/// Clones share the same buffer.
///
/// # Examples
///
/// ```
/// use duolog::Level;
/// use duolog::console::Capture;
/// use duolog::console::ConsoleSink;
///
/// let capture = Capture::default();
/// capture.write_line(Level::Warn, "12:00:00 [db] slow query");
/// assert_eq!(capture.lines(), vec!["12:00:00 [db] slow query".to_string()]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Capture {
    records: Arc<Mutex<Vec<(Level, String)>>>,
}

impl Capture {
    /// The captured lines, oldest first.
    pub fn lines(&self) -> Vec<String> {
        self.records()
            .into_iter()
            .map(|(_, line)| line)
            .collect()
    }

    /// The captured lines with their levels, oldest first.
    pub fn records(&self) -> Vec<(Level, String)> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Forget every captured line.
    pub fn clear(&self) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl ConsoleSink for Capture {
    fn write_line(&self, level: Level, line: &str) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((level, line.to_string()));
    }
}
