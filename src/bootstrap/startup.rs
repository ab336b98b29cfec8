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
use std::io::Write;
use std::num::NonZeroUsize;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use jiff::Zoned;
use serde_json::Map;
use serde_json::Value;

use super::Banner;
use super::Diagnostics;
use super::Outcome;
use super::Phase;
use super::PhaseMark;
use super::ShutdownBanner;
use super::StartupEntry;
use super::StartupRecord;
use super::redacted_env;
use crate::Clock;
use crate::Error;
use crate::ErrorInfo;
use crate::Level;
use crate::Trap;
use crate::console;
use crate::console::ConsoleSink;
use crate::console::StdConsole;
use crate::rolling::RollingFileWriter;
use crate::rolling::RollingFileWriterBuilder;
use crate::trap::DefaultTrap;

const DEFAULT_PATH: &str = "logs/startup.log";
const DEFAULT_MAX_SIZE: usize = 1024 * 1024;
const DEFAULT_MAX_BACKUPS: usize = 3;

/// A best-effort startup log.
///
/// Every operation writes one JSON line to the log file and echoes non-debug entries to the
/// console as `HH:MM:SS [startup:phase] message`. File-system errors are reported to the trap
/// and never returned: startup logging must not abort startup.
///
/// # Examples
///
/// ```no_run
/// use duolog::Level;
/// use duolog::bootstrap::Phase;
/// use duolog::bootstrap::StartupLog;
///
/// let mut startup = StartupLog::builder("logs/startup.log").service("shop").build();
/// startup.start_phase(Phase::Config);
/// startup.log(Level::Info, "configuration loaded", None);
/// startup.complete_phase(Phase::Config);
/// startup.complete();
/// ```
#[derive(Debug)]
pub struct StartupLog {
    path: PathBuf,
    writer: Option<RollingFileWriter>,
    console: Arc<dyn ConsoleSink>,
    clock: Clock,
    trap: Arc<dyn Trap>,
    opened_at: Zoned,
    phase: Phase,
    phase_started_at: BTreeMap<Phase, Zoned>,
    diagnostics: Diagnostics,
    finished: bool,
}

impl StartupLog {
    /// Create a new [`StartupLogBuilder`] writing to `path`.
    pub fn builder(path: impl Into<PathBuf>) -> StartupLogBuilder {
        StartupLogBuilder::new(path)
    }

    /// The log file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The phase entries are currently tagged with.
    pub fn current_phase(&self) -> Phase {
        self.phase
    }

    /// A summary of everything written so far.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Whether [`complete`](Self::complete) or [`fail`](Self::fail) has been called.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Enter `phase`; later entries are tagged with it.
    pub fn start_phase(&mut self, phase: Phase) {
        let now = self.clock.now();
        self.phase = phase;
        self.phase_started_at.insert(phase, now.clone());
        let message = format!("{phase} phase started");
        self.write_entry(&now, Level::Info, message, None, Some(PhaseMark::Started));
    }

    /// Record a message in the current phase.
    pub fn log(&mut self, level: Level, message: impl Into<String>, data: Option<Value>) {
        let now = self.clock.now();
        self.write_entry(&now, level, message.into(), data, None);
    }

    /// Record an error in the current phase. The error is flattened into `data.err`.
    pub fn log_error(&mut self, err: &dyn std::error::Error, data: Option<Value>) {
        let now = self.clock.now();
        let data = error_data(err, data);
        self.write_entry(&now, Level::Error, err.to_string(), Some(data), None);
    }

    /// Mark `phase` as completed, recording how long it took.
    pub fn complete_phase(&mut self, phase: Phase) {
        let now = self.clock.now();
        let started = self
            .phase_started_at
            .get(&phase)
            .unwrap_or(&self.opened_at)
            .clone();
        let duration_ms = millis_between(&started, &now);

        let mut data = Map::new();
        data.insert("duration_ms".to_string(), duration_ms.into());

        let entry = StartupEntry {
            time: now.timestamp().to_string(),
            level: Level::Info,
            phase,
            message: format!("{phase} phase completed"),
            data: Some(Value::Object(data)),
            elapsed_ms: millis_between(&self.opened_at, &now),
            mark: Some(PhaseMark::Completed),
        };
        self.echo(&now, entry.level, phase, &entry.message);
        self.write_record(StartupRecord::Entry(entry));
    }

    /// End startup successfully and write the shutdown banner.
    pub fn complete(&mut self) {
        let now = self.clock.now();
        self.write_entry(&now, Level::Info, "startup complete".to_string(), None, None);
        self.finish(&now, Outcome::Completed, None);
    }

    /// End startup with a failure in the current phase and write the shutdown banner.
    pub fn fail(&mut self, err: &dyn std::error::Error) {
        self.log_error(err, None);
        let now = self.clock.now();
        self.finish(&now, Outcome::Failed, Some(err.to_string()));
    }

    fn finish(&mut self, now: &Zoned, outcome: Outcome, error: Option<String>) {
        if self.finished {
            return;
        }
        self.finished = true;

        let banner = ShutdownBanner {
            time: now.timestamp().to_string(),
            outcome,
            duration_ms: millis_between(&self.opened_at, now),
            failed_phase: match outcome {
                Outcome::Failed => Some(self.phase),
                Outcome::Completed => None,
            },
            error,
        };
        self.write_record(StartupRecord::Shutdown(banner));
        self.flush();
    }

    fn write_entry(
        &mut self,
        now: &Zoned,
        level: Level,
        message: String,
        data: Option<Value>,
        mark: Option<PhaseMark>,
    ) {
        self.echo(now, level, self.phase, &message);
        let entry = StartupEntry {
            time: now.timestamp().to_string(),
            level,
            phase: self.phase,
            message,
            data,
            elapsed_ms: millis_between(&self.opened_at, now),
            mark,
        };
        self.write_record(StartupRecord::Entry(entry));
    }

    fn echo(&self, now: &Zoned, level: Level, phase: Phase, message: &str) {
        if level.requests_console() {
            let line = console::format_line(now, &format!("startup:{phase}"), message);
            self.console.write_line(level, &line);
        }
    }

    fn write_record(&mut self, record: StartupRecord) {
        self.diagnostics.observe(&record);

        let Some(writer) = self.writer.as_mut() else {
            return;
        };
        let result = serde_json::to_vec(&record)
            .map_err(Error::from_json_error)
            .and_then(|mut bytes| {
                bytes.push(b'\n');
                writer.write_all(&bytes).map_err(Error::from_io_error)
            });
        if let Err(err) = result {
            let err = err.with_context("path", self.path.display());
            self.trap.trap(&Error::new("failed to write startup log").with_source(err));
        }
    }

    /// Flush the log file.
    pub fn flush(&mut self) {
        if let Some(writer) = self.writer.as_mut() {
            if let Err(err) = writer.flush() {
                let err = Error::new("failed to flush startup log").with_source(err);
                self.trap.trap(&err);
            }
        }
    }
}

fn error_data(err: &dyn std::error::Error, data: Option<Value>) -> Value {
    let info = ErrorInfo::from_dyn("Error", err);
    let mut map = Map::new();
    map.insert(
        "err".to_string(),
        serde_json::to_value(info).unwrap_or(Value::Null),
    );
    match data {
        Some(Value::Object(fields)) => map.extend(fields),
        Some(other) => {
            map.insert("data".to_string(), other);
        }
        None => {}
    }
    Value::Object(map)
}

fn millis_between(start: &Zoned, end: &Zoned) -> u64 {
    let elapsed = end.timestamp().duration_since(start.timestamp());
    u64::try_from(elapsed.as_millis()).unwrap_or(0)
}

/// A builder for configuring [`StartupLog`].
#[must_use = "call `build` to open the startup log"]
#[derive(Debug)]
pub struct StartupLogBuilder {
    path: PathBuf,
    service: String,
    max_size: Option<NonZeroUsize>,
    max_backups: usize,
    console: Arc<dyn ConsoleSink>,
    clock: Clock,
    trap: Arc<dyn Trap>,
    env: Option<BTreeMap<String, String>>,
}

impl Default for StartupLogBuilder {
    fn default() -> Self {
        StartupLogBuilder::new(DEFAULT_PATH)
    }
}

impl StartupLogBuilder {
    /// Create a builder writing to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            service: "app".to_string(),
            max_size: NonZeroUsize::new(DEFAULT_MAX_SIZE),
            max_backups: DEFAULT_MAX_BACKUPS,
            console: Arc::new(StdConsole::default()),
            clock: Clock::default(),
            trap: Arc::new(DefaultTrap::default()),
            env: None,
        }
    }

    /// Set the service name written in the startup banner.
    pub fn service(mut self, service: impl Into<String>) -> Self {
        self.service = service.into();
        self
    }

    /// Set the size at which the log file is rotated.
    ///
    /// Default to 1 MiB.
    pub fn max_file_size(mut self, n: NonZeroUsize) -> Self {
        self.max_size = Some(n);
        self
    }

    /// Set how many rotated files are kept.
    ///
    /// Default to 3.
    pub fn max_backups(mut self, n: usize) -> Self {
        self.max_backups = n;
        self
    }

    /// Set the console sink for echoed entries.
    pub fn console(mut self, console: impl ConsoleSink) -> Self {
        self.console = Arc::new(console);
        self
    }

    /// Set the clock.
    pub fn clock(mut self, clock: impl Into<Clock>) -> Self {
        self.clock = clock.into();
        self
    }

    /// Set the trap receiving file-system errors.
    pub fn trap(mut self, trap: impl Trap) -> Self {
        self.trap = Arc::new(trap);
        self
    }

    /// Use `vars` instead of the process environment for the startup banner.
    pub fn env_vars<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env = Some(redacted_env(vars));
        self
    }

    /// Open the log and write the startup banner.
    ///
    /// An unopenable file is reported to the trap; the returned log then only echoes to the
    /// console.
    pub fn build(self) -> StartupLog {
        let Self {
            path,
            service,
            max_size,
            max_backups,
            console,
            clock,
            trap,
            env,
        } = self;

        let mut builder = RollingFileWriterBuilder::new(&path)
            .max_backups(max_backups)
            .trap(trap.clone());
        if let Some(n) = max_size {
            builder = builder.max_file_size(n);
        }
        let writer = match builder.build() {
            Ok(writer) => Some(writer),
            Err(err) => {
                trap.trap(&Error::new("failed to open startup log").with_source(err));
                None
            }
        };

        let opened_at = clock.now();
        let banner = Banner {
            time: opened_at.timestamp().to_string(),
            pid: std::process::id(),
            hostname: crate::sys::hostname(),
            service,
            env: env.unwrap_or_else(|| redacted_env(crate::env::process_vars())),
        };

        let mut log = StartupLog {
            path,
            writer,
            console,
            clock,
            trap,
            opened_at,
            phase: Phase::Init,
            phase_started_at: BTreeMap::new(),
            diagnostics: Diagnostics::default(),
            finished: false,
        };
        log.write_record(StartupRecord::Startup(banner));
        log
    }
}
