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

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::OnceLock;
use std::sync::PoisonError;
use std::sync::Weak;

use super::logger::Inner;
use super::options::DEFAULT_NAMESPACE;
use crate::Clock;
use crate::Environment;
use crate::Logger;
use crate::LoggerOptions;
use crate::Trap;
use crate::backend::Backend;
use crate::backend::BackendProvider;
use crate::backend::StructuredBackend;
use crate::console::ConsoleSink;
use crate::console::StdConsole;
use crate::transport::Transport;
use crate::trap::DefaultTrap;

/// State shared by every logger of one [`LogContext`].
#[derive(Debug)]
pub(crate) struct Shared {
    environment: Environment,
    provider: BackendProvider,
    console: Arc<dyn ConsoleSink>,
    clock: Clock,
    trap: Arc<dyn Trap>,
    standalone: Mutex<Vec<Weak<Inner>>>,
}

impl Shared {
    pub(crate) fn environment(&self) -> &Environment {
        &self.environment
    }

    pub(crate) fn provider(&self) -> &BackendProvider {
        &self.provider
    }

    pub(crate) fn console(&self) -> &dyn ConsoleSink {
        self.console.as_ref()
    }

    pub(crate) fn clock(&self) -> &Clock {
        &self.clock
    }

    pub(crate) fn trap(&self) -> &dyn Trap {
        self.trap.as_ref()
    }

    /// The enable rule: stripped builds and explicit opt-outs are off; production without any
    /// output besides the console is off.
    pub(crate) fn decide_enabled(
        &self,
        requested: Option<bool>,
        backend: &Backend,
        transports: &[Arc<dyn Transport>],
    ) -> bool {
        if self.environment.is_stripped() {
            return false;
        }
        if requested == Some(false) {
            return false;
        }
        !(self.environment.is_production() && !backend.is_structured() && transports.is_empty())
    }

    pub(crate) fn track(&self, logger: &Logger) {
        let mut standalone = self
            .standalone
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        standalone.retain(|inner| inner.strong_count() > 0);
        standalone.push(logger.downgrade());
    }

    fn standalone(&self) -> Vec<Logger> {
        self.standalone
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter_map(Logger::upgrade)
            .collect()
    }
}

/// The logging context of an application: environment, backend provider, console and the
/// registry of named loggers.
///
/// Construct one at startup, hand it to the code that needs loggers, and call
/// [`LogContext::shutdown`] before exiting so that queued records are written.
///
/// # Examples
///
/// ```
/// use duolog::LogContext;
///
/// let ctx = LogContext::builder().build();
/// let db = ctx.get_logger("db");
/// assert_eq!(db, ctx.get_logger("db"));
/// assert_eq!(db.child("pool"), ctx.get_logger("db.pool"));
/// ctx.shutdown();
/// ```
#[derive(Debug)]
pub struct LogContext {
    shared: Arc<Shared>,
    registry: Mutex<HashMap<String, Logger>>,
}

impl LogContext {
    /// Create a new [`LogContextBuilder`].
    pub fn builder() -> LogContextBuilder {
        LogContextBuilder::default()
    }

    /// A context configured from the process environment.
    pub fn from_env() -> LogContext {
        LogContext::builder()
            .environment(Environment::from_env())
            .build()
    }

    pub(crate) fn shared(&self) -> &Arc<Shared> {
        &self.shared
    }

    /// The captured environment.
    pub fn environment(&self) -> &Environment {
        &self.shared.environment
    }

    /// The backend provider.
    pub fn provider(&self) -> &BackendProvider {
        &self.shared.provider
    }

    /// The canonical logger for a dotted `path`.
    ///
    /// Ancestors are materialized and cached on the way, so `get_logger("a").child("b")` and
    /// `get_logger("a.b")` are the same logger. Empty segments are ignored; an empty path names
    /// the `"Anonymous"` logger.
    pub fn get_logger(&self, path: &str) -> Logger {
        let mut segments = path.split('.').filter(|s| !s.is_empty());
        let root_name = segments.next().unwrap_or(DEFAULT_NAMESPACE);

        let mut registry = self
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let mut logger = registry
            .entry(root_name.to_string())
            .or_insert_with(|| {
                Logger::with_shared(
                    self.shared.clone(),
                    LoggerOptions::new().namespace(root_name),
                )
            })
            .clone();

        let mut prefix = root_name.to_string();
        for segment in segments {
            logger = logger.child(segment);
            prefix.push('.');
            prefix.push_str(segment);
            registry
                .entry(prefix.clone())
                .or_insert_with(|| logger.clone());
        }
        logger
    }

    /// Every logger reachable from this context: registered loggers, standalone loggers and
    /// all their children.
    pub fn loggers(&self) -> Vec<Logger> {
        let mut pending = self
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect::<Vec<_>>();
        pending.extend(self.shared.standalone());

        let mut seen = vec![];
        while let Some(logger) = pending.pop() {
            if seen.contains(&logger) {
                continue;
            }
            pending.extend(logger.children());
            seen.push(logger);
        }
        seen
    }

    /// Flush the structured backend, every distinct transport and the console.
    ///
    /// Failures are reported to the trap.
    pub fn flush(&self) {
        let trap = self.shared.trap();
        if let Err(err) = self.shared.provider.flush() {
            trap.trap(&err);
        }

        let mut flushed = HashSet::new();
        for logger in self.loggers() {
            for transport in logger.transports().iter() {
                let addr = Arc::as_ptr(transport) as *const () as usize;
                if !flushed.insert(addr) {
                    continue;
                }
                if let Err(err) = transport.flush() {
                    trap.trap(&err.with_context("transport", format!("{transport:?}")));
                }
            }
        }

        self.shared.console.flush();
    }

    /// Flush everything, then stop the output workers, waiting for queued records.
    ///
    /// Loggers still held elsewhere keep working with their console and transports; records
    /// sent to stopped workers are reported to the trap.
    pub fn shutdown(self) {
        self.flush();
        self.shared.provider.release_workers();
    }
}

/// A builder for configuring [`LogContext`].
#[must_use = "call `build` to construct the context"]
#[derive(Debug)]
pub struct LogContextBuilder {
    environment: Environment,
    provider: Option<BackendProvider>,
    console: Arc<dyn ConsoleSink>,
    clock: Clock,
    trap: Arc<dyn Trap>,
}

impl Default for LogContextBuilder {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            provider: None,
            console: Arc::new(StdConsole::default()),
            clock: Clock::default(),
            trap: Arc::new(DefaultTrap::default()),
        }
    }
}

impl LogContextBuilder {
    /// Set the environment.
    ///
    /// Default to [`Environment::default`]; use [`LogContext::from_env`] to read the process
    /// environment.
    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Set the backend provider.
    ///
    /// Default to [`BackendProvider::detect`] over the environment.
    pub fn provider(mut self, provider: BackendProvider) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Use `backend` as the root structured backend.
    pub fn backend(self, backend: impl StructuredBackend) -> Self {
        self.provider(BackendProvider::with_backend(backend))
    }

    /// Run without any structured backend.
    pub fn without_backend(self) -> Self {
        self.provider(BackendProvider::unavailable())
    }

    /// Set the console sink.
    ///
    /// Default to [`StdConsole`].
    pub fn console(mut self, console: impl ConsoleSink) -> Self {
        self.console = Arc::new(console);
        self
    }

    /// Set the clock used for console timestamps.
    pub fn clock(mut self, clock: impl Into<Clock>) -> Self {
        self.clock = clock.into();
        self
    }

    /// Set the trap receiving swallowed errors.
    ///
    /// Default to [`DefaultTrap`].
    pub fn trap(mut self, trap: impl Trap) -> Self {
        self.trap = Arc::new(trap);
        self
    }

    /// Build the context, detecting the structured backend if no provider was given.
    pub fn build(self) -> LogContext {
        let Self {
            environment,
            provider,
            console,
            clock,
            trap,
        } = self;

        let provider =
            provider.unwrap_or_else(|| BackendProvider::detect(&environment, trap.clone()));
        LogContext {
            shared: Arc::new(Shared {
                environment,
                provider,
                console,
                clock,
                trap,
                standalone: Mutex::new(vec![]),
            }),
            registry: Mutex::new(HashMap::new()),
        }
    }
}

static DEFAULT_CONTEXT: OnceLock<LogContext> = OnceLock::new();

/// Install the process default context.
///
/// # Errors
///
/// Return the given context back if a default context has already been installed or created.
pub fn init(context: LogContext) -> Result<(), LogContext> {
    DEFAULT_CONTEXT.set(context)
}

/// The process default context, created from the process environment on first use.
pub fn default_context() -> &'static LogContext {
    DEFAULT_CONTEXT.get_or_init(LogContext::from_env)
}

/// The canonical logger for `path` in the process default context.
pub fn get_logger(path: &str) -> Logger {
    default_context().get_logger(path)
}

/// Flush the process default context, if it exists.
///
/// File and remote records are handed to their workers, which may not have written them when
/// this returns. Call [`shutdown`] before the process exits to wait for them.
pub fn flush() {
    if let Some(context) = DEFAULT_CONTEXT.get() {
        context.flush();
    }
}

/// Flush the process default context and stop its output workers, waiting for queued records.
///
/// The default context lives for the whole process and cannot be consumed by
/// [`LogContext::shutdown`]; this is its counterpart. Records logged afterwards still reach the
/// console and transports, but no longer the file or remote targets.
pub fn shutdown() {
    if let Some(context) = DEFAULT_CONTEXT.get() {
        context.flush();
        context.provider().release_workers();
    }
}
