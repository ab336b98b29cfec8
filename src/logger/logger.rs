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
use std::fmt;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::RwLock;
use std::sync::Weak;

use super::context::Shared;
use super::options::DEFAULT_NAMESPACE;
use crate::Context;
use crate::Level;
use crate::LogContext;
use crate::LogEntry;
use crate::LoggerConfig;
use crate::LoggerOptions;
use crate::backend::Backend;
use crate::backend::BackendKind;
use crate::backend::Bindings;
use crate::backend::scope_bindings;
use crate::console;
use crate::rolling::RotationConfig;
use crate::transport;
use crate::transport::Transport;
use crate::transport::TransportList;

/// A namespaced logger.
///
/// Every call is routed to the structured backend, to each transport and, for levels other than
/// debug, to the console as `HH:MM:SS [namespace] message`.
///
/// Loggers are cheap handles: clones refer to the same logger and compare equal.
///
/// # Examples
///
/// ```
/// use duolog::Context;
/// use duolog::LogContext;
///
/// let ctx = LogContext::builder().build();
/// let log = ctx.get_logger("http.router");
/// log.info("listening");
/// log.warn_with("slow request", Context::new().with("ms", 950));
/// ```
#[derive(Clone)]
pub struct Logger {
    inner: Arc<Inner>,
}

pub(super) struct Inner {
    namespace: String,
    backend: Backend,
    state: RwLock<State>,
    children: Mutex<BTreeMap<String, Logger>>,
    shared: Arc<Shared>,
}

#[derive(Debug, Clone)]
struct State {
    requested: Option<bool>,
    enabled: bool,
    min_level: Level,
    disable_console: bool,
    rotation: RotationConfig,
    transports: TransportList,
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("Logger")
            .field("namespace", &self.inner.namespace)
            .field("backend", &self.inner.backend.kind())
            .field("enabled", &state.enabled)
            .field("min_level", &state.min_level)
            .field("transports", &state.transports.len())
            .finish()
    }
}

impl PartialEq for Logger {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Logger {}

impl Logger {
    /// Construct a logger outside the registry.
    ///
    /// The logger is bound to `context`'s backend provider, console and clock, but
    /// [`LogContext::get_logger`] never returns it.
    pub fn new(context: &LogContext, options: LoggerOptions) -> Logger {
        let logger = Logger::with_shared(context.shared().clone(), options);
        context.shared().track(&logger);
        logger
    }

    pub(super) fn with_shared(shared: Arc<Shared>, options: LoggerOptions) -> Logger {
        let LoggerOptions {
            namespace,
            min_level,
            enabled,
            disable_console,
            rotation,
            transports,
            bindings,
        } = options;

        let namespace = namespace.unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());
        let environment = shared.environment();
        let backend = shared
            .provider()
            .bind(environment.is_production(), scope_bindings(&namespace, bindings));
        let transports = TransportList::from(transports);

        let state = State {
            requested: enabled,
            enabled: shared.decide_enabled(enabled, &backend, &transports),
            min_level: min_level.unwrap_or_else(|| environment.min_level()),
            disable_console,
            rotation,
            transports,
        };
        Logger::from_parts(namespace, backend, state, shared)
    }

    fn from_parts(namespace: String, backend: Backend, state: State, shared: Arc<Shared>) -> Self {
        Logger {
            inner: Arc::new(Inner {
                namespace,
                backend,
                state: RwLock::new(state),
                children: Mutex::new(BTreeMap::new()),
                shared,
            }),
        }
    }

    pub(super) fn downgrade(&self) -> Weak<Inner> {
        Arc::downgrade(&self.inner)
    }

    pub(super) fn upgrade(inner: &Weak<Inner>) -> Option<Logger> {
        inner.upgrade().map(|inner| Logger { inner })
    }

    fn state(&self) -> State {
        self.inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The full dotted namespace.
    pub fn namespace(&self) -> &str {
        &self.inner.namespace
    }

    /// Whether non-error calls are emitted.
    pub fn is_enabled(&self) -> bool {
        self.state().enabled
    }

    /// The minimum level applied when no structured backend is active.
    pub fn min_level(&self) -> Level {
        self.state().min_level
    }

    /// Whether console lines are suppressed.
    pub fn is_console_disabled(&self) -> bool {
        self.state().disable_console
    }

    /// The rotation settings handed to file outputs.
    pub fn rotation(&self) -> RotationConfig {
        self.state().rotation
    }

    /// The flavour of backend this logger was bound to.
    pub fn backend_kind(&self) -> BackendKind {
        self.inner.backend.kind()
    }

    /// The current transport list.
    pub fn transports(&self) -> TransportList {
        self.state().transports
    }

    /// Log a debug message. Debug messages never reach the console.
    pub fn debug(&self, message: impl fmt::Display) {
        self.log(Level::Debug, message, None)
    }

    /// Log a debug message with context.
    pub fn debug_with(&self, message: impl fmt::Display, context: Context) {
        self.log(Level::Debug, message, Some(context))
    }

    /// Log an info message.
    pub fn info(&self, message: impl fmt::Display) {
        self.log(Level::Info, message, None)
    }

    /// Log an info message with context.
    pub fn info_with(&self, message: impl fmt::Display, context: Context) {
        self.log(Level::Info, message, Some(context))
    }

    /// Log a warning.
    pub fn warn(&self, message: impl fmt::Display) {
        self.log(Level::Warn, message, None)
    }

    /// Log a warning with context.
    pub fn warn_with(&self, message: impl fmt::Display, context: Context) {
        self.log(Level::Warn, message, Some(context))
    }

    /// Log an error. Error calls bypass the enabled flag and the minimum level.
    pub fn error(&self, message: impl fmt::Display) {
        self.log(Level::Error, message, None)
    }

    /// Log an error with context.
    pub fn error_with(&self, message: impl fmt::Display, context: Context) {
        self.log(Level::Error, message, Some(context))
    }

    /// Emit one call through the pipeline: gate, structured backend, transports, console.
    pub fn log(&self, level: Level, message: impl fmt::Display, context: Option<Context>) {
        let state = self.state();
        if level != Level::Error {
            if !state.enabled {
                return;
            }
            if !self.inner.backend.is_structured() && level < state.min_level {
                return;
            }
        }

        let message = message.to_string();
        let entry = LogEntry::from_parts(message.as_str(), context);
        let shared = &self.inner.shared;

        self.inner.backend.log(level, &entry);

        transport::fan_out(
            &state.transports,
            shared.trap(),
            level,
            &self.inner.namespace,
            &message,
            &entry,
        );

        if level.requests_console() && !state.disable_console {
            let line = console::format_line(&shared.clock().now(), &self.inner.namespace, &message);
            shared.console().write_line(level, &line);
        }
    }

    /// The child logger `name`, created on first use.
    ///
    /// A new child inherits this logger's settings and shares its current transport list.
    pub fn child(&self, name: &str) -> Logger {
        self.child_with(name, Bindings::new())
    }

    /// The child logger `name`, created on first use with extra structured `bindings`.
    ///
    /// Bindings only apply when the child is created; later calls return the cached child.
    pub fn child_with(&self, name: &str, bindings: Bindings) -> Logger {
        let mut children = self
            .inner
            .children
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(child) = children.get(name) {
            return child.clone();
        }

        let namespace = format!("{}.{name}", self.inner.namespace);
        let backend = self.inner.backend.child(scope_bindings(name, bindings));
        let child = Logger::from_parts(
            namespace,
            backend,
            self.state(),
            self.inner.shared.clone(),
        );
        children.insert(name.to_string(), child.clone());
        child
    }

    /// The children created so far, ordered by name.
    pub fn children(&self) -> Vec<Logger> {
        self.inner
            .children
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    /// Apply a partial update to this logger and, recursively, to every child created so far.
    pub fn set_config(&self, config: &LoggerConfig) {
        {
            let mut state = self
                .inner
                .state
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(enabled) = config.enabled {
                state.requested = Some(enabled);
            }
            if let Some(level) = config.min_level {
                state.min_level = level;
            }
            if let Some(disable) = config.disable_console {
                state.disable_console = disable;
            }
            if let Some(rotation) = &config.rotation {
                state.rotation = rotation.clone();
            }
            if let Some(transports) = &config.transports {
                state.transports = transports.clone();
            }
            if config.touches_enabled() {
                state.enabled = self.inner.shared.decide_enabled(
                    state.requested,
                    &self.inner.backend,
                    &state.transports,
                );
            }
        }

        for child in self.children() {
            child.set_config(config);
        }
    }

    /// Append a transport to this logger and every child created so far.
    pub fn add_transport(&self, transport: impl Transport) {
        self.add_shared_transport(Arc::new(transport))
    }

    /// Append a transport that is also held elsewhere.
    pub fn add_shared_transport(&self, transport: Arc<dyn Transport>) {
        let mut transports = self.transports().to_vec();
        transports.push(transport);
        self.set_config(&LoggerConfig::new().transports(transports));
    }

    /// Flush the structured backend handle and the transports of this logger.
    ///
    /// Failures are reported to the context's trap.
    pub fn flush(&self) {
        let shared = &self.inner.shared;
        if let Err(err) = self.inner.backend.flush() {
            shared.trap().trap(&err.with_context("namespace", &self.inner.namespace));
        }
        for transport in self.transports().iter() {
            if let Err(err) = transport.flush() {
                shared.trap().trap(&err.with_context("namespace", &self.inner.namespace));
            }
        }
    }
}
