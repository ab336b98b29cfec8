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

//! A bridge to forward records from the `log` crate to duolog loggers.

use crate::Error;
use crate::Level;
use crate::LogContext;
use crate::Logger;
use crate::logger::default_context;

/// Targets of the HTTP stack behind remote shipping. Forwarding their records would feed every
/// shipped batch back into the next one.
#[cfg(feature = "remote")]
const SHIPPING_TARGETS: &[&str] = &[
    "reqwest",
    "hyper",
    "hyper_util",
    "h2",
    "rustls",
    "tokio",
    "want",
];

/// A [`log::Log`] implementation routing each record to the logger named after its target.
///
/// The target `my_crate::http` is routed to `get_logger("my_crate.http")`. `Trace` and `Debug`
/// records become debug calls.
///
/// Records emitted while duolog itself is handling a record, or from its output worker threads,
/// are dropped. With the `remote` feature, records from the HTTP stack used for shipping are
/// dropped as well.
#[derive(Debug)]
pub struct LogBridge {
    context: LogContext,
}

impl LogBridge {
    /// Create a bridge owning `context`.
    pub fn new(context: LogContext) -> Self {
        Self { context }
    }

    /// The context records are routed to.
    pub fn context(&self) -> &LogContext {
        &self.context
    }

    /// Forward one record to `context`.
    fn forward(context: &LogContext, record: &log::Record) {
        let _internal = crate::sys::enter_internal();
        logger_for(context, record.target()).log(
            Level::from(record.level()),
            record.args(),
            None,
        );
    }
}

fn logger_for(context: &LogContext, target: &str) -> Logger {
    context.get_logger(&target.replace("::", "."))
}

fn accepts(metadata: &log::Metadata) -> bool {
    !crate::sys::is_internal() && !is_shipping_target(metadata.target())
}

#[cfg(feature = "remote")]
fn is_shipping_target(target: &str) -> bool {
    SHIPPING_TARGETS.iter().any(|prefix| {
        target
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
    })
}

#[cfg(not(feature = "remote"))]
fn is_shipping_target(_: &str) -> bool {
    false
}

impl log::Log for LogBridge {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        accepts(metadata)
    }

    fn log(&self, record: &log::Record) {
        if accepts(record.metadata()) {
            LogBridge::forward(&self.context, record)
        }
    }

    fn flush(&self) {
        self.context.flush()
    }
}

struct DefaultContextBridge(());

impl log::Log for DefaultContextBridge {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        accepts(metadata)
    }

    fn log(&self, record: &log::Record) {
        if accepts(record.metadata()) {
            // The default context may be created right here; records logged while building it
            // must not come back for it.
            let _internal = crate::sys::enter_internal();
            LogBridge::forward(default_context(), record)
        }
    }

    fn flush(&self) {
        default_context().flush()
    }
}

/// Set up the `log` crate global logger to forward into `context`.
///
/// This function sets the global maximum log level to `Trace`. To override this, call
/// [`log::set_max_level`] after this function.
///
/// # Errors
///
/// Return an error if the `log` crate global logger has already been set.
pub fn setup(context: LogContext) -> Result<(), Error> {
    log::set_boxed_logger(Box::new(LogBridge::new(context)))
        .map_err(|err| Error::new("failed to set up log crate logger").with_source(err))?;
    log::set_max_level(log::LevelFilter::Trace);
    Ok(())
}

/// Set up the `log` crate global logger to forward into the process default context.
///
/// # Errors
///
/// Return an error if the `log` crate global logger has already been set.
///
/// # Examples
///
/// ```
/// if let Err(err) = duolog::bridge::setup_default() {
///     eprintln!("failed to set up log crate: {err}");
/// }
/// ```
pub fn setup_default() -> Result<(), Error> {
    static LOGGER: DefaultContextBridge = DefaultContextBridge(());
    log::set_logger(&LOGGER)
        .map_err(|err| Error::new("failed to set up log crate logger").with_source(err))?;
    log::set_max_level(log::LevelFilter::Trace);
    Ok(())
}
