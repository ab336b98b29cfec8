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

//! Structured backends: the machine-facing half of every log call.

use std::fmt;
use std::sync::Arc;

use crate::Error;
use crate::Level;
use crate::LogEntry;
use crate::entry::Fields;

#[cfg(feature = "structured")]
mod json;
mod provider;
mod redact;
#[cfg(feature = "remote")]
mod remote;
#[cfg(feature = "structured")]
mod target;

#[cfg(feature = "structured")]
pub use self::json::JsonBackend;
#[cfg(feature = "structured")]
pub use self::json::JsonBackendBuilder;
pub use self::provider::BackendProvider;
pub use self::redact::DEFAULT_REDACTIONS;
pub use self::redact::Redactor;
#[cfg(feature = "structured")]
pub use self::target::MultiTarget;
#[cfg(feature = "structured")]
pub use self::target::Target;
#[cfg(feature = "structured")]
pub use self::target::TargetSpec;

/// Fields bound into a backend scope and inherited by its descendants.
pub type Bindings = Fields;

/// A structured logging capability.
///
/// The logging core never looks inside a backend; it hands over entries and asks for scoped
/// children.
pub trait StructuredBackend: fmt::Debug + Send + Sync + 'static {
    /// Record one entry. Implementations apply their own level threshold.
    fn log(&self, level: Level, entry: &LogEntry);

    /// Derive a backend whose records carry `bindings` in addition to this backend's own.
    fn child(&self, bindings: Bindings) -> Arc<dyn StructuredBackend>;

    /// Flush buffered records.
    ///
    /// Default to a no-op.
    fn flush(&self) -> Result<(), Error> {
        Ok(())
    }
}

/// The flavour of [`Backend`] a logger was bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// A real structured backend.
    Structured,
    /// The non-production placeholder; console lines come from the logger's console stage.
    Console,
    /// The production placeholder used when there is nowhere to send records.
    Noop,
}

/// The backend handle owned by each logger, selected once at construction.
#[derive(Debug, Clone)]
pub enum Backend {
    /// Records go to a structured backend.
    Structured(Arc<dyn StructuredBackend>),
    /// No structured output; kept level-API compatible.
    Console,
    /// No output at all.
    Noop,
}

impl Backend {
    /// Which flavour this backend is.
    pub fn kind(&self) -> BackendKind {
        match self {
            Backend::Structured(_) => BackendKind::Structured,
            Backend::Console => BackendKind::Console,
            Backend::Noop => BackendKind::Noop,
        }
    }

    /// Whether records reach a real structured backend.
    pub fn is_structured(&self) -> bool {
        matches!(self, Backend::Structured(_))
    }

    /// Record an entry at `level`.
    pub fn log(&self, level: Level, entry: &LogEntry) {
        match self {
            Backend::Structured(backend) => backend.log(level, entry),
            Backend::Console | Backend::Noop => {}
        }
    }

    /// Record a debug entry.
    pub fn debug(&self, entry: &LogEntry) {
        self.log(Level::Debug, entry)
    }

    /// Record an info entry.
    pub fn info(&self, entry: &LogEntry) {
        self.log(Level::Info, entry)
    }

    /// Record a warn entry.
    pub fn warn(&self, entry: &LogEntry) {
        self.log(Level::Warn, entry)
    }

    /// Record an error entry.
    pub fn error(&self, entry: &LogEntry) {
        self.log(Level::Error, entry)
    }

    /// Derive a scoped backend of the same flavour.
    pub fn child(&self, bindings: Bindings) -> Backend {
        match self {
            Backend::Structured(backend) => Backend::Structured(backend.child(bindings)),
            Backend::Console => Backend::Console,
            Backend::Noop => Backend::Noop,
        }
    }

    /// Flush the structured backend, if any.
    pub fn flush(&self) -> Result<(), Error> {
        match self {
            Backend::Structured(backend) => backend.flush(),
            Backend::Console | Backend::Noop => Ok(()),
        }
    }
}

/// Build the bindings a logger hands to its backend: `ns` first, explicit bindings override.
pub(crate) fn scope_bindings(ns: &str, bindings: Bindings) -> Bindings {
    let mut scoped = Bindings::new();
    scoped.insert("ns".to_string(), ns.into());
    scoped.extend(bindings);
    scoped
}
