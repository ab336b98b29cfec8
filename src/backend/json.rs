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

use std::sync::Arc;

use jiff::Timestamp;
use serde_json::Value;

use super::Bindings;
use super::StructuredBackend;
use super::redact::Redactor;
use super::target::MultiTarget;
use super::target::Target;
use crate::Error;
use crate::Level;
use crate::LogEntry;
use crate::Trap;
use crate::entry::Fields;
use crate::trap::DefaultTrap;

/// The built-in structured backend, writing one JSON object per line.
///
/// Output format:
///
/// ```json
/// {"hostname":"web-1","level":"info","msg":"request handled","ns":"http.router","pid":4242,"route":"/cart","service":"shop","time":"2024-08-11T14:44:57.172051Z"}
/// {"err":{"message":"timeout","name":"Error","stack":"Error: timeout"},"hostname":"web-1","level":"error","msg":"query failed","ns":"db","pid":4242,"service":"shop","time":"2024-08-11T14:44:57.172187Z"}
/// ```
///
/// Keys are written in lexicographic order. When keys collide, static metadata yields to scope
/// bindings, which yield to the call's context, which yields to `err`; `msg` and `level` always
/// win.
///
/// # Examples
///
/// ```
/// use duolog::Level;
/// use duolog::backend::JsonBackend;
///
/// let backend = JsonBackend::builder()
///     .service("shop")
///     .level(Level::Info)
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct JsonBackend {
    level: Level,
    ns: Option<String>,
    fields: Fields,
    redactor: Arc<Redactor>,
    output: Arc<MultiTarget>,
    trap: Arc<dyn Trap>,
}

impl JsonBackend {
    /// Create a new [`JsonBackendBuilder`].
    pub fn builder() -> JsonBackendBuilder {
        JsonBackendBuilder::default()
    }

    /// The level below which records are dropped.
    pub fn level(&self) -> Level {
        self.level
    }

    /// The composed namespace binding, if any.
    pub fn namespace(&self) -> Option<&str> {
        self.ns.as_deref()
    }

    /// Render `entry` as it would be written, without the trailing newline.
    pub fn render(&self, level: Level, entry: &LogEntry) -> Result<Vec<u8>, Error> {
        let mut line = Fields::new();
        line.insert("level".to_string(), level.name().into());
        line.insert("time".to_string(), Timestamp::now().to_string().into());
        line.extend(self.fields.clone());
        if let Some(ns) = &self.ns {
            line.insert("ns".to_string(), ns.as_str().into());
        }
        line.extend(entry.context.clone());
        if let Some(err) = &entry.err {
            let err = serde_json::to_value(err).map_err(Error::from_json_error)?;
            line.insert("err".to_string(), err);
        }
        line.insert("level".to_string(), level.name().into());
        line.insert("msg".to_string(), entry.message.as_str().into());

        self.redactor.redact_map(&mut line);
        serde_json::to_vec(&line).map_err(Error::from_json_error)
    }
}

impl StructuredBackend for JsonBackend {
    fn log(&self, level: Level, entry: &LogEntry) {
        if level < self.level {
            return;
        }

        let result = self.render(level, entry).and_then(|mut bytes| {
            bytes.push(b'\n');
            self.output.write_line(&bytes)
        });
        if let Err(err) = result {
            let err = Error::new("failed to write structured record").with_source(err);
            self.trap.trap(&err);
        }
    }

    fn child(&self, bindings: Bindings) -> Arc<dyn StructuredBackend> {
        let mut child = self.clone();
        for (key, value) in bindings {
            match (key.as_str(), value) {
                ("ns", Value::String(segment)) => {
                    child.ns = Some(match child.ns.take() {
                        Some(parent) => format!("{parent}.{segment}"),
                        None => segment,
                    });
                }
                (_, value) => {
                    child.fields.insert(key, value);
                }
            }
        }
        Arc::new(child)
    }

    fn flush(&self) -> Result<(), Error> {
        self.output.flush()
    }
}

/// A builder for configuring [`JsonBackend`].
#[derive(Debug)]
pub struct JsonBackendBuilder {
    level: Level,
    service: String,
    metadata: Fields,
    redactor: Redactor,
    targets: Vec<Target>,
    trap: Arc<dyn Trap>,
}

impl Default for JsonBackendBuilder {
    fn default() -> Self {
        Self {
            level: Level::Debug,
            service: "app".to_string(),
            metadata: Fields::new(),
            redactor: Redactor::with_defaults(Vec::<String>::new()),
            targets: vec![],
            trap: Arc::new(DefaultTrap::default()),
        }
    }
}

impl JsonBackendBuilder {
    /// Set the minimum level.
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Set the service name.
    pub fn service(mut self, service: impl Into<String>) -> Self {
        self.service = service.into();
        self
    }

    /// Add a static metadata field.
    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Replace the redactor.
    pub fn redactor(mut self, redactor: Redactor) -> Self {
        self.redactor = redactor;
        self
    }

    /// Append an output target. Without any target the backend writes to stdout.
    pub fn target(mut self, target: Target) -> Self {
        self.targets.push(target);
        self
    }

    /// Set the trap receiving write failures.
    pub fn trap(mut self, trap: Arc<dyn Trap>) -> Self {
        self.trap = trap;
        self
    }

    /// Build the root [`JsonBackend`] with process id and hostname metadata.
    pub fn build(mut self) -> JsonBackend {
        if self.targets.is_empty() {
            self.targets.push(Target::Stdout);
        }
        let targets = std::mem::take(&mut self.targets);
        self.build_with_output(MultiTarget::new(targets))
    }

    /// Build the root [`JsonBackend`] writing to an already opened `output`. Targets added with
    /// [`JsonBackendBuilder::target`] are ignored.
    pub fn build_with_output(self, output: MultiTarget) -> JsonBackend {
        let Self {
            level,
            service,
            metadata,
            redactor,
            targets: _,
            trap,
        } = self;

        let mut fields = Fields::new();
        fields.insert("pid".to_string(), std::process::id().into());
        fields.insert("hostname".to_string(), crate::sys::hostname().into());
        fields.insert("service".to_string(), service.into());
        fields.extend(metadata);

        JsonBackend {
            level,
            ns: None,
            fields,
            redactor: Arc::new(redactor),
            output: Arc::new(output),
            trap,
        }
    }
}
