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

//! The per-call log entry and the context attached to it.

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

/// Structured key-value fields.
pub type Fields = Map<String, Value>;

/// Structured context passed alongside a log message.
///
/// Fields are rendered next to the message by structured outputs and ignored by the console.
/// An error attached with [`Context::error`] is lifted out of the fields into the entry's `err`
/// member. A plain value stored under the `error` key is an ordinary field.
///
/// # Examples
///
/// ```
/// use duolog::Context;
///
/// let err = std::io::Error::other("connection reset");
/// let ctx = Context::new()
///     .with("user_id", 42)
///     .with("route", "/checkout")
///     .error(&err);
/// assert_eq!(ctx.fields().len(), 2);
/// assert!(ctx.attached_error().is_some());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    fields: Fields,
    error: Option<ErrorInfo>,
}

impl Context {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field. Values that fail to serialize are stored as `null`.
    pub fn with(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.fields.insert(key.into(), value);
        self
    }

    /// Add a field in place.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.fields.insert(key.into(), value);
    }

    /// Attach an error to be reported as the entry's `err`.
    pub fn error<E: std::error::Error>(mut self, err: &E) -> Self {
        self.error = Some(ErrorInfo::from_error(err));
        self
    }

    /// Attach an already flattened error.
    pub fn error_info(mut self, info: ErrorInfo) -> Self {
        self.error = Some(info);
        self
    }

    /// The structured fields.
    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// The attached error, if any.
    pub fn attached_error(&self) -> Option<&ErrorInfo> {
        self.error.as_ref()
    }
}

impl From<Fields> for Context {
    fn from(fields: Fields) -> Self {
        Context {
            fields,
            error: None,
        }
    }
}

/// An error flattened to plain data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Short type name of the error.
    pub name: String,
    /// The error's display message.
    pub message: String,
    /// The error followed by its source chain, one cause per line.
    pub stack: String,
}

impl ErrorInfo {
    /// Flatten a typed error; `name` is the unqualified type name.
    pub fn from_error<E: std::error::Error>(err: &E) -> Self {
        Self::from_dyn(short_type_name::<E>(), err)
    }

    /// Flatten an error whose concrete type is erased.
    pub fn from_dyn(name: impl Into<String>, err: &dyn std::error::Error) -> Self {
        let name = name.into();
        let message = err.to_string();

        let mut stack = format!("{name}: {message}");
        let mut source = err.source();
        while let Some(cause) = source {
            stack.push_str("\n    caused by: ");
            stack.push_str(&cause.to_string());
            source = cause.source();
        }

        Self {
            name,
            message,
            stack,
        }
    }
}

fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    let path = full.split('<').next().unwrap_or(full);
    path.rsplit("::").next().unwrap_or(path)
}

/// The structured record of one log call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    /// The rendered message.
    pub message: String,
    /// Context fields, without any attached error.
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub context: Fields,
    /// The attached error, flattened.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub err: Option<ErrorInfo>,
}

impl LogEntry {
    /// Create an entry with no context.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: Map::new(),
            err: None,
        }
    }

    /// Build an entry from a message and the optional call context, lifting the attached error.
    pub fn from_parts(message: impl Into<String>, context: Option<Context>) -> Self {
        let mut entry = Self::new(message);
        if let Some(Context { fields, error }) = context {
            entry.context = fields;
            entry.err = error;
        }
        entry
    }
}
