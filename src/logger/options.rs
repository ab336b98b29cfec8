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

use crate::Level;
use crate::backend::Bindings;
use crate::rolling::RotationConfig;
use crate::transport::Transport;
use crate::transport::TransportList;

pub(crate) const DEFAULT_NAMESPACE: &str = "Anonymous";

/// Options for constructing a [`Logger`](crate::Logger) directly.
///
/// # Examples
///
/// ```
/// use duolog::Level;
/// use duolog::LoggerOptions;
///
/// let options = LoggerOptions::new()
///     .namespace("worker")
///     .min_level(Level::Info)
///     .disable_console(true);
/// ```
#[must_use = "pass the options to `Logger::new`"]
#[derive(Debug, Clone, Default)]
pub struct LoggerOptions {
    pub(crate) namespace: Option<String>,
    pub(crate) min_level: Option<Level>,
    pub(crate) enabled: Option<bool>,
    pub(crate) disable_console: bool,
    pub(crate) rotation: RotationConfig,
    pub(crate) transports: Vec<Arc<dyn Transport>>,
    pub(crate) bindings: Bindings,
}

impl LoggerOptions {
    /// Create options with every default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the namespace.
    ///
    /// Default to `"Anonymous"`.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Set the minimum level applied when no structured backend is active.
    ///
    /// Default to the environment's level.
    pub fn min_level(mut self, level: Level) -> Self {
        self.min_level = Some(level);
        self
    }

    /// Explicitly enable or disable the logger. Error calls are never disabled.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    /// Suppress console lines.
    pub fn disable_console(mut self, disable: bool) -> Self {
        self.disable_console = disable;
        self
    }

    /// Set the rotation settings handed to file outputs.
    pub fn rotation(mut self, rotation: RotationConfig) -> Self {
        self.rotation = rotation;
        self
    }

    /// Append a transport.
    pub fn transport(self, transport: impl Transport) -> Self {
        self.shared_transport(Arc::new(transport))
    }

    /// Append a transport that is also held elsewhere.
    pub fn shared_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transports.push(transport);
        self
    }

    /// Add a structured binding carried by every record of this logger and its children.
    pub fn binding(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.bindings.insert(key.into(), value.into());
        self
    }
}

/// A partial configuration update applied with [`Logger::set_config`](crate::Logger::set_config).
///
/// Only the fields that are set are changed.
///
/// # Examples
///
/// ```
/// use duolog::Level;
/// use duolog::LoggerConfig;
///
/// let config = LoggerConfig::new().min_level(Level::Warn).enabled(true);
/// ```
#[must_use = "apply the config with `Logger::set_config`"]
#[derive(Debug, Clone, Default)]
pub struct LoggerConfig {
    /// Explicit enable override.
    pub enabled: Option<bool>,
    /// Minimum level.
    pub min_level: Option<Level>,
    /// Console suppression.
    pub disable_console: Option<bool>,
    /// Rotation settings.
    pub rotation: Option<RotationConfig>,
    /// A replacement transport list.
    pub transports: Option<TransportList>,
}

impl LoggerConfig {
    /// Create an empty update.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the explicit enable override.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    /// Set the minimum level.
    pub fn min_level(mut self, level: Level) -> Self {
        self.min_level = Some(level);
        self
    }

    /// Set console suppression.
    pub fn disable_console(mut self, disable: bool) -> Self {
        self.disable_console = Some(disable);
        self
    }

    /// Set the rotation settings.
    pub fn rotation(mut self, rotation: RotationConfig) -> Self {
        self.rotation = Some(rotation);
        self
    }

    /// Replace the transport list.
    pub fn transports(mut self, transports: Vec<Arc<dyn Transport>>) -> Self {
        self.transports = Some(transports.into());
        self
    }

    /// Replace the transport list with an existing shared list.
    pub fn shared_transports(mut self, transports: TransportList) -> Self {
        self.transports = Some(transports);
        self
    }

    pub(crate) fn touches_enabled(&self) -> bool {
        self.enabled.is_some() || self.transports.is_some()
    }
}
