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

//! Process configuration read once at startup.

use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;

use crate::Level;

/// `production` selects production mode.
pub const APP_ENV: &str = "APP_ENV";
/// Minimum level override.
pub const LOG_LEVEL: &str = "LOG_LEVEL";
/// Comma-separated redaction paths, added to the built-in list.
pub const LOG_REDACT: &str = "LOG_REDACT";
/// Service name reported as structured metadata.
pub const LOG_SERVICE: &str = "LOG_SERVICE";
/// Enables remote shipping.
pub const LOG_REMOTE: &str = "LOG_REMOTE";
/// Project name sent with shipped batches.
pub const LOG_REMOTE_PROJECT: &str = "LOG_REMOTE_PROJECT";
/// Ingestion URL for remote shipping.
pub const LOG_REMOTE_ENDPOINT: &str = "LOG_REMOTE_ENDPOINT";
/// Enables the structured log file.
pub const LOG_FILE: &str = "LOG_FILE";
/// Path of the structured log file.
pub const LOG_FILE_PATH: &str = "LOG_FILE_PATH";
/// Disables every logger.
pub const LOG_STRIP: &str = "LOG_STRIP";

const DEFAULT_SERVICE: &str = "app";
const DEFAULT_REMOTE_ENDPOINT: &str = "http://127.0.0.1:8080/ingest";
const DEFAULT_FILE_PATH: &str = "logs/app.log";

/// Where remote shipping sends batches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    /// Project the batches belong to.
    pub project: String,
    /// HTTP ingestion URL.
    pub endpoint: String,
}

/// A snapshot of the logging-related environment.
///
/// The snapshot is taken once, usually by [`Environment::from_env`]. Changing the process
/// environment afterwards has no effect on contexts built from it.
///
/// # Examples
///
/// ```
/// use duolog::Environment;
/// use duolog::Level;
///
/// let env = Environment::from_vars([("APP_ENV", "production"), ("LOG_LEVEL", "warn")]);
/// assert!(env.is_production());
/// assert_eq!(env.min_level(), Level::Warn);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    production: bool,
    level: Option<Level>,
    redact: Vec<String>,
    service: String,
    remote: Option<RemoteConfig>,
    file: Option<PathBuf>,
    strip: bool,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            production: false,
            level: None,
            redact: vec![],
            service: DEFAULT_SERVICE.to_string(),
            remote: None,
            file: None,
            strip: false,
        }
    }
}

impl Environment {
    /// Capture the configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_vars(process_vars())
    }

    /// Capture the configuration from an explicit set of variables.
    ///
    /// Unknown variables are ignored; unparsable values fall back to defaults.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect::<HashMap<String, String>>();
        let get = |name: &str| {
            vars.get(name)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
        };

        let service = get(LOG_SERVICE).unwrap_or(DEFAULT_SERVICE).to_string();

        let remote = get(LOG_REMOTE)
            .is_some_and(parse_flag)
            .then(|| RemoteConfig {
                project: get(LOG_REMOTE_PROJECT).unwrap_or(&service).to_string(),
                endpoint: get(LOG_REMOTE_ENDPOINT)
                    .unwrap_or(DEFAULT_REMOTE_ENDPOINT)
                    .to_string(),
            });

        let file = get(LOG_FILE)
            .is_some_and(parse_flag)
            .then(|| PathBuf::from(get(LOG_FILE_PATH).unwrap_or(DEFAULT_FILE_PATH)));

        let redact = get(LOG_REDACT)
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|path| !path.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            production: get(APP_ENV).is_some_and(|v| v.eq_ignore_ascii_case("production")),
            level: get(LOG_LEVEL).and_then(|v| v.parse().ok()),
            redact,
            service,
            remote,
            file,
            strip: get(LOG_STRIP).is_some_and(parse_flag),
        }
    }

    /// Select production or non-production mode.
    pub fn production(mut self, production: bool) -> Self {
        self.production = production;
        self
    }

    /// Override the minimum level.
    pub fn level(mut self, level: Level) -> Self {
        self.level = Some(level);
        self
    }

    /// Add one redaction path.
    pub fn redact(mut self, path: impl Into<String>) -> Self {
        self.redact.push(path.into());
        self
    }

    /// Set the service name.
    pub fn service(mut self, service: impl Into<String>) -> Self {
        self.service = service.into();
        self
    }

    /// Request remote shipping.
    pub fn remote(mut self, project: impl Into<String>, endpoint: impl Into<String>) -> Self {
        self.remote = Some(RemoteConfig {
            project: project.into(),
            endpoint: endpoint.into(),
        });
        self
    }

    /// Request a structured log file.
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Set the strip flag.
    pub fn strip(mut self, strip: bool) -> Self {
        self.strip = strip;
        self
    }

    /// Whether production mode is selected.
    pub fn is_production(&self) -> bool {
        self.production
    }

    /// The minimum level: the override if any, else `info` in production and `debug`
    /// otherwise.
    pub fn min_level(&self) -> Level {
        self.level.unwrap_or(if self.production {
            Level::Info
        } else {
            Level::Debug
        })
    }

    /// Extra redaction paths.
    pub fn redactions(&self) -> &[String] {
        &self.redact
    }

    /// The service name.
    pub fn service_name(&self) -> &str {
        &self.service
    }

    /// Remote shipping configuration, if requested.
    pub fn remote_config(&self) -> Option<&RemoteConfig> {
        self.remote.as_ref()
    }

    /// Path of the structured log file, if requested.
    pub fn file_path(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    /// Whether every logger is stripped.
    pub fn is_stripped(&self) -> bool {
        self.strip
    }
}

/// The process environment, skipping variables whose name or value is not valid UTF-8.
pub(crate) fn process_vars() -> impl Iterator<Item = (String, String)> {
    std::env::vars_os()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
