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

use serde_json::Map;
use serde_json::Value;

/// Paths every structured backend redacts.
pub const DEFAULT_REDACTIONS: &[&str] = &[
    "password",
    "token",
    "secret",
    "authorization",
    "cookie",
    "*.password",
    "*.token",
    "headers.authorization",
    "headers.cookie",
];

const CENSOR: &str = "[Redacted]";

/// Replaces values at dotted paths with `"[Redacted]"`.
///
/// A `*` segment matches every key at that depth. Paths that do not exist are left alone;
/// redaction never adds keys.
///
/// # Examples
///
/// ```
/// use duolog::backend::Redactor;
/// use serde_json::json;
///
/// let redactor = Redactor::new(["user.password", "*.token"]);
/// let mut value = json!({"user": {"name": "ann", "password": "hunter2"}, "a": {"token": "t"}});
/// redactor.redact(&mut value);
/// assert_eq!(value["user"]["password"], "[Redacted]");
/// assert_eq!(value["a"]["token"], "[Redacted]");
/// assert_eq!(value["user"]["name"], "ann");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Redactor {
    paths: Vec<Vec<String>>,
}

impl Redactor {
    /// Create a redactor for the given dotted paths.
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let paths = paths
            .into_iter()
            .map(|path| {
                path.as_ref()
                    .split('.')
                    .map(str::trim)
                    .map(String::from)
                    .collect::<Vec<_>>()
            })
            .filter(|segments| segments.iter().all(|s| !s.is_empty()))
            .collect();
        Self { paths }
    }

    /// Create a redactor for [`DEFAULT_REDACTIONS`] plus `extra`.
    pub fn with_defaults<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut paths = DEFAULT_REDACTIONS
            .iter()
            .map(|path| path.to_string())
            .collect::<Vec<_>>();
        paths.extend(extra.into_iter().map(|path| path.as_ref().to_string()));
        Self::new(paths)
    }

    /// Whether there is nothing to redact.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Redact `value` in place.
    pub fn redact(&self, value: &mut Value) {
        if let Value::Object(map) = value {
            self.redact_map(map);
        }
    }

    /// Redact the members of `map` in place.
    pub fn redact_map(&self, map: &mut Map<String, Value>) {
        for path in &self.paths {
            redact_path(map, path);
        }
    }
}

fn redact_path(map: &mut Map<String, Value>, path: &[String]) {
    let Some((head, rest)) = path.split_first() else {
        return;
    };

    let apply = |value: &mut Value| {
        if rest.is_empty() {
            *value = Value::String(CENSOR.to_string());
        } else if let Value::Object(inner) = value {
            redact_path(inner, rest);
        }
    };

    if head == "*" {
        map.values_mut().for_each(apply);
    } else if let Some(value) = map.get_mut(head.as_str()) {
        apply(value);
    }
}
