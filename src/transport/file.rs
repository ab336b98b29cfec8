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

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;

use jiff::Timestamp;
use serde::Serialize;

use super::Transport;
use crate::Error;
use crate::Level;
use crate::LogEntry;
use crate::Trap;
use crate::rolling::RollingFileWriter;
use crate::rolling::RotationConfig;
use crate::trap::DefaultTrap;

/// A transport writing each entry as one JSON line to a rolling file.
///
/// Line format:
///
/// ```json
/// {"time":"2024-08-11T14:44:57.172051Z","level":"warn","ns":"db.pool","message":"exhausted","context":{"size":8}}
/// ```
///
/// # Examples
///
/// ```no_run
/// use duolog::rolling::RotationConfig;
/// use duolog::transport::FileTransport;
///
/// let transport = FileTransport::new("logs/audit.log", &RotationConfig::default()).unwrap();
/// ```
#[derive(Debug)]
pub struct FileTransport {
    writer: Mutex<RollingFileWriter>,
}

#[derive(Serialize)]
struct Line<'a> {
    time: String,
    level: Level,
    ns: &'a str,
    #[serde(flatten)]
    entry: &'a LogEntry,
}

impl FileTransport {
    /// Open `path` for appending, rotating with `rotation`.
    pub fn new(path: impl Into<PathBuf>, rotation: &RotationConfig) -> Result<Self, Error> {
        Self::with_trap(path, rotation, Arc::new(DefaultTrap::default()))
    }

    /// Open `path` for appending, reporting rotation failures to `trap`.
    pub fn with_trap(
        path: impl Into<PathBuf>,
        rotation: &RotationConfig,
        trap: Arc<dyn Trap>,
    ) -> Result<Self, Error> {
        let writer = rotation.writer(path).trap(trap).build()?;
        Ok(Self {
            writer: Mutex::new(writer),
        })
    }
}

impl Transport for FileTransport {
    fn handle(
        &self,
        level: Level,
        namespace: &str,
        _message: &str,
        entry: LogEntry,
    ) -> Result<(), Error> {
        let line = Line {
            time: Timestamp::now().to_string(),
            level,
            ns: namespace,
            entry: &entry,
        };
        let mut bytes = serde_json::to_vec(&line).map_err(Error::from_json_error)?;
        bytes.push(b'\n');

        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writer.write_all(&bytes).map_err(Error::from_io_error)
    }

    fn flush(&self) -> Result<(), Error> {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writer.flush().map_err(Error::from_io_error)
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use serde_json::Value;
    use tempfile::TempDir;

    use super::*;
    use crate::Context;

    #[test]
    fn test_entries_become_json_lines() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("audit.log");
        let transport = FileTransport::new(&path, &RotationConfig::default()).unwrap();

        let entry = LogEntry::from_parts("paid", Some(Context::new().with("amount", 12)));
        transport.handle(Level::Info, "billing", "paid", entry).unwrap();
        transport.flush().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let line: Value = serde_json::from_str(content.trim_end()).unwrap();
        assert_eq!(line["level"], "info");
        assert_eq!(line["ns"], "billing");
        assert_eq!(line["message"], "paid");
        assert_eq!(line["context"]["amount"], 12);
        assert!(line.get("err").is_none());
    }

    #[test]
    fn test_rotation_settings_apply() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("audit.log");
        let rotation = RotationConfig {
            max_size: NonZeroUsize::new(64),
            max_backups: 2,
        };
        let transport = FileTransport::new(&path, &rotation).unwrap();

        for i in 0..10 {
            let entry = LogEntry::new(format!("entry number {i}"));
            transport.handle(Level::Warn, "audit", "", entry).unwrap();
        }
        drop(transport);

        assert!(temp_dir.path().join("audit.log.1").exists());
        assert!(temp_dir.path().join("audit.log.2").exists());
        assert!(!temp_dir.path().join("audit.log.3").exists());
    }
}
