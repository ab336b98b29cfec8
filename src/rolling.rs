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

//! A file writer with size-based, rename-chain rotation.

use std::fs;
use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::num::NonZeroUsize;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use crate::Error;
use crate::Trap;
use crate::trap::DefaultTrap;

const DEFAULT_MAX_SIZE: usize = 10 * 1024 * 1024;
const DEFAULT_MAX_BACKUPS: usize = 5;

/// Rotation settings carried by loggers and used by file outputs.
///
/// When the active file reaches `max_size` bytes it is renamed to `<file>.1`, `<file>.1`
/// becomes `<file>.2` and so on up to `max_backups`; the oldest backup is dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationConfig {
    /// Size threshold of the active file. `None` disables rotation.
    pub max_size: Option<NonZeroUsize>,
    /// Number of rotated files to keep.
    pub max_backups: usize,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            max_size: NonZeroUsize::new(DEFAULT_MAX_SIZE),
            max_backups: DEFAULT_MAX_BACKUPS,
        }
    }
}

impl RotationConfig {
    /// Start a writer builder for `path` with these settings.
    pub fn writer(&self, path: impl Into<PathBuf>) -> RollingFileWriterBuilder {
        let builder = RollingFileWriterBuilder::new(path).max_backups(self.max_backups);
        match self.max_size {
            Some(n) => builder.max_file_size(n),
            None => builder,
        }
    }
}

/// A writer for rolling files.
#[derive(Debug)]
pub struct RollingFileWriter {
    path: PathBuf,
    max_size: Option<NonZeroUsize>,
    max_backups: usize,
    current_filesize: usize,
    writer: File,
    trap: Arc<dyn Trap>,
}

impl Drop for RollingFileWriter {
    fn drop(&mut self) {
        if let Err(err) = self.writer.flush() {
            let err = Error::new("failed to flush file writer on dropped").with_source(err);
            self.trap.trap(&err);
        }
    }
}

impl Write for RollingFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.should_rollover() {
            self.refresh_writer();
        }

        self.writer
            .write(buf)
            .inspect(|&n| self.current_filesize += n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

impl RollingFileWriter {
    /// The path of the active file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn should_rollover(&self) -> bool {
        self.max_size
            .is_some_and(|n| self.current_filesize >= n.get())
    }

    fn backup_path(&self, n: usize) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(format!(".{n}"));
        PathBuf::from(name)
    }

    fn refresh_writer(&mut self) {
        if let Err(err) = self.writer.flush() {
            let err = Error::new("failed to flush previous writer").with_source(err);
            self.trap.trap(&err);
        }

        match self.rotate() {
            Ok(file) => {
                self.writer = file;
                self.current_filesize = 0;
            }
            Err(err) => {
                // keep appending to the current file; the next write retries
                let err = Error::new("failed to rotate log writer")
                    .with_context("path", self.path.display())
                    .with_source(err);
                self.trap.trap(&err);
            }
        }
    }

    fn rotate(&self) -> Result<File, Error> {
        if self.max_backups == 0 {
            return open_truncate(&self.path);
        }

        let oldest = self.backup_path(self.max_backups);
        if oldest.exists() {
            fs::remove_file(&oldest).map_err(|err| {
                Error::new(format!("failed to remove old log: {}", oldest.display()))
                    .with_source(err)
            })?;
        }

        for i in (1..self.max_backups).rev() {
            let from = self.backup_path(i);
            if from.exists() {
                let to = self.backup_path(i + 1);
                fs::rename(&from, &to).map_err(|err| {
                    Error::new(format!("failed to rotate log: {}", from.display()))
                        .with_source(err)
                })?;
            }
        }

        let archive = self.backup_path(1);
        fs::rename(&self.path, &archive).map_err(|err| {
            Error::new(format!("failed to archive log: {}", self.path.display()))
                .with_source(err)
        })?;

        open_truncate(&self.path)
    }
}

fn open_truncate(path: &Path) -> Result<File, Error> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(|err| Error::new("failed to create log file").with_source(err))
}

/// A builder for configuring [`RollingFileWriter`].
#[derive(Debug)]
pub struct RollingFileWriterBuilder {
    path: PathBuf,
    max_size: Option<NonZeroUsize>,
    max_backups: usize,
    trap: Arc<dyn Trap>,
}

impl RollingFileWriterBuilder {
    /// Creates a new [`RollingFileWriterBuilder`] for the active file at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_size: None,
            max_backups: DEFAULT_MAX_BACKUPS,
            trap: Arc::new(DefaultTrap::default()),
        }
    }

    /// Set the maximum size of the active file in bytes.
    #[must_use]
    pub fn max_file_size(mut self, n: NonZeroUsize) -> Self {
        self.max_size = Some(n);
        self
    }

    /// Set the number of rotated files to keep.
    #[must_use]
    pub fn max_backups(mut self, n: usize) -> Self {
        self.max_backups = n;
        self
    }

    /// Set the trap receiving rotation failures.
    #[must_use]
    pub fn trap(mut self, trap: Arc<dyn Trap>) -> Self {
        self.trap = trap;
        self
    }

    /// Builds the [`RollingFileWriter`], appending to the active file if it already exists.
    ///
    /// # Errors
    ///
    /// Return an error if the parent directory cannot be created or the file cannot be opened.
    pub fn build(self) -> Result<RollingFileWriter, Error> {
        let Self {
            path,
            max_size,
            max_backups,
            trap,
        } = self;

        if path.as_os_str().is_empty() {
            return Err(Error::new("log file path must not be empty"));
        }

        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|err| {
                Error::new("failed to create log directory")
                    .with_context("dir", dir.display())
                    .with_source(err)
            })?;
        }

        let writer = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|err| {
                Error::new("failed to open log file")
                    .with_context("path", path.display())
                    .with_source(err)
            })?;
        let current_filesize = writer
            .metadata()
            .map(|metadata| metadata.len() as usize)
            .unwrap_or_default();

        Ok(RollingFileWriter {
            path,
            max_size,
            max_backups,
            current_filesize,
            writer,
            trap,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::cmp::min;
    use std::fs;
    use std::io::Write;
    use std::num::NonZeroUsize;

    use rand::Rng;
    use rand::distr::Alphanumeric;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_file_rolling_via_file_size() {
        test_file_rolling_for_specific_file_size(0, 1000);
        test_file_rolling_for_specific_file_size(2, 1000);
        test_file_rolling_for_specific_file_size(5, 8888);
        test_file_rolling_for_specific_file_size(9, 6666);
    }

    fn test_file_rolling_for_specific_file_size(max_backups: usize, max_size: usize) {
        let max_size = NonZeroUsize::new(max_size).unwrap();
        let temp_dir = TempDir::new().unwrap();

        let mut writer = RollingFileWriterBuilder::new(temp_dir.path().join("startup.log"))
            .max_backups(max_backups)
            .max_file_size(max_size)
            .build()
            .unwrap();

        for i in 0..(max_backups + 1) * 2 {
            let mut expected_file_size = 0;
            while expected_file_size < max_size.get() {
                let rand_str = generate_random_string();
                expected_file_size += rand_str.len();
                assert_eq!(writer.write(rand_str.as_bytes()).unwrap(), rand_str.len());
                assert_eq!(writer.current_filesize, expected_file_size);
            }

            writer.flush().unwrap();
            assert_eq!(
                fs::read_dir(temp_dir.path()).unwrap().count(),
                min(i + 1, max_backups + 1)
            );
        }
    }

    #[test]
    fn test_rename_chain_order() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("app.log");

        let mut writer = RotationConfig {
            max_size: NonZeroUsize::new(1),
            max_backups: 2,
        }
        .writer(&path)
        .build()
        .unwrap();

        for line in ["first\n", "second\n", "third\n", "fourth\n"] {
            writer.write_all(line.as_bytes()).unwrap();
        }
        writer.flush().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "fourth\n");
        assert_eq!(fs::read_to_string(writer.backup_path(1)).unwrap(), "third\n");
        assert_eq!(fs::read_to_string(writer.backup_path(2)).unwrap(), "second\n");
        assert!(!writer.backup_path(3).exists());
    }

    #[test]
    fn test_existing_file_is_appended() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("app.log");

        {
            let mut writer = RollingFileWriterBuilder::new(&path).build().unwrap();
            writer.write_all(b"one\n").unwrap();
        }

        let mut writer = RollingFileWriterBuilder::new(&path).build().unwrap();
        assert_eq!(writer.current_filesize, 4);
        writer.write_all(b"two\n").unwrap();
        writer.flush().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "one\ntwo\n");
    }

    #[test]
    fn test_empty_path_is_rejected() {
        assert!(RollingFileWriterBuilder::new("").build().is_err());
    }

    fn generate_random_string() -> String {
        let mut rng = rand::rng();
        let len = rng.random_range(50..=100);
        let random_string: String = std::iter::repeat(())
            .map(|()| rng.sample(Alphanumeric))
            .map(char::from)
            .take(len)
            .collect();

        random_string
    }
}
