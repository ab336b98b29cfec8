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

use std::fmt;
use std::io;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;

use crate::Environment;
use crate::Error;
use crate::Trap;
use crate::env::RemoteConfig;
use crate::non_blocking::NonBlocking;
use crate::non_blocking::NonBlockingBuilder;
use crate::non_blocking::WorkerGuard;
use crate::rolling::RotationConfig;

/// A requested structured output, before it is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSpec {
    /// JSON lines on standard output.
    Stdout,
    /// A rolling JSON-lines file.
    File(PathBuf),
    /// Batches shipped over HTTP.
    Remote(RemoteConfig),
}

impl TargetSpec {
    /// The outputs requested by `env`, in sink order.
    ///
    /// Remote shipping and the file destination share one list so that a single backend writes
    /// every record to both, in the same order. Standard output is used only when neither is
    /// requested.
    pub fn from_env(env: &Environment) -> Vec<TargetSpec> {
        let mut specs = vec![];
        if let Some(remote) = env.remote_config() {
            specs.push(TargetSpec::Remote(remote.clone()));
        }
        if let Some(path) = env.file_path() {
            specs.push(TargetSpec::File(path.to_path_buf()));
        }
        if specs.is_empty() {
            specs.push(TargetSpec::Stdout);
        }
        specs
    }

    /// Open the output. Workers behind file and remote targets are guarded by the returned
    /// [`WorkerGuard`].
    pub fn open(&self, trap: Arc<dyn Trap>) -> Result<(Target, Option<WorkerGuard>), Error> {
        match self {
            TargetSpec::Stdout => Ok((Target::Stdout, None)),
            TargetSpec::File(path) => {
                let writer = RotationConfig::default()
                    .writer(path)
                    .trap(trap.clone())
                    .build()?;
                let (writer, guard) = NonBlockingBuilder::new("duolog-file", writer)
                    .trap(trap)
                    .build()?;
                Ok((Target::File(writer), Some(guard)))
            }
            TargetSpec::Remote(remote) => open_remote(remote, trap),
        }
    }
}

#[cfg(feature = "remote")]
fn open_remote(
    remote: &RemoteConfig,
    trap: Arc<dyn Trap>,
) -> Result<(Target, Option<WorkerGuard>), Error> {
    let writer = super::remote::HttpWriter::new(remote)?;
    let (writer, guard) = NonBlockingBuilder::new("duolog-remote", writer)
        .trap(trap)
        .build()?;
    Ok((Target::Remote(writer), Some(guard)))
}

#[cfg(not(feature = "remote"))]
fn open_remote(
    remote: &RemoteConfig,
    _: Arc<dyn Trap>,
) -> Result<(Target, Option<WorkerGuard>), Error> {
    Err(
        Error::new("remote shipping requested but the `remote` feature is disabled")
            .with_context("project", &remote.project),
    )
}

/// An opened structured output.
pub enum Target {
    /// JSON lines on standard output.
    Stdout,
    /// A rolling file written by a worker thread.
    File(NonBlocking),
    /// HTTP shipping done by a worker thread.
    Remote(NonBlocking),
    /// Any writer, written inline.
    Writer(Mutex<Box<dyn Write + Send>>),
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Stdout => f.write_str("Stdout"),
            Target::File(writer) => f.debug_tuple("File").field(writer).finish(),
            Target::Remote(writer) => f.debug_tuple("Remote").field(writer).finish(),
            Target::Writer(_) => f.write_str("Writer"),
        }
    }
}

impl Target {
    /// Wrap an arbitrary writer.
    pub fn writer(writer: impl Write + Send + 'static) -> Self {
        let writer: Box<dyn Write + Send> = Box::new(writer);
        Target::Writer(Mutex::new(writer))
    }

    fn write_line(&self, line: &[u8]) -> Result<(), Error> {
        match self {
            Target::Stdout => io::stdout()
                .lock()
                .write_all(line)
                .map_err(Error::from_io_error),
            Target::File(writer) | Target::Remote(writer) => writer.send(line.to_vec()),
            Target::Writer(writer) => writer
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .write_all(line)
                .map_err(Error::from_io_error),
        }
    }

    fn flush(&self) -> Result<(), Error> {
        match self {
            Target::Stdout => io::stdout().flush().map_err(Error::from_io_error),
            Target::File(writer) | Target::Remote(writer) => writer.flush(),
            Target::Writer(writer) => writer
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .flush()
                .map_err(Error::from_io_error),
        }
    }
}

/// One ordered sink path: every line goes to each target in turn.
#[derive(Debug, Default)]
pub struct MultiTarget {
    targets: Vec<Target>,
}

impl MultiTarget {
    /// Create a multi-target over `targets`, in order.
    pub fn new(targets: Vec<Target>) -> Self {
        Self { targets }
    }

    /// Open every spec into one multi-target.
    ///
    /// # Errors
    ///
    /// Return the first error; guards of targets opened before it are dropped.
    pub fn open(
        specs: &[TargetSpec],
        trap: Arc<dyn Trap>,
    ) -> Result<(MultiTarget, Vec<WorkerGuard>), Error> {
        let mut targets = Vec::with_capacity(specs.len());
        let mut guards = vec![];
        for spec in specs {
            let (target, guard) = spec.open(trap.clone())?;
            targets.push(target);
            guards.extend(guard);
        }
        Ok((MultiTarget { targets }, guards))
    }

    /// The opened targets.
    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    /// Write `line` to every target. All targets are attempted; the first error is returned.
    pub fn write_line(&self, line: &[u8]) -> Result<(), Error> {
        let mut result = Ok(());
        for target in &self.targets {
            if let Err(err) = target.write_line(line) {
                if result.is_ok() {
                    result = Err(err.with_context("target", format!("{target:?}")));
                }
            }
        }
        result
    }

    /// Flush every target. All targets are attempted; the first error is returned.
    pub fn flush(&self) -> Result<(), Error> {
        let mut result = Ok(());
        for target in &self.targets {
            if let Err(err) = target.flush() {
                if result.is_ok() {
                    result = Err(err);
                }
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use tempfile::TempDir;

    use super::*;
    use crate::trap::DefaultTrap;

    #[test]
    fn test_stdout_only_when_nothing_else_requested() {
        let specs = TargetSpec::from_env(&Environment::default());
        assert_eq!(specs, vec![TargetSpec::Stdout]);
    }

    #[test]
    fn test_remote_and_file_merge_into_one_list() {
        let env = Environment::default()
            .file("logs/app.log")
            .remote("shop", "http://collector/ingest");
        let specs = TargetSpec::from_env(&env);
        assert_eq!(
            specs,
            vec![
                TargetSpec::Remote(RemoteConfig {
                    project: "shop".to_string(),
                    endpoint: "http://collector/ingest".to_string(),
                }),
                TargetSpec::File(Path::new("logs/app.log").to_path_buf()),
            ]
        );
    }

    #[test]
    fn test_file_target_writes_through_worker() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("structured.log");
        let specs = vec![TargetSpec::File(path.clone())];

        let (multi, guards) = MultiTarget::open(&specs, Arc::new(DefaultTrap::default())).unwrap();
        assert_eq!(guards.len(), 1);
        multi.write_line(b"{\"msg\":\"hi\"}\n").unwrap();
        drop(guards);

        assert_eq!(std::fs::read_to_string(path).unwrap(), "{\"msg\":\"hi\"}\n");
    }
}
