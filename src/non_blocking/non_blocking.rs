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
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::SendTimeoutError;
use crossbeam_channel::Sender;
use crossbeam_channel::bounded;
use crossbeam_channel::unbounded;

use super::Message;
use super::worker::Worker;
use crate::Error;
use crate::Trap;
use crate::trap::DefaultTrap;

/// A guard that flushes lines associated with a [`NonBlocking`] writer on drop.
///
/// Writing to a [`NonBlocking`] writer does not immediately reach the underlying output. A
/// dedicated thread writes each batch and flushes after draining the channel. Dropping the guard
/// asks the thread to drain and waits for it for at most the shutdown timeout.
#[derive(Debug)]
pub struct WorkerGuard {
    handle: Option<JoinHandle<()>>,
    sender: Sender<Message>,
    shutdown: Sender<()>,
    shutdown_timeout: Duration,
}

impl WorkerGuard {
    fn new(
        handle: JoinHandle<()>,
        sender: Sender<Message>,
        shutdown: Sender<()>,
        shutdown_timeout: Option<Duration>,
    ) -> Self {
        const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

        WorkerGuard {
            handle: Some(handle),
            sender,
            shutdown,
            shutdown_timeout: shutdown_timeout.unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT),
        }
    }
}

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        let shutdown_timeout = self.shutdown_timeout;
        match self.sender.send_timeout(Message::Shutdown, shutdown_timeout) {
            Ok(()) => {
                // The worker calls `recv()` on the zero-capacity shutdown channel once it has
                // drained, so this rendezvous marks the end of pending writes.
                if self.shutdown.send_timeout((), shutdown_timeout).is_ok() {
                    if let Some(handle) = self.handle.take() {
                        let _ = handle.join();
                    }
                }
            }
            Err(SendTimeoutError::Disconnected(_)) => (),
            Err(SendTimeoutError::Timeout(_)) => {
                eprintln!("duolog: failed to send shutdown signal to logging worker");
            }
        }
    }
}

/// A non-blocking line writer.
#[derive(Clone, Debug)]
pub struct NonBlocking {
    sender: Sender<Message>,
}

impl NonBlocking {
    /// Queue one rendered line.
    pub fn send(&self, line: Vec<u8>) -> Result<(), Error> {
        self.sender
            .send(Message::Record(line))
            .map_err(|err| Error::new("failed to send log line to worker").with_source(err))
    }

    /// Ask the worker to flush its writer. Returns before the flush happens.
    pub fn flush(&self) -> Result<(), Error> {
        self.sender
            .send(Message::Flush)
            .map_err(|err| Error::new("failed to send flush to worker").with_source(err))
    }
}

/// A builder for configuring [`NonBlocking`].
#[derive(Debug)]
pub struct NonBlockingBuilder<T: Write + Send + 'static> {
    thread_name: String,
    buffered_lines_limit: Option<usize>,
    shutdown_timeout: Option<Duration>,
    trap: Arc<dyn Trap>,
    writer: T,
}

impl<T: Write + Send + 'static> NonBlockingBuilder<T> {
    /// Creates a new [`NonBlockingBuilder`] with the specified writer.
    pub fn new(thread_name: impl Into<String>, writer: T) -> Self {
        Self {
            thread_name: thread_name.into(),
            buffered_lines_limit: None,
            shutdown_timeout: None,
            trap: Arc::new(DefaultTrap::default()),
            writer,
        }
    }

    /// Sets the buffer size of pending lines.
    pub fn buffered_lines_limit(mut self, buffered_lines_limit: Option<usize>) -> Self {
        self.buffered_lines_limit = buffered_lines_limit;
        self
    }

    /// Sets the shutdown timeout before the worker guard dropped.
    pub fn shutdown_timeout(mut self, shutdown_timeout: Option<Duration>) -> Self {
        self.shutdown_timeout = shutdown_timeout;
        self
    }

    /// Sets the trap receiving write failures.
    pub fn trap(mut self, trap: Arc<dyn Trap>) -> Self {
        self.trap = trap;
        self
    }

    /// Spawns the worker thread.
    ///
    /// # Errors
    ///
    /// Return an error if the thread cannot be spawned.
    pub fn build(self) -> Result<(NonBlocking, WorkerGuard), Error> {
        let (sender, receiver) = match self.buffered_lines_limit {
            Some(cap) => bounded(cap),
            None => unbounded(),
        };
        let (shutdown_sender, shutdown_receiver) = bounded(0);

        let worker = Worker::new(self.writer, receiver, shutdown_receiver, self.trap);
        let handle = worker.make_thread(self.thread_name)?;
        let guard = WorkerGuard::new(
            handle,
            sender.clone(),
            shutdown_sender,
            self.shutdown_timeout,
        );

        Ok((NonBlocking { sender }, guard))
    }
}
