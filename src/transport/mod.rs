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

//! Side-output sinks that receive every emitted entry next to the structured backend.

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use crate::Error;
use crate::Level;
use crate::LogEntry;
use crate::Trap;

mod file;

pub use self::file::FileTransport;

/// A pluggable sink receiving `(level, namespace, message, entry)` for each emitted call.
///
/// Failures are isolated per transport: an error or a panic is reported to the context's trap
/// and the remaining transports still run.
pub trait Transport: fmt::Debug + Send + Sync + 'static {
    /// Handle one emitted entry. `entry` is this transport's own copy.
    fn handle(
        &self,
        level: Level,
        namespace: &str,
        message: &str,
        entry: LogEntry,
    ) -> Result<(), Error>;

    /// Flush any buffered entries.
    ///
    /// Default to a no-op.
    fn flush(&self) -> Result<(), Error> {
        Ok(())
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn handle(
        &self,
        level: Level,
        namespace: &str,
        message: &str,
        entry: LogEntry,
    ) -> Result<(), Error> {
        (**self).handle(level, namespace, message, entry)
    }

    fn flush(&self) -> Result<(), Error> {
        (**self).flush()
    }
}

/// An ordered transport list, shared by reference between a logger and the children created
/// while it is current.
pub type TransportList = Arc<[Arc<dyn Transport>]>;

/// An empty transport list.
pub fn empty() -> TransportList {
    Arc::from(Vec::new())
}

/// Deliver one entry to every transport in order.
pub(crate) fn fan_out(
    transports: &[Arc<dyn Transport>],
    trap: &dyn Trap,
    level: Level,
    namespace: &str,
    message: &str,
    entry: &LogEntry,
) {
    for (index, transport) in transports.iter().enumerate() {
        let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
            transport.handle(level, namespace, message, entry.clone())
        }));

        let err = match result {
            Ok(Ok(())) => continue,
            Ok(Err(err)) => Error::new("transport failed").with_source(err),
            Err(payload) => Error::new("transport panicked")
                .with_context("panic", panic_message(payload.as_ref())),
        };
        let err = err
            .with_context("transport", format!("{transport:?}"))
            .with_context("index", index)
            .with_context("namespace", namespace);
        trap.trap(&err);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Debug, Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl Transport for Recorder {
        fn handle(&self, _: Level, ns: &str, msg: &str, _: LogEntry) -> Result<(), Error> {
            self.0.lock().unwrap().push(format!("{ns}:{msg}"));
            Ok(())
        }
    }

    #[derive(Debug)]
    struct Failing;

    impl Transport for Failing {
        fn handle(&self, _: Level, _: &str, _: &str, _: LogEntry) -> Result<(), Error> {
            Err(Error::new("sink offline"))
        }
    }

    #[derive(Debug)]
    struct Panicking;

    impl Transport for Panicking {
        fn handle(&self, _: Level, _: &str, _: &str, _: LogEntry) -> Result<(), Error> {
            panic!("sink exploded")
        }
    }

    #[derive(Debug, Default)]
    struct Collect(Mutex<Vec<String>>);

    impl Trap for Collect {
        fn trap(&self, err: &Error) {
            self.0.lock().unwrap().push(err.to_string());
        }
    }

    #[test]
    fn test_failures_are_isolated() {
        let recorder = Arc::new(Recorder::default());
        let transports: Vec<Arc<dyn Transport>> = vec![
            Arc::new(Failing),
            Arc::new(Panicking),
            recorder.clone(),
        ];
        let trap = Collect::default();

        fan_out(
            &transports,
            &trap,
            Level::Info,
            "db",
            "connected",
            &LogEntry::new("connected"),
        );

        assert_eq!(*recorder.0.lock().unwrap(), vec!["db:connected".to_string()]);
        let trapped = trap.0.lock().unwrap();
        assert_eq!(trapped.len(), 2);
        assert!(trapped[0].starts_with("transport failed"));
        assert!(trapped[1].contains("sink exploded"));
    }
}
