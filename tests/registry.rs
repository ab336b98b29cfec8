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
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use duolog::Error;
use duolog::Level;
use duolog::LogContext;
use duolog::LogEntry;
use duolog::Logger;
use duolog::LoggerOptions;
use duolog::Transport;
use duolog::console::Capture;

fn context() -> LogContext {
    LogContext::builder()
        .without_backend()
        .console(Capture::default())
        .build()
}

#[test]
fn test_same_path_same_instance() {
    let ctx = context();
    let a = ctx.get_logger("billing.invoices");
    let b = ctx.get_logger("billing.invoices");
    assert_eq!(a, b);
    assert_eq!(a.namespace(), "billing.invoices");
}

#[test]
fn test_child_and_path_agree() {
    let ctx = context();
    let via_child = ctx.get_logger("A").child("B");
    assert_eq!(via_child, ctx.get_logger("A.B"));

    let via_path = ctx.get_logger("C.D.E");
    assert_eq!(via_path, ctx.get_logger("C").child("D").child("E"));
    assert_eq!(ctx.get_logger("C.D"), ctx.get_logger("C").child("D"));
}

#[test]
fn test_child_is_memoized() {
    let ctx = context();
    let parent = ctx.get_logger("net");
    let first = parent.child("tcp");
    let second = parent.child("tcp");
    assert_eq!(first, second);
    assert_eq!(first.namespace(), "net.tcp");
    assert_ne!(first, parent.child("udp"));
}

#[test]
fn test_empty_segments_and_anonymous() {
    let ctx = context();
    assert_eq!(ctx.get_logger("").namespace(), "Anonymous");
    assert_eq!(ctx.get_logger("a..b."), ctx.get_logger("a.b"));
}

#[test]
fn test_loggers_are_shareable_across_threads() {
    let ctx = Arc::new(context());
    let handles = (0..8)
        .map(|_| {
            let ctx = ctx.clone();
            std::thread::spawn(move || ctx.get_logger("shared.path"))
        })
        .collect::<Vec<_>>();

    let loggers = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .collect::<Vec<_>>();
    assert!(loggers.windows(2).all(|w| w[0] == w[1]));
}

#[derive(Debug, Default)]
struct CountingFlush(AtomicUsize);

impl Transport for CountingFlush {
    fn handle(&self, _: Level, _: &str, _: &str, _: LogEntry) -> Result<(), Error> {
        Ok(())
    }

    fn flush(&self) -> Result<(), Error> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn test_flush_visits_each_transport_once() {
    let ctx = context();
    let shared = Arc::new(CountingFlush::default());

    let root = ctx.get_logger("jobs");
    root.add_shared_transport(shared.clone());
    let _child = root.child("nightly");
    let standalone = Logger::new(
        &ctx,
        LoggerOptions::new().shared_transport(shared.clone()),
    );

    ctx.flush();
    assert_eq!(shared.0.load(Ordering::SeqCst), 1);

    drop(standalone);
    ctx.shutdown();
    assert_eq!(shared.0.load(Ordering::SeqCst), 2);
}

#[test]
fn test_logger_used_after_shutdown_does_not_panic() {
    let console = Capture::default();
    let ctx = LogContext::builder()
        .without_backend()
        .console(console.clone())
        .trap(NoisyTrap::default())
        .build();
    let log = ctx.get_logger("late");
    ctx.shutdown();

    log.info("after shutdown");
    assert_eq!(console.lines().len(), 1);
}

#[derive(Debug, Default)]
struct NoisyTrap(Mutex<Vec<String>>);

impl duolog::Trap for NoisyTrap {
    fn trap(&self, err: &Error) {
        self.0.lock().unwrap().push(err.to_string());
    }
}
