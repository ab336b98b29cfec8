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

use duolog::Context;
use duolog::Environment;
use duolog::Error;
use duolog::Level;
use duolog::LogContext;
use duolog::LogEntry;
use duolog::Logger;
use duolog::LoggerConfig;
use duolog::LoggerOptions;
use duolog::ManualClock;
use duolog::Transport;
use duolog::Trap;
use duolog::backend::BackendKind;
use duolog::backend::Bindings;
use duolog::backend::StructuredBackend;
use duolog::console::Capture;
use jiff::Zoned;

type Calls = Arc<Mutex<Vec<(Level, Bindings, LogEntry)>>>;

#[derive(Debug, Clone, Default)]
struct RecordingBackend {
    bindings: Bindings,
    calls: Calls,
}

impl StructuredBackend for RecordingBackend {
    fn log(&self, level: Level, entry: &LogEntry) {
        let call = (level, self.bindings.clone(), entry.clone());
        self.calls.lock().unwrap().push(call);
    }

    fn child(&self, bindings: Bindings) -> Arc<dyn StructuredBackend> {
        let mut merged = self.bindings.clone();
        merged.extend(bindings);
        Arc::new(RecordingBackend {
            bindings: merged,
            calls: self.calls.clone(),
        })
    }
}

#[derive(Debug, Default)]
struct RecordingTransport {
    calls: Mutex<Vec<(Level, String, String, LogEntry)>>,
}

impl RecordingTransport {
    fn messages(&self) -> Vec<String> {
        let calls = self.calls.lock().unwrap();
        calls.iter().map(|(_, _, msg, _)| msg.clone()).collect()
    }
}

impl Transport for RecordingTransport {
    fn handle(
        &self,
        level: Level,
        namespace: &str,
        message: &str,
        entry: LogEntry,
    ) -> Result<(), Error> {
        let call = (level, namespace.to_string(), message.to_string(), entry);
        self.calls.lock().unwrap().push(call);
        Ok(())
    }
}

#[derive(Debug)]
struct FailingTransport;

impl Transport for FailingTransport {
    fn handle(&self, _: Level, _: &str, _: &str, _: LogEntry) -> Result<(), Error> {
        Err(Error::new("collector unreachable"))
    }
}

#[derive(Debug, Default)]
struct CollectTrap(Mutex<Vec<String>>);

impl Trap for CollectTrap {
    fn trap(&self, err: &Error) {
        self.0.lock().unwrap().push(err.to_string());
    }
}

struct Harness {
    ctx: LogContext,
    calls: Calls,
    console: Capture,
    trap: Arc<CollectTrap>,
}

fn clock() -> ManualClock {
    let now: Zoned = "2024-05-01T12:34:56+00:00[UTC]".parse().unwrap();
    ManualClock::new(now)
}

fn harness(environment: Environment, structured: bool) -> Harness {
    let backend = RecordingBackend::default();
    let calls = backend.calls.clone();
    let console = Capture::default();
    let trap = Arc::new(CollectTrap::default());

    let builder = LogContext::builder()
        .environment(environment)
        .console(console.clone())
        .clock(clock())
        .trap(trap.clone());
    let builder = if structured {
        builder.backend(backend)
    } else {
        builder.without_backend()
    };

    Harness {
        ctx: builder.build(),
        calls,
        console,
        trap,
    }
}

#[test]
fn test_disabled_logger_only_emits_errors() {
    let h = harness(Environment::default(), true);
    let log = Logger::new(&h.ctx, LoggerOptions::new().enabled(false));
    assert!(!log.is_enabled());

    log.debug("x");
    log.info("x");
    log.warn("x");
    assert!(h.calls.lock().unwrap().is_empty());
    assert!(h.console.lines().is_empty());

    log.error("x");
    let calls = h.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, Level::Error);
    assert_eq!(calls[0].2.message, "x");
    assert_eq!(h.console.lines(), vec!["12:34:56 [Anonymous] x".to_string()]);
}

#[test]
fn test_debug_never_reaches_console() {
    let h = harness(Environment::default(), true);
    let transport = Arc::new(RecordingTransport::default());
    let log = Logger::new(
        &h.ctx,
        LoggerOptions::new()
            .namespace("jobs")
            .transport(transport.clone()),
    );

    log.debug("d");
    log.info("i");
    log.warn("w");
    log.error("e");

    assert_eq!(
        h.console.records(),
        vec![
            (Level::Info, "12:34:56 [jobs] i".to_string()),
            (Level::Warn, "12:34:56 [jobs] w".to_string()),
            (Level::Error, "12:34:56 [jobs] e".to_string()),
        ]
    );
    assert_eq!(h.calls.lock().unwrap().len(), 4);
    assert_eq!(transport.messages(), ["d", "i", "w", "e"]);
}

#[test]
fn test_disable_console() {
    let h = harness(Environment::default(), true);
    let log = Logger::new(&h.ctx, LoggerOptions::new().disable_console(true));

    log.info("quiet");
    log.error("still quiet");

    assert!(h.console.lines().is_empty());
    assert_eq!(h.calls.lock().unwrap().len(), 2);
}

#[test]
fn test_console_has_no_metadata() {
    let h = harness(Environment::default(), true);
    let log = h.ctx.get_logger("api");

    log.info_with("created", Context::new().with("id", 7).with("user", "ann"));

    assert_eq!(h.console.lines(), vec!["12:34:56 [api] created".to_string()]);
    let calls = h.calls.lock().unwrap();
    assert_eq!(calls[0].2.context.get("id"), Some(&serde_json::json!(7)));
    assert_eq!(calls[0].1.get("ns"), Some(&serde_json::json!("api")));
}

#[test]
fn test_failing_transport_is_isolated() {
    let h = harness(Environment::default(), true);
    let after = Arc::new(RecordingTransport::default());
    let log = Logger::new(
        &h.ctx,
        LoggerOptions::new()
            .namespace("sync")
            .transport(FailingTransport)
            .transport(after.clone()),
    );

    log.warn("retrying");

    assert_eq!(after.messages(), ["retrying"]);
    assert_eq!(h.calls.lock().unwrap().len(), 1);
    assert_eq!(h.console.lines(), vec!["12:34:56 [sync] retrying".to_string()]);

    let trapped = h.trap.0.lock().unwrap();
    assert_eq!(trapped.len(), 1);
    assert!(trapped[0].contains("collector unreachable"));
    assert!(trapped[0].contains("sync"));
}

#[test]
fn test_error_is_lifted_into_err() {
    let h = harness(Environment::default(), true);
    let log = h.ctx.get_logger("payments");

    let err = std::io::Error::other("card expired");
    log.error_with("charge failed", Context::new().with("order", 42).error(&err));

    let calls = h.calls.lock().unwrap();
    let entry = &calls[0].2;
    assert!(!entry.context.contains_key("error"));
    assert_eq!(entry.context.get("order"), Some(&serde_json::json!(42)));
    let info = entry.err.as_ref().unwrap();
    assert_eq!(info.name, "Error");
    assert_eq!(info.message, "card expired");
}

#[test]
fn test_min_level_applies_without_structured_backend() {
    let h = harness(Environment::default(), false);
    let log = Logger::new(&h.ctx, LoggerOptions::new().min_level(Level::Warn));
    assert_eq!(log.backend_kind(), BackendKind::Console);

    log.info("dropped");
    log.warn("kept");
    assert_eq!(h.console.lines(), vec!["12:34:56 [Anonymous] kept".to_string()]);

    let h = harness(Environment::default(), true);
    let log = Logger::new(&h.ctx, LoggerOptions::new().min_level(Level::Warn));
    log.info("backend decides");
    assert_eq!(h.calls.lock().unwrap().len(), 1);
}

#[test]
fn test_production_without_outputs_is_disabled() {
    let h = harness(Environment::default().production(true), false);
    let log = h.ctx.get_logger("svc");
    assert_eq!(log.backend_kind(), BackendKind::Noop);
    assert!(!log.is_enabled());

    log.warn("nowhere");
    assert!(h.console.lines().is_empty());

    log.error("still printed");
    assert_eq!(h.console.lines(), vec!["12:34:56 [svc] still printed".to_string()]);

    let with_transport = Logger::new(
        &h.ctx,
        LoggerOptions::new().transport(RecordingTransport::default()),
    );
    assert!(with_transport.is_enabled());
}

#[test]
fn test_strip_disables_everything_but_errors() {
    let h = harness(Environment::default().strip(true), true);
    let log = Logger::new(&h.ctx, LoggerOptions::new().enabled(true));
    assert!(!log.is_enabled());

    log.info("gone");
    log.error("kept");
    assert_eq!(h.calls.lock().unwrap().len(), 1);
}

#[test]
fn test_set_config_transports_propagates_to_children() {
    let h = harness(Environment::default().production(true), false);
    let parent = h.ctx.get_logger("app");
    let a = parent.child("a");
    let b = parent.child("b");
    assert!(!a.is_enabled());
    assert!(!b.is_enabled());

    let transport = Arc::new(RecordingTransport::default());
    let transports: Vec<Arc<dyn Transport>> = vec![transport.clone()];
    parent.set_config(&LoggerConfig::new().transports(transports));

    for logger in [&parent, &a, &b] {
        assert!(logger.is_enabled(), "{}", logger.namespace());
        assert_eq!(logger.transports().len(), 1);
    }

    b.info("from b");
    let calls = transport.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1, "app.b");
}

#[test]
fn test_set_config_only_touches_given_fields() {
    let h = harness(Environment::default(), true);
    let log = Logger::new(
        &h.ctx,
        LoggerOptions::new().min_level(Level::Info).disable_console(true),
    );

    log.set_config(&LoggerConfig::new().min_level(Level::Error));
    assert_eq!(log.min_level(), Level::Error);
    assert!(log.is_console_disabled());
    assert!(log.is_enabled());

    log.set_config(&LoggerConfig::new().enabled(false));
    assert!(!log.is_enabled());
    log.set_config(&LoggerConfig::new().enabled(true));
    assert!(log.is_enabled());
}

#[test]
fn test_children_share_transport_list_at_creation() {
    let h = harness(Environment::default(), true);
    let first = Arc::new(RecordingTransport::default());
    let parent = Logger::new(
        &h.ctx,
        LoggerOptions::new()
            .namespace("root")
            .transport(first.clone()),
    );
    let child = parent.child("leaf");
    assert!(Arc::ptr_eq(&parent.transports(), &child.transports()));

    child.info("hello");
    assert_eq!(first.messages(), ["hello"]);

    parent.add_transport(RecordingTransport::default());
    assert_eq!(parent.transports().len(), 2);
    assert_eq!(child.transports().len(), 2);
}

#[test]
fn test_child_bindings_compose() {
    let h = harness(Environment::default(), true);
    let parent = h.ctx.get_logger("http");
    let mut bindings = Bindings::new();
    bindings.insert("region".to_string(), "eu".into());
    let child = parent.child_with("router", bindings);

    child.info("routed");

    let calls = h.calls.lock().unwrap();
    assert_eq!(child.namespace(), "http.router");
    assert_eq!(calls[0].1.get("ns"), Some(&serde_json::json!("router")));
    assert_eq!(calls[0].1.get("region"), Some(&serde_json::json!("eu")));
}
