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

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::Mutex;

use duolog::Error;
use duolog::Level;
use duolog::ManualClock;
use duolog::Trap;
use duolog::bootstrap::Diagnostics;
use duolog::bootstrap::Outcome;
use duolog::bootstrap::Phase;
use duolog::bootstrap::PhaseMark;
use duolog::bootstrap::StartupLog;
use duolog::bootstrap::StartupRecord;
use duolog::bootstrap::parse_log;
use duolog::console::Capture;
use jiff::ToSpan;
use jiff::Zoned;
use serde_json::json;
use tempfile::TempDir;

fn clock() -> ManualClock {
    let now: Zoned = "2024-05-01T08:00:00+00:00[UTC]".parse().unwrap();
    ManualClock::new(now)
}

fn advance(clock: &ManualClock, millis: i64) {
    let next = clock.now().checked_add(millis.milliseconds()).unwrap();
    clock.set_now(next);
}

#[derive(Debug, Default)]
struct CollectTrap(Mutex<Vec<String>>);

impl Trap for CollectTrap {
    fn trap(&self, err: &Error) {
        self.0.lock().unwrap().push(err.to_string());
    }
}

#[test]
fn test_successful_startup() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("startup.log");
    let clock = clock();
    let console = Capture::default();

    let mut startup = StartupLog::builder(&path)
        .service("shop")
        .clock(clock.clone())
        .console(console.clone())
        .env_vars([("HOME", "/home/shop"), ("API_TOKEN", "abc")])
        .build();

    startup.start_phase(Phase::Config);
    advance(&clock, 120);
    startup.log(Level::Debug, "reading shop.toml", None);
    startup.log(Level::Warn, "optional key missing", Some(json!({"key": "cdn"})));
    startup.complete_phase(Phase::Config);
    startup.start_phase(Phase::Services);
    advance(&clock, 30);
    startup.complete_phase(Phase::Services);
    startup.complete();

    let records = parse_log(&path).unwrap();
    let StartupRecord::Startup(banner) = &records[0] else {
        panic!("first record must be the banner: {:?}", records[0]);
    };
    assert_eq!(banner.service, "shop");
    assert_eq!(banner.pid, std::process::id());
    assert_eq!(banner.env["HOME"], "/home/shop");
    assert_eq!(banner.env["API_TOKEN"], "[REDACTED]");

    let StartupRecord::Shutdown(shutdown) = records.last().unwrap() else {
        panic!("last record must be the shutdown banner");
    };
    assert_eq!(shutdown.outcome, Outcome::Completed);
    assert_eq!(shutdown.duration_ms, 150);
    assert_eq!(shutdown.failed_phase, None);

    let warn = records
        .iter()
        .find_map(|r| match r {
            StartupRecord::Entry(e) if e.level == Level::Warn => Some(e.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(warn.phase, Phase::Config);
    assert_eq!(warn.elapsed_ms, 120);
    assert_eq!(warn.data, Some(json!({"key": "cdn"})));

    let diagnostics = Diagnostics::from_records(&records);
    assert_eq!(&diagnostics, startup.diagnostics());
    assert!(diagnostics.is_completed());
    assert_eq!(diagnostics.warnings, 1);
    assert_eq!(diagnostics.errors, 0);
    assert_eq!(diagnostics.phase(Phase::Config).unwrap().duration_ms, 120);
    assert_eq!(diagnostics.phase(Phase::Services).unwrap().duration_ms, 30);
    assert_eq!(diagnostics.total_duration_ms, Some(150));

    let lines = console.lines();
    assert!(lines.contains(&"08:00:00 [startup:config] config phase started".to_string()));
    assert!(lines.contains(&"08:00:00 [startup:config] optional key missing".to_string()));
    assert!(!lines.iter().any(|l| l.contains("reading shop.toml")));
}

#[test]
fn test_failed_startup() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("startup.log");
    let mut startup = StartupLog::builder(&path)
        .clock(clock())
        .console(Capture::default())
        .env_vars(Vec::<(String, String)>::new())
        .build();

    startup.start_phase(Phase::Backend);
    startup.fail(&std::io::Error::other("collector refused connection"));
    assert!(startup.is_finished());

    let diagnostics = Diagnostics::from_records(&parse_log(&path).unwrap());
    assert_eq!(diagnostics.outcome, Some(Outcome::Failed));
    assert_eq!(diagnostics.failed_phase, Some(Phase::Backend));
    assert_eq!(diagnostics.errors, 1);
    assert_eq!(
        diagnostics.last_error.as_deref(),
        Some("collector refused connection")
    );

    let records = parse_log(&path).unwrap();
    let error_entry = records
        .iter()
        .find_map(|r| match r {
            StartupRecord::Entry(e) if e.level == Level::Error => Some(e.clone()),
            _ => None,
        })
        .unwrap();
    let data = error_entry.data.unwrap();
    assert_eq!(data["err"]["message"], "collector refused connection");
}

#[test]
fn test_phase_marks_are_written() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("startup.log");
    let mut startup = StartupLog::builder(&path)
        .console(Capture::default())
        .env_vars(Vec::<(String, String)>::new())
        .build();
    startup.start_phase(Phase::Init);
    startup.complete_phase(Phase::Init);
    startup.flush();

    let marks = parse_log(&path)
        .unwrap()
        .into_iter()
        .filter_map(|r| match r {
            StartupRecord::Entry(e) => e.mark,
            _ => None,
        })
        .collect::<Vec<_>>();
    assert_eq!(marks, vec![PhaseMark::Started, PhaseMark::Completed]);
}

#[test]
fn test_rotation_keeps_bounded_backups() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("startup.log");
    let mut startup = StartupLog::builder(&path)
        .max_file_size(NonZeroUsize::new(256).unwrap())
        .max_backups(2)
        .console(Capture::default())
        .env_vars(Vec::<(String, String)>::new())
        .build();

    for i in 0..50 {
        startup.log(Level::Info, format!("service {i} registered"), None);
    }
    startup.complete();
    drop(startup);

    assert!(path.exists());
    assert!(temp_dir.path().join("startup.log.1").exists());
    assert!(temp_dir.path().join("startup.log.2").exists());
    assert!(!temp_dir.path().join("startup.log.3").exists());
}

#[test]
fn test_unwritable_path_is_trapped() {
    let temp_dir = TempDir::new().unwrap();
    let blocker = temp_dir.path().join("file");
    std::fs::write(&blocker, "not a directory").unwrap();

    let trap = Arc::new(CollectTrap::default());
    let console = Capture::default();
    let mut startup = StartupLog::builder(blocker.join("startup.log"))
        .console(console.clone())
        .trap(trap.clone())
        .env_vars(Vec::<(String, String)>::new())
        .build();

    startup.start_phase(Phase::Init);
    startup.complete();

    assert_eq!(trap.0.lock().unwrap().len(), 1);
    assert_eq!(console.lines().len(), 2);
    assert!(startup.diagnostics().is_completed());
}
