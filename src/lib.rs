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

//! Duolog is a namespaced logging facade with two outputs per call: a structured backend for
//! machines and a clean console line for operators.
//!
//! # Overview
//!
//! Loggers form a dotted hierarchy (`http`, `http.router`, ...) owned by a [`LogContext`]. Each
//! call is routed to the structured backend, to every registered [`Transport`] and, except for
//! debug calls, to the console as `HH:MM:SS [namespace] message`. When no structured backend is
//! available the facade degrades to console-only, and in production to nothing.
//!
//! # Examples
//!
//! ```
//! use duolog::Context;
//! use duolog::LogContext;
//!
//! let ctx = LogContext::from_env();
//! let log = ctx.get_logger("checkout");
//!
//! log.info("cart loaded");
//! log.error_with(
//!     "payment declined",
//!     Context::new()
//!         .with("order", 1042)
//!         .error(&std::io::Error::other("card expired")),
//! );
//!
//! ctx.shutdown();
//! ```
//!
//! Records from the `log` crate can be forwarded with [`bridge::setup`].

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod backend;
pub mod bootstrap;
pub mod bridge;
pub mod console;
pub mod env;
#[cfg(feature = "internal-non-blocking")]
pub mod non_blocking;
pub mod rolling;
pub mod transport;
pub mod trap;

mod clock;
mod entry;
mod error;
mod level;
mod logger;
mod sys;

pub use self::clock::Clock;
pub use self::clock::ManualClock;
pub use self::entry::Context;
pub use self::entry::ErrorInfo;
pub use self::entry::Fields;
pub use self::entry::LogEntry;
pub use self::env::Environment;
pub use self::error::Error;
pub use self::level::Level;
pub use self::logger::LogContext;
pub use self::logger::LogContextBuilder;
pub use self::logger::Logger;
pub use self::logger::LoggerConfig;
pub use self::logger::LoggerOptions;
pub use self::logger::default_context;
pub use self::logger::flush;
pub use self::logger::get_logger;
pub use self::logger::init;
pub use self::logger::shutdown;
pub use self::transport::Transport;
pub use self::trap::Trap;
