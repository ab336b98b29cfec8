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

//! Loggers, their options and the context that owns them.

mod context;
mod logger;
mod options;

pub use self::context::LogContext;
pub use self::context::LogContextBuilder;
pub use self::context::default_context;
pub use self::context::flush;
pub use self::context::get_logger;
pub use self::context::init;
pub use self::context::shutdown;
pub use self::logger::Logger;
pub use self::options::LoggerConfig;
pub use self::options::LoggerOptions;
