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
use std::sync::PoisonError;

use jiff::Zoned;

/// The source of wall-clock time for console lines and startup entries.
#[derive(Debug, Clone, Default)]
pub enum Clock {
    /// The system clock in the system timezone.
    #[default]
    DefaultClock,
    /// A clock that only moves when told to.
    ManualClock(ManualClock),
}

impl Clock {
    /// The current time.
    pub fn now(&self) -> Zoned {
        match self {
            Clock::DefaultClock => Zoned::now(),
            Clock::ManualClock(clock) => clock.now(),
        }
    }
}

/// The time could be reset.
///
/// Clones share the same instant, so a test can keep one handle and move the time seen by a
/// logging context.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Zoned>>,
}

impl ManualClock {
    /// Create a manual clock stopped at `now`.
    pub fn new(now: Zoned) -> ManualClock {
        ManualClock {
            now: Arc::new(Mutex::new(now)),
        }
    }

    /// The instant this clock is stopped at.
    pub fn now(&self) -> Zoned {
        self.now
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Move the clock to `now`.
    pub fn set_now(&self, now: Zoned) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = now;
    }
}

impl From<ManualClock> for Clock {
    fn from(clock: ManualClock) -> Self {
        Clock::ManualClock(clock)
    }
}
