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

//! Host facts stamped onto structured records, and the marker for duolog's own threads.

use std::cell::Cell;

thread_local! {
    static INTERNAL: Cell<bool> = const { Cell::new(false) };
}

/// Whether the current thread is running duolog's own pipeline or output workers.
pub(crate) fn is_internal() -> bool {
    INTERNAL.with(Cell::get)
}

/// Mark the current thread as internal until the returned scope is dropped.
pub(crate) fn enter_internal() -> InternalScope {
    InternalScope {
        prev: INTERNAL.with(|internal| internal.replace(true)),
    }
}

#[must_use = "the thread stops being internal when the scope is dropped"]
pub(crate) struct InternalScope {
    prev: bool,
}

impl Drop for InternalScope {
    fn drop(&mut self) {
        INTERNAL.with(|internal| internal.set(self.prev));
    }
}

/// The name of this host, or `"unknown"`.
#[cfg(unix)]
pub(crate) fn hostname() -> String {
    let mut buf = [0u8; 256];
    let result = unsafe { libc::gethostname(buf.as_mut_ptr() as *mut libc::c_char, buf.len()) };
    if result != 0 {
        return env_hostname();
    }
    let len = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    match std::str::from_utf8(&buf[..len]) {
        Ok(name) if !name.is_empty() => name.to_string(),
        _ => env_hostname(),
    }
}

#[cfg(not(unix))]
pub(crate) fn hostname() -> String {
    env_hostname()
}

fn env_hostname() -> String {
    ["HOSTNAME", "COMPUTERNAME"]
        .iter()
        .filter_map(|key| std::env::var(key).ok())
        .find(|name| !name.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}
