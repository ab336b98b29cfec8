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
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;

use super::Backend;
use super::Bindings;
use super::StructuredBackend;
use crate::Environment;
use crate::Error;
use crate::Trap;

/// Owns the root structured backend, if one could be obtained.
///
/// Loggers never build backends themselves. They ask the provider for a scoped child of the
/// root, and fall back to a placeholder when the provider has nothing to give.
pub struct BackendProvider {
    root: Option<Arc<dyn StructuredBackend>>,
    #[cfg(feature = "internal-non-blocking")]
    guards: Mutex<Vec<crate::non_blocking::WorkerGuard>>,
    #[cfg(not(feature = "internal-non-blocking"))]
    guards: Mutex<Vec<()>>,
}

impl fmt::Debug for BackendProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendProvider")
            .field("root", &self.root)
            .field(
                "workers",
                &self.guards.lock().unwrap_or_else(PoisonError::into_inner).len(),
            )
            .finish()
    }
}

impl BackendProvider {
    /// A provider with no structured backend.
    pub fn unavailable() -> Self {
        Self {
            root: None,
            guards: Mutex::new(vec![]),
        }
    }

    /// A provider handing out children of `backend`.
    pub fn with_backend(backend: impl StructuredBackend) -> Self {
        Self::with_shared_backend(Arc::new(backend))
    }

    /// A provider handing out children of an already shared `backend`.
    pub fn with_shared_backend(backend: Arc<dyn StructuredBackend>) -> Self {
        Self {
            root: Some(backend),
            guards: Mutex::new(vec![]),
        }
    }

    /// Build the built-in JSON backend for `env`.
    ///
    /// Failure to open any requested output is reported to `trap` and yields an unavailable
    /// provider; logging then degrades to console or nothing.
    pub fn detect(env: &Environment, trap: Arc<dyn Trap>) -> Self {
        match Self::try_detect(env, trap.clone()) {
            Ok(provider) => provider,
            Err(err) => {
                trap.trap(&Error::new("structured backend unavailable").with_source(err));
                Self::unavailable()
            }
        }
    }

    #[cfg(feature = "structured")]
    fn try_detect(env: &Environment, trap: Arc<dyn Trap>) -> Result<Self, Error> {
        use super::JsonBackend;
        use super::MultiTarget;
        use super::Redactor;
        use super::TargetSpec;

        let specs = TargetSpec::from_env(env);
        let (output, guards) = MultiTarget::open(&specs, trap.clone())?;
        let backend = JsonBackend::builder()
            .level(env.min_level())
            .service(env.service_name())
            .redactor(Redactor::with_defaults(env.redactions()))
            .trap(trap)
            .build_with_output(output);

        Ok(Self {
            root: Some(Arc::new(backend)),
            guards: Mutex::new(guards),
        })
    }

    #[cfg(not(feature = "structured"))]
    fn try_detect(_: &Environment, _: Arc<dyn Trap>) -> Result<Self, Error> {
        Err(Error::new("built without the `structured` feature"))
    }

    /// Whether a structured backend is present.
    pub fn is_available(&self) -> bool {
        self.root.is_some()
    }

    /// The root backend.
    pub fn root(&self) -> Option<&Arc<dyn StructuredBackend>> {
        self.root.as_ref()
    }

    /// Select the backend for a logger scope.
    pub(crate) fn bind(&self, production: bool, bindings: Bindings) -> Backend {
        match &self.root {
            Some(root) => Backend::Structured(root.child(bindings)),
            None if production => Backend::Noop,
            None => Backend::Console,
        }
    }

    /// Flush the root backend.
    pub fn flush(&self) -> Result<(), Error> {
        match &self.root {
            Some(root) => root.flush(),
            None => Ok(()),
        }
    }

    /// Stop the output workers, waiting for queued records to be written.
    pub fn release_workers(&self) {
        let mut guards = self.guards.lock().unwrap_or_else(PoisonError::into_inner);
        drop(std::mem::take(&mut *guards));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Level;
    use crate::LogEntry;
    use crate::backend::BackendKind;

    #[derive(Debug)]
    struct Nop;

    impl StructuredBackend for Nop {
        fn log(&self, _: Level, _: &LogEntry) {}

        fn child(&self, _: Bindings) -> Arc<dyn StructuredBackend> {
            Arc::new(Nop)
        }
    }

    #[test]
    fn test_bind_fallbacks() {
        let provider = BackendProvider::unavailable();
        assert!(!provider.is_available());
        assert_eq!(provider.bind(false, Bindings::new()).kind(), BackendKind::Console);
        assert_eq!(provider.bind(true, Bindings::new()).kind(), BackendKind::Noop);

        let provider = BackendProvider::with_backend(Nop);
        assert_eq!(provider.bind(true, Bindings::new()).kind(), BackendKind::Structured);
    }

    #[cfg(not(feature = "remote"))]
    #[test]
    fn test_detect_traps_unavailable_remote() {
        #[derive(Debug, Default)]
        struct Count(std::sync::atomic::AtomicUsize);

        impl Trap for Count {
            fn trap(&self, _: &Error) {
                self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            }
        }

        let trap = Arc::new(Count::default());
        let env = Environment::default().remote("shop", "http://127.0.0.1:1/ingest");
        let provider = BackendProvider::detect(&env, trap.clone());
        assert!(!provider.is_available());
        assert_eq!(trap.0.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
