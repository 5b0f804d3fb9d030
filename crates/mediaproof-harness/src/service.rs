//! In-process fixture bootstrap: backend wiring, scoped engine access,
//! and guaranteed monitor teardown.
//!
//! Bootstrap is a one-time, blocking, per-test-group operation: monitor
//! started, cache built, keyspaces split, backend wired — all before any
//! test runs. Teardown happens in `Drop`, so it runs exactly once on
//! every exit path, early failures included.

use std::path::PathBuf;

use anyhow::{ensure, Result};

use mediaproof_snapshot::ResultValue;

use crate::cache::{ByteLruCache, Keyspace, MB};
use crate::context::{CallContext, CallError};
use crate::request::GenerationRequest;

/// The in-process call path: a structured request plus a call-capturing
/// context, returning an arbitrarily shaped result.
pub trait GenerationBackend {
    fn generate(
        &mut self,
        request: &GenerationRequest,
        context: &mut CallContext,
    ) -> Result<ResultValue, CallError>;
}

/// A monitoring resource with an explicit lifecycle.
pub trait Monitor {
    fn start(&mut self);
    fn stop(&mut self);
}

/// Monitor that does nothing, for tests that need no monitoring.
#[derive(Debug, Default)]
pub struct NullMonitor;

impl Monitor for NullMonitor {
    fn start(&mut self) {}
    fn stop(&mut self) {}
}

/// Configuration consumed (not owned) by the bootstrap.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Engine/model configuration file, validated to exist when given.
    pub engine_config: Option<PathBuf>,
    /// NSFW handling mode passed through to the backend.
    pub nsfw_behaviour: String,
    /// VRAM optimisation level passed through to the backend.
    pub vram_optimisation_level: u8,
    /// Total byte budget for the shared cache.
    pub cache_budget: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            engine_config: None,
            nsfw_behaviour: "ignore".to_string(),
            vram_optimisation_level: 3,
            cache_budget: 512 * MB,
        }
    }
}

/// A generation-service instance wired to namespaced cache keyspaces.
///
/// Resource-level and generation-level caching get separate keyspaces off
/// one shared pool, so their keys cannot collide while both stay under
/// one byte budget.
pub struct GenerationService<B> {
    backend: B,
    resource_cache: Keyspace,
    generation_cache: Keyspace,
}

impl<B: GenerationBackend> GenerationService<B> {
    pub fn new(backend: B, cache: &ByteLruCache) -> Self {
        Self {
            backend,
            resource_cache: cache.keyspace("resources:"),
            generation_cache: cache.keyspace("generation:"),
        }
    }

    /// Issue one call with a fresh [`CallContext`], returning the context
    /// alongside the outcome so tests can assert on captured status.
    pub fn call(
        &mut self,
        request: &GenerationRequest,
    ) -> (Result<ResultValue, CallError>, CallContext) {
        let mut context = CallContext::new();
        let result = self.backend.generate(request, &mut context);
        (result, context)
    }

    pub fn resource_cache(&self) -> &Keyspace {
        &self.resource_cache
    }

    pub fn generation_cache(&self) -> &Keyspace {
        &self.generation_cache
    }
}

/// A ready-to-use backend handle bound to a named engine configuration.
pub struct EngineHandle<'a, B> {
    service: &'a mut GenerationService<B>,
    engine_id: &'a str,
}

impl<B: GenerationBackend> EngineHandle<'_, B> {
    pub fn engine_id(&self) -> &str {
        self.engine_id
    }

    /// Call the backend with the handle's engine stamped on the request.
    pub fn generate(
        &mut self,
        request: &GenerationRequest,
    ) -> (Result<ResultValue, CallError>, CallContext) {
        let mut request = request.clone();
        request.engine_id = self.engine_id.to_string();
        self.service.call(&request)
    }
}

/// One fixture per test group: service, shared cache, running monitor.
pub struct TestGroup<B, M: Monitor> {
    service: GenerationService<B>,
    cache: ByteLruCache,
    monitor: M,
}

impl<B: GenerationBackend, M: Monitor> TestGroup<B, M> {
    /// Assemble the fixture. Blocking and not re-entrant; must complete
    /// before any test in the group runs.
    pub fn bootstrap(config: &ServiceConfig, backend: B, mut monitor: M) -> Result<Self> {
        if let Some(engine_config) = &config.engine_config {
            ensure!(
                engine_config.is_file(),
                "engine config not found: {}",
                engine_config.display()
            );
        }

        monitor.start();

        let cache = ByteLruCache::with_budget(config.cache_budget);
        let service = GenerationService::new(backend, &cache);

        Ok(Self {
            service,
            cache,
            monitor,
        })
    }

    /// Scoped acquisition: hand a ready engine handle to the closure.
    pub fn with_engine<R>(
        &mut self,
        engine_id: &str,
        f: impl FnOnce(EngineHandle<'_, B>) -> R,
    ) -> R {
        f(EngineHandle {
            service: &mut self.service,
            engine_id,
        })
    }

    pub fn service(&mut self) -> &mut GenerationService<B> {
        &mut self.service
    }

    pub fn cache(&self) -> &ByteLruCache {
        &self.cache
    }
}

impl<B, M: Monitor> Drop for TestGroup<B, M> {
    fn drop(&mut self) {
        self.monitor.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use crate::context::StatusCode;
    use crate::request::TextPrompt;

    struct EchoBackend;

    impl GenerationBackend for EchoBackend {
        fn generate(
            &mut self,
            request: &GenerationRequest,
            context: &mut CallContext,
        ) -> Result<ResultValue, CallError> {
            if request.text_prompts.is_empty() {
                return Err(context.abort(StatusCode::InvalidArgument, "no prompts"));
            }
            context.set_code(StatusCode::Ok);
            Ok(ResultValue::Bytes(request.engine_id.clone().into_bytes()))
        }
    }

    #[derive(Clone, Default)]
    struct FlagMonitor {
        started: Arc<AtomicBool>,
        stopped: Arc<AtomicBool>,
    }

    impl Monitor for FlagMonitor {
        fn start(&mut self) {
            self.started.store(true, Ordering::SeqCst);
        }
        fn stop(&mut self) {
            self.stopped.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn with_engine_stamps_the_engine_id() {
        let config = ServiceConfig::default();
        let mut group = TestGroup::bootstrap(&config, EchoBackend, NullMonitor).unwrap();
        let request = GenerationRequest::new("placeholder")
            .with_prompt(TextPrompt::new("A Teddybear"));
        let (result, context) = group.with_engine("testengine", |mut engine| {
            engine.generate(&request)
        });
        assert_eq!(result.unwrap(), ResultValue::Bytes(b"testengine".to_vec()));
        assert_eq!(context.code(), Some(StatusCode::Ok));
    }

    #[test]
    fn aborted_call_reports_context() {
        let config = ServiceConfig::default();
        let mut group = TestGroup::bootstrap(&config, EchoBackend, NullMonitor).unwrap();
        let request = GenerationRequest::new("testengine");
        let (result, context) = group.service().call(&request);
        assert!(matches!(result, Err(CallError::Aborted { .. })));
        assert_eq!(context.code(), Some(StatusCode::InvalidArgument));
        assert_eq!(context.details(), Some("no prompts"));
    }

    #[test]
    fn monitor_stops_on_drop() {
        let monitor = FlagMonitor::default();
        let config = ServiceConfig::default();
        {
            let _group = TestGroup::bootstrap(&config, EchoBackend, monitor.clone()).unwrap();
            assert!(monitor.started.load(Ordering::SeqCst));
            assert!(!monitor.stopped.load(Ordering::SeqCst));
        }
        assert!(monitor.stopped.load(Ordering::SeqCst));
    }

    #[test]
    fn bootstrap_rejects_missing_engine_config() {
        let config = ServiceConfig {
            engine_config: Some(PathBuf::from("/nonexistent/engines.yaml")),
            ..ServiceConfig::default()
        };
        assert!(TestGroup::bootstrap(&config, EchoBackend, NullMonitor).is_err());
    }

    #[test]
    fn service_keyspaces_share_the_group_cache() {
        let config = ServiceConfig::default();
        let mut group = TestGroup::bootstrap(&config, EchoBackend, NullMonitor).unwrap();
        group.service().resource_cache().insert("tensor", vec![1, 2]);
        group.service().generation_cache().insert("tensor", vec![3]);
        assert_eq!(group.cache().len(), 2);
    }
}
