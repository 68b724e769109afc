//! Explicitly constructed component graph.

use crate::VigilConfig;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use vigil_cache::{ResultCache, ResultCacheConfig};
use vigil_core::SettingsStore;
use vigil_degradation::{
    DegradationController, ResourceMonitor, ResourceSampler, SystemSampler,
};
use vigil_error::VigilResult;
use vigil_models::{GeminiClient, GenerationBackend, ReqwestTransport};
use vigil_retry::{BackoffPolicy, RetryEngine};
use vigil_scheduler::PriorityScheduler;
use vigil_telemetry::TelemetryRecorder;
use vigil_validator::OutputValidator;

/// Every component the orchestrator coordinates, built once at startup.
///
/// Components are shared through `Arc`, so a context can back any number of
/// orchestrators and each test can build a fresh one.
pub struct VigilContext {
    backend: Arc<dyn GenerationBackend>,
    cache: Arc<ResultCache>,
    telemetry: Arc<TelemetryRecorder>,
    monitor: ResourceMonitor,
    degradation: Arc<DegradationController>,
    retry: RetryEngine,
    backoff: BackoffPolicy,
    validator: OutputValidator,
    scheduler: PriorityScheduler,
}

impl std::fmt::Debug for VigilContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VigilContext")
            .field("backend", &self.backend.name())
            .field("monitor", &self.monitor)
            .field("retry", &self.retry)
            .field("backoff", &self.backoff)
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

impl VigilContext {
    /// Wire the components around `backend`, sampling resources with `sampler`.
    ///
    /// The device is sampled once here: the result seeds the degradation
    /// controller and, when `cache.max_bytes` is zero, the cache bound.
    #[instrument(skip_all, fields(backend = backend.name()))]
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        config: &VigilConfig,
        sampler: Arc<dyn ResourceSampler>,
    ) -> Self {
        let pressure_ratio = config.degradation.memory_pressure_ratio;
        let monitor = ResourceMonitor::new(sampler).with_pressure_ratio(pressure_ratio);
        let capabilities = monitor.capabilities();

        let degradation =
            Arc::new(DegradationController::new().with_pressure_ratio(pressure_ratio));
        degradation.observe_capabilities(&capabilities);

        let cache_bytes = match config.cache.max_bytes {
            0 => *capabilities.recommended_cache_bytes(),
            configured => configured,
        };
        let cache = Arc::new(ResultCache::new(
            ResultCacheConfig::default().with_max_bytes(cache_bytes),
        ));

        let telemetry = TelemetryRecorder::new();
        #[cfg(feature = "metrics")]
        let telemetry = telemetry.with_otel(vigil_telemetry::OtelInstruments::new());

        let retry = RetryEngine::new(Arc::new(config.breaker()))
            .with_attempt_timeout(config.attempt_timeout());

        let capacity_source = Arc::clone(&degradation);
        let scheduler =
            PriorityScheduler::new(move || capacity_source.feature_config().effective_concurrency());

        info!(
            tier = %capabilities.tier(),
            mode = %degradation.mode(),
            cache_bytes,
            "Vigil context ready"
        );

        Self {
            backend,
            cache,
            telemetry: Arc::new(telemetry),
            monitor,
            degradation,
            retry,
            backoff: config.backoff(),
            validator: OutputValidator::default(),
            scheduler,
        }
    }

    /// Build the production graph: Gemini over reqwest, system sampling.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the endpoint settings are invalid or the HTTP
    /// client cannot be built.
    pub fn from_config(config: &VigilConfig, settings: Arc<dyn SettingsStore>) -> VigilResult<Self> {
        let transport = Arc::new(ReqwestTransport::new(config.request_timeout())?);
        let client = GeminiClient::new(transport, settings, config.gemini_config()?);
        debug!(model = %client.config().model(), "Built Gemini backend");
        Ok(Self::new(
            Arc::new(client),
            config,
            Arc::new(SystemSampler::new()),
        ))
    }

    /// Replace the output validator.
    pub fn with_validator(mut self, validator: OutputValidator) -> Self {
        self.validator = validator;
        self
    }

    /// Remote generator.
    pub fn backend(&self) -> &Arc<dyn GenerationBackend> {
        &self.backend
    }

    /// Result cache.
    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    /// Telemetry recorder.
    pub fn telemetry(&self) -> &Arc<TelemetryRecorder> {
        &self.telemetry
    }

    /// Resource monitor.
    pub fn monitor(&self) -> &ResourceMonitor {
        &self.monitor
    }

    /// Degradation controller.
    pub fn degradation(&self) -> &Arc<DegradationController> {
        &self.degradation
    }

    /// Retry engine and its breaker.
    pub fn retry(&self) -> &RetryEngine {
        &self.retry
    }

    /// Backoff curve; the attempt budget is the configured upper cap.
    pub fn backoff(&self) -> &BackoffPolicy {
        &self.backoff
    }

    /// Output validator.
    pub fn validator(&self) -> &OutputValidator {
        &self.validator
    }

    /// Priority scheduler.
    pub fn scheduler(&self) -> &PriorityScheduler {
        &self.scheduler
    }
}
