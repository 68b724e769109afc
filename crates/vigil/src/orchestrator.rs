//! Request orchestration.
//!
//! Each request walks: cache check, scheduling, retried execution with
//! validation, then caching and a terminal outcome.

use crate::encode::prepare_images;
use crate::{GenerationStream, VigilContext};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use vigil_cache::CacheStats;
use vigil_core::{GeneratedOutput, GenerationOutcome, GenerationRequest, ValidationResult};
use vigil_degradation::{DegradationMode, DeviceCapabilities, FeatureConfig};
use vigil_error::{RetryableError, VigilError, VigilErrorKind, VigilResult};
use vigil_retry::RetryAttempt;
use vigil_telemetry::TelemetryReport;

/// Outcomes buffered per request before the producer waits on the consumer.
const OUTCOME_BUFFER: usize = 16;

/// A validated output and the attempts it took.
struct Completed {
    output: Arc<GeneratedOutput>,
    validation: ValidationResult,
    attempts: u32,
}

/// The error that ended a request and the attempts made.
struct Failed {
    error: VigilError,
    attempts: u32,
}

impl Failed {
    fn cancelled(attempts: u32) -> Self {
        Self {
            error: VigilError::new(VigilErrorKind::Cancelled),
            attempts,
        }
    }
}

/// Entry point for callers.
///
/// Cloning is cheap; clones share the same context.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use vigil::{EnvSettings, Orchestrator, VigilConfig};
/// use vigil_core::GenerationRequest;
///
/// # async fn demo() -> vigil_error::VigilResult<()> {
/// let config = VigilConfig::load(None)?;
/// let orchestrator = Orchestrator::from_config(&config, Arc::new(EnvSettings))?;
///
/// let request = GenerationRequest::builder()
///     .prompt("A lighthouse at dusk, watercolor")
///     .build()
///     .expect("Valid request");
/// let outcome = orchestrator.generate(request).await;
/// println!("{:?}", outcome.text());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Orchestrator {
    ctx: Arc<VigilContext>,
}

impl Orchestrator {
    /// Orchestrate over an existing context.
    pub fn new(ctx: VigilContext) -> Self {
        Self { ctx: Arc::new(ctx) }
    }

    /// Build the production context and wrap it.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the context cannot be built.
    pub fn from_config(
        config: &crate::VigilConfig,
        settings: Arc<dyn vigil_core::SettingsStore>,
    ) -> VigilResult<Self> {
        Ok(Self::new(VigilContext::from_config(config, settings)?))
    }

    /// Shared component graph.
    pub fn context(&self) -> &Arc<VigilContext> {
        &self.ctx
    }

    /// Submit a request and stream its outcomes.
    ///
    /// Must be called from within a tokio runtime. Dropping the returned
    /// stream cancels the request.
    #[instrument(skip(self, request), fields(priority = %request.priority(), kind = %request.output_kind()))]
    pub fn submit(&self, request: GenerationRequest) -> GenerationStream {
        let (tx, rx) = mpsc::channel(OUTCOME_BUFFER);
        let cancel = CancellationToken::new();
        let ctx = Arc::clone(&self.ctx);
        let token = cancel.clone();
        tokio::spawn(async move {
            let outcome = drive(ctx, request, &tx, &token).await;
            if tx.send(outcome).await.is_err() {
                debug!("Caller went away before the terminal outcome");
            }
        });
        GenerationStream::new(rx, cancel)
    }

    /// Submit a request and wait for its terminal outcome.
    pub async fn generate(&self, request: GenerationRequest) -> GenerationOutcome {
        self.submit(request).final_outcome().await
    }

    /// Aggregate telemetry.
    pub fn metrics_snapshot(&self) -> TelemetryReport {
        self.ctx.telemetry().report()
    }

    /// Sample the device and derive its current capabilities.
    pub async fn resource_status(&self) -> DeviceCapabilities {
        let (_, capabilities) = self.ctx.monitor().refresh().await;
        capabilities
    }

    /// Drop every cached result.
    pub fn clear_cache(&self) {
        info!("Clearing result cache");
        self.ctx.cache().clear();
    }

    /// Cache counters.
    pub fn cache_stats(&self) -> CacheStats {
        self.ctx.cache().stats()
    }

    /// Pin the degradation mode until [`clear_degradation_override`](Self::clear_degradation_override).
    pub fn set_degradation_mode(&self, mode: DegradationMode) {
        self.ctx.degradation().set_mode(mode);
    }

    /// Return to signal-driven degradation.
    pub fn clear_degradation_override(&self) {
        self.ctx.degradation().clear_override();
    }

    /// Current degradation mode.
    pub fn degradation_mode(&self) -> DegradationMode {
        self.ctx.degradation().mode()
    }

    /// Feature configuration of the current mode.
    pub fn feature_config(&self) -> FeatureConfig {
        self.ctx.degradation().feature_config()
    }

    /// Receive every degradation mode change.
    pub fn subscribe_degradation(&self) -> watch::Receiver<DegradationMode> {
        self.ctx.degradation().subscribe()
    }

    /// Drop queued requests that have not started. Their streams end with a
    /// cancelled outcome.
    pub fn clear_pending(&self) -> usize {
        self.ctx.scheduler().clear_pending()
    }
}

async fn emit(tx: &mpsc::Sender<GenerationOutcome>, outcome: GenerationOutcome) {
    // A closed channel means the caller dropped the stream; the token is
    // already cancelled and the request unwinds on its own.
    let _ = tx.send(outcome).await;
}

fn error_outcome(error: &VigilError) -> GenerationOutcome {
    GenerationOutcome::Error {
        message: error.user_message(),
        category: error.category(),
    }
}

/// Run one request to its terminal outcome.
#[instrument(skip_all, fields(fingerprint = tracing::field::Empty))]
async fn drive(
    ctx: Arc<VigilContext>,
    request: GenerationRequest,
    tx: &mpsc::Sender<GenerationOutcome>,
    cancel: &CancellationToken,
) -> GenerationOutcome {
    emit(tx, GenerationOutcome::loading(0.0, "Preparing request")).await;

    if let Err(error) = request.validate() {
        warn!(error = %error.kind(), "Rejected request");
        ctx.telemetry().record_error(error.category());
        return error_outcome(&error);
    }

    let (snapshot, _) = ctx.monitor().refresh().await;
    ctx.degradation().observe(&snapshot);
    let features = ctx.degradation().feature_config();

    let fingerprint = request.fingerprint();
    tracing::Span::current().record("fingerprint", tracing::field::display(&fingerprint));

    if features.cache_enabled {
        if let Some(output) = ctx.cache().get(&fingerprint) {
            debug!("Serving cached result");
            ctx.telemetry().record_cache_hit();
            // Hits count as zero-retry requests that never reach the scheduler.
            let timer = ctx.telemetry().start_request();
            ctx.telemetry().finish_success(timer, 0, true);
            return GenerationOutcome::Success {
                output,
                validation: None,
                from_cache: true,
            };
        }
        ctx.telemetry().record_cache_miss();
    }

    if cancel.is_cancelled() {
        let failed = Failed::cancelled(0);
        ctx.telemetry().record_error(failed.error.category());
        return error_outcome(&failed.error);
    }

    let timer = ctx.telemetry().start_request();
    emit(tx, GenerationOutcome::loading(0.1, "Queued")).await;

    let handle = ctx.scheduler().submit(
        *request.priority(),
        execute(Arc::clone(&ctx), request, tx.clone(), cancel.clone()),
    );

    let result = tokio::select! {
        biased;
        // The scheduled job sees the same token and records the cancellation.
        _ = cancel.cancelled() => Err(Failed::cancelled(0)),
        joined = handle => joined.unwrap_or_else(|error| {
            ctx.telemetry().record_error(error.category());
            Err(Failed { error, attempts: 0 })
        }),
    };

    match result {
        Ok(completed) => {
            let current = ctx.degradation().feature_config();
            if current.cache_enabled && completed.validation.passed() {
                ctx.cache().put(fingerprint, Arc::clone(&completed.output));
            }
            ctx.telemetry()
                .finish_success(timer, completed.attempts.saturating_sub(1), false);
            info!(
                attempts = completed.attempts,
                confidence = completed.validation.confidence(),
                "Generation succeeded"
            );
            GenerationOutcome::Success {
                output: completed.output,
                validation: Some(completed.validation),
                from_cache: false,
            }
        }
        Err(failed) => {
            ctx.telemetry().finish_failure(
                timer,
                failed.error.category(),
                failed.attempts.saturating_sub(1),
            );
            warn!(
                attempts = failed.attempts,
                category = failed.error.category(),
                error = %failed.error.kind(),
                "Generation failed"
            );
            error_outcome(&failed.error)
        }
    }
}

/// Scheduled part of a request: image preparation, then retried generation
/// with validation.
async fn execute(
    ctx: Arc<VigilContext>,
    request: GenerationRequest,
    tx: mpsc::Sender<GenerationOutcome>,
    cancel: CancellationToken,
) -> Result<Completed, Failed> {
    if cancel.is_cancelled() {
        let failed = Failed::cancelled(0);
        ctx.telemetry().record_error(failed.error.category());
        return Err(failed);
    }

    // The mode may have moved while the request was queued.
    let features = ctx.degradation().feature_config();

    let request = match prepare(request, &features).await {
        Ok(request) => Arc::new(request),
        Err(error) => {
            ctx.telemetry().record_error(error.category());
            return Err(Failed { error, attempts: 0 });
        }
    };

    let max_attempts = features.max_attempts().min(ctx.backoff().attempts());
    let policy = ctx.backoff().clone().with_max_attempts(max_attempts);
    let kind = *request.output_kind();

    let result = ctx
        .retry()
        .execute_with_retry_notify(
            &policy,
            &cancel,
            |attempt| {
                let ctx = Arc::clone(&ctx);
                let request = Arc::clone(&request);
                let tx = tx.clone();
                async move {
                    let progress = 0.2 + 0.6 * (attempt - 1) as f32 / max_attempts as f32;
                    emit(
                        &tx,
                        GenerationOutcome::loading(
                            progress,
                            format!("Generating (attempt {} of {})", attempt, max_attempts),
                        ),
                    )
                    .await;

                    let output = ctx.backend().generate(&request).await?;

                    emit(&tx, GenerationOutcome::loading(0.9, "Validating output")).await;
                    let validation = ctx.validator().validate_output(&output, kind);
                    if validation.should_retry() {
                        debug!(attempt, summary = %validation.summary(), "Output rejected");
                        return Err(VigilError::new(VigilErrorKind::ValidationFailed(
                            validation.summary(),
                        )));
                    }
                    Ok((Arc::new(output), validation))
                }
            },
            |failed| record_attempt(&ctx, failed),
        )
        .await;

    match result {
        Ok(success) => {
            ctx.degradation().record_api_success();
            let attempts = *success.attempts();
            let (output, validation) = success.into_value();
            Ok(Completed {
                output,
                validation,
                attempts,
            })
        }
        Err(failure) => {
            let attempts = failure.attempts().len() as u32;
            let error = failure.into_error();
            // Fail-fast and cancellation never reach the attempt list.
            if matches!(
                error.kind(),
                VigilErrorKind::CircuitOpen { .. } | VigilErrorKind::Cancelled
            ) {
                ctx.telemetry().record_error(error.category());
            }
            Err(Failed { error, attempts })
        }
    }
}

/// Report a failed attempt to telemetry and the degradation controller
/// before the next attempt runs. A rejected output still means the endpoint
/// answered.
fn record_attempt(ctx: &VigilContext, attempt: &RetryAttempt) {
    let error = attempt.error();
    ctx.telemetry().record_error(error.category());
    if matches!(error.kind(), VigilErrorKind::ValidationFailed(_)) {
        ctx.degradation().record_api_success();
    } else if error.is_remote_failure() {
        ctx.degradation().record_api_failure(error);
    }
}

/// Downscale input images to the current resolution bound off the runtime.
async fn prepare(request: GenerationRequest, features: &FeatureConfig) -> VigilResult<GenerationRequest> {
    if request.images().is_empty() {
        return Ok(request);
    }
    let max_resolution = features.max_resolution;
    let quality = features.compression_quality;
    tokio::task::spawn_blocking(move || {
        let images = prepare_images(request.images(), max_resolution, quality)?;
        Ok(request.with_images(images))
    })
    .await
    .map_err(|e| {
        VigilError::new(VigilErrorKind::InvalidRequest(format!(
            "Image preparation task failed: {}",
            e
        )))
    })?
}
