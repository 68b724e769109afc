//! End-to-end orchestration tests against a scripted backend.

use async_trait::async_trait;
use futures::StreamExt;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use vigil::{Orchestrator, VigilConfig, VigilContext};
use vigil_core::{
    GeneratedOutput, GenerationOutcome, GenerationRequest, InputImage, OutputKind, Priority,
};
use vigil_degradation::{DegradationMode, ResourceSnapshot, StaticSampler};
use vigil_error::{VigilError, VigilErrorKind, VigilResult};
use vigil_models::GenerationBackend;

const GIB: u64 = 1024 * 1024 * 1024;
const GOOD_TEXT: &str = "A quiet harbor at dawn, painted in soft blue and amber tones.";

/// Replays scripted results, then answers with [`GOOD_TEXT`].
#[derive(Default)]
struct ScriptedBackend {
    script: Mutex<VecDeque<VigilResult<GeneratedOutput>>>,
    calls: AtomicU32,
    delay: Option<Duration>,
    seen_images: Mutex<Vec<(u32, u32)>>,
    seen_mimes: Mutex<Vec<String>>,
    mode_watch: Mutex<Option<watch::Receiver<DegradationMode>>>,
    seen_modes: Mutex<Vec<DegradationMode>>,
}

impl ScriptedBackend {
    fn new(script: Vec<VigilResult<GeneratedOutput>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            ..Default::default()
        })
    }

    fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay: Some(delay),
            ..Default::default()
        })
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    async fn generate(&self, request: &GenerationRequest) -> VigilResult<GeneratedOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen_images.lock().extend(
            request
                .images()
                .iter()
                .map(|image| (*image.width(), *image.height())),
        );
        self.seen_mimes
            .lock()
            .extend(request.images().iter().map(|image| image.mime().clone()));
        if let Some(modes) = self.mode_watch.lock().as_ref() {
            let mode = *modes.borrow();
            self.seen_modes.lock().push(mode);
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.script.lock().pop_front();
        next.unwrap_or_else(|| Ok(text(GOOD_TEXT)))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

fn text(body: &str) -> GeneratedOutput {
    GeneratedOutput::new(None, Some(body.to_string()))
}

fn fail(kind: VigilErrorKind) -> VigilResult<GeneratedOutput> {
    Err(VigilError::new(kind))
}

fn fast_config() -> VigilConfig {
    let mut config = VigilConfig::default();
    config.retry.initial_delay_ms = 1;
    config.retry.max_delay_ms = 5;
    config.retry.jitter_factor = 0.0;
    config.breaker.cooldown_ms = 60_000;
    config
}

fn orchestrator(backend: Arc<ScriptedBackend>) -> Orchestrator {
    let healthy = ResourceSnapshot::new(16 * GIB, 12 * GIB, 8, true);
    let ctx = VigilContext::new(
        backend,
        &fast_config(),
        Arc::new(StaticSampler::new(healthy)),
    );
    Orchestrator::new(ctx)
}

fn request(prompt: &str) -> GenerationRequest {
    GenerationRequest::builder()
        .prompt(prompt)
        .output_kind(OutputKind::TextOnly)
        .build()
        .expect("Valid request")
}

fn category(outcome: &GenerationOutcome) -> Option<&'static str> {
    match outcome {
        GenerationOutcome::Error { category, .. } => Some(category),
        _ => None,
    }
}

#[tokio::test]
async fn test_successful_generation_is_validated() {
    let backend = ScriptedBackend::new(vec![]);
    let orchestrator = orchestrator(Arc::clone(&backend));

    let mut stream = orchestrator.submit(request("harbor at dawn"));
    let mut outcomes = Vec::new();
    while let Some(outcome) = stream.next().await {
        outcomes.push(outcome);
    }

    assert!(outcomes.len() > 1, "expected progress before the result");
    assert!(outcomes[..outcomes.len() - 1].iter().all(|o| !o.is_terminal()));
    match outcomes.last() {
        Some(GenerationOutcome::Success {
            output,
            validation,
            from_cache,
        }) => {
            assert_eq!(output.text(), Some(GOOD_TEXT));
            assert!(!from_cache);
            assert!(validation.as_ref().is_some_and(|v| v.passed()));
        }
        other => panic!("expected success, got {:?}", other),
    }
    assert_eq!(backend.calls(), 1);

    let report = orchestrator.metrics_snapshot();
    assert_eq!(*report.successful_requests(), 1);
    assert_eq!(*report.in_flight(), 0);
}

#[tokio::test]
async fn test_identical_request_served_from_cache() {
    let backend = ScriptedBackend::new(vec![]);
    let orchestrator = orchestrator(Arc::clone(&backend));

    let first = orchestrator.generate(request("harbor at dawn")).await;
    let second = orchestrator.generate(request("harbor at dawn")).await;

    assert!(matches!(first, GenerationOutcome::Success { from_cache: false, .. }));
    assert!(matches!(
        second,
        GenerationOutcome::Success {
            from_cache: true,
            validation: None,
            ..
        }
    ));
    assert_eq!(backend.calls(), 1);

    let report = orchestrator.metrics_snapshot();
    assert_eq!(*report.cache_hits(), 1);
    assert_eq!(*report.cache_misses(), 1);
    assert_eq!(*orchestrator.cache_stats().entries(), 1);
}

#[tokio::test]
async fn test_clear_cache_forces_regeneration() {
    let backend = ScriptedBackend::new(vec![]);
    let orchestrator = orchestrator(Arc::clone(&backend));

    orchestrator.generate(request("harbor at dawn")).await;
    orchestrator.clear_cache();
    orchestrator.generate(request("harbor at dawn")).await;

    assert_eq!(backend.calls(), 2);
}

#[tokio::test]
async fn test_rejected_output_triggers_fresh_attempt() {
    let backend = ScriptedBackend::new(vec![Ok(text("Hi."))]);
    let orchestrator = orchestrator(Arc::clone(&backend));

    let outcome = orchestrator.generate(request("harbor at dawn")).await;

    assert_eq!(outcome.text(), Some(GOOD_TEXT));
    assert_eq!(backend.calls(), 2);
    let report = orchestrator.metrics_snapshot();
    assert_eq!(*report.total_retries(), 1);
    assert_eq!(report.error_histogram().get("validation"), Some(&1));
    // The endpoint answered both times.
    assert_eq!(orchestrator.degradation_mode(), DegradationMode::Normal);
}

#[tokio::test]
async fn test_validation_exhaustion_ends_in_error() {
    let backend = ScriptedBackend::new(vec![
        Ok(text("Hi.")),
        Ok(text("Hi.")),
        Ok(text("Hi.")),
    ]);
    let orchestrator = orchestrator(Arc::clone(&backend));

    let outcome = orchestrator.generate(request("harbor at dawn")).await;

    assert_eq!(category(&outcome), Some("validation"));
    assert_eq!(backend.calls(), 3);
    assert_eq!(*orchestrator.cache_stats().entries(), 0);
}

#[tokio::test]
async fn test_auth_error_is_not_retried() {
    let backend = ScriptedBackend::new(vec![fail(VigilErrorKind::Auth("bad key".into()))]);
    let orchestrator = orchestrator(Arc::clone(&backend));

    let outcome = orchestrator.generate(request("harbor at dawn")).await;

    assert_eq!(category(&outcome), Some("auth"));
    assert_eq!(backend.calls(), 1);
    let report = orchestrator.metrics_snapshot();
    assert_eq!(*report.failed_requests(), 1);
    assert_eq!(report.error_histogram().get("auth"), Some(&1));
}

#[tokio::test]
async fn test_transient_failure_recovers() {
    let backend = ScriptedBackend::new(vec![fail(VigilErrorKind::Server {
        status: 503,
        message: "overloaded".into(),
    })]);
    let orchestrator = orchestrator(Arc::clone(&backend));

    let outcome = orchestrator.generate(request("harbor at dawn")).await;

    assert_eq!(outcome.text(), Some(GOOD_TEXT));
    assert_eq!(backend.calls(), 2);
    // One failure then one success leaves the counter at zero.
    assert_eq!(orchestrator.degradation_mode(), DegradationMode::Normal);
}

#[tokio::test]
async fn test_rate_limit_degrades_before_the_retry_runs() {
    let backend = ScriptedBackend::new(vec![fail(VigilErrorKind::RateLimit(
        "quota exhausted".into(),
    ))]);
    let orchestrator = orchestrator(Arc::clone(&backend));
    *backend.mode_watch.lock() = Some(orchestrator.subscribe_degradation());

    let outcome = orchestrator.generate(request("harbor at dawn")).await;

    assert_eq!(outcome.text(), Some(GOOD_TEXT));
    assert_eq!(
        backend.seen_modes.lock().as_slice(),
        &[DegradationMode::Normal, DegradationMode::Reduced]
    );
    // The successful retry lifts the rate-limit floor again.
    assert_eq!(orchestrator.degradation_mode(), DegradationMode::Normal);
    let report = orchestrator.metrics_snapshot();
    assert_eq!(report.error_histogram().get("rate_limit"), Some(&1));
}

#[tokio::test]
async fn test_sustained_failures_open_circuit_and_degrade() {
    let backend = ScriptedBackend::new(vec![
        fail(VigilErrorKind::Transport("connection reset".into())),
        fail(VigilErrorKind::Transport("connection reset".into())),
        fail(VigilErrorKind::Transport("connection reset".into())),
    ]);
    let orchestrator = orchestrator(Arc::clone(&backend));

    let first = orchestrator.generate(request("harbor at dawn")).await;
    assert_eq!(category(&first), Some("transport"));
    assert_eq!(backend.calls(), 3);
    assert_eq!(orchestrator.degradation_mode(), DegradationMode::Minimal);

    let second = orchestrator.generate(request("lighthouse at dusk")).await;
    assert_eq!(category(&second), Some("circuit_open"));
    assert_eq!(backend.calls(), 3, "open circuit must not reach the backend");

    let report = orchestrator.metrics_snapshot();
    assert_eq!(report.error_histogram().get("transport"), Some(&3));
    assert_eq!(report.error_histogram().get("circuit_open"), Some(&1));
}

#[tokio::test]
async fn test_emergency_mode_disables_cache_and_retries() {
    let backend = ScriptedBackend::new(vec![]);
    let orchestrator = orchestrator(Arc::clone(&backend));
    let mut modes = orchestrator.subscribe_degradation();

    orchestrator.set_degradation_mode(DegradationMode::Emergency);
    assert!(modes.has_changed().expect("controller alive"));
    assert_eq!(*modes.borrow_and_update(), DegradationMode::Emergency);
    assert!(!orchestrator.feature_config().cache_enabled);

    orchestrator.generate(request("harbor at dawn")).await;
    orchestrator.generate(request("harbor at dawn")).await;
    assert_eq!(backend.calls(), 2);

    let failing = ScriptedBackend::new(vec![fail(VigilErrorKind::Timeout(Duration::from_secs(1)))]);
    let orchestrator = self::orchestrator(Arc::clone(&failing));
    orchestrator.set_degradation_mode(DegradationMode::Emergency);
    let outcome = orchestrator.generate(request("harbor at dawn")).await;
    assert_eq!(category(&outcome), Some("timeout"));
    assert_eq!(failing.calls(), 1);

    orchestrator.clear_degradation_override();
    assert_eq!(orchestrator.degradation_mode(), DegradationMode::Reduced);
}

#[tokio::test]
async fn test_input_images_are_downscaled_to_mode_resolution() {
    let backend = ScriptedBackend::new(vec![]);
    let orchestrator = orchestrator(Arc::clone(&backend));
    orchestrator.set_degradation_mode(DegradationMode::Emergency);

    let pixels = RgbImage::from_fn(800, 400, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 40]));
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(pixels)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .expect("encode png");
    let image = InputImage::from_encoded(bytes).expect("readable png");

    let request = GenerationRequest::builder()
        .prompt("describe this scene")
        .images(vec![image])
        .output_kind(OutputKind::TextOnly)
        .priority(Priority::High)
        .build()
        .expect("Valid request");
    let outcome = orchestrator.generate(request).await;

    assert!(matches!(outcome, GenerationOutcome::Success { .. }));
    assert_eq!(backend.seen_images.lock().as_slice(), &[(512, 256)]);
}

#[tokio::test]
async fn test_small_input_images_are_sent_as_jpeg() {
    let backend = ScriptedBackend::new(vec![]);
    let orchestrator = orchestrator(Arc::clone(&backend));

    let pixels = RgbImage::from_fn(64, 64, |x, y| Rgb([(x * 4) as u8, (y * 4) as u8, 200]));
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(pixels)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .expect("encode png");
    let image = InputImage::from_encoded(bytes).expect("readable png");
    assert_eq!(image.mime(), "image/png");

    let request = GenerationRequest::builder()
        .prompt("describe this swatch")
        .images(vec![image.clone(), image])
        .output_kind(OutputKind::TextOnly)
        .build()
        .expect("Valid request");
    let outcome = orchestrator.generate(request).await;

    assert!(matches!(outcome, GenerationOutcome::Success { .. }));
    assert_eq!(backend.seen_mimes.lock().as_slice(), &["image/jpeg", "image/jpeg"]);
    assert_eq!(backend.seen_images.lock().as_slice(), &[(64, 64), (64, 64)]);
}

#[tokio::test]
async fn test_blank_prompt_rejected_without_backend_call() {
    let backend = ScriptedBackend::new(vec![]);
    let orchestrator = orchestrator(Arc::clone(&backend));

    let outcome = orchestrator.generate(request("   ")).await;

    assert_eq!(category(&outcome), Some("invalid_request"));
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn test_cancel_ends_stream_with_cancelled_outcome() {
    let backend = ScriptedBackend::slow(Duration::from_secs(30));
    let orchestrator = orchestrator(Arc::clone(&backend));

    let mut stream = orchestrator.submit(request("harbor at dawn"));
    while let Some(outcome) = stream.next().await {
        if let GenerationOutcome::Loading { message, .. } = &outcome
            && message.starts_with("Generating")
        {
            break;
        }
    }
    stream.cancel();

    let outcome = tokio::time::timeout(Duration::from_secs(5), stream.final_outcome())
        .await
        .expect("cancellation is prompt");
    assert_eq!(category(&outcome), Some("cancelled"));

    let report = orchestrator.metrics_snapshot();
    assert_eq!(*report.failed_requests(), 1);
    // Cancellation is not a remote failure.
    assert_eq!(orchestrator.context().retry().breaker().consecutive_failures(), 0);
}

#[tokio::test]
async fn test_dropping_stream_releases_scheduler_slot() {
    let backend = ScriptedBackend::slow(Duration::from_secs(30));
    let orchestrator = orchestrator(Arc::clone(&backend));

    let mut stream = orchestrator.submit(request("harbor at dawn"));
    while let Some(outcome) = stream.next().await {
        if let GenerationOutcome::Loading { message, .. } = &outcome
            && message.starts_with("Generating")
        {
            break;
        }
    }
    drop(stream);

    let scheduler = orchestrator.context().scheduler();
    tokio::time::timeout(Duration::from_secs(5), async {
        while scheduler.active_count() > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("slot released after drop");
}
