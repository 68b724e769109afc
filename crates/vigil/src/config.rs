//! Layered configuration.
//!
//! Values are resolved in order: built-in defaults, an optional TOML file,
//! then `VIGIL_*` environment variables (`__` separates sections, e.g.
//! `VIGIL_RETRY__MAX_ATTEMPTS=2`).

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, instrument};
use vigil_core::GenerationStyle;
use vigil_error::{VigilError, VigilErrorKind, VigilResult};
use vigil_models::GeminiConfig;
use vigil_retry::{BackoffPolicy, CircuitBreaker};

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "VIGIL";

/// Remote endpoint settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// API base URL
    pub base_url: String,
    /// Model identifier
    pub model: String,
    /// HTTP client timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        let gemini = GeminiConfig::default();
        Self {
            base_url: gemini.base_url().clone(),
            model: gemini.model().clone(),
            request_timeout_ms: 60_000,
        }
    }
}

/// Retry and backoff settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Upper cap on attempts per request; the degradation mode may lower it
    pub max_attempts: u32,
    /// Delay before the second attempt, in milliseconds
    pub initial_delay_ms: u64,
    /// Ceiling on the un-jittered delay, in milliseconds
    pub max_delay_ms: u64,
    /// Growth factor per attempt
    pub multiplier: f64,
    /// Maximum random extension as a fraction of the delay
    pub jitter_factor: f64,
    /// Upper bound on one attempt, in milliseconds
    pub attempt_timeout_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 500,
            max_delay_ms: 30_000,
            multiplier: 2.0,
            jitter_factor: 0.1,
            attempt_timeout_ms: 60_000,
        }
    }
}

/// Circuit breaker settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Consecutive remote failures that open the circuit
    pub failure_threshold: u32,
    /// How long the circuit stays open, in milliseconds
    pub cooldown_ms: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            cooldown_ms: 30_000,
        }
    }
}

/// Result cache settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Size bound in bytes; 0 uses the device recommendation
    pub max_bytes: usize,
}

/// Degradation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DegradationConfig {
    /// Available/total memory ratio below which the device is under pressure
    pub memory_pressure_ratio: f64,
}

impl Default for DegradationConfig {
    fn default() -> Self {
        Self {
            memory_pressure_ratio: vigil_degradation::DEFAULT_PRESSURE_RATIO,
        }
    }
}

/// Default sampling parameters, used when neither the request nor the
/// settings store provide them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    /// Sampling temperature
    pub temperature: f32,
    /// Top-k cutoff
    pub top_k: u32,
    /// Nucleus cutoff
    pub top_p: f32,
}

impl Default for StyleConfig {
    fn default() -> Self {
        let style = GenerationStyle::default();
        Self {
            temperature: *style.temperature(),
            top_k: *style.top_k(),
            top_p: *style.top_p(),
        }
    }
}

/// Complete vigil configuration.
///
/// # Examples
///
/// ```
/// use vigil::VigilConfig;
///
/// let config = VigilConfig::default();
/// assert_eq!(config.breaker.failure_threshold, 3);
/// assert_eq!(config.backoff().attempts(), 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VigilConfig {
    /// Remote endpoint
    pub api: ApiConfig,
    /// Retry and backoff
    pub retry: RetryConfig,
    /// Circuit breaker
    pub breaker: BreakerConfig,
    /// Result cache
    pub cache: CacheConfig,
    /// Degradation
    pub degradation: DegradationConfig,
    /// Default style
    pub style: StyleConfig,
}

impl VigilConfig {
    /// Load configuration from defaults, a TOML file and the environment.
    ///
    /// With `path` set the file must exist. Without it,
    /// `<config dir>/vigil/vigil.toml` is read when present.
    #[instrument]
    pub fn load(path: Option<&Path>) -> VigilResult<Self> {
        let defaults = Config::try_from(&VigilConfig::default()).map_err(config_error)?;
        let mut builder = Config::builder().add_source(defaults);

        match path {
            Some(path) => {
                debug!(path = %path.display(), "Loading config file");
                builder = builder.add_source(File::from(path.to_path_buf()).required(true));
            }
            None => {
                if let Some(path) = Self::default_path().filter(|p| p.exists()) {
                    debug!(path = %path.display(), "Loading default config file");
                    builder = builder.add_source(File::from(path).required(false));
                }
            }
        }

        builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(Config::try_deserialize)
            .map_err(config_error)
    }

    /// `<config dir>/vigil/vigil.toml`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("vigil").join("vigil.toml"))
    }

    /// Backoff policy with the configured attempt cap.
    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy {
            max_attempts: self.retry.max_attempts,
            initial_delay: Duration::from_millis(self.retry.initial_delay_ms),
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
            multiplier: self.retry.multiplier,
            jitter_factor: self.retry.jitter_factor,
        }
    }

    /// Per-attempt time bound.
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.retry.attempt_timeout_ms)
    }

    /// HTTP client timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.api.request_timeout_ms)
    }

    /// Breaker built from the breaker section.
    pub fn breaker(&self) -> CircuitBreaker {
        CircuitBreaker::new(
            self.breaker.failure_threshold,
            Duration::from_millis(self.breaker.cooldown_ms),
        )
    }

    /// Default style from the style section.
    pub fn style(&self) -> GenerationStyle {
        GenerationStyle::new(self.style.temperature, self.style.top_k, self.style.top_p)
    }

    /// Endpoint settings for the Gemini client.
    pub fn gemini_config(&self) -> VigilResult<GeminiConfig> {
        GeminiConfig::builder()
            .base_url(self.api.base_url.clone())
            .model(self.api.model.clone())
            .default_style(self.style())
            .build()
            .map_err(|e| VigilError::new(VigilErrorKind::Config(e.to_string())))
    }
}

fn config_error(err: config::ConfigError) -> VigilError {
    VigilError::new(VigilErrorKind::Config(err.to_string()))
}
