//! Gemini backend client.

use crate::gemini::conversions::{error_from_response, from_response, to_request};
use crate::gemini::dto::GeminiResponse;
use crate::{GenerationBackend, Transport};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, instrument};
use vigil_core::settings::{self, SettingsStore};
use vigil_core::{GeneratedOutput, GenerationRequest, GenerationStyle};
use vigil_error::{VigilError, VigilErrorKind, VigilResult};

/// Endpoint settings for [`GeminiClient`].
#[derive(Debug, Clone, PartialEq, derive_getters::Getters, derive_builder::Builder)]
#[builder(setter(into))]
pub struct GeminiConfig {
    /// API base URL, without trailing slash
    #[builder(default = "\"https://generativelanguage.googleapis.com/v1beta\".to_string()")]
    base_url: String,
    /// Model identifier
    #[builder(default = "\"gemini-2.0-flash-preview-image-generation\".to_string()")]
    model: String,
    /// Style used when neither the request nor the settings store set one
    #[builder(default)]
    default_style: GenerationStyle,
}

impl GeminiConfig {
    /// Creates a new builder for GeminiConfig.
    pub fn builder() -> GeminiConfigBuilder {
        GeminiConfigBuilder::default()
    }

    /// Full `generateContent` URL.
    pub fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-2.0-flash-preview-image-generation".to_string(),
            default_style: GenerationStyle::default(),
        }
    }
}

/// Gemini `generateContent` client.
///
/// The API key is read from the settings store on every call, so a key
/// entered by the user takes effect without rebuilding the client.
#[derive(Clone)]
pub struct GeminiClient {
    transport: Arc<dyn Transport>,
    settings: Arc<dyn SettingsStore>,
    config: GeminiConfig,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// Create a client.
    pub fn new(
        transport: Arc<dyn Transport>,
        settings: Arc<dyn SettingsStore>,
        config: GeminiConfig,
    ) -> Self {
        debug!(model = %config.model, url = %config.base_url, "Created Gemini client");
        Self {
            transport,
            settings,
            config,
        }
    }

    /// Endpoint settings.
    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    fn api_key(&self) -> VigilResult<String> {
        self.settings
            .get_string(settings::API_KEY)
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                VigilError::new(VigilErrorKind::Auth(format!(
                    "{} is not set",
                    settings::API_KEY
                )))
            })
    }
}

#[async_trait]
impl GenerationBackend for GeminiClient {
    #[instrument(skip(self, request), fields(model = %self.config.model, images = request.images().len()))]
    async fn generate(&self, request: &GenerationRequest) -> VigilResult<GeneratedOutput> {
        let api_key = self.api_key()?;
        let style = (*request.style()).unwrap_or_else(|| {
            GenerationStyle::from_settings(self.settings.as_ref(), self.config.default_style)
        });

        let body = serde_json::to_vec(&to_request(request, &style)).map_err(|e| {
            VigilError::new(VigilErrorKind::InvalidRequest(format!(
                "Failed to encode request: {}",
                e
            )))
        })?;

        debug!(bytes = body.len(), "Sending request");
        let response = self
            .transport
            .post_json(
                &self.config.endpoint(),
                &[("x-goog-api-key", api_key.as_str())],
                body,
            )
            .await?;

        if !response.is_success() {
            let err = error_from_response(response.status, &response.body);
            error!(status = response.status, error = %err.kind(), "API error");
            return Err(err);
        }

        let parsed: GeminiResponse = serde_json::from_slice(&response.body).map_err(|e| {
            error!(error = ?e, "Failed to parse response");
            VigilError::new(VigilErrorKind::Parse(format!("Failed to parse JSON: {}", e)))
        })?;

        from_response(&parsed)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}
