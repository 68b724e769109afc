//! Wire types for the Gemini `generateContent` endpoint.

use serde::{Deserialize, Serialize};

/// Request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeminiRequest {
    /// Conversation turns; vigil always sends one
    pub contents: Vec<RequestContent>,
    /// Sampling parameters
    #[serde(rename = "generationConfig")]
    pub generation_config: GenerationConfig,
}

/// One turn of request content.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestContent {
    /// Ordered parts
    pub parts: Vec<RequestPart>,
}

/// A text or inline image part.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RequestPart {
    /// Prompt text
    Text {
        /// The text
        text: String,
    },
    /// Base64 encoded image
    InlineData {
        /// The image
        inline_data: InlineData,
    },
}

/// Inline image payload as sent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InlineData {
    /// MIME type, e.g. "image/jpeg"
    pub mime_type: String,
    /// Base64 data
    pub data: String,
}

/// Sampling configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Temperature in [0, 1]
    pub temperature: f32,
    /// Top-k cutoff
    pub top_k: u32,
    /// Top-p cutoff
    pub top_p: f32,
    /// Always 1
    pub candidate_count: u32,
}

/// Response body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiResponse {
    /// Generated candidates
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
    /// Present when the prompt was blocked
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

/// One generated candidate.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiCandidate {
    /// Candidate content
    #[serde(default)]
    pub content: Option<ResponseContent>,
    /// Why generation stopped
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Candidate content.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseContent {
    /// Ordered parts
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

/// A response part. Both `inlineData` and `inline_data` spellings are accepted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponsePart {
    /// Text, if this is a text part
    #[serde(default)]
    pub text: Option<String>,
    /// Image, if this is an image part
    #[serde(default, rename = "inlineData", alias = "inline_data")]
    pub inline_data: Option<ResponseInlineData>,
}

/// Inline image payload as received.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseInlineData {
    /// MIME type, if reported
    #[serde(default, rename = "mimeType", alias = "mime_type")]
    pub mime_type: Option<String>,
    /// Base64 data
    pub data: String,
}

/// Prompt feedback on blocked requests.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    /// Block reason, e.g. "SAFETY"
    #[serde(default)]
    pub block_reason: Option<String>,
}

/// Error body of a non-2xx response.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorEnvelope {
    /// The error
    pub error: ApiError,
}

/// Error detail.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    /// HTTP status echoed in the body
    #[serde(default)]
    pub code: Option<u16>,
    /// Human-readable message
    #[serde(default)]
    pub message: String,
    /// Structured status, e.g. "RESOURCE_EXHAUSTED"
    #[serde(default)]
    pub status: Option<String>,
}
