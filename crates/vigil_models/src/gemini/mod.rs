//! Gemini `generateContent` backend.

mod client;
mod conversions;
mod dto;

pub use client::{GeminiClient, GeminiConfig, GeminiConfigBuilder};
pub use conversions::{error_from_response, from_response, to_request};
pub use dto::{
    ApiError, ErrorEnvelope, GeminiCandidate, GeminiRequest, GeminiResponse, GenerationConfig,
    InlineData, PromptFeedback, RequestContent, RequestPart, ResponseContent, ResponseInlineData,
    ResponsePart,
};
