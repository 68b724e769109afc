//! Conversions between vigil types and Gemini wire types.

use crate::gemini::dto::{
    ErrorEnvelope, GeminiRequest, GeminiResponse, GenerationConfig, InlineData, RequestContent,
    RequestPart,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::{debug, warn};
use vigil_core::{GeneratedImage, GeneratedOutput, GenerationRequest, GenerationStyle};
use vigil_error::{VigilError, VigilErrorKind, VigilResult};

/// Longest raw body excerpt carried in an error message.
const MAX_ERROR_EXCERPT: usize = 200;

/// Build the request body: prompt text first, then each input image.
pub fn to_request(request: &GenerationRequest, style: &GenerationStyle) -> GeminiRequest {
    let mut parts = Vec::with_capacity(request.images().len() + 1);
    parts.push(RequestPart::Text {
        text: request.prompt().clone(),
    });
    parts.extend(request.images().iter().map(|image| RequestPart::InlineData {
        inline_data: InlineData {
            mime_type: image.mime().clone(),
            data: STANDARD.encode(image.data()),
        },
    }));

    GeminiRequest {
        contents: vec![RequestContent { parts }],
        generation_config: GenerationConfig {
            temperature: *style.temperature(),
            top_k: *style.top_k(),
            top_p: *style.top_p(),
            candidate_count: 1,
        },
    }
}

/// Extract text and the first image from the first candidate.
///
/// An empty candidate yields an empty output; deciding whether that is
/// acceptable is the validator's job.
///
/// # Errors
///
/// `InvalidRequest` if the prompt was blocked, `Parse` if there are no
/// candidates or an image cannot be decoded.
pub fn from_response(response: &GeminiResponse) -> VigilResult<GeneratedOutput> {
    let Some(candidate) = response.candidates.first() else {
        if let Some(reason) = response
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
        {
            return Err(VigilError::new(VigilErrorKind::InvalidRequest(format!(
                "Prompt blocked: {}",
                reason
            ))));
        }
        return Err(VigilError::new(VigilErrorKind::Parse(
            "Response contained no candidates".to_string(),
        )));
    };

    if let Some(reason) = &candidate.finish_reason {
        debug!(finish_reason = %reason, "Candidate finished");
    }

    let parts = candidate
        .content
        .as_ref()
        .map(|c| c.parts.as_slice())
        .unwrap_or_default();

    let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
    let text = (!text.trim().is_empty()).then_some(text);

    let image = match parts.iter().find_map(|p| p.inline_data.as_ref()) {
        Some(inline) => {
            let bytes = STANDARD.decode(inline.data.as_bytes()).map_err(|e| {
                VigilError::new(VigilErrorKind::Parse(format!("Invalid image base64: {}", e)))
            })?;
            let pixels = image::load_from_memory(&bytes)
                .map_err(|e| {
                    VigilError::new(VigilErrorKind::Parse(format!("Undecodable image: {}", e)))
                })?
                .to_rgba8();
            let mime = inline
                .mime_type
                .clone()
                .or_else(|| {
                    image::guess_format(&bytes)
                        .ok()
                        .map(|f| f.to_mime_type().to_string())
                })
                .unwrap_or_else(|| "application/octet-stream".to_string());
            Some(GeneratedImage::new(bytes, mime, pixels))
        }
        None => None,
    };

    if parts.iter().filter(|p| p.inline_data.is_some()).count() > 1 {
        warn!("Response carried several images, keeping the first");
    }

    Ok(GeneratedOutput::new(image, text))
}

/// Map a non-2xx response to an error.
///
/// The structured `status` in the error body wins over the HTTP status:
/// `RESOURCE_EXHAUSTED` is a rate limit, `UNAUTHENTICATED` and
/// `PERMISSION_DENIED` are auth failures.
pub fn error_from_response(status: u16, body: &[u8]) -> VigilError {
    let envelope = serde_json::from_slice::<ErrorEnvelope>(body).ok();
    let message = match &envelope {
        Some(envelope) if !envelope.error.message.is_empty() => envelope.error.message.clone(),
        _ => {
            let raw = String::from_utf8_lossy(body);
            let excerpt: String = raw.trim().chars().take(MAX_ERROR_EXCERPT).collect();
            if excerpt.is_empty() {
                format!("HTTP {}", status)
            } else {
                excerpt
            }
        }
    };

    let structured = envelope.as_ref().and_then(|e| e.error.status.as_deref());
    let kind = match structured {
        Some("RESOURCE_EXHAUSTED") => VigilErrorKind::RateLimit(message),
        Some("UNAUTHENTICATED") | Some("PERMISSION_DENIED") => VigilErrorKind::Auth(message),
        _ => VigilErrorKind::from_status(status, message),
    };
    VigilError::new(kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_core::{InputImage, OutputKind};

    #[test]
    fn test_request_shape() {
        let request = GenerationRequest::builder()
            .prompt("a cat")
            .images(vec![InputImage::new(2, 2, "image/jpeg", vec![1, 2, 3])])
            .output_kind(OutputKind::Combined)
            .build()
            .expect("valid request");
        let body = to_request(&request, &GenerationStyle::new(0.5, 32, 0.9));
        let json = serde_json::to_value(&body).expect("serializable");

        assert_eq!(json["contents"][0]["parts"][0]["text"], "a cat");
        assert_eq!(
            json["contents"][0]["parts"][1]["inline_data"]["mime_type"],
            "image/jpeg"
        );
        assert_eq!(json["contents"][0]["parts"][1]["inline_data"]["data"], "AQID");
        assert_eq!(json["generationConfig"]["temperature"], 0.5);
        assert_eq!(json["generationConfig"]["topK"], 32);
        assert_eq!(json["generationConfig"]["candidateCount"], 1);
    }

    #[test]
    fn test_text_response() {
        let body = br#"{"candidates":[{"content":{"parts":[{"text":"Hello "},{"text":"world."}]}}]}"#;
        let response: GeminiResponse = serde_json::from_slice(body).expect("valid json");
        let output = from_response(&response).expect("text output");
        assert_eq!(output.text(), Some("Hello world."));
        assert!(output.image().is_none());
    }

    #[test]
    fn test_blocked_prompt() {
        let body = br#"{"promptFeedback":{"blockReason":"SAFETY"}}"#;
        let response: GeminiResponse = serde_json::from_slice(body).expect("valid json");
        let err = from_response(&response).expect_err("blocked");
        assert!(matches!(err.kind(), VigilErrorKind::InvalidRequest(_)));
    }

    #[test]
    fn test_resource_exhausted_is_rate_limit() {
        let body = br#"{"error":{"code":400,"message":"Quota exceeded","status":"RESOURCE_EXHAUSTED"}}"#;
        let err = error_from_response(400, body);
        assert!(matches!(err.kind(), VigilErrorKind::RateLimit(m) if m == "Quota exceeded"));
    }

    #[test]
    fn test_plain_body_error() {
        let err = error_from_response(503, b"upstream unavailable");
        assert!(matches!(
            err.kind(),
            VigilErrorKind::Server { status: 503, message } if message == "upstream unavailable"
        ));
        let err = error_from_response(401, b"");
        assert!(matches!(err.kind(), VigilErrorKind::Auth(_)));
    }
}
