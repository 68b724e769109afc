//! Remote generator integrations.
//!
//! The orchestrator talks to a [`GenerationBackend`]. The Gemini backend
//! speaks the `generateContent` JSON format over a pluggable [`Transport`],
//! so tests can substitute canned HTTP responses.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod backend;
pub mod gemini;
mod transport;

pub use backend::GenerationBackend;
pub use gemini::{GeminiClient, GeminiConfig};
pub use transport::{ReqwestTransport, Transport, TransportResponse};
