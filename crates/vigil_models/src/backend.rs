use async_trait::async_trait;
use vigil_core::{GeneratedOutput, GenerationRequest};
use vigil_error::VigilResult;

/// A remote generator that turns one request into one output.
///
/// Implementations make exactly one remote call per invocation; retries,
/// caching and validation happen above this layer.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Perform one generation call.
    async fn generate(&self, request: &GenerationRequest) -> VigilResult<GeneratedOutput>;

    /// Backend name for logs.
    fn name(&self) -> &str;
}
