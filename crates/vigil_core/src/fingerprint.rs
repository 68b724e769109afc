//! Request fingerprints for the result cache.

use crate::{InputImage, OutputKind};
use sha2::{Digest, Sha256};

/// Deterministic digest identifying logically equivalent requests.
///
/// Derived from the prompt text, the output kind and each input image's
/// dimensions. Pixel contents are not hashed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub struct RequestFingerprint(String);

impl RequestFingerprint {
    /// Compute the fingerprint for a request's identifying parts.
    pub fn compute(prompt: &str, output_kind: OutputKind, images: &[InputImage]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"vigil-fp-v1");
        hasher.update((prompt.len() as u64).to_le_bytes());
        hasher.update(prompt.as_bytes());
        hasher.update([output_kind.tag()]);
        hasher.update((images.len() as u64).to_le_bytes());
        for image in images {
            hasher.update(image.width().to_le_bytes());
            hasher.update(image.height().to_le_bytes());
        }
        Self(format!("{:x}", hasher.finalize()))
    }

    /// Wrap an existing digest string.
    pub fn from_raw(digest: impl Into<String>) -> Self {
        Self(digest.into())
    }

    /// Hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
