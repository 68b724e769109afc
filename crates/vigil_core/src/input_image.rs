//! Input images attached to a generation request.

use image::ImageReader;
use std::io::Cursor;
use vigil_error::{VigilError, VigilErrorKind, VigilResult};

/// An already-encoded input image with its pixel dimensions.
///
/// Decoding and encoding happen outside the resilience layer; the request
/// only carries the encoded bytes and enough metadata to fingerprint it.
#[derive(Debug, Clone, PartialEq, Eq, derive_getters::Getters)]
pub struct InputImage {
    /// Width in pixels
    width: u32,
    /// Height in pixels
    height: u32,
    /// MIME type of `data`, e.g. "image/jpeg"
    mime: String,
    /// Encoded image bytes
    data: Vec<u8>,
}

impl InputImage {
    /// Create an input image from encoded bytes and known dimensions.
    pub fn new(width: u32, height: u32, mime: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            mime: mime.into(),
            data,
        }
    }

    /// Create an input image from encoded bytes, reading dimensions from the header.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` if the format cannot be recognised.
    pub fn from_encoded(data: Vec<u8>) -> VigilResult<Self> {
        let reader = ImageReader::new(Cursor::new(&data))
            .with_guessed_format()
            .map_err(|e| {
                VigilError::new(VigilErrorKind::InvalidRequest(format!(
                    "Unreadable input image: {}",
                    e
                )))
            })?;
        let mime = reader
            .format()
            .map(|f| f.to_mime_type().to_string())
            .ok_or_else(|| {
                VigilError::new(VigilErrorKind::InvalidRequest(
                    "Unrecognised input image format".to_string(),
                ))
            })?;
        let (width, height) = reader.into_dimensions().map_err(|e| {
            VigilError::new(VigilErrorKind::InvalidRequest(format!(
                "Unreadable input image dimensions: {}",
                e
            )))
        })?;
        Ok(Self::new(width, height, mime, data))
    }

    /// Consume the image and return its encoded bytes.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}
