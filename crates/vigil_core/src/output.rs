//! Generated output types.

use image::RgbaImage;

/// A generated image, kept both encoded (for the caller) and decoded (for validation).
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedImage {
    encoded: Vec<u8>,
    mime: String,
    pixels: RgbaImage,
}

impl GeneratedImage {
    /// Create a generated image from its encoded and decoded forms.
    pub fn new(encoded: Vec<u8>, mime: impl Into<String>, pixels: RgbaImage) -> Self {
        Self {
            encoded,
            mime: mime.into(),
            pixels,
        }
    }

    /// Encoded bytes as returned by the endpoint.
    pub fn encoded(&self) -> &[u8] {
        &self.encoded
    }

    /// MIME type of the encoded bytes.
    pub fn mime(&self) -> &str {
        &self.mime
    }

    /// Decoded RGBA pixels.
    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Approximate in-memory size as an uncompressed RGBA buffer.
    pub fn size_bytes(&self) -> usize {
        self.width() as usize * self.height() as usize * 4
    }
}

/// The payload of a successful generation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GeneratedOutput {
    image: Option<GeneratedImage>,
    text: Option<String>,
}

impl GeneratedOutput {
    /// Create an output from optional image and text parts.
    pub fn new(image: Option<GeneratedImage>, text: Option<String>) -> Self {
        Self { image, text }
    }

    /// Generated image, if any.
    pub fn image(&self) -> Option<&GeneratedImage> {
        self.image.as_ref()
    }

    /// Generated text, if any.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// True if neither an image nor text was produced.
    pub fn is_empty(&self) -> bool {
        self.image.is_none() && self.text.is_none()
    }

    /// Approximate size used for cache accounting.
    pub fn size_bytes(&self) -> usize {
        self.image.as_ref().map_or(0, GeneratedImage::size_bytes)
            + self.text.as_ref().map_or(0, String::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_counts_pixels_and_text() {
        let image = GeneratedImage::new(vec![0; 10], "image/png", RgbaImage::new(10, 20));
        let output = GeneratedOutput::new(Some(image), Some("hello".to_string()));
        assert_eq!(output.size_bytes(), 10 * 20 * 4 + 5);
        assert!(!output.is_empty());
        assert!(GeneratedOutput::default().is_empty());
    }
}
