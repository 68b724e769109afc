//! Input-image preparation.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use tracing::{debug, instrument};
use vigil_core::InputImage;
use vigil_error::{VigilError, VigilErrorKind, VigilResult};

/// Re-encode input images as JPEG at `quality`, downscaling any whose
/// longest side exceeds `max_resolution`.
///
/// Resizing keeps the aspect ratio. Images within the bound keep their
/// dimensions but are still re-encoded, so every image leaves as
/// `image/jpeg`.
///
/// # Errors
///
/// Returns `InvalidRequest` if an image cannot be decoded or re-encoded.
#[instrument(skip(images), fields(count = images.len()))]
pub fn prepare_images(
    images: &[InputImage],
    max_resolution: u32,
    quality: u8,
) -> VigilResult<Vec<InputImage>> {
    images
        .iter()
        .map(|image| prepare_image(image, max_resolution, quality))
        .collect()
}

fn prepare_image(image: &InputImage, max_resolution: u32, quality: u8) -> VigilResult<InputImage> {
    let decoded = image::load_from_memory(image.data()).map_err(|e| {
        VigilError::new(VigilErrorKind::InvalidRequest(format!(
            "Failed to decode input image: {}",
            e
        )))
    })?;
    let longest = decoded.width().max(decoded.height());
    let rgb = if longest > max_resolution {
        decoded
            .resize(max_resolution, max_resolution, FilterType::Triangle)
            .to_rgb8()
    } else {
        decoded.to_rgb8()
    };

    let mut encoded = Vec::new();
    JpegEncoder::new_with_quality(&mut encoded, quality.clamp(1, 100))
        .encode_image(&rgb)
        .map_err(|e| {
            VigilError::new(VigilErrorKind::InvalidRequest(format!(
                "Failed to encode input image: {}",
                e
            )))
        })?;

    debug!(
        from_width = image.width(),
        from_height = image.height(),
        from_mime = %image.mime(),
        to_width = rgb.width(),
        to_height = rgb.height(),
        bytes = encoded.len(),
        "Prepared input image"
    );
    Ok(InputImage::new(rgb.width(), rgb.height(), "image/jpeg", encoded))
}
