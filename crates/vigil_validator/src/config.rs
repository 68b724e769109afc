//! Validator thresholds.

/// Thresholds used by [`OutputValidator`](crate::OutputValidator).
#[derive(Debug, Clone, PartialEq, derive_getters::Getters, derive_setters::Setters)]
#[setters(prefix = "with_")]
pub struct ValidatorConfig {
    /// Smallest acceptable image width or height, in pixels
    min_image_dimension: u32,
    /// Uniformity score above which an image is flagged
    max_uniformity: f64,
    /// Fraction of 8-pixel column boundaries with sharp breaks above which
    /// compression blocking is flagged
    max_block_density: f64,
    /// Average channel level considered saturated
    channel_high: f64,
    /// Average channel level considered starved
    channel_low: f64,
    /// Side of the central region sampled for edge density
    edge_region: u32,
    /// RGB distance above which adjacent pixels form an edge
    edge_distance: f64,
    /// Acceptable edge density range, inclusive
    edge_density_range: (f64, f64),
    /// Fewest trimmed characters acceptable in text
    min_text_chars: usize,
    /// Leading characters scanned for bare error keywords. Past this window
    /// only explicit reports such as `Error:` are flagged.
    error_scan_chars: usize,
    /// Max single-word share above which repetition is flagged
    max_repetition_ratio: f64,
    /// Fewest words before repetition is measured
    min_repetition_words: usize,
    /// Coherence score below which text is flagged
    min_coherence: f64,
    /// Text length beyond which combined outputs must mention the image
    cross_modal_min_chars: usize,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            min_image_dimension: 100,
            max_uniformity: 0.95,
            max_block_density: 0.3,
            channel_high: 200.0,
            channel_low: 50.0,
            edge_region: 50,
            edge_distance: 30.0,
            edge_density_range: (0.05, 0.5),
            min_text_chars: 10,
            error_scan_chars: 50,
            max_repetition_ratio: 0.3,
            min_repetition_words: 5,
            min_coherence: 0.5,
            cross_modal_min_chars: 100,
        }
    }
}
