//! Degradation modes and their feature configurations.

use serde::Serialize;

/// Global operating posture, ordered from richest to most conservative.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum DegradationMode {
    /// Full feature set.
    #[default]
    Normal,
    /// Lower resolution and concurrency.
    Reduced,
    /// Sequential processing, single retry.
    Minimal,
    /// Bare minimum: no cache, no retries.
    Emergency,
}

impl DegradationMode {
    /// Feature configuration for this mode.
    pub fn feature_config(self) -> FeatureConfig {
        match self {
            DegradationMode::Normal => FeatureConfig {
                parallel_processing: true,
                cache_enabled: true,
                max_resolution: 2048,
                compression_quality: 95,
                max_concurrency: 4,
                retry_attempts: 3,
            },
            DegradationMode::Reduced => FeatureConfig {
                parallel_processing: true,
                cache_enabled: true,
                max_resolution: 1536,
                compression_quality: 85,
                max_concurrency: 2,
                retry_attempts: 2,
            },
            DegradationMode::Minimal => FeatureConfig {
                parallel_processing: false,
                cache_enabled: true,
                max_resolution: 1024,
                compression_quality: 75,
                max_concurrency: 1,
                retry_attempts: 1,
            },
            DegradationMode::Emergency => FeatureConfig {
                parallel_processing: false,
                cache_enabled: false,
                max_resolution: 512,
                compression_quality: 60,
                max_concurrency: 1,
                retry_attempts: 0,
            },
        }
    }
}

/// What the rest of the layer is allowed to do in a given mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeatureConfig {
    /// Whether more than one request may execute at once
    pub parallel_processing: bool,
    /// Whether the result cache is consulted and filled
    pub cache_enabled: bool,
    /// Longest side of an input image, in pixels
    pub max_resolution: u32,
    /// JPEG-equivalent quality for re-encoded input images
    pub compression_quality: u8,
    /// Concurrency cap for the scheduler
    pub max_concurrency: usize,
    /// Retries allowed after the first attempt
    pub retry_attempts: u32,
}

impl FeatureConfig {
    /// Concurrency cap, forced to one when parallelism is off.
    pub fn effective_concurrency(&self) -> usize {
        if self.parallel_processing {
            self.max_concurrency.max(1)
        } else {
            1
        }
    }

    /// Total attempts including the first.
    pub fn max_attempts(&self) -> u32 {
        self.retry_attempts + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_modes_get_more_conservative() {
        let configs: Vec<FeatureConfig> = DegradationMode::iter()
            .map(DegradationMode::feature_config)
            .collect();
        for pair in configs.windows(2) {
            assert!(pair[1].max_resolution <= pair[0].max_resolution);
            assert!(pair[1].compression_quality <= pair[0].compression_quality);
            assert!(pair[1].max_concurrency <= pair[0].max_concurrency);
            assert!(pair[1].retry_attempts <= pair[0].retry_attempts);
        }
    }

    #[test]
    fn test_mode_parses_case_insensitively() {
        assert_eq!("reduced".parse::<DegradationMode>().ok(), Some(DegradationMode::Reduced));
        assert_eq!("EMERGENCY".parse::<DegradationMode>().ok(), Some(DegradationMode::Emergency));
        assert_eq!(DegradationMode::Minimal.to_string(), "MINIMAL");
    }

    #[test]
    fn test_emergency_disables_cache_and_retries() {
        let config = DegradationMode::Emergency.feature_config();
        assert!(!config.cache_enabled);
        assert_eq!(config.max_attempts(), 1);
        assert_eq!(config.effective_concurrency(), 1);
    }
}
