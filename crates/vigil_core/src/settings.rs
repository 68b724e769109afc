//! Key/value settings consumed by the layer.
//!
//! Settings are owned by the embedding application. The layer only reads
//! them, and reads them at the point of use so changes apply to the next call.

use crate::GenerationStyle;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Key holding the remote endpoint API key.
pub const API_KEY: &str = "GEMINI_API_KEY";
/// Key holding the default sampling temperature.
pub const TEMPERATURE: &str = "VIGIL_TEMPERATURE";
/// Key holding the default top-k cutoff.
pub const TOP_K: &str = "VIGIL_TOP_K";
/// Key holding the default top-p cutoff.
pub const TOP_P: &str = "VIGIL_TOP_P";

/// Read-only view of an opaque settings store.
pub trait SettingsStore: Send + Sync {
    /// String value for `key`, if set.
    fn get_string(&self, key: &str) -> Option<String>;

    /// Numeric value for `key`, if set and parseable.
    fn get_f64(&self, key: &str) -> Option<f64> {
        self.get_string(key)?.trim().parse().ok()
    }
}

/// Settings read from process environment variables.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSettings;

impl SettingsStore for EnvSettings {
    fn get_string(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// In-memory settings, for embedding applications and tests.
#[derive(Debug, Default)]
pub struct MemorySettings {
    values: RwLock<HashMap<String, String>>,
}

impl MemorySettings {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Set a value.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.values.write().insert(key.into(), value.into());
    }

    /// Remove a value.
    pub fn remove(&self, key: &str) -> Option<String> {
        self.values.write().remove(key)
    }
}

impl SettingsStore for MemorySettings {
    fn get_string(&self, key: &str) -> Option<String> {
        self.values.read().get(key).cloned()
    }
}

impl GenerationStyle {
    /// Style from the settings store, falling back per field to `fallback`.
    pub fn from_settings(store: &dyn SettingsStore, fallback: GenerationStyle) -> Self {
        let temperature = store
            .get_f64(TEMPERATURE)
            .map_or(*fallback.temperature(), |v| v as f32);
        let top_k = store
            .get_f64(TOP_K)
            .map_or(*fallback.top_k(), |v| v.round().max(1.0) as u32);
        let top_p = store
            .get_f64(TOP_P)
            .map_or(*fallback.top_p(), |v| v as f32);
        GenerationStyle::new(temperature, top_k, top_p)
    }
}
