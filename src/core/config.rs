use serde::{Deserialize, Serialize};

use crate::{
    DEFAULT_CACHE_CAPACITY, DEFAULT_MIN_CONFIDENCE, DEFAULT_REFRESH_FACTOR,
};

/// Tunables for the query intelligence pipeline.
///
/// Constructor-injected into the components that need it; the crate keeps
/// no module-level mutable state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Minimum accepted confidence for fuzzy corrections. Below this the
    /// enhancer falls back to the exact query.
    pub min_confidence: f64,
    /// Keep tokens that exactly match a candidate, and enable the
    /// all-or-nothing exact fallback.
    pub preserve_exact_match: bool,
    /// Allow phonetic (Double Metaphone) matching against candidates.
    pub enable_phonetic: bool,
    /// Total entry capacity of the in-memory cache store.
    pub cache_capacity: usize,
    /// Fraction of a strategy TTL after which a pre-expiry refresh signal
    /// fires.
    pub refresh_factor: f64,
    /// Max results kept after ranking. 0 means unlimited.
    pub max_results: usize,
}

impl PipelineConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            preserve_exact_match: true,
            enable_phonetic: true,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            refresh_factor: DEFAULT_REFRESH_FACTOR,
            max_results: 0,
        }
    }

    /// Build a config from `DOCQUERY_*` environment variables, falling
    /// back to defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let mut config = Self::new();

        if let Ok(v) = std::env::var("DOCQUERY_MIN_CONFIDENCE") {
            if let Ok(parsed) = v.parse::<f64>() {
                config.min_confidence = parsed.clamp(0.0, 1.0);
            }
        }
        if let Ok(v) = std::env::var("DOCQUERY_PRESERVE_EXACT") {
            config.preserve_exact_match = v != "0" && !v.eq_ignore_ascii_case("false");
        }
        if let Ok(v) = std::env::var("DOCQUERY_ENABLE_PHONETIC") {
            config.enable_phonetic = v != "0" && !v.eq_ignore_ascii_case("false");
        }
        if let Ok(v) = std::env::var("DOCQUERY_CACHE_CAPACITY") {
            if let Ok(parsed) = v.parse::<usize>() {
                if parsed > 0 {
                    config.cache_capacity = parsed;
                }
            }
        }
        if let Ok(v) = std::env::var("DOCQUERY_MAX_RESULTS") {
            if let Ok(parsed) = v.parse::<usize>() {
                config.max_results = parsed;
            }
        }

        config
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert!((config.min_confidence - 0.7).abs() < f64::EPSILON);
        assert!(config.preserve_exact_match);
        assert!(config.cache_capacity > 0);
    }
}
