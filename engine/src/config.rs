//! Engine tuning knobs

use serde::{Deserialize, Serialize};

/// Entries per page when the caller does not pin a size
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Largest page a caller may ask for; larger requests are clamped
pub const DEFAULT_MAX_PAGE_SIZE: usize = 200;

/// Shards fetched concurrently while aggregating a letter
pub const DEFAULT_BATCH_WIDTH: usize = 5;

/// Full-letter aggregations kept in memory at once
pub const DEFAULT_LETTER_SLOTS: usize = 1;

/// Memoized pages kept before the least recently used is evicted
pub const DEFAULT_PAGE_SLOTS: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub page_size: usize,
    pub max_page_size: usize,
    pub batch_width: usize,
    pub letter_slots: usize,
    pub page_slots: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            batch_width: DEFAULT_BATCH_WIDTH,
            letter_slots: DEFAULT_LETTER_SLOTS,
            page_slots: DEFAULT_PAGE_SLOTS,
        }
    }
}

impl EngineConfig {
    /// Clamp zero values that would stall pagination or batching
    pub fn sanitized(mut self) -> Self {
        self.page_size = self.page_size.max(1);
        self.max_page_size = self.max_page_size.max(self.page_size);
        self.batch_width = self.batch_width.max(1);
        self.letter_slots = self.letter_slots.max(1);
        self.page_slots = self.page_slots.max(1);
        self
    }

    /// Page size actually served for a requested one
    pub fn clamp_page_size(&self, requested: usize) -> usize {
        requested.clamp(1, self.max_page_size.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"page_size": 20}"#).unwrap();
        assert_eq!(config.page_size, 20);
        assert_eq!(config.max_page_size, DEFAULT_MAX_PAGE_SIZE);
        assert_eq!(config.batch_width, DEFAULT_BATCH_WIDTH);
        assert_eq!(config.letter_slots, DEFAULT_LETTER_SLOTS);
        assert_eq!(config.page_slots, DEFAULT_PAGE_SLOTS);
    }

    #[test]
    fn test_sanitized_clamps_zero() {
        let config = EngineConfig {
            page_size: 0,
            max_page_size: 0,
            batch_width: 0,
            letter_slots: 0,
            page_slots: 0,
        }
        .sanitized();
        assert_eq!(config.page_size, 1);
        assert_eq!(config.max_page_size, 1);
        assert_eq!(config.batch_width, 1);
        assert_eq!(config.letter_slots, 1);
        assert_eq!(config.page_slots, 1);
    }

    #[test]
    fn test_page_size_is_clamped() {
        let config = EngineConfig::default();
        assert_eq!(config.clamp_page_size(0), 1);
        assert_eq!(config.clamp_page_size(30), 30);
        assert_eq!(config.clamp_page_size(1_000_000), DEFAULT_MAX_PAGE_SIZE);

        let wide = EngineConfig {
            page_size: 500,
            ..EngineConfig::default()
        }
        .sanitized();
        assert_eq!(wide.max_page_size, 500);
    }
}
