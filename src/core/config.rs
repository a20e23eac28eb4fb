//! Configuration for the tile resolution pipeline
//!
//! Presets cover the common deployment shapes; anything else can be built by
//! hand or loaded from JSON.

use crate::{Result, TileError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileProviderConfig {
    /// Maximum number of decoded tiles kept in memory (minimum 1)
    pub cache_capacity: usize,
    /// Upper bound for a single provider attempt; `None` waits forever
    pub attempt_timeout: Option<Duration>,
}

impl Default for TileProviderConfig {
    fn default() -> Self {
        Self {
            cache_capacity: 1024,
            attempt_timeout: Some(Duration::from_secs(30)),
        }
    }
}

/// Unified configuration presets for TileProviderConfig
impl TileProviderConfig {
    pub fn low_resource() -> Self {
        Self {
            cache_capacity: 256,
            attempt_timeout: Some(Duration::from_secs(15)),
        }
    }

    pub fn high_performance() -> Self {
        Self {
            cache_capacity: 4096,
            attempt_timeout: Some(Duration::from_secs(60)),
        }
    }

    pub fn for_testing() -> Self {
        Self {
            cache_capacity: 16,
            attempt_timeout: Some(Duration::from_secs(2)),
        }
    }

    /// Parse a configuration from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| TileError::Config(e.to_string()))
    }

    pub fn estimated_memory_usage(&self) -> usize {
        // 256x256 RGBA8
        self.cache_capacity.saturating_mul(256 * 256 * 4)
    }
}
