//! Graph reader configuration.
//!
//! Read from JSON with serde; every field has a default, so `{}` is a valid
//! configuration:
//!
//! ```json
//! {
//!   "max_cache_size": 1073741824,
//!   "tile_dir": "/data/tiles",
//!   "levels": [
//!     { "level": 0, "name": "highway", "tile_size": 4.0 },
//!     { "level": 1, "name": "arterial", "tile_size": 1.0 },
//!     { "level": 2, "name": "local", "tile_size": 0.25 }
//!   ],
//!   "transit_level": { "level": 3, "name": "transit", "tile_size": 0.25 }
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cache::DEFAULT_MAX_CACHE_SIZE;
use crate::graph::{TileHierarchy, TileLevel, MAX_LEVEL};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to read configuration {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Settings for a [`GraphReader`](crate::reader::GraphReader).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphReaderConfig {
    /// Resident tile budget in bytes.
    pub max_cache_size: usize,

    /// Root of a tile directory, for readers that load from disk.
    pub tile_dir: Option<PathBuf>,

    /// Road hierarchy levels.
    pub levels: Vec<TileLevel>,

    pub transit_level: TileLevel,
}

impl Default for GraphReaderConfig {
    fn default() -> Self {
        Self {
            max_cache_size: DEFAULT_MAX_CACHE_SIZE,
            tile_dir: None,
            levels: TileLevel::default_levels(),
            transit_level: TileLevel::default_transit_level(),
        }
    }
}

impl GraphReaderConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Set the resident tile budget.
    pub fn with_max_cache_size(mut self, max_cache_size: usize) -> Self {
        self.max_cache_size = max_cache_size;
        self
    }

    /// Set the tile directory.
    pub fn with_tile_dir(mut self, tile_dir: impl Into<PathBuf>) -> Self {
        self.tile_dir = Some(tile_dir.into());
        self
    }

    /// Check the hierarchy description.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.levels.is_empty() {
            return Err(ConfigError::Invalid("no road levels".to_string()));
        }
        let all_levels = self.levels.iter().chain(std::iter::once(&self.transit_level));
        let mut seen = Vec::new();
        for level in all_levels {
            if !(level.tile_size.is_finite() && level.tile_size > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "level {} has tile size {}",
                    level.level, level.tile_size
                )));
            }
            if level.level > MAX_LEVEL {
                return Err(ConfigError::Invalid(format!(
                    "level {} exceeds {}",
                    level.level, MAX_LEVEL
                )));
            }
            if seen.contains(&level.level) {
                return Err(ConfigError::Invalid(format!(
                    "level {} is defined twice",
                    level.level
                )));
            }
            seen.push(level.level);
        }
        Ok(())
    }

    /// Build the tile hierarchy the configuration describes.
    pub fn hierarchy(&self) -> Result<TileHierarchy, ConfigError> {
        self.validate()?;
        TileHierarchy::new(self.levels.clone(), self.transit_level.clone())
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}
