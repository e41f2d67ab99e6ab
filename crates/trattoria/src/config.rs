//! # Configuration
//!
//! Store configuration is managed by [`confique`], layered in priority order:
//!
//! 1. **Environment variables**: `TRATTORIA_DATA_DIR`, `TRATTORIA_COORD_TOLERANCE`.
//! 2. **Config file**: an optional TOML file passed to [`StoreConfig::load`].
//! 3. **Compiled defaults**: via `#[config(default = ...)]`.
//!
//! ## Available Settings
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | `data_dir` | OS data dir (via `directories`) | Directory holding the four relation files |
//! | `coordinate_tolerance` | `0.0001` | Degrees within which two coordinates are the same point |

use std::path::{Path, PathBuf};

use confique::Config;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

pub const DEFAULT_COORDINATE_TOLERANCE: f64 = 1e-4;

#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StoreConfig {
    /// Directory holding users.csv, restaurants.csv, reviews.csv and favorites.csv.
    #[config(env = "TRATTORIA_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Absolute tolerance, in degrees, for latitude/longitude equality.
    #[config(env = "TRATTORIA_COORD_TOLERANCE", default = 0.0001)]
    pub coordinate_tolerance: f64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            coordinate_tolerance: DEFAULT_COORDINATE_TOLERANCE,
        }
    }
}

impl StoreConfig {
    /// Load from environment, then `file` (if given), then defaults.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder = StoreConfig::builder().env();
        if let Some(path) = file {
            builder = builder.file(path);
        }
        let config = builder.load()?;
        config.validated()
    }

    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: Some(data_dir.into()),
            ..Default::default()
        }
    }

    /// The configured directory, or the OS-appropriate data directory.
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        ProjectDirs::from("com", "trattoria", "trattoria")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .ok_or_else(|| StoreError::Store("Could not determine a data directory".to_string()))
    }

    fn validated(self) -> Result<Self> {
        if !self.coordinate_tolerance.is_finite() || self.coordinate_tolerance < 0.0 {
            return Err(StoreError::Store(format!(
                "coordinate_tolerance must be a non-negative number, got {}",
                self.coordinate_tolerance
            )));
        }
        Ok(self)
    }
}
