use crate::cache::OverlayKind;
use crate::error::ConfigError;
use crate::render::{is_valid_scale, TerrainOptions};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Which view a region is rendered as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    #[default]
    Terrain,
    Caves,
    Slice,
}

/// Options for rendering region tiles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderSettings {
    /// Blocks per pixel: 1, 2, 4, 8 or 16
    #[serde(default = "default_scale")]
    pub scale: usize,
    #[serde(default)]
    pub mode: RenderMode,
    /// Separate water surfaces from the ground below (terrain mode)
    #[serde(default = "default_true")]
    pub water: bool,
    /// Highest block Y to draw (None = top of the chunk)
    #[serde(default)]
    pub max_height: Option<i32>,
    /// Block Y drawn in slice mode
    #[serde(default = "default_layer")]
    pub layer: i32,
}

fn default_scale() -> usize {
    1
}
fn default_true() -> bool {
    true
}
fn default_layer() -> i32 {
    64
}
fn default_cache_path() -> PathBuf {
    PathBuf::from("cache.db")
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            scale: default_scale(),
            mode: RenderMode::default(),
            water: default_true(),
            max_height: None,
            layer: default_layer(),
        }
    }
}

impl RenderSettings {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_valid_scale(self.scale) {
            return Err(ConfigError::InvalidScale(self.scale));
        }
        Ok(())
    }

    pub fn terrain_options(&self) -> TerrainOptions {
        TerrainOptions {
            water: self.water,
            max_height: self.max_height,
        }
    }
}

/// Where the overlay cache lives and which overlay tables it starts with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_cache_path")]
    pub path: PathBuf,
    #[serde(default)]
    pub kinds: Vec<OverlayKind>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            path: default_cache_path(),
            kinds: Vec::new(),
        }
    }
}

impl CacheSettings {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}
