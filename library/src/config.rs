//! Canvas behaviour options, loadable from TOML.

use directories::ProjectDirs;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::CanvasError;
use crate::model::DiagramModel;

pub const KEY_BACKSPACE: u32 = 8;
pub const KEY_DELETE: u32 = 46;

const CONFIG_FILE_NAME: &str = "canvas.toml";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct CanvasConfig {
    /// Keep links whose source or target is still unresolved after a drag.
    pub allow_loose_links: bool,
    pub allow_canvas_translation: bool,
    pub allow_canvas_zoom: bool,
    /// Flip the wheel direction for zooming.
    pub inverse_zoom: bool,
    /// Maximum number of points a link may carry; `None` means unbounded.
    pub max_points_per_link: Option<usize>,
    /// Grid snap size in world units; 0 disables snapping.
    pub grid_size: f64,
    /// Key codes that delete the current selection on key release.
    pub delete_keys: Vec<u32>,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            allow_loose_links: true,
            allow_canvas_translation: true,
            allow_canvas_zoom: true,
            inverse_zoom: false,
            max_points_per_link: None,
            grid_size: 0.0,
            delete_keys: vec![KEY_DELETE, KEY_BACKSPACE],
        }
    }
}

impl CanvasConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, CanvasError> {
        let config: CanvasConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, CanvasError> {
        let source = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&source)?;
        info!("Loaded canvas config from {}", path.display());
        Ok(config)
    }

    /// Load `canvas.toml` from the platform config directory, falling back
    /// to defaults when it is missing or unreadable.
    pub fn load_or_default() -> Self {
        let Some(path) = default_config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!("Failed to load canvas config {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Push the model-side settings (currently the grid) onto a diagram.
    pub fn apply_to(&self, model: &mut DiagramModel) {
        model.set_grid_size(self.grid_size);
    }

    pub fn is_delete_key(&self, key_code: u32) -> bool {
        self.delete_keys.contains(&key_code)
    }

    fn validate(&self) -> Result<(), CanvasError> {
        if !self.grid_size.is_finite() || self.grid_size < 0.0 {
            return Err(CanvasError::config(format!(
                "grid_size must be a non-negative number, got {}",
                self.grid_size
            )));
        }
        if self.max_points_per_link.is_some_and(|max| max < 2) {
            return Err(CanvasError::config("max_points_per_link must be at least 2"));
        }
        Ok(())
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("org", "diagram-canvas", "diagram_canvas")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}
