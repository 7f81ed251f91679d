use std::path::{Path, PathBuf};

use glam::{Vec3, Vec4};
use serde::{Deserialize, Serialize};

/// Errors from loading a viewer configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("reading config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing config {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Startup settings. Every field has a default, so a config file only
/// needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub width: u32,
    pub height: u32,
    pub title: String,
    pub clear_color: Vec4,
    pub camera_position: Vec3,
    pub camera_target: Vec3,
    pub camera_up: Vec3,
    /// World units per frame for every camera move.
    pub camera_speed: f32,
    /// Degrees per pixel of mouse drag.
    pub mouse_sensitivity: f32,
    pub shadow_map_size: u32,
    pub intro: bool,
    /// Directory the mesh catalog paths are relative to.
    pub asset_root: PathBuf,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            width: 1366,
            height: 768,
            title: "Room Viewer".into(),
            clear_color: Vec4::new(0.7, 0.7, 0.7, 1.0),
            camera_position: Vec3::new(0.0, 0.0, 3.0),
            camera_target: Vec3::new(0.0, 0.0, -10.0),
            camera_up: Vec3::Y,
            camera_speed: 0.05,
            mouse_sensitivity: 0.1,
            shadow_map_size: 2048,
            intro: true,
            asset_root: PathBuf::from("."),
        }
    }
}

impl ViewerConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = serde_json::from_reader(std::io::BufReader::new(file)).map_err(|source| {
            ConfigError::Json {
                path: path.to_path_buf(),
                source,
            }
        })?;
        tracing::info!(path = %path.display(), "config loaded");
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let file = std::fs::File::create(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::to_writer_pretty(file, self).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}
