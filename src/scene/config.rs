//! Viewer configuration
//!
//! Uses RON (Rusty Object Notation) for human-readable config files.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::rasterizer::shader::ShaderKind;
use crate::rasterizer::{Color, DepthCompare, Vec3};

/// Error type for config loading
#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    ParseError(ron::error::SpannedError),
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::IoError(e)
    }
}

impl From<ron::error::SpannedError> for ConfigError {
    fn from(e: ron::error::SpannedError) -> Self {
        ConfigError::ParseError(e)
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::ParseError(e) => write!(f, "Parse error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Camera start state
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    /// Vertical field of view in degrees
    pub zoom: f32,
    pub speed: f32,
    pub sensitivity: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 3.0),
            yaw: super::camera::YAW,
            pitch: super::camera::PITCH,
            zoom: super::camera::ZOOM,
            speed: super::camera::SPEED,
            sensitivity: super::camera::SENSITIVITY,
        }
    }
}

/// Everything the viewer needs at startup. Missing fields take their defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Framebuffer (and window) size in pixels
    pub width: usize,
    pub height: usize,

    /// OBJ mesh; `None` renders the built-in cube
    pub model: Option<PathBuf>,
    pub diffuse_map: Option<PathBuf>,
    pub normal_map: Option<PathBuf>,
    pub specular_map: Option<PathBuf>,

    pub model_position: Vec3,
    /// Initial rotation about +y, radians
    pub model_angle: f32,

    pub camera: CameraConfig,
    pub light: Vec3,

    pub near: f32,
    pub far: f32,

    pub depth_test: bool,
    pub depth_compare: DepthCompare,
    pub clear_color: Color,
    pub shader: ShaderKind,
    pub show_axes: bool,
    pub show_wireframe: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            model: None,
            diffuse_map: None,
            normal_map: None,
            specular_map: None,
            model_position: Vec3::ZERO,
            model_angle: 0.0,
            camera: CameraConfig::default(),
            light: Vec3::new(1.0, 1.0, 1.0),
            near: 0.1,
            far: 100.0,
            depth_test: true,
            depth_compare: DepthCompare::Less,
            clear_color: Color::ZERO,
            shader: ShaderKind::Diffuse,
            show_axes: true,
            show_wireframe: false,
        }
    }
}

/// Load a config from a RON file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ViewerConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    load_config_from_str(&contents)
}

/// Load a config from a RON string
pub fn load_config_from_str(s: &str) -> Result<ViewerConfig, ConfigError> {
    Ok(ron::from_str(s)?)
}

/// Load `path` if given, falling back to defaults (with a warning) on any
/// failure
pub fn load_config_or_default(path: Option<&Path>) -> ViewerConfig {
    let Some(path) = path else {
        return ViewerConfig::default();
    };
    match load_config(path) {
        Ok(config) => {
            log::info!("Loaded config {}", path.display());
            config
        }
        Err(e) => {
            log::warn!("Failed to load config {}: {}, using defaults", path.display(), e);
            ViewerConfig::default()
        }
    }
}
