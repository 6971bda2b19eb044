//! Scene state consumed by the renderer
//!
//! The scene is plain data: one model node, a camera and a light. Asset
//! loading failures are logged and leave the affected resource empty.

mod camera;
mod config;
mod model;

pub use camera::*;
pub use config::*;
pub use model::*;

use crate::rasterizer::Vec3;

/// A model placed in the world
#[derive(Debug, Clone)]
pub struct ModelNode {
    pub model: Model,
    pub position: Vec3,
    /// Rotation about +y, radians
    pub angle: f32,
}

impl ModelNode {
    pub fn new(model: Model, position: Vec3) -> Self {
        Self { model, position, angle: 0.0 }
    }
}

#[derive(Debug, Clone)]
pub struct Scene {
    pub node: ModelNode,
    pub camera: Camera,
    /// Light position; directional shaders use the direction towards it
    pub light: Vec3,
}

impl Scene {
    /// Build the scene described by `config`, loading its assets
    pub fn from_config(config: &ViewerConfig) -> Self {
        let mut model = match &config.model {
            Some(path) => Model::load_obj(path).unwrap_or_else(|e| {
                log::error!("Failed to load model {}: {}", path.display(), e);
                Model::default()
            }),
            None => Model::cube(),
        };
        model.load_textures(
            config.diffuse_map.as_deref(),
            config.normal_map.as_deref(),
            config.specular_map.as_deref(),
        );

        let mut node = ModelNode::new(model, config.model_position);
        node.angle = config.model_angle;

        let cc = &config.camera;
        let mut camera = Camera::new(cc.position, Vec3::UP, cc.yaw, cc.pitch);
        camera.zoom = cc.zoom;
        camera.movement_speed = cc.speed;
        camera.mouse_sensitivity = cc.sensitivity;

        Self {
            node,
            camera,
            light: config.light,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_default_config_uses_cube() {
        let scene = Scene::from_config(&ViewerConfig::default());
        assert_eq!(scene.node.model.face_count(), 12);
        assert_eq!(scene.camera.zoom, ZOOM);
    }

    #[test]
    fn test_missing_assets_leave_empty_resources() {
        let config = ViewerConfig {
            model: Some(PathBuf::from("missing/model.obj")),
            diffuse_map: Some(PathBuf::from("missing/diffuse.tga")),
            ..ViewerConfig::default()
        };
        let scene = Scene::from_config(&config);
        assert_eq!(scene.node.model.face_count(), 0);
        assert!(scene.node.model.diffuse.is_none());
    }
}
