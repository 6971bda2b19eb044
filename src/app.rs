//! Viewer state and per-frame update
//!
//! The window loop samples input into a [`FrameInput`] and hands it to
//! [`Viewer::update`], which moves the camera and model, applies toggles,
//! rebuilds the transforms and renders one frame into the framebuffer.

use crate::rasterizer::shader::{ShaderContext, ShaderKind, ShaderSet};
use crate::rasterizer::{
    perspective, rotate, translate, viewport, Color, DrawStats, Framebuffer, RasterSettings, Rasterizer, Transforms,
    Vec3,
};
use crate::scene::{Movement, Scene, ViewerConfig};

/// Model spin speed for Q/E, radians per second
const ROTATE_SPEED: f32 = 1.5;
const AXIS_LENGTH: f32 = 1.5;
const WIREFRAME_COLOR: Color = Color { r: 255, g: 255, b: 0, a: 255 };

/// Input sampled for one frame
#[derive(Debug, Clone, Default)]
pub struct FrameInput {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    /// Mouse movement in pixels while looking around
    pub look: (f32, f32),
    pub scroll: f32,
    /// -1, 0 or +1: spin the model about +y
    pub rotate: f32,
    pub toggle_depth: bool,
    pub toggle_wireframe: bool,
    pub select_shader: Option<ShaderKind>,
    pub quit: bool,
}

pub struct Viewer {
    pub scene: Scene,
    rasterizer: Rasterizer,
    transforms: Transforms,
    shaders: ShaderSet,
    active: ShaderKind,
    show_axes: bool,
    show_wireframe: bool,
    width: usize,
    height: usize,
    near: f32,
    far: f32,
    running: bool,
    stats: DrawStats,
}

impl Viewer {
    pub fn new(config: &ViewerConfig, scene: Scene) -> Self {
        let settings = RasterSettings {
            depth_test: config.depth_test,
            depth_compare: config.depth_compare,
            clear_color: config.clear_color,
        };

        let mut viewer = Self {
            scene,
            rasterizer: Rasterizer::new(config.width, config.height, settings),
            transforms: Transforms::default(),
            shaders: ShaderSet::new(),
            active: config.shader,
            show_axes: config.show_axes,
            show_wireframe: config.show_wireframe,
            width: config.width,
            height: config.height,
            near: config.near,
            far: config.far,
            running: true,
            stats: DrawStats::default(),
        };
        viewer.rebuild_transforms();
        viewer
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        self.rasterizer.framebuffer()
    }

    pub fn active_shader(&self) -> ShaderKind {
        self.active
    }

    pub fn depth_test(&self) -> bool {
        self.rasterizer.settings().depth_test
    }

    pub fn show_wireframe(&self) -> bool {
        self.show_wireframe
    }

    /// Counters from the last rendered frame
    pub fn stats(&self) -> DrawStats {
        self.stats
    }

    /// False once quit has been requested
    pub fn running(&self) -> bool {
        self.running
    }

    /// Apply `input` over `dt` seconds, then render a frame
    pub fn update(&mut self, input: &FrameInput, dt: f32) {
        if input.quit {
            self.running = false;
            return;
        }

        self.apply_input(input, dt);
        self.rebuild_transforms();
        self.render();
    }

    fn apply_input(&mut self, input: &FrameInput, dt: f32) {
        let camera = &mut self.scene.camera;
        let moves = [
            (input.forward, Movement::Forward),
            (input.backward, Movement::Backward),
            (input.left, Movement::Left),
            (input.right, Movement::Right),
        ];
        for (pressed, direction) in moves {
            if pressed {
                camera.process_keyboard(direction, dt);
            }
        }

        let (dx, dy) = input.look;
        if dx != 0.0 || dy != 0.0 {
            camera.process_mouse_movement(dx, dy, true);
        }
        if input.scroll != 0.0 {
            camera.process_mouse_scroll(input.scroll);
        }

        self.scene.node.angle += input.rotate * ROTATE_SPEED * dt;

        if input.toggle_depth {
            let enabled = !self.rasterizer.settings().depth_test;
            self.rasterizer.set_depth_test(enabled);
            log::info!("Depth test {}", if enabled { "on" } else { "off" });
        }

        if input.toggle_wireframe {
            self.show_wireframe = !self.show_wireframe;
        }

        if let Some(kind) = input.select_shader {
            if kind != self.active {
                self.active = kind;
                log::info!("Shader: {}", kind.label());
            }
        }
    }

    fn rebuild_transforms(&mut self) {
        let node = &self.scene.node;
        let camera = &self.scene.camera;
        let aspect = self.width as f32 / self.height.max(1) as f32;

        self.transforms = Transforms::new(
            translate(node.position) * rotate(Vec3::UP, node.angle),
            camera.view_matrix(),
            perspective(camera.zoom, aspect, self.near, self.far),
            viewport(0, 0, self.width as i32, self.height as i32),
        );
    }

    fn render(&mut self) {
        self.rasterizer.clear();

        if self.show_axes {
            self.rasterizer.draw_axes(&self.transforms, AXIS_LENGTH);
        }

        let ctx = ShaderContext {
            model: &self.scene.node.model,
            transforms: &self.transforms,
            light: self.scene.light,
            eye: self.scene.camera.position,
        };
        self.stats = self.rasterizer.draw_model(&ctx, self.shaders.get_mut(self.active));

        if self.show_wireframe {
            self.rasterizer.wireframe(&ctx, WIREFRAME_COLOR);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> ViewerConfig {
        ViewerConfig {
            width: 64,
            height: 48,
            ..ViewerConfig::default()
        }
    }

    fn viewer() -> Viewer {
        let config = small_config();
        let scene = Scene::from_config(&config);
        Viewer::new(&config, scene)
    }

    #[test]
    fn test_starts_from_config() {
        let v = viewer();
        assert_eq!(v.active_shader(), ShaderKind::Diffuse);
        assert!(v.depth_test());
        assert!(v.running());
        assert_eq!(v.framebuffer().width(), 64);
        assert_eq!(v.framebuffer().height(), 48);
    }

    #[test]
    fn test_every_shader_renders_the_cube() {
        let mut v = viewer();
        for kind in ShaderKind::ALL {
            let input = FrameInput { select_shader: Some(kind), ..FrameInput::default() };
            v.update(&input, 0.016);
            assert_eq!(v.active_shader(), kind);
            assert_eq!(v.stats().triangles, 12);
            assert!(v.stats().fragments > 0, "{:?} drew nothing", kind);
        }
    }

    #[test]
    fn test_toggles() {
        let mut v = viewer();
        let input = FrameInput { toggle_depth: true, toggle_wireframe: true, ..FrameInput::default() };
        v.update(&input, 0.016);
        assert!(!v.depth_test());
        assert!(v.show_wireframe());

        v.update(&input, 0.016);
        assert!(v.depth_test());
        assert!(!v.show_wireframe());
    }

    #[test]
    fn test_rotate_and_move() {
        let mut v = viewer();
        let start = v.scene.camera.position;
        let input = FrameInput { rotate: 1.0, forward: true, ..FrameInput::default() };
        v.update(&input, 0.5);

        assert!((v.scene.node.angle - ROTATE_SPEED * 0.5).abs() < 1e-6);
        assert!((v.scene.camera.position.z - (start.z - 0.5)).abs() < 1e-5);
    }

    #[test]
    fn test_quit_stops_without_rendering() {
        let mut v = viewer();
        v.update(&FrameInput::default(), 0.016);
        let frames = v.stats();

        v.update(&FrameInput { quit: true, rotate: 1.0, ..FrameInput::default() }, 1.0);
        assert!(!v.running());
        assert_eq!(v.scene.node.angle, 0.0);
        assert_eq!(v.stats(), frames);
    }
}
