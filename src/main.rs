//! Eleanor: software 3D rasterizer
//!
//! Renders a textured mesh entirely on the CPU and shows the result in a
//! macroquad window:
//! - Programmable vertex/fragment shaders (diffuse, Phong, normal mapping)
//! - Z-buffer with a toggle for last-write-wins
//! - Fly-through camera, wireframe and axis overlays
//!
//! Usage: `eleanor [config.ron]`

/// Version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

mod app;
mod logging;
mod rasterizer;
mod scene;

use app::{FrameInput, Viewer};
use logging::{init_logging, LoggingConfig};
use macroquad::prelude::*;
use rasterizer::shader::ShaderKind;
use scene::{load_config_or_default, Scene, ViewerConfig};
use std::path::PathBuf;

const SHADER_KEYS: [KeyCode; 5] = [KeyCode::Key1, KeyCode::Key2, KeyCode::Key3, KeyCode::Key4, KeyCode::Key5];

fn window_conf(config: &ViewerConfig) -> Conf {
    Conf {
        window_title: format!("Eleanor v{}", VERSION),
        window_width: config.width as i32,
        window_height: config.height as i32,
        window_resizable: true,
        ..Default::default()
    }
}

fn main() {
    init_logging(LoggingConfig::default());

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = load_config_or_default(config_path.as_deref());

    log::info!("=== Eleanor v{} ===", VERSION);
    macroquad::Window::from_config(window_conf(&config), run(config));
}

async fn run(config: ViewerConfig) {
    let scene = Scene::from_config(&config);
    let mut viewer = Viewer::new(&config, scene);

    let mut last_mouse = mouse_position();

    loop {
        let input = gather_input(&mut last_mouse);
        viewer.update(&input, get_frame_time());
        if !viewer.running() {
            break;
        }

        clear_background(BLACK);
        present(viewer.framebuffer());

        draw_text(
            &format!(
                "FPS: {} | {} | depth test {} | faces {}",
                get_fps(),
                viewer.active_shader().label(),
                if viewer.depth_test() { "on" } else { "off" },
                viewer.stats().triangles
            ),
            10.0,
            20.0,
            20.0,
            WHITE,
        );

        next_frame().await;
    }

    log::info!("Bye");
}

fn gather_input(last_mouse: &mut (f32, f32)) -> FrameInput {
    let mouse = mouse_position();
    // Look only while the right button is held
    let look = if is_mouse_button_down(MouseButton::Right) {
        (mouse.0 - last_mouse.0, mouse.1 - last_mouse.1)
    } else {
        (0.0, 0.0)
    };
    *last_mouse = mouse;

    let mut rotate = 0.0;
    if is_key_down(KeyCode::Q) {
        rotate -= 1.0;
    }
    if is_key_down(KeyCode::E) {
        rotate += 1.0;
    }

    FrameInput {
        forward: is_key_down(KeyCode::W),
        backward: is_key_down(KeyCode::S),
        left: is_key_down(KeyCode::A),
        right: is_key_down(KeyCode::D),
        look,
        scroll: mouse_wheel().1,
        rotate,
        toggle_depth: is_key_pressed(KeyCode::Z),
        toggle_wireframe: is_key_pressed(KeyCode::X),
        select_shader: SHADER_KEYS
            .iter()
            .position(|&key| is_key_pressed(key))
            .and_then(ShaderKind::from_index),
        quit: is_key_pressed(KeyCode::Escape),
    }
}

/// Blit the framebuffer, scaled to fit the window with its aspect kept
fn present(fb: &rasterizer::Framebuffer) {
    let (fb_w, fb_h) = (fb.width() as f32, fb.height() as f32);
    if fb_w == 0.0 || fb_h == 0.0 {
        return;
    }

    let (screen_w, screen_h) = (screen_width(), screen_height());
    let fb_aspect = fb_w / fb_h;
    let (draw_w, draw_h) = if fb_aspect > screen_w / screen_h {
        (screen_w, screen_w / fb_aspect)
    } else {
        (screen_h * fb_aspect, screen_h)
    };

    let texture = Texture2D::from_rgba8(fb.width() as u16, fb.height() as u16, fb.pixels());
    texture.set_filter(FilterMode::Nearest);

    // Framebuffer row 0 is the bottom row
    draw_texture_ex(
        &texture,
        (screen_w - draw_w) * 0.5,
        (screen_h - draw_h) * 0.5,
        WHITE,
        DrawTextureParams {
            dest_size: Some(Vec2::new(draw_w, draw_h)),
            flip_y: true,
            ..Default::default()
        },
    );
}
