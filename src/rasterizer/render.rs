//! Framebuffer and triangle rasterization
//!
//! Triangles arrive as three clip-space positions from a shader's vertex
//! stage. They are divided by w, mapped through the viewport, and every
//! integer pixel in their clamped bounding box is tested with barycentric
//! weights. Surviving pixels go through the depth test and then the shader's
//! fragment stage.

use super::math::{barycentric, Vec2, Vec3, Vec4};
use super::shader::{Interpolation, Shader, ShaderContext};
use super::transform::Transforms;
use super::types::{Color, DepthCompare, RasterSettings};
use super::DEGENERATE_AREA_EPSILON;

/// Color and depth targets. Both arrays are indexed `y * width + x`, with
/// row 0 at the bottom of the image.
pub struct Framebuffer {
    pixels: Vec<u8>,   // RGBA, 4 bytes per pixel
    zbuffer: Vec<f32>, // Depth buffer
    width: usize,
    height: usize,
    clear_color: Color,
    clear_depth: f32,
}

impl Framebuffer {
    pub fn new(width: usize, height: usize) -> Self {
        let clear_depth = DepthCompare::Less.sentinel();
        Self {
            pixels: vec![0; width * height * 4],
            zbuffer: vec![clear_depth; width * height],
            width,
            height,
            clear_color: Color::ZERO,
            clear_depth,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Raw RGBA bytes, bottom row first
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn set_clear_color(&mut self, color: Color) {
        self.clear_color = color;
    }

    pub fn set_clear_depth(&mut self, depth: f32) {
        self.clear_depth = depth;
    }

    /// Reset every pixel to the clear color and every depth to the clear depth
    pub fn clear(&mut self) {
        let bytes = self.clear_color.to_bytes();
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&bytes);
        }
        self.zbuffer.fill(self.clear_depth);
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height {
            Some(y as usize * self.width + x as usize)
        } else {
            None
        }
    }

    /// Write a pixel; `false` (and no write) outside the buffer
    pub fn set_pixel(&mut self, x: i32, y: i32, color: Color) -> bool {
        let Some(idx) = self.index(x, y) else {
            return false;
        };
        self.pixels[idx * 4..idx * 4 + 4].copy_from_slice(&color.to_bytes());
        true
    }

    pub fn get_pixel(&self, x: i32, y: i32) -> Option<Color> {
        let idx = self.index(x, y)?;
        let p = &self.pixels[idx * 4..idx * 4 + 4];
        Some(Color::from_bytes([p[0], p[1], p[2], p[3]]))
    }

    pub fn get_depth(&self, x: i32, y: i32) -> Option<f32> {
        self.index(x, y).map(|idx| self.zbuffer[idx])
    }

    pub fn set_depth(&mut self, x: i32, y: i32, z: f32) -> bool {
        let Some(idx) = self.index(x, y) else {
            return false;
        };
        self.zbuffer[idx] = z;
        true
    }

    /// Draw a line from (x0, y0) to (x1, y1) using Bresenham's algorithm.
    /// Ignores depth; off-screen parts are skipped.
    pub fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Color) {
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        let mut x = x0;
        let mut y = y0;

        loop {
            self.set_pixel(x, y, color);

            if x == x1 && y == y1 {
                break;
            }

            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }
}

/// Counters for one `draw_model` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawStats {
    pub triangles: usize,
    /// Triangles dropped for (near) zero screen area
    pub degenerate: usize,
    /// Pixels whose color was written
    pub fragments: usize,
}

/// Owns the framebuffer and turns clip-space triangles into pixels
pub struct Rasterizer {
    fb: Framebuffer,
    settings: RasterSettings,
}

impl Rasterizer {
    pub fn new(width: usize, height: usize, settings: RasterSettings) -> Self {
        let mut fb = Framebuffer::new(width, height);
        fb.set_clear_color(settings.clear_color);
        fb.set_clear_depth(settings.depth_compare.sentinel());
        fb.clear();
        Self { fb, settings }
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.fb
    }

    pub fn settings(&self) -> &RasterSettings {
        &self.settings
    }

    pub fn set_depth_test(&mut self, enabled: bool) {
        self.settings.depth_test = enabled;
    }

    /// Also switches the depth clear value, so takes effect from the next clear
    pub fn set_depth_compare(&mut self, compare: DepthCompare) {
        self.settings.depth_compare = compare;
        self.fb.set_clear_depth(compare.sentinel());
    }

    pub fn clear(&mut self) {
        self.fb.clear();
    }

    /// Rasterize one triangle given its clip-space corners, returning the
    /// number of pixels colored
    pub fn triangle(&mut self, clip: [Vec4; 3], ctx: &ShaderContext, shader: &dyn Shader) -> usize {
        self.rasterize(clip, ctx, shader).unwrap_or(0)
    }

    /// `None` when the triangle is rejected as degenerate
    fn rasterize(&mut self, clip: [Vec4; 3], ctx: &ShaderContext, shader: &dyn Shader) -> Option<usize> {
        let viewport = ctx.transforms.viewport;
        let pts: [Vec3; 3] = clip.map(|c| (viewport * Vec4::from_vec3(c.project(), 1.0)).xyz());

        let area = (pts[1] - pts[0]).cross(pts[2] - pts[0]).z;
        if !(area.abs() >= DEGENERATE_AREA_EPSILON) {
            return None;
        }

        if self.fb.width == 0 || self.fb.height == 0 {
            return Some(0);
        }
        let max_x = (self.fb.width - 1) as f32;
        let max_y = (self.fb.height - 1) as f32;

        let bx0 = pts[0].x.min(pts[1].x).min(pts[2].x).floor().max(0.0) as i32;
        let bx1 = pts[0].x.max(pts[1].x).max(pts[2].x).ceil().min(max_x) as i32;
        let by0 = pts[0].y.min(pts[1].y).min(pts[2].y).floor().max(0.0) as i32;
        let by1 = pts[0].y.max(pts[1].y).max(pts[2].y).ceil().min(max_y) as i32;

        let perspective = shader.interpolation() == Interpolation::PerspectiveCorrect;
        let compare = self.settings.depth_compare;
        let mut written = 0;

        for y in by0..=by1 {
            for x in bx0..=bx1 {
                let Some(bc) = barycentric(&pts, Vec2::new(x as f32, y as f32), DEGENERATE_AREA_EPSILON) else {
                    continue;
                };
                // Also rejects NaN weights
                if !(bc.x >= 0.0 && bc.y >= 0.0 && bc.z >= 0.0) {
                    continue;
                }

                let z = bc.x * pts[0].z + bc.y * pts[1].z + bc.z * pts[2].z;
                let idx = y as usize * self.fb.width + x as usize;

                if self.settings.depth_test && !compare.passes(z, self.fb.zbuffer[idx]) {
                    continue;
                }
                self.fb.zbuffer[idx] = z;

                let weights = if perspective {
                    let w = Vec3::new(bc.x / clip[0].w, bc.y / clip[1].w, bc.z / clip[2].w);
                    w / (w.x + w.y + w.z)
                } else {
                    bc
                };

                if let Some(color) = shader.fragment(ctx, weights) {
                    self.fb.pixels[idx * 4..idx * 4 + 4].copy_from_slice(&color.to_bytes());
                    written += 1;
                }
            }
        }

        Some(written)
    }

    /// Draw every face of `ctx.model` with `shader`
    pub fn draw_model(&mut self, ctx: &ShaderContext, shader: &mut dyn Shader) -> DrawStats {
        let mut stats = DrawStats::default();
        shader.init(ctx);

        for face in 0..ctx.model.face_count() {
            let clip = [0, 1, 2].map(|corner| shader.vertex(ctx, face, corner));
            stats.triangles += 1;
            match self.rasterize(clip, ctx, &*shader) {
                Some(n) => stats.fragments += n,
                None => stats.degenerate += 1,
            }
        }

        log::trace!(
            "{}: {} triangles ({} degenerate), {} fragments",
            shader.name(),
            stats.triangles,
            stats.degenerate,
            stats.fragments
        );
        stats
    }

    /// Outline every face of `ctx.model`, ignoring depth
    pub fn wireframe(&mut self, ctx: &ShaderContext, color: Color) {
        let t = ctx.transforms;
        let to_screen = t.viewport * t.mvp;

        for face in 0..ctx.model.face_count() {
            let pts = [0, 1, 2].map(|corner| {
                let idx = ctx.model.corner(face, corner);
                self.to_pixel(to_screen * Vec4::from_vec3(ctx.model.position(idx.position), 1.0))
            });
            for i in 0..3 {
                if let (Some(a), Some(b)) = (pts[i], pts[(i + 1) % 3]) {
                    self.fb.draw_line(a.0, a.1, b.0, b.1, color);
                }
            }
        }
    }

    /// World X/Y/Z axes from the origin, in red/green/blue
    pub fn draw_axes(&mut self, transforms: &Transforms, length: f32) {
        let to_screen = transforms.viewport * transforms.projection * transforms.view;
        let Some(origin) = self.to_pixel(to_screen * Vec4::new(0.0, 0.0, 0.0, 1.0)) else {
            return;
        };

        let axes = [
            (Vec3::new(length, 0.0, 0.0), Color::RED),
            (Vec3::new(0.0, length, 0.0), Color::GREEN),
            (Vec3::new(0.0, 0.0, length), Color::BLUE),
        ];
        for (end, color) in axes {
            if let Some(p) = self.to_pixel(to_screen * Vec4::from_vec3(end, 1.0)) {
                self.fb.draw_line(origin.0, origin.1, p.0, p.1, color);
            }
        }
    }

    /// Pixel position of a screen-space homogeneous point. Points behind the
    /// eye or far outside the buffer give `None` so line walks stay short.
    fn to_pixel(&self, p: Vec4) -> Option<(i32, i32)> {
        if !(p.w > 0.0) {
            return None;
        }
        let s = p.project();
        let limit_x = 4.0 * self.fb.width as f32;
        let limit_y = 4.0 * self.fb.height as f32;
        if !(s.x.abs() <= limit_x && s.y.abs() <= limit_y) {
            return None;
        }
        Some((s.x as i32, s.y as i32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rasterizer::shader::SolidShader;
    use crate::rasterizer::{look_at, perspective, viewport, Mat4};
    use crate::scene::Model;

    struct DiscardShader;

    impl Shader for DiscardShader {
        fn name(&self) -> &'static str {
            "discard"
        }

        fn vertex(&mut self, _ctx: &ShaderContext, _face: usize, _corner: usize) -> Vec4 {
            Vec4::default()
        }

        fn fragment(&self, _ctx: &ShaderContext, _bc: Vec3) -> Option<Color> {
            None
        }
    }

    /// Returns the perspective-corrected weights as a color
    struct WeightShader;

    impl Shader for WeightShader {
        fn name(&self) -> &'static str {
            "weights"
        }

        fn interpolation(&self) -> Interpolation {
            Interpolation::PerspectiveCorrect
        }

        fn vertex(&mut self, _ctx: &ShaderContext, _face: usize, _corner: usize) -> Vec4 {
            Vec4::default()
        }

        fn fragment(&self, _ctx: &ShaderContext, bc: Vec3) -> Option<Color> {
            Some(Color::new((bc.x * 255.0) as u8, (bc.y * 255.0) as u8, (bc.z * 255.0) as u8))
        }
    }

    fn no_depth_test() -> RasterSettings {
        RasterSettings { depth_test: false, ..RasterSettings::default() }
    }

    fn tri(a: (f32, f32), b: (f32, f32), c: (f32, f32), z: f32) -> [Vec4; 3] {
        [a, b, c].map(|(x, y)| Vec4::new(x, y, z, 1.0))
    }

    /// Two triangles together covering the whole `size` x `size` buffer
    fn full_cover(size: f32, z: f32) -> [[Vec4; 3]; 2] {
        [
            tri((-1.0, -1.0), (size + 1.0, -1.0), (-1.0, size + 1.0), z),
            tri((size + 1.0, -1.0), (size + 1.0, size + 1.0), (-1.0, size + 1.0), z),
        ]
    }

    fn covered(fb: &Framebuffer, color: Color) -> Vec<(i32, i32)> {
        let mut out = Vec::new();
        for y in 0..fb.height() as i32 {
            for x in 0..fb.width() as i32 {
                if fb.get_pixel(x, y) == Some(color) {
                    out.push((x, y));
                }
            }
        }
        out
    }

    #[test]
    fn test_right_triangle_coverage() {
        let model = Model::default();
        let t = Transforms::default();
        let ctx = ShaderContext { model: &model, transforms: &t, light: Vec3::ZERO, eye: Vec3::ZERO };

        let mut r = Rasterizer::new(20, 20, no_depth_test());
        let written = r.triangle(tri((0.0, 0.0), (10.0, 0.0), (0.0, 10.0), 0.0), &ctx, &SolidShader::new(Color::RED));

        let mut expected = Vec::new();
        for y in 0..=10 {
            for x in 0..=(10 - y) {
                expected.push((x, y));
            }
        }
        expected.sort_by_key(|&(x, y)| (y, x));

        assert_eq!(written, 66);
        assert_eq!(covered(r.framebuffer(), Color::RED), expected);
    }

    #[test]
    fn test_depth_test_resolves_regardless_of_order() {
        let model = Model::default();
        let t = Transforms::default();
        let ctx = ShaderContext { model: &model, transforms: &t, light: Vec3::ZERO, eye: Vec3::ZERO };
        let near = SolidShader::new(Color::RED);
        let far = SolidShader::new(Color::BLUE);

        for near_first in [true, false] {
            let mut r = Rasterizer::new(8, 8, RasterSettings::default());
            let order: [(f32, &SolidShader); 2] =
                if near_first { [(0.2, &near), (0.8, &far)] } else { [(0.8, &far), (0.2, &near)] };

            for (z, shader) in order {
                for clip in full_cover(8.0, z) {
                    r.triangle(clip, &ctx, shader);
                }
            }
            assert_eq!(covered(r.framebuffer(), Color::RED).len(), 64, "near_first = {}", near_first);
            let depth = r.framebuffer().get_depth(3, 3).unwrap();
            assert!((depth - 0.2).abs() < 1e-5);
        }
    }

    #[test]
    fn test_greater_compare_keeps_larger_depth() {
        let model = Model::default();
        let t = Transforms::default();
        let ctx = ShaderContext { model: &model, transforms: &t, light: Vec3::ZERO, eye: Vec3::ZERO };

        let mut r = Rasterizer::new(4, 4, RasterSettings::default());
        r.set_depth_compare(DepthCompare::Greater);
        r.clear();
        for (z, color) in [(0.8, Color::GREEN), (0.2, Color::RED)] {
            for clip in full_cover(4.0, z) {
                r.triangle(clip, &ctx, &SolidShader::new(color));
            }
        }
        assert_eq!(covered(r.framebuffer(), Color::GREEN).len(), 16);
    }

    #[test]
    fn test_disabled_depth_test_last_wins() {
        let model = Model::default();
        let t = Transforms::default();
        let ctx = ShaderContext { model: &model, transforms: &t, light: Vec3::ZERO, eye: Vec3::ZERO };

        let mut r = Rasterizer::new(8, 8, no_depth_test());
        for (z, color) in [(0.2, Color::RED), (0.8, Color::BLUE)] {
            for clip in full_cover(8.0, z) {
                r.triangle(clip, &ctx, &SolidShader::new(color));
            }
        }
        assert_eq!(covered(r.framebuffer(), Color::BLUE).len(), 64);
    }

    #[test]
    fn test_clear_resets_color_and_depth() {
        let model = Model::default();
        let t = Transforms::default();
        let ctx = ShaderContext { model: &model, transforms: &t, light: Vec3::ZERO, eye: Vec3::ZERO };

        let settings = RasterSettings { clear_color: Color::new(1, 2, 3), ..RasterSettings::default() };
        let mut r = Rasterizer::new(6, 5, settings);
        for clip in full_cover(6.0, 0.5) {
            r.triangle(clip, &ctx, &SolidShader::new(Color::WHITE));
        }
        r.clear();

        let fb = r.framebuffer();
        for y in 0..5 {
            for x in 0..6 {
                assert_eq!(fb.get_pixel(x, y), Some(Color::new(1, 2, 3)));
                assert_eq!(fb.get_depth(x, y), Some(f32::MAX));
            }
        }
    }

    #[test]
    fn test_degenerate_triangles_write_nothing() {
        let model = Model::default();
        let t = Transforms::default();
        let ctx = ShaderContext { model: &model, transforms: &t, light: Vec3::ZERO, eye: Vec3::ZERO };
        let shader = SolidShader::new(Color::RED);

        let mut r = Rasterizer::new(10, 10, RasterSettings::default());
        let collinear = tri((1.0, 1.0), (5.0, 5.0), (8.0, 8.0), 0.0);
        let repeated = tri((2.0, 3.0), (2.0, 3.0), (7.0, 1.0), 0.0);

        assert_eq!(r.triangle(collinear, &ctx, &shader), 0);
        assert_eq!(r.triangle(repeated, &ctx, &shader), 0);
        assert!(covered(r.framebuffer(), Color::RED).is_empty());
        assert_eq!(r.framebuffer().get_depth(5, 5), Some(f32::MAX));
    }

    #[test]
    fn test_discarded_fragment_still_writes_depth() {
        let model = Model::default();
        let t = Transforms::default();
        let ctx = ShaderContext { model: &model, transforms: &t, light: Vec3::ZERO, eye: Vec3::ZERO };

        let mut r = Rasterizer::new(4, 4, RasterSettings::default());
        let written = r.triangle(full_cover(4.0, 0.3)[0], &ctx, &DiscardShader);

        assert_eq!(written, 0);
        assert_eq!(r.framebuffer().get_pixel(0, 0), Some(Color::ZERO));
        let depth = r.framebuffer().get_depth(0, 0).unwrap();
        assert!((depth - 0.3).abs() < 1e-5);
    }

    #[test]
    fn test_perspective_correct_weights_favor_near_corner() {
        let model = Model::default();
        let t = Transforms::default();
        let ctx = ShaderContext { model: &model, transforms: &t, light: Vec3::ZERO, eye: Vec3::ZERO };

        // Same screen triangle as (0,0),(10,0),(0,10), but corner 0 is 4x nearer
        let clip = [
            Vec4::new(0.0, 0.0, 0.0, 1.0),
            Vec4::new(40.0, 0.0, 0.0, 4.0),
            Vec4::new(0.0, 40.0, 0.0, 4.0),
        ];
        let mut r = Rasterizer::new(20, 20, no_depth_test());
        r.triangle(clip, &ctx, &WeightShader);

        // Screen weights at (5,0) are (0.5, 0.5, 0); corrected they become (0.8, 0.2, 0)
        let c = r.framebuffer().get_pixel(5, 0).unwrap();
        assert_eq!(c.r, 204);
        assert_eq!(c.g, 51);
        assert_eq!(c.b, 0);
    }

    #[test]
    fn test_out_of_bounds_access() {
        let mut fb = Framebuffer::new(3, 2);
        assert!(!fb.set_pixel(3, 0, Color::RED));
        assert!(!fb.set_pixel(-1, 1, Color::RED));
        assert!(!fb.set_depth(0, 2, 1.0));
        assert_eq!(fb.get_pixel(0, -1), None);
        assert_eq!(fb.get_depth(7, 7), None);
        assert!(fb.set_pixel(2, 1, Color::RED));
        assert_eq!(fb.get_pixel(2, 1), Some(Color::RED));
    }

    #[test]
    fn test_draw_line_endpoints() {
        let mut fb = Framebuffer::new(10, 10);
        fb.draw_line(1, 1, 8, 4, Color::GREEN);
        assert_eq!(fb.get_pixel(1, 1), Some(Color::GREEN));
        assert_eq!(fb.get_pixel(8, 4), Some(Color::GREEN));
        // Partly off-screen lines clip silently
        fb.draw_line(-5, 0, 15, 0, Color::RED);
        assert_eq!(covered(&fb, Color::RED).len(), 10);
    }

    #[test]
    fn test_draw_cube() {
        let model = Model::cube();
        let t = Transforms::new(
            Mat4::identity(),
            look_at(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::UP),
            perspective(45.0, 1.0, 0.1, 100.0),
            viewport(0, 0, 64, 64),
        );
        let ctx = ShaderContext { model: &model, transforms: &t, light: Vec3::ZERO, eye: Vec3::new(0.0, 0.0, 5.0) };

        let mut r = Rasterizer::new(64, 64, RasterSettings::default());
        let mut shader = SolidShader::new(Color::WHITE);
        let stats = r.draw_model(&ctx, &mut shader);

        assert_eq!(stats.triangles, 12);
        assert!(stats.fragments > 0);
        // Inside the front face (off its diagonal), and an empty corner
        assert_eq!(r.framebuffer().get_pixel(30, 38), Some(Color::WHITE));
        assert_eq!(r.framebuffer().get_pixel(0, 0), Some(Color::ZERO));
    }
}
