//! Core types for the rasterizer

use serde::{Deserialize, Serialize};
use std::ops::Add;
use std::path::Path;


/// RGBA color (0-255 per channel)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    /// All channels zero; what out-of-range texel reads return
    pub const ZERO: Color = Color { r: 0, g: 0, b: 0, a: 0 };
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0, a: 255 };
    pub const WHITE: Color = Color { r: 255, g: 255, b: 255, a: 255 };
    pub const RED: Color = Color { r: 255, g: 0, b: 0, a: 255 };
    pub const GREEN: Color = Color { r: 0, g: 255, b: 0, a: 255 };
    pub const BLUE: Color = Color { r: 0, g: 0, b: 255, a: 255 };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn with_alpha(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Apply shading (multiply by intensity 0.0-1.0)
    pub fn shade(self, intensity: f32) -> Self {
        self.scale(intensity.clamp(0.0, 1.0))
    }

    /// Multiply RGB by an arbitrary factor, saturating at 0 and 255
    pub fn scale(self, factor: f32) -> Self {
        let ch = |c: u8| (c as f32 * factor).clamp(0.0, 255.0) as u8;
        Self {
            r: ch(self.r),
            g: ch(self.g),
            b: ch(self.b),
            a: self.a,
        }
    }

    /// Convert to [u8; 4] for framebuffer
    pub fn to_bytes(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub fn from_bytes(b: [u8; 4]) -> Self {
        Self { r: b[0], g: b[1], b: b[2], a: b[3] }
    }
}

/// Channel-wise saturating sum; alpha is the larger of the two
impl Add for Color {
    type Output = Color;
    fn add(self, o: Color) -> Color {
        Color {
            r: self.r.saturating_add(o.r),
            g: self.g.saturating_add(o.g),
            b: self.b.saturating_add(o.b),
            a: self.a.max(o.a),
        }
    }
}

/// Error type for texture loading
#[derive(Debug)]
pub enum TextureError {
    Image(image::ImageError),
}

impl From<image::ImageError> for TextureError {
    fn from(e: image::ImageError) -> Self {
        TextureError::Image(e)
    }
}

impl std::fmt::Display for TextureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TextureError::Image(e) => write!(f, "Image error: {}", e),
        }
    }
}

impl std::error::Error for TextureError {}

/// Simple texture (array of colors, row 0 at the top)
#[derive(Debug, Clone)]
pub struct Texture {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<Color>,
    pub name: String,
}

impl Texture {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![Color::WHITE; width * height],
            name: String::new(),
        }
    }

    /// Load a texture from any format the `image` crate decodes (TGA, PNG,
    /// JPEG, BMP). TGA origin bits are honored, so row 0 is always the top.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TextureError> {
        let path = path.as_ref();
        let mut texture = Self::from_rgba8(&image::open(path)?.to_rgba8());
        texture.name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok(texture)
    }

    fn from_rgba8(rgba: &image::RgbaImage) -> Self {
        let (width, height) = rgba.dimensions();
        let mut texture = Self::new(width as usize, height as usize);
        for (x, y, p) in rgba.enumerate_pixels() {
            texture.set_pixel(x as i32, y as i32, Color::with_alpha(p[0], p[1], p[2], p[3]));
        }
        texture
    }

    /// Nearest-neighbor sample at normalized coordinates (no filtering,
    /// no wrapping). The texel index is truncated; anything outside the
    /// image reads as [`Color::ZERO`].
    pub fn sample(&self, u: f32, v: f32) -> Color {
        let tx = (u * self.width as f32) as i32;
        let ty = (v * self.height as f32) as i32;
        self.get_pixel(tx, ty)
    }

    /// Get pixel at x,y coordinates
    pub fn get_pixel(&self, x: i32, y: i32) -> Color {
        if x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height {
            self.pixels[y as usize * self.width + x as usize]
        } else {
            Color::ZERO
        }
    }

    /// Set pixel at x,y coordinates; `false` (and no write) outside the image
    pub fn set_pixel(&mut self, x: i32, y: i32, color: Color) -> bool {
        if x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height {
            self.pixels[y as usize * self.width + x as usize] = color;
            true
        } else {
            false
        }
    }
}

/// Which depth wins the depth test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DepthCompare {
    /// Smaller screen z is nearer (standard projection + viewport)
    Less,
    /// Larger screen z is nearer
    Greater,
}

impl DepthCompare {
    pub fn passes(self, z: f32, stored: f32) -> bool {
        match self {
            DepthCompare::Less => z < stored,
            DepthCompare::Greater => z > stored,
        }
    }

    /// Clear value that any finite depth beats
    pub fn sentinel(self) -> f32 {
        match self {
            DepthCompare::Less => f32::MAX,
            DepthCompare::Greater => -f32::MAX,
        }
    }
}

/// Rasterizer settings
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RasterSettings {
    /// Use Z-buffer (false = painter's algorithm, last triangle wins)
    pub depth_test: bool,
    pub depth_compare: DepthCompare,
    /// Color written by `clear`
    pub clear_color: Color,
}

impl Default for RasterSettings {
    fn default() -> Self {
        Self {
            depth_test: true,
            depth_compare: DepthCompare::Less,
            clear_color: Color::ZERO,
        }
    }
}
