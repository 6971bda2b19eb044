//! Software rasterizer
//!
//! Pipeline: a [`Shader`](shader::Shader)'s vertex stage produces clip-space
//! corners, the [`Rasterizer`] maps them to screen space through the
//! [`Transforms`] viewport, covers pixels with barycentric tests, resolves
//! depth and hands surviving pixels to the fragment stage.
//!
//! Features:
//! - Z-buffer with selectable comparison, or last-write-wins
//! - Affine or perspective-correct attribute weights, chosen per shader
//! - Bresenham lines for wireframe and axis overlays

mod math;
mod render;
pub mod shader;
mod transform;
mod types;

pub use math::*;
pub use render::*;
pub use transform::*;
pub use types::*;

/// Doubled screen-space area below which a triangle is skipped
pub const DEGENERATE_AREA_EPSILON: f32 = 1e-3;
