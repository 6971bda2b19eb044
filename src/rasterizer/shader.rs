//! Programmable shading stages
//!
//! A [`Shader`] has two stages. The vertex stage runs once per triangle corner
//! and returns a clip-space position, storing whatever per-corner data
//! ("varyings") the fragment stage needs in that corner's slot. The fragment
//! stage runs once per covered pixel with the pixel's barycentric weights and
//! blends the three stored slots.
//!
//! Varyings are scratch state: they describe the triangle currently in flight
//! and are overwritten by the next face's vertex calls. Each shader owns its
//! own slots, so switching shaders between frames needs no reset.

use serde::{Deserialize, Serialize};

use super::math::{Mat3, Vec2, Vec3, Vec4};
use super::transform::Transforms;
use super::types::Color;
use crate::scene::Model;

/// Constant inputs for one draw call
pub struct ShaderContext<'a> {
    pub model: &'a Model,
    pub transforms: &'a Transforms,
    /// Light position in world space
    pub light: Vec3,
    /// Camera position in world space
    pub eye: Vec3,
}

/// How the rasterizer derives the weights handed to the fragment stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    /// Screen-space barycentrics as is (linear in screen space, not
    /// perspective-correct)
    Affine,
    /// Weights divided by each corner's clip w and renormalized
    PerspectiveCorrect,
}

pub trait Shader {
    fn name(&self) -> &'static str;

    fn interpolation(&self) -> Interpolation {
        Interpolation::Affine
    }

    /// Runs once per draw call before the first face
    fn init(&mut self, _ctx: &ShaderContext) {}

    /// Clip-space position of `corner` (0-2) of `face`; fills that corner's
    /// varying slots
    fn vertex(&mut self, ctx: &ShaderContext, face: usize, corner: usize) -> Vec4;

    /// Color for barycentric weights `bc`, or `None` to discard the fragment
    fn fragment(&self, ctx: &ShaderContext, bc: Vec3) -> Option<Color>;
}

fn blend3(v: &[Vec3; 3], bc: Vec3) -> Vec3 {
    v[0] * bc.x + v[1] * bc.y + v[2] * bc.z
}

fn blend2(v: &[Vec2; 3], bc: Vec3) -> Vec2 {
    v[0] * bc.x + v[1] * bc.y + v[2] * bc.z
}

fn object_position(ctx: &ShaderContext, face: usize, corner: usize) -> Vec4 {
    let idx = ctx.model.corner(face, corner);
    Vec4::from_vec3(ctx.model.position(idx.position), 1.0)
}

/// Fills every covered pixel with one color
#[derive(Debug, Clone)]
pub struct SolidShader {
    pub color: Color,
}

impl SolidShader {
    pub fn new(color: Color) -> Self {
        Self { color }
    }
}

impl Shader for SolidShader {
    fn name(&self) -> &'static str {
        "solid"
    }

    fn vertex(&mut self, ctx: &ShaderContext, face: usize, corner: usize) -> Vec4 {
        ctx.transforms.mvp * object_position(ctx, face, corner)
    }

    fn fragment(&self, _ctx: &ShaderContext, _bc: Vec3) -> Option<Color> {
        Some(self.color)
    }
}

/// Diffuse texture times N·L, lit in clip space
#[derive(Debug, Clone, Default)]
pub struct DiffuseShader {
    uvs: [Vec2; 3],
    normals: [Vec3; 3],
    light_dir: Vec3,
}

impl Shader for DiffuseShader {
    fn name(&self) -> &'static str {
        "diffuse"
    }

    fn init(&mut self, ctx: &ShaderContext) {
        self.light_dir = (ctx.transforms.mvp * Vec4::from_vec3(ctx.light, 0.0)).xyz().normalize();
    }

    fn vertex(&mut self, ctx: &ShaderContext, face: usize, corner: usize) -> Vec4 {
        let idx = ctx.model.corner(face, corner);
        let n = Vec4::from_vec3(ctx.model.normal(idx.normal), 0.0);

        self.normals[corner] = (ctx.transforms.mvp_it * n).xyz();
        self.uvs[corner] = ctx.model.uv(idx.uv);

        ctx.transforms.mvp * object_position(ctx, face, corner)
    }

    fn fragment(&self, ctx: &ShaderContext, bc: Vec3) -> Option<Color> {
        let n = blend3(&self.normals, bc).normalize();
        let uv = blend2(&self.uvs, bc);

        let diff = n.dot(self.light_dir).max(0.0);
        Some(ctx.model.sample_diffuse(uv).shade(diff))
    }
}

/// Phong lighting in world space: diffuse plus a specular highlight whose
/// exponent comes from the specular map
#[derive(Debug, Clone, Default)]
pub struct PhongShader {
    uvs: [Vec2; 3],
    normals: [Vec3; 3],
    positions: [Vec3; 3],
    normal_matrix: Mat3,
    light_dir: Vec3,
}

impl PhongShader {
    const AMBIENT: u8 = 5;
    const SPECULAR_WEIGHT: f32 = 0.6;
}

impl Shader for PhongShader {
    fn name(&self) -> &'static str {
        "phong"
    }

    fn interpolation(&self) -> Interpolation {
        Interpolation::PerspectiveCorrect
    }

    fn init(&mut self, ctx: &ShaderContext) {
        self.normal_matrix = ctx.transforms.normal_matrix();
        self.light_dir = ctx.light.normalize();
    }

    fn vertex(&mut self, ctx: &ShaderContext, face: usize, corner: usize) -> Vec4 {
        let idx = ctx.model.corner(face, corner);
        let pos = object_position(ctx, face, corner);

        self.positions[corner] = (ctx.transforms.model * pos).xyz();
        self.normals[corner] = self.normal_matrix * ctx.model.normal(idx.normal);
        self.uvs[corner] = ctx.model.uv(idx.uv);

        ctx.transforms.mvp * pos
    }

    fn fragment(&self, ctx: &ShaderContext, bc: Vec3) -> Option<Color> {
        let n = blend3(&self.normals, bc).normalize();
        let uv = blend2(&self.uvs, bc);
        let frag_pos = blend3(&self.positions, bc);

        let l = self.light_dir;
        let v = (ctx.eye - frag_pos).normalize();
        let r = (-l).reflect(n);

        let diff = n.dot(l).max(0.0);
        let exponent = ctx.model.sample_specular(uv);
        // An exponent below 1 (no specular map) means a matte surface
        let spec = if exponent >= 1.0 { r.dot(v).max(0.0).powf(exponent) } else { 0.0 };

        let c = ctx.model.sample_diffuse(uv);
        let ambient = Color::new(Self::AMBIENT, Self::AMBIENT, Self::AMBIENT);
        Some(ambient + c.scale(diff + Self::SPECULAR_WEIGHT * spec))
    }
}

/// Normal mapping in tangent space, with a TBN basis built per corner from the
/// mesh's face tangent. Blinn-Phong on top of a 20% ambient term.
#[derive(Debug, Clone, Default)]
pub struct TangentShader {
    uvs: [Vec2; 3],
    light_positions: [Vec3; 3],
    view_positions: [Vec3; 3],
    frag_positions: [Vec3; 3],
    normal_matrix: Mat3,
}

impl TangentShader {
    const AMBIENT: f32 = 0.2;
    const SHININESS: f32 = 32.0;
    const SPECULAR: Color = Color { r: 32, g: 32, b: 32, a: 255 };
}

impl Shader for TangentShader {
    fn name(&self) -> &'static str {
        "tangent"
    }

    fn init(&mut self, ctx: &ShaderContext) {
        self.normal_matrix = ctx.transforms.normal_matrix();
    }

    fn vertex(&mut self, ctx: &ShaderContext, face: usize, corner: usize) -> Vec4 {
        let idx = ctx.model.corner(face, corner);
        let pos = object_position(ctx, face, corner);
        let frag_pos = (ctx.transforms.model * pos).xyz();

        let n = (self.normal_matrix * ctx.model.normal(idx.normal)).normalize();
        let t = (self.normal_matrix * ctx.model.face_tangent(face)).normalize();
        // Gram-Schmidt: make T orthogonal to N again after interpolation drift
        let t = (t - n * t.dot(n)).normalize();
        let b = n.cross(t);

        // Rows T, B, N: world space -> tangent space
        let tbn = Mat3::from_rows(t, b, n);

        self.uvs[corner] = ctx.model.uv(idx.uv);
        self.light_positions[corner] = tbn * ctx.light;
        self.view_positions[corner] = tbn * ctx.eye;
        self.frag_positions[corner] = tbn * frag_pos;

        ctx.transforms.mvp * pos
    }

    fn fragment(&self, ctx: &ShaderContext, bc: Vec3) -> Option<Color> {
        let uv = blend2(&self.uvs, bc);
        let normal = ctx.model.sample_normal(uv).normalize();

        let frag_pos = blend3(&self.frag_positions, bc);
        let light_dir = (blend3(&self.light_positions, bc) - frag_pos).normalize();
        // Not normalized before the halfway sum
        let view_dir = blend3(&self.view_positions, bc) - frag_pos;

        let color = ctx.model.sample_diffuse(uv);
        let ambient = color.scale(Self::AMBIENT);

        let diff = light_dir.dot(normal).max(0.0);
        let diffuse = color.scale(diff);

        let halfway = (light_dir + view_dir).normalize();
        let spec = normal.dot(halfway).max(0.0).powf(Self::SHININESS);
        let specular = Self::SPECULAR.scale(spec);

        Some(ambient + diffuse + specular)
    }
}

/// Normal mapping without stored tangents: the tangent frame is solved per
/// pixel from how positions and UVs vary across the triangle (screen-space
/// derivatives), around the interpolated normal.
///
/// The vertex stage returns positions already divided by w.
#[derive(Debug, Clone, Default)]
pub struct DerivativeNormalShader {
    uvs: [Vec2; 3],
    normals: [Vec3; 3],
    ndc: [Vec3; 3],
    light_dir: Vec3,
}

impl Shader for DerivativeNormalShader {
    fn name(&self) -> &'static str {
        "derivative normal"
    }

    fn init(&mut self, ctx: &ShaderContext) {
        self.light_dir = (ctx.transforms.mvp * Vec4::from_vec3(ctx.light, 0.0)).xyz().normalize();
    }

    fn vertex(&mut self, ctx: &ShaderContext, face: usize, corner: usize) -> Vec4 {
        let idx = ctx.model.corner(face, corner);
        let clip = ctx.transforms.mvp * object_position(ctx, face, corner);
        let n = Vec4::from_vec3(ctx.model.normal(idx.normal), 0.0);

        self.uvs[corner] = ctx.model.uv(idx.uv);
        self.normals[corner] = (ctx.transforms.mvp_it * n).xyz();
        self.ndc[corner] = clip.project();

        Vec4::from_vec3(self.ndc[corner], 1.0)
    }

    fn fragment(&self, ctx: &ShaderContext, bc: Vec3) -> Option<Color> {
        let bn = blend3(&self.normals, bc).normalize();
        let uv = blend2(&self.uvs, bc);

        let a = Mat3::from_rows(self.ndc[1] - self.ndc[0], self.ndc[2] - self.ndc[0], bn);
        let ai = a.inverse();

        let du = Vec3::new(self.uvs[1].x - self.uvs[0].x, self.uvs[2].x - self.uvs[0].x, 0.0);
        let dv = Vec3::new(self.uvs[1].y - self.uvs[0].y, self.uvs[2].y - self.uvs[0].y, 0.0);
        let i = (ai * du).normalize();
        let j = (ai * dv).normalize();

        let basis = Mat3::from_cols(i, j, bn);
        let n = (basis * ctx.model.sample_normal(uv)).normalize();

        let diff = n.dot(self.light_dir).max(0.0);
        Some(ctx.model.sample_diffuse(uv).shade(diff))
    }
}

/// Selectable shading models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShaderKind {
    Solid = 0,
    Diffuse = 1,
    Phong = 2,
    Tangent = 3,
    DerivativeNormal = 4,
}

impl ShaderKind {
    pub const ALL: [ShaderKind; 5] = [
        ShaderKind::Solid,
        ShaderKind::Diffuse,
        ShaderKind::Phong,
        ShaderKind::Tangent,
        ShaderKind::DerivativeNormal,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ShaderKind::Solid => "Solid",
            ShaderKind::Diffuse => "Diffuse",
            ShaderKind::Phong => "Phong",
            ShaderKind::Tangent => "Tangent-space normal map",
            ShaderKind::DerivativeNormal => "Derivative normal map",
        }
    }

    pub fn from_index(i: usize) -> Option<ShaderKind> {
        ShaderKind::ALL.get(i).copied()
    }
}

/// One instance of every shader, each keeping its own varyings
pub struct ShaderSet {
    solid: SolidShader,
    diffuse: DiffuseShader,
    phong: PhongShader,
    tangent: TangentShader,
    derivative: DerivativeNormalShader,
}

impl ShaderSet {
    pub fn new() -> Self {
        Self {
            solid: SolidShader::new(Color::WHITE),
            diffuse: DiffuseShader::default(),
            phong: PhongShader::default(),
            tangent: TangentShader::default(),
            derivative: DerivativeNormalShader::default(),
        }
    }

    pub fn get_mut(&mut self, kind: ShaderKind) -> &mut dyn Shader {
        match kind {
            ShaderKind::Solid => &mut self.solid,
            ShaderKind::Diffuse => &mut self.diffuse,
            ShaderKind::Phong => &mut self.phong,
            ShaderKind::Tangent => &mut self.tangent,
            ShaderKind::DerivativeNormal => &mut self.derivative,
        }
    }
}

impl Default for ShaderSet {
    fn default() -> Self {
        Self::new()
    }
}
