//! Matrix builders and the per-frame transform bundle

use super::math::{Mat3, Mat4, Vec3};

/// Upper bound of the screen-space depth range produced by [`viewport`]
pub const DEPTH: f32 = 255.0;

/// Map NDC `[-1, 1]` onto the pixel rectangle `(x, y, w, h)` and depth onto
/// `[0, DEPTH]`. Screen y grows with NDC y, so row 0 is the bottom row.
pub fn viewport(x: i32, y: i32, w: i32, h: i32) -> Mat4 {
    let mut m = Mat4::identity();

    m.m[0][3] = x as f32 + w as f32 / 2.0;
    m.m[1][3] = y as f32 + h as f32 / 2.0;
    m.m[2][3] = DEPTH / 2.0;

    m.m[0][0] = w as f32 / 2.0;
    m.m[1][1] = h as f32 / 2.0;
    m.m[2][2] = DEPTH / 2.0;

    m
}

/// Right-handed view matrix looking from `eye` towards `center`
pub fn look_at(eye: Vec3, center: Vec3, up: Vec3) -> Mat4 {
    let z = (eye - center).normalize();
    let x = up.cross(z).normalize();
    let y = z.cross(x).normalize();

    let mut res = Mat4::identity();
    for i in 0..3 {
        res.m[0][i] = x[i];
        res.m[1][i] = y[i];
        res.m[2][i] = z[i];
    }
    res.m[0][3] = -x.dot(eye);
    res.m[1][3] = -y.dot(eye);
    res.m[2][3] = -z.dot(eye);

    res
}

/// Minimal perspective: identity with `m[3][2] = coeff` (usually `-1/c` for a
/// camera at distance `c` on +z)
pub fn projection(coeff: f32) -> Mat4 {
    let mut m = Mat4::identity();
    m.m[3][2] = coeff;
    m
}

/// OpenGL-style perspective projection. `fovy` is in degrees. NDC depth runs
/// from -1 at `near` to +1 at `far`.
pub fn perspective(fovy: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
    let f = 1.0 / (fovy.to_radians() / 2.0).tan();

    let mut m = Mat4::default();
    m.m[0][0] = f / aspect;
    m.m[1][1] = f;
    m.m[2][2] = (far + near) / (near - far);
    m.m[2][3] = 2.0 * far * near / (near - far);
    m.m[3][2] = -1.0;
    m
}

pub fn scale(x: f32, y: f32, z: f32) -> Mat4 {
    let mut m = Mat4::default();
    m.m[0][0] = x;
    m.m[1][1] = y;
    m.m[2][2] = z;
    m.m[3][3] = 1.0;
    m
}

pub fn translate(v: Vec3) -> Mat4 {
    let mut m = Mat4::identity();
    m.m[0][3] = v.x;
    m.m[1][3] = v.y;
    m.m[2][3] = v.z;
    m
}

/// Rotation of `theta` radians about `axis`, built from the equivalent unit
/// quaternion. A zero axis gives the identity.
pub fn rotate(axis: Vec3, theta: f32) -> Mat4 {
    if axis == Vec3::ZERO {
        return Mat4::identity();
    }

    let (qsin, qcos) = (theta * 0.5).sin_cos();
    let v = axis.normalize();

    let w = qcos;
    let x = v.x * qsin;
    let y = v.y * qsin;
    let z = v.z * qsin;

    let mut m = Mat4::default();
    m.m[0][0] = 1.0 - 2.0 * y * y - 2.0 * z * z;
    m.m[0][1] = 2.0 * x * y - 2.0 * w * z;
    m.m[0][2] = 2.0 * x * z + 2.0 * w * y;
    m.m[1][0] = 2.0 * x * y + 2.0 * w * z;
    m.m[1][1] = 1.0 - 2.0 * x * x - 2.0 * z * z;
    m.m[1][2] = 2.0 * y * z - 2.0 * w * x;
    m.m[2][0] = 2.0 * x * z - 2.0 * w * y;
    m.m[2][1] = 2.0 * y * z + 2.0 * w * x;
    m.m[2][2] = 1.0 - 2.0 * x * x - 2.0 * y * y;
    m.m[3][3] = 1.0;
    m
}

/// Matrices for one frame. Rebuilt from camera and scene state every frame;
/// call [`Transforms::update`] after changing any input matrix.
#[derive(Debug, Clone, Copy)]
pub struct Transforms {
    pub model: Mat4,
    pub view: Mat4,
    pub projection: Mat4,
    pub viewport: Mat4,

    /// projection * view * model
    pub mvp: Mat4,
    /// Inverse-transpose of `mvp`, for carrying normals into clip space.
    ///
    /// Computed with the affine-only [`Mat4::inverse`], so with a real
    /// perspective projection this ignores the projective row. Shaders that
    /// light in clip space accept that approximation.
    pub mvp_it: Mat4,
}

impl Transforms {
    pub fn new(model: Mat4, view: Mat4, projection: Mat4, viewport: Mat4) -> Self {
        let mut t = Self {
            model,
            view,
            projection,
            viewport,
            mvp: Mat4::identity(),
            mvp_it: Mat4::identity(),
        };
        t.update();
        t
    }

    /// Recompute the derived matrices
    pub fn update(&mut self) {
        self.mvp = self.projection * self.view * self.model;
        self.mvp_it = self.mvp.inverse().transpose();
    }

    /// Inverse-transpose of the model matrix's 3x3 block (world-space normals)
    pub fn normal_matrix(&self) -> Mat3 {
        Mat3::from(self.model).inverse().transpose()
    }
}

impl Default for Transforms {
    fn default() -> Self {
        Self::new(Mat4::identity(), Mat4::identity(), Mat4::identity(), Mat4::identity())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rasterizer::math::Vec4;

    const EPS: f32 = 1e-4;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).len() < EPS
    }

    #[test]
    fn test_viewport_maps_ndc_corners() {
        let vp = viewport(0, 0, 800, 600);
        let lo = vp * Vec4::new(-1.0, -1.0, -1.0, 1.0);
        let hi = vp * Vec4::new(1.0, 1.0, 1.0, 1.0);
        assert!(approx(lo.xyz(), Vec3::new(0.0, 0.0, 0.0)));
        assert!(approx(hi.xyz(), Vec3::new(800.0, 600.0, DEPTH)));
    }

    #[test]
    fn test_look_at_puts_eye_at_origin() {
        let eye = Vec3::new(1.0, 2.0, 3.0);
        let view = look_at(eye, Vec3::ZERO, Vec3::UP);
        let e = view * Vec4::from_vec3(eye, 1.0);
        assert!(approx(e.xyz(), Vec3::ZERO));

        // The target lies straight down -z
        let c = view * Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert!(c.x.abs() < EPS && c.y.abs() < EPS);
        assert!((c.z + eye.len()).abs() < EPS);
    }

    #[test]
    fn test_perspective_depth_range() {
        let p = perspective(45.0, 4.0 / 3.0, 0.1, 100.0);
        let near = (p * Vec4::new(0.0, 0.0, -0.1, 1.0)).project();
        let far = (p * Vec4::new(0.0, 0.0, -100.0, 1.0)).project();
        assert!((near.z + 1.0).abs() < 1e-3);
        assert!((far.z - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_rotate_quarter_turn_about_y() {
        let r = rotate(Vec3::UP, std::f32::consts::FRAC_PI_2);
        let v = r * Vec4::new(1.0, 0.0, 0.0, 0.0);
        assert!(approx(v.xyz(), Vec3::new(0.0, 0.0, -1.0)));
    }

    #[test]
    fn test_rotate_zero_axis_is_identity() {
        assert_eq!(rotate(Vec3::ZERO, 1.0), Mat4::identity());
    }

    #[test]
    fn test_projection_coeff() {
        let p = projection(-1.0 / 3.0);
        let v = p * Vec4::new(0.0, 0.0, 1.5, 1.0);
        assert!((v.w - 0.5).abs() < EPS);
    }

    #[test]
    fn test_update_derives_mvp() {
        let model = translate(Vec3::new(1.0, 0.0, 0.0));
        let view = translate(Vec3::new(0.0, 2.0, 0.0));
        let proj = scale(2.0, 2.0, 2.0);
        let t = Transforms::new(model, view, proj, Mat4::identity());

        let p = t.mvp * Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert!(approx(p.xyz(), Vec3::new(2.0, 4.0, 0.0)));

        // mvp is affine here, so mvp_it undoes to the transpose of the inverse
        let back = t.mvp_it.transpose() * p;
        assert!(approx(back.xyz(), Vec3::ZERO));
    }

    #[test]
    fn test_normal_matrix_under_non_uniform_scale() {
        let t = Transforms::new(scale(2.0, 1.0, 1.0), Mat4::identity(), Mat4::identity(), Mat4::identity());

        // Surface x + y = 0 has normal (1, 1, 0); after stretching x by 2 the
        // surface becomes x/2 + y = 0 with normal (1, 2, 0) up to scale.
        let n = (t.normal_matrix() * Vec3::new(1.0, 1.0, 0.0)).normalize();
        assert!(approx(n, Vec3::new(1.0, 2.0, 0.0).normalize()));
    }
}
