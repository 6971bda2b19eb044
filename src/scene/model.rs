//! Triangle mesh with texture maps
//!
//! Meshes come from Wavefront OBJ files (via `tobj`) or are built in memory.
//! Every face is a triangle whose corners index positions, normals and UVs
//! independently, the way OBJ stores them.

use std::path::Path;

use crate::rasterizer::{Color, Texture, Vec2, Vec3};

/// Error type for mesh loading
#[derive(Debug)]
pub enum ModelError {
    Obj(tobj::LoadError),
    /// The file parsed but held no triangles
    Empty,
}

impl From<tobj::LoadError> for ModelError {
    fn from(e: tobj::LoadError) -> Self {
        ModelError::Obj(e)
    }
}

impl std::fmt::Display for ModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelError::Obj(e) => write!(f, "OBJ error: {}", e),
            ModelError::Empty => write!(f, "mesh has no faces"),
        }
    }
}

impl std::error::Error for ModelError {}

/// Attribute indices for one triangle corner
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VertexIndex {
    pub position: usize,
    pub normal: usize,
    pub uv: usize,
}

impl VertexIndex {
    pub fn new(position: usize, normal: usize, uv: usize) -> Self {
        Self { position, normal, uv }
    }
}

/// A triangle mesh plus optional diffuse, normal and specular maps
#[derive(Debug, Clone, Default)]
pub struct Model {
    pub name: String,
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    uvs: Vec<Vec2>,
    faces: Vec<[VertexIndex; 3]>,
    /// One tangent per face, derived from positions and UVs
    tangents: Vec<Vec3>,

    pub diffuse: Option<Texture>,
    pub normal_map: Option<Texture>,
    pub specular: Option<Texture>,
}

impl Model {
    /// Build a mesh from raw attributes. When `normals` is empty, flat face
    /// normals are generated and the corners rewired to them.
    pub fn new(
        name: &str,
        positions: Vec<Vec3>,
        mut normals: Vec<Vec3>,
        uvs: Vec<Vec2>,
        mut faces: Vec<[VertexIndex; 3]>,
    ) -> Self {
        if normals.is_empty() {
            for (i, face) in faces.iter_mut().enumerate() {
                let p = face.map(|c| positions.get(c.position).copied().unwrap_or_default());
                normals.push(flat_normal(p));
                for corner in face.iter_mut() {
                    corner.normal = i;
                }
            }
        }

        let mut model = Self {
            name: name.to_string(),
            positions,
            normals,
            uvs,
            faces,
            tangents: Vec::new(),
            diffuse: None,
            normal_map: None,
            specular: None,
        };
        model.tangents = (0..model.faces.len()).map(|f| model.compute_tangent(f)).collect();
        model
    }

    /// Load every shape of an OBJ file into one mesh (polygons are
    /// triangulated)
    pub fn load_obj<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let options = tobj::LoadOptions {
            triangulate: true,
            ignore_points: true,
            ignore_lines: true,
            ..Default::default()
        };
        let (shapes, _materials) = tobj::load_obj(path, &options)?;

        let mut positions = Vec::new();
        let mut normals = Vec::new();
        let mut uvs = Vec::new();
        let mut faces = Vec::new();

        for shape in &shapes {
            let mesh = &shape.mesh;
            let (p_base, n_base, t_base) = (positions.len(), normals.len(), uvs.len());

            positions.extend(mesh.positions.chunks_exact(3).map(|c| Vec3::new(c[0], c[1], c[2])));
            normals.extend(mesh.normals.chunks_exact(3).map(|c| Vec3::new(c[0], c[1], c[2])));
            uvs.extend(mesh.texcoords.chunks_exact(2).map(|c| Vec2::new(c[0], c[1])));

            let has_normals = !mesh.normal_indices.is_empty();
            let has_uvs = !mesh.texcoord_indices.is_empty();

            for (f, tri) in mesh.indices.chunks_exact(3).enumerate() {
                let mut face = [VertexIndex::default(); 3];
                for k in 0..3 {
                    let i = 3 * f + k;
                    face[k] = VertexIndex {
                        position: p_base + tri[k] as usize,
                        normal: if has_normals { n_base + mesh.normal_indices[i] as usize } else { 0 },
                        uv: if has_uvs { t_base + mesh.texcoord_indices[i] as usize } else { 0 },
                    };
                }
                // Shapes without normals get one flat normal per face
                if !has_normals {
                    let p = face.map(|c| positions.get(c.position).copied().unwrap_or_default());
                    normals.push(flat_normal(p));
                    for corner in face.iter_mut() {
                        corner.normal = normals.len() - 1;
                    }
                }
                faces.push(face);
            }
        }

        if faces.is_empty() {
            return Err(ModelError::Empty);
        }

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        let model = Self::new(&name, positions, normals, uvs, faces);
        log::info!(
            "Loaded model: {} ({} vertices, {} faces)",
            model.name,
            model.positions.len(),
            model.faces.len()
        );
        Ok(model)
    }

    /// Load whichever texture maps are given. Failures are logged and leave
    /// that map empty.
    pub fn load_textures(&mut self, diffuse: Option<&Path>, normal_map: Option<&Path>, specular: Option<&Path>) {
        let load = |path: Option<&Path>, kind: &str| -> Option<Texture> {
            let path = path?;
            match Texture::from_file(path) {
                Ok(tex) => {
                    log::info!("Loaded {} map: {} ({}x{})", kind, tex.name, tex.width, tex.height);
                    Some(tex)
                }
                Err(e) => {
                    log::warn!("Failed to load {} map {}: {}", kind, path.display(), e);
                    None
                }
            }
        };
        self.diffuse = load(diffuse, "diffuse");
        self.normal_map = load(normal_map, "normal");
        self.specular = load(specular, "specular");
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Attribute indices of `corner` (0-2) of `face`
    pub fn corner(&self, face: usize, corner: usize) -> VertexIndex {
        self.faces[face][corner]
    }

    pub fn position(&self, index: usize) -> Vec3 {
        self.positions.get(index).copied().unwrap_or_default()
    }

    pub fn normal(&self, index: usize) -> Vec3 {
        self.normals.get(index).copied().unwrap_or_default()
    }

    pub fn uv(&self, index: usize) -> Vec2 {
        self.uvs.get(index).copied().unwrap_or_default()
    }

    pub fn face_tangent(&self, face: usize) -> Vec3 {
        self.tangents[face]
    }

    /// Diffuse color at `uv` (v points up). Untextured meshes are white so
    /// lighting still shows.
    pub fn sample_diffuse(&self, uv: Vec2) -> Color {
        match &self.diffuse {
            Some(tex) => sample(tex, uv),
            None => Color::WHITE,
        }
    }

    /// Normal-map vector at `uv`, each channel mapped from [0, 255] to [-1, 1].
    /// Without a normal map this is the unperturbed +z.
    pub fn sample_normal(&self, uv: Vec2) -> Vec3 {
        let Some(tex) = &self.normal_map else {
            return Vec3::new(0.0, 0.0, 1.0);
        };
        let c = sample(tex, uv);
        Vec3::new(c.r as f32, c.g as f32, c.b as f32) * (2.0 / 255.0) - Vec3::new(1.0, 1.0, 1.0)
    }

    /// Specular exponent at `uv` (red channel, 0-255); 0 without a map
    pub fn sample_specular(&self, uv: Vec2) -> f32 {
        self.specular.as_ref().map_or(0.0, |tex| sample(tex, uv).r as f32)
    }

    fn compute_tangent(&self, face: usize) -> Vec3 {
        let c = self.faces[face];
        let p = c.map(|v| self.position(v.position));
        let t = c.map(|v| self.uv(v.uv));

        let e1 = p[1] - p[0];
        let e2 = p[2] - p[0];
        let d1 = t[1] - t[0];
        let d2 = t[2] - t[0];

        let det = d1.x * d2.y - d2.x * d1.y;
        if det.abs() < 1e-8 {
            // No usable UV layout: pick any direction in the face plane
            let fallback = if e1.len() > 0.0 { e1.normalize() } else { Vec3::new(1.0, 0.0, 0.0) };
            return fallback;
        }

        ((e1 * d2.y - e2 * d1.y) / det).normalize()
    }

    /// Unit cube centered on the origin, two triangles per side
    pub fn cube() -> Self {
        let positions = vec![
            // Front face
            Vec3::new(-1.0, -1.0, 1.0),
            Vec3::new(1.0, -1.0, 1.0),
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(-1.0, 1.0, 1.0),
            // Back face
            Vec3::new(1.0, -1.0, -1.0),
            Vec3::new(-1.0, -1.0, -1.0),
            Vec3::new(-1.0, 1.0, -1.0),
            Vec3::new(1.0, 1.0, -1.0),
            // Top face
            Vec3::new(-1.0, 1.0, 1.0),
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(1.0, 1.0, -1.0),
            Vec3::new(-1.0, 1.0, -1.0),
            // Bottom face
            Vec3::new(-1.0, -1.0, -1.0),
            Vec3::new(1.0, -1.0, -1.0),
            Vec3::new(1.0, -1.0, 1.0),
            Vec3::new(-1.0, -1.0, 1.0),
            // Right face
            Vec3::new(1.0, -1.0, 1.0),
            Vec3::new(1.0, -1.0, -1.0),
            Vec3::new(1.0, 1.0, -1.0),
            Vec3::new(1.0, 1.0, 1.0),
            // Left face
            Vec3::new(-1.0, -1.0, -1.0),
            Vec3::new(-1.0, -1.0, 1.0),
            Vec3::new(-1.0, 1.0, 1.0),
            Vec3::new(-1.0, 1.0, -1.0),
        ];

        let normals = vec![
            Vec3::new(0.0, 0.0, 1.0),  // Front
            Vec3::new(0.0, 0.0, -1.0), // Back
            Vec3::new(0.0, 1.0, 0.0),  // Top
            Vec3::new(0.0, -1.0, 0.0), // Bottom
            Vec3::new(1.0, 0.0, 0.0),  // Right
            Vec3::new(-1.0, 0.0, 0.0), // Left
        ];

        let uvs = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
        ];

        let mut faces = Vec::with_capacity(12);
        for side in 0..6 {
            let base = side * 4;
            let v = |i: usize| VertexIndex::new(base + i, side, i);
            faces.push([v(0), v(1), v(2)]);
            faces.push([v(0), v(2), v(3)]);
        }

        Self::new("cube", positions, normals, uvs, faces)
    }
}

/// Texture rows run top-down while v points up: v in [0, 1/h) is the last
/// row. v outside [0, 1) reads as zero, like any out-of-range texel.
fn sample(tex: &Texture, uv: Vec2) -> Color {
    let tx = (uv.x * tex.width as f32) as i32;
    let ty = (uv.y * tex.height as f32).floor() as i32;
    tex.get_pixel(tx, tex.height as i32 - 1 - ty)
}

/// Unit normal of the triangle `p`, following its winding
fn flat_normal(p: [Vec3; 3]) -> Vec3 {
    (p[1] - p[0]).cross(p[2] - p[0]).normalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).len() < 1e-5
    }

    fn quad() -> Model {
        let positions = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(0.0, 2.0, 0.0),
        ];
        let uvs = vec![Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0)];
        let face = [VertexIndex::new(0, 0, 0), VertexIndex::new(1, 0, 1), VertexIndex::new(2, 0, 2)];
        Model::new("tri", positions, Vec::new(), uvs, vec![face])
    }

    #[test]
    fn test_cube_layout() {
        let cube = Model::cube();
        assert_eq!(cube.face_count(), 12);
        for f in 0..cube.face_count() {
            let c = [0, 1, 2].map(|k| cube.corner(f, k));
            let p = c.map(|v| cube.position(v.position));
            // Winding agrees with the stored normal (outward facing)
            let geometric = (p[1] - p[0]).cross(p[2] - p[0]).normalize();
            assert!(approx(geometric, cube.normal(c[0].normal)), "face {}", f);
        }
    }

    #[test]
    fn test_generated_normals_and_tangent() {
        let m = quad();
        assert!(approx(m.normal(m.corner(0, 0).normal), Vec3::new(0.0, 0.0, 1.0)));
        // u runs along +x
        assert!(approx(m.face_tangent(0), Vec3::new(1.0, 0.0, 0.0)));
    }

    #[test]
    fn test_degenerate_uvs_still_give_unit_tangent() {
        let positions = vec![Vec3::new(0.0, 0.0, 0.0), Vec3::new(0.0, 3.0, 0.0), Vec3::new(1.0, 0.0, 0.0)];
        let face = [VertexIndex::new(0, 0, 0), VertexIndex::new(1, 0, 0), VertexIndex::new(2, 0, 0)];
        let m = Model::new("flat", positions, Vec::new(), Vec::new(), vec![face]);
        assert!((m.face_tangent(0).len() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_missing_maps() {
        let m = quad();
        assert_eq!(m.sample_diffuse(Vec2::new(0.5, 0.5)), Color::WHITE);
        assert_eq!(m.sample_specular(Vec2::new(0.5, 0.5)), 0.0);
        assert!(approx(m.sample_normal(Vec2::new(0.5, 0.5)), Vec3::new(0.0, 0.0, 1.0)));
    }

    #[test]
    fn test_sampling_flips_v() {
        let mut m = quad();
        let mut tex = Texture::new(2, 2);
        tex.pixels[0] = Color::RED; // top-left texel
        m.diffuse = Some(tex);
        assert_eq!(m.sample_diffuse(Vec2::new(0.1, 0.9)), Color::RED);
        assert_eq!(m.sample_diffuse(Vec2::new(0.1, 0.1)), Color::WHITE);
    }

    #[test]
    fn test_normal_map_decoding() {
        let mut m = quad();
        let mut tex = Texture::new(1, 1);
        tex.pixels[0] = Color::new(255, 0, 255);
        m.normal_map = Some(tex);
        let n = m.sample_normal(Vec2::new(0.5, 0.5));
        assert!(approx(n, Vec3::new(1.0, -1.0, 1.0)));
    }

    #[test]
    fn test_sampling_covers_both_v_edges() {
        let mut m = Model::cube();
        m.diffuse = Some(Texture::new(4, 4));
        for v in [0.0, 0.2, 0.5, 1.0 - 1e-4] {
            assert_eq!(m.sample_diffuse(Vec2::new(0.5, v)), Color::WHITE, "v = {}", v);
        }

        let mut tex = Texture::new(1, 4);
        tex.pixels[3] = Color::GREEN; // bottom row
        tex.pixels[0] = Color::RED; // top row
        m.diffuse = Some(tex);
        assert_eq!(m.sample_diffuse(Vec2::new(0.5, 0.0)), Color::GREEN);
        assert_eq!(m.sample_diffuse(Vec2::new(0.5, 0.99)), Color::RED);
        assert_eq!(m.sample_diffuse(Vec2::new(0.5, -0.1)), Color::ZERO);
    }

    #[test]
    fn test_mixed_normals_get_per_shape_flat_normals() {
        let obj = "o lit\n\
                   v 0 0 0\nv 1 0 0\nv 0 1 0\n\
                   vn 0 0 1\n\
                   f 1//1 2//1 3//1\n\
                   o bare\n\
                   v 0 0 0\nv 0 1 0\nv 0 0 1\n\
                   f 4 5 6\n";
        let path = std::env::temp_dir().join(format!("eleanor_mixed_{}.obj", std::process::id()));
        std::fs::write(&path, obj).unwrap();
        let m = Model::load_obj(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(m.face_count(), 2);
        assert!(approx(m.normal(m.corner(0, 0).normal), Vec3::new(0.0, 0.0, 1.0)));
        for k in 0..3 {
            assert!(approx(m.normal(m.corner(1, k).normal), Vec3::new(1.0, 0.0, 0.0)));
        }
    }

    #[test]
    fn test_load_obj_missing_file() {
        assert!(matches!(Model::load_obj("does/not/exist.obj"), Err(ModelError::Obj(_))));
    }
}
