//! # Geometry
//!
//! CPU-side triangle data that becomes a [`crate::gfx::scene::mesh::Mesh`].
//!
//! Geometry comes from two places:
//!
//! - **Procedural primitives** ([`primitives`]): cube, sphere, cylinder,
//!   torus, helix and plane, generated directly in the renderer's
//!   left-handed space.
//! - **OBJ files** ([`MeshData::load_obj`]): parsed with `tobj`, then
//!   mirrored from the file's right-handed convention.
//!
//! In both cases per-vertex tangents are derived from the UV layout by
//! [`MeshData::to_vertices`].
//!
//! Winding: for every triangle `(a, b, c)`, `(b - a) x (c - a)` points out of
//! the surface. With the left-handed projection that is a clockwise
//! triangle on screen, which the pipelines treat as front-facing.

pub mod primitives;

pub use primitives::*;

use cgmath::{InnerSpace, Vector2, Vector3, Zero};
use std::path::Path;

use crate::error::AssetError;
use crate::gfx::scene::vertex::Vertex;

/// Triangle mesh data ready for tangent generation and GPU upload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Appends one vertex and returns its index
    pub fn push_vertex(&mut self, position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> u32 {
        let index = self.positions.len() as u32;
        self.positions.push(position);
        self.normals.push(normal);
        self.uvs.push(uv);
        index
    }

    pub fn push_triangle(&mut self, a: u32, b: u32, c: u32) {
        self.indices.extend_from_slice(&[a, b, c]);
    }

    /// Adds a triangle wound so its face normal agrees with the vertex normals
    pub fn push_triangle_facing(&mut self, a: u32, b: u32, c: u32) {
        let [pa, pb, pc] = [a, b, c].map(|i| Vector3::from(self.positions[i as usize]));
        let face = (pb - pa).cross(pc - pa);
        if face.dot(self.normal_sum(&[a, b, c])) >= 0.0 {
            self.push_triangle(a, b, c);
        } else {
            self.push_triangle(a, c, b);
        }
    }

    /// Adds the quad loop `a b c d` as two triangles, wound outward
    ///
    /// Orientation is taken from the diagonals so quads that collapse to a
    /// triangle (sphere poles) still resolve correctly.
    pub fn push_quad(&mut self, a: u32, b: u32, c: u32, d: u32) {
        let [pa, pb, pc, pd] = [a, b, c, d].map(|i| Vector3::from(self.positions[i as usize]));
        let area = (pc - pa).cross(pd - pb);
        if area.dot(self.normal_sum(&[a, b, c, d])) >= 0.0 {
            self.push_triangle(a, b, c);
            self.push_triangle(a, c, d);
        } else {
            self.push_triangle(a, c, b);
            self.push_triangle(a, d, c);
        }
    }

    fn normal_sum(&self, vertices: &[u32]) -> Vector3<f32> {
        vertices
            .iter()
            .map(|&i| Vector3::from(self.normals[i as usize]))
            .fold(Vector3::zero(), |acc, n| acc + n)
    }

    /// Loads every model in an OBJ file into a single mesh
    ///
    /// Faces are triangulated. Missing normals are rebuilt from face
    /// normals and missing texture coordinates default to zero. The result
    /// is converted from right-handed file space into the renderer's
    /// left-handed space.
    pub fn load_obj(path: impl AsRef<Path>) -> Result<Self, AssetError> {
        let path = path.as_ref();
        let (models, _materials) = tobj::load_obj(
            path,
            &tobj::LoadOptions {
                triangulate: true,
                single_index: true,
                ..Default::default()
            },
        )
        .map_err(|source| AssetError::Geometry {
            path: path.to_path_buf(),
            source,
        })?;

        let mut data = MeshData::new();
        for model in &models {
            let mesh = &model.mesh;
            let base = data.positions.len() as u32;
            let count = mesh.positions.len() / 3;

            let has_normals = mesh.normals.len() == mesh.positions.len();
            let has_uvs = mesh.texcoords.len() / 2 == count;

            for i in 0..count {
                data.positions.push([
                    mesh.positions[i * 3],
                    mesh.positions[i * 3 + 1],
                    mesh.positions[i * 3 + 2],
                ]);
                data.normals.push(if has_normals {
                    [
                        mesh.normals[i * 3],
                        mesh.normals[i * 3 + 1],
                        mesh.normals[i * 3 + 2],
                    ]
                } else {
                    [0.0; 3]
                });
                data.uvs.push(if has_uvs {
                    [mesh.texcoords[i * 2], mesh.texcoords[i * 2 + 1]]
                } else {
                    [0.0; 2]
                });
            }
            data.indices.extend(mesh.indices.iter().map(|i| i + base));

            if !has_normals {
                data.rebuild_normals(base as usize);
            }
        }

        if data.indices.is_empty() {
            return Err(AssetError::EmptyGeometry {
                path: path.to_path_buf(),
            });
        }

        data.flip_handedness();
        log::debug!(
            "loaded {} ({} vertices, {} triangles)",
            path.display(),
            data.vertex_count(),
            data.triangle_count()
        );
        Ok(data)
    }

    /// Mirrors right-handed data into left-handed space: negates Z on
    /// positions and normals, flips V, and reverses triangle winding.
    pub fn flip_handedness(&mut self) {
        for p in &mut self.positions {
            p[2] = -p[2];
        }
        for n in &mut self.normals {
            n[2] = -n[2];
        }
        for uv in &mut self.uvs {
            uv[1] = 1.0 - uv[1];
        }
        for tri in self.indices.chunks_exact_mut(3) {
            tri.swap(1, 2);
        }
    }

    /// Smooth normals from area-weighted face normals, for vertices from
    /// `first_vertex` onward
    fn rebuild_normals(&mut self, first_vertex: usize) {
        let mut accum = vec![Vector3::zero(); self.positions.len() - first_vertex];
        for tri in self.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            if a < first_vertex || b < first_vertex || c < first_vertex {
                continue;
            }
            let pa = Vector3::from(self.positions[a]);
            let face = (Vector3::from(self.positions[b]) - pa)
                .cross(Vector3::from(self.positions[c]) - pa);
            for i in [a, b, c] {
                accum[i - first_vertex] += face;
            }
        }
        for (i, n) in accum.into_iter().enumerate() {
            let n = if n.magnitude2() > 0.0 {
                n.normalize()
            } else {
                Vector3::unit_y()
            };
            self.normals[first_vertex + i] = n.into();
        }
    }

    /// Builds GPU vertices, computing a tangent for each vertex
    ///
    /// Every triangle contributes its UV-space U gradient to its three
    /// vertices. The accumulated vector is then made orthogonal to the
    /// vertex normal and normalized.
    pub fn to_vertices(&self) -> Vec<Vertex> {
        let mut tangents = vec![Vector3::zero(); self.positions.len()];

        for tri in self.indices.chunks_exact(3) {
            let [i0, i1, i2] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            let p0 = Vector3::from(self.positions[i0]);
            let e1 = Vector3::from(self.positions[i1]) - p0;
            let e2 = Vector3::from(self.positions[i2]) - p0;

            let uv0 = Vector2::from(self.uvs[i0]);
            let d1 = Vector2::from(self.uvs[i1]) - uv0;
            let d2 = Vector2::from(self.uvs[i2]) - uv0;

            let det = d1.x * d2.y - d2.x * d1.y;
            if det.abs() < f32::EPSILON {
                continue;
            }
            let tangent = (e1 * d2.y - e2 * d1.y) / det;

            tangents[i0] += tangent;
            tangents[i1] += tangent;
            tangents[i2] += tangent;
        }

        self.positions
            .iter()
            .zip(&self.normals)
            .zip(&self.uvs)
            .zip(tangents)
            .map(|(((&position, &normal), &uv), tangent)| Vertex {
                position,
                normal,
                uv,
                tangent: orthonormal_tangent(Vector3::from(normal), tangent).into(),
            })
            .collect()
    }
}

/// Gram-Schmidt against the normal, falling back to any perpendicular axis
/// when the accumulated tangent is degenerate
fn orthonormal_tangent(normal: Vector3<f32>, tangent: Vector3<f32>) -> Vector3<f32> {
    let projected = tangent - normal * normal.dot(tangent);
    if projected.magnitude2() > 1e-12 {
        return projected.normalize();
    }

    let axis = if normal.x.abs() < 0.9 {
        Vector3::unit_x()
    } else {
        Vector3::unit_y()
    };
    let fallback = axis - normal * normal.dot(axis);
    if fallback.magnitude2() > 1e-12 {
        fallback.normalize()
    } else {
        Vector3::unit_x()
    }
}
